//! The imperative form handle.
//!
//! [`Form`] owns the schema arena, the node tree, the canonical value, and
//! the generation counter. All recomputation triggered by one mutation runs
//! to completion before the next mutation is accepted; async validation
//! results carry the generation they started at and are discarded when
//! stale.

use crate::compose::SchemaFingerprint;
use crate::error::{FormError, FormResult};
use crate::inject::{InjectionScope, Injector, resolve_target};
use crate::node::{ChangeSet, NodeArena, SchemaNode, build_tree, recompute};
use crate::pointer::JsonPointer;
use crate::schema::{NormalizedSchema, SchemaArena, SchemaType, normalize};
use crate::validator::{CompiledSchema, ValidationIssue, Validator};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

/// Builder for [`Form`] instances.
///
/// The validator is an explicit dependency passed at build time, so multiple
/// concurrent forms can carry independent validators.
pub struct FormBuilder {
    schema: Value,
    value: Option<Value>,
    context: Value,
    injectors: Vec<(JsonPointer, Box<dyn Injector>)>,
}

impl FormBuilder {
    /// Start from a raw schema document.
    pub fn new(schema: Value) -> Self {
        Self {
            schema,
            value: None,
            context: Value::Null,
            injectors: Vec::new(),
        }
    }

    /// Seed the form with an initial value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Attach a user context passed through to injection scopes.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Register the propagation handler for one node path.
    pub fn with_injector(
        mut self,
        pointer: &str,
        injector: impl Injector + 'static,
    ) -> FormResult<Self> {
        let path = JsonPointer::parse(pointer)?;
        self.injectors.push((path, Box::new(injector)));
        Ok(self)
    }

    /// Build the form, resolving the initial tree.
    pub fn build<V: Validator>(self, validator: V) -> FormResult<Form<V>> {
        let root_base = Arc::new(normalize(&self.schema)?);
        let schemas = SchemaArena::new(self.schema);
        let initial_value = self.value.clone().unwrap_or(Value::Null);
        let mut root_value = initial_value.clone();
        let (arena, _) = build_tree(&schemas, Arc::clone(&root_base), &mut root_value)?;
        let id = Uuid::new_v4();
        info!("form {} built with {} nodes", id, arena.len());
        Ok(Form {
            id,
            validator,
            schemas,
            root_base,
            arena,
            root_value,
            initial_value,
            injectors: self.injectors.into_iter().collect(),
            context: self.context,
            generation: 0,
            compiled: HashMap::new(),
        })
    }
}

/// A live form: resolved node tree plus its canonical value.
pub struct Form<V: Validator> {
    id: Uuid,
    validator: V,
    schemas: SchemaArena,
    root_base: Arc<NormalizedSchema>,
    arena: NodeArena,
    root_value: Value,
    initial_value: Value,
    injectors: HashMap<JsonPointer, Box<dyn Injector>>,
    context: Value,
    generation: u64,
    compiled: HashMap<SchemaFingerprint, V::Compiled>,
}

impl<V: Validator> Form<V> {
    /// This form's instance id, carried in log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The current canonical value.
    pub fn value(&self) -> &Value {
        &self.root_value
    }

    /// The mutation generation counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The root node.
    pub fn root(&self) -> &SchemaNode {
        self.arena
            .root_id()
            .and_then(|id| self.arena.get(id))
            .expect("a built form always has a root node")
    }

    /// The node at a path, if materialized.
    pub fn node(&self, pointer: &str) -> Option<&SchemaNode> {
        let path = JsonPointer::parse(pointer).ok()?;
        self.arena.node_at(&path)
    }

    /// The selected oneOf branch at a path.
    pub fn one_of_index(&self, pointer: &str) -> Option<usize> {
        self.node(pointer).and_then(|node| node.one_of_index)
    }

    /// The active anyOf subset at a path.
    pub fn any_of_indices(&self, pointer: &str) -> Vec<usize> {
        self.node(pointer)
            .map(|node| node.any_of_indices.clone())
            .unwrap_or_default()
    }

    /// Node-level errors at a path.
    pub fn errors(&self, pointer: &str) -> &[FormError] {
        self.node(pointer).map(|node| &node.errors[..]).unwrap_or(&[])
    }

    /// Validation issues at a path.
    pub fn issues(&self, pointer: &str) -> &[ValidationIssue] {
        self.node(pointer).map(|node| &node.issues[..]).unwrap_or(&[])
    }

    /// Write a value and run recomputation plus injection to completion.
    pub fn set_value(&mut self, pointer: &str, value: Value) -> FormResult<()> {
        let path = JsonPointer::parse(pointer)?;
        self.check_tuple_bound(&path)?;
        debug!("form {}: set {} (generation {})", self.id, path, self.generation + 1);
        path.assign(&mut self.root_value, value)?;
        let changed = ChangeSet::single(path.clone());
        let committed = recompute(
            &mut self.arena,
            &self.schemas,
            &mut self.root_value,
            &changed,
            false,
        )?;
        self.generation += 1;
        self.run_injection(path, committed)?;
        Ok(())
    }

    /// Rebuild the tree from the initial value.
    pub fn reset(&mut self) -> FormResult<()> {
        debug!("form {}: reset", self.id);
        self.root_value = self.initial_value.clone();
        let (arena, _) = build_tree(
            &self.schemas,
            Arc::clone(&self.root_base),
            &mut self.root_value,
        )?;
        self.arena = arena;
        self.generation += 1;
        Ok(())
    }

    /// Validate the current value against the assembled effective schema.
    ///
    /// Compiled schemas are cached by effective-schema fingerprint. The
    /// result is applied only if no mutation superseded this call's
    /// generation; a stale result is discarded and the previously stored
    /// issues stand.
    pub async fn validate(&mut self) -> FormResult<bool> {
        let generation = self.generation;
        let document = self.assemble_effective()?;
        let fingerprint = SchemaFingerprint::from_content(document.to_string().as_bytes());
        if !self.compiled.contains_key(&fingerprint) {
            let compiled = self.validator.compile(&document).map_err(|error| {
                FormError::internal(format!("validator failed to compile schema: {}", error))
            })?;
            self.compiled.insert(fingerprint.clone(), compiled);
        }
        let compiled = self
            .compiled
            .get(&fingerprint)
            .expect("compiled schema was just inserted");
        let issues = compiled.validate(&self.root_value).await;
        Ok(self.apply_validation(generation, issues))
    }

    /// Store a validation result unless a newer mutation superseded it.
    pub(crate) fn apply_validation(
        &mut self,
        generation: u64,
        issues: Vec<ValidationIssue>,
    ) -> bool {
        if generation != self.generation {
            warn!(
                "form {}: discarding stale validation result (generation {} superseded by {})",
                self.id, generation, self.generation
            );
            return self.arena.iter().all(|node| node.issues.is_empty());
        }
        for node in self.arena.iter_mut() {
            node.issues.clear();
        }
        let valid = issues.is_empty();
        let root = self.arena.root_id().expect("built form has a root");
        for issue in issues {
            let target = JsonPointer::parse(issue.data_path.clone())
                .ok()
                .and_then(|path| self.arena.id_at(&path))
                .unwrap_or(root);
            if let Some(node) = self.arena.get_mut(target) {
                node.issues.push(issue);
            }
        }
        valid
    }

    /// Reject writes through a bounded tuple position before mutating.
    fn check_tuple_bound(&self, path: &JsonPointer) -> FormResult<()> {
        let mut prefix = JsonPointer::root();
        for token in path.tokens() {
            if let Some(node) = self.arena.node_at(&prefix) {
                if let (Some(bound), Ok(index)) =
                    (node.effective.tuple_bound(), token.parse::<usize>())
                {
                    if index >= bound {
                        return Err(FormError::TupleBound {
                            path: prefix.to_string(),
                            bound,
                            index,
                        });
                    }
                }
            }
            prefix = prefix.child(&token);
        }
        Ok(())
    }

    /// Run injector handlers for every committed path, propagating writes
    /// until the queue drains. The guard set blocks cyclic re-entry.
    fn run_injection(
        &mut self,
        origin: JsonPointer,
        committed: Vec<JsonPointer>,
    ) -> FormResult<()> {
        if self.injectors.is_empty() {
            return Ok(());
        }
        let mut guard: HashSet<JsonPointer> = HashSet::new();
        guard.insert(origin);
        let mut queue: VecDeque<JsonPointer> = committed.into();

        while let Some(path) = queue.pop_front() {
            if !self.injectors.contains_key(&path) {
                continue;
            }
            let Some(node) = self.arena.node_at(&path) else {
                continue;
            };
            let value = node.value.clone();
            let parent = node.parent.and_then(|pid| self.arena.get(pid));
            let scope = InjectionScope {
                data_path: path.clone(),
                schema_path: node.schema_path.clone(),
                json_schema: node.effective.to_json(),
                parent_value: parent.map(|p| p.value.clone()),
                parent_schema: parent.map(|p| p.effective.to_json()),
                root_value: self.root_value.clone(),
                root_schema: self.schemas.document().clone(),
                context: self.context.clone(),
            };
            let injector = self
                .injectors
                .get(&path)
                .expect("presence checked above");
            let outcome = injector.inject(&value, &scope);

            match outcome {
                Err(error) => {
                    // Caught at the call site; the originating commit stands
                    warn!("form {}: {}", self.id, error);
                    if let Some(id) = self.arena.id_at(&path) {
                        if let Some(node) = self.arena.get_mut(id) {
                            node.errors.push(error.into());
                        }
                    }
                }
                Ok(targets) => {
                    for (raw_target, target_value) in targets {
                        let target = match resolve_target(&path, &raw_target) {
                            Ok(target) => target,
                            Err(error) => {
                                warn!("form {}: {}", self.id, error);
                                if let Some(id) = self.arena.id_at(&path) {
                                    if let Some(node) = self.arena.get_mut(id) {
                                        node.errors.push(error.into());
                                    }
                                }
                                continue;
                            }
                        };
                        if !guard.insert(target.clone()) {
                            debug!(
                                "form {}: injection into '{}' skipped, already written this pass",
                                self.id, target
                            );
                            continue;
                        }
                        if target.assign(&mut self.root_value, target_value).is_err() {
                            let error = crate::error::InjectionError::InvalidTarget {
                                path: path.to_string(),
                                target: target.to_string(),
                            };
                            warn!("form {}: {}", self.id, error);
                            if let Some(id) = self.arena.id_at(&path) {
                                if let Some(node) = self.arena.get_mut(id) {
                                    node.errors.push(error.into());
                                }
                            }
                            continue;
                        }
                        let changed = ChangeSet::single(target.clone());
                        let newly = recompute(
                            &mut self.arena,
                            &self.schemas,
                            &mut self.root_value,
                            &changed,
                            false,
                        )?;
                        queue.extend(newly);
                    }
                }
            }
        }
        Ok(())
    }

    /// Assemble the full effective schema document from the node tree, for
    /// the validator. Inactive properties are excluded; per-node effective
    /// schemas replace their static declarations so nested composition
    /// results apply.
    fn assemble_effective(&self) -> FormResult<Value> {
        let root = self
            .arena
            .root_id()
            .ok_or_else(|| FormError::internal("assembling schema of an empty tree"))?;
        Ok(self.assemble_node(root))
    }

    fn assemble_node(&self, id: crate::node::NodeId) -> Value {
        let Some(node) = self.arena.get(id) else {
            return Value::Object(serde_json::Map::new());
        };
        let mut doc = node.effective.to_json();
        let array_shaped = node.effective.schema_type == Some(SchemaType::Array)
            || !node.effective.prefix_items.is_empty();

        if array_shaped {
            let items: Vec<Value> = node
                .children
                .iter()
                .filter_map(|&child_id| self.arena.get(child_id).map(|_| child_id))
                .map(|child_id| self.assemble_node(child_id))
                .collect();
            if let (Some(map), false) = (doc.as_object_mut(), items.is_empty()) {
                map.insert("prefixItems".into(), Value::Array(items));
            }
            return doc;
        }

        let mut properties = serde_json::Map::new();
        let mut inactive: Vec<String> = Vec::new();
        for &child_id in &node.children {
            let Some(child) = self.arena.get(child_id) else {
                continue;
            };
            if child.base.schema_type == Some(SchemaType::Virtual) {
                continue;
            }
            let token = child.path.last_token().unwrap_or_default();
            if !child.active {
                inactive.push(token);
                continue;
            }
            properties.insert(token, self.assemble_node(child_id));
        }

        if let Some(map) = doc.as_object_mut() {
            if !properties.is_empty() {
                map.insert("properties".into(), Value::Object(properties));
            }
            if !inactive.is_empty() {
                if let Some(Value::Object(props)) = map.get_mut("properties") {
                    for name in &inactive {
                        props.remove(name);
                    }
                }
                if let Some(Value::Array(required)) = map.get_mut("required") {
                    required.retain(|entry| {
                        entry
                            .as_str()
                            .map(|name| !inactive.iter().any(|i| i == name))
                            .unwrap_or(true)
                    });
                }
            }
        }
        doc
    }
}
