//! Tree building and the depth-first resolve pass.
//!
//! One pass runs per external mutation: parent before child, so descendants
//! never observe stale ancestor state. Interest is dependency-tracked — a
//! node recomputes when the changed-path set intersects its own subtree or
//! its watch set; untouched subtrees are skipped entirely.

use crate::compose::{BranchState, SchemaFingerprint, compose, next_state, reconcile};
use crate::error::{FormError, FormResult};
use crate::expr::{evaluate_bool, parse_path};
use crate::node::arena::{NodeArena, NodeId};
use crate::node::core::SchemaNode;
use crate::pointer::JsonPointer;
use crate::schema::{CompiledExpr, NormalizedSchema, SchemaArena, SchemaType};
use log::{debug, trace, warn};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// The set of paths changed by one external mutation.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet(BTreeSet<JsonPointer>);

impl ChangeSet {
    pub fn single(path: JsonPointer) -> Self {
        let mut set = BTreeSet::new();
        set.insert(path);
        ChangeSet(set)
    }

    pub fn insert(&mut self, path: JsonPointer) {
        self.0.insert(path);
    }

    /// True when any changed path overlaps `path` (either contains the
    /// other).
    pub fn overlaps(&self, path: &JsonPointer) -> bool {
        self.0.iter().any(|changed| changed.overlaps(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &JsonPointer> {
        self.0.iter()
    }
}

struct PassCx<'a> {
    arena: &'a mut NodeArena,
    schemas: &'a SchemaArena,
    root_value: &'a mut Value,
    changed: &'a ChangeSet,
    /// Nodes whose own watch set intersects the changed paths
    hits: HashSet<NodeId>,
    /// Watch hits plus all their ancestors, enabling descent
    descent: HashSet<NodeId>,
    committed: Vec<JsonPointer>,
    full: bool,
}

/// Build a fresh tree from a normalized root schema and an initial value.
///
/// Returns the arena plus the paths whose values were established during the
/// build (defaults, branch seeds).
pub fn build_tree(
    schemas: &SchemaArena,
    root_base: Arc<NormalizedSchema>,
    root_value: &mut Value,
) -> FormResult<(NodeArena, Vec<JsonPointer>)> {
    let mut arena = NodeArena::new();
    seed_initial_value(&root_base, &JsonPointer::root(), root_value)?;
    if root_value.is_null() && is_object_like(&root_base) {
        *root_value = Value::Object(serde_json::Map::new());
    }
    arena.insert_with(|id| {
        SchemaNode::new(id, JsonPointer::root(), JsonPointer::root(), None, root_base)
    });
    let committed = recompute(&mut arena, schemas, root_value, &ChangeSet::default(), true)?;
    Ok((arena, committed))
}

/// Run one resolve pass over the tree.
///
/// `full` forces recomputation of every node (initial build, reset); regular
/// mutations pass `false` and rely on dependency tracking.
pub fn recompute(
    arena: &mut NodeArena,
    schemas: &SchemaArena,
    root_value: &mut Value,
    changed: &ChangeSet,
    full: bool,
) -> FormResult<Vec<JsonPointer>> {
    let (hits, descent) = collect_watch_hits(arena, changed);
    let root = arena
        .root_id()
        .ok_or_else(|| FormError::internal("resolve pass on an empty arena"))?;
    let mut cx = PassCx {
        arena,
        schemas,
        root_value,
        changed,
        hits,
        descent,
        committed: Vec::new(),
        full,
    };
    resolve_node(&mut cx, root, false)?;
    let mut committed = cx.committed;
    refresh_ancestors(arena, root_value, &mut committed);
    committed.sort();
    committed.dedup();
    Ok(committed)
}

/// Mark nodes whose watch set intersects the changed paths, and their
/// ancestor closure for descent.
fn collect_watch_hits(
    arena: &NodeArena,
    changed: &ChangeSet,
) -> (HashSet<NodeId>, HashSet<NodeId>) {
    let mut hits = HashSet::new();
    let mut descent = HashSet::new();
    for node in arena.iter() {
        if node.watch.iter().any(|watched| changed.overlaps(watched)) {
            hits.insert(node.id);
            descent.insert(node.id);
            let mut cursor = node.parent;
            while let Some(parent) = cursor {
                if !descent.insert(parent) {
                    break;
                }
                cursor = arena.get(parent).and_then(|n| n.parent);
            }
        }
    }
    (hits, descent)
}

/// Refresh cached ancestor values after in-pass mutations deeper in the
/// tree, recording ancestors whose composite value changed as commits.
fn refresh_ancestors(arena: &mut NodeArena, root_value: &Value, committed: &mut Vec<JsonPointer>) {
    let snapshot = committed.clone();
    for path in snapshot {
        let mut cursor = path.parent();
        while let Some(ancestor) = cursor {
            if let Some(id) = arena.id_at(&ancestor) {
                let fresh = ancestor.lookup(root_value).cloned().unwrap_or(Value::Null);
                let node = arena.get_mut(id).expect("indexed node is live");
                if node.value != fresh {
                    node.value = fresh;
                    committed.push(ancestor.clone());
                }
            }
            cursor = ancestor.parent();
        }
    }
}

fn resolve_node(cx: &mut PassCx<'_>, id: NodeId, force: bool) -> FormResult<()> {
    let (path, prev_value, base, branch_state, prev_fingerprint) = {
        let node = cx.arena.expect(id)?;
        (
            node.path.clone(),
            node.value.clone(),
            Arc::clone(&node.base),
            node.branch_state.clone(),
            node.fingerprint.clone(),
        )
    };

    let interested =
        force || cx.full || cx.changed.overlaps(&path) || cx.hits.contains(&id);
    if !interested {
        // Descend only toward watch hits or changed subtrees
        let children: Vec<NodeId> = cx.arena.expect(id)?.children.clone();
        for child in children {
            let child_path = cx.arena.expect(child)?.path.clone();
            if cx.descent.contains(&child) || cx.changed.overlaps(&child_path) {
                resolve_node(cx, child, false)?;
            }
        }
        return Ok(());
    }

    trace!("resolving node '{}'", path);
    let mut errors: Vec<FormError> = Vec::new();
    let mut value = path.lookup(cx.root_value).cloned().unwrap_or(Value::Null);

    // Lazy $ref: materialize only when a value actually reaches this
    // position, bounding recursion to value depth
    let mut base = base;
    if let Some(token) = base.ref_token.clone() {
        if !value.is_null() {
            match cx.schemas.resolve(&token) {
                Ok(resolved) => base = resolved,
                Err(error) => errors.push(error.into()),
            }
        }
    }

    let scope = path.parent().unwrap_or_default();
    let active = eval_flag(
        base.computed.active.as_ref(),
        &scope,
        cx.root_value,
        true,
        &mut errors,
    );
    let visible = eval_flag(
        base.computed.visible.as_ref(),
        &scope,
        cx.root_value,
        true,
        &mut errors,
    );
    let watch = collect_watch(&base, &scope, &path);

    {
        let node = cx.arena.expect_mut(id)?;
        node.watch = watch;
        node.visible = visible;
    }

    if !active {
        deactivate(cx, id, &path, &prev_value, errors)?;
        return Ok(());
    }

    // Composition
    let (effective, selection) = if base.has_composition() {
        let composition = compose(&base, &path, &value, &*cx.root_value);
        let reconciliation = reconcile(&branch_state, &composition, &base, &mut value);
        if !reconciliation.is_empty() {
            path.assign(cx.root_value, value.clone())?;
        }
        let state = next_state(&composition);
        errors.extend(composition.errors);
        (
            Arc::new(composition.effective),
            Some((composition.selection, state)),
        )
    } else {
        (Arc::clone(&base), None)
    };

    let fingerprint = SchemaFingerprint::of_schema(&effective);
    let schema_changed = fingerprint != prev_fingerprint;
    if schema_changed {
        debug!("effective schema changed at '{}'", path);
    }

    {
        let node = cx.arena.expect_mut(id)?;
        node.base = Arc::clone(&base);
        node.active = true;
        node.errors = errors;
        node.effective = Arc::clone(&effective);
        node.fingerprint = fingerprint;
        if let Some((sel, state)) = selection {
            node.one_of_index = sel.one_of;
            node.any_of_indices = sel.any_of;
            node.branch_state = state;
        }
    }

    // Children
    if effective.terminal {
        prune_children(cx, id)?;
    } else if is_object_like(&effective) {
        sync_object_children(cx, id, &effective, &path, schema_changed)?;
    } else if is_array_like(&effective) {
        sync_array_children(cx, id, &effective, &path, schema_changed)?;
    } else {
        prune_children(cx, id)?;
    }

    // Post-order: commit detection against the reconciled slice
    let final_value = path.lookup(cx.root_value).cloned().unwrap_or(Value::Null);
    let node = cx.arena.expect_mut(id)?;
    if prev_value != final_value {
        cx.committed.push(path);
    }
    node.value = final_value;
    Ok(())
}

fn sync_object_children(
    cx: &mut PassCx<'_>,
    id: NodeId,
    effective: &Arc<NormalizedSchema>,
    path: &JsonPointer,
    schema_changed: bool,
) -> FormResult<()> {
    let names = effective.ordered_property_names();
    let group_names: Vec<String> = effective
        .virtual_groups
        .iter()
        .map(|group| group.name.clone())
        .collect();
    let (schema_path, existing): (JsonPointer, Vec<NodeId>) = {
        let node = cx.arena.expect(id)?;
        (node.schema_path.clone(), node.children.clone())
    };

    // Prune children no longer declared by the effective schema
    for child in &existing {
        let token = cx
            .arena
            .expect(*child)?
            .path
            .last_token()
            .unwrap_or_default();
        if !names.contains(&token) && !group_names.contains(&token) {
            debug!("pruning node '{}/{}'", path, token);
            cx.arena.remove_subtree(*child);
        }
    }

    let mut ordered: Vec<NodeId> = Vec::with_capacity(names.len() + group_names.len());
    for name in &names {
        let prop_schema = effective
            .property(name)
            .expect("ordered names come from declared properties")
            .clone();
        let child_path = path.child(name);
        let child_schema_path = schema_path.child("properties").child(name);
        let required = effective.required.contains(name);
        let (child_id, created) =
            ensure_child(cx, id, child_path, child_schema_path, prop_schema, required)?;
        ordered.push(child_id);
        resolve_node(cx, child_id, created || schema_changed)?;
    }

    // Virtual nodes: synthetic composites over named sibling fields,
    // derived on every pass, never written into the value tree
    for group in &effective.virtual_groups {
        let vpath = path.child(&group.name);
        let composite = Value::Array(
            group
                .fields
                .iter()
                .map(|field| {
                    path.child(field)
                        .lookup(cx.root_value)
                        .cloned()
                        .unwrap_or(Value::Null)
                })
                .collect(),
        );
        let vid = match cx.arena.id_at(&vpath) {
            Some(existing_id) => existing_id,
            None => {
                let base = Arc::new(NormalizedSchema {
                    schema_type: Some(SchemaType::Virtual),
                    ..NormalizedSchema::default()
                });
                let vschema_path = schema_path.child("virtual").child(&group.name);
                cx.arena.insert_with(|nid| {
                    SchemaNode::new(nid, vpath.clone(), vschema_path, Some(id), base)
                })
            }
        };
        cx.arena.expect_mut(vid)?.value = composite;
        ordered.push(vid);
    }

    cx.arena.expect_mut(id)?.children = ordered;
    Ok(())
}

fn sync_array_children(
    cx: &mut PassCx<'_>,
    id: NodeId,
    effective: &Arc<NormalizedSchema>,
    path: &JsonPointer,
    schema_changed: bool,
) -> FormResult<()> {
    let current = path.lookup(cx.root_value).cloned().unwrap_or(Value::Null);
    let mut items = match current {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        _ => {
            // Type mismatch is the validator's finding; no children here
            prune_children(cx, id)?;
            return Ok(());
        }
    };

    if let Some(bound) = effective.tuple_bound() {
        if items.len() > bound {
            warn!(
                "array at '{}' holds {} items beyond its bound of {}, truncating",
                path,
                items.len(),
                bound
            );
            cx.arena.expect_mut(id)?.errors.push(FormError::TupleBound {
                path: path.to_string(),
                bound,
                index: items.len() - 1,
            });
            items.truncate(bound);
            path.assign(cx.root_value, Value::Array(items.clone()))?;
        }
    }

    let schema_path = cx.arena.expect(id)?.schema_path.clone();
    let empty_item = NormalizedSchema::default();
    let mut ordered: Vec<NodeId> = Vec::with_capacity(items.len());
    for index in 0..items.len() {
        let item_schema = effective.item_schema(index).unwrap_or(&empty_item).clone();
        let child_path = path.index(index);
        let child_schema_path = if index < effective.prefix_items.len() {
            schema_path.child("prefixItems").index(index)
        } else {
            schema_path.child("items")
        };
        let (child_id, created) =
            ensure_child(cx, id, child_path, child_schema_path, item_schema, false)?;
        ordered.push(child_id);
        resolve_node(cx, child_id, created || schema_changed)?;
    }

    // Prune trailing children past the current length
    let existing: Vec<NodeId> = cx.arena.expect(id)?.children.clone();
    for child in existing {
        if !ordered.contains(&child) {
            cx.arena.remove_subtree(child);
        }
    }
    cx.arena.expect_mut(id)?.children = ordered;
    Ok(())
}

/// Find or create the child node at `child_path`, refreshing its base schema
/// when the parent's effective schema moved underneath it.
fn ensure_child(
    cx: &mut PassCx<'_>,
    parent: NodeId,
    child_path: JsonPointer,
    child_schema_path: JsonPointer,
    schema: NormalizedSchema,
    required: bool,
) -> FormResult<(NodeId, bool)> {
    if let Some(existing) = cx.arena.id_at(&child_path) {
        let new_fingerprint = SchemaFingerprint::of_schema(&schema);
        let node = cx.arena.expect_mut(existing)?;
        if node.base_fingerprint != new_fingerprint {
            node.base = Arc::new(schema);
            node.base_fingerprint = new_fingerprint;
            node.branch_state = BranchState::Unresolved;
        }
        node.required = required;
        return Ok((existing, false));
    }

    // First materialization: explicit value > schema default > (arrays)
    // minItems-driven per-position defaults
    seed_initial_value(&schema, &child_path, cx.root_value)?;
    let base = Arc::new(schema);
    let child_id = cx.arena.insert_with(|nid| {
        let mut node = SchemaNode::new(nid, child_path, child_schema_path, Some(parent), base);
        node.required = required;
        node
    });
    Ok((child_id, true))
}

/// Seed a position's initial value when none exists.
fn seed_initial_value(
    schema: &NormalizedSchema,
    path: &JsonPointer,
    root_value: &mut Value,
) -> FormResult<()> {
    if path.lookup(root_value).is_some_and(|v| !v.is_null()) {
        return Ok(());
    }
    if let Some(default) = &schema.default {
        path.assign(root_value, default.clone())?;
        return Ok(());
    }
    if is_array_like(schema) {
        if let Some(initial) = initial_array_value(schema) {
            path.assign(root_value, initial)?;
        }
    }
    Ok(())
}

/// The initial value of an array position with no explicit value: `minItems`
/// slots filled from per-position defaults, falling back to the `items`
/// continuation default past the tuple prefix.
fn initial_array_value(schema: &NormalizedSchema) -> Option<Value> {
    let min = schema.constraints.min_items? as usize;
    if min == 0 {
        return None;
    }
    let mut slots = Vec::with_capacity(min);
    for index in 0..min {
        slots.push(
            schema
                .item_schema(index)
                .and_then(|item| item.default.clone())
                .unwrap_or(Value::Null),
        );
    }
    Some(Value::Array(slots))
}

fn deactivate(
    cx: &mut PassCx<'_>,
    id: NodeId,
    path: &JsonPointer,
    prev_value: &Value,
    errors: Vec<FormError>,
) -> FormResult<()> {
    debug!("deactivating node '{}'", path);
    prune_children(cx, id)?;
    if !path.is_root() && path.lookup(cx.root_value).is_some() {
        path.remove(cx.root_value);
    }
    let node = cx.arena.expect_mut(id)?;
    node.active = false;
    node.errors = errors;
    node.value = Value::Null;
    node.one_of_index = None;
    node.any_of_indices = Vec::new();
    node.branch_state = BranchState::Unresolved;
    if !prev_value.is_null() {
        cx.committed.push(path.clone());
    }
    Ok(())
}

fn prune_children(cx: &mut PassCx<'_>, id: NodeId) -> FormResult<()> {
    let children = std::mem::take(&mut cx.arena.expect_mut(id)?.children);
    for child in children {
        cx.arena.remove_subtree(child);
    }
    Ok(())
}

fn eval_flag(
    slot: Option<&CompiledExpr>,
    scope: &JsonPointer,
    lookup: &Value,
    default: bool,
    errors: &mut Vec<FormError>,
) -> bool {
    let Some(compiled) = slot else {
        return default;
    };
    match &compiled.compiled {
        Ok(expr) => match evaluate_bool(expr, scope, lookup) {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    "expression '{}' failed closed at '{}': {}",
                    compiled.source, scope, error
                );
                errors.push(error.into());
                false
            }
        },
        Err(parse_error) => {
            warn!(
                "expression '{}' did not compile, failing closed",
                compiled.source
            );
            errors.push(parse_error.clone().into());
            false
        }
    }
}

/// Resolve the node's dependency set: explicit watch paths plus every path
/// referenced by its computed expressions and branch predicates.
fn collect_watch(
    base: &NormalizedSchema,
    scope: &JsonPointer,
    path: &JsonPointer,
) -> Vec<JsonPointer> {
    let mut watch = Vec::new();
    for raw in &base.computed.watch {
        if let Ok(resolved) = parse_path(raw).resolve(scope) {
            watch.push(resolved);
        }
    }
    for slot in [&base.computed.active, &base.computed.visible, &base.computed.condition] {
        if let Some(CompiledExpr {
            compiled: Ok(expr), ..
        }) = slot
        {
            if let Ok(mut paths) = expr.watch_paths(scope) {
                watch.append(&mut paths);
            }
        }
    }
    // Branch predicates resolve against the node's own path
    for branch in base.one_of.iter().chain(base.any_of.iter()) {
        if let Some(CompiledExpr {
            compiled: Ok(expr), ..
        }) = &branch.computed.condition
        {
            if let Ok(mut paths) = expr.watch_paths(path) {
                watch.append(&mut paths);
            }
        }
    }
    watch.sort();
    watch.dedup();
    watch
}

/// Object-shaped: declared type, declared properties, or virtual groups.
fn is_object_like(schema: &NormalizedSchema) -> bool {
    match schema.schema_type {
        Some(SchemaType::Object) => true,
        Some(_) => false,
        None => !schema.properties.is_empty() || !schema.virtual_groups.is_empty(),
    }
}

/// Array-shaped: declared type or tuple/item schemas.
fn is_array_like(schema: &NormalizedSchema) -> bool {
    match schema.schema_type {
        Some(SchemaType::Array) => true,
        Some(_) => false,
        None => {
            !schema.prefix_items.is_empty()
                || !matches!(schema.items, crate::schema::ItemsPolicy::Unspecified)
        }
    }
}
