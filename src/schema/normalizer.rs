//! Schema normalization: raw JSON documents into [`NormalizedSchema`].
//!
//! Normalization flattens the `&`-prefixed alias keywords into the canonical
//! `computed` block, compiles condition expressions, expands
//! `prefixItems`/`items` into per-position schemas, and rejects composition
//! branches whose declared type contradicts their parent. `$ref` keywords are
//! kept as lazy tokens for the definition arena to resolve on demand.

use super::types::{
    CompiledExpr, ComputedSet, Constraints, ItemsPolicy, NormalizedSchema, SchemaType,
    VirtualGroup,
};
use crate::error::{SchemaError, SchemaResult};
use crate::expr;
use log::debug;
use serde_json::{Map, Value};

/// Normalize a raw schema document.
pub fn normalize(raw: &Value) -> SchemaResult<NormalizedSchema> {
    let obj = match raw {
        Value::Object(obj) => obj,
        // `true` permits anything: an empty schema
        Value::Bool(true) => return Ok(NormalizedSchema::default()),
        other => {
            return Err(SchemaError::invalid(format!(
                "schema must be an object, got {}",
                type_label(other)
            )));
        }
    };

    let mut schema = NormalizedSchema {
        ref_token: obj
            .get("$ref")
            .and_then(Value::as_str)
            .map(str::to_string),
        schema_type: match obj.get("type").and_then(Value::as_str) {
            Some(name) => Some(SchemaType::parse(name)?),
            None => None,
        },
        default: obj.get("default").cloned(),
        const_value: obj.get("const").cloned(),
        enum_values: obj
            .get("enum")
            .and_then(Value::as_array)
            .map(|values| values.to_vec()),
        computed: normalize_computed(obj),
        terminal: obj.get("terminal").and_then(Value::as_bool).unwrap_or(false),
        constraints: normalize_constraints(obj),
        ..NormalizedSchema::default()
    };

    if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        for (name, raw_prop) in props {
            schema.properties.push((name.clone(), normalize(raw_prop)?));
        }
    }
    schema.required = string_array(obj.get("required"));
    schema.property_keys = string_array(obj.get("propertyKeys"));
    schema.virtual_groups = normalize_virtual(obj)?;

    if let Some(prefix) = obj.get("prefixItems").and_then(Value::as_array) {
        for raw_item in prefix {
            schema.prefix_items.push(normalize(raw_item)?);
        }
    }
    schema.items = match obj.get("items") {
        None => ItemsPolicy::Unspecified,
        Some(Value::Bool(false)) => ItemsPolicy::Disallowed,
        Some(Value::Bool(true)) => ItemsPolicy::Schema(Box::new(NormalizedSchema::default())),
        Some(raw_items) => ItemsPolicy::Schema(Box::new(normalize(raw_items)?)),
    };

    schema.if_schema = normalize_optional(obj.get("if"))?;
    schema.then_schema = normalize_optional(obj.get("then"))?;
    schema.else_schema = normalize_optional(obj.get("else"))?;
    schema.all_of = normalize_list(obj.get("allOf"))?;
    schema.any_of = normalize_list(obj.get("anyOf"))?;
    schema.one_of = normalize_list(obj.get("oneOf"))?;

    check_branch_types(&schema, &schema.one_of)?;
    check_branch_types(&schema, &schema.any_of)?;

    Ok(schema)
}

/// Flatten `computed` plus the `&`-prefixed shorthand aliases.
///
/// A literal `computed` block wins over an alias for the same slot.
fn normalize_computed(obj: &Map<String, Value>) -> ComputedSet {
    let mut computed = ComputedSet::default();
    if let Some(block) = obj.get("computed").and_then(Value::as_object) {
        computed.watch = watch_list(block.get("watch"));
        computed.active = compile_slot(block.get("active"));
        computed.visible = compile_slot(block.get("visible"));
        computed.condition = compile_slot(block.get("if"));
    }
    if computed.watch.is_empty() {
        computed.watch = watch_list(obj.get("&watch"));
    }
    if computed.active.is_none() {
        computed.active = compile_slot(obj.get("&active"));
    }
    if computed.visible.is_none() {
        computed.visible = compile_slot(obj.get("&visible"));
    }
    if computed.condition.is_none() {
        computed.condition = compile_slot(obj.get("&if"));
    }
    computed
}

fn compile_slot(raw: Option<&Value>) -> Option<CompiledExpr> {
    let source = raw?.as_str()?.to_string();
    let compiled = expr::compile(&source);
    if let Err(error) = &compiled {
        debug!("expression '{}' failed to compile: {}", source, error);
    }
    Some(CompiledExpr { source, compiled })
}

fn watch_list(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::String(path)) => vec![path.clone()],
        Some(Value::Array(paths)) => paths
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn normalize_virtual(obj: &Map<String, Value>) -> SchemaResult<Vec<VirtualGroup>> {
    let Some(block) = obj.get("virtual") else {
        return Ok(Vec::new());
    };
    let block = block
        .as_object()
        .ok_or_else(|| SchemaError::invalid("'virtual' must be an object of named groups"))?;
    let mut groups = Vec::new();
    for (name, spec) in block {
        let fields = spec
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SchemaError::invalid(format!("virtual group '{}' is missing 'fields'", name))
            })?;
        groups.push(VirtualGroup {
            name: name.clone(),
            fields: fields
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        });
    }
    Ok(groups)
}

fn normalize_constraints(obj: &Map<String, Value>) -> Constraints {
    Constraints {
        minimum: obj.get("minimum").and_then(Value::as_f64),
        maximum: obj.get("maximum").and_then(Value::as_f64),
        min_length: obj.get("minLength").and_then(Value::as_u64),
        max_length: obj.get("maxLength").and_then(Value::as_u64),
        min_items: obj.get("minItems").and_then(Value::as_u64),
        max_items: obj.get("maxItems").and_then(Value::as_u64),
        format: obj
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_string),
        pattern: obj
            .get("pattern")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn normalize_optional(raw: Option<&Value>) -> SchemaResult<Option<Box<NormalizedSchema>>> {
    match raw {
        Some(value) => Ok(Some(Box::new(normalize(value)?))),
        None => Ok(None),
    }
}

fn normalize_list(raw: Option<&Value>) -> SchemaResult<Vec<NormalizedSchema>> {
    let Some(list) = raw else {
        return Ok(Vec::new());
    };
    let list = list
        .as_array()
        .ok_or_else(|| SchemaError::invalid("composition keyword must hold an array"))?;
    list.iter().map(normalize).collect()
}

/// Reject branches whose own `type` conflicts with the parent's.
///
/// `integer` under a `number` parent is tolerated as a narrowing.
fn check_branch_types(parent: &NormalizedSchema, branches: &[NormalizedSchema]) -> SchemaResult<()> {
    let Some(parent_type) = parent.schema_type else {
        return Ok(());
    };
    for (index, branch) in branches.iter().enumerate() {
        if let Some(branch_type) = branch.schema_type {
            let narrowing =
                parent_type == SchemaType::Number && branch_type == SchemaType::Integer;
            if branch_type != parent_type && !narrowing {
                return Err(SchemaError::BranchTypeConflict {
                    index,
                    branch_type: branch_type.as_str().to_string(),
                    parent_type: parent_type.as_str().to_string(),
                });
            }
        }
    }
    Ok(())
}

fn string_array(raw: Option<&Value>) -> Vec<String> {
    raw.and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
