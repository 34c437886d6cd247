//! The validator plugin boundary and the built-in constraint validator.
//!
//! The engine never validates inline; it hands the resolved effective schema
//! to a [`Validator`] implementation once (compile) and re-invokes the
//! compiled artifact per validation request. The boundary is async-capable:
//! `validate` returns a future so validator backends may do IO, while
//! synchronous validators return ready futures.

use crate::error::SchemaError;
use crate::schema::{NormalizedSchema, SchemaType, normalize};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::Future;

/// One validation finding.
///
/// This is the wire shape consumers receive; `key` carries a numeric hint
/// such as an array index when the finding concerns one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// The violated keyword (`required`, `type`, `enum`, …)
    pub keyword: String,
    /// JSON Pointer into the value tree
    pub data_path: String,
    /// JSON Pointer into the schema document
    pub schema_path: String,
    /// Keyword-specific parameters
    pub params: Value,
    /// Human-readable message
    pub message: String,
    /// Numeric hint, e.g. the offending array index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<usize>,
}

impl ValidationIssue {
    pub fn new(
        keyword: impl Into<String>,
        data_path: impl Into<String>,
        schema_path: impl Into<String>,
        params: Value,
        message: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            data_path: data_path.into(),
            schema_path: schema_path.into(),
            params,
            message: message.into(),
            key: None,
        }
    }

    pub fn with_key(mut self, key: usize) -> Self {
        self.key = Some(key);
        self
    }
}

/// A schema compiled by a validator backend.
pub trait CompiledSchema {
    /// Validate a value against this compiled schema.
    fn validate<'a>(
        &'a self,
        value: &'a Value,
    ) -> impl Future<Output = Vec<ValidationIssue>> + Send + 'a;
}

/// Validator plugin: `compile(schema) → validate(value) → issues`.
///
/// A validator instance is an explicit construction dependency of each form,
/// so concurrent forms can carry independent validators.
pub trait Validator {
    type Error: std::error::Error + Send + Sync + 'static;
    type Compiled: CompiledSchema;

    /// Compile an effective schema document for repeated validation.
    fn compile(&self, schema: &Value) -> Result<Self::Compiled, Self::Error>;
}

/// Built-in validator covering the normalized constraint set.
///
/// Checks type tags, `required`, `const`/`enum`, numeric bounds, string
/// lengths, `minItems`/`maxItems`, tuple bounds, and the `date-time` format
/// (full RFC3339 via chrono). `pattern` is left to external validator
/// plugins.
#[derive(Debug, Clone, Default)]
pub struct ConstraintValidator;

impl ConstraintValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for ConstraintValidator {
    type Error = SchemaError;
    type Compiled = CompiledConstraints;

    fn compile(&self, schema: &Value) -> Result<Self::Compiled, Self::Error> {
        Ok(CompiledConstraints {
            schema: normalize(schema)?,
        })
    }
}

/// A normalized schema ready for repeated constraint checks.
#[derive(Debug, Clone)]
pub struct CompiledConstraints {
    schema: NormalizedSchema,
}

impl CompiledSchema for CompiledConstraints {
    fn validate<'a>(
        &'a self,
        value: &'a Value,
    ) -> impl Future<Output = Vec<ValidationIssue>> + Send + 'a {
        let mut issues = Vec::new();
        check(&self.schema, value, "", "#", &mut issues);
        std::future::ready(issues)
    }
}

fn check(
    schema: &NormalizedSchema,
    value: &Value,
    data_path: &str,
    schema_path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if let Some(expected) = schema.schema_type {
        if expected != SchemaType::Virtual && !type_matches(expected, value) {
            issues.push(ValidationIssue::new(
                "type",
                data_path,
                format!("{}/type", schema_path),
                json!({"type": expected.as_str()}),
                format!("expected {}, got {}", expected.as_str(), value_type(value)),
            ));
            return;
        }
    }

    if let Some(expected) = &schema.const_value {
        if value != expected {
            issues.push(ValidationIssue::new(
                "const",
                data_path,
                format!("{}/const", schema_path),
                json!({"allowedValue": expected}),
                "value does not match the constant",
            ));
        }
    }
    if let Some(allowed) = &schema.enum_values {
        if !value.is_null() && !allowed.contains(value) {
            issues.push(ValidationIssue::new(
                "enum",
                data_path,
                format!("{}/enum", schema_path),
                json!({"allowedValues": allowed}),
                "value is not one of the allowed values",
            ));
        }
    }

    match value {
        Value::String(text) => check_string(schema, text, data_path, schema_path, issues),
        Value::Number(_) => check_number(schema, value, data_path, schema_path, issues),
        Value::Array(items) => check_array(schema, items, data_path, schema_path, issues),
        Value::Object(map) => check_object(schema, map, data_path, schema_path, issues),
        _ => {}
    }
}

fn check_string(
    schema: &NormalizedSchema,
    text: &str,
    data_path: &str,
    schema_path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let length = text.chars().count() as u64;
    if let Some(min) = schema.constraints.min_length {
        if length < min {
            issues.push(ValidationIssue::new(
                "minLength",
                data_path,
                format!("{}/minLength", schema_path),
                json!({"limit": min}),
                format!("string is shorter than {} characters", min),
            ));
        }
    }
    if let Some(max) = schema.constraints.max_length {
        if length > max {
            issues.push(ValidationIssue::new(
                "maxLength",
                data_path,
                format!("{}/maxLength", schema_path),
                json!({"limit": max}),
                format!("string is longer than {} characters", max),
            ));
        }
    }
    if schema.constraints.format.as_deref() == Some("date-time")
        && DateTime::<FixedOffset>::parse_from_rfc3339(text).is_err()
    {
        issues.push(ValidationIssue::new(
            "format",
            data_path,
            format!("{}/format", schema_path),
            json!({"format": "date-time"}),
            "not a valid RFC3339 date-time",
        ));
    }
}

fn check_number(
    schema: &NormalizedSchema,
    value: &Value,
    data_path: &str,
    schema_path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(number) = value.as_f64() else {
        return;
    };
    if let Some(min) = schema.constraints.minimum {
        if number < min {
            issues.push(ValidationIssue::new(
                "minimum",
                data_path,
                format!("{}/minimum", schema_path),
                json!({"limit": min}),
                format!("{} is below the minimum {}", number, min),
            ));
        }
    }
    if let Some(max) = schema.constraints.maximum {
        if number > max {
            issues.push(ValidationIssue::new(
                "maximum",
                data_path,
                format!("{}/maximum", schema_path),
                json!({"limit": max}),
                format!("{} is above the maximum {}", number, max),
            ));
        }
    }
}

fn check_array(
    schema: &NormalizedSchema,
    items: &[Value],
    data_path: &str,
    schema_path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let count = items.len() as u64;
    if let Some(min) = schema.constraints.min_items {
        if count < min {
            issues.push(ValidationIssue::new(
                "minItems",
                data_path,
                format!("{}/minItems", schema_path),
                json!({"limit": min}),
                format!("array has fewer than {} items", min),
            ));
        }
    }
    if let Some(max) = schema.constraints.max_items {
        if count > max {
            issues.push(ValidationIssue::new(
                "maxItems",
                data_path,
                format!("{}/maxItems", schema_path),
                json!({"limit": max}),
                format!("array has more than {} items", max),
            ));
        }
    }
    if let Some(bound) = schema.tuple_bound() {
        if items.len() > bound {
            issues.push(
                ValidationIssue::new(
                    "items",
                    data_path,
                    format!("{}/items", schema_path),
                    json!({"limit": bound}),
                    format!("tuple is bounded to {} items", bound),
                )
                .with_key(items.len() - 1),
            );
        }
    }
    for (index, item) in items.iter().enumerate() {
        if let Some(item_schema) = schema.item_schema(index) {
            let item_path = format!("{}/{}", data_path, index);
            let item_schema_path = if index < schema.prefix_items.len() {
                format!("{}/prefixItems/{}", schema_path, index)
            } else {
                format!("{}/items", schema_path)
            };
            let before = issues.len();
            check(item_schema, item, &item_path, &item_schema_path, issues);
            for issue in &mut issues[before..] {
                issue.key.get_or_insert(index);
            }
        }
    }
}

fn check_object(
    schema: &NormalizedSchema,
    map: &serde_json::Map<String, Value>,
    data_path: &str,
    schema_path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    for name in &schema.required {
        let missing = match map.get(name) {
            None | Some(Value::Null) => true,
            Some(_) => false,
        };
        if missing {
            issues.push(ValidationIssue::new(
                "required",
                data_path,
                format!("{}/required", schema_path),
                json!({"missingProperty": name}),
                format!("required property '{}' is missing", name),
            ));
        }
    }
    for (name, property) in &schema.properties {
        if let Some(child) = map.get(name) {
            if child.is_null() {
                continue;
            }
            check(
                property,
                child,
                &format!("{}/{}", data_path, name),
                &format!("{}/properties/{}", schema_path, name),
                issues,
            );
        }
    }
}

fn type_matches(expected: SchemaType, value: &Value) -> bool {
    match expected {
        SchemaType::String => value.is_string(),
        SchemaType::Number => value.is_number(),
        SchemaType::Integer => value.is_i64() || value.is_u64(),
        SchemaType::Boolean => value.is_boolean(),
        SchemaType::Array => value.is_array(),
        SchemaType::Object => value.is_object(),
        SchemaType::Null => value.is_null(),
        SchemaType::Virtual => true,
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(schema: Value, value: Value) -> Vec<ValidationIssue> {
        let compiled = ConstraintValidator::new().compile(&schema).unwrap();
        futures::executor::block_on(compiled.validate(&value))
    }

    #[test]
    fn test_required_and_type() {
        let schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "age": {"type": "integer"}},
            "required": ["name"],
        });
        let issues = run(schema.clone(), json!({"age": "old"}));
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.keyword == "required"));
        assert!(
            issues
                .iter()
                .any(|i| i.keyword == "type" && i.data_path == "/age")
        );

        assert!(run(schema, json!({"name": "ada", "age": 36})).is_empty());
    }

    #[test]
    fn test_enum_and_bounds() {
        let schema = json!({
            "type": "object",
            "properties": {
                "size": {"type": "string", "enum": ["s", "m", "l"]},
                "count": {"type": "number", "minimum": 1, "maximum": 10},
            },
        });
        let issues = run(schema, json!({"size": "xl", "count": 12}));
        assert!(issues.iter().any(|i| i.keyword == "enum"));
        assert!(issues.iter().any(|i| i.keyword == "maximum"));
    }

    #[test]
    fn test_date_time_format() {
        let schema = json!({"type": "string", "format": "date-time"});
        assert!(run(schema.clone(), json!("2026-08-06T10:30:00Z")).is_empty());
        assert_eq!(run(schema, json!("not-a-date")).len(), 1);
    }

    #[test]
    fn test_tuple_bound_issue_carries_key() {
        let schema = json!({
            "type": "array",
            "prefixItems": [{"type": "string"}, {"type": "number"}],
            "items": false,
        });
        let issues = run(schema, json!(["a", 1, true]));
        let issue = issues.iter().find(|i| i.keyword == "items").unwrap();
        assert_eq!(issue.key, Some(2));
    }

    #[test]
    fn test_item_issue_data_path() {
        let schema = json!({
            "type": "array",
            "items": {"type": "number"},
        });
        let issues = run(schema, json!([1, "two", 3]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].data_path, "/1");
        assert_eq!(issues[0].key, Some(1));
    }
}
