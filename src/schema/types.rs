//! Core type definitions for normalized schemas.
//!
//! This module contains the data structures produced by the normalizer: the
//! canonical, alias-flattened form of the extended JSON-Schema dialect that
//! the rest of the engine consumes.

use crate::error::{ExpressionError, SchemaResult};
use crate::expr::ast::Expr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The type tag of a normalized schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// String value
    String,
    /// Floating point number
    Number,
    /// Integer number
    Integer,
    /// Boolean value
    Boolean,
    /// Array with tuple or homogeneous item schemas
    Array,
    /// Object with declared properties
    Object,
    /// Explicit null
    Null,
    /// Synthetic grouping of sibling fields into one composite value
    Virtual,
}

impl SchemaType {
    /// Parse a `type` keyword value.
    pub fn parse(name: &str) -> SchemaResult<Self> {
        match name {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "integer" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            "null" => Ok(Self::Null),
            "virtual" => Ok(Self::Virtual),
            other => Err(crate::error::SchemaError::UnknownType {
                type_name: other.to_string(),
            }),
        }
    }

    /// The keyword spelling of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
            Self::Virtual => "virtual",
        }
    }
}

/// An expression compiled once at schema load.
///
/// Parse failures are preserved so conditions can fail closed at evaluation
/// time while surfacing the error on the owning node.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    /// Original expression source
    pub source: String,
    /// Parse result, kept verbatim for fail-closed evaluation
    pub compiled: Result<Expr, ExpressionError>,
}

/// The canonical `computed` block after alias flattening.
///
/// `&active`, `&visible`, `&if` and `&watch` shorthands normalize into this
/// structure; a literal `computed` object in the schema wins over aliases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedSet {
    /// Dependency paths watched for re-rendering, as written in the schema
    pub watch: Vec<String>,
    /// Controls whether the node participates in the form at all
    pub active: Option<CompiledExpr>,
    /// Controls render visibility only; the value is untouched
    pub visible: Option<CompiledExpr>,
    /// Branch activation predicate for oneOf/anyOf membership
    pub condition: Option<CompiledExpr>,
}

impl ComputedSet {
    /// True when no computed behavior is attached.
    pub fn is_empty(&self) -> bool {
        self.watch.is_empty()
            && self.active.is_none()
            && self.visible.is_none()
            && self.condition.is_none()
    }
}

/// Growth policy for array positions past `prefixItems`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ItemsPolicy {
    /// No `items` keyword present
    #[default]
    Unspecified,
    /// `items: false` — growth past the tuple bound is rejected
    Disallowed,
    /// Open tuple or homogeneous array item schema
    Schema(Box<NormalizedSchema>),
}

impl ItemsPolicy {
    /// The continuation schema, if growth is permitted.
    pub fn schema(&self) -> Option<&NormalizedSchema> {
        match self {
            Self::Schema(schema) => Some(schema),
            _ => None,
        }
    }
}

/// A named virtual grouping of sibling fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualGroup {
    /// Name of the synthetic node
    pub name: String,
    /// Sibling property names composed into its value
    pub fields: Vec<String>,
}

/// Value constraints carried through normalization for the validator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub format: Option<String>,
    pub pattern: Option<String>,
}

impl Constraints {
    /// True when no constraint keyword is present.
    pub fn is_empty(&self) -> bool {
        self.minimum.is_none()
            && self.maximum.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.min_items.is_none()
            && self.max_items.is_none()
            && self.format.is_none()
            && self.pattern.is_none()
    }
}

/// A schema after normalization: aliases flattened, tuples expanded,
/// references kept as lazy tokens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSchema {
    /// Type tag; `None` for pure-`$ref` or pure-composition schemas
    pub schema_type: Option<SchemaType>,
    /// Lazy `$ref` token, resolved on demand by the definition arena
    pub ref_token: Option<String>,
    pub default: Option<Value>,
    pub const_value: Option<Value>,
    pub enum_values: Option<Vec<Value>>,
    pub computed: ComputedSet,
    /// Declared properties in canonical order
    pub properties: Vec<(String, NormalizedSchema)>,
    pub required: Vec<String>,
    /// Explicit merged-property ordering, when declared
    pub property_keys: Vec<String>,
    pub virtual_groups: Vec<VirtualGroup>,
    /// Per-position tuple schemas
    pub prefix_items: Vec<NormalizedSchema>,
    pub items: ItemsPolicy,
    pub if_schema: Option<Box<NormalizedSchema>>,
    pub then_schema: Option<Box<NormalizedSchema>>,
    pub else_schema: Option<Box<NormalizedSchema>>,
    pub all_of: Vec<NormalizedSchema>,
    pub any_of: Vec<NormalizedSchema>,
    pub one_of: Vec<NormalizedSchema>,
    /// Opaque-leaf flag: suppress child materialization
    pub terminal: bool,
    pub constraints: Constraints,
}

impl NormalizedSchema {
    /// Look up a declared property schema by name.
    pub fn property(&self, name: &str) -> Option<&NormalizedSchema> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, schema)| schema)
    }

    /// True when composition keywords require per-mutation recomposition.
    pub fn has_composition(&self) -> bool {
        self.if_schema.is_some()
            || !self.all_of.is_empty()
            || !self.any_of.is_empty()
            || !self.one_of.is_empty()
    }

    /// The fixed tuple bound, when growth past `prefixItems` is disallowed.
    pub fn tuple_bound(&self) -> Option<usize> {
        if self.prefix_items.is_empty() {
            return None;
        }
        match self.items {
            ItemsPolicy::Schema(_) => None,
            _ => Some(self.prefix_items.len()),
        }
    }

    /// The schema governing array position `index`.
    pub fn item_schema(&self, index: usize) -> Option<&NormalizedSchema> {
        self.prefix_items
            .get(index)
            .or_else(|| self.items.schema())
    }

    /// Property ordering for child materialization: `propertyKeys` first,
    /// then remaining declared properties in canonical order.
    pub fn ordered_property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.properties.len());
        for key in &self.property_keys {
            if self.property(key).is_some() && !names.contains(key) {
                names.push(key.clone());
            }
        }
        for (name, _) in &self.properties {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Reconstruct a plain JSON Schema document from the normalized form.
    ///
    /// Composition keywords are omitted: callers serialize *effective*
    /// schemas, where composition has already been applied. Output key order
    /// is deterministic, making the serialization usable as fingerprint
    /// input.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        if let Some(reference) = &self.ref_token {
            out.insert("$ref".into(), Value::String(reference.clone()));
        }
        if let Some(schema_type) = self.schema_type {
            out.insert("type".into(), Value::String(schema_type.as_str().into()));
        }
        if let Some(value) = &self.const_value {
            out.insert("const".into(), value.clone());
        }
        if let Some(values) = &self.enum_values {
            out.insert("enum".into(), Value::Array(values.clone()));
        }
        if let Some(value) = &self.default {
            out.insert("default".into(), value.clone());
        }
        if !self.properties.is_empty() {
            let mut props = Map::new();
            for (name, schema) in &self.properties {
                props.insert(name.clone(), schema.to_json());
            }
            out.insert("properties".into(), Value::Object(props));
        }
        if !self.required.is_empty() {
            out.insert(
                "required".into(),
                Value::Array(
                    self.required
                        .iter()
                        .map(|name| Value::String(name.clone()))
                        .collect(),
                ),
            );
        }
        if !self.prefix_items.is_empty() {
            out.insert(
                "prefixItems".into(),
                Value::Array(self.prefix_items.iter().map(|s| s.to_json()).collect()),
            );
        }
        match &self.items {
            ItemsPolicy::Unspecified => {}
            ItemsPolicy::Disallowed => {
                out.insert("items".into(), Value::Bool(false));
            }
            ItemsPolicy::Schema(schema) => {
                out.insert("items".into(), schema.to_json());
            }
        }
        if self.terminal {
            out.insert("terminal".into(), Value::Bool(true));
        }
        let c = &self.constraints;
        if let Some(v) = c.minimum {
            out.insert("minimum".into(), serde_json::json!(v));
        }
        if let Some(v) = c.maximum {
            out.insert("maximum".into(), serde_json::json!(v));
        }
        if let Some(v) = c.min_length {
            out.insert("minLength".into(), serde_json::json!(v));
        }
        if let Some(v) = c.max_length {
            out.insert("maxLength".into(), serde_json::json!(v));
        }
        if let Some(v) = c.min_items {
            out.insert("minItems".into(), serde_json::json!(v));
        }
        if let Some(v) = c.max_items {
            out.insert("maxItems".into(), serde_json::json!(v));
        }
        if let Some(v) = &c.format {
            out.insert("format".into(), Value::String(v.clone()));
        }
        if let Some(v) = &c.pattern {
            out.insert("pattern".into(), Value::String(v.clone()));
        }
        Value::Object(out)
    }
}
