//! Cross-node value propagation after a commit.
//!
//! A form may register one injector per node path. After a value commit the
//! handler receives the committed value plus its schema/value surroundings
//! and returns target assignments, each resolved (absolute or relative) and
//! applied within the same pass. A guard set of already-injected paths
//! blocks re-entrant cycles.

use crate::error::InjectionError;
use crate::expr::parse_path;
use crate::pointer::JsonPointer;
use serde_json::Value;

/// Everything an injector sees about the committed node.
#[derive(Debug, Clone)]
pub struct InjectionScope {
    /// Path of the committed value
    pub data_path: JsonPointer,
    /// Position of the node in the schema document
    pub schema_path: JsonPointer,
    /// The node's effective schema as plain JSON
    pub json_schema: Value,
    pub parent_value: Option<Value>,
    pub parent_schema: Option<Value>,
    pub root_value: Value,
    pub root_schema: Value,
    /// User-supplied context carried by the form
    pub context: Value,
}

/// A per-node propagation handler.
///
/// Returns `(target path, value)` pairs; target paths may be absolute
/// (`/derived/fullName`) or relative to the committed node's scope (`./x`,
/// `../x`).
pub trait Injector {
    fn inject(
        &self,
        value: &Value,
        scope: &InjectionScope,
    ) -> Result<Vec<(String, Value)>, InjectionError>;
}

impl<F> Injector for F
where
    F: Fn(&Value, &InjectionScope) -> Result<Vec<(String, Value)>, InjectionError>,
{
    fn inject(
        &self,
        value: &Value,
        scope: &InjectionScope,
    ) -> Result<Vec<(String, Value)>, InjectionError> {
        self(value, scope)
    }
}

/// Resolve an injection target against the committed node's scope.
pub fn resolve_target(
    origin: &JsonPointer,
    target: &str,
) -> Result<JsonPointer, InjectionError> {
    let scope = origin.parent().unwrap_or_default();
    parse_path(target)
        .resolve(&scope)
        .map_err(|_| InjectionError::InvalidTarget {
            path: origin.to_string(),
            target: target.to_string(),
        })
}
