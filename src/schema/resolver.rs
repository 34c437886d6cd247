//! Lazy `$ref` resolution over a schema document.
//!
//! References stay tokens through normalization; this arena materializes the
//! referenced definition the first time a value node actually reaches that
//! position, memoized by reference token. Self-referencing schemas therefore
//! never expand beyond the depth of the value they describe.

use super::normalizer::normalize;
use super::types::NormalizedSchema;
use crate::error::{SchemaError, SchemaResult};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// Memoizing definition arena for one schema document.
#[derive(Debug)]
pub struct SchemaArena {
    document: Value,
    cache: RefCell<HashMap<String, Arc<NormalizedSchema>>>,
}

impl SchemaArena {
    /// Capture the document whose `$defs` (or any `#/...` pointer target)
    /// may be referenced.
    pub fn new(document: Value) -> Self {
        Self {
            document,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The raw document this arena resolves against.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Resolve a reference token (`#`, `#/$defs/name`, any `#/...` pointer)
    /// to its normalized definition, memoized by token.
    pub fn resolve(&self, token: &str) -> SchemaResult<Arc<NormalizedSchema>> {
        if let Some(hit) = self.cache.borrow().get(token) {
            return Ok(Arc::clone(hit));
        }
        let pointer = token
            .strip_prefix('#')
            .ok_or_else(|| SchemaError::unresolved_ref(token))?;
        let target = if pointer.is_empty() {
            &self.document
        } else {
            self.document
                .pointer(pointer)
                .ok_or_else(|| SchemaError::unresolved_ref(token))?
        };
        let normalized = Arc::new(normalize(target)?);
        self.cache
            .borrow_mut()
            .insert(token.to_string(), Arc::clone(&normalized));
        Ok(normalized)
    }
}
