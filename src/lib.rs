//! Reactive schema-form resolution engine.
//!
//! Resolves a JSON-Schema-like document (extended with conditional and
//! composition keywords) plus a live value into a tree of typed nodes whose
//! required-ness, visibility, active composition branch, and default values
//! update reactively as values change. Consumers are dynamic-form runtimes
//! that must render inputs matching the *currently applicable* subset of a
//! schema.
//!
//! # Core Components
//!
//! - [`Form`] / [`FormBuilder`] - imperative handle owning the resolved tree
//! - [`schema::SchemaArena`] - lazy `$ref`/`$defs` resolution
//! - [`Validator`] - pluggable `compile → validate` boundary
//! - [`Injector`] - cross-node value propagation after a commit
//!
//! # Quick Start
//!
//! ```rust
//! use formtree::{FormBuilder, ConstraintValidator};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "category": {"type": "string", "enum": ["movie", "game"]},
//!         "title": {"type": "string"},
//!     },
//!     "required": ["title"],
//! });
//! let mut form = FormBuilder::new(schema).build(ConstraintValidator::new())?;
//! form.set_value("/category", json!("movie"))?;
//! # Ok(())
//! # }
//! ```

pub mod compose;
pub mod error;
pub mod expr;
pub mod form;
pub mod inject;
pub mod node;
pub mod pointer;
pub mod schema;
pub mod validator;

// Re-export commonly used types for convenience
pub use compose::{BranchState, SchemaFingerprint};
pub use error::{
    BranchError, ExpressionError, FormError, FormResult, InjectionError, SchemaError,
};
pub use form::{Form, FormBuilder};
pub use inject::{InjectionScope, Injector};
pub use node::{NodeArena, NodeId, SchemaNode};
pub use pointer::JsonPointer;
pub use schema::{NormalizedSchema, SchemaArena, SchemaType};
pub use validator::{CompiledSchema, ConstraintValidator, ValidationIssue, Validator};
