//! Schema normalization and reference resolution.
//!
//! This module turns the extended JSON-Schema dialect (conditional keywords,
//! `&`-prefixed aliases, `virtual`/`terminal` extensions) into the canonical
//! [`NormalizedSchema`] form the node tree is built from.
//!
//! # Key Types
//!
//! - [`NormalizedSchema`] - canonical schema after alias flattening
//! - [`SchemaArena`] - memoized lazy `$ref`/`$defs` resolution
//! - [`ComputedSet`] - the flattened `computed{watch,active,visible,if}` block

pub mod normalizer;
pub mod resolver;
pub mod types;


// Re-export the main types for convenience
pub use normalizer::normalize;
pub use resolver::SchemaArena;
pub use types::{
    CompiledExpr, ComputedSet, Constraints, ItemsPolicy, NormalizedSchema, SchemaType,
    VirtualGroup,
};
