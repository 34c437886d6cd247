//! The runtime node tree.
//!
//! Nodes live in an arena of slots keyed by stable JSON-Pointer path;
//! deactivation tombstones a slot instead of deep-freeing parent/child
//! references. The builder materializes children from each node's effective
//! schema and the current value, and the resolve pass recomputes flags,
//! composition, and value shape on every relevant mutation.

pub mod arena;
pub mod builder;
pub mod core;

#[cfg(test)]
mod tests;

pub use arena::{NodeArena, NodeId};
pub use builder::{ChangeSet, build_tree, recompute};
pub use core::SchemaNode;
