//! Conditional composition: if/then/else chains, oneOf/anyOf branch
//! selection, effective-schema merging, and branch-state reconciliation.
//!
//! Composition runs per node on every mutation that intersects the node's
//! dependency set, producing the *effective schema* the tree builder
//! materializes children from.

pub mod branches;
pub mod conditional;
pub mod effective;
pub mod fingerprint;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use effective::{BranchSelection, Composition, compose};
pub use fingerprint::SchemaFingerprint;
pub use tracker::{BranchState, Reconciliation, next_state, reconcile};
