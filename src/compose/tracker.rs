//! Branch state tracking and value-shape reconciliation.
//!
//! On each recomposition the tracker diffs the previous active-branch
//! property set against the new one and decides which values survive:
//! exiting properties are cleared unless a still-active branch (or the base
//! schema) declares them; entering properties are seeded from their schema
//! default, never restored from a previously cleared value.

use super::effective::{BranchSelection, Composition};
use crate::schema::NormalizedSchema;
use log::debug;
use serde_json::Value;
use std::collections::BTreeSet;

/// Lifecycle of a node's branch composition.
///
/// `Unresolved → Resolved(selection, properties) → Resolved(…) → …`;
/// terminal only at node destruction. A oneOf node with zero matching
/// branches returns to `Unresolved`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BranchState {
    /// No branch resolution has happened (or the last one failed)
    #[default]
    Unresolved,
    /// Branches resolved; `properties` is the branch-contributed name set
    Resolved {
        selection: BranchSelection,
        properties: BTreeSet<String>,
    },
}

impl BranchState {
    fn properties(&self) -> Option<&BTreeSet<String>> {
        match self {
            BranchState::Unresolved => None,
            BranchState::Resolved { properties, .. } => Some(properties),
        }
    }
}

/// What one reconciliation pass changed.
#[derive(Debug, Default, PartialEq)]
pub struct Reconciliation {
    /// Property names whose values were cleared
    pub cleared: Vec<String>,
    /// Property names seeded from schema defaults
    pub seeded: Vec<String>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.cleared.is_empty() && self.seeded.is_empty()
    }
}

/// Reconcile a node's value shape after recomposition.
///
/// `base` is the node's base schema (its declared properties are always
/// active and never cleared); `value` is the node's current object value,
/// mutated in place.
pub fn reconcile(
    previous: &BranchState,
    composition: &Composition,
    base: &NormalizedSchema,
    value: &mut Value,
) -> Reconciliation {
    let mut result = Reconciliation::default();
    let empty = BTreeSet::new();
    let prev_props = previous.properties().unwrap_or(&empty);
    let new_props = &composition.branch_properties;

    if let Some(object) = value.as_object_mut() {
        // Exiting: declared by a previously active branch, by no currently
        // active branch, and not by the base schema
        for name in prev_props.difference(new_props) {
            if base.property(name).is_some() {
                continue;
            }
            if object.remove(name).is_some() {
                result.cleared.push(name.clone());
            }
        }
        // Entering: seeded from the schema default only when absent —
        // previously cleared values are never restored
        for name in new_props.difference(prev_props) {
            if object.contains_key(name) {
                continue;
            }
            if let Some(default) = composition
                .effective
                .property(name)
                .and_then(|schema| schema.default.as_ref())
            {
                object.insert(name.clone(), default.clone());
                result.seeded.push(name.clone());
            }
        }
    }

    if !result.is_empty() {
        debug!(
            "branch reconciliation cleared {:?}, seeded {:?}",
            result.cleared, result.seeded
        );
    }
    result
}

/// The branch state recorded after a composition pass.
pub fn next_state(composition: &Composition) -> BranchState {
    let no_selection = composition.selection.one_of.is_none()
        && composition.selection.any_of.is_empty()
        && composition.selection.conditional.is_none();
    if no_selection && composition.branch_properties.is_empty() {
        BranchState::Unresolved
    } else {
        BranchState::Resolved {
            selection: composition.selection.clone(),
            properties: composition.branch_properties.clone(),
        }
    }
}
