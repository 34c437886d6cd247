//! oneOf/anyOf branch predicate evaluation and selection.

use super::conditional::{constraints_hold, has_value_constraints};
use crate::error::{BranchError, FormError};
use crate::expr::{ValueLookup, evaluate_bool};
use crate::pointer::JsonPointer;
use crate::schema::NormalizedSchema;
use log::warn;
use serde_json::Value;

/// Whether one branch's activation predicate holds.
///
/// An explicit `&if`/`computed.if` expression takes precedence; otherwise
/// every const/enum-constrained property in the branch must match the
/// current value (implicit predicate). A branch with no predicate at all is
/// vacuously active, giving declaration-ordered fallback semantics.
///
/// Expression failures are fail-closed: the branch is inactive and the error
/// is reported through `errors`.
pub fn branch_active(
    branch: &NormalizedSchema,
    scope: &JsonPointer,
    value: &Value,
    lookup: &dyn ValueLookup,
    errors: &mut Vec<FormError>,
) -> bool {
    if let Some(condition) = &branch.computed.condition {
        return match &condition.compiled {
            Ok(expr) => match evaluate_bool(expr, scope, lookup) {
                Ok(active) => active,
                Err(error) => {
                    warn!(
                        "branch predicate '{}' at '{}' failed closed: {}",
                        condition.source, scope, error
                    );
                    errors.push(error.into());
                    false
                }
            },
            Err(parse_error) => {
                warn!(
                    "branch predicate '{}' at '{}' did not compile, failing closed",
                    condition.source, scope
                );
                errors.push(parse_error.clone().into());
                false
            }
        };
    }
    if has_value_constraints(branch) {
        return constraints_hold(branch, value);
    }
    true
}

/// Select the active oneOf branch: declaration order, first match wins.
///
/// Returns `None` with a recorded [`BranchError`] when nothing matches.
/// Multiple nominal matches resolve to the first-declared branch with a
/// diagnostic.
pub fn select_one_of(
    branches: &[NormalizedSchema],
    scope: &JsonPointer,
    value: &Value,
    lookup: &dyn ValueLookup,
    errors: &mut Vec<FormError>,
) -> Option<usize> {
    let mut selected = None;
    for (index, branch) in branches.iter().enumerate() {
        if branch_active(branch, scope, value, lookup, errors) {
            match selected {
                None => selected = Some(index),
                Some(first) => {
                    warn!(
                        "oneOf at '{}': branches {} and {} both match, keeping {}",
                        scope, first, index, first
                    );
                }
            }
        }
    }
    if selected.is_none() {
        errors.push(
            BranchError::NoBranchMatched {
                path: scope.to_string(),
            }
            .into(),
        );
    }
    selected
}

/// The active anyOf subset: every branch evaluated independently.
pub fn select_any_of(
    branches: &[NormalizedSchema],
    scope: &JsonPointer,
    value: &Value,
    lookup: &dyn ValueLookup,
    errors: &mut Vec<FormError>,
) -> Vec<usize> {
    branches
        .iter()
        .enumerate()
        .filter(|(_, branch)| branch_active(branch, scope, value, lookup, errors))
        .map(|(index, _)| index)
        .collect()
}
