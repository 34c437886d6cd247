//! The if/then/else chain walker.

use crate::schema::NormalizedSchema;
use serde_json::Value;

/// Outcome of walking an if/then/else chain.
#[derive(Debug)]
pub struct ChainOutcome<'s> {
    /// The contribution to merge, if any link matched or a fallback exists
    pub contribution: Option<&'s NormalizedSchema>,
    /// Zero-based index of the matched `if` link; `None` when the fallback
    /// `else` (or nothing) applied
    pub matched_link: Option<usize>,
}

/// Walk a possibly chained `if/then/else.if/…/else` sequence.
///
/// A link matches when every const/enum property constraint in its `if`
/// sub-schema holds against `value` and every listed `required` property is
/// present. First match wins; an unmatched chain falls back to the deepest
/// `else` when present.
pub fn walk_chain<'s>(schema: &'s NormalizedSchema, value: &Value) -> ChainOutcome<'s> {
    let mut current = schema;
    let mut link = 0usize;
    loop {
        let Some(if_schema) = current.if_schema.as_deref() else {
            return ChainOutcome {
                contribution: None,
                matched_link: None,
            };
        };
        if constraints_hold(if_schema, value) {
            return ChainOutcome {
                contribution: current.then_schema.as_deref(),
                matched_link: Some(link),
            };
        }
        match current.else_schema.as_deref() {
            // A nested `if` continues the chain
            Some(else_schema) if else_schema.if_schema.is_some() => {
                current = else_schema;
                link += 1;
            }
            Some(else_schema) => {
                return ChainOutcome {
                    contribution: Some(else_schema),
                    matched_link: None,
                };
            }
            None => {
                return ChainOutcome {
                    contribution: None,
                    matched_link: None,
                };
            }
        }
    }
}

/// Whether a predicate sub-schema's property constraints hold against a
/// value object.
pub fn constraints_hold(predicate: &NormalizedSchema, value: &Value) -> bool {
    let object = value.as_object();
    for name in &predicate.required {
        if object.and_then(|map| map.get(name)).is_none() {
            return false;
        }
    }
    for (name, constraint) in &predicate.properties {
        let current = object.and_then(|map| map.get(name));
        if let Some(expected) = &constraint.const_value {
            match current {
                Some(actual) if values_equal(actual, expected) => {}
                _ => return false,
            }
        }
        if let Some(allowed) = &constraint.enum_values {
            match current {
                Some(actual) if allowed.iter().any(|v| values_equal(actual, v)) => {}
                _ => return false,
            }
        }
    }
    true
}

/// Whether a branch schema carries any implicit predicate at all.
pub fn has_value_constraints(predicate: &NormalizedSchema) -> bool {
    !predicate.required.is_empty()
        || predicate
            .properties
            .iter()
            .any(|(_, p)| p.const_value.is_some() || p.enum_values.is_some())
}

/// Equality with numeric widening, matching the expression evaluator.
pub fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => lhs == rhs,
    }
}
