//! Effective-schema assembly.
//!
//! The effective schema of a node is its base schema with every currently
//! matching contribution merged in: unconditional `allOf` members, the
//! matched if/then/else link, the selected oneOf branch, and the union of
//! active anyOf branches.

use super::branches::{select_any_of, select_one_of};
use super::conditional::walk_chain;
use crate::error::FormError;
use crate::expr::ValueLookup;
use crate::pointer::JsonPointer;
use crate::schema::NormalizedSchema;
use log::debug;
use serde_json::Value;
use std::collections::BTreeSet;

/// The branch choices made during one composition pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchSelection {
    /// Selected oneOf branch, if any matched
    pub one_of: Option<usize>,
    /// Active anyOf subset in declaration order
    pub any_of: Vec<usize>,
    /// Matched if/then/else chain link
    pub conditional: Option<usize>,
}

/// Result of composing one node's effective schema.
#[derive(Debug)]
pub struct Composition {
    /// The merged effective schema
    pub effective: NormalizedSchema,
    /// Branch choices backing the merge
    pub selection: BranchSelection,
    /// Property names contributed by currently active branches; the branch
    /// state tracker reconciles value shape against this set
    pub branch_properties: BTreeSet<String>,
    /// Non-fatal errors surfaced during composition
    pub errors: Vec<FormError>,
}

/// Compose the effective schema for a node.
///
/// `scope` is the node's own path (branch predicates resolve `./x` against
/// the node's properties); `value` is the node's current value; `lookup`
/// resolves absolute and parent-scope references.
pub fn compose(
    base: &NormalizedSchema,
    scope: &JsonPointer,
    value: &Value,
    lookup: &dyn ValueLookup,
) -> Composition {
    let mut errors = Vec::new();
    let mut selection = BranchSelection::default();
    let mut branch_properties = BTreeSet::new();

    let mut effective = strip_composition(base);

    // allOf members apply unconditionally, before any conditional input
    for member in &base.all_of {
        merge_into(&mut effective, member);
    }

    if base.if_schema.is_some() {
        let outcome = walk_chain(base, value);
        selection.conditional = outcome.matched_link;
        if let Some(contribution) = outcome.contribution {
            record_properties(&mut branch_properties, contribution);
            merge_into(&mut effective, contribution);
        }
    }

    if !base.one_of.is_empty() {
        selection.one_of = select_one_of(&base.one_of, scope, value, lookup, &mut errors);
        if let Some(index) = selection.one_of {
            let branch = &base.one_of[index];
            debug!("oneOf at '{}' selected branch {}", scope, index);
            record_properties(&mut branch_properties, branch);
            merge_into(&mut effective, branch);
        }
    }

    if !base.any_of.is_empty() {
        selection.any_of = select_any_of(&base.any_of, scope, value, lookup, &mut errors);
        for &index in &selection.any_of {
            let branch = &base.any_of[index];
            record_properties(&mut branch_properties, branch);
            // Conflicting property definitions across simultaneously active
            // branches resolve last-declaration-wins
            merge_into(&mut effective, branch);
        }
    }

    dedup_required(&mut effective.required);

    Composition {
        effective,
        selection,
        branch_properties,
        errors,
    }
}

/// The base schema with composition keywords removed; merge targets start
/// from here.
fn strip_composition(base: &NormalizedSchema) -> NormalizedSchema {
    let mut stripped = base.clone();
    stripped.if_schema = None;
    stripped.then_schema = None;
    stripped.else_schema = None;
    stripped.all_of = Vec::new();
    stripped.any_of = Vec::new();
    stripped.one_of = Vec::new();
    stripped
}

/// Merge one contribution into the effective schema.
///
/// Properties replace by name (last declaration wins), `required` is
/// concatenated, scalar facets fill empty slots only.
fn merge_into(effective: &mut NormalizedSchema, contribution: &NormalizedSchema) {
    for (name, schema) in &contribution.properties {
        match effective
            .properties
            .iter_mut()
            .find(|(existing, _)| existing == name)
        {
            Some((_, slot)) => *slot = schema.clone(),
            None => effective.properties.push((name.clone(), schema.clone())),
        }
    }
    effective
        .required
        .extend(contribution.required.iter().cloned());
    if effective.schema_type.is_none() {
        effective.schema_type = contribution.schema_type;
    }
    if effective.default.is_none() {
        effective.default = contribution.default.clone();
    }
    if effective.const_value.is_none() {
        effective.const_value = contribution.const_value.clone();
    }
    if effective.enum_values.is_none() {
        effective.enum_values = contribution.enum_values.clone();
    }
    if effective.prefix_items.is_empty() {
        effective.prefix_items = contribution.prefix_items.clone();
    }
    if matches!(effective.items, crate::schema::ItemsPolicy::Unspecified) {
        effective.items = contribution.items.clone();
    }
    if effective.property_keys.is_empty() {
        effective.property_keys = contribution.property_keys.clone();
    }
    let c = &mut effective.constraints;
    let s = &contribution.constraints;
    c.minimum = c.minimum.or(s.minimum);
    c.maximum = c.maximum.or(s.maximum);
    c.min_length = c.min_length.or(s.min_length);
    c.max_length = c.max_length.or(s.max_length);
    c.min_items = c.min_items.or(s.min_items);
    c.max_items = c.max_items.or(s.max_items);
    if c.format.is_none() {
        c.format = s.format.clone();
    }
    if c.pattern.is_none() {
        c.pattern = s.pattern.clone();
    }
}

fn record_properties(out: &mut BTreeSet<String>, contribution: &NormalizedSchema) {
    for (name, _) in &contribution.properties {
        out.insert(name.clone());
    }
}

fn dedup_required(required: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    required.retain(|name| seen.insert(name.clone()));
}
