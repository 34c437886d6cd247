//! Tests for branch composition and value-shape reconciliation.

use super::effective::compose;
use super::fingerprint::SchemaFingerprint;
use super::tracker::{BranchState, next_state, reconcile};
use crate::error::FormError;
use crate::pointer::JsonPointer;
use crate::schema::normalize;
use serde_json::json;

fn root() -> JsonPointer {
    JsonPointer::root()
}

#[test]
fn test_if_then_else_chain_first_match_wins() {
    let schema = normalize(&json!({
        "type": "object",
        "properties": {
            "category": {"type": "string", "enum": ["movie", "game", "other"]},
            "title": {"type": "string"},
            "openingDate": {"type": "string"},
            "price": {"type": "number"},
            "releaseDate": {"type": "string"},
            "numOfPlayers": {"type": "number"},
        },
        "required": ["title"],
        "if": {"properties": {"category": {"const": "movie"}}},
        "then": {"required": ["openingDate", "price"]},
        "else": {
            "if": {"properties": {"category": {"const": "game"}}},
            "then": {"required": ["releaseDate", "numOfPlayers"]},
        },
    }))
    .unwrap();

    let movie = json!({"category": "movie", "title": "Dune"});
    let composition = compose(&schema, &root(), &movie, &movie);
    assert_eq!(composition.selection.conditional, Some(0));
    assert_eq!(
        composition.effective.required,
        vec!["title", "openingDate", "price"]
    );

    let game = json!({"category": "game", "title": "Myst"});
    let composition = compose(&schema, &root(), &game, &game);
    assert_eq!(composition.selection.conditional, Some(1));
    assert_eq!(
        composition.effective.required,
        vec!["title", "releaseDate", "numOfPlayers"]
    );

    let other = json!({"category": "other", "title": "?"});
    let composition = compose(&schema, &root(), &other, &other);
    assert_eq!(composition.selection.conditional, None);
    assert_eq!(composition.effective.required, vec!["title"]);
}

#[test]
fn test_one_of_implicit_const_predicate() {
    let schema = normalize(&json!({
        "type": "object",
        "properties": {"employmentType": {"type": "string"}},
        "oneOf": [
            {
                "properties": {
                    "employmentType": {"const": "full_time"},
                    "salary": {"type": "number"},
                },
            },
            {
                "properties": {
                    "employmentType": {"const": "part_time"},
                    "contractType": {"type": "string"},
                    "workingHours": {"type": "number"},
                },
            },
        ],
    }))
    .unwrap();

    let value = json!({"employmentType": "full_time"});
    let composition = compose(&schema, &root(), &value, &value);
    assert_eq!(composition.selection.one_of, Some(0));
    assert!(composition.effective.property("salary").is_some());
    assert!(composition.effective.property("contractType").is_none());
}

#[test]
fn test_one_of_explicit_expression_predicate() {
    let schema = normalize(&json!({
        "type": "object",
        "properties": {"mode": {"type": "string"}},
        "oneOf": [
            {"&if": "./mode === 'simple'", "properties": {"preset": {"type": "string"}}},
            {"&if": "./mode === 'custom'", "properties": {"config": {"type": "object"}}},
        ],
    }))
    .unwrap();

    let value = json!({"mode": "custom"});
    let composition = compose(&schema, &root(), &value, &value);
    assert_eq!(composition.selection.one_of, Some(1));
    assert!(composition.effective.property("config").is_some());
}

#[test]
fn test_one_of_zero_match_is_error_state() {
    let schema = normalize(&json!({
        "type": "object",
        "oneOf": [
            {"properties": {"kind": {"const": "a"}}},
            {"properties": {"kind": {"const": "b"}}},
        ],
    }))
    .unwrap();

    let value = json!({"kind": "c"});
    let composition = compose(&schema, &root(), &value, &value);
    assert_eq!(composition.selection.one_of, None);
    assert!(
        composition
            .errors
            .iter()
            .any(|e| matches!(e, FormError::Branch(_)))
    );
    assert_eq!(next_state(&composition), BranchState::Unresolved);
}

#[test]
fn test_one_of_ambiguous_match_takes_first_declared() {
    let schema = normalize(&json!({
        "type": "object",
        "oneOf": [
            {"properties": {"kind": {"enum": ["a", "b"]}, "first": {"type": "string"}}},
            {"properties": {"kind": {"const": "b"}, "second": {"type": "string"}}},
        ],
    }))
    .unwrap();

    let value = json!({"kind": "b"});
    let composition = compose(&schema, &root(), &value, &value);
    assert_eq!(composition.selection.one_of, Some(0));
    assert!(composition.effective.property("first").is_some());
    assert!(composition.effective.property("second").is_none());
}

#[test]
fn test_any_of_union_and_last_declaration_wins() {
    let schema = normalize(&json!({
        "type": "object",
        "properties": {
            "enableFeatureA": {"type": "boolean"},
            "enableFeatureB": {"type": "boolean"},
        },
        "anyOf": [
            {
                "&if": "./enableFeatureA === true",
                "properties": {
                    "featureAConfig": {"type": "object"},
                    "shared": {"type": "string", "default": "from-a"},
                },
            },
            {
                "&if": "./enableFeatureB === true",
                "properties": {
                    "featureBConfig": {"type": "object"},
                    "shared": {"type": "string", "default": "from-b"},
                },
            },
        ],
    }))
    .unwrap();

    let value = json!({"enableFeatureA": true, "enableFeatureB": true});
    let composition = compose(&schema, &root(), &value, &value);
    assert_eq!(composition.selection.any_of, vec![0, 1]);
    assert!(composition.effective.property("featureAConfig").is_some());
    assert!(composition.effective.property("featureBConfig").is_some());
    // Conflicting 'shared' resolves to the last active declaration
    assert_eq!(
        composition.effective.property("shared").unwrap().default,
        Some(json!("from-b"))
    );

    let value = json!({"enableFeatureA": true, "enableFeatureB": false});
    let composition = compose(&schema, &root(), &value, &value);
    assert_eq!(composition.selection.any_of, vec![0]);
    assert!(composition.effective.property("featureBConfig").is_none());
}

#[test]
fn test_composition_idempotent_fingerprint() {
    let schema = normalize(&json!({
        "type": "object",
        "properties": {"mode": {"type": "string"}},
        "oneOf": [
            {"&if": "./mode === 'a'", "properties": {"x": {"type": "number"}}},
            {"&if": "./mode === 'b'", "properties": {"y": {"type": "number"}}},
        ],
    }))
    .unwrap();

    let value = json!({"mode": "a"});
    let first = compose(&schema, &root(), &value, &value);
    let second = compose(&schema, &root(), &value, &value);
    assert_eq!(first.selection, second.selection);
    assert_eq!(
        SchemaFingerprint::of_schema(&first.effective),
        SchemaFingerprint::of_schema(&second.effective)
    );
}

#[test]
fn test_malformed_branch_expression_fails_closed() {
    let schema = normalize(&json!({
        "type": "object",
        "oneOf": [
            {"&if": "./broken === ", "properties": {"a": {"type": "string"}}},
            {"properties": {"b": {"type": "string"}}},
        ],
    }))
    .unwrap();

    let value = json!({});
    let composition = compose(&schema, &root(), &value, &value);
    // Branch 0 fails closed; the unconstrained branch 1 matches vacuously
    assert_eq!(composition.selection.one_of, Some(1));
    assert!(
        composition
            .errors
            .iter()
            .any(|e| matches!(e, FormError::Expression(_)))
    );
}

#[test]
fn test_reconcile_clears_exited_branch_values() {
    let schema = normalize(&json!({
        "type": "object",
        "properties": {"employmentType": {"type": "string"}},
        "oneOf": [
            {
                "properties": {
                    "employmentType": {"const": "full_time"},
                    "salary": {"type": "number"},
                },
            },
            {
                "properties": {
                    "employmentType": {"const": "part_time"},
                    "contractType": {"type": "string", "default": "hourly"},
                    "workingHours": {"type": "number"},
                },
            },
        ],
    }))
    .unwrap();

    let mut value = json!({"employmentType": "full_time", "salary": 90000});
    let first = compose(&schema, &root(), &value, &value.clone());
    let state = next_state(&first);

    value["employmentType"] = json!("part_time");
    let second = compose(&schema, &root(), &value, &value.clone());
    let reconciliation = reconcile(&state, &second, &schema, &mut value);

    assert_eq!(reconciliation.cleared, vec!["salary"]);
    assert_eq!(reconciliation.seeded, vec!["contractType"]);
    assert_eq!(
        value,
        json!({"employmentType": "part_time", "contractType": "hourly"})
    );
}

#[test]
fn test_reconcile_preserves_property_shared_by_active_branch() {
    let schema = normalize(&json!({
        "type": "object",
        "properties": {"a": {"type": "boolean"}, "b": {"type": "boolean"}},
        "anyOf": [
            {"&if": "./a === true", "properties": {"common": {"type": "string"}}},
            {"&if": "./b === true", "properties": {"common": {"type": "string"}}},
        ],
    }))
    .unwrap();

    let mut value = json!({"a": true, "b": true, "common": "keep-me"});
    let first = compose(&schema, &root(), &value, &value.clone());
    let state = next_state(&first);

    // Branch a exits, branch b still declares 'common'
    value["a"] = json!(false);
    let second = compose(&schema, &root(), &value, &value.clone());
    let reconciliation = reconcile(&state, &second, &schema, &mut value);

    assert!(reconciliation.cleared.is_empty());
    assert_eq!(value["common"], json!("keep-me"));
}

#[test]
fn test_reconcile_never_restores_cleared_value() {
    let schema = normalize(&json!({
        "type": "object",
        "properties": {"on": {"type": "boolean"}},
        "anyOf": [
            {"&if": "./on === true", "properties": {"detail": {"type": "string", "default": "fresh"}}},
        ],
    }))
    .unwrap();

    let mut value = json!({"on": true, "detail": "user-typed"});
    let state = next_state(&compose(&schema, &root(), &value, &value.clone()));

    value["on"] = json!(false);
    let off = compose(&schema, &root(), &value, &value.clone());
    let reconciliation = reconcile(&state, &off, &schema, &mut value);
    assert_eq!(reconciliation.cleared, vec!["detail"]);
    let state = next_state(&off);

    value["on"] = json!(true);
    let on = compose(&schema, &root(), &value, &value.clone());
    let reconciliation = reconcile(&state, &on, &schema, &mut value);
    // Re-entering seeds the schema default, not the cleared user value
    assert_eq!(reconciliation.seeded, vec!["detail"]);
    assert_eq!(value["detail"], json!("fresh"));
}
