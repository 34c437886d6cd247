//! Tests for tree building and the resolve pass.

use super::builder::{ChangeSet, build_tree, recompute};
use crate::pointer::JsonPointer;
use crate::schema::{SchemaArena, SchemaType, normalize};
use serde_json::{Value, json};
use std::sync::Arc;

fn build(schema: Value, mut value: Value) -> (super::NodeArena, Value) {
    let base = Arc::new(normalize(&schema).expect("Failed to normalize"));
    let arena_schemas = SchemaArena::new(schema);
    let (arena, _) = build_tree(&arena_schemas, base, &mut value).expect("Failed to build");
    (arena, value)
}

fn ptr(path: &str) -> JsonPointer {
    JsonPointer::parse(path).unwrap()
}

#[test]
fn test_object_tree_with_defaults() {
    let (arena, value) = build(
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "default": "anonymous"},
                "age": {"type": "integer"},
            },
            "required": ["name"],
        }),
        Value::Null,
    );

    assert_eq!(value, json!({"name": "anonymous"}));
    let name = arena.node_at(&ptr("/name")).expect("missing node");
    assert!(name.required);
    assert_eq!(name.value, json!("anonymous"));
    let age = arena.node_at(&ptr("/age")).expect("missing node");
    assert!(!age.required);
    assert_eq!(age.value, Value::Null);
}

#[test]
fn test_explicit_value_beats_default() {
    let (arena, _) = build(
        json!({
            "type": "object",
            "properties": {"name": {"type": "string", "default": "anonymous"}},
        }),
        json!({"name": "ada"}),
    );
    assert_eq!(arena.node_at(&ptr("/name")).unwrap().value, json!("ada"));
}

#[test]
fn test_tuple_array_seeded_from_min_items() {
    let (arena, value) = build(
        json!({
            "type": "array",
            "prefixItems": [
                {"type": "string", "default": "label"},
                {"type": "number", "default": 7},
                {"type": "boolean", "default": false},
            ],
            "items": false,
            "minItems": 3,
        }),
        Value::Null,
    );

    assert_eq!(value, json!(["label", 7, false]));
    assert_eq!(arena.node_at(&ptr("/0")).unwrap().value, json!("label"));
    assert_eq!(
        arena.node_at(&ptr("/1")).unwrap().base.schema_type,
        Some(SchemaType::Number)
    );
    assert!(arena.node_at(&ptr("/3")).is_none());
}

#[test]
fn test_open_tuple_continuation_schema() {
    let (arena, _) = build(
        json!({
            "type": "array",
            "prefixItems": [{"type": "string"}],
            "items": {"type": "number"},
        }),
        json!(["head", 1, 2]),
    );
    assert_eq!(
        arena.node_at(&ptr("/0")).unwrap().base.schema_type,
        Some(SchemaType::String)
    );
    assert_eq!(
        arena.node_at(&ptr("/2")).unwrap().base.schema_type,
        Some(SchemaType::Number)
    );
}

#[test]
fn test_bounded_tuple_truncates_excess_values() {
    let (arena, value) = build(
        json!({
            "type": "array",
            "prefixItems": [{"type": "string"}],
            "items": false,
        }),
        json!(["ok", "excess"]),
    );
    assert_eq!(value, json!(["ok"]));
    let root = arena.node_at(&JsonPointer::root()).unwrap();
    assert!(
        root.errors
            .iter()
            .any(|e| matches!(e, crate::error::FormError::TupleBound { .. }))
    );
}

#[test]
fn test_terminal_array_is_opaque_leaf() {
    let (arena, _) = build(
        json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "terminal": true, "items": {"type": "string"}},
            },
        }),
        json!({"tags": ["a", "b"]}),
    );
    let tags = arena.node_at(&ptr("/tags")).unwrap();
    assert_eq!(tags.value, json!(["a", "b"]));
    assert!(tags.children.is_empty());
    assert!(arena.node_at(&ptr("/tags/0")).is_none());
}

#[test]
fn test_virtual_node_composes_sibling_values() {
    let (arena, value) = build(
        json!({
            "type": "object",
            "properties": {
                "startDate": {"type": "string", "default": "2026-01-01"},
                "endDate": {"type": "string", "default": "2026-12-31"},
            },
            "virtual": {"period": {"fields": ["startDate", "endDate"]}},
        }),
        Value::Null,
    );

    let period = arena.node_at(&ptr("/period")).expect("missing virtual node");
    assert_eq!(period.base.schema_type, Some(SchemaType::Virtual));
    assert_eq!(period.value, json!(["2026-01-01", "2026-12-31"]));
    // The composite is derived; the value tree keeps only the real fields
    assert_eq!(
        value,
        json!({"startDate": "2026-01-01", "endDate": "2026-12-31"})
    );
}

#[test]
fn test_active_expression_prunes_subtree() {
    let schema = json!({
        "type": "object",
        "properties": {
            "advanced": {"type": "boolean", "default": false},
            "tuning": {
                "type": "object",
                "&active": "./advanced === true",
                "properties": {"level": {"type": "number", "default": 1}},
            },
        },
    });
    let base = Arc::new(normalize(&schema).unwrap());
    let schemas = SchemaArena::new(schema);
    let mut value = Value::Null;
    let (mut arena, _) = build_tree(&schemas, base, &mut value).unwrap();

    let tuning = arena.node_at(&ptr("/tuning")).unwrap();
    assert!(!tuning.active);
    assert!(tuning.children.is_empty());
    assert_eq!(value, json!({"advanced": false}));

    // Enabling the switch reactivates the subtree through the watch set
    ptr("/advanced").assign(&mut value, json!(true)).unwrap();
    recompute(
        &mut arena,
        &schemas,
        &mut value,
        &ChangeSet::single(ptr("/advanced")),
        false,
    )
    .unwrap();

    let tuning = arena.node_at(&ptr("/tuning")).unwrap();
    assert!(tuning.active);
    assert_eq!(value["tuning"], json!({"level": 1}));
    assert!(arena.node_at(&ptr("/tuning/level")).is_some());
}

#[test]
fn test_recursive_ref_bounded_by_value_depth() {
    let schema = json!({
        "type": "object",
        "properties": {
            "label": {"type": "string"},
            "left": {"$ref": "#"},
            "right": {"$ref": "#"},
        },
    });
    let (arena, _) = build(
        schema,
        json!({
            "label": "root",
            "left": {"label": "child"},
        }),
    );

    // Materialization follows the value: absent branches stay childless
    assert!(arena.node_at(&ptr("/left/label")).is_some());
    assert!(arena.node_at(&ptr("/left/left")).is_some());
    assert!(arena.node_at(&ptr("/left/left/label")).is_none());
    assert!(arena.node_at(&ptr("/right")).is_some());
    assert!(arena.node_at(&ptr("/right/label")).is_none());
}

#[test]
fn test_untouched_subtree_is_skipped() {
    let schema = json!({
        "type": "object",
        "properties": {
            "a": {"type": "object", "properties": {"x": {"type": "string"}}},
            "b": {"type": "object", "properties": {"y": {"type": "string"}}},
        },
    });
    let base = Arc::new(normalize(&schema).unwrap());
    let schemas = SchemaArena::new(schema);
    let mut value = json!({"a": {"x": "1"}, "b": {"y": "2"}});
    let (mut arena, _) = build_tree(&schemas, base, &mut value).unwrap();

    ptr("/a/x").assign(&mut value, json!("updated")).unwrap();
    let committed = recompute(
        &mut arena,
        &schemas,
        &mut value,
        &ChangeSet::single(ptr("/a/x")),
        false,
    )
    .unwrap();

    assert!(committed.contains(&ptr("/a/x")));
    assert!(committed.iter().all(|p| !ptr("/b").contains(p)));
    // The untouched sibling kept its cached value
    assert_eq!(arena.node_at(&ptr("/b/y")).unwrap().value, json!("2"));
}

#[test]
fn test_path_index_tracks_prune() {
    let schema = json!({
        "type": "object",
        "properties": {"mode": {"type": "string"}},
        "oneOf": [
            {
                "properties": {
                    "mode": {"const": "a"},
                    "onlyA": {"type": "string", "default": "present"},
                },
            },
            {
                "properties": {
                    "mode": {"const": "b"},
                    "onlyB": {"type": "string"},
                },
            },
        ],
    });
    let base = Arc::new(normalize(&schema).unwrap());
    let schemas = SchemaArena::new(schema);
    let mut value = json!({"mode": "a"});
    let (mut arena, _) = build_tree(&schemas, base, &mut value).unwrap();
    assert!(arena.node_at(&ptr("/onlyA")).is_some());

    ptr("/mode").assign(&mut value, json!("b")).unwrap();
    recompute(
        &mut arena,
        &schemas,
        &mut value,
        &ChangeSet::single(ptr("/mode")),
        false,
    )
    .unwrap();

    assert!(arena.node_at(&ptr("/onlyA")).is_none());
    assert!(arena.node_at(&ptr("/onlyB")).is_some());
    assert_eq!(value, json!({"mode": "b"}));
}
