//! End-to-end tests for cross-node value propagation.

mod common;

use formtree::{ConstraintValidator, FormBuilder, InjectionError, InjectionScope};
use serde_json::{Value, json};
use std::cell::Cell;
use std::rc::Rc;

fn user_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "user": {
                "type": "object",
                "properties": {"name": {"type": "string"}},
            },
            "derived": {
                "type": "object",
                "properties": {"fullName": {"type": "string"}},
            },
        },
    })
}

#[test]
fn test_injector_propagates_synchronously_exactly_once() {
    let calls = Rc::new(Cell::new(0u32));
    let seen = Rc::clone(&calls);
    let mut form = FormBuilder::new(user_schema())
        .with_injector("/user/name", move |value: &Value, _scope: &InjectionScope| {
            seen.set(seen.get() + 1);
            let upper = value.as_str().unwrap_or_default().to_uppercase();
            Ok(vec![("/derived/fullName".to_string(), json!(upper))])
        })
        .unwrap()
        .build(ConstraintValidator::new())
        .unwrap();

    form.set_value("/user/name", json!("ada lovelace")).unwrap();

    assert_eq!(form.value()["derived"]["fullName"], json!("ADA LOVELACE"));
    assert_eq!(calls.get(), 1, "handler must fire exactly once per commit");

    form.set_value("/user/name", json!("grace hopper")).unwrap();
    assert_eq!(form.value()["derived"]["fullName"], json!("GRACE HOPPER"));
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_cyclic_injection_is_guarded() {
    let a_calls = Rc::new(Cell::new(0u32));
    let b_calls = Rc::new(Cell::new(0u32));
    let schema = json!({
        "type": "object",
        "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
    });

    let a_seen = Rc::clone(&a_calls);
    let b_seen = Rc::clone(&b_calls);
    let mut form = FormBuilder::new(schema)
        .with_injector("/a", move |value: &Value, _scope: &InjectionScope| {
            a_seen.set(a_seen.get() + 1);
            Ok(vec![("/b".to_string(), value.clone())])
        })
        .unwrap()
        .with_injector("/b", move |value: &Value, _scope: &InjectionScope| {
            b_seen.set(b_seen.get() + 1);
            Ok(vec![("/a".to_string(), value.clone())])
        })
        .unwrap()
        .build(ConstraintValidator::new())
        .unwrap();

    form.set_value("/a", json!(1)).unwrap();

    // a → b propagates; b → a is blocked by the pass guard
    assert_eq!(form.value()["a"], json!(1));
    assert_eq!(form.value()["b"], json!(1));
    assert_eq!(a_calls.get(), 1);
    assert_eq!(b_calls.get(), 1);
}

#[test]
fn test_relative_target_resolution() {
    let schema = json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "nameLength": {"type": "number"},
        },
    });
    let mut form = FormBuilder::new(schema)
        .with_injector("/name", |value: &Value, _scope: &InjectionScope| {
            let length = value.as_str().map(|s| s.chars().count()).unwrap_or(0);
            Ok(vec![("./nameLength".to_string(), json!(length))])
        })
        .unwrap()
        .build(ConstraintValidator::new())
        .unwrap();

    form.set_value("/name", json!("ada")).unwrap();
    assert_eq!(form.value()["nameLength"], json!(3));
}

#[test]
fn test_failed_handler_does_not_abort_commit() {
    let mut form = FormBuilder::new(user_schema())
        .with_injector("/user/name", |_value: &Value, _scope: &InjectionScope| {
            Err(InjectionError::handler_failed("/user/name", "boom"))
        })
        .unwrap()
        .build(ConstraintValidator::new())
        .unwrap();

    form.set_value("/user/name", json!("ada")).unwrap();

    // The originating commit stands; the failure is recorded on the node
    assert_eq!(form.value()["user"]["name"], json!("ada"));
    assert!(
        form.errors("/user/name")
            .iter()
            .any(|e| e.to_string().contains("INJECT_TO"))
    );
}

#[test]
fn test_injection_scope_exposes_surroundings() {
    let captured = Rc::new(Cell::new(false));
    let seen = Rc::clone(&captured);
    let mut form = FormBuilder::new(user_schema())
        .with_context(json!({"tenant": "acme"}))
        .with_injector(
            "/user/name",
            move |_value: &Value, scope: &InjectionScope| {
                assert_eq!(scope.data_path.as_str(), "/user/name");
                assert_eq!(scope.context["tenant"], json!("acme"));
                assert!(scope.root_value.get("user").is_some());
                assert!(scope.parent_value.is_some());
                seen.set(true);
                Ok(vec![])
            },
        )
        .unwrap()
        .build(ConstraintValidator::new())
        .unwrap();

    form.set_value("/user/name", json!("ada")).unwrap();
    assert!(captured.get());
}
