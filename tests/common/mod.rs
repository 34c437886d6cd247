//! Common fixtures for form resolution testing.

#![allow(dead_code)]

use formtree::{ConstraintValidator, Form, FormBuilder};
use serde_json::{Value, json};

/// Product form: category-keyed if/then/else chain over required fields.
pub fn product_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "category": {"type": "string", "enum": ["movie", "game", "etc"], "default": "etc"},
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
    })
}

/// Employment form: oneOf branches keyed by employmentType consts.
pub fn employment_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "employmentType": {
                "type": "string",
                "enum": ["full_time", "part_time", "contractor"],
            },
        },
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
                    "workingHours": {"type": "number", "default": 20},
                },
            },
            {
                "properties": {
                    "employmentType": {"const": "contractor"},
                    "agency": {"type": "string"},
                },
            },
        ],
    })
}

/// Feature toggles: anyOf branches gated by boolean switches.
pub fn features_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "enableFeatureA": {"type": "boolean", "default": false},
            "enableFeatureB": {"type": "boolean", "default": false},
        },
        "anyOf": [
            {
                "&if": "./enableFeatureA === true",
                "properties": {
                    "featureAConfig": {"type": "object", "default": {"mode": "standard"}},
                },
            },
            {
                "&if": "./enableFeatureB === true",
                "properties": {
                    "featureBConfig": {"type": "object", "default": {"mode": "standard"}},
                },
            },
        ],
    })
}

/// Fixed tuple: three positions with defaults, growth disallowed.
pub fn tuple_schema() -> Value {
    json!({
        "type": "array",
        "prefixItems": [
            {"type": "string", "default": "label"},
            {"type": "number", "default": 0},
            {"type": "boolean", "default": false},
        ],
        "items": false,
        "minItems": 3,
    })
}

pub fn build_form(schema: Value) -> Form<ConstraintValidator> {
    FormBuilder::new(schema)
        .build(ConstraintValidator::new())
        .expect("Failed to build form")
}

pub fn build_form_with_value(schema: Value, value: Value) -> Form<ConstraintValidator> {
    FormBuilder::new(schema)
        .with_value(value)
        .build(ConstraintValidator::new())
        .expect("Failed to build form")
}
