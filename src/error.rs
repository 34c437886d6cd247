//! Error types for form resolution operations.
//!
//! This module provides comprehensive error handling for schema normalization,
//! expression evaluation, branch composition, and value injection, following
//! Rust's error handling best practices with detailed error information.

/// Main error type for form resolution operations.
///
/// This enum covers all possible error conditions that can occur while
/// building or recomputing a form tree, providing detailed context for
/// each error type.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// Schema normalization or reference resolution failed
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// An expression could not be parsed or evaluated
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// Branch selection failed for a oneOf node
    #[error("Branch error: {0}")]
    Branch(#[from] BranchError),

    /// A value injector handler failed or targeted an invalid path
    #[error("Injection error: {0}")]
    Injection(#[from] InjectionError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed JSON Pointer syntax
    #[error("Invalid JSON Pointer: {pointer}")]
    PointerSyntax { pointer: String },

    /// No node exists at the requested path
    #[error("No node at path: {path}")]
    NodeNotFound { path: String },

    /// A tuple array write exceeded its fixed bound
    #[error("Array at '{path}' is bounded to {bound} items, index {index} rejected")]
    TupleBound {
        path: String,
        bound: usize,
        index: usize,
    },

    /// Internal invariant violation
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised while normalizing a schema document.
///
/// These occur when the raw schema is structurally unusable: a `$ref` points
/// nowhere, a composition branch contradicts its parent, or the document is
/// not a schema at all. They are surfaced per-node so sibling subtrees keep
/// functioning.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    /// A `$ref` target is missing from `$defs`
    #[error("Unresolved $ref: {reference}")]
    UnresolvedRef { reference: String },

    /// A oneOf/anyOf branch declares a type conflicting with its parent
    #[error(
        "Branch {index} declares type '{branch_type}' conflicting with parent type '{parent_type}'"
    )]
    BranchTypeConflict {
        index: usize,
        branch_type: String,
        parent_type: String,
    },

    /// The schema document itself is malformed
    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    /// Unknown `type` keyword value
    #[error("Unknown schema type: {type_name}")]
    UnknownType { type_name: String },
}

/// Errors raised by the expression lexer, parser, or evaluator.
///
/// Expression failures are fail-closed: the owning condition evaluates as
/// inactive and the error is recorded on the node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    /// Unexpected character during lexing
    #[error("Unexpected character '{found}' at offset {offset} in expression")]
    UnexpectedCharacter { found: char, offset: usize },

    /// Unterminated string literal
    #[error("Unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    /// Parser encountered an unexpected token
    #[error("Unexpected token '{found}' in expression, expected {expected}")]
    UnexpectedToken { found: String, expected: String },

    /// Expression ended prematurely
    #[error("Unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },

    /// Operands cannot be ordered (non-numeric, non-string comparison)
    #[error("Cannot compare {lhs_type} with {rhs_type} using '{operator}'")]
    IncomparableOperands {
        operator: String,
        lhs_type: String,
        rhs_type: String,
    },

    /// A relative reference escaped above the tree root
    #[error("Relative reference '{reference}' escapes above the root")]
    ReferenceAboveRoot { reference: String },
}

/// Errors raised during oneOf branch selection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BranchError {
    /// No oneOf branch predicate matched the current value
    #[error("No oneOf branch matched at '{path}'")]
    NoBranchMatched { path: String },
}

/// Errors raised while running value injector handlers.
///
/// These are caught at the propagation call site and never abort the
/// originating commit.
#[derive(Debug, thiserror::Error)]
pub enum InjectionError {
    /// The handler itself returned an error
    #[error("[INJECT_TO] injector at '{path}' failed: {message}")]
    HandlerFailed { path: String, message: String },

    /// The handler produced a target path that does not resolve
    #[error("[INJECT_TO] injector at '{path}' targeted invalid path '{target}'")]
    InvalidTarget { path: String, target: String },
}

// Convenience methods for creating common errors
impl FormError {
    /// Create a node-not-found error
    pub fn node_not_found(path: impl Into<String>) -> Self {
        Self::NodeNotFound { path: path.into() }
    }

    /// Create a pointer syntax error
    pub fn pointer_syntax(pointer: impl Into<String>) -> Self {
        Self::PointerSyntax {
            pointer: pointer.into(),
        }
    }

    /// Create an internal invariant error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl SchemaError {
    /// Create an unresolved reference error
    pub fn unresolved_ref(reference: impl Into<String>) -> Self {
        Self::UnresolvedRef {
            reference: reference.into(),
        }
    }

    /// Create a malformed schema error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }
}

impl InjectionError {
    /// Wrap a handler failure
    pub fn handler_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HandlerFailed {
            path: path.into(),
            message: message.into(),
        }
    }
}

// Result type aliases for convenience
pub type FormResult<T> = Result<T, FormError>;
pub type SchemaResult<T> = Result<T, SchemaError>;
pub type ExprResult<T> = Result<T, ExpressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = FormError::node_not_found("/user/name");
        assert!(error.to_string().contains("/user/name"));
    }

    #[test]
    fn test_schema_error_chain() {
        let schema_error = SchemaError::unresolved_ref("#/$defs/missing");
        let form_error = FormError::from(schema_error);
        assert!(form_error.to_string().contains("Schema error"));
        assert!(form_error.to_string().contains("#/$defs/missing"));
    }

    #[test]
    fn test_injection_error_tag() {
        let error = InjectionError::handler_failed("/user/name", "boom");
        assert!(error.to_string().contains("INJECT_TO"));
    }
}
