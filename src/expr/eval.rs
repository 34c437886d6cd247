//! Expression evaluation against a value-lookup context.

use super::ast::{BinaryOp, Expr, LogicalOp};
use crate::error::{ExprResult, ExpressionError};
use crate::pointer::JsonPointer;
use serde_json::Value;

/// Resolves absolute pointers to current node values.
///
/// The node arena implements this; tests can implement it over a plain
/// `serde_json::Value`.
pub trait ValueLookup {
    /// The value at `pointer`, or `None` when no node holds one.
    fn value_at(&self, pointer: &JsonPointer) -> Option<Value>;
}

impl ValueLookup for Value {
    fn value_at(&self, pointer: &JsonPointer) -> Option<Value> {
        pointer.lookup(self).cloned()
    }
}

/// Evaluate an expression to a JSON value.
///
/// `scope` is the enclosing object path that bare/`./` references resolve
/// against. Missing referenced values evaluate to `null`.
pub fn evaluate(expr: &Expr, scope: &JsonPointer, lookup: &dyn ValueLookup) -> ExprResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(path) => {
            let pointer = path.resolve(scope)?;
            Ok(lookup.value_at(&pointer).unwrap_or(Value::Null))
        }
        Expr::Not(inner) => {
            let value = evaluate(inner, scope, lookup)?;
            Ok(Value::Bool(!truthy(&value)))
        }
        Expr::Logical { op, lhs, rhs } => {
            let left = truthy(&evaluate(lhs, scope, lookup)?);
            let result = match op {
                LogicalOp::And => left && truthy(&evaluate(rhs, scope, lookup)?),
                LogicalOp::Or => left || truthy(&evaluate(rhs, scope, lookup)?),
            };
            Ok(Value::Bool(result))
        }
        Expr::Binary { op, lhs, rhs } => {
            let left = evaluate(lhs, scope, lookup)?;
            let right = evaluate(rhs, scope, lookup)?;
            compare(*op, &left, &right).map(Value::Bool)
        }
    }
}

/// Evaluate an expression as a boolean condition.
pub fn evaluate_bool(
    expr: &Expr,
    scope: &JsonPointer,
    lookup: &dyn ValueLookup,
) -> ExprResult<bool> {
    Ok(truthy(&evaluate(expr, scope, lookup)?))
}

/// JS-style truthiness over JSON values.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> ExprResult<bool> {
    match op {
        BinaryOp::Eq => Ok(loose_eq(lhs, rhs)),
        BinaryOp::Ne => Ok(!loose_eq(lhs, rhs)),
        BinaryOp::Gt | BinaryOp::Lt | BinaryOp::Ge | BinaryOp::Le => {
            let ordering = order(lhs, rhs).ok_or_else(|| {
                ExpressionError::IncomparableOperands {
                    operator: op.as_str().to_string(),
                    lhs_type: type_name(lhs).to_string(),
                    rhs_type: type_name(rhs).to_string(),
                }
            })?;
            Ok(match op {
                BinaryOp::Gt => ordering == std::cmp::Ordering::Greater,
                BinaryOp::Lt => ordering == std::cmp::Ordering::Less,
                BinaryOp::Ge => ordering != std::cmp::Ordering::Less,
                BinaryOp::Le => ordering != std::cmp::Ordering::Greater,
                _ => unreachable!(),
            })
        }
    }
}

/// Deep equality with numeric widening, so `1` and `1.0` compare equal.
fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => lhs == rhs,
    }
}

fn order(lhs: &Value, rhs: &Value) -> Option<std::cmp::Ordering> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
