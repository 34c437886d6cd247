//! Tagged AST for compiled condition expressions.

use crate::error::{ExprResult, ExpressionError};
use crate::pointer::JsonPointer;
use serde_json::Value;

/// Anchoring of a path reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Absolute from the tree root (`/a/b`)
    Absolute,
    /// Relative to the enclosing scope, ascending `n` levels first.
    /// `./x` and bare `x` are `Relative(0)`; `../x` is `Relative(1)`.
    Relative(usize),
}

/// A path reference inside an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRef {
    pub anchor: Anchor,
    pub segments: Vec<String>,
}

impl PathRef {
    /// Resolve against the enclosing scope to an absolute pointer.
    ///
    /// `scope` is the path of the object whose properties the expression's
    /// bare names refer to.
    pub fn resolve(&self, scope: &JsonPointer) -> ExprResult<JsonPointer> {
        let mut base = match self.anchor {
            Anchor::Absolute => JsonPointer::root(),
            Anchor::Relative(levels) => {
                let mut base = scope.clone();
                for _ in 0..levels {
                    base = base.parent().ok_or_else(|| {
                        ExpressionError::ReferenceAboveRoot {
                            reference: self.to_source(),
                        }
                    })?;
                }
                base
            }
        };
        for segment in &self.segments {
            base = base.child(segment);
        }
        Ok(base)
    }

    /// Reconstruct source text, for diagnostics.
    pub fn to_source(&self) -> String {
        let prefix = match self.anchor {
            Anchor::Absolute => String::from("/"),
            Anchor::Relative(0) => String::from("./"),
            Anchor::Relative(levels) => "../".repeat(levels),
        };
        format!("{}{}", prefix, self.segments.join("/"))
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `===`
    Eq,
    /// `!==`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "===",
            Self::Ne => "!==",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }
}

/// Short-circuiting logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&&`
    And,
    /// `||`
    Or,
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal JSON value
    Literal(Value),
    /// Reference to another node's value
    Path(PathRef),
    /// Logical negation
    Not(Box<Expr>),
    /// Comparison
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Short-circuiting conjunction/disjunction
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Collect every referenced path, resolved against `scope`.
    ///
    /// These become the owning node's watch set, scoping re-evaluation to
    /// mutations that intersect them.
    pub fn watch_paths(&self, scope: &JsonPointer) -> ExprResult<Vec<JsonPointer>> {
        let mut paths = Vec::new();
        self.collect_paths(scope, &mut paths)?;
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn collect_paths(
        &self,
        scope: &JsonPointer,
        out: &mut Vec<JsonPointer>,
    ) -> ExprResult<()> {
        match self {
            Expr::Literal(_) => Ok(()),
            Expr::Path(path) => {
                out.push(path.resolve(scope)?);
                Ok(())
            }
            Expr::Not(inner) => inner.collect_paths(scope, out),
            Expr::Binary { lhs, rhs, .. } | Expr::Logical { lhs, rhs, .. } => {
                lhs.collect_paths(scope, out)?;
                rhs.collect_paths(scope, out)
            }
        }
    }
}
