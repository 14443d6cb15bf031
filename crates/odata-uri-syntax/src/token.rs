//! Query option expression token trees
//!
//! Tokens are produced by an external lexer/parser from `$filter`,
//! `$orderby` and friends. They are purely syntactic: a [`QueryToken::Path`]
//! may turn out to be a property, a navigation, a range variable or a type
//! cast once bound against the schema.

use crate::{BinaryOperator, LambdaKind, UnaryOperator};

pub type BoxToken = Box<QueryToken>;

/// A literal as written, with an optional explicit type (typed nulls)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralToken {
    pub text: String,
    pub type_name: Option<String>,
}

/// A function call argument, positional or named (`Fn(p=1)`)
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentToken {
    pub name: Option<String>,
    pub value: QueryToken,
}

/// Expression token tree
#[derive(Debug, Clone, PartialEq)]
pub enum QueryToken {
    Literal(LiteralToken),
    /// `name` relative to `parent`, or to the implicit range variable when
    /// there is no parent. `$it` and `$this` name range variables.
    Path {
        parent: Option<BoxToken>,
        name: String,
    },
    Binary {
        op: BinaryOperator,
        left: BoxToken,
        right: BoxToken,
    },
    Unary {
        op: UnaryOperator,
        operand: BoxToken,
    },
    /// Built-in function or (possibly bound) schema function
    FunctionCall {
        parent: Option<BoxToken>,
        name: String,
        arguments: Vec<ArgumentToken>,
    },
    /// `parent/any(var: body)`; `any()` has neither variable nor body
    Lambda {
        kind: LambdaKind,
        parent: BoxToken,
        variable: Option<String>,
        body: Option<BoxToken>,
    },
    /// `left in right`
    In {
        left: BoxToken,
        right: BoxToken,
    },
    /// Parenthesized collection constant `('a','b')`
    List(Vec<QueryToken>),
}

impl QueryToken {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(LiteralToken {
            text: text.into(),
            type_name: None,
        })
    }

    pub fn typed_null(type_name: impl Into<String>) -> Self {
        Self::Literal(LiteralToken {
            text: "null".to_string(),
            type_name: Some(type_name.into()),
        })
    }

    /// Identifier relative to the implicit range variable
    pub fn path(name: impl Into<String>) -> Self {
        Self::Path {
            parent: None,
            name: name.into(),
        }
    }

    /// `a/b/c` as nested path tokens
    pub fn path_of(segments: &[&str]) -> Self {
        let mut token: Option<Self> = None;
        for segment in segments {
            token = Some(match token {
                None => Self::path(*segment),
                Some(parent) => parent.member(*segment),
            });
        }
        token.unwrap_or_else(|| Self::path("$it"))
    }

    /// `self/name`
    pub fn member(self, name: impl Into<String>) -> Self {
        Self::Path {
            parent: Some(Box::new(self)),
            name: name.into(),
        }
    }

    pub fn binary(op: BinaryOperator, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, operand: Self) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Self>) -> Self {
        Self::FunctionCall {
            parent: None,
            name: name.into(),
            arguments: arguments
                .into_iter()
                .map(|value| ArgumentToken { name: None, value })
                .collect(),
        }
    }

    /// Bound function call `self/Ns.Fn(name=value,...)`
    pub fn bound_call(self, name: impl Into<String>, arguments: Vec<(&str, Self)>) -> Self {
        Self::FunctionCall {
            parent: Some(Box::new(self)),
            name: name.into(),
            arguments: arguments
                .into_iter()
                .map(|(arg, value)| ArgumentToken {
                    name: Some(arg.to_string()),
                    value,
                })
                .collect(),
        }
    }

    pub fn lambda(self, kind: LambdaKind, variable: impl Into<String>, body: Self) -> Self {
        Self::Lambda {
            kind,
            parent: Box::new(self),
            variable: Some(variable.into()),
            body: Some(Box::new(body)),
        }
    }

    pub fn any(self, variable: impl Into<String>, body: Self) -> Self {
        self.lambda(LambdaKind::Any, variable, body)
    }

    pub fn all(self, variable: impl Into<String>, body: Self) -> Self {
        self.lambda(LambdaKind::All, variable, body)
    }

    pub fn is_in(self, right: Self) -> Self {
        Self::In {
            left: Box::new(self),
            right: Box::new(right),
        }
    }

    /// Number of nested lambdas on the deepest branch
    pub fn lambda_depth(&self) -> usize {
        match self {
            Self::Literal(_) => 0,
            Self::Path { parent, .. } => parent.as_ref().map_or(0, |p| p.lambda_depth()),
            Self::Binary { left, right, .. } | Self::In { left, right } => {
                left.lambda_depth().max(right.lambda_depth())
            }
            Self::Unary { operand, .. } => operand.lambda_depth(),
            Self::FunctionCall { parent, arguments, .. } => arguments
                .iter()
                .map(|a| a.value.lambda_depth())
                .chain(parent.as_ref().map(|p| p.lambda_depth()))
                .max()
                .unwrap_or(0),
            Self::Lambda { parent, body, .. } => parent
                .lambda_depth()
                .max(1 + body.as_ref().map_or(0, |b| b.lambda_depth())),
            Self::List(items) => items.iter().map(Self::lambda_depth).max().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_of() {
        let token = QueryToken::path_of(&["Address", "City"]);
        assert_eq!(token, QueryToken::path("Address").member("City"));
    }

    #[test]
    fn test_lambda_depth() {
        let inner = QueryToken::path("i").member("Qty").any(
            "q",
            QueryToken::binary(BinaryOperator::GreaterThan, QueryToken::path("q"), QueryToken::literal("1")),
        );
        let outer = QueryToken::path("Orders").any("o", inner);
        assert_eq!(outer.lambda_depth(), 2);
        assert_eq!(QueryToken::literal("1").lambda_depth(), 0);
    }
}
