//! Bound (typed) expression trees produced from query tokens

use indexmap::IndexMap;
use odata_uri_literal::LiteralValue;
use odata_uri_schema::{Operation, PrimitiveKind, PropertyRef, SchemaType, TypeReference};
use odata_uri_syntax::{BinaryOperator, LambdaKind, UnaryOperator};
use std::sync::Arc;

pub type BoxExpr = Box<BoundExpr>;

/// A typed expression node
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    /// Literal constant; an untyped `null` has no type
    Constant {
        value: LiteralValue,
        ty: Option<TypeReference>,
    },
    /// `$it` or a lambda variable
    RangeVariable { name: String, ty: TypeReference },
    /// Declared structural or navigation property
    Property {
        source: BoxExpr,
        property: PropertyRef,
        ty: TypeReference,
    },
    /// Undeclared property of an open type
    DynamicProperty { source: BoxExpr, name: String },
    TypeCast {
        source: BoxExpr,
        ty: TypeReference,
    },
    Binary {
        op: BinaryOperator,
        left: BoxExpr,
        right: BoxExpr,
        ty: TypeReference,
    },
    Unary {
        op: UnaryOperator,
        operand: BoxExpr,
        ty: TypeReference,
    },
    /// Built-in function (`contains`, `year`, `cast`, ...)
    Function {
        name: String,
        arguments: Vec<BoundExpr>,
        ty: TypeReference,
    },
    /// Schema function, bound when `source` is present
    Operation {
        operation: Arc<Operation>,
        source: Option<BoxExpr>,
        arguments: IndexMap<String, BoundExpr>,
        ty: TypeReference,
    },
    Lambda {
        kind: LambdaKind,
        source: BoxExpr,
        variable: Option<String>,
        body: Option<BoxExpr>,
    },
    In { left: BoxExpr, right: BoxExpr },
    Collection {
        items: Vec<BoundExpr>,
        ty: TypeReference,
    },
}

impl BoundExpr {
    /// Static type; `None` for untyped nulls and dynamic properties
    pub fn type_ref(&self) -> Option<TypeReference> {
        match self {
            Self::Constant { ty, .. } => ty.clone(),
            Self::DynamicProperty { .. } => None,
            Self::RangeVariable { ty, .. }
            | Self::Property { ty, .. }
            | Self::TypeCast { ty, .. }
            | Self::Binary { ty, .. }
            | Self::Unary { ty, .. }
            | Self::Function { ty, .. }
            | Self::Operation { ty, .. }
            | Self::Collection { ty, .. } => Some(ty.clone()),
            Self::Lambda { .. } | Self::In { .. } => {
                Some(TypeReference::primitive(PrimitiveKind::Boolean, false))
            }
        }
    }

    pub fn schema_type(&self) -> Option<SchemaType> {
        self.type_ref().map(|t| t.ty)
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        self.type_ref().and_then(|t| t.as_primitive())
    }

    pub fn is_null_constant(&self) -> bool {
        matches!(self, Self::Constant { value, .. } if value.is_null())
    }

    pub fn is_collection(&self) -> bool {
        self.schema_type().is_some_and(|t| t.is_collection())
    }

    /// Boolean-typed, or an untyped null / open property
    pub fn is_boolean_like(&self) -> bool {
        match self.type_ref() {
            None => true,
            Some(t) => t.as_primitive() == Some(PrimitiveKind::Boolean),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_types() {
        let null = BoundExpr::Constant {
            value: LiteralValue::null(),
            ty: None,
        };
        assert!(null.is_null_constant());
        assert!(null.type_ref().is_none());
        assert!(null.is_boolean_like());

        let one = BoundExpr::Constant {
            value: LiteralValue::int32(1),
            ty: Some(TypeReference::primitive(PrimitiveKind::Int32, false)),
        };
        assert_eq!(one.primitive_kind(), Some(PrimitiveKind::Int32));
        assert!(!one.is_boolean_like());
    }
}
