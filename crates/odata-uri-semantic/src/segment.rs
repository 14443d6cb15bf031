//! Typed path segments

use odata_uri_literal::{LiteralValue, ProtocolVersion};
use odata_uri_schema::{
    NavigationProperty, NavigationSource, Operation, OperationImport, PropertyRef, SchemaType,
};
use std::sync::Arc;

/// One `name=value` pair of a key predicate
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub name: String,
    pub value: LiteralValue,
}

/// A resolved path segment
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    EntitySet {
        source: NavigationSource,
        ty: SchemaType,
    },
    Singleton {
        source: NavigationSource,
        ty: SchemaType,
    },
    /// Key predicate; values in key declaration order
    Key {
        values: Vec<KeyValue>,
        ty: SchemaType,
        source: Option<NavigationSource>,
    },
    Navigation {
        property: NavigationProperty,
        /// `None` when the target is unknown (no binding)
        target: Option<NavigationSource>,
        ty: SchemaType,
    },
    TypeCast {
        ty: SchemaType,
    },
    Property {
        property: PropertyRef,
        ty: SchemaType,
    },
    /// Undeclared property of an open type
    DynamicProperty {
        name: String,
    },
    Operation {
        operation: Arc<Operation>,
        import: Option<Arc<OperationImport>>,
        /// Non-binding arguments in parameter order
        arguments: Vec<KeyValue>,
        target: Option<NavigationSource>,
        ty: Option<SchemaType>,
    },
    Count,
    /// `$value`: raw value of a primitive property or media entity
    Value {
        ty: SchemaType,
    },
    /// `$ref`: the navigation link rather than the related entity
    NavigationLink,
    Batch,
    Metadata,
    Entity,
}

impl PathSegment {
    /// Type addressed after this segment
    pub fn ty(&self) -> Option<&SchemaType> {
        match self {
            Self::EntitySet { ty, .. }
            | Self::Singleton { ty, .. }
            | Self::Key { ty, .. }
            | Self::Navigation { ty, .. }
            | Self::TypeCast { ty }
            | Self::Property { ty, .. }
            | Self::Value { ty } => Some(ty),
            Self::Operation { ty, .. } => ty.as_ref(),
            _ => None,
        }
    }

    /// Navigation source addressed after this segment
    pub fn navigation_source(&self) -> Option<&NavigationSource> {
        match self {
            Self::EntitySet { source, .. } | Self::Singleton { source, .. } => Some(source),
            Self::Key { source, .. } => source.as_ref(),
            Self::Navigation { target, .. } | Self::Operation { target, .. } => target.as_ref(),
            _ => None,
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self, Self::Key { .. })
    }

    /// URI text of the segment; key predicates render as `(…)` and are
    /// appended to the previous segment
    pub fn to_uri_text(&self, version: ProtocolVersion) -> String {
        match self {
            Self::EntitySet { source, .. } | Self::Singleton { source, .. } => source.name().to_string(),
            Self::Key { values, .. } => key_text(values, version),
            Self::Navigation { property, .. } => property.name.clone(),
            Self::TypeCast { ty } => ty.element_type().full_name(),
            Self::Property { property, .. } => property.name().to_string(),
            Self::DynamicProperty { name } => name.clone(),
            Self::Operation {
                operation,
                import,
                arguments,
                ..
            } => {
                let name = match import {
                    Some(import) => import.name.clone(),
                    None => operation.full_name(),
                };
                if operation.is_function() {
                    let args: Vec<String> = arguments
                        .iter()
                        .map(|a| format!("{}={}", a.name, a.value.to_literal_text(version)))
                        .collect();
                    format!("{}({})", name, args.join(","))
                } else {
                    name
                }
            }
            Self::Count => "$count".to_string(),
            Self::Value { .. } => "$value".to_string(),
            Self::NavigationLink => "$ref".to_string(),
            Self::Batch => "$batch".to_string(),
            Self::Metadata => "$metadata".to_string(),
            Self::Entity => "$entity".to_string(),
        }
    }
}

/// `(1)` for a single key value, `(A=1,B='x')` for composite keys
pub fn key_text(values: &[KeyValue], version: ProtocolVersion) -> String {
    match values {
        [single] => format!("({})", single.value.to_literal_text(version)),
        _ => {
            let pairs: Vec<String> = values
                .iter()
                .map(|kv| format!("{}={}", kv.name, kv.value.to_literal_text(version)))
                .collect();
            format!("({})", pairs.join(","))
        }
    }
}

/// Render segments as `/Set(1)/Nav`
pub fn render_segments<'a>(segments: impl IntoIterator<Item = &'a PathSegment>, version: ProtocolVersion) -> String {
    let mut uri = String::new();
    for segment in segments {
        if !segment.is_key() {
            uri.push('/');
        }
        uri.push_str(&segment.to_uri_text(version));
    }
    if uri.is_empty() {
        uri.push('/');
    }
    uri
}
