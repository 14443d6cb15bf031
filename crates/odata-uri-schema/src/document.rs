//! JSON schema documents
//!
//! A compact JSON rendition of a service schema, used to load a [`Schema`]
//! from configuration or test fixtures. CSDL XML is out of scope.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    EntitySetPath, EnumType, NavigationProperty, Operation, OperationKind, OperationParameter,
    PrimitiveKind, Property, Schema, SchemaBuilder, SchemaType, StructuralProperty, StructuredKind,
    StructuredType, TypeExpr,
};

/// Errors from loading a schema document
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("Failed to read schema document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid schema document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown enum underlying type '{0}'")]
    UnderlyingType(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    #[serde(default)]
    pub schemas: Vec<NamespaceDocument>,
    #[serde(default)]
    pub container: Option<ContainerDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceDocument {
    pub namespace: String,
    #[serde(default)]
    pub entity_types: Vec<StructuredTypeDocument>,
    #[serde(default)]
    pub complex_types: Vec<StructuredTypeDocument>,
    #[serde(default)]
    pub enum_types: Vec<EnumTypeDocument>,
    #[serde(default)]
    pub functions: Vec<OperationDocument>,
    #[serde(default)]
    pub actions: Vec<OperationDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredTypeDocument {
    pub name: String,
    #[serde(default)]
    pub base_type: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default, rename = "openType")]
    pub is_open: bool,
    #[serde(default)]
    pub has_stream: bool,
    #[serde(default)]
    pub key: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDocument>,
    #[serde(default)]
    pub navigation_properties: Vec<NavigationPropertyDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: TypeExpr,
    #[serde(default = "default_true")]
    pub nullable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationPropertyDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub target: TypeExpr,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub partner: Option<String>,
    #[serde(default)]
    pub contains_target: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumTypeDocument {
    pub name: String,
    #[serde(default)]
    pub underlying_type: Option<String>,
    #[serde(default)]
    pub is_flags: bool,
    #[serde(default)]
    pub members: Vec<EnumMemberDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumMemberDocument {
    pub name: String,
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDocument {
    pub name: String,
    #[serde(default)]
    pub is_bound: bool,
    #[serde(default)]
    pub is_composable: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterDocument>,
    #[serde(default)]
    pub return_type: Option<TypeExpr>,
    #[serde(default)]
    pub entity_set_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: TypeExpr,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDocument {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub entity_sets: Vec<NavigationSourceDocument>,
    #[serde(default)]
    pub singletons: Vec<NavigationSourceDocument>,
    #[serde(default)]
    pub function_imports: Vec<OperationImportDocument>,
    #[serde(default)]
    pub action_imports: Vec<OperationImportDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationSourceDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub navigation_bindings: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationImportDocument {
    pub name: String,
    /// Qualified name of the imported function or action
    pub operation: String,
    #[serde(default)]
    pub entity_set: Option<String>,
}

fn default_true() -> bool {
    true
}

impl SchemaDocument {
    pub fn into_schema(self) -> Result<Schema, SchemaLoadError> {
        let mut builder = match self.schemas.first() {
            Some(first) => SchemaBuilder::new(first.namespace.as_str()),
            None => SchemaBuilder::new(""),
        };

        for ns in self.schemas {
            builder = builder.namespace(ns.namespace.as_str());
            for doc in ns.entity_types {
                let def = doc.into_definition(&ns.namespace, StructuredKind::Entity);
                builder = builder.add_type(SchemaType::Entity(Arc::new(def)));
            }
            for doc in ns.complex_types {
                let def = doc.into_definition(&ns.namespace, StructuredKind::Complex);
                builder = builder.add_type(SchemaType::Complex(Arc::new(def)));
            }
            for doc in ns.enum_types {
                let def = doc.into_definition(&ns.namespace)?;
                builder = builder.add_type(SchemaType::Enum(Arc::new(def)));
            }
            for doc in ns.functions {
                builder = builder.add_operation(doc.into_operation(&ns.namespace, OperationKind::Function));
            }
            for doc in ns.actions {
                builder = builder.add_operation(doc.into_operation(&ns.namespace, OperationKind::Action));
            }
        }

        if let Some(container) = self.container {
            builder = builder
                .namespace(container.namespace.as_str())
                .container(&container.name);
            for set in &container.entity_sets {
                builder = builder.entity_set(&set.name, &set.entity_type);
                for (path, target) in &set.navigation_bindings {
                    builder = builder.binding(&set.name, path, target);
                }
            }
            for single in &container.singletons {
                builder = builder.singleton(&single.name, &single.entity_type);
                for (path, target) in &single.navigation_bindings {
                    builder = builder.binding(&single.name, path, target);
                }
            }
            for import in &container.function_imports {
                builder = builder.function_import(&import.name, &import.operation, import.entity_set.as_deref());
            }
            for import in &container.action_imports {
                builder = builder.action_import(&import.name, &import.operation, import.entity_set.as_deref());
            }
        }

        Ok(builder.build())
    }
}

impl StructuredTypeDocument {
    fn into_definition(self, namespace: &str, kind: StructuredKind) -> StructuredType {
        let structural = self.properties.into_iter().map(|p| {
            Property::Structural(StructuralProperty {
                name: p.name,
                type_expr: p.type_expr,
                nullable: p.nullable,
            })
        });
        let navigation = self.navigation_properties.into_iter().map(|p| {
            Property::Navigation(NavigationProperty {
                name: p.name,
                target: p.target,
                nullable: p.nullable,
                partner: p.partner,
                contains_target: p.contains_target,
            })
        });
        StructuredType {
            namespace: namespace.to_string(),
            name: self.name,
            kind,
            base_type: self.base_type,
            is_abstract: self.is_abstract,
            is_open: self.is_open,
            has_stream: self.has_stream,
            key: self.key,
            properties: structural
                .chain(navigation)
                .map(|p| (p.name().to_string(), p))
                .collect(),
        }
    }
}

impl EnumTypeDocument {
    fn into_definition(self, namespace: &str) -> Result<EnumType, SchemaLoadError> {
        let underlying = match self.underlying_type.as_deref() {
            None => PrimitiveKind::Int32,
            Some(name) => PrimitiveKind::from_qualified_name(name)
                .filter(|kind| kind.is_integral())
                .ok_or_else(|| SchemaLoadError::UnderlyingType(name.to_string()))?,
        };
        let is_flags = self.is_flags;
        let members = self
            .members
            .into_iter()
            .enumerate()
            .map(|(index, member)| {
                let value = member.value.unwrap_or(if is_flags {
                    1i64 << index
                } else {
                    index as i64
                });
                (member.name, value)
            })
            .collect();
        Ok(EnumType {
            namespace: namespace.to_string(),
            name: self.name,
            underlying,
            is_flags,
            members,
        })
    }
}

impl OperationDocument {
    fn into_operation(self, namespace: &str, kind: OperationKind) -> Operation {
        Operation {
            namespace: namespace.to_string(),
            name: self.name,
            kind,
            is_bound: self.is_bound,
            is_composable: self.is_composable,
            parameters: self
                .parameters
                .into_iter()
                .map(|p| OperationParameter {
                    name: p.name,
                    type_expr: p.type_expr,
                    nullable: p.nullable,
                    optional: p.optional,
                })
                .collect(),
            return_type: self.return_type,
            entity_set_path: self.entity_set_path.as_deref().and_then(EntitySetPath::parse),
        }
    }
}

impl Schema {
    /// Load a schema from a JSON schema document
    pub fn from_json(json: &str) -> Result<Self, SchemaLoadError> {
        let document: SchemaDocument = serde_json::from_str(json)?;
        document.into_schema()
    }

    /// Load a schema from a JSON schema document file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeKind;

    const DOC: &str = r#"{
        "schemas": [{
            "namespace": "Demo",
            "entityTypes": [{
                "name": "Product",
                "key": ["Id"],
                "properties": [
                    {"name": "Id", "type": "Edm.Int32", "nullable": false},
                    {"name": "Tags", "type": "Collection(Edm.String)"}
                ],
                "navigationProperties": [
                    {"name": "Parts", "type": "Collection(Demo.Product)", "containsTarget": true}
                ]
            }],
            "enumTypes": [{
                "name": "Access",
                "isFlags": true,
                "members": [{"name": "Read"}, {"name": "Write"}]
            }],
            "functions": [{
                "name": "Cheapest",
                "isBound": true,
                "parameters": [{"name": "products", "type": "Collection(Demo.Product)"}],
                "returnType": "Demo.Product"
            }]
        }],
        "container": {
            "namespace": "Demo",
            "name": "Service",
            "entitySets": [{"name": "Products", "type": "Demo.Product"}],
            "functionImports": [{"name": "Top", "operation": "Demo.Top"}]
        }
    }"#;

    #[test]
    fn test_load_document() {
        let schema = Schema::from_json(DOC).unwrap();
        let product = schema.find_type("Demo.Product");
        assert_eq!(product.kind(), TypeKind::Entity);
        let tags = schema.find_property(&product, "Tags", false).found().unwrap();
        assert!(schema.property_type(&tags.property).ty.is_collection());
        assert_eq!(schema.find_type("Demo.Access").as_enum().unwrap().member("Write"), Some(2));
        assert_eq!(schema.find_operation_imports("Top", false).len(), 1);
        assert_eq!(schema.find_operations("Demo.Cheapest", Some(&SchemaType::collection(product))).len(), 1);
    }

    #[test]
    fn test_invalid_underlying_type() {
        let doc = r#"{"schemas": [{"namespace": "N", "enumTypes": [{"name": "E", "underlyingType": "Edm.String"}]}]}"#;
        assert!(matches!(Schema::from_json(doc), Err(SchemaLoadError::UnderlyingType(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(Schema::from_json("{"), Err(SchemaLoadError::Json(_))));
    }
}
