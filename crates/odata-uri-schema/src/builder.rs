//! Programmatic schema construction
//!
//! The builder never fails: dangling references and duplicate names are kept
//! as declared and surface as Bad/Ambiguous elements when looked up.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::{
    EntityContainer, EntitySet, EntitySetPath, EnumType, NavigationProperty, Operation,
    OperationImport, OperationKind, OperationParameter, PrimitiveKind, Property, Schema,
    SchemaType, Singleton, StructuralProperty, StructuredKind, StructuredType, TypeExpr,
};

/// Name given to the binding parameter of operations declared with [`OperationBuilder::bound_to`]
pub const BINDING_PARAMETER: &str = "bindingParameter";

/// Builder for a [`Schema`]
#[derive(Debug)]
pub struct SchemaBuilder {
    namespace: String,
    namespaces: Vec<String>,
    types: IndexMap<String, Vec<SchemaType>>,
    operations: IndexMap<String, Vec<Arc<Operation>>>,
    container: Option<ContainerDraft>,
}

#[derive(Debug, Default)]
struct ContainerDraft {
    namespace: String,
    name: String,
    entity_sets: Vec<EntitySet>,
    singletons: Vec<Singleton>,
    operation_imports: Vec<OperationImport>,
}

impl SchemaBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespaces: vec![namespace.clone()],
            namespace,
            types: IndexMap::new(),
            operations: IndexMap::new(),
            container: None,
        }
    }

    /// Switch the namespace for subsequent declarations
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if !self.namespaces.contains(&namespace) {
            self.namespaces.push(namespace.clone());
        }
        self.namespace = namespace;
        self
    }

    /// Add an already constructed type. Duplicate names are kept.
    pub fn add_type(mut self, ty: SchemaType) -> Self {
        self.types.entry(ty.full_name()).or_default().push(ty);
        self
    }

    pub fn entity_type(
        self,
        name: &str,
        f: impl FnOnce(StructuredTypeBuilder) -> StructuredTypeBuilder,
    ) -> Self {
        let def = f(StructuredTypeBuilder::new(&self.namespace, name, StructuredKind::Entity)).def;
        self.add_type(SchemaType::Entity(Arc::new(def)))
    }

    pub fn complex_type(
        self,
        name: &str,
        f: impl FnOnce(StructuredTypeBuilder) -> StructuredTypeBuilder,
    ) -> Self {
        let def = f(StructuredTypeBuilder::new(&self.namespace, name, StructuredKind::Complex)).def;
        self.add_type(SchemaType::Complex(Arc::new(def)))
    }

    pub fn enum_type(self, name: &str, f: impl FnOnce(EnumTypeBuilder) -> EnumTypeBuilder) -> Self {
        let def = f(EnumTypeBuilder::new(&self.namespace, name)).def;
        self.add_type(SchemaType::Enum(Arc::new(def)))
    }

    pub fn add_operation(mut self, operation: Operation) -> Self {
        self.operations
            .entry(operation.full_name())
            .or_default()
            .push(Arc::new(operation));
        self
    }

    pub fn function(self, name: &str, f: impl FnOnce(OperationBuilder) -> OperationBuilder) -> Self {
        let op = f(OperationBuilder::new(&self.namespace, name, OperationKind::Function)).op;
        self.add_operation(op)
    }

    pub fn action(self, name: &str, f: impl FnOnce(OperationBuilder) -> OperationBuilder) -> Self {
        let op = f(OperationBuilder::new(&self.namespace, name, OperationKind::Action)).op;
        self.add_operation(op)
    }

    /// Declare the entity container in the current namespace
    pub fn container(mut self, name: &str) -> Self {
        let draft = self.container.get_or_insert_with(ContainerDraft::default);
        draft.namespace = self.namespace.clone();
        draft.name = name.to_string();
        self
    }

    fn container_draft(&mut self) -> &mut ContainerDraft {
        let namespace = &self.namespace;
        self.container.get_or_insert_with(|| ContainerDraft {
            namespace: namespace.clone(),
            name: "Container".to_string(),
            ..ContainerDraft::default()
        })
    }

    pub fn entity_set(mut self, name: &str, entity_type: &str) -> Self {
        let draft = self.container_draft();
        let container = draft.name.clone();
        draft.entity_sets.push(EntitySet {
            name: name.to_string(),
            container,
            entity_type: entity_type.to_string(),
            bindings: IndexMap::new(),
        });
        self
    }

    pub fn singleton(mut self, name: &str, entity_type: &str) -> Self {
        let draft = self.container_draft();
        let container = draft.name.clone();
        draft.singletons.push(Singleton {
            name: name.to_string(),
            container,
            entity_type: entity_type.to_string(),
            bindings: IndexMap::new(),
        });
        self
    }

    /// Bind navigation property path `path` of entity set or singleton
    /// `source` to the navigation source `target`. Ignored if `source` is
    /// not declared yet.
    pub fn binding(mut self, source: &str, path: &str, target: &str) -> Self {
        let draft = self.container_draft();
        let bindings = draft
            .entity_sets
            .iter_mut()
            .rev()
            .find(|set| set.name == source)
            .map(|set| &mut set.bindings)
            .or_else(|| {
                draft
                    .singletons
                    .iter_mut()
                    .rev()
                    .find(|single| single.name == source)
                    .map(|single| &mut single.bindings)
            });
        match bindings {
            Some(bindings) => {
                bindings.insert(path.to_string(), target.to_string());
            }
            None => log::debug!("binding for undeclared navigation source '{}' dropped", source),
        }
        self
    }

    pub fn function_import(self, name: &str, function: &str, entity_set: Option<&str>) -> Self {
        self.operation_import(name, OperationKind::Function, function, entity_set)
    }

    pub fn action_import(self, name: &str, action: &str, entity_set: Option<&str>) -> Self {
        self.operation_import(name, OperationKind::Action, action, entity_set)
    }

    fn operation_import(
        mut self,
        name: &str,
        kind: OperationKind,
        operation: &str,
        entity_set: Option<&str>,
    ) -> Self {
        let draft = self.container_draft();
        let container = draft.name.clone();
        draft.operation_imports.push(OperationImport {
            name: name.to_string(),
            container,
            kind,
            operation: operation.to_string(),
            entity_set: entity_set.map(str::to_string),
        });
        self
    }

    pub fn build(self) -> Schema {
        let container = self.container.map(|draft| {
            Arc::new(EntityContainer {
                namespace: draft.namespace,
                name: draft.name,
                entity_sets: draft.entity_sets.into_iter().map(Arc::new).collect(),
                singletons: draft.singletons.into_iter().map(Arc::new).collect(),
                operation_imports: draft.operation_imports.into_iter().map(Arc::new).collect(),
            })
        });
        log::debug!(
            "built schema with {} type names and {} operation names",
            self.types.len(),
            self.operations.len()
        );
        Schema::new(self.namespaces, self.types, self.operations, container)
    }
}

/// Builder for entity and complex types
#[derive(Debug)]
pub struct StructuredTypeBuilder {
    def: StructuredType,
}

impl StructuredTypeBuilder {
    fn new(namespace: &str, name: &str, kind: StructuredKind) -> Self {
        Self {
            def: StructuredType {
                namespace: namespace.to_string(),
                name: name.to_string(),
                kind,
                base_type: None,
                is_abstract: false,
                is_open: false,
                has_stream: false,
                key: Vec::new(),
                properties: IndexMap::new(),
            },
        }
    }

    pub fn base(mut self, qualified_name: &str) -> Self {
        self.def.base_type = Some(qualified_name.to_string());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.def.is_abstract = true;
        self
    }

    pub fn open(mut self) -> Self {
        self.def.is_open = true;
        self
    }

    pub fn media(mut self) -> Self {
        self.def.has_stream = true;
        self
    }

    fn structural(mut self, name: &str, type_expr: &str, nullable: bool) -> Self {
        self.def.properties.insert(
            name.to_string(),
            Property::Structural(StructuralProperty {
                name: name.to_string(),
                type_expr: TypeExpr::parse(type_expr),
                nullable,
            }),
        );
        self
    }

    /// Nullable structural property
    pub fn property(self, name: &str, type_expr: &str) -> Self {
        self.structural(name, type_expr, true)
    }

    /// Non-nullable structural property
    pub fn required(self, name: &str, type_expr: &str) -> Self {
        self.structural(name, type_expr, false)
    }

    /// Non-nullable property that is also part of the key
    pub fn key_property(mut self, name: &str, type_expr: &str) -> Self {
        self.def.key.push(name.to_string());
        self.structural(name, type_expr, false)
    }

    /// Key made of already declared (or inherited) properties
    pub fn key(mut self, names: &[&str]) -> Self {
        self.def.key = names.iter().map(|n| n.to_string()).collect();
        self
    }

    fn nav(mut self, name: &str, target: &str, contains_target: bool, partner: Option<&str>) -> Self {
        let target = TypeExpr::parse(target);
        self.def.properties.insert(
            name.to_string(),
            Property::Navigation(NavigationProperty {
                name: name.to_string(),
                nullable: !target.is_collection(),
                target,
                partner: partner.map(str::to_string),
                contains_target,
            }),
        );
        self
    }

    pub fn navigation(self, name: &str, target: &str) -> Self {
        self.nav(name, target, false, None)
    }

    pub fn navigation_with_partner(self, name: &str, target: &str, partner: &str) -> Self {
        self.nav(name, target, false, Some(partner))
    }

    /// Containment navigation property
    pub fn contained(self, name: &str, target: &str) -> Self {
        self.nav(name, target, true, None)
    }
}

/// Builder for enumeration types
#[derive(Debug)]
pub struct EnumTypeBuilder {
    def: EnumType,
}

impl EnumTypeBuilder {
    fn new(namespace: &str, name: &str) -> Self {
        Self {
            def: EnumType {
                namespace: namespace.to_string(),
                name: name.to_string(),
                underlying: PrimitiveKind::Int32,
                is_flags: false,
                members: IndexMap::new(),
            },
        }
    }

    pub fn underlying(mut self, kind: PrimitiveKind) -> Self {
        self.def.underlying = kind;
        self
    }

    pub fn flags(mut self) -> Self {
        self.def.is_flags = true;
        self
    }

    pub fn member(mut self, name: &str, value: i64) -> Self {
        self.def.members.insert(name.to_string(), value);
        self
    }

    /// Members valued by declaration order (0, 1, 2, ...), or by powers of
    /// two for flags enums
    pub fn members(mut self, names: &[&str]) -> Self {
        for name in names {
            let index = self.def.members.len() as u32;
            let value = if self.def.is_flags { 1i64 << index } else { i64::from(index) };
            self.def.members.insert(name.to_string(), value);
        }
        self
    }
}

/// Builder for functions and actions
#[derive(Debug)]
pub struct OperationBuilder {
    op: Operation,
}

impl OperationBuilder {
    fn new(namespace: &str, name: &str, kind: OperationKind) -> Self {
        Self {
            op: Operation {
                namespace: namespace.to_string(),
                name: name.to_string(),
                kind,
                is_bound: false,
                is_composable: false,
                parameters: Vec::new(),
                return_type: None,
                entity_set_path: None,
            },
        }
    }

    /// Make the operation bound; the binding parameter is inserted first
    pub fn bound_to(mut self, binding_type: &str) -> Self {
        self.op.is_bound = true;
        self.op.parameters.insert(
            0,
            OperationParameter {
                nullable: false,
                ..OperationParameter::new(BINDING_PARAMETER, TypeExpr::parse(binding_type))
            },
        );
        self
    }

    pub fn parameter(mut self, name: &str, type_expr: &str) -> Self {
        self.op
            .parameters
            .push(OperationParameter::new(name, TypeExpr::parse(type_expr)));
        self
    }

    pub fn required_parameter(mut self, name: &str, type_expr: &str) -> Self {
        self.op.parameters.push(OperationParameter {
            nullable: false,
            ..OperationParameter::new(name, TypeExpr::parse(type_expr))
        });
        self
    }

    pub fn optional_parameter(mut self, name: &str, type_expr: &str) -> Self {
        self.op.parameters.push(OperationParameter {
            optional: true,
            ..OperationParameter::new(name, TypeExpr::parse(type_expr))
        });
        self
    }

    pub fn returns(mut self, type_expr: &str) -> Self {
        self.op.return_type = Some(TypeExpr::parse(type_expr));
        self
    }

    pub fn composable(mut self) -> Self {
        self.op.is_composable = true;
        self
    }

    pub fn entity_set_path(mut self, path: &str) -> Self {
        self.op.entity_set_path = EntitySetPath::parse(path);
        self
    }
}
