//! The schema model: read-only catalog of types, operations and the container
//!
//! Lookups never return a bare "not found". Type and navigation source
//! lookups produce Bad or Ambiguous placeholders; other lookups produce a
//! [`Lookup`] carrying either the element, the not-found diagnostics, or all
//! candidates.

use indexmap::IndexMap;
use odata_uri_diagnostics::{
    Diagnostic, UriError, OD0101, OD0102, OD0103, OD0105, OD0110, OD0111, OD0112, OD0113, OD0202,
    OD0401,
};
use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    ContainedSet, EntityContainer, NavigationProperty, NavigationSource, Operation, OperationImport,
    PrimitiveKind, Property, SchemaType, StructuredType, TypeExpr, TypeReference,
};

/// Result of a lookup whose element type has no built-in placeholder
#[derive(Debug, Clone)]
pub enum Lookup<T> {
    Found(T),
    NotFound(Vec<Diagnostic>),
    Ambiguous(Vec<T>, Vec<Diagnostic>),
}

impl<T> Lookup<T> {
    fn from_candidates(
        mut candidates: Vec<T>,
        not_found: impl FnOnce() -> Diagnostic,
        ambiguous: impl FnOnce(usize) -> Diagnostic,
    ) -> Self {
        match candidates.len() {
            0 => Self::NotFound(vec![not_found()]),
            1 => Self::Found(candidates.remove(0)),
            n => Self::Ambiguous(candidates, vec![ambiguous(n)]),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn errors(&self) -> &[Diagnostic] {
        match self {
            Self::Found(_) => &[],
            Self::NotFound(errors) | Self::Ambiguous(_, errors) => errors,
        }
    }

    /// Raise the carried diagnostics unless the element was found
    pub fn into_result(self) -> Result<T, UriError> {
        match self {
            Self::Found(value) => Ok(value),
            Self::NotFound(errors) | Self::Ambiguous(_, errors) => {
                Err(UriError::from_diagnostics(&errors))
            }
        }
    }
}

/// A property together with the type that declares it
#[derive(Debug, Clone)]
pub struct PropertyRef {
    pub declaring_type: Arc<StructuredType>,
    pub property: Property,
}

impl PropertyRef {
    pub fn name(&self) -> &str {
        self.property.name()
    }
}

impl PartialEq for PropertyRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.declaring_type, &other.declaring_type) && self.property == other.property
    }
}

/// A key property and its resolved type
#[derive(Debug, Clone, PartialEq)]
pub struct KeyProperty {
    pub name: String,
    pub ty: TypeReference,
}

/// In-memory schema model. Immutable once built; safe to share across threads.
#[derive(Debug)]
pub struct Schema {
    namespaces: Vec<String>,
    types: IndexMap<String, Vec<SchemaType>>,
    operations: IndexMap<String, Vec<Arc<Operation>>>,
    container: Option<Arc<EntityContainer>>,
    // lowercase qualified name -> declared qualified names
    folded_types: OnceCell<HashMap<String, Vec<String>>>,
    folded_operations: OnceCell<HashMap<String, Vec<String>>>,
    // base type qualified name -> directly derived type names
    derived: OnceCell<HashMap<String, Vec<String>>>,
}

impl Schema {
    pub(crate) fn new(
        namespaces: Vec<String>,
        types: IndexMap<String, Vec<SchemaType>>,
        operations: IndexMap<String, Vec<Arc<Operation>>>,
        container: Option<Arc<EntityContainer>>,
    ) -> Self {
        Self {
            namespaces,
            types,
            operations,
            container,
            folded_types: OnceCell::new(),
            folded_operations: OnceCell::new(),
            derived: OnceCell::new(),
        }
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// All declared types, duplicates included
    pub fn types(&self) -> impl Iterator<Item = &SchemaType> {
        self.types.values().flatten()
    }

    /// All declared operations
    pub fn operations(&self) -> impl Iterator<Item = &Arc<Operation>> {
        self.operations.values().flatten()
    }

    pub fn container(&self) -> Option<&Arc<EntityContainer>> {
        self.container.as_ref()
    }

    // === Types ===

    /// Find a type by qualified name (`Ns.Customer`, `Edm.Int32`, `Collection(...)`)
    pub fn find_type(&self, name: &str) -> SchemaType {
        self.lookup_type(name, false)
    }

    /// Same as [`Self::find_type`] but ignoring ASCII case
    pub fn find_type_ignore_case(&self, name: &str) -> SchemaType {
        self.lookup_type(name, true)
    }

    fn lookup_type(&self, name: &str, case_insensitive: bool) -> SchemaType {
        let name = name.trim();
        if let Some(inner) = name
            .strip_prefix("Collection(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return SchemaType::collection(self.lookup_type(inner, case_insensitive));
        }

        let primitive = if case_insensitive {
            PrimitiveKind::from_qualified_name_ignore_case(name)
        } else {
            PrimitiveKind::from_qualified_name(name)
        };
        if let Some(kind) = primitive {
            return SchemaType::Primitive(kind);
        }

        let mut candidates: Vec<SchemaType> = if case_insensitive {
            self.folded_type_index()
                .get(&name.to_ascii_lowercase())
                .into_iter()
                .flatten()
                .filter_map(|declared| self.types.get(declared))
                .flatten()
                .cloned()
                .collect()
        } else {
            self.types.get(name).cloned().unwrap_or_default()
        };

        match candidates.len() {
            0 => SchemaType::bad(
                name,
                Diagnostic::new(OD0101, format!("Type '{}' not found", name)),
            ),
            1 => candidates.remove(0),
            n => {
                log::debug!("type name '{}' matches {} definitions", name, n);
                SchemaType::ambiguous(
                    name,
                    candidates,
                    Diagnostic::new(
                        OD0111,
                        format!("Type name '{}' is ambiguous: {} definitions found", name, n),
                    ),
                )
            }
        }
    }

    fn folded_type_index(&self) -> &HashMap<String, Vec<String>> {
        self.folded_types.get_or_init(|| fold_names(self.types.keys()))
    }

    fn folded_operation_index(&self) -> &HashMap<String, Vec<String>> {
        self.folded_operations
            .get_or_init(|| fold_names(self.operations.keys()))
    }

    /// Resolve a schema type expression
    pub fn resolve(&self, expr: &TypeExpr) -> SchemaType {
        match expr {
            TypeExpr::Named(name) => self.find_type(name),
            TypeExpr::Collection(inner) => SchemaType::collection(self.resolve(inner)),
        }
    }

    /// Resolved type of a declared property
    pub fn property_type(&self, property: &Property) -> TypeReference {
        TypeReference::new(self.resolve(property.type_expr()), property.nullable())
    }

    /// Base type of a structured type; `Some(Bad)` if the reference dangles
    pub fn base_type(&self, def: &StructuredType) -> Option<SchemaType> {
        def.base_type.as_deref().map(|base| self.find_type(base))
    }

    /// The type and its ancestors, most derived first. Stops at the first
    /// Bad, Ambiguous or cyclic base reference.
    pub fn base_chain(&self, ty: &SchemaType) -> Vec<Arc<StructuredType>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = ty.as_structured().cloned();
        while let Some(def) = current {
            if !seen.insert(def.full_name()) {
                log::debug!("cyclic base type chain at '{}'", def.full_name());
                break;
            }
            current = self
                .base_type(&def)
                .and_then(|base| base.as_structured().cloned());
            chain.push(def);
        }
        chain
    }

    /// Distance from `derived` up to `base` (0 for the same type)
    pub fn inheritance_distance(&self, base: &SchemaType, derived: &SchemaType) -> Option<usize> {
        match (base, derived) {
            (SchemaType::Collection(b), SchemaType::Collection(d)) => {
                self.inheritance_distance(b, d)
            }
            (SchemaType::Entity(b), SchemaType::Entity(_))
            | (SchemaType::Complex(b), SchemaType::Complex(_)) => self
                .base_chain(derived)
                .iter()
                .position(|def| Arc::ptr_eq(def, b)),
            _ if !base.is_bad() && base.same_definition(derived) => Some(0),
            _ => None,
        }
    }

    /// Check whether a value of `source` may be used where `target` is expected
    /// (same type or derived from it)
    pub fn is_assignable(&self, target: &SchemaType, source: &SchemaType) -> bool {
        if target.is_bad() || source.is_bad() {
            return false;
        }
        match (target, source) {
            (SchemaType::EntityReference(t), SchemaType::EntityReference(s)) => {
                self.is_assignable(t, s)
            }
            _ => self.inheritance_distance(target, source).is_some(),
        }
    }

    /// Same type, or one derives from the other
    pub fn is_related(&self, a: &SchemaType, b: &SchemaType) -> bool {
        self.is_assignable(a, b) || self.is_assignable(b, a)
    }

    /// All types deriving (directly or indirectly) from `ty`
    pub fn derived_types(&self, ty: &SchemaType) -> Vec<SchemaType> {
        let index = self.derived.get_or_init(|| {
            let mut index: HashMap<String, Vec<String>> = HashMap::new();
            for def in self.types().filter_map(SchemaType::as_structured) {
                if let Some(base) = &def.base_type {
                    index.entry(base.clone()).or_default().push(def.full_name());
                }
            }
            index
        });

        let mut result = Vec::new();
        let mut pending = vec![ty.full_name()];
        let mut seen = HashSet::new();
        while let Some(name) = pending.pop() {
            for derived in index.get(&name).into_iter().flatten() {
                if seen.insert(derived.clone()) {
                    result.extend(self.types.get(derived).into_iter().flatten().cloned());
                    pending.push(derived.clone());
                }
            }
        }
        result
    }

    // === Properties ===

    /// Find a declared or inherited property
    pub fn find_property(
        &self,
        ty: &SchemaType,
        name: &str,
        case_insensitive: bool,
    ) -> Lookup<PropertyRef> {
        if ty.is_bad() {
            return Lookup::NotFound(ty.errors().to_vec());
        }
        if !ty.is_structured() {
            return Lookup::NotFound(vec![Diagnostic::new(
                OD0103,
                format!("Type '{}' has no property '{}'", ty.full_name(), name),
            )]);
        }

        let mut candidates = Vec::new();
        for def in self.base_chain(ty) {
            for property in def.properties.values() {
                let matches = if case_insensitive {
                    property.name().eq_ignore_ascii_case(name)
                } else {
                    property.name() == name
                };
                if matches {
                    candidates.push(PropertyRef {
                        declaring_type: def.clone(),
                        property: property.clone(),
                    });
                }
            }
        }

        Lookup::from_candidates(
            candidates,
            || {
                Diagnostic::new(
                    OD0103,
                    format!("Property '{}' not found on type '{}'", name, ty.full_name()),
                )
            },
            |n| {
                Diagnostic::new(
                    OD0113,
                    format!(
                        "Property name '{}' is ambiguous on type '{}': {} matches",
                        name,
                        ty.full_name(),
                        n
                    ),
                )
            },
        )
    }

    /// All properties of a structured type, base type properties first
    pub fn all_properties(&self, ty: &SchemaType) -> Vec<PropertyRef> {
        let mut chain = self.base_chain(ty);
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|def| {
                def.properties
                    .values()
                    .map(|property| PropertyRef {
                        declaring_type: def.clone(),
                        property: property.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Key properties of an entity type, in declaration order
    ///
    /// Needs a concrete definition: Bad/Ambiguous types raise their deferred
    /// errors here.
    pub fn key_properties(&self, ty: &SchemaType) -> Result<Vec<KeyProperty>, UriError> {
        let ty = ty.require_concrete()?;
        let Some(entity) = ty.as_entity() else {
            return Err(UriError::structural(
                OD0202,
                format!("Type '{}' is not an entity type and has no key", ty.full_name()),
            ));
        };

        let chain = self.base_chain(ty);
        let key = chain
            .iter()
            .find(|def| !def.key.is_empty())
            .map(|def| def.key.clone())
            .ok_or_else(|| {
                UriError::structural(
                    OD0202,
                    format!("Entity type '{}' declares no key", entity.full_name()),
                )
            })?;

        key.iter()
            .map(|name| {
                let property = self.find_property(ty, name, false).into_result()?;
                let key_type = self.property_type(&property.property);
                key_type.ty.require_concrete()?;
                Ok(KeyProperty {
                    name: name.clone(),
                    ty: key_type,
                })
            })
            .collect()
    }

    // === Operations ===

    /// Operations with the given qualified name.
    ///
    /// With a binding type only bound operations whose binding parameter is
    /// related to it are returned, closest binding type first; without one,
    /// only unbound operations.
    pub fn find_operations(
        &self,
        qualified_name: &str,
        binding: Option<&SchemaType>,
    ) -> Vec<Arc<Operation>> {
        let candidates = self.operations.get(qualified_name).cloned().unwrap_or_default();
        self.filter_by_binding(candidates, binding)
    }

    pub fn find_operations_ignore_case(
        &self,
        qualified_name: &str,
        binding: Option<&SchemaType>,
    ) -> Vec<Arc<Operation>> {
        let candidates = self
            .folded_operation_index()
            .get(&qualified_name.to_ascii_lowercase())
            .into_iter()
            .flatten()
            .filter_map(|declared| self.operations.get(declared))
            .flatten()
            .cloned()
            .collect();
        self.filter_by_binding(candidates, binding)
    }

    /// Operations with the given simple (unqualified) name.
    ///
    /// The name must be declared in a single namespace; a name shared by
    /// several namespaces is ambiguous even when only one declaration would
    /// accept the binding type.
    pub fn find_operations_by_simple_name(
        &self,
        name: &str,
        binding: Option<&SchemaType>,
        case_insensitive: bool,
    ) -> Result<Vec<Arc<Operation>>, UriError> {
        let mut by_namespace: IndexMap<&str, Vec<Arc<Operation>>> = IndexMap::new();
        for op in self.operations() {
            let matches = if case_insensitive {
                op.name.eq_ignore_ascii_case(name)
            } else {
                op.name == name
            };
            if matches {
                by_namespace.entry(op.namespace.as_str()).or_default().push(op.clone());
            }
        }
        if by_namespace.len() > 1 {
            let namespaces: Vec<&str> = by_namespace.keys().copied().collect();
            return Err(UriError::from_diagnostic(
                &Diagnostic::new(
                    OD0110,
                    format!("Unqualified operation name '{}' is declared in several namespaces", name),
                )
                .with_context(format!("candidates: {}", namespaces.join(", "))),
            ));
        }
        let candidates = by_namespace.into_values().flatten().collect();
        Ok(self.filter_by_binding(candidates, binding))
    }

    /// Rank for a bound operation: ancestors-or-same by distance, then descendants
    fn binding_rank(&self, operation: &Operation, binding: &SchemaType) -> Option<usize> {
        let parameter = operation.binding_parameter()?;
        let bound_to = self.resolve(&parameter.type_expr);
        if let Some(distance) = self.inheritance_distance(&bound_to, binding) {
            return Some(distance);
        }
        self.inheritance_distance(binding, &bound_to)
            .map(|distance| 1000 + distance)
    }

    fn filter_by_binding(
        &self,
        candidates: Vec<Arc<Operation>>,
        binding: Option<&SchemaType>,
    ) -> Vec<Arc<Operation>> {
        match binding {
            None => candidates.into_iter().filter(|op| !op.is_bound).collect(),
            Some(binding) => {
                let mut ranked: Vec<(usize, Arc<Operation>)> = candidates
                    .into_iter()
                    .filter(|op| op.is_bound)
                    .filter_map(|op| self.binding_rank(&op, binding).map(|rank| (rank, op)))
                    .collect();
                ranked.sort_by_key(|(rank, _)| *rank);
                ranked.into_iter().map(|(_, op)| op).collect()
            }
        }
    }

    // === Container ===

    /// Find the entity container by simple or qualified name
    pub fn find_entity_container(&self, name: &str) -> Lookup<Arc<EntityContainer>> {
        let candidates = self
            .container
            .iter()
            .filter(|container| container.is_named(name))
            .cloned()
            .collect();
        Lookup::from_candidates(
            candidates,
            || Diagnostic::new(OD0105, format!("Entity container '{}' not found", name)),
            |n| {
                Diagnostic::new(
                    OD0110,
                    format!("Entity container name '{}' is ambiguous: {} matches", name, n),
                )
            },
        )
    }

    /// Find an entity set or singleton (`Name` or `Container/Name`)
    pub fn find_navigation_source(&self, name: &str, case_insensitive: bool) -> NavigationSource {
        let Some(container) = &self.container else {
            return NavigationSource::bad(
                name,
                vec![Diagnostic::new(OD0105, "Schema declares no entity container")],
            );
        };

        let simple = match name.split_once('/') {
            Some((prefix, rest)) if container.is_named(prefix) => rest,
            Some((prefix, _)) => {
                return NavigationSource::bad(
                    name,
                    vec![Diagnostic::new(
                        OD0105,
                        format!("Entity container '{}' not found", prefix),
                    )],
                );
            }
            None => name,
        };

        let mut candidates = container.navigation_sources(simple, case_insensitive);
        match candidates.len() {
            0 => NavigationSource::bad(
                simple,
                vec![Diagnostic::new(
                    OD0102,
                    format!("Entity set or singleton '{}' not found", simple),
                )],
            ),
            1 => candidates.remove(0),
            n => {
                log::debug!("navigation source '{}' matches {} declarations", simple, n);
                let names: Vec<&str> = candidates.iter().map(NavigationSource::name).collect();
                let error = Diagnostic::new(
                    OD0112,
                    format!("Navigation source name '{}' is ambiguous: {} matches", simple, n),
                )
                .with_context(format!("candidates: {}", names.join(", ")));
                NavigationSource::ambiguous(simple, candidates, error)
            }
        }
    }

    pub fn find_operation_imports(
        &self,
        name: &str,
        case_insensitive: bool,
    ) -> Vec<Arc<OperationImport>> {
        self.container
            .as_ref()
            .map(|container| container.operation_imports(name, case_insensitive))
            .unwrap_or_default()
    }

    /// Element type of a navigation source
    pub fn navigation_source_type(&self, source: &NavigationSource) -> SchemaType {
        match source {
            NavigationSource::Bad(bad) => SchemaType::Bad(Arc::new(crate::BadType {
                namespace: String::new(),
                name: bad.name.clone(),
                errors: bad.errors.clone(),
            })),
            NavigationSource::Ambiguous(amb) => {
                let candidates = amb
                    .candidates
                    .iter()
                    .map(|candidate| self.navigation_source_type(candidate))
                    .collect();
                SchemaType::Ambiguous(Arc::new(crate::AmbiguousType {
                    namespace: String::new(),
                    name: amb.name.clone(),
                    candidates,
                    errors: amb.errors.clone(),
                }))
            }
            other => match other.entity_type_expr() {
                Some(expr) => self.resolve(&expr),
                None => SchemaType::bad(
                    other.name(),
                    Diagnostic::new(OD0101, "Navigation source has no entity type"),
                ),
            },
        }
    }

    /// Navigation source reached by following `property` from `source`.
    ///
    /// `None` means the target is unknown (no binding), which is a valid
    /// state distinct from Bad. `binding_path` is the property path relative
    /// to the source (`Address/Country`, `Ns.Derived/Orders`).
    pub fn find_navigation_target(
        &self,
        source: &NavigationSource,
        property: &NavigationProperty,
        binding_path: &str,
    ) -> Option<NavigationSource> {
        if property.contains_target {
            return Some(NavigationSource::Contained(Arc::new(ContainedSet {
                parent: source.clone(),
                property: property.name.clone(),
                target: property.target.clone(),
            })));
        }
        if source.is_bad() {
            return Some(NavigationSource::bad(&property.name, source.errors().to_vec()));
        }
        let bindings = source.bindings()?;
        let target = bindings
            .get(binding_path)
            .or_else(|| bindings.get(&property.name))?;
        Some(self.find_navigation_source(target, false))
    }

    // === Validation ===

    /// Resolve every reference in the model and collect the deferred errors
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut errors = Vec::new();

        for (name, definitions) in &self.types {
            if definitions.len() > 1 {
                errors.extend(self.find_type(name).errors().iter().cloned());
            }
        }

        for def in self.types().filter_map(SchemaType::as_structured) {
            if let Some(base) = self.base_type(def) {
                errors.extend(base.errors().iter().cloned());
            }
            for property in def.properties.values() {
                errors.extend(self.property_type(property).ty.errors().iter().cloned());
            }
            if !def.key.is_empty() {
                let ty = SchemaType::Entity(def.clone());
                if let Err(err) = self.key_properties(&ty) {
                    errors.push(err.to_diagnostic());
                }
            }
        }

        for op in self.operations() {
            if op.is_bound && op.parameters.is_empty() {
                errors.push(Diagnostic::new(
                    OD0401,
                    format!("Bound operation '{}' declares no binding parameter", op.full_name()),
                ));
            }
            for parameter in &op.parameters {
                errors.extend(self.resolve(&parameter.type_expr).errors().iter().cloned());
            }
            if let Some(ret) = &op.return_type {
                errors.extend(self.resolve(ret).errors().iter().cloned());
            }
        }

        if let Some(container) = &self.container {
            let sources = container
                .entity_sets
                .iter()
                .cloned()
                .map(NavigationSource::EntitySet)
                .chain(container.singletons.iter().cloned().map(NavigationSource::Singleton));
            for source in sources {
                errors.extend(self.navigation_source_type(&source).errors().iter().cloned());
                for target in source.bindings().into_iter().flat_map(|b| b.values()) {
                    errors.extend(self.find_navigation_source(target, false).errors().iter().cloned());
                }
            }
        }

        errors
    }
}

fn fold_names<'a>(names: impl Iterator<Item = &'a String>) -> HashMap<String, Vec<String>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for name in names {
        index
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(name.clone());
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SchemaBuilder, TypeKind};

    fn schema() -> Schema {
        SchemaBuilder::new("Sales")
            .entity_type("Person", |t| t.key_property("Id", "Edm.Int32").property("Name", "Edm.String"))
            .entity_type("Customer", |t| t.base("Sales.Person").navigation("Orders", "Collection(Sales.Order)"))
            .entity_type("VipCustomer", |t| t.base("Sales.Customer"))
            .entity_type("Order", |t| t.key_property("OrderId", "Edm.Int64").property("Amount", "Edm.Decimal"))
            .container("Default")
            .entity_set("Customers", "Sales.Customer")
            .entity_set("Orders", "Sales.Order")
            .binding("Customers", "Orders", "Orders")
            .build()
    }

    #[test]
    fn test_find_type_variants() {
        let schema = schema();
        assert_eq!(schema.find_type("Sales.Customer").kind(), TypeKind::Entity);
        assert_eq!(schema.find_type("Edm.Int32"), SchemaType::Primitive(PrimitiveKind::Int32));
        assert_eq!(schema.find_type("Collection(Sales.Order)").kind(), TypeKind::Collection);

        let missing = schema.find_type("Sales.Missing");
        assert!(missing.is_bad());
        assert_eq!(missing.errors()[0].code, OD0101);
        assert_eq!(missing.name(), "Missing");
    }

    #[test]
    fn test_case_insensitive_type_lookup() {
        let schema = schema();
        assert!(schema.find_type("sales.customer").is_bad());
        assert_eq!(
            schema.find_type_ignore_case("sales.customer"),
            schema.find_type("Sales.Customer")
        );
    }

    #[test]
    fn test_inherited_key_and_properties() {
        let schema = schema();
        let vip = schema.find_type("Sales.VipCustomer");
        let keys = schema.key_properties(&vip).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "Id");
        assert_eq!(keys[0].ty.as_primitive(), Some(PrimitiveKind::Int32));

        assert!(schema.find_property(&vip, "Orders", false).is_found());
        let names: Vec<_> = schema
            .all_properties(&vip)
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["Id", "Name", "Orders"]);
    }

    #[test]
    fn test_assignability() {
        let schema = schema();
        let person = schema.find_type("Sales.Person");
        let vip = schema.find_type("Sales.VipCustomer");
        let order = schema.find_type("Sales.Order");
        assert!(schema.is_assignable(&person, &vip));
        assert!(!schema.is_assignable(&vip, &person));
        assert!(schema.is_related(&vip, &person));
        assert!(!schema.is_related(&order, &person));
        assert_eq!(schema.inheritance_distance(&person, &vip), Some(2));
        assert_eq!(schema.derived_types(&person).len(), 2);
    }

    #[test]
    fn test_navigation_target() {
        let schema = schema();
        let customers = schema.find_navigation_source("Customers", false);
        let customer = schema.navigation_source_type(&customers);
        let orders = schema.find_property(&customer, "Orders", false).found().unwrap();
        let nav = orders.property.as_navigation().unwrap();
        let target = schema.find_navigation_target(&customers, nav, "Orders").unwrap();
        assert_eq!(target.name(), "Orders");

        let orders_set = schema.find_navigation_source("Default/Orders", false);
        assert_eq!(target, orders_set);
        assert!(schema.find_navigation_source("Other/Orders", false).is_bad());
    }

    #[test]
    fn test_duplicate_types_are_ambiguous() {
        let dup = |b: SchemaBuilder| b.complex_type("Point", |t| t.property("X", "Edm.Double"));
        let schema = dup(dup(SchemaBuilder::new("Geo"))).build();
        let found = schema.find_type("Geo.Point");
        assert!(found.is_ambiguous());
        assert_eq!(found.errors()[0].code, OD0111);
        assert!(!schema.validate().is_empty());
    }

    #[test]
    fn test_schema_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }
}
