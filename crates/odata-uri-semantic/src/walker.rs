//! Path segment walker
//!
//! Consumes raw segments one at a time and turns them into typed
//! [`PathSegment`]s while tracking what the path currently addresses:
//!
//! | Segment | Navigation source | Type |
//! |---|---|---|
//! | entity set / singleton | that source | its (collection of) entity type |
//! | navigation property | binding target, or unknown | property target type |
//! | key predicate | unchanged | element type |
//! | type cast | unchanged | cast type (collection-aware) |
//! | structural / dynamic property | none | property type |
//! | operation | entity-set path target, or unknown | return type |
//! | `$count` / `$value` | none | scalar |
//! | `$ref` | unchanged | unchanged |
//!
//! A second segment list feeds the canonical URI: entity sets and
//! singletons restart it, everything else appends.

use odata_uri_diagnostics::{
    Result, UriError, OD0001, OD0003, OD0102, OD0104, OD0200, OD0203, OD0204, OD0205, OD0206,
    OD0207, OD0208, OD0209, OD0211, OD0213, OD0403,
};
use odata_uri_literal::{ProtocolVersion, from_literal_text};
use odata_uri_schema::{
    Lookup, NavigationProperty, NavigationSource, Operation, OperationImport, PrimitiveKind,
    Property, PropertyRef, Schema, SchemaType, TypeReference,
};
use odata_uri_syntax::{RawPath, RawSegment, SystemSegment};
use std::sync::Arc;

use crate::policy::select_overload;
use crate::{KeyValue, ODataPath, PathSegment, ResolutionLimits, ResolverPolicy};

/// What the path addresses after the last segment
#[derive(Debug, Clone, Default)]
pub struct WalkerState {
    pub ty: Option<SchemaType>,
    pub source: Option<NavigationSource>,
    /// Last structural property, while the path is inside one
    pub property: Option<PropertyRef>,
    pub is_raw_value: bool,
    pub is_reference: bool,
    pub is_operation_result: bool,
    /// Source that navigation bindings are looked up on, and the property
    /// path walked from it (`Address/Country`, `Ns.Vip/Manager`)
    binding_source: Option<NavigationSource>,
    binding_path: Vec<String>,
    dynamic: bool,
    terminal: bool,
    closed: bool,
}

/// An operation overload together with the import it was reached through
type OperationCandidate = (Option<Arc<OperationImport>>, Arc<Operation>);

/// Walks one resource path; create a fresh walker per request
#[derive(Debug)]
pub struct PathWalker<'a> {
    schema: &'a Schema,
    policy: &'a dyn ResolverPolicy,
    version: ProtocolVersion,
    limits: ResolutionLimits,
    segments: Vec<PathSegment>,
    canonical: Vec<PathSegment>,
    state: WalkerState,
}

impl<'a> PathWalker<'a> {
    pub fn new(schema: &'a Schema, policy: &'a dyn ResolverPolicy) -> Self {
        Self {
            schema,
            policy,
            version: ProtocolVersion::default(),
            limits: ResolutionLimits::default(),
            segments: Vec::new(),
            canonical: Vec::new(),
            state: WalkerState::default(),
        }
    }

    /// Walker positioned on a single resource of type `ty`, used for the
    /// nested walks of `$select` and `$expand` items
    pub fn from_resource(
        schema: &'a Schema,
        policy: &'a dyn ResolverPolicy,
        ty: SchemaType,
        source: Option<NavigationSource>,
    ) -> Self {
        let mut walker = Self::new(schema, policy);
        walker.state.ty = Some(ty);
        walker.state.binding_source = source.clone();
        walker.state.source = source;
        walker
    }

    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_limits(mut self, limits: ResolutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn state(&self) -> &WalkerState {
        &self.state
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Walk a whole path
    pub fn walk(mut self, path: &RawPath) -> Result<ODataPath> {
        self.limits.check_segments(path.len())?;
        for raw in path {
            self.step(raw).map_err(|e| e.or_location(raw.location()))?;
        }
        Ok(self.finish())
    }

    pub fn finish(self) -> ODataPath {
        ODataPath::new(self.segments, self.canonical, self.state, self.version)
    }

    fn is_root(&self) -> bool {
        self.segments.is_empty() && self.state.ty.is_none()
    }

    /// Consume one raw segment
    pub fn step(&mut self, raw: &RawSegment) -> Result<()> {
        if self.state.terminal {
            let last = self
                .segments
                .last()
                .map(|s| s.to_uri_text(self.version))
                .unwrap_or_default();
            return Err(UriError::structural(
                OD0208,
                format!("Segment '{}' cannot follow '{}'", raw, last),
            ));
        }
        if self.state.closed {
            return Err(UriError::structural(
                OD0213,
                format!("Segment '{}' follows an operation that is not composable", raw),
            ));
        }

        if let Some(system) = raw.system() {
            if raw.parenthetical.is_some() {
                return Err(UriError::syntax(
                    OD0001,
                    format!("System segment '{}' takes no arguments", raw.identifier),
                    raw.to_string(),
                ));
            }
            return self.system_segment(system, raw);
        }

        if self.is_root() {
            return self.root_segment(raw);
        }

        let ty = self.current_type(raw)?;
        if raw.identifier.contains('.') {
            self.qualified_segment(raw, &ty)
        } else {
            self.member_segment(raw, &ty)
        }
    }

    fn push(&mut self, segment: PathSegment) {
        log::trace!(
            "segment '{}' -> {}",
            segment.to_uri_text(self.version),
            segment.ty().map_or_else(|| "-".to_string(), |t| t.full_name())
        );
        if matches!(segment, PathSegment::EntitySet { .. } | PathSegment::Singleton { .. }) {
            self.canonical.clear();
        }
        self.canonical.push(segment.clone());
        self.segments.push(segment);
    }

    fn current_type(&self, raw: &RawSegment) -> Result<SchemaType> {
        match &self.state.ty {
            Some(ty) => Ok(ty.clone()),
            None if self.state.dynamic => Err(UriError::structural(
                OD0200,
                format!("Segment '{}' cannot follow a dynamic property", raw),
            )),
            None => Err(UriError::structural(
                OD0200,
                format!("Segment '{}' follows a segment without a result", raw),
            )),
        }
    }

    // === System segments ===

    fn system_segment(&mut self, system: SystemSegment, raw: &RawSegment) -> Result<()> {
        match system {
            SystemSegment::Batch | SystemSegment::Metadata | SystemSegment::Entity => {
                if !self.is_root() {
                    return Err(UriError::structural(
                        OD0200,
                        format!("'{}' must be the only segment of the path", raw.identifier),
                    ));
                }
                self.push(match system {
                    SystemSegment::Batch => PathSegment::Batch,
                    SystemSegment::Metadata => PathSegment::Metadata,
                    _ => PathSegment::Entity,
                });
                self.state.terminal = true;
                Ok(())
            }
            SystemSegment::Each => Err(UriError::structural(
                OD0209,
                "Bulk operations ($each) are not supported",
            )),
            SystemSegment::Count => {
                if !self.state.ty.as_ref().is_some_and(SchemaType::is_collection) {
                    return Err(UriError::structural(
                        OD0205,
                        "$count must follow a collection",
                    ));
                }
                self.push(PathSegment::Count);
                self.state.ty = Some(SchemaType::Primitive(PrimitiveKind::Int32));
                self.state.source = None;
                self.state.property = None;
                self.state.is_raw_value = true;
                self.state.terminal = true;
                Ok(())
            }
            SystemSegment::Value => {
                let value_ty = self.raw_value_type().ok_or_else(|| {
                    UriError::structural(
                        OD0206,
                        "$value must follow a primitive property or a media entity",
                    )
                })?;
                self.push(PathSegment::Value { ty: value_ty.clone() });
                self.state.ty = Some(value_ty);
                self.state.source = None;
                self.state.is_raw_value = true;
                self.state.terminal = true;
                Ok(())
            }
            SystemSegment::Ref => {
                let after_navigation = match self.segments.as_slice() {
                    [.., PathSegment::Navigation { .. }] => true,
                    [.., PathSegment::Navigation { .. }, PathSegment::Key { .. }] => true,
                    _ => false,
                };
                if !after_navigation {
                    return Err(UriError::structural(
                        OD0207,
                        "$ref must follow a navigation property",
                    ));
                }
                self.push(PathSegment::NavigationLink);
                self.state.is_reference = true;
                self.state.terminal = true;
                Ok(())
            }
        }
    }

    fn raw_value_type(&self) -> Option<SchemaType> {
        if self.state.dynamic {
            return Some(SchemaType::Primitive(PrimitiveKind::String));
        }
        let ty = self.state.ty.as_ref().filter(|t| !t.is_collection())?;
        if self.state.property.is_some() && (ty.as_primitive().is_some() || ty.as_enum().is_some()) {
            return Some(ty.clone());
        }
        ty.as_entity()
            .filter(|def| def.has_stream)
            .map(|_| SchemaType::Primitive(PrimitiveKind::Stream))
    }

    // === First segment ===

    fn root_segment(&mut self, raw: &RawSegment) -> Result<()> {
        let source = self
            .policy
            .resolve_navigation_source(self.schema, &raw.identifier, self.policy.case_insensitive());
        if !source.is_bad() {
            return self.enter_source(source, raw);
        }

        let not_found = source.errors().iter().all(|e| e.code == OD0102);
        if not_found {
            let imports = self
                .policy
                .resolve_operation_imports(self.schema, &raw.identifier, self.policy.case_insensitive());
            if !imports.is_empty() {
                let mut candidates = Vec::new();
                for import in imports {
                    for op in self.schema.find_operations(&import.operation, None) {
                        candidates.push((Some(import.clone()), op));
                    }
                }
                if candidates.is_empty() {
                    return Err(UriError::resolution(
                        OD0104,
                        format!("Operation import '{}' refers to no unbound operation", raw.identifier),
                    ));
                }
                return self.operation_segment(raw, candidates);
            }
        }
        Err(UriError::from_diagnostics(source.errors()))
    }

    fn enter_source(&mut self, source: NavigationSource, raw: &RawSegment) -> Result<()> {
        let element = self.schema.navigation_source_type(&source);
        element.require_concrete()?;

        let (segment, ty) = if source.is_single() {
            (
                PathSegment::Singleton {
                    source: source.clone(),
                    ty: element.clone(),
                },
                element,
            )
        } else {
            let ty = SchemaType::collection(element);
            (
                PathSegment::EntitySet {
                    source: source.clone(),
                    ty: ty.clone(),
                },
                ty,
            )
        };
        self.push(segment);
        self.state = WalkerState {
            ty: Some(ty),
            source: Some(source.clone()),
            binding_source: Some(source),
            ..WalkerState::default()
        };
        self.key_if_present(raw)
    }

    // === Members ===

    fn qualified_segment(&mut self, raw: &RawSegment, current: &SchemaType) -> Result<()> {
        let case_insensitive = self.policy.case_insensitive();
        let cast = self.policy.resolve_type(self.schema, &raw.identifier, case_insensitive);
        if cast.is_structured() {
            return self.type_cast(raw, cast, current);
        }
        if cast.is_ambiguous() {
            return Err(UriError::from_diagnostics(cast.errors()));
        }

        let operations = self
            .policy
            .resolve_bound_operations(self.schema, &raw.identifier, current, case_insensitive)?;
        if !operations.is_empty() {
            return self.operation_segment(raw, operations.into_iter().map(|op| (None, op)).collect());
        }
        let unresolved = UriError::resolution(
            OD0104,
            format!(
                "'{}' is neither a type nor an operation bound to '{}'",
                raw.identifier, current
            ),
        );
        // the failed type lookup explains why no cast was possible
        if cast.errors().is_empty() {
            return Err(unresolved);
        }
        let mut errors = vec![unresolved];
        errors.extend(cast.errors().iter().map(UriError::from_diagnostic));
        Err(UriError::Multiple(errors))
    }

    fn type_cast(&mut self, raw: &RawSegment, target: SchemaType, current: &SchemaType) -> Result<()> {
        let element = current.element_type();
        if !self.schema.is_assignable(element, &target) {
            return Err(UriError::structural(
                OD0203,
                format!("Type '{}' does not derive from '{}'", target, element),
            ));
        }
        let ty = if current.is_collection() {
            SchemaType::collection(target.clone())
        } else {
            target.clone()
        };
        self.push(PathSegment::TypeCast { ty: ty.clone() });
        self.state.binding_path.push(target.full_name());
        self.state.ty = Some(ty);
        self.state.property = None;
        self.key_if_present(raw)
    }

    fn member_segment(&mut self, raw: &RawSegment, current: &SchemaType) -> Result<()> {
        let name = raw.identifier.as_str();
        if current.is_collection() {
            let operations = self
                .policy
                .resolve_bound_operations(self.schema, name, current, self.policy.case_insensitive())?;
            if !operations.is_empty() {
                return self.operation_segment(raw, operations.into_iter().map(|op| (None, op)).collect());
            }
            return Err(UriError::structural(
                OD0200,
                format!("'{}' cannot follow a collection; address a single entity first", name),
            ));
        }
        if !current.is_structured() && !current.is_bad() {
            return Err(UriError::structural(
                OD0204,
                format!("Type '{}' has no properties to navigate to '{}'", current, name),
            ));
        }

        let case_insensitive = self.policy.case_insensitive();
        match self.policy.resolve_property(self.schema, current, name, case_insensitive) {
            Lookup::Found(property) => self.property_segment(raw, property),
            Lookup::Ambiguous(_, errors) => Err(UriError::from_diagnostics(&errors)),
            Lookup::NotFound(errors) => {
                let operations = self
                    .policy
                    .resolve_bound_operations(self.schema, name, current, case_insensitive)?;
                if !operations.is_empty() {
                    return self.operation_segment(raw, operations.into_iter().map(|op| (None, op)).collect());
                }
                if current.is_open() {
                    self.push(PathSegment::DynamicProperty {
                        name: name.to_string(),
                    });
                    self.state.ty = None;
                    self.state.source = None;
                    self.state.property = None;
                    self.state.dynamic = true;
                    return self.key_if_present(raw);
                }
                Err(UriError::from_diagnostics(&errors))
            }
        }
    }

    fn property_segment(&mut self, raw: &RawSegment, property: PropertyRef) -> Result<()> {
        match &property.property {
            Property::Navigation(nav) => {
                let nav = nav.clone();
                self.navigation_segment(raw, nav)
            }
            Property::Structural(_) => {
                let ty = self.schema.property_type(&property.property).ty;
                self.state.binding_path.push(property.name().to_string());
                self.push(PathSegment::Property {
                    property: property.clone(),
                    ty: ty.clone(),
                });
                self.state.ty = Some(ty);
                self.state.source = None;
                self.state.property = Some(property);
                self.key_if_present(raw)
            }
        }
    }

    fn navigation_segment(&mut self, raw: &RawSegment, nav: NavigationProperty) -> Result<()> {
        let ty = self.schema.resolve(&nav.target);
        let mut path = self.state.binding_path.clone();
        path.push(nav.name.clone());
        let target = self
            .state
            .binding_source
            .as_ref()
            .and_then(|source| self.schema.find_navigation_target(source, &nav, &path.join("/")));
        if target.is_none() {
            log::trace!("navigation '{}' has no known target", nav.name);
        }

        self.push(PathSegment::Navigation {
            property: nav,
            target: target.clone(),
            ty: ty.clone(),
        });
        self.state.ty = Some(ty);
        self.state.source = target.clone();
        self.state.binding_source = target;
        self.state.binding_path.clear();
        self.state.property = None;
        self.key_if_present(raw)
    }

    // === Keys ===

    fn key_if_present(&mut self, raw: &RawSegment) -> Result<()> {
        if raw.parenthetical.is_none() {
            return Ok(());
        }
        self.apply_key(raw)
    }

    fn apply_key(&mut self, raw: &RawSegment) -> Result<()> {
        let ty = self.current_type(raw)?;
        if !ty.is_collection() {
            return Err(UriError::structural(
                OD0211,
                format!("Key predicate on single-valued segment '{}'", raw.identifier),
            ));
        }
        let element = ty.element_type().clone();
        let args = raw.arguments()?;

        let (schema, version) = (self.schema, self.version);
        let mut convert = |text: &str, expected: &TypeReference| from_literal_text(text, expected, schema, version);
        let values = self
            .policy
            .resolve_keys(self.schema, &element, &args, &mut convert, self.policy.case_insensitive())?;

        // a key on a bound navigation addresses an entity of the target set
        let reroot = match self.segments.last() {
            Some(PathSegment::Navigation {
                target: Some(target),
                ..
            }) if target.is_container_level() => Some(target.clone()),
            _ => None,
        };

        let key = PathSegment::Key {
            values,
            ty: element.clone(),
            source: self.state.source.clone(),
        };
        self.push(key.clone());
        if let Some(target) = reroot {
            let set = PathSegment::EntitySet {
                source: target,
                ty: ty.clone(),
            };
            self.canonical = vec![set, key];
        }
        self.state.ty = Some(element);
        self.state.property = None;
        Ok(())
    }

    // === Operations ===

    fn operation_segment(&mut self, raw: &RawSegment, candidates: Vec<OperationCandidate>) -> Result<()> {
        let args = raw.arguments()?;
        if args.iter().any(|arg| arg.name.is_none()) {
            return Err(UriError::syntax(
                OD0003,
                format!("Arguments of '{}' must be named", raw.identifier),
                raw.to_string(),
            ));
        }
        let names: Vec<&str> = args.iter().filter_map(|arg| arg.name.as_deref()).collect();
        let (import, operation) = select_overload(
            self.schema,
            candidates,
            |(_, op): &OperationCandidate| op.as_ref(),
            &names,
            self.policy.case_insensitive(),
        )?;

        if operation.is_action() && !args.is_empty() {
            return Err(UriError::binding(
                OD0403,
                format!("Action '{}' takes no arguments in the path", operation.full_name()),
            ));
        }

        let matched = self
            .policy
            .resolve_operation_parameters(&operation, &names, self.policy.case_insensitive())?;
        let mut arguments = Vec::with_capacity(matched.len());
        for (name, index) in &matched {
            let Some(parameter) = operation.parameter(name) else {
                continue;
            };
            let expected = TypeReference::new(self.schema.resolve(&parameter.type_expr), parameter.nullable);
            expected.ty.require_concrete()?;
            let value = from_literal_text(&args[*index].value, &expected, self.schema, self.version)?;
            arguments.push(KeyValue {
                name: name.clone(),
                value,
            });
        }

        let ty = operation.return_type.as_ref().map(|r| self.schema.resolve(r));
        if let Some(ty) = &ty {
            ty.require_concrete()?;
        }
        let target = self.operation_target(&operation, import.as_deref());

        let composable = operation.is_function() && operation.is_composable;
        self.push(PathSegment::Operation {
            operation,
            import,
            arguments,
            target: target.clone(),
            ty: ty.clone(),
        });
        self.state = WalkerState {
            ty,
            source: target.clone(),
            binding_source: target,
            is_operation_result: true,
            closed: !composable,
            ..WalkerState::default()
        };
        Ok(())
    }

    /// Navigation source of an operation result: the import's entity set,
    /// or the entity-set path walked from the binding source
    fn operation_target(&self, operation: &Operation, import: Option<&OperationImport>) -> Option<NavigationSource> {
        if let Some(import) = import {
            return import
                .entity_set
                .as_deref()
                .map(|set| {
                    self.policy
                        .resolve_navigation_source(self.schema, set, self.policy.case_insensitive())
                });
        }

        let path = operation.entity_set_path.as_ref()?;
        let mut source = self.state.source.clone()?;
        for step in &path.navigation {
            let ty = self.schema.navigation_source_type(&source);
            let property = self.schema.find_property(&ty, step, false).found()?;
            let nav = property.property.as_navigation()?.clone();
            match self.schema.find_navigation_target(&source, &nav, step) {
                Some(next) => source = next,
                None => {
                    log::trace!("entity set path of '{}' stops at '{}'", operation.full_name(), step);
                    return None;
                }
            }
        }
        Some(source)
    }
}
