//! Query option binder
//!
//! Binds `$filter`, `$orderby`, `$select`, `$expand` and the scalar options
//! against the type a resolved path addresses. Paths inside `$select` and
//! `$expand` go through a nested [`PathWalker`] positioned on the addressed
//! resource, so they follow the same segment rules as the resource path.

use indexmap::IndexMap;
use odata_uri_diagnostics::{
    Result, UriError, OD0003, OD0004, OD0006, OD0011, OD0100, OD0104, OD0107, OD0200, OD0203,
    OD0204, OD0205, OD0213, OD0303, OD0304, OD0403,
};
use odata_uri_literal::{Coercer, LiteralValue, ProtocolVersion, from_literal_text, parse_literal};
use odata_uri_schema::{
    Lookup, NavigationProperty, NavigationSource, Operation, PrimitiveKind, Schema, SchemaType,
    TypeReference,
};
use odata_uri_syntax::{
    ArgumentToken, BinaryOperator, ExpandItemToken, LambdaKind, LiteralToken, OrderDirection, QueryOptionsToken,
    QueryToken, RawSegment, SelectItemToken, UnaryOperator,
};
use std::sync::Arc;

use crate::functions::{FunctionTable, is_type_function};
use crate::policy::select_overload;
use crate::scope::IT;
use crate::{
    BoundExpr, ODataPath, PathKind, PathSegment, PathWalker, ResolutionLimits, ResolverPolicy,
    ScopeManager,
};

/// One `$orderby` item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub expression: BoundExpr,
    pub direction: OrderDirection,
}

/// One bound `$select` item
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    All,
    /// `Ns.*`: every operation of a namespace
    AllOperations { namespace: String },
    /// Property path, possibly through type casts and complex properties
    Path(Vec<PathSegment>),
    /// Bound action or function name; all overloads for the selected type
    Operation(Vec<Arc<Operation>>),
}

/// One bound `$expand` item
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandItem {
    pub path: Vec<PathSegment>,
    pub navigation: NavigationProperty,
    /// `None` when the navigation target is unknown
    pub target: Option<NavigationSource>,
    /// Expanded type, after any trailing cast
    pub ty: SchemaType,
    pub is_ref: bool,
    pub options: BoundQueryOptions,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectExpandClause {
    pub select: Vec<SelectItem>,
    pub expand: Vec<ExpandItem>,
}

impl SelectExpandClause {
    /// No `$select`, or `$select=*`
    pub fn all_selected(&self) -> bool {
        self.select.is_empty() || self.select.contains(&SelectItem::All)
    }

    pub fn is_empty(&self) -> bool {
        self.select.is_empty() && self.expand.is_empty()
    }
}

/// `$levels` of an expand item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandLevels {
    Max,
    Count(u32),
}

/// Bound query options of a request or of an expand item
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundQueryOptions {
    pub filter: Option<BoundExpr>,
    pub order_by: Vec<OrderByClause>,
    pub select_expand: SelectExpandClause,
    pub top: Option<u64>,
    pub skip: Option<u64>,
    pub count: Option<bool>,
    pub search: Option<String>,
    pub levels: Option<ExpandLevels>,
}

/// What the options of one level apply to
struct Target {
    ty: SchemaType,
    source: Option<NavigationSource>,
    /// Expand nesting level; 0 for the request itself
    depth: usize,
}

/// Binds query option tokens for one request
#[derive(Debug)]
pub struct QueryBinder<'a> {
    schema: &'a Schema,
    policy: &'a dyn ResolverPolicy,
    functions: &'a FunctionTable,
    limits: ResolutionLimits,
    version: ProtocolVersion,
    coercer: Coercer,
}

impl<'a> QueryBinder<'a> {
    pub fn new(schema: &'a Schema, policy: &'a dyn ResolverPolicy) -> Self {
        Self {
            schema,
            policy,
            functions: FunctionTable::standard(),
            limits: ResolutionLimits::default(),
            version: ProtocolVersion::default(),
            coercer: Coercer::new(),
        }
    }

    pub fn with_limits(mut self, limits: ResolutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_functions(mut self, functions: &'a FunctionTable) -> Self {
        self.functions = functions;
        self
    }

    /// Bind the options of a request against its resolved path
    pub fn bind_options(&self, options: &QueryOptionsToken, path: &ODataPath) -> Result<BoundQueryOptions> {
        if options.is_empty() {
            return Ok(BoundQueryOptions::default());
        }
        if options.levels.is_some() {
            return Err(UriError::structural(OD0200, "$levels is only valid inside $expand"));
        }

        // options of `/Set/$count` apply to the counted collection
        let ty = match path.kind() {
            PathKind::Count => path
                .segments()
                .iter()
                .rev()
                .nth(1)
                .and_then(PathSegment::ty)
                .cloned(),
            _ => path.target_type().cloned(),
        };
        let ty = ty.ok_or_else(|| {
            UriError::structural(
                OD0200,
                format!("Path '{}' does not address a resource that takes query options", path),
            )
        })?;
        ty.require_concrete()?;

        let target = Target {
            ty,
            source: path.target_navigation_source().cloned(),
            depth: 0,
        };
        let mut expand_count = 0;
        self.bind_level(options, &target, &mut expand_count)
    }

    fn bind_level(
        &self,
        options: &QueryOptionsToken,
        target: &Target,
        expand_count: &mut usize,
    ) -> Result<BoundQueryOptions> {
        let element = target.ty.element_type().clone();
        let it = TypeReference::non_null(element.clone());
        let collection = target.ty.is_collection();
        let require_collection = |option: &str| {
            if collection {
                Ok(())
            } else {
                Err(UriError::structural(
                    OD0200,
                    format!("{} applies to collections only, not '{}'", option, target.ty),
                ))
            }
        };

        let mut bound = BoundQueryOptions::default();

        if let Some(filter) = &options.filter {
            require_collection("$filter")?;
            bound.filter = Some(self.bind_filter(filter, it.clone())?);
        }

        if !options.order_by.is_empty() {
            require_collection("$orderby")?;
            for item in &options.order_by {
                let mut scopes = ScopeManager::new(it.clone());
                let expression = self.bind_expr(&item.expression, &mut scopes)?;
                check_orderable(&expression)?;
                bound.order_by.push(OrderByClause {
                    expression,
                    direction: item.direction,
                });
            }
        }

        if !options.select.is_empty() || !options.expand.is_empty() {
            if !element.is_structured() {
                return Err(UriError::structural(
                    OD0204,
                    format!("$select and $expand need a structured type, not '{}'", element),
                ));
            }
            for item in &options.select {
                let selected = self.bind_select_item(item, &element, target.source.as_ref())?;
                bound.select_expand.select.push(selected);
            }
            if !options.expand.is_empty() {
                self.limits.check_expand_depth(target.depth + 1)?;
                for item in &options.expand {
                    let items = self.bind_expand_item(item, &element, target, expand_count)?;
                    bound.select_expand.expand.extend(items);
                }
            }
        }

        if let Some(top) = &options.top {
            require_collection("$top")?;
            bound.top = Some(parse_count_option("$top", top)?);
        }
        if let Some(skip) = &options.skip {
            require_collection("$skip")?;
            bound.skip = Some(parse_count_option("$skip", skip)?);
        }
        if let Some(count) = &options.count {
            if !collection {
                return Err(UriError::structural(
                    OD0205,
                    format!("$count applies to collections only, not '{}'", target.ty),
                ));
            }
            bound.count = Some(match count.trim() {
                "true" => true,
                "false" => false,
                other => {
                    return Err(UriError::syntax(
                        OD0004,
                        format!("$count must be true or false, got '{}'", other),
                        other,
                    ));
                }
            });
        }
        if let Some(search) = &options.search {
            require_collection("$search")?;
            let search = search.trim();
            if search.is_empty() {
                return Err(UriError::syntax(OD0004, "$search is empty", search));
            }
            bound.search = Some(search.to_string());
        }
        if let Some(levels) = &options.levels {
            let levels = parse_levels(levels)?;
            if let ExpandLevels::Count(n) = levels {
                let deepest = (target.depth + n as usize).saturating_sub(1);
                self.limits.check_expand_depth(deepest)?;
            }
            bound.levels = Some(levels);
        }

        Ok(bound)
    }

    // === $select / $expand ===

    fn bind_select_item(
        &self,
        item: &SelectItemToken,
        element: &SchemaType,
        source: Option<&NavigationSource>,
    ) -> Result<SelectItem> {
        match item.path.as_slice() {
            [] => Err(UriError::syntax(OD0011, "Empty $select item", "")),
            [star] if star == "*" => Ok(SelectItem::All),
            [name] if name.ends_with(".*") => {
                let namespace = &name[..name.len() - 2];
                let case_insensitive = self.policy.case_insensitive();
                let known = self.schema.namespaces().iter().find(|ns| {
                    if case_insensitive {
                        ns.eq_ignore_ascii_case(namespace)
                    } else {
                        ns.as_str() == namespace
                    }
                });
                match known {
                    Some(ns) => Ok(SelectItem::AllOperations {
                        namespace: ns.clone(),
                    }),
                    None => Err(UriError::resolution(
                        OD0100,
                        format!("Namespace '{}' not found", namespace),
                    )),
                }
            }
            [name]
                if name.contains('.')
                    && !self
                        .policy
                        .resolve_type(self.schema, name, self.policy.case_insensitive())
                        .is_structured() =>
            {
                let operations = self.policy.resolve_bound_operations(
                    self.schema,
                    name,
                    element,
                    self.policy.case_insensitive(),
                )?;
                if operations.is_empty() {
                    return Err(UriError::resolution(
                        OD0104,
                        format!("No operation '{}' is bound to '{}'", name, element),
                    ));
                }
                Ok(SelectItem::Operation(operations))
            }
            path => {
                let segments = self.walk_nested(path, element, source)?;
                let (last, inner) = segments
                    .split_last()
                    .ok_or_else(|| UriError::syntax(OD0011, "Empty $select item", ""))?;
                for segment in inner {
                    if !matches!(segment, PathSegment::TypeCast { .. } | PathSegment::Property { .. }) {
                        return Err(UriError::structural(
                            OD0200,
                            format!("Cannot select through '{}'", segment.to_uri_text(self.version)),
                        ));
                    }
                }
                match last {
                    PathSegment::Operation { operation, .. } => {
                        Ok(SelectItem::Operation(vec![operation.clone()]))
                    }
                    PathSegment::Property { .. }
                    | PathSegment::DynamicProperty { .. }
                    | PathSegment::Navigation { .. }
                    | PathSegment::TypeCast { .. } => Ok(SelectItem::Path(segments.clone())),
                    other => Err(UriError::structural(
                        OD0200,
                        format!("'{}' cannot be selected", other.to_uri_text(self.version)),
                    )),
                }
            }
        }
    }

    fn bind_expand_item(
        &self,
        item: &ExpandItemToken,
        element: &SchemaType,
        target: &Target,
        expand_count: &mut usize,
    ) -> Result<Vec<ExpandItem>> {
        if item.is_ref && !(item.options.select.is_empty() && item.options.expand.is_empty()) {
            return Err(UriError::structural(
                OD0200,
                "$ref expansions take no nested $select or $expand",
            ));
        }

        if item.path.len() == 1 && item.path[0] == "*" {
            let navigations: Vec<NavigationProperty> = self
                .schema
                .all_properties(element)
                .into_iter()
                .filter_map(|p| p.property.as_navigation().cloned())
                .collect();
            let mut items = Vec::with_capacity(navigations.len());
            for navigation in navigations {
                let path = [navigation.name.clone()];
                let segments = self.walk_nested(&path, element, target.source.as_ref())?;
                items.push(self.expand_from_segments(item, segments, target, expand_count)?);
            }
            return Ok(items);
        }

        let segments = self.walk_nested(&item.path, element, target.source.as_ref())?;
        Ok(vec![self.expand_from_segments(item, segments, target, expand_count)?])
    }

    fn expand_from_segments(
        &self,
        item: &ExpandItemToken,
        segments: Vec<PathSegment>,
        target: &Target,
        expand_count: &mut usize,
    ) -> Result<ExpandItem> {
        *expand_count += 1;
        self.limits.check_expand_count(*expand_count)?;

        let not_expandable = || {
            UriError::structural(
                OD0200,
                format!("$expand path '{}' must end with a navigation property", item.path.join("/")),
            )
        };
        let index = segments
            .iter()
            .rposition(|s| matches!(s, PathSegment::Navigation { .. }))
            .ok_or_else(not_expandable)?;
        let prefix_ok = segments[..index]
            .iter()
            .all(|s| matches!(s, PathSegment::TypeCast { .. } | PathSegment::Property { .. }));
        let suffix_ok = segments.len() - index <= 2
            && segments[index + 1..]
                .iter()
                .all(|s| matches!(s, PathSegment::TypeCast { .. }));
        if !prefix_ok || !suffix_ok {
            return Err(not_expandable());
        }

        let PathSegment::Navigation {
            property,
            target: nav_target,
            ty: nav_ty,
        } = &segments[index]
        else {
            return Err(not_expandable());
        };
        let ty = match segments.last() {
            Some(PathSegment::TypeCast { ty }) => ty.clone(),
            _ => nav_ty.clone(),
        };

        let nested = Target {
            ty: ty.clone(),
            source: nav_target.clone(),
            depth: target.depth + 1,
        };
        let options = if item.options.is_empty() {
            BoundQueryOptions::default()
        } else {
            ty.require_concrete()?;
            self.bind_level(&item.options, &nested, expand_count)?
        };

        Ok(ExpandItem {
            navigation: property.clone(),
            target: nav_target.clone(),
            path: segments.clone(),
            ty,
            is_ref: item.is_ref,
            options,
        })
    }

    /// Walk `path` from a single resource of type `element`
    fn walk_nested(
        &self,
        path: &[String],
        element: &SchemaType,
        source: Option<&NavigationSource>,
    ) -> Result<Vec<PathSegment>> {
        let mut walker = PathWalker::from_resource(self.schema, self.policy, element.clone(), source.cloned())
            .with_version(self.version)
            .with_limits(self.limits);
        for name in path {
            walker.step(&RawSegment::new(name.clone()))?;
        }
        Ok(walker.segments().to_vec())
    }

    // === Expressions ===

    /// Bind a `$filter` expression; the result must be Boolean
    pub fn bind_filter(&self, token: &QueryToken, it: TypeReference) -> Result<BoundExpr> {
        let mut scopes = ScopeManager::new(it);
        let expr = self.bind_expr(token, &mut scopes)?;
        if !expr.is_boolean_like() {
            return Err(UriError::coercion(OD0304, "$filter expression must be Boolean"));
        }
        Ok(expr)
    }

    /// Bind any expression token in the given scopes
    pub fn bind_expr(&self, token: &QueryToken, scopes: &mut ScopeManager) -> Result<BoundExpr> {
        match token {
            QueryToken::Literal(literal) => self.bind_literal(literal),
            QueryToken::Path { parent, name } => self.bind_path(parent.as_deref(), name, scopes),
            QueryToken::Binary { op, left, right } => {
                let mut left = self.bind_expr(left, scopes)?;
                let mut right = self.bind_expr(right, scopes)?;
                let ty = self
                    .policy
                    .promote_binary_operand_types(self.schema, *op, &mut left, &mut right)?;
                Ok(BoundExpr::Binary {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right),
                    ty,
                })
            }
            QueryToken::Unary { op, operand } => {
                let operand = self.bind_expr(operand, scopes)?;
                self.bind_unary(*op, operand)
            }
            QueryToken::FunctionCall {
                parent,
                name,
                arguments,
            } => self.bind_call(parent.as_deref(), name, arguments, scopes),
            QueryToken::Lambda {
                kind,
                parent,
                variable,
                body,
            } => self.bind_lambda(*kind, parent, variable.as_deref(), body.as_deref(), scopes),
            QueryToken::In { left, right } => {
                let left = self.bind_expr(left, scopes)?;
                let right = self.bind_expr(right, scopes)?;
                self.bind_in(left, right)
            }
            QueryToken::List(items) => self.bind_list(items, scopes),
        }
    }

    fn bind_literal(&self, literal: &LiteralToken) -> Result<BoundExpr> {
        if let Some(type_name) = &literal.type_name {
            let ty = self
                .policy
                .resolve_type(self.schema, type_name, self.policy.case_insensitive());
            ty.require_concrete()?;
            let expected = TypeReference::nullable(ty);
            let value = from_literal_text(&literal.text, &expected, self.schema, self.version)?;
            return Ok(BoundExpr::Constant {
                value,
                ty: Some(expected),
            });
        }

        match parse_literal(&literal.text, self.version)? {
            LiteralValue::Enum(value) => {
                let ty = self
                    .policy
                    .resolve_type(self.schema, &value.type_name, self.policy.case_insensitive());
                ty.require_concrete()?;
                let value = self.coercer.bind_enum(value, &ty, self.schema)?;
                Ok(BoundExpr::Constant {
                    value: LiteralValue::Enum(value),
                    ty: Some(TypeReference::non_null(ty)),
                })
            }
            value => {
                let ty = value
                    .primitive_kind()
                    .map(|kind| TypeReference::primitive(kind, false));
                Ok(BoundExpr::Constant { value, ty })
            }
        }
    }

    fn range_variable(&self, name: &str, scopes: &ScopeManager) -> Option<BoundExpr> {
        let variable = match name {
            "$it" | "$this" => scopes.it()?,
            _ => scopes.lookup(name)?,
        };
        Some(BoundExpr::RangeVariable {
            name: variable.name.clone(),
            ty: variable.ty.clone(),
        })
    }

    fn bind_path(&self, parent: Option<&QueryToken>, name: &str, scopes: &mut ScopeManager) -> Result<BoundExpr> {
        let source = match parent {
            Some(parent) => self.bind_expr(parent, scopes)?,
            None => {
                if let Some(variable) = self.range_variable(name, scopes) {
                    return Ok(variable);
                }
                if name.starts_with('$') {
                    return Err(UriError::resolution(
                        OD0107,
                        format!("Range variable '{}' is not defined here", name),
                    ));
                }
                self.range_variable(IT, scopes).ok_or_else(|| {
                    UriError::resolution(OD0107, "No implicit range variable in scope")
                })?
            }
        };
        self.bind_member(source, name)
    }

    fn bind_member(&self, source: BoundExpr, name: &str) -> Result<BoundExpr> {
        let Some(source_ty) = source.type_ref() else {
            // members of dynamic values are dynamic too
            return Ok(BoundExpr::DynamicProperty {
                source: Box::new(source),
                name: name.to_string(),
            });
        };
        let ty = source_ty.ty.clone();

        if name.contains('.') {
            let target = self.policy.resolve_type(self.schema, name, self.policy.case_insensitive());
            if target.is_bad() || target.is_ambiguous() {
                return Err(UriError::from_diagnostics(target.errors()));
            }
            let element = ty.element_type();
            if !target.is_structured() || !self.schema.is_assignable(element, &target) {
                return Err(UriError::structural(
                    OD0203,
                    format!("Type '{}' does not derive from '{}'", target, element),
                ));
            }
            let cast = if ty.is_collection() {
                SchemaType::collection(target)
            } else {
                target
            };
            return Ok(BoundExpr::TypeCast {
                source: Box::new(source),
                ty: TypeReference::new(cast, source_ty.nullable),
            });
        }

        if ty.is_collection() {
            return Err(UriError::structural(
                OD0200,
                format!("'{}' cannot be read from collection '{}'; use any() or all()", name, ty),
            ));
        }
        if ty.is_bad() || ty.is_ambiguous() {
            return Err(UriError::from_diagnostics(ty.errors()));
        }
        if !ty.is_structured() {
            return Err(UriError::structural(
                OD0204,
                format!("Type '{}' has no property '{}'", ty, name),
            ));
        }

        match self
            .policy
            .resolve_property(self.schema, &ty, name, self.policy.case_insensitive())
        {
            Lookup::Found(property) => {
                let property_ty = self.schema.property_type(&property.property);
                property_ty.ty.require_concrete()?;
                Ok(BoundExpr::Property {
                    source: Box::new(source),
                    property,
                    ty: property_ty,
                })
            }
            Lookup::NotFound(_) if ty.is_open() => Ok(BoundExpr::DynamicProperty {
                source: Box::new(source),
                name: name.to_string(),
            }),
            Lookup::NotFound(errors) | Lookup::Ambiguous(_, errors) => {
                Err(UriError::from_diagnostics(&errors))
            }
        }
    }

    fn bind_unary(&self, op: UnaryOperator, operand: BoundExpr) -> Result<BoundExpr> {
        let ty = match op {
            UnaryOperator::Not => {
                if !operand.is_boolean_like() {
                    return Err(UriError::coercion(OD0304, "Operand of 'not' must be Boolean"));
                }
                let nullable = operand.type_ref().is_none_or(|t| t.nullable);
                TypeReference::primitive(PrimitiveKind::Boolean, nullable)
            }
            UnaryOperator::Negate => match operand.type_ref() {
                Some(ty)
                    if !ty.ty.is_collection()
                        && ty
                            .as_primitive()
                            .is_some_and(|k| k.is_numeric() || k == PrimitiveKind::Duration) =>
                {
                    ty
                }
                _ => {
                    return Err(UriError::coercion(
                        OD0303,
                        "Operand of '-' must be numeric or a duration",
                    ));
                }
            },
        };
        Ok(BoundExpr::Unary {
            op,
            operand: Box::new(operand),
            ty,
        })
    }

    fn bind_call(
        &self,
        parent: Option<&QueryToken>,
        name: &str,
        arguments: &[ArgumentToken],
        scopes: &mut ScopeManager,
    ) -> Result<BoundExpr> {
        if parent.is_none() && !name.contains('.') && self.functions.contains(name) {
            if arguments.iter().any(|a| a.name.is_some()) {
                return Err(UriError::syntax(
                    OD0003,
                    format!("Arguments of '{}' are positional", name),
                    name,
                ));
            }
            if is_type_function(name) {
                return self.bind_type_function(name, arguments, scopes);
            }
            return self.bind_builtin(name, arguments, scopes);
        }
        self.bind_schema_function(parent, name, arguments, scopes)
    }

    fn bind_builtin(&self, name: &str, arguments: &[ArgumentToken], scopes: &mut ScopeManager) -> Result<BoundExpr> {
        let arguments = arguments
            .iter()
            .map(|a| self.bind_expr(&a.value, scopes))
            .collect::<Result<Vec<_>>>()?;
        let kinds = arguments
            .iter()
            .map(|a| match a.type_ref() {
                None => Ok(None),
                Some(ty) => ty.as_primitive().filter(|_| !ty.ty.is_collection()).map(Some).ok_or_else(|| {
                    UriError::coercion(
                        OD0303,
                        format!("Argument of type '{}' cannot be passed to '{}'", ty.ty, name),
                    )
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        let overload = self.functions.resolve(name, &kinds)?;
        let nullable = arguments.iter().any(|a| a.type_ref().is_none_or(|t| t.nullable));
        Ok(BoundExpr::Function {
            name: name.to_string(),
            arguments,
            ty: TypeReference::primitive(overload.signature.return_type, nullable),
        })
    }

    /// `isof(T)`, `isof(expr, T)`, `cast(T)` and `cast(expr, T)`; the type is
    /// kept as a string constant argument
    fn bind_type_function(
        &self,
        name: &str,
        arguments: &[ArgumentToken],
        scopes: &mut ScopeManager,
    ) -> Result<BoundExpr> {
        let (source, type_token) = match arguments {
            [type_arg] => (self.range_variable(IT, scopes), &type_arg.value),
            [value, type_arg] => (Some(self.bind_expr(&value.value, scopes)?), &type_arg.value),
            _ => {
                return Err(UriError::binding(
                    OD0403,
                    format!("'{}' takes one or two arguments", name),
                ));
            }
        };
        let source = source.ok_or_else(|| UriError::resolution(OD0107, "No implicit range variable in scope"))?;

        let type_name = match type_token {
            QueryToken::Path { parent: None, name } => name.clone(),
            QueryToken::Literal(LiteralToken { text, type_name: None }) => text
                .strip_prefix('\'')
                .and_then(|t| t.strip_suffix('\''))
                .map(str::to_string)
                .ok_or_else(|| {
                    UriError::syntax(OD0004, format!("'{}' expects a type name", name), text.as_str())
                })?,
            _ => {
                return Err(UriError::binding(
                    OD0403,
                    format!("Last argument of '{}' must be a type name", name),
                ));
            }
        };
        let target = self
            .policy
            .resolve_type(self.schema, &type_name, self.policy.case_insensitive());
        target.require_concrete()?;

        let source_ty = source.schema_type();
        if target.is_structured() {
            let related = source_ty
                .as_ref()
                .is_none_or(|s| self.schema.is_related(s.element_type(), &target));
            if !related {
                return Err(UriError::structural(
                    OD0203,
                    format!("'{}' is unrelated to '{}'", target, source_ty.map_or_else(String::new, |t| t.to_string())),
                ));
            }
        }

        let ty = if name == "isof" {
            TypeReference::primitive(PrimitiveKind::Boolean, false)
        } else if source_ty.as_ref().is_some_and(SchemaType::is_collection) {
            TypeReference::nullable(SchemaType::collection(target.clone()))
        } else {
            TypeReference::nullable(target.clone())
        };
        let type_constant = BoundExpr::Constant {
            value: LiteralValue::string(target.full_name()),
            ty: Some(TypeReference::primitive(PrimitiveKind::String, false)),
        };
        Ok(BoundExpr::Function {
            name: name.to_string(),
            arguments: vec![source, type_constant],
            ty,
        })
    }

    fn bind_schema_function(
        &self,
        parent: Option<&QueryToken>,
        name: &str,
        arguments: &[ArgumentToken],
        scopes: &mut ScopeManager,
    ) -> Result<BoundExpr> {
        let source = parent.map(|p| self.bind_expr(p, scopes)).transpose()?;
        let case_insensitive = self.policy.case_insensitive();
        let candidates = match &source {
            Some(source) => match source.schema_type() {
                Some(binding) => self
                    .policy
                    .resolve_bound_operations(self.schema, name, &binding, case_insensitive)?,
                None => Vec::new(),
            },
            None => self.policy.resolve_unbound_operations(self.schema, name, case_insensitive)?,
        };
        let candidates: Vec<Arc<Operation>> = candidates.into_iter().filter(|op| op.is_function()).collect();
        if candidates.is_empty() {
            return Err(UriError::resolution(OD0104, format!("Function '{}' not found", name)));
        }

        if arguments.iter().any(|a| a.name.is_none()) {
            return Err(UriError::syntax(
                OD0003,
                format!("Arguments of '{}' must be named", name),
                name,
            ));
        }
        let names: Vec<&str> = arguments.iter().filter_map(|a| a.name.as_deref()).collect();
        let operation = select_overload(
            self.schema,
            candidates,
            |op: &Arc<Operation>| op.as_ref(),
            &names,
            case_insensitive,
        )?;
        let matched = self
            .policy
            .resolve_operation_parameters(&operation, &names, case_insensitive)?;

        let mut bound = IndexMap::new();
        for (parameter_name, index) in matched {
            let Some(parameter) = operation.parameter(&parameter_name) else {
                continue;
            };
            let expected = self.schema.resolve(&parameter.type_expr);
            expected.require_concrete()?;
            let value = self.bind_expr(&arguments[index].value, scopes)?;
            if let Some(actual) = value.schema_type() {
                if !self.is_convertible(&actual, &expected) {
                    return Err(UriError::coercion(
                        OD0303,
                        format!(
                            "Argument '{}' of type '{}' does not convert to '{}'",
                            parameter_name, actual, expected
                        ),
                    ));
                }
            }
            bound.insert(parameter_name, value);
        }

        let ty = operation
            .return_type
            .as_ref()
            .map(|r| self.schema.resolve(r))
            .ok_or_else(|| {
                UriError::structural(
                    OD0213,
                    format!("Function '{}' returns nothing", operation.full_name()),
                )
            })?;
        ty.require_concrete()?;

        Ok(BoundExpr::Operation {
            operation,
            source: source.map(Box::new),
            arguments: bound,
            ty: TypeReference::nullable(ty),
        })
    }

    fn bind_lambda(
        &self,
        kind: LambdaKind,
        parent: &QueryToken,
        variable: Option<&str>,
        body: Option<&QueryToken>,
        scopes: &mut ScopeManager,
    ) -> Result<BoundExpr> {
        let keyword = match kind {
            LambdaKind::Any => "any",
            LambdaKind::All => "all",
        };
        let source = self.bind_expr(parent, scopes)?;
        let element = match source.schema_type() {
            Some(ty) if ty.is_collection() => ty.element_type().clone(),
            _ => {
                return Err(UriError::structural(
                    OD0200,
                    format!("{}() needs a collection", keyword),
                ));
            }
        };

        let Some(body) = body else {
            if kind == LambdaKind::All {
                return Err(UriError::binding(OD0403, "all() requires a lambda expression"));
            }
            return Ok(BoundExpr::Lambda {
                kind,
                source: Box::new(source),
                variable: None,
                body: None,
            });
        };

        self.limits.check_lambda_depth(scopes.lambda_depth() + 1)?;
        let body = scopes.with_lambda(variable, TypeReference::non_null(element), |inner| {
            self.bind_expr(body, inner)
        })?;
        if !body.is_boolean_like() {
            return Err(UriError::coercion(
                OD0304,
                format!("Body of {}() must be Boolean", keyword),
            ));
        }
        Ok(BoundExpr::Lambda {
            kind,
            source: Box::new(source),
            variable: variable.map(str::to_string),
            body: Some(Box::new(body)),
        })
    }

    fn bind_in(&self, mut left: BoundExpr, mut right: BoundExpr) -> Result<BoundExpr> {
        // list items are compared with the left operand as by `eq`
        if let BoundExpr::Collection { items, ty } = &mut right {
            for item in items.iter_mut() {
                self.policy
                    .promote_binary_operand_types(self.schema, BinaryOperator::Equal, &mut left, item)?;
            }
            *ty = TypeReference::non_null(SchemaType::collection(self.list_element_type(items)?));
        }

        let incompatible = |left: &BoundExpr, right: &BoundExpr| {
            let name = |e: &BoundExpr| e.schema_type().map_or("null".to_string(), |t| t.full_name());
            UriError::coercion(
                OD0303,
                format!("'in' cannot test {} against {}", name(left), name(right)),
            )
        };
        let Some(collection) = right.schema_type().filter(SchemaType::is_collection) else {
            return Err(incompatible(&left, &right));
        };
        if let Some(item) = left.schema_type() {
            let element = collection.element_type();
            if item.is_collection()
                || !(self.is_convertible(&item, element) || self.is_convertible(element, &item))
            {
                return Err(incompatible(&left, &right));
            }
        }
        Ok(BoundExpr::In {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// `(a, b, c)`: items share the common type of the typed ones
    fn bind_list(&self, items: &[QueryToken], scopes: &mut ScopeManager) -> Result<BoundExpr> {
        let items = items
            .iter()
            .map(|item| self.bind_expr(item, scopes))
            .collect::<Result<Vec<_>>>()?;
        let element = self.list_element_type(&items)?;
        Ok(BoundExpr::Collection {
            items,
            ty: TypeReference::non_null(SchemaType::collection(element)),
        })
    }

    fn list_element_type(&self, items: &[BoundExpr]) -> Result<SchemaType> {
        let mut element: Option<SchemaType> = None;
        for item in items {
            let Some(ty) = item.schema_type() else {
                continue;
            };
            element = Some(match element {
                None => ty,
                Some(current) => self.common_type(&current, &ty).ok_or_else(|| {
                    UriError::coercion(
                        OD0303,
                        format!("List mixes '{}' and '{}' values", current, ty),
                    )
                })?,
            });
        }
        element.ok_or_else(|| UriError::coercion(OD0303, "Cannot infer the type of a list of nulls"))
    }

    // === Type compatibility ===

    fn is_convertible(&self, from: &SchemaType, to: &SchemaType) -> bool {
        if from.is_collection() != to.is_collection() {
            return false;
        }
        let (from, to) = (from.element_type(), to.element_type());
        match (from.as_primitive(), to.as_primitive()) {
            (Some(a), Some(b)) => a == b || self.coercer.can_implicitly_convert(a, b),
            (None, None) => from.same_definition(to) || self.schema.is_assignable(to, from),
            _ => false,
        }
    }

    fn common_type(&self, a: &SchemaType, b: &SchemaType) -> Option<SchemaType> {
        match (a.as_primitive(), b.as_primitive()) {
            (Some(x), Some(y)) => self.coercer.common_type(x, y).map(SchemaType::Primitive),
            _ if a.same_definition(b) => Some(a.clone()),
            _ => None,
        }
    }
}

/// `$orderby` items must be single primitive or enum values
fn check_orderable(expression: &BoundExpr) -> Result<()> {
    match expression.schema_type() {
        None => Ok(()),
        Some(ty) if !ty.is_collection() && (ty.as_primitive().is_some() || ty.as_enum().is_some()) => Ok(()),
        Some(ty) => Err(UriError::coercion(
            OD0303,
            format!("Cannot order by a value of type '{}'", ty),
        )),
    }
}

fn parse_count_option(option: &str, text: &str) -> Result<u64> {
    let text = text.trim();
    text.parse::<u64>().map_err(|_| {
        UriError::syntax(
            OD0006,
            format!("{} must be a non-negative integer, got '{}'", option, text),
            text,
        )
    })
}

fn parse_levels(text: &str) -> Result<ExpandLevels> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("max") {
        return Ok(ExpandLevels::Max);
    }
    text.parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .map(ExpandLevels::Count)
        .ok_or_else(|| {
            UriError::syntax(
                OD0006,
                format!("$levels must be a positive integer or 'max', got '{}'", text),
                text,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_options() {
        assert_eq!(parse_count_option("$top", " 10 ").unwrap(), 10);
        assert_eq!(parse_count_option("$top", "-1").unwrap_err().code(), OD0006);
        assert_eq!(parse_levels("max").unwrap(), ExpandLevels::Max);
        assert_eq!(parse_levels("2").unwrap(), ExpandLevels::Count(2));
        assert_eq!(parse_levels("0").unwrap_err().code(), OD0006);
    }

    #[test]
    fn test_all_selected() {
        let mut clause = SelectExpandClause::default();
        assert!(clause.all_selected());
        clause.select.push(SelectItem::AllOperations {
            namespace: "Ns".to_string(),
        });
        assert!(!clause.all_selected());
        clause.select.push(SelectItem::All);
        assert!(clause.all_selected());
    }
}
