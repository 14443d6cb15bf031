//! Pluggable name resolution
//!
//! [`ResolverPolicy`] is the seam between the schema model and its two
//! consumers, the path walker and the option binder. [`DefaultResolver`]
//! does exact, namespace-qualified lookups; the wrappers change one concern
//! each and delegate the rest:
//! - [`CaseInsensitive`]: ASCII case-insensitive name lookups
//! - [`UnqualifiedOperations`]: operation calls by simple name
//! - [`StringAsEnum`]: string constants and unprefixed key literals as enums
//!
//! Every lookup takes a `case_insensitive` flag that wrappers pass down
//! unchanged, except [`CaseInsensitive`] which forces it on. Callers pass
//! [`ResolverPolicy::case_insensitive`] of the outermost policy, so the
//! wrappers stack in any order.

use indexmap::IndexMap;
use odata_uri_diagnostics::{
    Result, UriError, OD0114, OD0201, OD0214, OD0303, OD0304, OD0400, OD0401, OD0402, OD0404,
    OD0405,
};
use odata_uri_literal::{Coercer, EnumValue, LiteralValue, PrimitiveValue};
use odata_uri_schema::{
    Lookup, NavigationSource, Operation, OperationImport, PrimitiveKind, PropertyRef, Schema,
    SchemaType, TypeReference,
};
use odata_uri_syntax::{BinaryOperator, ParenArg};
use std::fmt;
use std::sync::Arc;

use crate::{BoundExpr, KeyValue};

/// Converts key or argument literal text to a value of the given type
pub type LiteralConverter<'c> = dyn FnMut(&str, &TypeReference) -> Result<LiteralValue> + 'c;

/// Name resolution strategy shared by the walker and the binder
pub trait ResolverPolicy: fmt::Debug + Send + Sync {
    /// Whether name comparisons ignore ASCII case
    fn case_insensitive(&self) -> bool;

    fn resolve_type(&self, schema: &Schema, name: &str, case_insensitive: bool) -> SchemaType;

    /// Entity set or singleton by name
    fn resolve_navigation_source(&self, schema: &Schema, name: &str, case_insensitive: bool) -> NavigationSource;

    fn resolve_property(
        &self,
        schema: &Schema,
        ty: &SchemaType,
        name: &str,
        case_insensitive: bool,
    ) -> Lookup<PropertyRef>;

    /// Unbound operations. An empty list means none matched; an error means
    /// the identifier itself cannot be resolved.
    fn resolve_unbound_operations(
        &self,
        schema: &Schema,
        identifier: &str,
        case_insensitive: bool,
    ) -> Result<Vec<Arc<Operation>>>;

    /// Bound operations, closest binding type first
    fn resolve_bound_operations(
        &self,
        schema: &Schema,
        identifier: &str,
        binding: &SchemaType,
        case_insensitive: bool,
    ) -> Result<Vec<Arc<Operation>>>;

    fn resolve_operation_imports(
        &self,
        schema: &Schema,
        identifier: &str,
        case_insensitive: bool,
    ) -> Vec<Arc<OperationImport>>;

    /// Match supplied argument names to the non-binding parameters.
    ///
    /// Returns parameter name → index into `supplied`, in parameter order.
    fn resolve_operation_parameters(
        &self,
        operation: &Operation,
        supplied: &[&str],
        case_insensitive: bool,
    ) -> Result<IndexMap<String, usize>>;

    /// Match a positional or named key predicate to the key properties
    fn resolve_keys(
        &self,
        schema: &Schema,
        entity_type: &SchemaType,
        supplied: &[ParenArg],
        convert: &mut LiteralConverter<'_>,
        case_insensitive: bool,
    ) -> Result<Vec<KeyValue>>;

    /// Validate (and possibly rewrite) the operands of a binary operator
    /// and compute its result type
    fn promote_binary_operand_types(
        &self,
        schema: &Schema,
        op: BinaryOperator,
        left: &mut BoundExpr,
        right: &mut BoundExpr,
    ) -> Result<TypeReference>;
}

macro_rules! delegate_policy {
    ($($method:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
        $(
            fn $method(&self, $($arg: $ty),*) -> $ret {
                self.0.$method($($arg),*)
            }
        )*
    };
}

/// Forward every lookup with the case flag forced on
macro_rules! delegate_ignoring_case {
    ($($method:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
        $(
            fn $method(&self, $($arg: $ty,)* _case_insensitive: bool) -> $ret {
                self.0.$method($($arg,)* true)
            }
        )*
    };
}

impl<P: ResolverPolicy + ?Sized> ResolverPolicy for Box<P> {
    fn case_insensitive(&self) -> bool {
        (**self).case_insensitive()
    }

    fn resolve_type(&self, schema: &Schema, name: &str, case_insensitive: bool) -> SchemaType {
        (**self).resolve_type(schema, name, case_insensitive)
    }

    fn resolve_navigation_source(&self, schema: &Schema, name: &str, case_insensitive: bool) -> NavigationSource {
        (**self).resolve_navigation_source(schema, name, case_insensitive)
    }

    fn resolve_property(
        &self,
        schema: &Schema,
        ty: &SchemaType,
        name: &str,
        case_insensitive: bool,
    ) -> Lookup<PropertyRef> {
        (**self).resolve_property(schema, ty, name, case_insensitive)
    }

    fn resolve_unbound_operations(
        &self,
        schema: &Schema,
        identifier: &str,
        case_insensitive: bool,
    ) -> Result<Vec<Arc<Operation>>> {
        (**self).resolve_unbound_operations(schema, identifier, case_insensitive)
    }

    fn resolve_bound_operations(
        &self,
        schema: &Schema,
        identifier: &str,
        binding: &SchemaType,
        case_insensitive: bool,
    ) -> Result<Vec<Arc<Operation>>> {
        (**self).resolve_bound_operations(schema, identifier, binding, case_insensitive)
    }

    fn resolve_operation_imports(
        &self,
        schema: &Schema,
        identifier: &str,
        case_insensitive: bool,
    ) -> Vec<Arc<OperationImport>> {
        (**self).resolve_operation_imports(schema, identifier, case_insensitive)
    }

    fn resolve_operation_parameters(
        &self,
        operation: &Operation,
        supplied: &[&str],
        case_insensitive: bool,
    ) -> Result<IndexMap<String, usize>> {
        (**self).resolve_operation_parameters(operation, supplied, case_insensitive)
    }

    fn resolve_keys(
        &self,
        schema: &Schema,
        entity_type: &SchemaType,
        supplied: &[ParenArg],
        convert: &mut LiteralConverter<'_>,
        case_insensitive: bool,
    ) -> Result<Vec<KeyValue>> {
        (**self).resolve_keys(schema, entity_type, supplied, convert, case_insensitive)
    }

    fn promote_binary_operand_types(
        &self,
        schema: &Schema,
        op: BinaryOperator,
        left: &mut BoundExpr,
        right: &mut BoundExpr,
    ) -> Result<TypeReference> {
        (**self).promote_binary_operand_types(schema, op, left, right)
    }
}

// === Default ===

/// Namespace-qualified resolution, exact case unless the flag says otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl ResolverPolicy for DefaultResolver {
    fn case_insensitive(&self) -> bool {
        false
    }

    fn resolve_type(&self, schema: &Schema, name: &str, case_insensitive: bool) -> SchemaType {
        if case_insensitive {
            schema.find_type_ignore_case(name)
        } else {
            schema.find_type(name)
        }
    }

    fn resolve_navigation_source(&self, schema: &Schema, name: &str, case_insensitive: bool) -> NavigationSource {
        schema.find_navigation_source(name, case_insensitive)
    }

    fn resolve_property(
        &self,
        schema: &Schema,
        ty: &SchemaType,
        name: &str,
        case_insensitive: bool,
    ) -> Lookup<PropertyRef> {
        schema.find_property(ty, name, case_insensitive)
    }

    fn resolve_unbound_operations(
        &self,
        schema: &Schema,
        identifier: &str,
        case_insensitive: bool,
    ) -> Result<Vec<Arc<Operation>>> {
        Ok(if case_insensitive {
            schema.find_operations_ignore_case(identifier, None)
        } else {
            schema.find_operations(identifier, None)
        })
    }

    fn resolve_bound_operations(
        &self,
        schema: &Schema,
        identifier: &str,
        binding: &SchemaType,
        case_insensitive: bool,
    ) -> Result<Vec<Arc<Operation>>> {
        Ok(if case_insensitive {
            schema.find_operations_ignore_case(identifier, Some(binding))
        } else {
            schema.find_operations(identifier, Some(binding))
        })
    }

    fn resolve_operation_imports(
        &self,
        schema: &Schema,
        identifier: &str,
        case_insensitive: bool,
    ) -> Vec<Arc<OperationImport>> {
        schema.find_operation_imports(identifier, case_insensitive)
    }

    fn resolve_operation_parameters(
        &self,
        operation: &Operation,
        supplied: &[&str],
        case_insensitive: bool,
    ) -> Result<IndexMap<String, usize>> {
        match_parameters(operation, supplied, case_insensitive)
    }

    fn resolve_keys(
        &self,
        schema: &Schema,
        entity_type: &SchemaType,
        supplied: &[ParenArg],
        convert: &mut LiteralConverter<'_>,
        case_insensitive: bool,
    ) -> Result<Vec<KeyValue>> {
        match_keys(schema, entity_type, supplied, convert, case_insensitive)
    }

    fn promote_binary_operand_types(
        &self,
        schema: &Schema,
        op: BinaryOperator,
        left: &mut BoundExpr,
        right: &mut BoundExpr,
    ) -> Result<TypeReference> {
        promote_operands(schema, op, left, right)
    }
}

// === Case-insensitive ===

/// Ignores ASCII case in every name lookup of the wrapped policy. A name
/// matching several declarations only by case is ambiguous, even when one
/// matches exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitive<P>(pub P);

impl<P: ResolverPolicy> ResolverPolicy for CaseInsensitive<P> {
    fn case_insensitive(&self) -> bool {
        true
    }

    delegate_ignoring_case! {
        resolve_type(schema: &Schema, name: &str) -> SchemaType;
        resolve_navigation_source(schema: &Schema, name: &str) -> NavigationSource;
        resolve_property(schema: &Schema, ty: &SchemaType, name: &str) -> Lookup<PropertyRef>;
        resolve_unbound_operations(schema: &Schema, identifier: &str) -> Result<Vec<Arc<Operation>>>;
        resolve_bound_operations(schema: &Schema, identifier: &str, binding: &SchemaType) -> Result<Vec<Arc<Operation>>>;
        resolve_operation_imports(schema: &Schema, identifier: &str) -> Vec<Arc<OperationImport>>;
        resolve_operation_parameters(operation: &Operation, supplied: &[&str]) -> Result<IndexMap<String, usize>>;
        resolve_keys(schema: &Schema, entity_type: &SchemaType, supplied: &[ParenArg], convert: &mut LiteralConverter<'_>) -> Result<Vec<KeyValue>>;
    }

    delegate_policy! {
        promote_binary_operand_types(schema: &Schema, op: BinaryOperator, left: &mut BoundExpr, right: &mut BoundExpr) -> Result<TypeReference>;
    }
}

// === Unqualified operations ===

/// Accepts operation calls by simple name when the qualified lookup of the
/// wrapped policy finds nothing. The simple name must be declared in one
/// namespace only.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnqualifiedOperations<P>(pub P);

impl<P: ResolverPolicy> ResolverPolicy for UnqualifiedOperations<P> {
    fn resolve_unbound_operations(
        &self,
        schema: &Schema,
        identifier: &str,
        case_insensitive: bool,
    ) -> Result<Vec<Arc<Operation>>> {
        let found = self.0.resolve_unbound_operations(schema, identifier, case_insensitive)?;
        if !found.is_empty() || identifier.contains('.') {
            return Ok(found);
        }
        log::debug!("falling back to unqualified lookup of operation '{}'", identifier);
        schema.find_operations_by_simple_name(identifier, None, case_insensitive)
    }

    fn resolve_bound_operations(
        &self,
        schema: &Schema,
        identifier: &str,
        binding: &SchemaType,
        case_insensitive: bool,
    ) -> Result<Vec<Arc<Operation>>> {
        let found = self
            .0
            .resolve_bound_operations(schema, identifier, binding, case_insensitive)?;
        if !found.is_empty() || identifier.contains('.') {
            return Ok(found);
        }
        log::debug!("falling back to unqualified lookup of bound operation '{}'", identifier);
        schema.find_operations_by_simple_name(identifier, Some(binding), case_insensitive)
    }

    delegate_policy! {
        case_insensitive() -> bool;
        resolve_type(schema: &Schema, name: &str, case_insensitive: bool) -> SchemaType;
        resolve_navigation_source(schema: &Schema, name: &str, case_insensitive: bool) -> NavigationSource;
        resolve_property(schema: &Schema, ty: &SchemaType, name: &str, case_insensitive: bool) -> Lookup<PropertyRef>;
        resolve_operation_imports(schema: &Schema, identifier: &str, case_insensitive: bool) -> Vec<Arc<OperationImport>>;
        resolve_operation_parameters(operation: &Operation, supplied: &[&str], case_insensitive: bool) -> Result<IndexMap<String, usize>>;
        resolve_keys(schema: &Schema, entity_type: &SchemaType, supplied: &[ParenArg], convert: &mut LiteralConverter<'_>, case_insensitive: bool) -> Result<Vec<KeyValue>>;
        promote_binary_operand_types(schema: &Schema, op: BinaryOperator, left: &mut BoundExpr, right: &mut BoundExpr) -> Result<TypeReference>;
    }
}

// === String as enum ===

/// Treats string constants compared with enum operands as enum members,
/// and lets enum key literals omit the type prefix (`Tiers('Gold')`)
#[derive(Debug, Clone, Copy, Default)]
pub struct StringAsEnum<P>(pub P);

impl<P: ResolverPolicy> ResolverPolicy for StringAsEnum<P> {
    fn resolve_keys(
        &self,
        schema: &Schema,
        entity_type: &SchemaType,
        supplied: &[ParenArg],
        convert: &mut LiteralConverter<'_>,
        case_insensitive: bool,
    ) -> Result<Vec<KeyValue>> {
        let mut prefixed = |text: &str, ty: &TypeReference| -> Result<LiteralValue> {
            if ty.ty.as_enum().is_some() && text.trim_start().starts_with('\'') {
                let qualified = format!("{}{}", ty.ty.full_name(), text.trim());
                log::debug!("treating key literal {} as {}", text, qualified);
                return convert(&qualified, ty);
            }
            convert(text, ty)
        };
        self.0
            .resolve_keys(schema, entity_type, supplied, &mut prefixed, case_insensitive)
    }

    fn promote_binary_operand_types(
        &self,
        schema: &Schema,
        op: BinaryOperator,
        left: &mut BoundExpr,
        right: &mut BoundExpr,
    ) -> Result<TypeReference> {
        string_to_enum(schema, left, right)?;
        string_to_enum(schema, right, left)?;
        self.0.promote_binary_operand_types(schema, op, left, right)
    }

    delegate_policy! {
        case_insensitive() -> bool;
        resolve_type(schema: &Schema, name: &str, case_insensitive: bool) -> SchemaType;
        resolve_navigation_source(schema: &Schema, name: &str, case_insensitive: bool) -> NavigationSource;
        resolve_property(schema: &Schema, ty: &SchemaType, name: &str, case_insensitive: bool) -> Lookup<PropertyRef>;
        resolve_unbound_operations(schema: &Schema, identifier: &str, case_insensitive: bool) -> Result<Vec<Arc<Operation>>>;
        resolve_bound_operations(schema: &Schema, identifier: &str, binding: &SchemaType, case_insensitive: bool) -> Result<Vec<Arc<Operation>>>;
        resolve_operation_imports(schema: &Schema, identifier: &str, case_insensitive: bool) -> Vec<Arc<OperationImport>>;
        resolve_operation_parameters(operation: &Operation, supplied: &[&str], case_insensitive: bool) -> Result<IndexMap<String, usize>>;
    }
}

/// Replace a string constant `candidate` with an enum constant when
/// `other` is enum-typed
fn string_to_enum(schema: &Schema, other: &BoundExpr, candidate: &mut BoundExpr) -> Result<()> {
    let Some(enum_ty) = other.schema_type().filter(|t| t.as_enum().is_some()) else {
        return Ok(());
    };
    let BoundExpr::Constant {
        value: LiteralValue::Primitive(PrimitiveValue::String(text)),
        ..
    } = candidate
    else {
        return Ok(());
    };

    let value = EnumValue {
        type_name: enum_ty.full_name(),
        members: text.split(',').map(|m| m.trim().to_string()).collect(),
        value: None,
    };
    let bound = Coercer::new().bind_enum(value, &enum_ty, schema)?;
    *candidate = BoundExpr::Constant {
        value: LiteralValue::Enum(bound),
        ty: Some(TypeReference::non_null(enum_ty)),
    };
    Ok(())
}

// === Shared matching rules ===

fn names_match(a: &str, b: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

fn match_parameters(
    operation: &Operation,
    supplied: &[&str],
    case_insensitive: bool,
) -> Result<IndexMap<String, usize>> {
    let binding = operation.binding_parameter().map(|p| p.name.as_str());
    let formal = operation.non_binding_parameters();

    let mut matched: IndexMap<String, usize> = IndexMap::new();
    for (index, name) in supplied.iter().enumerate() {
        if binding.is_some_and(|b| names_match(b, name, case_insensitive)) {
            return Err(UriError::binding(
                OD0405,
                format!("'{}' is the binding parameter of '{}'", name, operation.full_name()),
            ));
        }
        let parameter = formal
            .iter()
            .find(|p| names_match(&p.name, name, case_insensitive))
            .ok_or_else(|| {
                UriError::binding(
                    OD0400,
                    format!("Operation '{}' has no parameter '{}'", operation.full_name(), name),
                )
            })?;
        if matched.insert(parameter.name.clone(), index).is_some() {
            return Err(UriError::binding(
                OD0402,
                format!("Parameter '{}' is supplied more than once", parameter.name),
            ));
        }
    }

    if operation.is_function() {
        if let Some(missing) = formal
            .iter()
            .find(|p| !p.optional && !matched.contains_key(&p.name))
        {
            return Err(UriError::binding(
                OD0401,
                format!(
                    "Missing parameter '{}' of function '{}'",
                    missing.name,
                    operation.full_name()
                ),
            ));
        }
    }

    // parameter declaration order
    let mut ordered = IndexMap::new();
    for parameter in formal {
        if let Some(index) = matched.get(&parameter.name) {
            ordered.insert(parameter.name.clone(), *index);
        }
    }
    Ok(ordered)
}

/// Pick the overload whose non-binding parameters accept `names`.
///
/// Candidates arrive closest binding type first. A second match bound to
/// the same type (or a second unbound match) makes the call ambiguous.
pub fn select_overload<T>(
    schema: &Schema,
    candidates: Vec<T>,
    operation: impl Fn(&T) -> &Operation,
    names: &[&str],
    case_insensitive: bool,
) -> Result<T> {
    let identifier = candidates
        .first()
        .map(|c| operation(c).full_name())
        .unwrap_or_default();
    let accepts = |op: &Operation| {
        if op.is_action() {
            return true;
        }
        let formal = op.non_binding_parameters();
        names
            .iter()
            .all(|n| formal.iter().any(|p| names_match(&p.name, n, case_insensitive)))
            && formal
                .iter()
                .filter(|p| !p.optional)
                .all(|p| names.iter().any(|n| names_match(&p.name, n, case_insensitive)))
    };

    let mut matching: Vec<T> = candidates.into_iter().filter(|c| accepts(operation(c))).collect();
    if matching.is_empty() {
        return Err(UriError::binding(
            OD0404,
            format!(
                "No overload of '{}' accepts parameters ({})",
                identifier,
                names.join(", ")
            ),
        ));
    }

    let first = matching.remove(0);
    let binding_type = |op: &Operation| op.binding_parameter().map(|p| schema.resolve(&p.type_expr));
    let first_binding = binding_type(operation(&first));
    let tied = matching.iter().any(|c| match (&first_binding, binding_type(operation(c))) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_definition(&b),
        _ => false,
    });
    if tied {
        log::debug!("'{}' has several equally specific overloads", identifier);
        return Err(UriError::resolution(
            OD0114,
            format!("Call to '{}' matches several overloads", identifier),
        ));
    }
    Ok(first)
}

fn match_keys(
    schema: &Schema,
    entity_type: &SchemaType,
    supplied: &[ParenArg],
    convert: &mut LiteralConverter<'_>,
    case_insensitive: bool,
) -> Result<Vec<KeyValue>> {
    let keys = schema.key_properties(entity_type)?;
    if supplied.len() != keys.len() {
        return Err(UriError::structural(
            OD0201,
            format!(
                "Key predicate has {} value(s) but type '{}' has {} key propert{}",
                supplied.len(),
                entity_type.full_name(),
                keys.len(),
                if keys.len() == 1 { "y" } else { "ies" }
            ),
        ));
    }

    let positional = supplied.iter().all(|arg| arg.name.is_none());
    keys.iter()
        .enumerate()
        .map(|(index, key)| {
            let arg = if positional {
                &supplied[index]
            } else {
                supplied
                    .iter()
                    .find(|arg| {
                        arg.name
                            .as_deref()
                            .is_some_and(|name| names_match(name, &key.name, case_insensitive))
                    })
                    .ok_or_else(|| {
                        UriError::structural(
                            OD0214,
                            format!("Key predicate does not name key property '{}'", key.name),
                        )
                    })?
            };
            Ok(KeyValue {
                name: key.name.clone(),
                value: convert(&arg.value, &key.ty)?,
            })
        })
        .collect()
}

fn boolean(nullable: bool) -> TypeReference {
    TypeReference::primitive(PrimitiveKind::Boolean, nullable)
}

fn incompatible(op: BinaryOperator, left: &BoundExpr, right: &BoundExpr) -> UriError {
    let name = |e: &BoundExpr| e.schema_type().map_or("null".to_string(), |t| t.full_name());
    UriError::coercion(
        OD0303,
        format!(
            "Operator '{}' cannot be applied to {} and {}",
            op,
            name(left),
            name(right)
        ),
    )
}

/// Default operand validation and result typing
pub fn promote_operands(
    schema: &Schema,
    op: BinaryOperator,
    left: &mut BoundExpr,
    right: &mut BoundExpr,
) -> Result<TypeReference> {
    let nullable = left.type_ref().is_none_or(|t| t.nullable) || right.type_ref().is_none_or(|t| t.nullable);

    if op.is_logical() {
        if !left.is_boolean_like() || !right.is_boolean_like() {
            return Err(UriError::coercion(
                OD0304,
                format!("Operands of '{}' must be Boolean", op),
            ));
        }
        return Ok(boolean(nullable));
    }

    let coercer = Coercer::new();
    let (l, r) = (left.schema_type(), right.schema_type());

    if op == BinaryOperator::Has {
        return match (&l, &r) {
            (Some(l), Some(r)) if l.as_enum().is_some() && l.same_definition(r) => Ok(boolean(nullable)),
            _ => Err(incompatible(op, left, right)),
        };
    }

    let (Some(l), Some(r)) = (l, r) else {
        // untyped null or open property: arithmetic takes the typed side
        if op.is_arithmetic() {
            return match left.type_ref().or_else(|| right.type_ref()) {
                Some(t) if t.as_primitive().is_some() => Ok(TypeReference::nullable(t.ty)),
                Some(_) => Err(incompatible(op, left, right)),
                None => Ok(TypeReference::primitive(PrimitiveKind::Double, true)),
            };
        }
        return Ok(boolean(nullable));
    };

    if l.is_collection() || r.is_collection() {
        return Err(incompatible(op, left, right));
    }

    if op.is_comparison() {
        let comparable = match (l.as_primitive(), r.as_primitive()) {
            (Some(a), Some(b)) => match coercer.common_type(a, b) {
                // unordered kinds only support eq/ne
                Some(
                    PrimitiveKind::Boolean
                    | PrimitiveKind::Guid
                    | PrimitiveKind::Binary
                    | PrimitiveKind::Stream,
                ) => op.is_equality(),
                Some(_) => true,
                None => false,
            },
            _ if l.as_enum().is_some() => l.same_definition(&r),
            _ if l.is_entity() && op.is_equality() => schema.is_related(&l, &r),
            _ => false,
        };
        if !comparable {
            return Err(incompatible(op, left, right));
        }
        return Ok(boolean(nullable));
    }

    // arithmetic
    let (Some(a), Some(b)) = (l.as_primitive(), r.as_primitive()) else {
        return Err(incompatible(op, left, right));
    };
    use PrimitiveKind::{Date, DateTimeOffset, Duration};
    let result = match (a, b, op) {
        (a, b, _) if a.is_numeric() && b.is_numeric() => coercer.common_type(a, b),
        (DateTimeOffset | Date, Duration, BinaryOperator::Add | BinaryOperator::Subtract) => Some(a),
        (Duration, Duration, BinaryOperator::Add | BinaryOperator::Subtract) => Some(Duration),
        (DateTimeOffset, DateTimeOffset, BinaryOperator::Subtract)
        | (Date, Date, BinaryOperator::Subtract) => Some(Duration),
        _ => None,
    };
    result
        .map(|kind| TypeReference::primitive(kind, nullable))
        .ok_or_else(|| incompatible(op, left, right))
}
