//! Schema type model
//!
//! [`SchemaType`] is the uniform handle for every type a lookup can produce,
//! including the two sentinels: `Bad` (nothing matched) and `Ambiguous`
//! (several definitions matched). Both expose the same kind/name/namespace
//! surface as real types so callers can keep chaining lookups; the carried
//! diagnostics only turn into a raised error through
//! [`SchemaType::require_concrete`].

use indexmap::IndexMap;
use odata_uri_diagnostics::{Diagnostic, UriError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::PrimitiveKind;

/// Kind of a schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Bad types, and Ambiguous types whose candidates disagree on kind
    None,
    Primitive,
    Entity,
    Complex,
    Enum,
    EntityReference,
    Collection,
}

/// Unresolved type reference as written in the schema
///
/// `Ns.Customer`, `Edm.String`, `Collection(Ns.Order)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TypeExpr {
    Named(String),
    Collection(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn collection(element: TypeExpr) -> Self {
        Self::Collection(Box::new(element))
    }

    /// Parse a type expression. Never fails: malformed text becomes a
    /// `Named` expression that resolves to a Bad type later.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(inner) = text
            .strip_prefix("Collection(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::collection(Self::parse(inner));
        }
        Self::Named(text.to_string())
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    /// Name of the innermost named type
    pub fn element_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Collection(inner) => inner.element_name(),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Collection(inner) => write!(f, "Collection({})", inner),
        }
    }
}

impl From<TypeExpr> for String {
    fn from(expr: TypeExpr) -> Self {
        expr.to_string()
    }
}

impl From<String> for TypeExpr {
    fn from(text: String) -> Self {
        TypeExpr::parse(&text)
    }
}

impl From<&str> for TypeExpr {
    fn from(text: &str) -> Self {
        TypeExpr::parse(text)
    }
}

/// Entity or complex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuredKind {
    Entity,
    Complex,
}

/// Entity or complex type definition
#[derive(Debug, Clone)]
pub struct StructuredType {
    pub namespace: String,
    pub name: String,
    pub kind: StructuredKind,
    /// Qualified name of the base type
    pub base_type: Option<String>,
    pub is_abstract: bool,
    /// Open types accept dynamic properties
    pub is_open: bool,
    /// Media entity (`$value` addresses the stream)
    pub has_stream: bool,
    /// Declared key property names; empty means inherited (or keyless)
    pub key: Vec<String>,
    /// Declared properties, in declaration order
    pub properties: IndexMap<String, Property>,
}

impl StructuredType {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn declared_property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }
}

/// A declared property
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Structural(StructuralProperty),
    Navigation(NavigationProperty),
}

impl Property {
    pub fn name(&self) -> &str {
        match self {
            Self::Structural(p) => &p.name,
            Self::Navigation(p) => &p.name,
        }
    }

    pub fn type_expr(&self) -> &TypeExpr {
        match self {
            Self::Structural(p) => &p.type_expr,
            Self::Navigation(p) => &p.target,
        }
    }

    pub fn nullable(&self) -> bool {
        match self {
            Self::Structural(p) => p.nullable,
            Self::Navigation(p) => p.nullable,
        }
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self, Self::Navigation(_))
    }

    pub fn as_navigation(&self) -> Option<&NavigationProperty> {
        match self {
            Self::Navigation(p) => Some(p),
            Self::Structural(_) => None,
        }
    }
}

/// Primitive, enum, complex (or collection thereof) valued property
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralProperty {
    pub name: String,
    pub type_expr: TypeExpr,
    pub nullable: bool,
}

/// Property that navigates to related entities
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationProperty {
    pub name: String,
    /// `Ns.Order` or `Collection(Ns.Order)`
    pub target: TypeExpr,
    pub nullable: bool,
    pub partner: Option<String>,
    /// Targets are contained in the source entity rather than in an entity set
    pub contains_target: bool,
}

/// Enumeration type definition
#[derive(Debug, Clone)]
pub struct EnumType {
    pub namespace: String,
    pub name: String,
    pub underlying: PrimitiveKind,
    pub is_flags: bool,
    pub members: IndexMap<String, i64>,
}

impl EnumType {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn member(&self, name: &str) -> Option<i64> {
        self.members.get(name).copied()
    }

    /// Find a member name by value
    pub fn member_name(&self, value: i64) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| **v == value)
            .map(|(name, _)| name.as_str())
    }
}

/// Placeholder for a type lookup that matched nothing
#[derive(Debug, Clone)]
pub struct BadType {
    pub namespace: String,
    pub name: String,
    pub errors: Vec<Diagnostic>,
}

/// Placeholder for a type lookup that matched several definitions
#[derive(Debug, Clone)]
pub struct AmbiguousType {
    pub namespace: String,
    pub name: String,
    pub candidates: Vec<SchemaType>,
    pub errors: Vec<Diagnostic>,
}

/// A resolved (or placeholder) schema type
#[derive(Debug, Clone)]
pub enum SchemaType {
    Primitive(PrimitiveKind),
    Entity(Arc<StructuredType>),
    Complex(Arc<StructuredType>),
    Enum(Arc<EnumType>),
    /// `$ref` result: a reference to an entity of the element type
    EntityReference(Box<SchemaType>),
    Collection(Box<SchemaType>),
    Bad(Arc<BadType>),
    Ambiguous(Arc<AmbiguousType>),
}

/// Split `Ns.Sub.Name` into (`Ns.Sub`, `Name`)
pub fn split_qualified(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => ("", name),
    }
}

impl SchemaType {
    /// Create a Bad type for a qualified name
    pub fn bad(qualified_name: &str, error: Diagnostic) -> Self {
        let (namespace, name) = split_qualified(qualified_name);
        Self::Bad(Arc::new(BadType {
            namespace: namespace.to_string(),
            name: name.to_string(),
            errors: vec![error],
        }))
    }

    /// Create an Ambiguous type for a qualified name
    pub fn ambiguous(qualified_name: &str, candidates: Vec<SchemaType>, error: Diagnostic) -> Self {
        let (namespace, name) = split_qualified(qualified_name);
        Self::Ambiguous(Arc::new(AmbiguousType {
            namespace: namespace.to_string(),
            name: name.to_string(),
            candidates,
            errors: vec![error],
        }))
    }

    pub fn collection(element: SchemaType) -> Self {
        Self::Collection(Box::new(element))
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Primitive(_) => TypeKind::Primitive,
            Self::Entity(_) => TypeKind::Entity,
            Self::Complex(_) => TypeKind::Complex,
            Self::Enum(_) => TypeKind::Enum,
            Self::EntityReference(_) => TypeKind::EntityReference,
            Self::Collection(_) => TypeKind::Collection,
            Self::Bad(_) => TypeKind::None,
            Self::Ambiguous(amb) => {
                let mut kinds = amb.candidates.iter().map(SchemaType::kind);
                match kinds.next() {
                    Some(first) if kinds.all(|k| k == first) => first,
                    _ => TypeKind::None,
                }
            }
        }
    }

    /// Simple name (`Customer`, `Int32`, `Collection`)
    pub fn name(&self) -> &str {
        match self {
            Self::Primitive(kind) => kind.name(),
            Self::Entity(def) | Self::Complex(def) => &def.name,
            Self::Enum(def) => &def.name,
            Self::EntityReference(inner) => inner.name(),
            Self::Collection(_) => "Collection",
            Self::Bad(bad) => &bad.name,
            Self::Ambiguous(amb) => &amb.name,
        }
    }

    /// Namespace (`Edm` for primitives, empty for collections)
    pub fn namespace(&self) -> &str {
        match self {
            Self::Primitive(_) => "Edm",
            Self::Entity(def) | Self::Complex(def) => &def.namespace,
            Self::Enum(def) => &def.namespace,
            Self::EntityReference(inner) => inner.namespace(),
            Self::Collection(_) => "",
            Self::Bad(bad) => &bad.namespace,
            Self::Ambiguous(amb) => &amb.namespace,
        }
    }

    /// Fully qualified name (`Ns.Customer`, `Collection(Edm.Int32)`)
    pub fn full_name(&self) -> String {
        match self {
            Self::Primitive(kind) => kind.qualified_name().to_string(),
            Self::Collection(inner) => format!("Collection({})", inner.full_name()),
            Self::EntityReference(inner) => format!("Ref({})", inner.full_name()),
            other if other.namespace().is_empty() => other.name().to_string(),
            other => format!("{}.{}", other.namespace(), other.name()),
        }
    }

    /// Deferred errors carried by this type (or its element type)
    pub fn errors(&self) -> &[Diagnostic] {
        match self {
            Self::Bad(bad) => &bad.errors,
            Self::Ambiguous(amb) => &amb.errors,
            Self::Collection(inner) | Self::EntityReference(inner) => inner.errors(),
            _ => &[],
        }
    }

    /// True for Bad and Ambiguous types, including as collection elements
    pub fn is_bad(&self) -> bool {
        !self.errors().is_empty()
    }

    pub fn is_ambiguous(&self) -> bool {
        match self {
            Self::Ambiguous(_) => true,
            Self::Collection(inner) | Self::EntityReference(inner) => inner.is_ambiguous(),
            _ => false,
        }
    }

    /// Surface deferred errors when a concrete definition is required
    pub fn require_concrete(&self) -> Result<&SchemaType, UriError> {
        if self.is_bad() {
            log::debug!("surfacing deferred errors of type '{}'", self.full_name());
            return Err(UriError::from_diagnostics(self.errors()));
        }
        Ok(self)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    /// Element type of a collection, or the type itself
    pub fn element_type(&self) -> &SchemaType {
        match self {
            Self::Collection(inner) => inner,
            other => other,
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Arc<StructuredType>> {
        match self {
            Self::Entity(def) | Self::Complex(def) => Some(def),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Arc<StructuredType>> {
        match self {
            Self::Entity(def) => Some(def),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&Arc<EnumType>> {
        match self {
            Self::Enum(def) => Some(def),
            _ => None,
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Self::Entity(_))
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Entity(_) | Self::Complex(_))
    }

    pub fn is_open(&self) -> bool {
        self.as_structured().is_some_and(|def| def.is_open)
    }

    /// Identity comparison: same primitive, or the same definition instance
    pub fn same_definition(&self, other: &SchemaType) -> bool {
        match (self, other) {
            (Self::Primitive(a), Self::Primitive(b)) => a == b,
            (Self::Entity(a), Self::Entity(b)) | (Self::Complex(a), Self::Complex(b)) => {
                Arc::ptr_eq(a, b)
            }
            (Self::Enum(a), Self::Enum(b)) => Arc::ptr_eq(a, b),
            (Self::Collection(a), Self::Collection(b))
            | (Self::EntityReference(a), Self::EntityReference(b)) => a.same_definition(b),
            (Self::Bad(a), Self::Bad(b)) => a.namespace == b.namespace && a.name == b.name,
            (Self::Ambiguous(a), Self::Ambiguous(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for SchemaType {
    fn eq(&self, other: &Self) -> bool {
        self.same_definition(other)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

impl From<PrimitiveKind> for SchemaType {
    fn from(kind: PrimitiveKind) -> Self {
        Self::Primitive(kind)
    }
}

/// A type together with its nullability at the point of use
#[derive(Debug, Clone, PartialEq)]
pub struct TypeReference {
    pub ty: SchemaType,
    pub nullable: bool,
}

impl TypeReference {
    pub fn new(ty: SchemaType, nullable: bool) -> Self {
        Self { ty, nullable }
    }

    pub fn nullable(ty: SchemaType) -> Self {
        Self::new(ty, true)
    }

    pub fn non_null(ty: SchemaType) -> Self {
        Self::new(ty, false)
    }

    pub fn primitive(kind: PrimitiveKind, nullable: bool) -> Self {
        Self::new(SchemaType::Primitive(kind), nullable)
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        self.ty.as_primitive()
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)?;
        if !self.nullable {
            write!(f, " not null")?;
        }
        Ok(())
    }
}
