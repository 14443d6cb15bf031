//! Navigation sources (entity sets, singletons, contained sets) and the
//! entity container that declares them

use indexmap::IndexMap;
use odata_uri_diagnostics::{Diagnostic, UriError};
use std::fmt;
use std::sync::Arc;

use crate::{OperationImport, TypeExpr};

/// Entity set declared in the container
#[derive(Debug, Clone)]
pub struct EntitySet {
    pub name: String,
    pub container: String,
    /// Qualified element type name
    pub entity_type: String,
    /// Navigation property binding path -> target (`Set` or `Container/Set`)
    pub bindings: IndexMap<String, String>,
}

/// Singleton declared in the container
#[derive(Debug, Clone)]
pub struct Singleton {
    pub name: String,
    pub container: String,
    pub entity_type: String,
    pub bindings: IndexMap<String, String>,
}

/// Targets of a containment navigation property, addressed through their parent
#[derive(Debug, Clone)]
pub struct ContainedSet {
    pub parent: NavigationSource,
    pub property: String,
    pub target: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct BadNavigationSource {
    pub name: String,
    pub errors: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct AmbiguousNavigationSource {
    pub name: String,
    pub candidates: Vec<NavigationSource>,
    pub errors: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationSourceKind {
    EntitySet,
    Singleton,
    Contained,
    /// Bad, and Ambiguous sources whose candidates disagree on kind
    None,
}

/// An addressable root (or navigation target)
#[derive(Debug, Clone)]
pub enum NavigationSource {
    EntitySet(Arc<EntitySet>),
    Singleton(Arc<Singleton>),
    Contained(Arc<ContainedSet>),
    Ambiguous(Arc<AmbiguousNavigationSource>),
    Bad(Arc<BadNavigationSource>),
}

impl NavigationSource {
    pub fn bad(name: &str, errors: Vec<Diagnostic>) -> Self {
        Self::Bad(Arc::new(BadNavigationSource {
            name: name.to_string(),
            errors,
        }))
    }

    pub fn ambiguous(name: &str, candidates: Vec<NavigationSource>, error: Diagnostic) -> Self {
        Self::Ambiguous(Arc::new(AmbiguousNavigationSource {
            name: name.to_string(),
            candidates,
            errors: vec![error],
        }))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::EntitySet(set) => &set.name,
            Self::Singleton(single) => &single.name,
            Self::Contained(contained) => &contained.property,
            Self::Ambiguous(amb) => &amb.name,
            Self::Bad(bad) => &bad.name,
        }
    }

    pub fn kind(&self) -> NavigationSourceKind {
        match self {
            Self::EntitySet(_) => NavigationSourceKind::EntitySet,
            Self::Singleton(_) => NavigationSourceKind::Singleton,
            Self::Contained(_) => NavigationSourceKind::Contained,
            Self::Bad(_) => NavigationSourceKind::None,
            Self::Ambiguous(amb) => {
                let mut kinds = amb.candidates.iter().map(NavigationSource::kind);
                match kinds.next() {
                    Some(first) if kinds.all(|k| k == first) => first,
                    _ => NavigationSourceKind::None,
                }
            }
        }
    }

    /// Element type expression, if this is a concrete source
    pub fn entity_type_expr(&self) -> Option<TypeExpr> {
        match self {
            Self::EntitySet(set) => Some(TypeExpr::named(set.entity_type.as_str())),
            Self::Singleton(single) => Some(TypeExpr::named(single.entity_type.as_str())),
            Self::Contained(contained) => Some(TypeExpr::named(contained.target.element_name())),
            Self::Ambiguous(_) | Self::Bad(_) => None,
        }
    }

    /// Navigation property bindings (empty for contained and placeholder sources)
    pub fn bindings(&self) -> Option<&IndexMap<String, String>> {
        match self {
            Self::EntitySet(set) => Some(&set.bindings),
            Self::Singleton(single) => Some(&single.bindings),
            _ => None,
        }
    }

    pub fn errors(&self) -> &[Diagnostic] {
        match self {
            Self::Bad(bad) => &bad.errors,
            Self::Ambiguous(amb) => &amb.errors,
            Self::Contained(contained) => contained.parent.errors(),
            _ => &[],
        }
    }

    pub fn is_bad(&self) -> bool {
        !self.errors().is_empty()
    }

    pub fn require_concrete(&self) -> Result<&NavigationSource, UriError> {
        if self.is_bad() {
            log::debug!("surfacing deferred errors of navigation source '{}'", self.name());
            return Err(UriError::from_diagnostics(self.errors()));
        }
        Ok(self)
    }

    /// Singleton-valued source (singletons, single-valued containment)
    pub fn is_single(&self) -> bool {
        match self {
            Self::Singleton(_) => true,
            Self::Contained(contained) => !contained.target.is_collection(),
            _ => false,
        }
    }

    /// True for sources that start a new canonical resource root
    pub fn is_container_level(&self) -> bool {
        matches!(self, Self::EntitySet(_) | Self::Singleton(_))
    }

    pub fn same_source(&self, other: &NavigationSource) -> bool {
        match (self, other) {
            (Self::EntitySet(a), Self::EntitySet(b)) => Arc::ptr_eq(a, b),
            (Self::Singleton(a), Self::Singleton(b)) => Arc::ptr_eq(a, b),
            (Self::Contained(a), Self::Contained(b)) => {
                a.property == b.property && a.parent.same_source(&b.parent)
            }
            (Self::Ambiguous(a), Self::Ambiguous(b)) => Arc::ptr_eq(a, b),
            (Self::Bad(a), Self::Bad(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl PartialEq for NavigationSource {
    fn eq(&self, other: &Self) -> bool {
        self.same_source(other)
    }
}

impl fmt::Display for NavigationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contained(contained) => write!(f, "{}/{}", contained.parent, contained.property),
            other => f.write_str(other.name()),
        }
    }
}

/// The service's entity container
#[derive(Debug, Clone, Default)]
pub struct EntityContainer {
    pub namespace: String,
    pub name: String,
    pub entity_sets: Vec<Arc<EntitySet>>,
    pub singletons: Vec<Arc<Singleton>>,
    pub operation_imports: Vec<Arc<OperationImport>>,
}

impl EntityContainer {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Entity sets and singletons matching `name`
    pub fn navigation_sources(&self, name: &str, case_insensitive: bool) -> Vec<NavigationSource> {
        let matches = |candidate: &str| {
            if case_insensitive {
                candidate.eq_ignore_ascii_case(name)
            } else {
                candidate == name
            }
        };
        let sets = self
            .entity_sets
            .iter()
            .filter(|set| matches(&set.name))
            .cloned()
            .map(NavigationSource::EntitySet);
        let singletons = self
            .singletons
            .iter()
            .filter(|single| matches(&single.name))
            .cloned()
            .map(NavigationSource::Singleton);
        sets.chain(singletons).collect()
    }

    pub fn operation_imports(&self, name: &str, case_insensitive: bool) -> Vec<Arc<OperationImport>> {
        self.operation_imports
            .iter()
            .filter(|import| {
                if case_insensitive {
                    import.name.eq_ignore_ascii_case(name)
                } else {
                    import.name == name
                }
            })
            .cloned()
            .collect()
    }

    /// Check whether `name` refers to this container (simple or qualified)
    pub fn is_named(&self, name: &str) -> bool {
        name == self.name || name == self.full_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_uri_diagnostics::OD0102;

    fn container() -> EntityContainer {
        EntityContainer {
            namespace: "Sales".into(),
            name: "Default".into(),
            entity_sets: vec![Arc::new(EntitySet {
                name: "Customers".into(),
                container: "Default".into(),
                entity_type: "Sales.Customer".into(),
                bindings: IndexMap::new(),
            })],
            singletons: vec![Arc::new(Singleton {
                name: "Me".into(),
                container: "Default".into(),
                entity_type: "Sales.Customer".into(),
                bindings: IndexMap::new(),
            })],
            operation_imports: Vec::new(),
        }
    }

    #[test]
    fn test_navigation_source_lookup() {
        let c = container();
        assert_eq!(c.navigation_sources("Customers", false).len(), 1);
        assert!(c.navigation_sources("customers", false).is_empty());
        assert_eq!(c.navigation_sources("customers", true).len(), 1);
        assert!(c.is_named("Sales.Default"));
    }

    #[test]
    fn test_bad_source_defers_errors() {
        let bad = NavigationSource::bad("Nope", vec![Diagnostic::new(OD0102, "missing")]);
        assert_eq!(bad.name(), "Nope");
        assert_eq!(bad.kind(), NavigationSourceKind::None);
        assert!(bad.entity_type_expr().is_none());
        assert_eq!(bad.require_concrete().unwrap_err().code(), OD0102);
    }

    #[test]
    fn test_contained_inherits_parent_errors() {
        let bad = NavigationSource::bad("Nope", vec![Diagnostic::new(OD0102, "missing")]);
        let contained = NavigationSource::Contained(Arc::new(ContainedSet {
            parent: bad,
            property: "Lines".into(),
            target: TypeExpr::parse("Collection(Sales.Line)"),
        }));
        assert!(contained.is_bad());
        assert!(!contained.is_single());
        assert_eq!(contained.to_string(), "Nope/Lines");
    }
}
