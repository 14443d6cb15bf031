//! Range variable scopes for expression binding
//!
//! Every option expression starts in a scope defining `$it`. Lambda
//! expressions (`any`/`all`) introduce a child scope with their own range
//! variable, visible only inside the lambda body.

use indexmap::IndexMap;
use odata_uri_schema::TypeReference;
use std::fmt;

/// Name of the implicit range variable
pub const IT: &str = "$it";

/// A named range variable
#[derive(Debug, Clone, PartialEq)]
pub struct RangeVariable {
    pub name: String,
    pub ty: TypeReference,
    pub kind: ScopeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Scope of a query option, defining `$it`
    Option,
    /// `any`/`all` body
    Lambda,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Option => write!(f, "option"),
            Self::Lambda => write!(f, "lambda"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    kind: ScopeKind,
    variables: IndexMap<String, RangeVariable>,
    parent: Option<Box<Scope>>,
    depth: usize,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            variables: IndexMap::new(),
            parent: None,
            depth: 0,
        }
    }

    pub fn child(&self, kind: ScopeKind) -> Self {
        Self {
            kind,
            variables: IndexMap::new(),
            parent: Some(Box::new(self.clone())),
            depth: self.depth + 1,
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn define(&mut self, name: impl Into<String>, ty: TypeReference) {
        let name = name.into();
        self.variables.insert(
            name.clone(),
            RangeVariable {
                name,
                ty,
                kind: self.kind,
            },
        );
    }

    /// Look up a variable here or in enclosing scopes
    pub fn lookup(&self, name: &str) -> Option<&RangeVariable> {
        self.variables
            .get(name)
            .or_else(|| self.parent.as_ref().and_then(|p| p.lookup(name)))
    }

    /// Number of lambda scopes from here up to the option scope
    pub fn lambda_depth(&self) -> usize {
        let own = usize::from(self.kind == ScopeKind::Lambda);
        own + self.parent.as_ref().map_or(0, |p| p.lambda_depth())
    }
}

/// Scope stack for one option expression
#[derive(Debug, Clone)]
pub struct ScopeManager {
    current: Scope,
    stack: Vec<Scope>,
}

impl ScopeManager {
    /// Option scope with `$it` bound to `it`
    pub fn new(it: TypeReference) -> Self {
        let mut current = Scope::new(ScopeKind::Option);
        current.define(IT, it);
        Self {
            current,
            stack: Vec::new(),
        }
    }

    pub fn current(&self) -> &Scope {
        &self.current
    }

    pub fn enter_lambda(&mut self, variable: Option<&str>, element: TypeReference) {
        let mut scope = self.current.child(ScopeKind::Lambda);
        if let Some(variable) = variable {
            scope.define(variable, element);
        }
        let outer = std::mem::replace(&mut self.current, scope);
        self.stack.push(outer);
    }

    pub fn leave(&mut self) -> Option<Scope> {
        let parent = self.stack.pop()?;
        Some(std::mem::replace(&mut self.current, parent))
    }

    pub fn lookup(&self, name: &str) -> Option<&RangeVariable> {
        self.current.lookup(name)
    }

    /// The implicit `$it` variable
    pub fn it(&self) -> Option<&RangeVariable> {
        self.lookup(IT)
    }

    pub fn lambda_depth(&self) -> usize {
        self.current.lambda_depth()
    }

    /// Run `f` inside a lambda scope
    pub fn with_lambda<F, R>(&mut self, variable: Option<&str>, element: TypeReference, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.enter_lambda(variable, element);
        let result = f(self);
        self.leave();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_uri_schema::PrimitiveKind;

    fn int() -> TypeReference {
        TypeReference::primitive(PrimitiveKind::Int32, false)
    }

    fn string() -> TypeReference {
        TypeReference::primitive(PrimitiveKind::String, true)
    }

    #[test]
    fn test_lambda_variable_is_scoped() {
        let mut scopes = ScopeManager::new(string());
        assert!(scopes.lookup("o").is_none());

        let seen = scopes.with_lambda(Some("o"), int(), |s| {
            assert_eq!(s.lambda_depth(), 1);
            s.lookup("o").map(|v| v.ty.clone())
        });
        assert_eq!(seen, Some(int()));
        assert!(scopes.lookup("o").is_none());
        assert_eq!(scopes.lambda_depth(), 0);
    }

    #[test]
    fn test_it_visible_in_nested_lambdas() {
        let mut scopes = ScopeManager::new(string());
        scopes.enter_lambda(Some("a"), int());
        scopes.enter_lambda(Some("b"), int());
        assert_eq!(scopes.lambda_depth(), 2);
        assert_eq!(scopes.it().map(|v| v.ty.clone()), Some(string()));
        assert_eq!(scopes.lookup("a").map(|v| v.kind), Some(ScopeKind::Lambda));
        scopes.leave();
        assert!(scopes.lookup("b").is_none());
    }
}
