//! Functions, actions and their container-level imports

use crate::TypeExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Function,
    Action,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationParameter {
    pub name: String,
    pub type_expr: TypeExpr,
    pub nullable: bool,
    /// Optional parameters may be omitted from a call
    pub optional: bool,
}

impl OperationParameter {
    pub fn new(name: impl Into<String>, type_expr: impl Into<TypeExpr>) -> Self {
        Self {
            name: name.into(),
            type_expr: type_expr.into(),
            nullable: true,
            optional: false,
        }
    }
}

/// Path from the binding parameter to the navigation source of the result
///
/// Written `bindingParameter/Orders/Items` in the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySetPath {
    pub parameter: String,
    pub navigation: Vec<String>,
}

impl EntitySetPath {
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('/').filter(|p| !p.is_empty());
        let parameter = parts.next()?.to_string();
        Some(Self {
            parameter,
            navigation: parts.map(str::to_string).collect(),
        })
    }
}

impl std::fmt::Display for EntitySetPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.parameter)?;
        for step in &self.navigation {
            write!(f, "/{}", step)?;
        }
        Ok(())
    }
}

/// Function or action declared in a schema namespace
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub namespace: String,
    pub name: String,
    pub kind: OperationKind,
    /// Bound operations take the binding instance as their first parameter
    pub is_bound: bool,
    /// Further path segments may follow a composable function
    pub is_composable: bool,
    pub parameters: Vec<OperationParameter>,
    pub return_type: Option<TypeExpr>,
    pub entity_set_path: Option<EntitySetPath>,
}

impl Operation {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn is_function(&self) -> bool {
        self.kind == OperationKind::Function
    }

    pub fn is_action(&self) -> bool {
        self.kind == OperationKind::Action
    }

    pub fn binding_parameter(&self) -> Option<&OperationParameter> {
        if self.is_bound {
            self.parameters.first()
        } else {
            None
        }
    }

    /// Parameters supplied by the caller (all but the binding parameter)
    pub fn non_binding_parameters(&self) -> &[OperationParameter] {
        if self.is_bound && !self.parameters.is_empty() {
            &self.parameters[1..]
        } else {
            &self.parameters
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&OperationParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Function or action import exposed by the container
#[derive(Debug, Clone, PartialEq)]
pub struct OperationImport {
    pub name: String,
    pub container: String,
    pub kind: OperationKind,
    /// Qualified name of the imported operation
    pub operation: String,
    /// Entity set the result belongs to
    pub entity_set: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_set_path_parse() {
        let path = EntitySetPath::parse("bindingParameter/Orders/Items").unwrap();
        assert_eq!(path.parameter, "bindingParameter");
        assert_eq!(path.navigation, vec!["Orders".to_string(), "Items".to_string()]);
        assert_eq!(path.to_string(), "bindingParameter/Orders/Items");
        assert!(EntitySetPath::parse("").is_none());
    }

    #[test]
    fn test_non_binding_parameters() {
        let op = Operation {
            namespace: "Sales".into(),
            name: "Discount".into(),
            kind: OperationKind::Action,
            is_bound: true,
            is_composable: false,
            parameters: vec![
                OperationParameter::new("order", "Sales.Order"),
                OperationParameter::new("percent", "Edm.Int32"),
            ],
            return_type: None,
            entity_set_path: None,
        };
        assert_eq!(op.binding_parameter().map(|p| p.name.as_str()), Some("order"));
        assert_eq!(op.non_binding_parameters().len(), 1);
        assert_eq!(op.full_name(), "Sales.Discount");
    }
}
