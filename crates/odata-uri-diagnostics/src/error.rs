//! Error types for URI resolution
//!
//! Two forms of error exist side by side. A [`Diagnostic`] is a value: it is
//! stored inside Bad and Ambiguous schema elements and travels with them until
//! some consumer needs a concrete definition. A [`UriError`] is raised: the
//! walker and the binder return it as soon as a structural, coercion or
//! binding violation is detected.

use crate::{ErrorCode, SourceLocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A deferred error carried by an unresolved schema element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub location: Option<SourceLocation>,
    /// Extra detail such as the candidates of an ambiguous lookup
    pub context: Option<String>,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
            context: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " at {}", loc)?;
        }
        Ok(())
    }
}

/// Main error type raised during URI resolution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UriError {
    /// Malformed raw input (segment text, parenthetical, literal text)
    #[error("{code}: {message}")]
    Syntax {
        code: ErrorCode,
        message: String,
        text: String,
        location: Option<SourceLocation>,
    },

    /// A name did not resolve, or resolved to more than one element
    #[error("{code}: {message}")]
    Resolution {
        code: ErrorCode,
        message: String,
        location: Option<SourceLocation>,
        context: Option<String>,
    },

    /// The walker cannot produce a meaningful next state
    #[error("{code}: {message}")]
    Structural {
        code: ErrorCode,
        message: String,
        location: Option<SourceLocation>,
        context: Option<String>,
    },

    /// A value cannot be converted to its statically expected type
    #[error("{code}: {message}")]
    Coercion {
        code: ErrorCode,
        message: String,
        location: Option<SourceLocation>,
        context: Option<String>,
    },

    /// Operation arguments do not match the formal parameters
    #[error("{code}: {message}")]
    Binding {
        code: ErrorCode,
        message: String,
        location: Option<SourceLocation>,
        context: Option<String>,
    },

    /// A configured limit was exceeded, or the settings are invalid
    #[error("{code}: {message}")]
    Limit { code: ErrorCode, message: String },

    /// Several deferred errors raised at once
    #[error("{} errors, first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
    Multiple(Vec<UriError>),
}

impl UriError {
    pub fn syntax(code: ErrorCode, message: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Syntax {
            code,
            message: message.into(),
            text: text.into(),
            location: None,
        }
    }

    pub fn resolution(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Resolution {
            code,
            message: message.into(),
            location: None,
            context: None,
        }
    }

    pub fn structural(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Structural {
            code,
            message: message.into(),
            location: None,
            context: None,
        }
    }

    pub fn coercion(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Coercion {
            code,
            message: message.into(),
            location: None,
            context: None,
        }
    }

    pub fn binding(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Binding {
            code,
            message: message.into(),
            location: None,
            context: None,
        }
    }

    pub fn limit(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Limit {
            code,
            message: message.into(),
        }
    }

    /// Raise the deferred errors of a Bad or Ambiguous element.
    ///
    /// The variant is chosen from the code range of each diagnostic.
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        let mut errors: Vec<UriError> = diagnostics.iter().map(Self::from_diagnostic).collect();
        match errors.len() {
            0 => Self::resolution(crate::OD0100, "Unresolved element"),
            1 => errors.remove(0),
            _ => Self::Multiple(errors),
        }
    }

    pub fn from_diagnostic(diagnostic: &Diagnostic) -> Self {
        let Diagnostic {
            code,
            message,
            location,
            context,
        } = diagnostic.clone();
        if code.is_syntax_error() {
            Self::Syntax {
                code,
                message,
                text: context.unwrap_or_default(),
                location,
            }
        } else if code.is_structural_error() {
            Self::Structural { code, message, location, context }
        } else if code.is_coercion_error() {
            Self::Coercion { code, message, location, context }
        } else if code.is_binding_error() {
            Self::Binding { code, message, location, context }
        } else if code.is_limit_error() {
            Self::Limit { code, message }
        } else {
            Self::Resolution { code, message, location, context }
        }
    }

    /// Code of this error, or of the first collected one
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Syntax { code, .. }
            | Self::Resolution { code, .. }
            | Self::Structural { code, .. }
            | Self::Coercion { code, .. }
            | Self::Binding { code, .. }
            | Self::Limit { code, .. } => *code,
            Self::Multiple(errors) => errors.first().map(|e| e.code()).unwrap_or(crate::OD0100),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Syntax { message, .. }
            | Self::Resolution { message, .. }
            | Self::Structural { message, .. }
            | Self::Coercion { message, .. }
            | Self::Binding { message, .. }
            | Self::Limit { message, .. } => message,
            Self::Multiple(errors) => errors.first().map(|e| e.message()).unwrap_or(""),
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Syntax { location, .. }
            | Self::Resolution { location, .. }
            | Self::Structural { location, .. }
            | Self::Coercion { location, .. }
            | Self::Binding { location, .. } => location.as_ref(),
            Self::Limit { .. } => None,
            Self::Multiple(errors) => errors.first().and_then(|e| e.location()),
        }
    }

    /// Attach a location unless one is already set
    pub fn or_location(mut self, loc: SourceLocation) -> Self {
        match &mut self {
            Self::Syntax { location, .. }
            | Self::Resolution { location, .. }
            | Self::Structural { location, .. }
            | Self::Coercion { location, .. }
            | Self::Binding { location, .. } => {
                if location.is_none() {
                    *location = Some(loc);
                }
            }
            Self::Limit { .. } => {}
            Self::Multiple(errors) => {
                for error in errors.iter_mut() {
                    let taken = std::mem::replace(error, Self::Multiple(Vec::new()));
                    *error = taken.or_location(loc.clone());
                }
            }
        }
        self
    }

    /// Whether this error (or the first collected one) reports ambiguity
    pub fn is_ambiguity(&self) -> bool {
        self.code().is_ambiguity()
    }

    /// Turn the error back into a value, e.g. to store it on a Bad element.
    ///
    /// Without context of its own the diagnostic takes the help text
    /// registered for its code.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let context = match self {
            Self::Syntax { text, .. } if !text.is_empty() => Some(text.clone()),
            Self::Resolution { context, .. }
            | Self::Structural { context, .. }
            | Self::Coercion { context, .. }
            | Self::Binding { context, .. } => context.clone(),
            Self::Multiple(errors) if errors.len() > 1 => Some(format!("and {} more", errors.len() - 1)),
            _ => None,
        };
        Diagnostic {
            code: self.code(),
            message: self.message().to_string(),
            location: self.location().cloned(),
            context: context.or_else(|| self.code().info().help.map(str::to_string)),
        }
    }
}

/// Fluent construction of located errors
pub struct ErrorBuilder {
    code: ErrorCode,
    message: String,
    location: Option<SourceLocation>,
}

impl ErrorBuilder {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<SourceLocation>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Build a syntax error over the offending raw text
    pub fn syntax(self, text: impl Into<String>) -> UriError {
        UriError::Syntax {
            code: self.code,
            message: self.message,
            text: text.into(),
            location: self.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OD0003, OD0101, OD0104, OD0111, OD0201, OD0400, Span};

    #[test]
    fn test_error_builder() {
        let err = ErrorBuilder::new(OD0003, "Unexpected ')'")
            .at(Span::new(9, 10))
            .syntax("Customers(1))");

        assert!(matches!(err, UriError::Syntax { .. }));
        assert_eq!(err.code(), OD0003);
        assert_eq!(err.location().map(|l| l.column), Some(10));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(OD0101, "Type 'Ns.Missing' not found").at(SourceLocation::new(1, 5, 4, 1));
        assert_eq!(diag.to_string(), "OD0101: Type 'Ns.Missing' not found at 1:5");
    }

    #[test]
    fn test_from_diagnostics_picks_variant_by_code() {
        let err = UriError::from_diagnostics(&[Diagnostic::new(OD0201, "wrong key count")]);
        assert!(matches!(err, UriError::Structural { .. }));

        let err = UriError::from_diagnostics(&[Diagnostic::new(OD0400, "unknown parameter")]);
        assert!(matches!(err, UriError::Binding { .. }));

        let err = UriError::from_diagnostics(&[
            Diagnostic::new(OD0111, "ambiguous"),
            Diagnostic::new(OD0101, "missing"),
        ]);
        assert!(matches!(err, UriError::Multiple(ref v) if v.len() == 2));
        assert!(err.is_ambiguity());
        assert_eq!(err.to_diagnostic().context.as_deref(), Some("and 1 more"));
    }

    #[test]
    fn test_to_diagnostic_falls_back_to_code_help() {
        let diag = UriError::resolution(OD0104, "Operation 'Top' not found").to_diagnostic();
        assert_eq!(diag.code, OD0104);
        assert!(diag.context.is_some_and(|help| help.contains("namespace-qualified")));
    }

    #[test]
    fn test_or_location_keeps_existing() {
        let err = UriError::structural(OD0201, "count")
            .or_location(SourceLocation::new(1, 2, 1, 1))
            .or_location(SourceLocation::new(1, 9, 8, 1));
        assert_eq!(err.location().map(|l| l.column), Some(2));
    }
}
