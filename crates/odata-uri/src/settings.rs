//! Resolver settings

use odata_uri_diagnostics::{OD0504, Result, UriError};
use odata_uri_literal::ProtocolVersion;
use odata_uri_semantic::{
    CaseInsensitive, DefaultResolver, ResolutionLimits, ResolverPolicy, StringAsEnum,
    UnqualifiedOperations,
};
use serde::{Deserialize, Serialize};

/// Settings for one [`QueryResolver`](crate::QueryResolver)
///
/// Missing fields take their defaults, so `{}` is a valid settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Match identifiers ignoring ASCII case
    pub case_insensitive: bool,
    /// Accept bound and unbound operations without a namespace prefix
    pub unqualified_operations: bool,
    /// Accept string literals where an enum value is expected
    pub enum_as_string: bool,
    pub protocol_version: ProtocolVersion,
    pub max_segments: usize,
    pub max_expand_depth: usize,
    pub max_expand_count: usize,
    pub max_lambda_depth: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        let limits = ResolutionLimits::default();
        Self {
            case_insensitive: false,
            unqualified_operations: false,
            enum_as_string: false,
            protocol_version: ProtocolVersion::default(),
            max_segments: limits.max_segments,
            max_expand_depth: limits.max_expand_depth,
            max_expand_count: limits.max_expand_count,
            max_lambda_depth: limits.max_lambda_depth,
        }
    }
}

impl ParserSettings {
    /// Load settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| UriError::limit(OD0504, format!("Invalid parser settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject limits that would make every request fail
    pub fn validate(&self) -> Result<()> {
        if self.max_segments == 0 {
            return Err(UriError::limit(OD0504, "max_segments must be at least 1"));
        }
        Ok(())
    }

    pub fn limits(&self) -> ResolutionLimits {
        ResolutionLimits {
            max_segments: self.max_segments,
            max_expand_depth: self.max_expand_depth,
            max_expand_count: self.max_expand_count,
            max_lambda_depth: self.max_lambda_depth,
        }
    }

    /// Layer the enabled policy wrappers around [`DefaultResolver`]
    pub fn policy(&self) -> Box<dyn ResolverPolicy> {
        let base: Box<dyn ResolverPolicy> = if self.case_insensitive {
            Box::new(CaseInsensitive(DefaultResolver))
        } else {
            Box::new(DefaultResolver)
        };
        let base: Box<dyn ResolverPolicy> = if self.unqualified_operations {
            Box::new(UnqualifiedOperations(base))
        } else {
            base
        };
        if self.enum_as_string {
            Box::new(StringAsEnum(base))
        } else {
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(ParserSettings::from_json("{}").unwrap(), ParserSettings::default());
        assert_eq!(ParserSettings::default().limits(), ResolutionLimits::default());
    }

    #[test]
    fn test_partial_document() {
        let settings = ParserSettings::from_json(
            r#"{"case_insensitive": true, "protocol_version": "4.01", "max_expand_depth": 2}"#,
        )
        .unwrap();
        assert!(settings.case_insensitive);
        assert!(!settings.enum_as_string);
        assert_eq!(settings.protocol_version, ProtocolVersion::V401);
        assert_eq!(settings.limits().max_expand_depth, 2);
        assert_eq!(settings.max_segments, 100);
    }

    #[test]
    fn test_invalid_settings() {
        for json in [
            r#"{"max_segments": -1}"#,
            r#"{"protocol_version": "3.0"}"#,
            r#"{"max_segments": 0}"#,
            "[",
        ] {
            assert_eq!(ParserSettings::from_json(json).unwrap_err().code(), OD0504, "{}", json);
        }
    }

    #[test]
    fn test_policy_flags() {
        assert!(!ParserSettings::default().policy().case_insensitive());
        let settings = ParserSettings {
            case_insensitive: true,
            unqualified_operations: true,
            enum_as_string: true,
            ..Default::default()
        };
        // the case flag survives the outer wrappers
        assert!(settings.policy().case_insensitive());
    }
}
