//! Error codes following a structured numbering system
//!
//! Error code ranges:
//! - OD0001-OD0099: Syntax errors (raw segments, parentheticals, literal text)
//! - OD0100-OD0199: Name resolution errors (not found, ambiguous)
//! - OD0200-OD0299: Structural violations raised by the path walker
//! - OD0300-OD0399: Literal coercion and operand typing errors
//! - OD0400-OD0499: Parameter binding errors
//! - OD0500-OD0599: Limit and settings violations

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    pub const fn is_syntax_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    pub const fn is_resolution_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Ambiguity codes occupy OD0110-OD0119
    pub const fn is_ambiguity(&self) -> bool {
        self.0 >= 110 && self.0 < 120
    }

    pub const fn is_structural_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    pub const fn is_coercion_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    pub const fn is_binding_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    pub const fn is_limit_error(&self) -> bool {
        self.0 >= 500 && self.0 < 600
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OD{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Syntax errors (0001-0099)
    map.insert(1, ErrorInfo::new("Malformed path segment"));
    map.insert(2, ErrorInfo::new("Unbalanced parentheses"));
    map.insert(3, ErrorInfo::new("Invalid key predicate or argument list"));
    map.insert(4, ErrorInfo::new("Invalid literal"));
    map.insert(5, ErrorInfo::new("Unterminated string literal"));
    map.insert(6, ErrorInfo::new("Invalid number format"));
    map.insert(7, ErrorInfo::new("Invalid date/time format"));
    map.insert(8, ErrorInfo::new("Invalid GUID"));
    map.insert(9, ErrorInfo::new("Invalid binary literal"));
    map.insert(10, ErrorInfo::new("Invalid duration"));
    map.insert(11, ErrorInfo::new("Empty identifier"));
    map.insert(12, ErrorInfo::new("Duplicate name in argument list"));

    // Resolution errors (0100-0199)
    map.insert(100, ErrorInfo::new("Unresolved name")
        .with_help("Check the spelling and, if required, the namespace qualifier"));
    map.insert(101, ErrorInfo::new("Type not found"));
    map.insert(102, ErrorInfo::new("Navigation source not found"));
    map.insert(103, ErrorInfo::new("Property not found"));
    map.insert(104, ErrorInfo::new("Operation not found")
        .with_help("Operations must be namespace-qualified unless unqualified calls are enabled"));
    map.insert(105, ErrorInfo::new("Entity container not found"));
    map.insert(106, ErrorInfo::new("Enum member not found"));
    map.insert(107, ErrorInfo::new("Range variable not found"));
    map.insert(110, ErrorInfo::new("Ambiguous name"));
    map.insert(111, ErrorInfo::new("Ambiguous type"));
    map.insert(112, ErrorInfo::new("Ambiguous navigation source"));
    map.insert(113, ErrorInfo::new("Ambiguous property"));
    map.insert(114, ErrorInfo::new("Ambiguous operation overload"));

    // Structural violations (0200-0299)
    map.insert(200, ErrorInfo::new("Segment not allowed here"));
    map.insert(201, ErrorInfo::new("Key count mismatch"));
    map.insert(202, ErrorInfo::new("Key predicate on a type without a key"));
    map.insert(203, ErrorInfo::new("Type cast to an unrelated type"));
    map.insert(204, ErrorInfo::new("Navigation on a non-navigable type"));
    map.insert(205, ErrorInfo::new("$count not allowed here"));
    map.insert(206, ErrorInfo::new("$value not allowed here"));
    map.insert(207, ErrorInfo::new("$ref not allowed here"));
    map.insert(208, ErrorInfo::new("Segment follows a terminal segment"));
    map.insert(209, ErrorInfo::new("Unsupported segment"));
    map.insert(210, ErrorInfo::new("Empty path"));
    map.insert(211, ErrorInfo::new("Key predicate on a single-valued segment"));
    map.insert(212, ErrorInfo::new("Dynamic property on a closed type"));
    map.insert(213, ErrorInfo::new("Operation result is not composable"));
    map.insert(214, ErrorInfo::new("Key value names do not match key properties"));

    // Coercion errors (0300-0399)
    map.insert(300, ErrorInfo::new("Cannot convert literal to expected type"));
    map.insert(301, ErrorInfo::new("Null not allowed"));
    map.insert(302, ErrorInfo::new("Typed null incompatible with expected type"));
    map.insert(303, ErrorInfo::new("Incompatible operand types"));
    map.insert(304, ErrorInfo::new("Operand must be Boolean"));
    map.insert(305, ErrorInfo::new("Numeric value out of range"));

    // Binding errors (0400-0499)
    map.insert(400, ErrorInfo::new("Unknown parameter"));
    map.insert(401, ErrorInfo::new("Missing required parameter"));
    map.insert(402, ErrorInfo::new("Duplicate parameter"));
    map.insert(403, ErrorInfo::new("Invalid argument count"));
    map.insert(404, ErrorInfo::new("No matching overload"));
    map.insert(405, ErrorInfo::new("Binding parameter supplied as argument"));

    // Limit violations (0500-0599)
    map.insert(500, ErrorInfo::new("Too many path segments"));
    map.insert(501, ErrorInfo::new("Expand depth exceeded"));
    map.insert(502, ErrorInfo::new("Expand count exceeded"));
    map.insert(503, ErrorInfo::new("Lambda nesting depth exceeded"));
    map.insert(504, ErrorInfo::new("Invalid settings"));

    map
});

// Syntax errors
pub const OD0001: ErrorCode = ErrorCode::new(1);
pub const OD0002: ErrorCode = ErrorCode::new(2);
pub const OD0003: ErrorCode = ErrorCode::new(3);
pub const OD0004: ErrorCode = ErrorCode::new(4);
pub const OD0005: ErrorCode = ErrorCode::new(5);
pub const OD0006: ErrorCode = ErrorCode::new(6);
pub const OD0007: ErrorCode = ErrorCode::new(7);
pub const OD0008: ErrorCode = ErrorCode::new(8);
pub const OD0009: ErrorCode = ErrorCode::new(9);
pub const OD0010: ErrorCode = ErrorCode::new(10);
pub const OD0011: ErrorCode = ErrorCode::new(11);
pub const OD0012: ErrorCode = ErrorCode::new(12);

// Resolution errors
pub const OD0100: ErrorCode = ErrorCode::new(100);
pub const OD0101: ErrorCode = ErrorCode::new(101);
pub const OD0102: ErrorCode = ErrorCode::new(102);
pub const OD0103: ErrorCode = ErrorCode::new(103);
pub const OD0104: ErrorCode = ErrorCode::new(104);
pub const OD0105: ErrorCode = ErrorCode::new(105);
pub const OD0106: ErrorCode = ErrorCode::new(106);
pub const OD0107: ErrorCode = ErrorCode::new(107);
pub const OD0110: ErrorCode = ErrorCode::new(110);
pub const OD0111: ErrorCode = ErrorCode::new(111);
pub const OD0112: ErrorCode = ErrorCode::new(112);
pub const OD0113: ErrorCode = ErrorCode::new(113);
pub const OD0114: ErrorCode = ErrorCode::new(114);

// Structural violations
pub const OD0200: ErrorCode = ErrorCode::new(200);
pub const OD0201: ErrorCode = ErrorCode::new(201);
pub const OD0202: ErrorCode = ErrorCode::new(202);
pub const OD0203: ErrorCode = ErrorCode::new(203);
pub const OD0204: ErrorCode = ErrorCode::new(204);
pub const OD0205: ErrorCode = ErrorCode::new(205);
pub const OD0206: ErrorCode = ErrorCode::new(206);
pub const OD0207: ErrorCode = ErrorCode::new(207);
pub const OD0208: ErrorCode = ErrorCode::new(208);
pub const OD0209: ErrorCode = ErrorCode::new(209);
pub const OD0210: ErrorCode = ErrorCode::new(210);
pub const OD0211: ErrorCode = ErrorCode::new(211);
pub const OD0212: ErrorCode = ErrorCode::new(212);
pub const OD0213: ErrorCode = ErrorCode::new(213);
pub const OD0214: ErrorCode = ErrorCode::new(214);

// Coercion errors
pub const OD0300: ErrorCode = ErrorCode::new(300);
pub const OD0301: ErrorCode = ErrorCode::new(301);
pub const OD0302: ErrorCode = ErrorCode::new(302);
pub const OD0303: ErrorCode = ErrorCode::new(303);
pub const OD0304: ErrorCode = ErrorCode::new(304);
pub const OD0305: ErrorCode = ErrorCode::new(305);

// Binding errors
pub const OD0400: ErrorCode = ErrorCode::new(400);
pub const OD0401: ErrorCode = ErrorCode::new(401);
pub const OD0402: ErrorCode = ErrorCode::new(402);
pub const OD0403: ErrorCode = ErrorCode::new(403);
pub const OD0404: ErrorCode = ErrorCode::new(404);
pub const OD0405: ErrorCode = ErrorCode::new(405);

// Limit violations
pub const OD0500: ErrorCode = ErrorCode::new(500);
pub const OD0501: ErrorCode = ErrorCode::new(501);
pub const OD0502: ErrorCode = ErrorCode::new(502);
pub const OD0503: ErrorCode = ErrorCode::new(503);
pub const OD0504: ErrorCode = ErrorCode::new(504);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(OD0001.to_string(), "OD0001");
        assert_eq!(OD0201.to_string(), "OD0201");
    }

    #[test]
    fn test_error_categories() {
        assert!(OD0004.is_syntax_error());
        assert!(!OD0004.is_resolution_error());

        assert!(OD0101.is_resolution_error());
        assert!(!OD0101.is_ambiguity());
        assert!(OD0111.is_ambiguity());

        assert!(OD0201.is_structural_error());
        assert!(OD0300.is_coercion_error());
        assert!(OD0400.is_binding_error());
        assert!(OD0501.is_limit_error());
    }

    #[test]
    fn test_error_info() {
        assert_eq!(OD0201.info().description, "Key count mismatch");
        assert_eq!(ErrorCode::new(999).info().description, "Unknown error");
    }
}
