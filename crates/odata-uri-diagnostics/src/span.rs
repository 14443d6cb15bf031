//! Positions within raw request text
//!
//! Paths and option values are single-line, so a location is a byte span
//! plus the 1-based column it starts at.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Byte range `start..end` in a request path or option value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span before byte `at`
    pub const fn point(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The covered text, or `None` if the span does not fall on char
    /// boundaries of `text`
    pub fn slice<'t>(&self, text: &'t str) -> Option<&'t str> {
        text.get(self.start..self.end)
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Where a diagnostic points, reported as `line:column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Always 1 for request text
    pub line: usize,
    /// 1-based column of the first byte
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

impl SourceLocation {
    pub const fn new(line: usize, column: usize, offset: usize, length: usize) -> Self {
        Self {
            line,
            column,
            offset,
            length,
        }
    }

    pub const fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.length)
    }
}

impl From<Span> for SourceLocation {
    fn from(span: Span) -> Self {
        Self::new(1, span.start + 1, span.start, span.len())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_span() {
        let loc = SourceLocation::from(Span::new(10, 13));
        assert_eq!(loc.to_string(), "1:11");
        assert_eq!(loc.span(), Span::new(10, 13));
    }

    #[test]
    fn test_slice_respects_char_boundaries() {
        let text = "/Städte(1)";
        assert_eq!(Span::new(1, 4).slice(text), Some("Stä"));
        assert_eq!(Span::new(1, 3).slice(text), None);
        assert!(Span::point(3).is_empty());
    }
}
