//! Raw resource path segments
//!
//! A raw segment is an identifier with an optional parenthetical
//! (`Customers(1)`, `Ns.Fn(x=1)`) or a `$`-prefixed system segment. Nothing
//! here knows the schema; the walker decides what each segment means.

use odata_uri_diagnostics::{
    ErrorBuilder, OD0001, OD0002, OD0003, OD0011, OD0012, Result, SourceLocation, Span,
};
use smallvec::SmallVec;
use std::fmt;

/// `$`-prefixed path segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemSegment {
    Count,
    Value,
    Ref,
    Batch,
    Metadata,
    Entity,
    Each,
}

impl SystemSegment {
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Some(match identifier {
            "$count" => Self::Count,
            "$value" => Self::Value,
            "$ref" => Self::Ref,
            "$batch" => Self::Batch,
            "$metadata" => Self::Metadata,
            "$entity" => Self::Entity,
            "$each" => Self::Each,
            _ => return None,
        })
    }

    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Count => "$count",
            Self::Value => "$value",
            Self::Ref => "$ref",
            Self::Batch => "$batch",
            Self::Metadata => "$metadata",
            Self::Entity => "$entity",
            Self::Each => "$each",
        }
    }
}

/// One `name=value` or positional item of a parenthetical
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParenArg {
    pub name: Option<String>,
    /// Raw literal text
    pub value: String,
}

impl ParenArg {
    pub fn positional(value: impl Into<String>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }
}

pub type ParenArgs = SmallVec<[ParenArg; 2]>;

/// A single raw path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegment {
    pub identifier: String,
    /// Text between the parentheses, if any
    pub parenthetical: Option<String>,
    pub span: Span,
}

impl RawSegment {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            parenthetical: None,
            span: Span::default(),
        }
    }

    /// Segment with a parenthetical, e.g. `with_parens("Customers", "1")`
    pub fn with_parens(identifier: impl Into<String>, parenthetical: impl Into<String>) -> Self {
        Self {
            parenthetical: Some(parenthetical.into()),
            ..Self::new(identifier)
        }
    }

    pub fn system(&self) -> Option<SystemSegment> {
        SystemSegment::from_identifier(&self.identifier)
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::from(self.span)
    }

    /// Split the parenthetical into arguments; no parenthetical means none
    pub fn arguments(&self) -> Result<ParenArgs> {
        match &self.parenthetical {
            Some(text) => split_arguments(text).map_err(|e| e.or_location(self.location())),
            None => Ok(ParenArgs::new()),
        }
    }
}

impl fmt::Display for RawSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)?;
        if let Some(parens) = &self.parenthetical {
            write!(f, "({})", parens)?;
        }
        Ok(())
    }
}

/// Ordered raw segments of a resource path
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawPath {
    pub segments: Vec<RawSegment>,
}

impl RawPath {
    pub fn new(segments: Vec<RawSegment>) -> Self {
        Self { segments }
    }

    /// Split path text (`/Customers(1)/Orders`) into raw segments.
    ///
    /// Slashes inside quotes or parentheses do not split.
    pub fn parse(text: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut start = 0usize;
        let mut depth = 0usize;
        let mut in_quote = false;

        for (idx, c) in text.char_indices() {
            match c {
                '\'' => in_quote = !in_quote,
                '(' if !in_quote => depth += 1,
                ')' if !in_quote => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        ErrorBuilder::new(OD0002, "Unbalanced ')' in path")
                            .at(Span::point(idx))
                            .syntax(text)
                    })?;
                }
                '/' if !in_quote && depth == 0 => {
                    if idx > start || idx > 0 {
                        segments.push(parse_segment(text, Span::new(start, idx))?);
                    }
                    start = idx + 1;
                }
                _ => {}
            }
        }
        if in_quote || depth > 0 {
            return Err(ErrorBuilder::new(OD0002, "Unterminated quote or parenthesis in path")
                .at(Span::new(start, text.len()))
                .syntax(text));
        }
        if start < text.len() {
            segments.push(parse_segment(text, Span::new(start, text.len()))?);
        }
        Ok(Self { segments })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawSegment> {
        self.segments.iter()
    }
}

impl<'a> IntoIterator for &'a RawPath {
    type Item = &'a RawSegment;
    type IntoIter = std::slice::Iter<'a, RawSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

impl fmt::Display for RawPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

fn parse_segment(text: &str, span: Span) -> Result<RawSegment> {
    let raw = span.slice(text).unwrap_or_default();
    let location = SourceLocation::from(span);
    let (identifier, parenthetical) = match raw.find('(') {
        Some(open) => {
            let inner = raw[open + 1..].strip_suffix(')').ok_or_else(|| {
                ErrorBuilder::new(OD0001, format!("Unexpected text after ')' in segment '{}'", raw))
                    .at(location.clone())
                    .syntax(raw)
            })?;
            (&raw[..open], Some(inner.to_string()))
        }
        None => (raw, None),
    };
    if identifier.is_empty() {
        return Err(ErrorBuilder::new(OD0011, "Path segment has no identifier")
            .at(location)
            .syntax(raw));
    }
    if !identifier
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '$' | '-' | '*'))
    {
        return Err(ErrorBuilder::new(OD0001, format!("Malformed path segment '{}'", raw))
            .at(location)
            .syntax(raw));
    }
    Ok(RawSegment {
        identifier: identifier.to_string(),
        parenthetical,
        span,
    })
}

/// Split `1`, `Id=1,Name='x'` or `a=(1,2)` into arguments.
///
/// Items are either all positional or all named, and names are unique.
pub fn split_arguments(text: &str) -> Result<ParenArgs> {
    let mut args = ParenArgs::new();
    if text.trim().is_empty() {
        return Ok(args);
    }

    let mut items = Vec::new();
    let mut start = 0usize;
    let mut depth = 0usize;
    let mut in_quote = false;
    for (idx, c) in text.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' | '[' | '{' if !in_quote => depth += 1,
            ')' | ']' | '}' if !in_quote => depth = depth.saturating_sub(1),
            ',' if !in_quote && depth == 0 => {
                items.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if in_quote {
        return Err(ErrorBuilder::new(OD0002, "Unterminated string in argument list").syntax(text));
    }
    items.push(&text[start..]);

    for item in items {
        let arg = match split_name_value(item) {
            Some((name, value)) => ParenArg::named(name.trim(), value.trim()),
            None => ParenArg::positional(item.trim()),
        };
        if arg.value.is_empty() || arg.name.as_deref().is_some_and(str::is_empty) {
            return Err(ErrorBuilder::new(OD0003, format!("Empty argument in '({})'", text)).syntax(text));
        }
        args.push(arg);
    }

    let named = args.iter().filter(|a| a.name.is_some()).count();
    if named != 0 && named != args.len() {
        return Err(ErrorBuilder::new(
            OD0003,
            format!("Argument list '({})' mixes named and positional values", text),
        )
        .syntax(text));
    }
    for (idx, arg) in args.iter().enumerate() {
        if let Some(name) = &arg.name {
            if args[..idx].iter().any(|prev| prev.name.as_ref() == Some(name)) {
                return Err(ErrorBuilder::new(OD0012, format!("Duplicate argument name '{}'", name))
                    .syntax(text));
            }
        }
    }
    Ok(args)
}

/// `name=value` where `=` is outside quotes; `None` for positional values
fn split_name_value(item: &str) -> Option<(&str, &str)> {
    let mut in_quote = false;
    for (idx, c) in item.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '=' if !in_quote => {
                let name = item[..idx].trim();
                let is_identifier = name
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_');
                return is_identifier.then(|| (&item[..idx], &item[idx + 1..]));
            }
            _ => {}
        }
    }
    None
}
