//! URL literal text codec
//!
//! Parsing infers the most natural type from the text alone; conversion to
//! an expected schema type happens in [`from_literal_text`].

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat};
use odata_uri_diagnostics::{
    OD0004, OD0005, OD0006, OD0007, OD0008, OD0009, OD0010, Result, UriError,
};
use odata_uri_schema::{Schema, TypeReference};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Coercer, DurationValue, EnumValue, LiteralValue, PrimitiveValue, ProtocolVersion};

static DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d{4,}-\d{2}-\d{2}$").expect("valid regex"));
static DATE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{4,}-\d{2}-\d{2}T\d{2}:\d{2}").expect("valid regex"));
static TIME_OF_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}(:\d{2}(\.\d{1,12})?)?$").expect("valid regex"));
static GUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$")
        .expect("valid regex")
});
static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-)?P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("valid regex")
});
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+)(\.\d+)?([eE][+-]?\d+)?([mMdDfFlL])?$").expect("valid regex")
});
static ENUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)+)'(.*)'$").expect("valid regex")
});

/// Parse URL literal text without an expected type
pub fn parse_literal(text: &str, version: ProtocolVersion) -> Result<LiteralValue> {
    let text = text.trim();
    if text.is_empty() {
        return Err(UriError::syntax(OD0004, "Empty literal", text));
    }

    match text {
        "null" => return Ok(LiteralValue::null()),
        "true" => return Ok(LiteralValue::boolean(true)),
        "false" => return Ok(LiteralValue::boolean(false)),
        "INF" => return Ok(PrimitiveValue::Double(f64::INFINITY).into()),
        "-INF" => return Ok(PrimitiveValue::Double(f64::NEG_INFINITY).into()),
        "NaN" => return Ok(PrimitiveValue::Double(f64::NAN).into()),
        _ => {}
    }

    if text.starts_with('\'') {
        return parse_string(text).map(LiteralValue::string);
    }
    if let Some(body) = quoted_body(text, "duration") {
        return parse_duration(body?).map(|d| PrimitiveValue::Duration(d).into());
    }
    if let Some(body) = quoted_body(text, "binary") {
        return parse_binary(body?).map(|b| PrimitiveValue::Binary(b).into());
    }
    if let Some(captures) = ENUM.captures(text) {
        let type_name = captures[1].to_string();
        let members = captures[2]
            .split(',')
            .map(|m| m.trim().to_string())
            .collect::<Vec<_>>();
        if members.iter().any(String::is_empty) {
            return Err(UriError::syntax(OD0004, "Empty enum member", text));
        }
        return Ok(LiteralValue::Enum(EnumValue {
            type_name,
            members,
            value: None,
        }));
    }
    if GUID.is_match(text) {
        return Uuid::parse_str(text)
            .map(|g| PrimitiveValue::Guid(g).into())
            .map_err(|e| UriError::syntax(OD0008, format!("Invalid GUID: {}", e), text));
    }
    if DATE.is_match(text) {
        return NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(|d| PrimitiveValue::Date(d).into())
            .map_err(|e| UriError::syntax(OD0007, format!("Invalid date: {}", e), text));
    }
    if DATE_TIME.is_match(text) {
        return parse_date_time_offset(text).map(Into::into);
    }
    if TIME_OF_DAY.is_match(text) {
        return parse_time_of_day(text).map(Into::into);
    }
    if version.bare_durations() && DURATION.is_match(text) {
        return parse_duration(text).map(|d| PrimitiveValue::Duration(d).into());
    }
    if NUMBER.is_match(text) {
        return parse_number(text).map(Into::into);
    }

    Err(UriError::syntax(OD0004, "Unrecognized literal", text))
}

/// `prefix'body'` → `Some(Ok(body))`; unterminated quote → `Some(Err)`
fn quoted_body<'a>(text: &'a str, prefix: &str) -> Option<Result<&'a str>> {
    let rest = text
        .get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .and_then(|_| text[prefix.len()..].strip_prefix('\''))?;
    Some(rest.strip_suffix('\'').ok_or_else(|| {
        UriError::syntax(OD0005, "Unterminated quoted literal", text)
    }))
}

fn parse_string(text: &str) -> Result<String> {
    let body = text
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .filter(|_| text.len() >= 2)
        .ok_or_else(|| UriError::syntax(OD0005, "Unterminated string literal", text))?;

    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            } else {
                return Err(UriError::syntax(
                    OD0005,
                    "Unescaped quote in string literal",
                    text,
                ));
            }
        }
        result.push(c);
    }
    Ok(result)
}

fn parse_number(text: &str) -> Result<PrimitiveValue> {
    let invalid = |kind: &str| UriError::syntax(OD0006, format!("Invalid {} literal", kind), text);
    let (digits, suffix) = match text.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&text[..idx], Some(c.to_ascii_uppercase())),
        _ => (text, None),
    };
    let is_fraction = digits.contains('.');
    let is_exponent = digits.contains(['e', 'E']);

    match suffix {
        Some('L') if !is_fraction && !is_exponent => {
            digits.parse().map(PrimitiveValue::Int64).map_err(|_| invalid("Int64"))
        }
        Some('M') => Decimal::from_str(digits)
            .or_else(|_| Decimal::from_scientific(digits))
            .map(PrimitiveValue::Decimal)
            .map_err(|_| invalid("Decimal")),
        Some('D') => digits.parse().map(PrimitiveValue::Double).map_err(|_| invalid("Double")),
        Some('F') => digits.parse().map(PrimitiveValue::Single).map_err(|_| invalid("Single")),
        Some(_) => Err(invalid("numeric")),
        None if is_exponent => {
            digits.parse().map(PrimitiveValue::Double).map_err(|_| invalid("Double"))
        }
        None if is_fraction => Decimal::from_str(digits)
            .map(PrimitiveValue::Decimal)
            .or_else(|_| digits.parse().map(PrimitiveValue::Double))
            .map_err(|_| invalid("Decimal")),
        None => {
            if let Ok(v) = digits.parse::<i32>() {
                Ok(PrimitiveValue::Int32(v))
            } else if let Ok(v) = digits.parse::<i64>() {
                Ok(PrimitiveValue::Int64(v))
            } else {
                Decimal::from_str(digits)
                    .map(PrimitiveValue::Decimal)
                    .map_err(|_| invalid("integer"))
            }
        }
    }
}

fn parse_date_time_offset(text: &str) -> Result<PrimitiveValue> {
    let normalized = match text.strip_suffix(['Z', 'z']) {
        Some(head) => format!("{}+00:00", head),
        None => text.to_string(),
    };
    DateTime::parse_from_rfc3339(&normalized)
        .or_else(|_| DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z"))
        .map(PrimitiveValue::DateTimeOffset)
        .map_err(|e| UriError::syntax(OD0007, format!("Invalid DateTimeOffset: {}", e), text))
}

fn parse_time_of_day(text: &str) -> Result<PrimitiveValue> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map(PrimitiveValue::TimeOfDay)
        .map_err(|e| UriError::syntax(OD0007, format!("Invalid TimeOfDay: {}", e), text))
}

/// Parse an ISO 8601 day-time duration (`P1DT2H`, `-PT0.5S`)
pub fn parse_duration(text: &str) -> Result<DurationValue> {
    let invalid = || UriError::syntax(OD0010, "Invalid duration", text);
    let captures = DURATION.captures(text).ok_or_else(invalid)?;
    if text.ends_with('P') || text.ends_with('T') {
        return Err(invalid());
    }
    let number = |idx: usize| -> Result<u64> {
        captures
            .get(idx)
            .map(|m| m.as_str().parse::<u64>().map_err(|_| invalid()))
            .transpose()
            .map(Option::unwrap_or_default)
    };
    let seconds = captures
        .get(5)
        .map(|m| Decimal::from_str(m.as_str()).map_err(|_| invalid()))
        .transpose()?
        .unwrap_or_default();
    Ok(DurationValue {
        negative: captures.get(1).is_some(),
        days: number(2)?,
        hours: number(3)?,
        minutes: number(4)?,
        seconds,
    })
}

fn parse_binary(body: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(body.trim_end_matches('='))
        .map_err(|e| UriError::syntax(OD0009, format!("Invalid base64url binary: {}", e), body))
}

/// Parse literal text and convert it to the expected type
pub fn from_literal_text(
    text: &str,
    expected: &TypeReference,
    schema: &Schema,
    version: ProtocolVersion,
) -> Result<LiteralValue> {
    let parsed = parse_literal(text, version)?;
    Coercer::new().coerce_literal(parsed, expected, schema)
}

/// Format a literal as URL text
pub fn to_literal_text(value: &LiteralValue, version: ProtocolVersion) -> String {
    match value {
        LiteralValue::Null { .. } => "null".to_string(),
        LiteralValue::Enum(e) => format!("{}'{}'", e.type_name, e.members.join(",")),
        LiteralValue::Primitive(p) => primitive_text(p, version),
    }
}

fn primitive_text(value: &PrimitiveValue, version: ProtocolVersion) -> String {
    match value {
        PrimitiveValue::Binary(bytes) => format!("binary'{}'", URL_SAFE.encode(bytes)),
        PrimitiveValue::Boolean(b) => b.to_string(),
        PrimitiveValue::Byte(v) => v.to_string(),
        PrimitiveValue::SByte(v) => v.to_string(),
        PrimitiveValue::Int16(v) => v.to_string(),
        PrimitiveValue::Int32(v) => v.to_string(),
        PrimitiveValue::Int64(v) => v.to_string(),
        PrimitiveValue::Decimal(d) => d.to_string(),
        PrimitiveValue::Double(d) => float_text(*d, format!("{:?}", d)),
        PrimitiveValue::Single(s) => float_text(f64::from(*s), format!("{:?}f", s)),
        PrimitiveValue::String(s) => format!("'{}'", s.replace('\'', "''")),
        PrimitiveValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        PrimitiveValue::DateTimeOffset(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        PrimitiveValue::TimeOfDay(t) => t.format("%H:%M:%S%.f").to_string(),
        PrimitiveValue::Guid(g) => g.hyphenated().to_string(),
        PrimitiveValue::Duration(d) if version.bare_durations() => d.to_string(),
        PrimitiveValue::Duration(d) => format!("duration'{}'", d),
    }
}

// `finite` is the Debug form, which keeps a fraction or exponent
fn float_text(value: f64, finite: String) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        finite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_uri_schema::PrimitiveKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(text: &str) -> LiteralValue {
        parse_literal(text, ProtocolVersion::V4).unwrap()
    }

    #[rstest]
    #[case("42", PrimitiveKind::Int32)]
    #[case("3000000000", PrimitiveKind::Int64)]
    #[case("42L", PrimitiveKind::Int64)]
    #[case("1.5", PrimitiveKind::Decimal)]
    #[case("1.5M", PrimitiveKind::Decimal)]
    #[case("1.5d", PrimitiveKind::Double)]
    #[case("1e10", PrimitiveKind::Double)]
    #[case("2.5f", PrimitiveKind::Single)]
    #[case("INF", PrimitiveKind::Double)]
    #[case("'abc'", PrimitiveKind::String)]
    #[case("2024-01-31", PrimitiveKind::Date)]
    #[case("2024-01-31T10:00:00Z", PrimitiveKind::DateTimeOffset)]
    #[case("2024-01-31T10:00+02:00", PrimitiveKind::DateTimeOffset)]
    #[case("10:20:30.5", PrimitiveKind::TimeOfDay)]
    #[case("duration'P1DT2H'", PrimitiveKind::Duration)]
    #[case("01234567-89ab-cdef-0123-456789abcdef", PrimitiveKind::Guid)]
    #[case("binary'AQID'", PrimitiveKind::Binary)]
    #[case("true", PrimitiveKind::Boolean)]
    fn test_inferred_kinds(#[case] text: &str, #[case] kind: PrimitiveKind) {
        assert_eq!(parse(text).primitive_kind(), Some(kind));
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(parse("'O''Neil'"), LiteralValue::string("O'Neil"));
        assert_eq!(parse("''"), LiteralValue::string(""));
        let err = parse_literal("'abc", ProtocolVersion::V4).unwrap_err();
        assert_eq!(err.code(), OD0005);
        let err = parse_literal("'a'b'", ProtocolVersion::V4).unwrap_err();
        assert_eq!(err.code(), OD0005);
    }

    #[test]
    fn test_enum_literal() {
        match parse("Ns.Access'Read, Write'") {
            LiteralValue::Enum(e) => {
                assert_eq!(e.type_name, "Ns.Access");
                assert_eq!(e.members, vec!["Read", "Write"]);
                assert_eq!(e.value, None);
            }
            other => panic!("expected enum literal, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_duration_depends_on_version() {
        assert!(parse_literal("P1D", ProtocolVersion::V4).is_err());
        let value = parse_literal("P1D", ProtocolVersion::V401).unwrap();
        assert_eq!(value.primitive_kind(), Some(PrimitiveKind::Duration));
        assert_eq!(value.to_literal_text(ProtocolVersion::V401), "P1D");
        assert_eq!(value.to_literal_text(ProtocolVersion::V4), "duration'P1D'");
    }

    #[rstest]
    #[case("duration'P'", OD0010)]
    #[case("duration'PT'", OD0010)]
    #[case("duration'P1D", OD0005)]
    #[case("binary'!!'", OD0009)]
    #[case("2024-13-40", OD0007)]
    #[case("12abc", OD0004)]
    #[case("", OD0004)]
    fn test_invalid_literals(#[case] text: &str, #[case] code: odata_uri_diagnostics::ErrorCode) {
        let err = parse_literal(text, ProtocolVersion::V4).unwrap_err();
        assert_eq!(err.code(), code);
    }

    #[rstest]
    #[case(PrimitiveValue::Int64(42), "42")]
    #[case(PrimitiveValue::Double(5.0), "5.0")]
    #[case(PrimitiveValue::Double(f64::NEG_INFINITY), "-INF")]
    #[case(PrimitiveValue::Single(2.5), "2.5f")]
    #[case(PrimitiveValue::String("it's".into()), "'it''s'")]
    #[case(PrimitiveValue::Binary(vec![1, 2, 3]), "binary'AQID'")]
    #[case(PrimitiveValue::TimeOfDay(NaiveTime::from_hms_opt(10, 20, 30).unwrap()), "10:20:30")]
    fn test_literal_text(#[case] value: PrimitiveValue, #[case] expected: &str) {
        assert_eq!(LiteralValue::from(value).to_literal_text(ProtocolVersion::V4), expected);
    }

    #[test]
    fn test_date_time_offset_text() {
        let value = parse("2024-01-31T10:00:00Z");
        assert_eq!(value.to_literal_text(ProtocolVersion::V4), "2024-01-31T10:00:00Z");
        let shifted = parse("2024-01-31T10:00:00.5+02:00");
        assert_eq!(shifted.to_literal_text(ProtocolVersion::V4), "2024-01-31T10:00:00.500+02:00");
    }
}
