//! Literal values as they appear in URLs
//!
//! A [`LiteralValue`] is what a key predicate, function argument or
//! expression constant denotes: a primitive value, an enum value or a
//! (possibly typed) null.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use odata_uri_schema::PrimitiveKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ProtocolVersion;

/// A value of an `Edm` primitive type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PrimitiveValue {
    Binary(Vec<u8>),
    Boolean(bool),
    Byte(u8),
    Date(NaiveDate),
    DateTimeOffset(DateTime<FixedOffset>),
    Decimal(Decimal),
    Double(f64),
    Duration(DurationValue),
    Guid(Uuid),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    SByte(i8),
    Single(f32),
    String(String),
    TimeOfDay(NaiveTime),
}

impl PrimitiveValue {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Binary(_) => PrimitiveKind::Binary,
            Self::Boolean(_) => PrimitiveKind::Boolean,
            Self::Byte(_) => PrimitiveKind::Byte,
            Self::Date(_) => PrimitiveKind::Date,
            Self::DateTimeOffset(_) => PrimitiveKind::DateTimeOffset,
            Self::Decimal(_) => PrimitiveKind::Decimal,
            Self::Double(_) => PrimitiveKind::Double,
            Self::Duration(_) => PrimitiveKind::Duration,
            Self::Guid(_) => PrimitiveKind::Guid,
            Self::Int16(_) => PrimitiveKind::Int16,
            Self::Int32(_) => PrimitiveKind::Int32,
            Self::Int64(_) => PrimitiveKind::Int64,
            Self::SByte(_) => PrimitiveKind::SByte,
            Self::Single(_) => PrimitiveKind::Single,
            Self::String(_) => PrimitiveKind::String,
            Self::TimeOfDay(_) => PrimitiveKind::TimeOfDay,
        }
    }

    /// Integral value widened to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Byte(v) => Some(i64::from(*v)),
            Self::SByte(v) => Some(i64::from(*v)),
            Self::Int16(v) => Some(i64::from(*v)),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// An `Edm.Duration` in ISO 8601 day-time form (`P1DT2H30M`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DurationValue {
    pub negative: bool,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: Decimal,
}

impl DurationValue {
    /// Signed length in seconds, or `None` if it does not fit
    pub fn total_seconds(&self) -> Option<Decimal> {
        let whole = self
            .days
            .checked_mul(86_400)?
            .checked_add(self.hours.checked_mul(3_600)?)?
            .checked_add(self.minutes.checked_mul(60)?)?;
        let total = Decimal::from(whole).checked_add(self.seconds)?;
        Some(if self.negative { -total } else { total })
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str("P")?;
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        let has_time = self.hours > 0 || self.minutes > 0 || !self.seconds.is_zero();
        if has_time || self.days == 0 {
            f.write_str("T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if !self.seconds.is_zero() || !has_time {
                write!(f, "{}S", self.seconds.normalize())?;
            }
        }
        Ok(())
    }
}

/// An enum literal: `Ns.Color'Red'` or, for flags, `Ns.Access'Read,Write'`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    /// Qualified enum type name as written
    pub type_name: String,
    pub members: Vec<String>,
    /// Underlying value, known once bound to the enum definition
    pub value: Option<i64>,
}

/// A literal denoted by URL text or an expression constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    /// `null`, optionally carrying an explicit type name
    Null { type_name: Option<String> },
    Primitive(PrimitiveValue),
    Enum(EnumValue),
}

impl LiteralValue {
    pub fn null() -> Self {
        Self::Null { type_name: None }
    }

    pub fn typed_null(type_name: impl Into<String>) -> Self {
        Self::Null {
            type_name: Some(type_name.into()),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Primitive(PrimitiveValue::String(value.into()))
    }

    pub fn int32(value: i32) -> Self {
        Self::Primitive(PrimitiveValue::Int32(value))
    }

    pub fn int64(value: i64) -> Self {
        Self::Primitive(PrimitiveValue::Int64(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::Primitive(PrimitiveValue::Boolean(value))
    }

    pub fn decimal(value: Decimal) -> Self {
        Self::Primitive(PrimitiveValue::Decimal(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null { .. })
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Self::Primitive(value) => Some(value),
            _ => None,
        }
    }

    /// Primitive kind of the value; `None` for nulls and enums
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        self.as_primitive().map(PrimitiveValue::kind)
    }

    /// Format as URL literal text for the given protocol version
    pub fn to_literal_text(&self, version: ProtocolVersion) -> String {
        crate::text::to_literal_text(self, version)
    }
}

impl From<PrimitiveValue> for LiteralValue {
    fn from(value: PrimitiveValue) -> Self {
        Self::Primitive(value)
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal_text(ProtocolVersion::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_display() {
        let duration = DurationValue {
            days: 1,
            hours: 2,
            ..DurationValue::default()
        };
        assert_eq!(duration.to_string(), "P1DT2H");
        assert_eq!(DurationValue::default().to_string(), "PT0S");
        let negative = DurationValue {
            negative: true,
            seconds: Decimal::new(15, 1),
            ..DurationValue::default()
        };
        assert_eq!(negative.to_string(), "-PT1.5S");
    }

    #[test]
    fn test_total_seconds() {
        let duration = DurationValue {
            negative: true,
            minutes: 1,
            seconds: Decimal::from(30),
            ..DurationValue::default()
        };
        assert_eq!(duration.total_seconds(), Some(Decimal::from(-90)));
    }

    #[test]
    fn test_total_seconds_out_of_range() {
        let days = DurationValue {
            days: u64::MAX / 1_000,
            ..DurationValue::default()
        };
        assert_eq!(days.total_seconds(), None);

        let hours = DurationValue {
            days: 1,
            hours: u64::MAX / 3_600,
            minutes: 1,
            ..DurationValue::default()
        };
        assert_eq!(hours.total_seconds(), None);
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(PrimitiveValue::Byte(1).kind(), PrimitiveKind::Byte);
        assert_eq!(PrimitiveValue::SByte(-1).as_i64(), Some(-1));
        assert_eq!(LiteralValue::int32(3).primitive_kind(), Some(PrimitiveKind::Int32));
        assert!(LiteralValue::typed_null("Edm.Int32").is_null());
    }
}
