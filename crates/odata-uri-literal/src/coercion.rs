//! Primitive type coercion rules
//!
//! Numeric coercion follows a directed widening table:
//! - `SByte`/`Byte` → `Int16` → `Int32` → `Int64` → `Single` → `Double`
//! - any numeric → `Decimal` (floating values via round-trip text)
//!
//! Temporal coercion covers `Date` ↔ `DateTimeOffset` and `String` ↔ `Date`.
//! Literal constants are converted more leniently than values: an integral
//! literal may narrow when it fits the target range.

use chrono::{NaiveDate, NaiveTime};
use odata_uri_diagnostics::{OD0106, OD0300, OD0301, OD0302, OD0305, Result, UriError};
use odata_uri_schema::{PrimitiveKind, Schema, SchemaType, TypeReference};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

use crate::{EnumValue, LiteralValue, PrimitiveValue};

/// Position in the widening chain; `None` for `Decimal` and non-numerics
fn chain_rank(kind: PrimitiveKind) -> Option<u32> {
    match kind {
        PrimitiveKind::SByte | PrimitiveKind::Byte => Some(0),
        PrimitiveKind::Int16 => Some(1),
        PrimitiveKind::Int32 => Some(2),
        PrimitiveKind::Int64 => Some(3),
        PrimitiveKind::Single => Some(4),
        PrimitiveKind::Double => Some(5),
        _ => None,
    }
}

const CHAIN: [PrimitiveKind; 5] = [
    PrimitiveKind::Int16,
    PrimitiveKind::Int32,
    PrimitiveKind::Int64,
    PrimitiveKind::Single,
    PrimitiveKind::Double,
];

/// Primitive coercion rules
#[derive(Debug, Clone, Copy, Default)]
pub struct Coercer;

impl Coercer {
    pub fn new() -> Self {
        Self
    }

    /// Check whether a value of `from` may be used where `to` is expected
    pub fn can_implicitly_convert(&self, from: PrimitiveKind, to: PrimitiveKind) -> bool {
        if from == to {
            return true;
        }
        match (from, to) {
            (_, PrimitiveKind::Decimal) => from.is_numeric(),
            (PrimitiveKind::Date, PrimitiveKind::DateTimeOffset) => true,
            _ => match (chain_rank(from), chain_rank(to)) {
                (Some(f), Some(t)) => t > f,
                _ => false,
            },
        }
    }

    /// Sequence of kinds a widening passes through
    pub fn promotion_path(&self, from: PrimitiveKind, to: PrimitiveKind) -> Option<Vec<PrimitiveKind>> {
        if from == to {
            return Some(vec![from]);
        }
        if !self.can_implicitly_convert(from, to) {
            return None;
        }
        match (chain_rank(from), chain_rank(to)) {
            (Some(f), Some(t)) => {
                let mut path = vec![from];
                path.extend(CHAIN.iter().copied().filter(|kind| {
                    chain_rank(*kind).is_some_and(|rank| rank > f && rank <= t)
                }));
                Some(path)
            }
            _ => Some(vec![from, to]),
        }
    }

    /// Cost of an implicit conversion; lower is preferred. Used to rank
    /// function overloads.
    pub fn conversion_cost(&self, from: PrimitiveKind, to: PrimitiveKind) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        if !self.can_implicitly_convert(from, to) {
            return None;
        }
        match (chain_rank(from), chain_rank(to)) {
            (Some(f), Some(t)) => Some(t - f),
            // Decimal ranks after Int64 for integral sources
            (Some(f), None) if to == PrimitiveKind::Decimal => Some(if f <= 3 { 4 - f } else { 10 }),
            _ => Some(5),
        }
    }

    /// Smallest kind both operands convert to
    pub fn common_type(&self, a: PrimitiveKind, b: PrimitiveKind) -> Option<PrimitiveKind> {
        if self.can_implicitly_convert(a, b) {
            return Some(b);
        }
        if self.can_implicitly_convert(b, a) {
            return Some(a);
        }
        match (chain_rank(a), chain_rank(b)) {
            // SByte vs Byte
            (Some(x), Some(y)) => CHAIN
                .iter()
                .copied()
                .find(|kind| chain_rank(*kind).is_some_and(|rank| rank > x.max(y))),
            _ => None,
        }
    }

    /// Widen a numeric value; `None` when the conversion is narrowing or
    /// crosses families
    pub fn coerce_numeric(&self, value: &PrimitiveValue, target: PrimitiveKind) -> Option<PrimitiveValue> {
        let from = value.kind();
        if from == target {
            return Some(value.clone());
        }
        if !from.is_numeric() || !target.is_numeric() || !self.can_implicitly_convert(from, target) {
            return None;
        }

        match (value, target) {
            (PrimitiveValue::Double(d), PrimitiveKind::Decimal) => decimal_from_float_text(*d, d.to_string()),
            (PrimitiveValue::Single(s), PrimitiveKind::Decimal) => {
                decimal_from_float_text(f64::from(*s), s.to_string())
            }
            (PrimitiveValue::Single(s), PrimitiveKind::Double) => {
                s.to_string().parse().ok().map(PrimitiveValue::Double)
            }
            _ => {
                let integral = value.as_i64()?;
                match target {
                    PrimitiveKind::Int16 => i16::try_from(integral).ok().map(PrimitiveValue::Int16),
                    PrimitiveKind::Int32 => i32::try_from(integral).ok().map(PrimitiveValue::Int32),
                    PrimitiveKind::Int64 => Some(PrimitiveValue::Int64(integral)),
                    PrimitiveKind::Single => Some(PrimitiveValue::Single(integral as f32)),
                    PrimitiveKind::Double => Some(PrimitiveValue::Double(integral as f64)),
                    PrimitiveKind::Decimal => Some(PrimitiveValue::Decimal(Decimal::from(integral))),
                    _ => None,
                }
            }
        }
    }

    /// Convert between temporal kinds (and `String` ↔ `Date`)
    pub fn coerce_temporal(&self, value: &PrimitiveValue, target: PrimitiveKind) -> Option<PrimitiveValue> {
        match (value, target) {
            (v, t) if v.kind() == t => Some(v.clone()),
            (PrimitiveValue::DateTimeOffset(dt), PrimitiveKind::Date) => {
                Some(PrimitiveValue::Date(dt.naive_local().date()))
            }
            (PrimitiveValue::Date(d), PrimitiveKind::DateTimeOffset) => Some(
                PrimitiveValue::DateTimeOffset(d.and_time(NaiveTime::default()).and_utc().fixed_offset()),
            ),
            (PrimitiveValue::String(s), PrimitiveKind::Date) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .ok()
                .map(PrimitiveValue::Date),
            (PrimitiveValue::Date(d), PrimitiveKind::String) => {
                Some(PrimitiveValue::String(d.format("%Y-%m-%d").to_string()))
            }
            _ => None,
        }
    }

    /// Convert a literal constant to `target`. Integral literals narrow when
    /// the value fits; decimals and floats convert through their text.
    pub fn convert_literal(&self, value: PrimitiveValue, target: PrimitiveKind) -> Result<PrimitiveValue> {
        if value.kind() == target {
            return Ok(value);
        }
        if let Some(widened) = self
            .coerce_numeric(&value, target)
            .or_else(|| self.coerce_temporal(&value, target))
        {
            log::trace!("widened {} literal to {}", value.kind().qualified_name(), target.qualified_name());
            return Ok(widened);
        }

        let out_of_range = || {
            UriError::coercion(
                OD0305,
                format!("Literal {} is out of range for {}", LiteralValue::from(value.clone()), target.qualified_name()),
            )
        };

        let converted = match (&value, target) {
            (v, t) if t.is_integral() => match v.as_i64() {
                Some(integral) => {
                    let narrowed = match t {
                        PrimitiveKind::Byte => u8::try_from(integral).ok().map(PrimitiveValue::Byte),
                        PrimitiveKind::SByte => i8::try_from(integral).ok().map(PrimitiveValue::SByte),
                        PrimitiveKind::Int16 => i16::try_from(integral).ok().map(PrimitiveValue::Int16),
                        PrimitiveKind::Int32 => i32::try_from(integral).ok().map(PrimitiveValue::Int32),
                        _ => Some(PrimitiveValue::Int64(integral)),
                    };
                    return narrowed.ok_or_else(out_of_range);
                }
                None => None,
            },
            (PrimitiveValue::Decimal(d), PrimitiveKind::Double) => {
                d.to_string().parse().ok().map(PrimitiveValue::Double)
            }
            (PrimitiveValue::Decimal(d), PrimitiveKind::Single) => {
                d.to_f32().filter(|f| f.is_finite()).map(PrimitiveValue::Single)
            }
            (PrimitiveValue::Double(d), PrimitiveKind::Single) => {
                if d.is_finite() && d.abs() > f64::from(f32::MAX) {
                    return Err(out_of_range());
                }
                d.to_string().parse().ok().map(PrimitiveValue::Single)
            }
            _ => None,
        };

        converted.ok_or_else(|| {
            UriError::coercion(
                OD0300,
                format!(
                    "Cannot convert literal {} of type {} to {}",
                    LiteralValue::from(value.clone()),
                    value.kind().qualified_name(),
                    target.qualified_name()
                ),
            )
        })
    }

    /// Check a null literal against the expected type. Without an explicit
    /// type name the null takes the expected type.
    pub fn check_null(
        &self,
        type_name: Option<&str>,
        expected: &TypeReference,
        schema: &Schema,
    ) -> Result<TypeReference> {
        if !expected.nullable {
            return Err(UriError::coercion(
                OD0301,
                format!("Null is not allowed for non-nullable type {}", expected.ty),
            ));
        }
        let Some(type_name) = type_name else {
            return Ok(expected.clone());
        };

        let declared = schema.find_type(type_name);
        let declared = declared.require_concrete()?;
        let compatible = schema.is_assignable(&expected.ty, declared)
            || match (declared.as_primitive(), expected.ty.as_primitive()) {
                (Some(from), Some(to)) => self.can_implicitly_convert(from, to),
                _ => false,
            };
        if !compatible {
            return Err(UriError::coercion(
                OD0302,
                format!("Null of type {} is not compatible with {}", declared, expected.ty),
            ));
        }
        Ok(TypeReference::nullable(declared.clone()))
    }

    /// Convert a parsed literal to the expected type
    pub fn coerce_literal(
        &self,
        value: LiteralValue,
        expected: &TypeReference,
        schema: &Schema,
    ) -> Result<LiteralValue> {
        let expected_ty = expected.ty.require_concrete()?;
        match value {
            LiteralValue::Null { type_name } => {
                self.check_null(type_name.as_deref(), expected, schema)?;
                Ok(LiteralValue::Null { type_name })
            }
            LiteralValue::Enum(e) => self.bind_enum(e, expected_ty, schema).map(LiteralValue::Enum),
            LiteralValue::Primitive(p) => match expected_ty {
                SchemaType::Primitive(kind) => self.convert_literal(p, *kind).map(LiteralValue::Primitive),
                other => Err(UriError::coercion(
                    OD0300,
                    format!(
                        "Cannot convert literal {} of type {} to {}",
                        LiteralValue::from(p.clone()),
                        p.kind().qualified_name(),
                        other
                    ),
                )),
            },
        }
    }

    /// Resolve an enum literal's members against its definition
    pub fn bind_enum(&self, value: EnumValue, expected: &SchemaType, schema: &Schema) -> Result<EnumValue> {
        let declared = schema.find_type(&value.type_name);
        let declared = declared.require_concrete()?;
        let Some(def) = declared.as_enum() else {
            return Err(UriError::coercion(
                OD0300,
                format!("Type {} is not an enum type", value.type_name),
            ));
        };
        if !expected.same_definition(declared) {
            return Err(UriError::coercion(
                OD0300,
                format!("Cannot convert enum literal of type {} to {}", declared, expected),
            ));
        }
        if value.members.len() > 1 && !def.is_flags {
            return Err(UriError::coercion(
                OD0300,
                format!("Enum type {} is not a flags enum", declared),
            ));
        }

        let mut combined = 0i64;
        for member in &value.members {
            let member_value = def
                .member(member)
                .or_else(|| member.parse::<i64>().ok().filter(|v| def.member_name(*v).is_some()))
                .ok_or_else(|| {
                    UriError::resolution(
                        OD0106,
                        format!("Enum type {} has no member '{}'", declared, member),
                    )
                })?;
            combined |= member_value;
        }
        Ok(EnumValue {
            value: Some(combined),
            ..value
        })
    }
}

/// Decimal from the shortest round-trip text of a float; `None` for
/// non-finite or out-of-range values
fn decimal_from_float_text(value: f64, text: String) -> Option<PrimitiveValue> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&format!("{:e}", value)))
        .ok()
        .map(PrimitiveValue::Decimal)
}
