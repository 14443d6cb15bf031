//! Primitive (`Edm.*`) types

use serde::{Deserialize, Serialize};

/// Primitive type kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Binary,
    Boolean,
    /// Unsigned 8-bit integer
    Byte,
    Date,
    DateTimeOffset,
    Decimal,
    Double,
    Duration,
    Guid,
    Int16,
    Int32,
    Int64,
    /// Signed 8-bit integer
    SByte,
    Single,
    Stream,
    String,
    TimeOfDay,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 17] = [
        Self::Binary,
        Self::Boolean,
        Self::Byte,
        Self::Date,
        Self::DateTimeOffset,
        Self::Decimal,
        Self::Double,
        Self::Duration,
        Self::Guid,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::SByte,
        Self::Single,
        Self::Stream,
        Self::String,
        Self::TimeOfDay,
    ];

    /// Get the simple name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Binary => "Binary",
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Date => "Date",
            Self::DateTimeOffset => "DateTimeOffset",
            Self::Decimal => "Decimal",
            Self::Double => "Double",
            Self::Duration => "Duration",
            Self::Guid => "Guid",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::SByte => "SByte",
            Self::Single => "Single",
            Self::Stream => "Stream",
            Self::String => "String",
            Self::TimeOfDay => "TimeOfDay",
        }
    }

    /// Get the full qualified name
    pub const fn qualified_name(&self) -> &'static str {
        match self {
            Self::Binary => "Edm.Binary",
            Self::Boolean => "Edm.Boolean",
            Self::Byte => "Edm.Byte",
            Self::Date => "Edm.Date",
            Self::DateTimeOffset => "Edm.DateTimeOffset",
            Self::Decimal => "Edm.Decimal",
            Self::Double => "Edm.Double",
            Self::Duration => "Edm.Duration",
            Self::Guid => "Edm.Guid",
            Self::Int16 => "Edm.Int16",
            Self::Int32 => "Edm.Int32",
            Self::Int64 => "Edm.Int64",
            Self::SByte => "Edm.SByte",
            Self::Single => "Edm.Single",
            Self::Stream => "Edm.Stream",
            Self::String => "Edm.String",
            Self::TimeOfDay => "Edm.TimeOfDay",
        }
    }

    /// Look up a primitive kind by its qualified (`Edm.Int32`) name
    pub fn from_qualified_name(name: &str) -> Option<Self> {
        let simple = name.strip_prefix("Edm.")?;
        Self::ALL.iter().copied().find(|k| k.name() == simple)
    }

    /// Same as [`Self::from_qualified_name`], ignoring ASCII case
    pub fn from_qualified_name_ignore_case(name: &str) -> Option<Self> {
        let (ns, simple) = name.split_once('.')?;
        if !ns.eq_ignore_ascii_case("Edm") {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(simple))
    }

    /// Integral kinds (SByte, Byte, Int16, Int32, Int64)
    pub const fn is_integral(&self) -> bool {
        matches!(
            self,
            Self::SByte | Self::Byte | Self::Int16 | Self::Int32 | Self::Int64
        )
    }

    /// Binary floating point kinds (Single, Double)
    pub const fn is_floating(&self) -> bool {
        matches!(self, Self::Single | Self::Double)
    }

    pub const fn is_numeric(&self) -> bool {
        self.is_integral() || self.is_floating() || matches!(self, Self::Decimal)
    }

    pub const fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date | Self::DateTimeOffset | Self::TimeOfDay | Self::Duration
        )
    }

    /// Check if this kind supports ordering comparisons (`lt`, `gt`, ...)
    pub const fn is_ordered(&self) -> bool {
        self.is_numeric()
            || self.is_temporal()
            || matches!(self, Self::String | Self::Guid | Self::Boolean | Self::Binary)
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.qualified_name())
    }
}
