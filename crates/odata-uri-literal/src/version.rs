//! Protocol versions that affect literal formatting

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ProtocolVersion {
    #[default]
    #[serde(rename = "4.0")]
    V4,
    #[serde(rename = "4.01")]
    V401,
}

impl ProtocolVersion {
    /// V4.01 accepts and emits durations without the `duration'...'` wrapper
    pub fn bare_durations(self) -> bool {
        self >= Self::V401
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => f.write_str("4.0"),
            Self::V401 => f.write_str("4.01"),
        }
    }
}
