//! Log severities
//!
//! Severities are totally ordered by their integer rank. A record is emitted
//! only when `record_level >= threshold`.

use crate::error::LogError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Ordered log severity.
///
/// `All` and `Off` are thresholds rather than record levels: a threshold of
/// `All` lets everything through, a threshold of `Off` silences everything
/// except records explicitly logged at `Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Severity {
    /// Lowest rank, admits every record
    All = 0,
    /// Verbose diagnostics
    #[default]
    Debug = 1,
    /// Normal operational messages
    Info = 2,
    /// Something unexpected but recoverable
    Warn = 3,
    /// A failed operation
    Error = 4,
    /// An unrecoverable condition
    Fatal = 5,
    /// Highest rank, silences everything below it
    Off = 6,
}

impl Severity {
    /// Every severity in rank order.
    pub const ALL_LEVELS: [Severity; 7] = [
        Severity::All,
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
        Severity::Off,
    ];

    /// Integer rank (0..=6).
    #[inline]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Severity for an integer rank, `None` if out of range.
    pub const fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            0 => Some(Severity::All),
            1 => Some(Severity::Debug),
            2 => Some(Severity::Info),
            3 => Some(Severity::Warn),
            4 => Some(Severity::Error),
            5 => Some(Severity::Fatal),
            6 => Some(Severity::Off),
            _ => None,
        }
    }

    /// Upper-case name used in rendered lines and metric labels.
    pub const fn name(self) -> &'static str {
        match self {
            Severity::All => "ALL",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
            Severity::Off => "OFF",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = LogError;

    /// Parse a case-insensitive name (`"warn"`) or a rank (`"3"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(rank) = s.parse::<u8>() {
            return Severity::from_rank(rank).ok_or_else(|| LogError::InvalidLevel(s.to_string()));
        }
        Severity::ALL_LEVELS
            .iter()
            .copied()
            .find(|level| level.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| LogError::InvalidLevel(s.to_string()))
    }
}

impl TryFrom<u8> for Severity {
    type Error = LogError;

    fn try_from(rank: u8) -> Result<Self, LogError> {
        Severity::from_rank(rank).ok_or_else(|| LogError::InvalidLevel(rank.to_string()))
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name().to_ascii_lowercase())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeverityRepr {
    Rank(u8),
    Name(String),
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match SeverityRepr::deserialize(deserializer)? {
            SeverityRepr::Rank(rank) => Severity::try_from(rank).map_err(de::Error::custom),
            SeverityRepr::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

/// Multi-line `"<rank> - <NAME>"` listing of every severity, for help text.
pub fn level_desc() -> String {
    Severity::ALL_LEVELS
        .iter()
        .map(|level| format!("{} - {}", level.rank(), level.name()))
        .collect::<Vec<_>>()
        .join("\n")
}
