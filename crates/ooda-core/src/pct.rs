//! Percentage configuration values.
//!
//! Operators write thresholds either as fractions (`0.05`) or as percents
//! (`5`). Values above 1 are divided by 100, anything else passes through.
//! `Pct` applies that rule exactly once: on construction and on
//! deserialization. Serialising writes the normalised fraction, so a
//! round-trip is stable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Normalize a percentage written in either notation to a fraction.
#[inline]
#[must_use]
pub fn normalize_pct(value: f64) -> f64 {
    if value > 1.0 {
        value / 100.0
    } else {
        value
    }
}

/// A normalised percentage stored as a fraction (`0.05` = 5%).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Pct(f64);

impl Pct {
    /// Build from either notation.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(normalize_pct(value))
    }

    /// Build from a value already known to be a fraction.
    #[must_use]
    pub const fn from_fraction(fraction: f64) -> Self {
        Self(fraction)
    }

    #[inline]
    #[must_use]
    pub fn fraction(self) -> f64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl fmt::Display for Pct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.as_percent())
    }
}

impl Serialize for Pct {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for Pct {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        if !raw.is_finite() {
            return Err(serde::de::Error::custom("percentage must be finite"));
        }
        Ok(Pct::new(raw))
    }
}
