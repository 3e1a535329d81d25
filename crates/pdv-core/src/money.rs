//! # Fixed-Point Quantities
//!
//! Money, percentages and weights are stored as integers in minor units:
//!
//! | Type | Unit | Scale | Example |
//! |------|------|-------|---------|
//! | [`Cents`] | centavos | 2 | `"150.00"` → `15000` |
//! | [`Rate`] | basis points | 2 | `"18.00"` (%) → `1800` |
//! | [`Weight`] | grams | 3 | `"0.350"` (kg) → `350` |
//!
//! All three serialize as decimal strings. Deserialization also accepts JSON
//! numbers because the record store returns numeric columns unquoted; the
//! number is rendered to its shortest decimal form and parsed with the same
//! rules as a string, so no float arithmetic is ever performed on it.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Fixed-point parsing and formatting
// ---------------------------------------------------------------------------

/// Parse a decimal string into an integer with `scale` fractional digits.
///
/// Fractional digits beyond `scale` are accepted only when they are zeros
/// (`"18.000"` at scale 2 is `1800`; `"1.655"` is rejected). Returns `None`
/// for empty, malformed or overflowing input.
pub fn parse_fixed(s: &str, scale: u32) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let (int_str, frac_str) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_str.is_empty() && frac_str.is_empty() {
        return None;
    }
    if !int_str.chars().all(|c| c.is_ascii_digit()) || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let scale = scale as usize;
    let (kept, dropped) = if frac_str.len() > scale {
        frac_str.split_at(scale)
    } else {
        (frac_str, "")
    };
    if dropped.chars().any(|c| c != '0') {
        return None;
    }

    let int_part: i64 = if int_str.is_empty() {
        0
    } else {
        int_str.parse().ok()?
    };
    let mut frac_part: i64 = if kept.is_empty() { 0 } else { kept.parse().ok()? };
    for _ in kept.len()..scale {
        frac_part = frac_part.checked_mul(10)?;
    }

    let magnitude = int_part
        .checked_mul(10i64.checked_pow(scale as u32)?)?
        .checked_add(frac_part)?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Format an integer with `scale` implied fractional digits.
///
/// `format_fixed(15000, 2)` → `"150.00"`, `format_fixed(-5, 2)` → `"-0.05"`.
pub fn format_fixed(value: i64, scale: u32) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    if scale == 0 {
        return format!("{sign}{abs}");
    }
    let divisor = 10u64.pow(scale);
    format!(
        "{sign}{}.{:0width$}",
        abs / divisor,
        abs % divisor,
        width = scale as usize
    )
}

struct FixedVisitor {
    scale: u32,
    expecting: &'static str,
}

impl<'de> Visitor<'de> for FixedVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.expecting)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        parse_fixed(v, self.scale).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        if !v.is_finite() {
            return Err(E::invalid_value(de::Unexpected::Float(v), &self));
        }
        self.visit_str(&v.to_string())
    }
}

macro_rules! fixed_point_type {
    ($name:ident, $scale:expr, $err:ident, $expecting:literal) => {
        impl $name {
            /// Number of implied fractional digits.
            pub const SCALE: u32 = $scale;

            /// The zero value.
            pub const ZERO: Self = Self(0);

            /// Construct from the raw integer in minor units.
            pub const fn from_minor(value: i64) -> Self {
                Self(value)
            }

            /// Raw integer value in minor units.
            pub const fn minor(self) -> i64 {
                self.0
            }

            /// Parse a decimal string.
            pub fn parse(s: &str) -> Result<Self, ValidationError> {
                parse_fixed(s, Self::SCALE)
                    .map(Self)
                    .ok_or_else(|| ValidationError::$err(s.to_string()))
            }

            /// Whether the value is strictly greater than zero.
            pub fn is_positive(self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&format_fixed(self.0, Self::SCALE))
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer
                    .deserialize_any(FixedVisitor {
                        scale: $scale,
                        expecting: $expecting,
                    })
                    .map(Self)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Concrete quantities
// ---------------------------------------------------------------------------

/// Monetary amount in centavos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cents(i64);

fixed_point_type!(Cents, 2, InvalidAmount, "a decimal amount with up to 2 fractional digits");

impl Cents {
    /// Checked addition, `None` on overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, c| Self(acc.0.saturating_add(c.0)))
    }
}

/// Percentage in basis points (`18.00%` is `1800`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rate(i64);

fixed_point_type!(Rate, 2, InvalidRate, "a percentage with up to 2 fractional digits");

/// Net weight in grams, displayed as kilograms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Weight(i64);

fixed_point_type!(Weight, 3, InvalidWeight, "a weight in kilograms with up to 3 fractional digits");
