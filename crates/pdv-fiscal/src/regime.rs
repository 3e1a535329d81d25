//! Tax regime classification.
//!
//! The record store keeps the company's CRT code. For fiscal-attribute
//! purposes the codes collapse into two code families: code `1` uses CSOSN
//! (Simples Nacional), every other code uses CST (regime normal).

use serde::{Deserialize, Serialize};

/// Code family of a tenant's tax regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalRegime {
    /// Three-digit CSOSN codes.
    SimplesNacional,
    /// Two-digit CST codes.
    RegimeNormal,
}

/// Stored regime code that selects Simples Nacional.
pub const SIMPLES_NACIONAL_CODE: i32 = 1;

impl FiscalRegime {
    /// Classify a stored regime code.
    pub fn classify(regime_code: i32) -> Self {
        if regime_code == SIMPLES_NACIONAL_CODE {
            Self::SimplesNacional
        } else {
            Self::RegimeNormal
        }
    }

    /// Stable name of this regime.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SimplesNacional => "simples_nacional",
            Self::RegimeNormal => "regime_normal",
        }
    }

    /// Return all regime variants.
    pub fn all() -> &'static [FiscalRegime] {
        &[Self::SimplesNacional, Self::RegimeNormal]
    }
}

impl std::fmt::Display for FiscalRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
