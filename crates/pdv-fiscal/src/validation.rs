//! # Fiscal Validation Engine
//!
//! Field-completeness rules a [`FiscalAttributeSet`] must satisfy before it
//! may be saved, and the stricter emission-time check the invoice emitter
//! applies before building a line.
//!
//! | Field | Rule |
//! |-------|------|
//! | `ncm` | required, exactly 8 digits |
//! | `cfop` | required, cataloged |
//! | `origem` | required, 0 to 8 |
//! | `cest` | under ST only: required, at least 7 digits |
//! | `margem_st` | under ST only: required, greater than zero |
//!
//! Outside tax substitution `cest` and `margem_st` are never checked,
//! whatever they hold. Clearing them is the resolver's concern.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use pdv_core::FiscalAttributeSet;

use crate::cfop;
use crate::regime::FiscalRegime;
use crate::resolver::resolve_code;

/// Message for an absent required field.
pub const REQUIRED: &str = "required";

/// A validated field of the attribute set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalField {
    Ncm,
    Cfop,
    Origem,
    Cest,
    MargemSt,
    Cst,
    Csosn,
    AliquotaIcms,
}

impl FiscalField {
    /// Stable field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ncm => "ncm",
            Self::Cfop => "cfop",
            Self::Origem => "origem",
            Self::Cest => "cest",
            Self::MargemSt => "margem_st",
            Self::Cst => "cst",
            Self::Csosn => "csosn",
            Self::AliquotaIcms => "aliquota_icms",
        }
    }
}

impl fmt::Display for FiscalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field errors keyed by field. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<FiscalField, String>);

impl FieldErrors {
    /// No errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first message for a field wins.
    pub fn insert(&mut self, field: FiscalField, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Message for `field`, if any.
    pub fn get(&self, field: FiscalField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Whether there are no errors.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Fields with errors, in field order.
    pub fn fields(&self) -> impl Iterator<Item = FiscalField> + '_ {
        self.0.keys().copied()
    }

    /// Iterate over `(field, message)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (FiscalField, &str)> + '_ {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Check the save-time rules.
pub fn validate(attrs: &FiscalAttributeSet) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let ncm = attrs.ncm.trim();
    if ncm.is_empty() {
        errors.insert(FiscalField::Ncm, REQUIRED);
    } else if ncm.len() != 8 || !is_digits(ncm) {
        errors.insert(FiscalField::Ncm, "must be exactly 8 digits");
    }

    let code = attrs.cfop.trim();
    if code.is_empty() {
        errors.insert(FiscalField::Cfop, REQUIRED);
    } else if !cfop::is_cataloged(code) {
        errors.insert(FiscalField::Cfop, "not a cataloged CFOP");
    }

    match attrs.origem {
        None => errors.insert(FiscalField::Origem, REQUIRED),
        Some(origem) if origem > 8 => errors.insert(FiscalField::Origem, "must be between 0 and 8"),
        Some(_) => {}
    }

    if attrs.situacao.is_substitution() {
        match attrs.cest.as_deref().map(str::trim) {
            None | Some("") => errors.insert(FiscalField::Cest, REQUIRED),
            Some(cest) if cest.len() < 7 || !is_digits(cest) => {
                errors.insert(FiscalField::Cest, "must have at least 7 digits")
            }
            Some(_) => {}
        }
        match attrs.margem_st {
            None => errors.insert(FiscalField::MargemSt, REQUIRED),
            Some(margem) if !margem.is_positive() => {
                errors.insert(FiscalField::MargemSt, "must be greater than zero")
            }
            Some(_) => {}
        }
    }

    errors
}

/// Check an attribute set is ready to be emitted on an NFC-e for `regime`:
/// the save-time rules, plus the regime's code present and matching the
/// situation, and a positive ICMS rate under tax substitution.
pub fn check_emission_readiness(
    attrs: &FiscalAttributeSet,
    regime: FiscalRegime,
) -> Result<(), FieldErrors> {
    let mut errors = validate(attrs);
    let expected = resolve_code(regime, attrs.situacao);

    let (field, actual) = match regime {
        FiscalRegime::SimplesNacional => (FiscalField::Csosn, attrs.csosn.as_deref()),
        FiscalRegime::RegimeNormal => (FiscalField::Cst, attrs.cst.as_deref()),
    };
    match actual.map(str::trim) {
        None | Some("") => errors.insert(field, format!("{REQUIRED} for {regime}")),
        Some(code) if code != expected.code() => errors.insert(
            field,
            format!("must be {} for {}", expected.code(), attrs.situacao),
        ),
        Some(_) => {}
    }

    if attrs.situacao.is_substitution() && !attrs.aliquota_icms.is_positive() {
        errors.insert(FiscalField::AliquotaIcms, "must be greater than zero for ST");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
