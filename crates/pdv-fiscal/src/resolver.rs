//! # Fiscal Code Resolver
//!
//! Derives the ICMS code of a sale-without-product line from the tenant's
//! regime and the line's tax situation, and keeps the CST/CSOSN pair
//! exclusive: every write that sets one field clears the other.
//!
//! ## Code Tables
//!
//! | Situation | CST (regime normal) | CSOSN (Simples Nacional) |
//! |-----------|---------------------|--------------------------|
//! | `tributado_integral` | 00 | 102 |
//! | `tributado_st` | 60 | 500 |
//! | `isento` | 40 | 300 |
//! | `nao_tributado` | 41 | 400 |
//!
//! [`resolve_code`] is an exhaustive `match`, so a missing entry is a compile
//! error. [`resolve_code_by_name`] serves the stored-name path and is the
//! only place [`FiscalError::UnmappedFiscalCombination`] can arise.

use serde::Serialize;

use pdv_core::{ConfigSnapshot, FiscalAttributeSet, TaxSituation};

use crate::cfop;
use crate::error::FiscalError;
use crate::regime::FiscalRegime;

/// The single ICMS code of a line, tagged with its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "family", content = "code", rename_all = "snake_case")]
pub enum IcmsCode {
    /// Two-digit CST.
    Cst(&'static str),
    /// Three-digit CSOSN.
    Csosn(&'static str),
}

impl IcmsCode {
    /// The code digits.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cst(code) | Self::Csosn(code) => code,
        }
    }

    /// CST field value; empty for a CSOSN.
    pub fn cst(&self) -> &'static str {
        match self {
            Self::Cst(code) => code,
            Self::Csosn(_) => "",
        }
    }

    /// CSOSN field value; empty for a CST.
    pub fn csosn(&self) -> &'static str {
        match self {
            Self::Csosn(code) => code,
            Self::Cst(_) => "",
        }
    }

    /// Whether this code carries ICMS previously retained by substitution.
    pub fn is_substitution(&self) -> bool {
        matches!(self, Self::Cst("60") | Self::Csosn("500"))
    }
}

impl std::fmt::Display for IcmsCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cst(code) => write!(f, "CST {code}"),
            Self::Csosn(code) => write!(f, "CSOSN {code}"),
        }
    }
}

/// ICMS code for `(regime, situation)`.
pub fn resolve_code(regime: FiscalRegime, situation: TaxSituation) -> IcmsCode {
    use FiscalRegime::*;
    use TaxSituation::*;

    match (regime, situation) {
        (RegimeNormal, TributadoIntegral) => IcmsCode::Cst("00"),
        (RegimeNormal, SubstituicaoTributaria) => IcmsCode::Cst("60"),
        (RegimeNormal, Isenta) => IcmsCode::Cst("40"),
        (RegimeNormal, NaoTributada) => IcmsCode::Cst("41"),
        (SimplesNacional, TributadoIntegral) => IcmsCode::Csosn("102"),
        (SimplesNacional, SubstituicaoTributaria) => IcmsCode::Csosn("500"),
        (SimplesNacional, Isenta) => IcmsCode::Csosn("300"),
        (SimplesNacional, NaoTributada) => IcmsCode::Csosn("400"),
    }
}

/// ICMS code for a situation given by its stored name.
pub fn resolve_code_by_name(regime: FiscalRegime, situation: &str) -> Result<IcmsCode, FiscalError> {
    match situation.parse::<TaxSituation>() {
        Ok(parsed) => Ok(resolve_code(regime, parsed)),
        Err(_) => {
            tracing::error!(%regime, situation, "no ICMS code mapped for stored situation");
            Err(FiscalError::UnmappedFiscalCombination {
                regime,
                situation: situation.to_string(),
            })
        }
    }
}

/// Applies CFOP and situation changes to an attribute set for one regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalCodeResolver {
    regime: FiscalRegime,
}

impl FiscalCodeResolver {
    /// Resolver for an explicit regime.
    pub fn new(regime: FiscalRegime) -> Self {
        Self { regime }
    }

    /// Resolver for the regime recorded in `snapshot`.
    pub fn for_snapshot(snapshot: &ConfigSnapshot) -> Self {
        Self::new(FiscalRegime::classify(snapshot.regime_code))
    }

    /// Regime this resolver works for.
    pub fn regime(&self) -> FiscalRegime {
        self.regime
    }

    /// Set the CFOP, infer the situation from it, and resolve the code.
    ///
    /// An uncataloged CFOP leaves `attrs` untouched.
    pub fn apply_cfop(
        &self,
        attrs: &mut FiscalAttributeSet,
        code: &str,
    ) -> Result<TaxSituation, FiscalError> {
        let code = code.trim();
        let situation = cfop::infer_situation(code)?;
        tracing::debug!(cfop = code, %situation, regime = %self.regime, "situation inferred from CFOP");
        attrs.cfop = code.to_string();
        self.apply_situation(attrs, situation);
        Ok(situation)
    }

    /// Set the situation and resolve the code. The CFOP is left as is.
    pub fn apply_situation(&self, attrs: &mut FiscalAttributeSet, situation: TaxSituation) -> IcmsCode {
        attrs.situacao = situation;
        self.resolve_into(attrs)
    }

    /// Write the code for the current situation, clearing the unused field.
    pub fn resolve_into(&self, attrs: &mut FiscalAttributeSet) -> IcmsCode {
        let code = resolve_code(self.regime, attrs.situacao);
        match code {
            IcmsCode::Cst(cst) => {
                attrs.cst = Some(cst.to_string());
                attrs.csosn = None;
            }
            IcmsCode::Csosn(csosn) => {
                attrs.csosn = Some(csosn.to_string());
                attrs.cst = None;
            }
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_regime() -> impl Strategy<Value = FiscalRegime> {
        prop::sample::select(FiscalRegime::all().to_vec())
    }

    fn any_situation() -> impl Strategy<Value = TaxSituation> {
        prop::sample::select(TaxSituation::all().to_vec())
    }

    #[test]
    fn simples_st_resolves_to_csosn_500() {
        let code = resolve_code(FiscalRegime::classify(1), TaxSituation::SubstituicaoTributaria);
        assert_eq!(code.csosn(), "500");
        assert_eq!(code.cst(), "");
    }

    #[test]
    fn normal_integral_resolves_to_cst_00() {
        let code = resolve_code(FiscalRegime::classify(3), TaxSituation::TributadoIntegral);
        assert_eq!(code.cst(), "00");
        assert_eq!(code.csosn(), "");
    }

    #[test]
    fn every_stored_name_is_mapped_for_both_regimes() {
        for regime in FiscalRegime::all() {
            for situation in TaxSituation::all() {
                let code = resolve_code_by_name(*regime, situation.as_str()).unwrap();
                let width = match regime {
                    FiscalRegime::RegimeNormal => 2,
                    FiscalRegime::SimplesNacional => 3,
                };
                assert_eq!(code.code().len(), width, "{regime} / {situation}");
            }
        }
    }

    #[test]
    fn unknown_stored_name_is_unmapped() {
        let err = resolve_code_by_name(FiscalRegime::RegimeNormal, "diferido").unwrap_err();
        assert!(matches!(err, FiscalError::UnmappedFiscalCombination { .. }));
    }

    #[test]
    fn cfop_change_infers_and_resolves() {
        let resolver = FiscalCodeResolver::new(FiscalRegime::SimplesNacional);
        let mut attrs = FiscalAttributeSet::default();
        attrs.cst = Some("00".into());

        let situation = resolver.apply_cfop(&mut attrs, "5405").unwrap();
        assert_eq!(situation, TaxSituation::SubstituicaoTributaria);
        assert_eq!(attrs.cfop, "5405");
        assert_eq!(attrs.csosn.as_deref(), Some("500"));
        assert_eq!(attrs.cst, None);
    }

    #[test]
    fn situation_change_leaves_cfop_alone() {
        let resolver = FiscalCodeResolver::new(FiscalRegime::RegimeNormal);
        let mut attrs = FiscalAttributeSet::default();
        resolver.apply_situation(&mut attrs, TaxSituation::Isenta);
        assert_eq!(attrs.cfop, "5102");
        assert_eq!(attrs.cst.as_deref(), Some("40"));
        assert_eq!(attrs.csosn, None);
    }

    #[test]
    fn uncataloged_cfop_leaves_attrs_untouched() {
        let resolver = FiscalCodeResolver::new(FiscalRegime::RegimeNormal);
        let mut attrs = FiscalAttributeSet::default();
        let before = attrs.clone();
        assert!(resolver.apply_cfop(&mut attrs, "6108").is_err());
        assert_eq!(attrs, before);
    }

    proptest! {
        #[test]
        fn resolve_is_pure_and_exclusive(regime in any_regime(), situation in any_situation()) {
            let first = resolve_code(regime, situation);
            let second = resolve_code(regime, situation);
            prop_assert_eq!(first, second);
            prop_assert!(first.cst().is_empty() != first.csosn().is_empty());
        }

        #[test]
        fn resolver_writes_exactly_one_field(
            regime in any_regime(),
            situation in any_situation(),
            stale_cst in proptest::option::of("[0-9]{2}"),
            stale_csosn in proptest::option::of("[0-9]{3}"),
        ) {
            let mut attrs = FiscalAttributeSet {
                cst: stale_cst,
                csosn: stale_csosn,
                ..FiscalAttributeSet::default()
            };
            FiscalCodeResolver::new(regime).apply_situation(&mut attrs, situation);
            prop_assert!(attrs.cst.is_some() != attrs.csosn.is_some());
            prop_assert_eq!(attrs.csosn.is_some(), regime == FiscalRegime::SimplesNacional);
        }
    }
}
