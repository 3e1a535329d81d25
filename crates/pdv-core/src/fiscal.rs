//! # Fiscal Attribute Set
//!
//! Tax-classification fields applied to a "sale without a catalog product"
//! line item. The set is created with tenant defaults and only ever
//! overwritten as a whole, never deleted.
//!
//! Consistency rules between the fields (CST/CSOSN exclusivity, CEST and ST
//! margin under tax substitution) are enforced by `pdv-fiscal`; this module
//! only defines the shape.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{Rate, Weight};

/// ICMS tax situation of a line item.
///
/// Serialized with the names the record store keeps in
/// `venda_sem_produto_situacao_tributaria`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaxSituation {
    /// Fully taxed operation.
    #[serde(rename = "tributado_integral")]
    TributadoIntegral,
    /// ICMS previously collected by tax substitution.
    #[serde(rename = "tributado_st")]
    SubstituicaoTributaria,
    /// Exempt operation.
    #[serde(rename = "isento")]
    Isenta,
    /// Non-taxed operation.
    #[serde(rename = "nao_tributado")]
    NaoTributada,
}

impl TaxSituation {
    /// Stored name of this situation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TributadoIntegral => "tributado_integral",
            Self::SubstituicaoTributaria => "tributado_st",
            Self::Isenta => "isento",
            Self::NaoTributada => "nao_tributado",
        }
    }

    /// Return all situation variants.
    pub fn all() -> &'static [TaxSituation] {
        &[
            Self::TributadoIntegral,
            Self::SubstituicaoTributaria,
            Self::Isenta,
            Self::NaoTributada,
        ]
    }

    /// Whether this situation requires CEST and ST margin.
    pub fn is_substitution(&self) -> bool {
        matches!(self, Self::SubstituicaoTributaria)
    }
}

impl std::fmt::Display for TaxSituation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxSituation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|situation| situation.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownTaxSituation(s.to_string()))
    }
}

/// Default NCM for a sale without a catalog product (non-alcoholic beverages).
pub const DEFAULT_NCM: &str = "22021000";

/// Default CFOP: sale of goods acquired from third parties.
pub const DEFAULT_CFOP: &str = "5102";

/// Fiscal attributes of a sale-without-product line.
///
/// Text fields hold raw user input; the validation engine decides whether it
/// is acceptable. `cst` and `csosn` are written only through the code
/// resolver, which always clears the unused one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalAttributeSet {
    /// Mercosur product classification, 8 digits.
    pub ncm: String,
    /// Fiscal operation code.
    pub cfop: String,
    /// Goods origin, 0 to 8.
    pub origem: Option<u8>,
    /// ICMS tax situation.
    pub situacao: TaxSituation,
    /// Two-digit CST (standard regime only).
    pub cst: Option<String>,
    /// Three-digit CSOSN (Simples Nacional only).
    pub csosn: Option<String>,
    /// Substitution-tax specifier code.
    pub cest: Option<String>,
    /// Value-added margin for tax substitution.
    pub margem_st: Option<Rate>,
    /// ICMS rate.
    pub aliquota_icms: Rate,
    /// PIS rate.
    pub aliquota_pis: Rate,
    /// COFINS rate.
    pub aliquota_cofins: Rate,
    /// Net weight.
    pub peso_liquido: Weight,
}

impl Default for FiscalAttributeSet {
    /// Tenant defaults, before the code pair is resolved for a regime.
    fn default() -> Self {
        Self {
            ncm: DEFAULT_NCM.to_string(),
            cfop: DEFAULT_CFOP.to_string(),
            origem: Some(0),
            situacao: TaxSituation::TributadoIntegral,
            cst: None,
            csosn: None,
            cest: None,
            margem_st: None,
            aliquota_icms: Rate::from_minor(1800),
            aliquota_pis: Rate::from_minor(165),
            aliquota_cofins: Rate::from_minor(760),
            peso_liquido: Weight::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn situation_names_match_stored_values() {
        assert_eq!(TaxSituation::SubstituicaoTributaria.as_str(), "tributado_st");
        for situation in TaxSituation::all() {
            let json = serde_json::to_string(situation).unwrap();
            assert_eq!(json, format!("\"{}\"", situation.as_str()));
            assert_eq!(situation.as_str().parse::<TaxSituation>().unwrap(), *situation);
        }
    }

    #[test]
    fn unknown_situation_is_not_defaulted() {
        assert!("substituicao".parse::<TaxSituation>().is_err());
    }

    #[test]
    fn only_substitution_requires_st_fields() {
        let flagged: Vec<_> = TaxSituation::all()
            .iter()
            .filter(|s| s.is_substitution())
            .collect();
        assert_eq!(flagged, vec![&TaxSituation::SubstituicaoTributaria]);
    }

    #[test]
    fn defaults_match_tenant_provisioning() {
        let attrs = FiscalAttributeSet::default();
        assert_eq!(attrs.ncm, "22021000");
        assert_eq!(attrs.cfop, "5102");
        assert_eq!(attrs.origem, Some(0));
        assert_eq!(attrs.aliquota_icms.to_string(), "18.00");
        assert_eq!(attrs.aliquota_pis.to_string(), "1.65");
        assert_eq!(attrs.aliquota_cofins.to_string(), "7.60");
        assert!(attrs.cst.is_none() && attrs.csosn.is_none());
    }
}
