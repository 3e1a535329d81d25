//! # Sale-Without-Product Line Projection
//!
//! Turns a tenant's fiscal attribute set into the fiscal data of an NFC-e
//! line for the reserved product code [`SALE_WITHOUT_PRODUCT_CODE`], and
//! computes the tax values of that line.
//!
//! All arithmetic is fixed-point: amounts in centavos, rates in basis
//! points, intermediate products in `i128`, rounded half away from zero to
//! the centavo.

use serde::Serialize;

use pdv_core::{Cents, FiscalAttributeSet, Rate, Weight};

use crate::error::FiscalError;
use crate::regime::FiscalRegime;
use crate::resolver::{resolve_code, IcmsCode};
use crate::validation::check_emission_readiness;

/// Product code the emitter uses for a sale without a catalog product.
pub const SALE_WITHOUT_PRODUCT_CODE: &str = "999999";

/// CST for PIS and COFINS: taxable operation at the basic rate.
pub const CST_PIS_COFINS_TAXABLE: &str = "01";

/// Fiscal data of a sale-without-product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiscalLineItem {
    /// Always [`SALE_WITHOUT_PRODUCT_CODE`].
    pub product_code: &'static str,
    /// Fiscal operation code.
    pub cfop: String,
    /// 8-digit NCM.
    pub ncm: String,
    /// Goods origin.
    pub origem: u8,
    /// CEST, present for substitution lines.
    pub cest: Option<String>,
    /// The single CST or CSOSN for ICMS.
    pub icms: IcmsCode,
    /// CST for PIS.
    pub cst_pis: &'static str,
    /// CST for COFINS.
    pub cst_cofins: &'static str,
    /// ICMS rate.
    pub aliquota_icms: Rate,
    /// PIS rate.
    pub aliquota_pis: Rate,
    /// COFINS rate.
    pub aliquota_cofins: Rate,
    /// ST value-added margin.
    pub margem_st: Option<Rate>,
    /// Net weight.
    pub peso_liquido: Weight,
}

/// Project `attrs` into a line for `regime`.
///
/// Refuses with `ValidationFailed` unless the set passes
/// [`check_emission_readiness`].
pub fn project_line_item(
    attrs: &FiscalAttributeSet,
    regime: FiscalRegime,
) -> Result<FiscalLineItem, FiscalError> {
    check_emission_readiness(attrs, regime)
        .map_err(|field_errors| FiscalError::ValidationFailed { field_errors })?;

    Ok(FiscalLineItem {
        product_code: SALE_WITHOUT_PRODUCT_CODE,
        cfop: attrs.cfop.trim().to_string(),
        ncm: attrs.ncm.trim().to_string(),
        // Readiness guarantees presence.
        origem: attrs.origem.unwrap_or_default(),
        cest: attrs.cest.clone(),
        icms: resolve_code(regime, attrs.situacao),
        cst_pis: CST_PIS_COFINS_TAXABLE,
        cst_cofins: CST_PIS_COFINS_TAXABLE,
        aliquota_icms: attrs.aliquota_icms,
        aliquota_pis: attrs.aliquota_pis,
        aliquota_cofins: attrs.aliquota_cofins,
        margem_st: attrs.margem_st,
        peso_liquido: attrs.peso_liquido,
    })
}

// ---------------------------------------------------------------------------
// Tax computation
// ---------------------------------------------------------------------------

/// Divide with rounding half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.unsigned_abs() * 2 >= denominator.unsigned_abs() {
        quotient + numerator.signum()
    } else {
        quotient
    }
}

fn to_cents(value: i128) -> Result<Cents, FiscalError> {
    i64::try_from(value)
        .map(Cents::from_minor)
        .map_err(|_| FiscalError::StRetentionRefused("amount out of range"))
}

/// `amount × rate%`, rounded to the centavo.
pub fn apply_rate(amount: Cents, rate: Rate) -> Option<Cents> {
    let product = i128::from(amount.minor()).checked_mul(i128::from(rate.minor()))?;
    i64::try_from(div_round(product, 10_000)).ok().map(Cents::from_minor)
}

/// ICMS retained by tax substitution on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StRetention {
    /// `line_value × (1 + margem/100)`, rounded to the centavo.
    pub base: Cents,
    /// `base × aliquota/100`, rounded to the centavo.
    pub retained: Cents,
}

/// Compute the ST retention of a line.
///
/// Both `margem_st` and `aliquota_icms` must be positive.
pub fn st_retention(
    line_value: Cents,
    margem_st: Rate,
    aliquota_icms: Rate,
) -> Result<StRetention, FiscalError> {
    if !margem_st.is_positive() {
        return Err(FiscalError::StRetentionRefused("ST margin must be positive"));
    }
    if !aliquota_icms.is_positive() {
        return Err(FiscalError::StRetentionRefused("ICMS rate must be positive"));
    }

    let out_of_range = || FiscalError::StRetentionRefused("amount out of range");

    // base (centavos, scaled by 10^4) = value × (10000 + margem_bps)
    let scaled_base = i128::from(line_value.minor())
        .checked_mul(10_000 + i128::from(margem_st.minor()))
        .ok_or_else(out_of_range)?;
    let base = to_cents(div_round(scaled_base, 10_000))?;
    // Retention is computed from the unrounded base.
    let scaled_retained = scaled_base
        .checked_mul(i128::from(aliquota_icms.minor()))
        .ok_or_else(out_of_range)?;
    let retained = to_cents(div_round(scaled_retained, 100_000_000))?;
    Ok(StRetention { base, retained })
}

/// Tax values of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineTaxes {
    /// Own ICMS, only for a fully taxed line under regime normal (CST 00).
    pub icms: Option<Cents>,
    /// Previously retained ST, for CST 60 / CSOSN 500.
    pub st: Option<StRetention>,
    /// PIS at CST 01.
    pub pis: Cents,
    /// COFINS at CST 01.
    pub cofins: Cents,
}

/// Compute the taxes of `line` for a line total of `line_value`.
pub fn compute_taxes(line: &FiscalLineItem, line_value: Cents) -> Result<LineTaxes, FiscalError> {
    let out_of_range = || FiscalError::StRetentionRefused("amount out of range");

    let icms = match line.icms {
        IcmsCode::Cst("00") => Some(apply_rate(line_value, line.aliquota_icms).ok_or_else(out_of_range)?),
        _ => None,
    };
    let st = if line.icms.is_substitution() {
        let margem = line.margem_st.unwrap_or(Rate::ZERO);
        Some(st_retention(line_value, margem, line.aliquota_icms)?)
    } else {
        None
    };

    Ok(LineTaxes {
        icms,
        st,
        pis: apply_rate(line_value, line.aliquota_pis).ok_or_else(out_of_range)?,
        cofins: apply_rate(line_value, line.aliquota_cofins).ok_or_else(out_of_range)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdv_core::TaxSituation;
    use proptest::prelude::*;

    fn cents(s: &str) -> Cents {
        Cents::parse(s).unwrap()
    }

    fn rate(s: &str) -> Rate {
        Rate::parse(s).unwrap()
    }

    fn st_attrs() -> FiscalAttributeSet {
        FiscalAttributeSet {
            cfop: "5405".into(),
            situacao: TaxSituation::SubstituicaoTributaria,
            csosn: Some("500".into()),
            cest: Some("0300100".into()),
            margem_st: Some(rate("40")),
            ..FiscalAttributeSet::default()
        }
    }

    #[test]
    fn projection_uses_reserved_code_and_pis_cofins_01() {
        let mut attrs = FiscalAttributeSet::default();
        attrs.csosn = Some("102".into());
        let line = project_line_item(&attrs, FiscalRegime::SimplesNacional).unwrap();
        assert_eq!(line.product_code, "999999");
        assert_eq!(line.icms, IcmsCode::Csosn("102"));
        assert_eq!(line.cst_pis, "01");
        assert_eq!(line.cst_cofins, "01");
        assert_eq!(line.origem, 0);
    }

    #[test]
    fn projection_refuses_wrong_code_family() {
        let mut attrs = FiscalAttributeSet::default();
        attrs.csosn = Some("102".into());
        let err = project_line_item(&attrs, FiscalRegime::RegimeNormal).unwrap_err();
        assert!(matches!(err, FiscalError::ValidationFailed { .. }));
    }

    #[test]
    fn st_retention_matches_reference_values() {
        // 10.00 with 40% margin: base 14.00, 18% of it 2.52.
        let st = st_retention(cents("10.00"), rate("40"), rate("18")).unwrap();
        assert_eq!(st.base, cents("14.00"));
        assert_eq!(st.retained, cents("2.52"));

        // 9.99 with 35.5% margin: base 13.536450, 18% = 2.436561 -> 2.44.
        let st = st_retention(cents("9.99"), rate("35.5"), rate("18")).unwrap();
        assert_eq!(st.base, cents("13.54"));
        assert_eq!(st.retained, cents("2.44"));
    }

    #[test]
    fn st_retention_refuses_zero_margin_or_rate() {
        assert!(st_retention(cents("10"), Rate::ZERO, rate("18")).is_err());
        assert!(st_retention(cents("10"), rate("40"), Rate::ZERO).is_err());
    }

    #[test]
    fn st_line_taxes_include_retention_but_no_own_icms() {
        let line = project_line_item(&st_attrs(), FiscalRegime::SimplesNacional).unwrap();
        let taxes = compute_taxes(&line, cents("10.00")).unwrap();
        assert_eq!(taxes.icms, None);
        assert_eq!(taxes.st.map(|s| s.retained), Some(cents("2.52")));
        assert_eq!(taxes.pis, cents("0.17"));
        assert_eq!(taxes.cofins, cents("0.76"));
    }

    #[test]
    fn normal_integral_line_carries_own_icms() {
        let mut attrs = FiscalAttributeSet::default();
        attrs.cst = Some("00".into());
        let line = project_line_item(&attrs, FiscalRegime::RegimeNormal).unwrap();
        let taxes = compute_taxes(&line, cents("25.00")).unwrap();
        assert_eq!(taxes.icms, Some(cents("4.50")));
        assert!(taxes.st.is_none());
    }

    #[test]
    fn extreme_inputs_are_refused_not_overflowed() {
        let err = st_retention(
            Cents::from_minor(i64::MAX / 2),
            Rate::from_minor(1),
            Rate::from_minor(i64::MAX),
        )
        .unwrap_err();
        assert!(matches!(err, FiscalError::StRetentionRefused("amount out of range")));

        let err = st_retention(Cents::from_minor(i64::MAX), Rate::from_minor(i64::MAX), rate("18"))
            .unwrap_err();
        assert!(matches!(err, FiscalError::StRetentionRefused(_)));

        assert_eq!(apply_rate(Cents::from_minor(i64::MAX), Rate::from_minor(i64::MAX)), None);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        // 0.50 × 1.00% = 0.005 -> 0.01
        assert_eq!(apply_rate(cents("0.50"), rate("1")), Some(cents("0.01")));
        assert_eq!(apply_rate(cents("-0.50"), rate("1")), Some(cents("-0.01")));
    }

    proptest! {
        #[test]
        fn retention_never_exceeds_base(value in 1i64..10_000_000, margem in 1i64..20_000, aliquota in 1i64..10_000) {
            let st = st_retention(Cents::from_minor(value), Rate::from_minor(margem), Rate::from_minor(aliquota)).unwrap();
            prop_assert!(st.base.minor() >= value);
            prop_assert!(st.retained.minor() <= st.base.minor());
        }
    }
}
