//! Tenant fiscal defaults.

use pdv_core::FiscalAttributeSet;

use crate::regime::FiscalRegime;
use crate::resolver::FiscalCodeResolver;

/// Fiscal attributes of a newly provisioned tenant, with the code pair
/// resolved for `regime`.
pub fn tenant_defaults(regime: FiscalRegime) -> FiscalAttributeSet {
    let mut attrs = FiscalAttributeSet::default();
    FiscalCodeResolver::new(regime).resolve_into(&mut attrs);
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::check_emission_readiness;

    #[test]
    fn defaults_are_emission_ready_for_both_regimes() {
        for regime in FiscalRegime::all() {
            let attrs = tenant_defaults(*regime);
            assert!(check_emission_readiness(&attrs, *regime).is_ok(), "{regime}");
        }
    }

    #[test]
    fn simples_defaults_use_csosn_102() {
        let attrs = tenant_defaults(FiscalRegime::SimplesNacional);
        assert_eq!(attrs.csosn.as_deref(), Some("102"));
        assert_eq!(attrs.cst, None);
        assert_eq!(attrs.ncm, "22021000");
        assert_eq!(attrs.cfop, "5102");
    }
}
