//! # CFOP Catalog
//!
//! The fiscal operation codes offered for a sale without a catalog product,
//! and the inference of the ICMS tax situation from the chosen code.
//!
//! | CFOP | Situation |
//! |------|-----------|
//! | 5405, 5401 | tax substitution |
//! | 5102, 5101 | fully taxed |
//! | any other cataloged code | fully taxed |

use serde::Serialize;

use pdv_core::TaxSituation;

use crate::error::FiscalError;

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CfopEntry {
    /// Four-digit code.
    pub code: &'static str,
    /// Official description.
    pub description: &'static str,
}

/// CFOPs offered for consumer sales.
pub const CATALOG: &[CfopEntry] = &[
    CfopEntry {
        code: "5101",
        description: "Venda de produção do estabelecimento",
    },
    CfopEntry {
        code: "5102",
        description: "Venda de mercadoria adquirida ou recebida de terceiros",
    },
    CfopEntry {
        code: "5401",
        description: "Venda de produção do estabelecimento em operação com produto sujeito ao regime de substituição tributária, na condição de contribuinte substituto",
    },
    CfopEntry {
        code: "5403",
        description: "Venda de mercadoria adquirida ou recebida de terceiros em operação com mercadoria sujeita ao regime de substituição tributária, na condição de contribuinte substituto",
    },
    CfopEntry {
        code: "5405",
        description: "Venda de mercadoria adquirida ou recebida de terceiros em operação com mercadoria sujeita ao regime de substituição tributária, na condição de contribuinte substituído",
    },
    CfopEntry {
        code: "5949",
        description: "Outra saída de mercadoria ou prestação de serviço não especificado",
    },
];

/// Look up a cataloged CFOP.
pub fn lookup(code: &str) -> Option<&'static CfopEntry> {
    CATALOG.iter().find(|entry| entry.code == code)
}

/// Whether `code` is in the catalog.
pub fn is_cataloged(code: &str) -> bool {
    lookup(code).is_some()
}

/// Tax situation implied by a cataloged CFOP.
pub fn infer_situation(code: &str) -> Result<TaxSituation, FiscalError> {
    let entry = lookup(code).ok_or_else(|| FiscalError::UnknownCfop(code.to_string()))?;
    Ok(match entry.code {
        "5405" | "5401" => TaxSituation::SubstituicaoTributaria,
        _ => TaxSituation::TributadoIntegral,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitution_cfops_infer_st() {
        assert_eq!(infer_situation("5405").unwrap(), TaxSituation::SubstituicaoTributaria);
        assert_eq!(infer_situation("5401").unwrap(), TaxSituation::SubstituicaoTributaria);
    }

    #[test]
    fn sale_cfops_infer_integral() {
        assert_eq!(infer_situation("5102").unwrap(), TaxSituation::TributadoIntegral);
        assert_eq!(infer_situation("5101").unwrap(), TaxSituation::TributadoIntegral);
    }

    #[test]
    fn other_cataloged_cfops_default_to_integral() {
        assert_eq!(infer_situation("5949").unwrap(), TaxSituation::TributadoIntegral);
        assert_eq!(infer_situation("5403").unwrap(), TaxSituation::TributadoIntegral);
    }

    #[test]
    fn uncataloged_cfop_is_an_error() {
        assert!(matches!(infer_situation("6102"), Err(FiscalError::UnknownCfop(_))));
        assert!(!is_cataloged(""));
    }

    #[test]
    fn catalog_codes_are_unique_four_digit() {
        let mut codes: Vec<_> = CATALOG.iter().map(|e| e.code).collect();
        assert!(codes.iter().all(|c| c.len() == 4 && c.bytes().all(|b| b.is_ascii_digit())));
        codes.dedup();
        assert_eq!(codes.len(), CATALOG.len());
    }
}
