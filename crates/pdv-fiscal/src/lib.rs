//! # pdv-fiscal -- Fiscal attribute resolution
//!
//! Derives and validates the Brazilian tax-classification fields of a
//! "sale without a catalog product" line item, which must stay mutually
//! consistent:
//!
//! - [`FiscalRegime::classify`] collapses the stored regime code into the
//!   CSOSN or CST code family.
//! - [`cfop::infer_situation`] derives the ICMS situation from the CFOP.
//! - [`resolve_code`] maps `(regime, situation)` to the single ICMS code;
//!   [`FiscalCodeResolver`] writes it and clears the other field.
//! - [`validate`] gates saving; [`check_emission_readiness`] gates emission.
//! - [`FiscalEditor`] ties these together for one tenant and saves through
//!   [`pdv_store::ConfigStore`].
//! - [`project_line_item`] and [`compute_taxes`] produce the NFC-e line data
//!   for the reserved product code, including ST retention.

pub mod cfop;
pub mod defaults;
pub mod editor;
pub mod error;
pub mod line;
pub mod regime;
pub mod resolver;
pub mod validation;

pub use cfop::CfopEntry;
pub use defaults::tenant_defaults;
pub use editor::FiscalEditor;
pub use error::FiscalError;
pub use line::{
    compute_taxes, project_line_item, st_retention, FiscalLineItem, LineTaxes, StRetention,
    SALE_WITHOUT_PRODUCT_CODE,
};
pub use regime::FiscalRegime;
pub use resolver::{resolve_code, resolve_code_by_name, FiscalCodeResolver, IcmsCode};
pub use validation::{check_emission_readiness, validate, FieldErrors, FiscalField};
