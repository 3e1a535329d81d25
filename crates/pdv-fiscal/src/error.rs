//! Fiscal error types.

use pdv_store::StoreError;

use crate::regime::FiscalRegime;
use crate::validation::FieldErrors;

/// Errors from fiscal resolution, validation and persistence.
#[derive(Debug, thiserror::Error)]
pub enum FiscalError {
    /// One or more fields failed validation; nothing was persisted.
    #[error("fiscal attributes are invalid: {field_errors}")]
    ValidationFailed { field_errors: FieldErrors },

    /// The store rejected the write.
    #[error("failed to persist fiscal attributes: {cause}")]
    PersistenceFailed {
        #[source]
        cause: StoreError,
    },

    /// No code-table entry for the pair. A defect in the tables, never a
    /// user-facing condition.
    #[error("no ICMS code mapped for regime {regime} and situation {situation:?}")]
    UnmappedFiscalCombination {
        regime: FiscalRegime,
        situation: String,
    },

    /// CFOP is not in the catalog.
    #[error("CFOP {0} is not in the catalog")]
    UnknownCfop(String),

    /// Tax-substitution retention cannot be computed.
    #[error("ST retention refused: {0}")]
    StRetentionRefused(&'static str),
}
