//! Governance error types.

use pdv_core::ToggleKey;
use pdv_store::StoreError;

use crate::precondition::Blockers;
use crate::view::RollbackToken;

/// Errors from [`ToggleGovernor::request_change`](crate::ToggleGovernor::request_change).
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    /// Live resources still depend on the toggle. Nothing was changed,
    /// locally or in the store.
    #[error("cannot disable {key}: {blockers}")]
    PreconditionBlocked { key: ToggleKey, blockers: Blockers },

    /// The precondition query itself failed. Nothing was changed.
    #[error("precondition query for {key} failed: {cause}")]
    PreconditionQueryFailed {
        key: ToggleKey,
        #[source]
        cause: StoreError,
    },

    /// The store rejected the write. The optimistic local apply is still in
    /// place; revert it with `rollback`.
    #[error("failed to persist {key}: {cause}")]
    PersistenceFailed {
        key: ToggleKey,
        rollback: RollbackToken,
        #[source]
        cause: StoreError,
    },
}

impl GovernanceError {
    /// The toggle the failed request targeted.
    pub fn key(&self) -> ToggleKey {
        match self {
            Self::PreconditionBlocked { key, .. }
            | Self::PreconditionQueryFailed { key, .. }
            | Self::PersistenceFailed { key, .. } => *key,
        }
    }

    /// Whether retrying the same request may succeed without user action.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::PreconditionBlocked { .. })
    }
}
