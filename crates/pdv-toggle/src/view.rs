//! # Optimistic Local View
//!
//! The caller's in-memory copy of a tenant's toggles. The governor applies a
//! change here before persisting it; when persistence fails, the caller
//! reverts with the [`RollbackToken`] carried by the error. The governor
//! keeps no state of its own between calls.

use serde::{Deserialize, Serialize};

use pdv_core::{ConfigSnapshot, TenantId, ToggleKey, ToggleSet};

use crate::error::GovernanceError;

/// Prior values of the keys touched by one optimistic apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackToken {
    tenant: TenantId,
    previous: ToggleSet,
}

impl RollbackToken {
    /// Tenant the token belongs to.
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Values the touched keys held before the apply.
    pub fn previous(&self) -> &ToggleSet {
        &self.previous
    }
}

/// Request-scoped view of one tenant's toggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalToggleView {
    tenant: TenantId,
    toggles: ToggleSet,
}

impl LocalToggleView {
    /// View over explicit values.
    pub fn new(tenant: TenantId, toggles: ToggleSet) -> Self {
        Self { tenant, toggles }
    }

    /// View over a snapshot's toggles.
    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Self {
        Self::new(snapshot.tenant_id, snapshot.toggles.clone())
    }

    /// Tenant of this view.
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Current value of `key`.
    pub fn get(&self, key: ToggleKey) -> bool {
        self.toggles.get(key)
    }

    /// All values.
    pub fn toggles(&self) -> &ToggleSet {
        &self.toggles
    }

    /// Apply `writes` and return the token that undoes them.
    pub fn apply(&mut self, writes: &ToggleSet) -> RollbackToken {
        let previous = writes
            .iter()
            .map(|(key, _)| (key, self.toggles.get(key)))
            .collect();
        self.toggles.merge(writes);
        RollbackToken {
            tenant: self.tenant,
            previous,
        }
    }

    /// Restore the values recorded in `token`. A token from another tenant
    /// is ignored and `false` is returned.
    pub fn revert(&mut self, token: &RollbackToken) -> bool {
        if token.tenant != self.tenant {
            return false;
        }
        self.toggles.merge(&token.previous);
        true
    }

    /// Revert the optimistic apply when `result` is a persistence failure,
    /// then hand the result back.
    pub fn settle<T>(&mut self, result: Result<T, GovernanceError>) -> Result<T, GovernanceError> {
        if let Err(GovernanceError::PersistenceFailed { rollback, .. }) = &result {
            self.revert(rollback);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_then_revert_restores_prior_values() {
        let tenant = TenantId::new();
        let mut view = LocalToggleView::new(
            tenant,
            ToggleSet::new().with(ToggleKey::TipoImpressao80mm, true),
        );
        let before = view.clone();

        let token = view.apply(
            &ToggleSet::new()
                .with(ToggleKey::TipoImpressao80mm, false)
                .with(ToggleKey::TipoImpressao50mm, true),
        );
        assert!(view.get(ToggleKey::TipoImpressao50mm));
        assert!(!view.get(ToggleKey::TipoImpressao80mm));
        assert!(token.previous().get(ToggleKey::TipoImpressao80mm));

        assert!(view.revert(&token));
        assert_eq!(
            view.get(ToggleKey::TipoImpressao80mm),
            before.get(ToggleKey::TipoImpressao80mm)
        );
        assert!(!view.get(ToggleKey::TipoImpressao50mm));
    }

    #[test]
    fn foreign_token_is_ignored() {
        let mut a = LocalToggleView::new(TenantId::new(), ToggleSet::new());
        let mut b = LocalToggleView::new(TenantId::new(), ToggleSet::new());
        let token = a.apply(&ToggleSet::new().with(ToggleKey::Delivery, true));
        assert!(!b.revert(&token));
        assert!(a.get(ToggleKey::Delivery));
    }

    #[test]
    fn settle_passes_success_through() {
        let mut view = LocalToggleView::new(TenantId::new(), ToggleSet::new());
        view.apply(&ToggleSet::new().with(ToggleKey::Vendedor, true));
        let result: Result<(), GovernanceError> = view.settle(Ok(()));
        assert!(result.is_ok());
        assert!(view.get(ToggleKey::Vendedor));
    }
}
