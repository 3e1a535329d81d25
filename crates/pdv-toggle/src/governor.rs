//! # Toggle Governor
//!
//! Orchestrates a single toggle change:
//!
//! 1. **Plan** the writes. Enabling a member of a mutual-exclusion group
//!    writes the whole group (the key on, every other member off); any other
//!    change writes the key alone.
//! 2. **Check** the registered precondition, only when disabling. Enabling
//!    never queries the ledger.
//! 3. **Apply** the writes to the caller's [`LocalToggleView`].
//! 4. **Persist** the writes through [`ConfigStore::update_toggles`] as one
//!    atomic update.
//!
//! On a persistence failure the optimistic apply stays in the view and the
//! returned [`GovernanceError::PersistenceFailed`] carries the
//! [`RollbackToken`](crate::RollbackToken) that undoes it. Preconditions are
//! re-evaluated on every call, so retrying is safe.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pdv_core::{TenantId, ToggleKey, ToggleSet};
use pdv_store::{ConfigStore, OperationalLedger, StoreError};

use crate::error::GovernanceError;
use crate::group::MutualExclusionGroup;
use crate::precondition::PreconditionRegistry;
use crate::view::LocalToggleView;

/// Record of a persisted toggle change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedChange {
    /// Tenant the change was applied to.
    pub tenant: TenantId,
    /// Requested key.
    pub key: ToggleKey,
    /// Requested value.
    pub desired: bool,
    /// Every key written, including group members switched off.
    pub writes: ToggleSet,
    /// Values the written keys held in the view before the change.
    pub previous: ToggleSet,
    /// When the write was acknowledged by the store.
    pub applied_at: DateTime<Utc>,
}

/// Stateless coordinator of toggle changes.
#[derive(Clone)]
pub struct ToggleGovernor {
    store: Arc<dyn ConfigStore>,
    registry: PreconditionRegistry,
    groups: Vec<MutualExclusionGroup>,
}

impl std::fmt::Debug for ToggleGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToggleGovernor")
            .field("registry", &self.registry)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

impl ToggleGovernor {
    /// Governor with an explicit registry and no exclusion groups.
    pub fn new(store: Arc<dyn ConfigStore>, registry: PreconditionRegistry) -> Self {
        Self {
            store,
            registry,
            groups: Vec::new(),
        }
    }

    /// Governor with the standard preconditions and the print-format group.
    pub fn standard(store: Arc<dyn ConfigStore>, ledger: Arc<dyn OperationalLedger>) -> Self {
        Self::new(store, PreconditionRegistry::standard(ledger))
            .with_group(MutualExclusionGroup::print_format())
    }

    /// Add a mutual-exclusion group.
    pub fn with_group(mut self, group: MutualExclusionGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// The precondition registry in use.
    pub fn registry(&self) -> &PreconditionRegistry {
        &self.registry
    }

    /// Group containing `key`, if any.
    pub fn group_of(&self, key: ToggleKey) -> Option<&MutualExclusionGroup> {
        self.groups.iter().find(|g| g.contains(key))
    }

    /// Fetch the tenant's toggles into a fresh local view.
    pub async fn load_view(&self, tenant: &TenantId) -> Result<LocalToggleView, StoreError> {
        let snapshot = self.store.get_config(tenant).await?;
        Ok(LocalToggleView::from_snapshot(&snapshot))
    }

    /// The writes a change of `key` to `desired` produces.
    pub fn plan(&self, key: ToggleKey, desired: bool) -> ToggleSet {
        match self.group_of(key) {
            Some(group) if desired => group.enable_writes(key),
            _ => ToggleSet::new().with(key, desired),
        }
    }

    /// Change `key` to `desired` for the view's tenant.
    ///
    /// On `Ok` the view and the store agree. On `PreconditionBlocked` or
    /// `PreconditionQueryFailed` neither was touched. On `PersistenceFailed`
    /// the view holds the optimistic values until the caller reverts it.
    pub async fn request_change(
        &self,
        view: &mut LocalToggleView,
        key: ToggleKey,
        desired: bool,
    ) -> Result<AppliedChange, GovernanceError> {
        let tenant = *view.tenant();
        tracing::debug!(tenant_id = %tenant, %key, desired, "toggle change requested");

        if !desired {
            self.check_precondition(&tenant, key).await?;
        }

        let writes = self.plan(key, desired);
        let rollback = view.apply(&writes);

        if let Err(cause) = self.store.update_toggles(&tenant, &writes).await {
            tracing::warn!(
                tenant_id = %tenant,
                %key,
                desired,
                error = %cause,
                "toggle write failed, caller must revert optimistic apply"
            );
            return Err(GovernanceError::PersistenceFailed {
                key,
                rollback,
                cause,
            });
        }

        tracing::info!(
            tenant_id = %tenant,
            %key,
            desired,
            writes = writes.len(),
            "toggle change committed"
        );
        Ok(AppliedChange {
            tenant,
            key,
            desired,
            previous: rollback.previous().clone(),
            writes,
            applied_at: Utc::now(),
        })
    }

    async fn check_precondition(
        &self,
        tenant: &TenantId,
        key: ToggleKey,
    ) -> Result<(), GovernanceError> {
        let Some(check) = self.registry.get(key) else {
            return Ok(());
        };

        let blockers = check.blockers(tenant).await.map_err(|cause| {
            tracing::warn!(tenant_id = %tenant, %key, check = check.name(), error = %cause, "precondition query failed");
            GovernanceError::PreconditionQueryFailed { key, cause }
        })?;

        if blockers.is_clear() {
            return Ok(());
        }
        tracing::warn!(
            tenant_id = %tenant,
            %key,
            check = check.name(),
            blocking = blockers.len(),
            "toggle deactivation blocked"
        );
        Err(GovernanceError::PreconditionBlocked { key, blockers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pdv_core::CashSession;
    use pdv_store::InMemoryStore;

    use crate::precondition::Blockers;

    fn setup() -> (Arc<InMemoryStore>, ToggleGovernor, TenantId) {
        let store = Arc::new(InMemoryStore::new());
        let tenant = store.provision(1);
        let governor = ToggleGovernor::standard(store.clone(), store.clone());
        (store, governor, tenant)
    }

    fn session(id: &str) -> CashSession {
        CashSession {
            id: id.into(),
            operator: None,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn plan_expands_group_only_on_enable() {
        let (_, governor, _) = setup();
        assert_eq!(governor.plan(ToggleKey::TipoImpressao80mm, true).len(), 2);
        assert_eq!(governor.plan(ToggleKey::TipoImpressao80mm, false).len(), 1);
        assert_eq!(governor.plan(ToggleKey::Delivery, true).len(), 1);
    }

    #[tokio::test]
    async fn enabling_never_queries_the_ledger() {
        let (store, governor, tenant) = setup();
        store.open_cash_session(&tenant, session("cx-1"));
        let mut view = governor.load_view(&tenant).await.unwrap();

        for key in ToggleKey::all() {
            governor.request_change(&mut view, *key, true).await.unwrap();
        }
        assert_eq!(store.ledger_query_count(), 0);
    }

    #[tokio::test]
    async fn blocked_disable_changes_nothing() {
        let (store, governor, tenant) = setup();
        store.update_toggles(&tenant, &ToggleSet::new().with(ToggleKey::ControlaCaixa, true))
            .await
            .unwrap();
        store.open_cash_session(&tenant, session("cx-1"));
        store.open_cash_session(&tenant, session("cx-2"));
        let mut view = governor.load_view(&tenant).await.unwrap();

        let err = governor
            .request_change(&mut view, ToggleKey::ControlaCaixa, false)
            .await
            .unwrap_err();
        match &err {
            GovernanceError::PreconditionBlocked { blockers, .. } => {
                let ids: Vec<_> = blockers.resources().into_iter().map(|r| r.identifier).collect();
                assert_eq!(ids, vec!["cx-1", "cx-2"]);
            }
            other => panic!("expected PreconditionBlocked, got {other:?}"),
        }
        assert!(!err.is_retryable());
        assert!(view.get(ToggleKey::ControlaCaixa));
        assert!(store.snapshot(&tenant).unwrap().toggles.get(ToggleKey::ControlaCaixa));
    }

    #[tokio::test]
    async fn clear_precondition_allows_disable() {
        let (store, governor, tenant) = setup();
        let mut view = governor.load_view(&tenant).await.unwrap();
        governor.request_change(&mut view, ToggleKey::Fiado, true).await.unwrap();

        let change = governor
            .request_change(&mut view, ToggleKey::Fiado, false)
            .await
            .unwrap();
        assert!(change.previous.get(ToggleKey::Fiado));
        assert!(!view.get(ToggleKey::Fiado));
        assert!(!store.snapshot(&tenant).unwrap().toggles.get(ToggleKey::Fiado));
        assert_eq!(store.ledger_query_count(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_returns_rollback_for_caller() {
        let (store, governor, tenant) = setup();
        let mut view = governor.load_view(&tenant).await.unwrap();
        store.fail_writes_with(Some("connection reset"));

        let result = governor
            .request_change(&mut view, ToggleKey::TipoImpressao50mm, true)
            .await;
        // Optimistic apply is still visible until settled.
        assert!(view.get(ToggleKey::TipoImpressao50mm));

        let result = view.settle(result);
        let err = result.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.key(), ToggleKey::TipoImpressao50mm);
        assert!(!view.get(ToggleKey::TipoImpressao50mm));
        assert!(!store.snapshot(&tenant).unwrap().toggles.get(ToggleKey::TipoImpressao50mm));
    }

    #[tokio::test]
    async fn query_failure_changes_nothing() {
        let (store, governor, tenant) = setup();
        let mut view = governor.load_view(&tenant).await.unwrap();
        governor.request_change(&mut view, ToggleKey::Mesas, true).await.unwrap();
        store.fail_ledger_with(Some("timeout"));

        let err = governor
            .request_change(&mut view, ToggleKey::Mesas, false)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::PreconditionQueryFailed { .. }));
        assert!(view.get(ToggleKey::Mesas));
        assert!(store.snapshot(&tenant).unwrap().toggles.get(ToggleKey::Mesas));
    }

    #[tokio::test]
    async fn custom_precondition_is_consulted() {
        #[derive(Debug)]
        struct AlwaysBlocked;

        #[async_trait::async_trait]
        impl crate::Precondition for AlwaysBlocked {
            fn name(&self) -> &'static str {
                "always_blocked"
            }

            async fn blockers(&self, _tenant: &TenantId) -> Result<Blockers, StoreError> {
                Ok(Blockers::Resources {
                    resources: vec![crate::BlockingResource {
                        kind: crate::BlockingKind::Comanda,
                        identifier: "x".into(),
                        label: "x".into(),
                    }],
                })
            }
        }

        let store = Arc::new(InMemoryStore::new());
        let tenant = store.provision(3);
        let mut registry = PreconditionRegistry::new();
        registry.register(ToggleKey::Delivery, Arc::new(AlwaysBlocked));
        let governor = ToggleGovernor::new(store.clone(), registry);
        let mut view = governor.load_view(&tenant).await.unwrap();

        let err = governor
            .request_change(&mut view, ToggleKey::Delivery, false)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::PreconditionBlocked { .. }));
    }
}
