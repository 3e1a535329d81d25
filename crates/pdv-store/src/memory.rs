//! # In-Memory Store
//!
//! Process-local implementation of both [`ConfigStore`] and
//! [`OperationalLedger`]. Backs unit and integration tests and embedded
//! deployments that keep configuration in memory.
//!
//! Each tenant's configuration and ledger live behind one `parking_lot`
//! [`RwLock`]; a toggle-group write takes the write lock once, so every
//! entry of the group lands or none does.
//!
//! Failure injection (`fail_writes_with`, `fail_ledger_with`) and query
//! counters exist so callers can observe how the engines drive the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use pdv_core::{
    CashSession, Cents, ConfigSnapshot, DebtorBalance, FiscalAttributeSet, OrderRef, OrderStatus,
    TabKind, TenantId, ToggleSet,
};

use crate::{ConfigStore, OperationalLedger, StoreError};

#[derive(Debug, Clone)]
struct TenantState {
    snapshot: ConfigSnapshot,
    cash_sessions: Vec<CashSession>,
    orders: Vec<OrderRef>,
    debtors: Vec<DebtorBalance>,
}

/// Thread-safe in-memory config store and ledger.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tenants: RwLock<HashMap<TenantId, TenantState>>,
    write_failure: RwLock<Option<String>>,
    ledger_failure: RwLock<Option<String>>,
    ledger_queries: AtomicU64,
    config_writes: AtomicU64,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a tenant's configuration. Ledger data already
    /// recorded for the tenant is kept.
    pub fn insert_tenant(&self, snapshot: ConfigSnapshot) {
        let mut tenants = self.tenants.write();
        match tenants.get_mut(&snapshot.tenant_id) {
            Some(state) => state.snapshot = snapshot,
            None => {
                tenants.insert(
                    snapshot.tenant_id,
                    TenantState {
                        snapshot,
                        cash_sessions: Vec::new(),
                        orders: Vec::new(),
                        debtors: Vec::new(),
                    },
                );
            }
        }
    }

    /// Provision a tenant with default configuration and return its ID.
    pub fn provision(&self, regime_code: i32) -> TenantId {
        let tenant = TenantId::new();
        self.insert_tenant(ConfigSnapshot::provisioned(tenant, regime_code));
        tenant
    }

    /// Synchronous read of a tenant's configuration.
    pub fn snapshot(&self, tenant: &TenantId) -> Option<ConfigSnapshot> {
        self.tenants.read().get(tenant).map(|s| s.snapshot.clone())
    }

    /// Record an open cash-register session.
    pub fn open_cash_session(&self, tenant: &TenantId, session: CashSession) {
        self.with_tenant(tenant, |state| state.cash_sessions.push(session));
    }

    /// Close a cash-register session by ID.
    pub fn close_cash_session(&self, tenant: &TenantId, session_id: &str) {
        self.with_tenant(tenant, |state| {
            state.cash_sessions.retain(|s| s.id != session_id)
        });
    }

    /// Record an order, replacing any order with the same ID.
    pub fn record_order(&self, tenant: &TenantId, order: OrderRef) {
        self.with_tenant(tenant, |state| {
            state.orders.retain(|o| o.id != order.id);
            state.orders.push(order);
        });
    }

    /// Set a customer's balance. A zero balance removes the customer; a
    /// negative one is store credit and is kept but never reported as debt.
    pub fn set_debtor_balance(&self, tenant: &TenantId, debtor: DebtorBalance) {
        self.with_tenant(tenant, |state| {
            state.debtors.retain(|d| d.customer_id != debtor.customer_id);
            if debtor.balance != Cents::ZERO {
                state.debtors.push(debtor);
            }
        });
    }

    /// Make every subsequent config write fail with `reason`; `None` restores
    /// normal behaviour.
    pub fn fail_writes_with(&self, reason: Option<&str>) {
        *self.write_failure.write() = reason.map(str::to_string);
    }

    /// Make every subsequent ledger query fail with `reason`; `None` restores
    /// normal behaviour.
    pub fn fail_ledger_with(&self, reason: Option<&str>) {
        *self.ledger_failure.write() = reason.map(str::to_string);
    }

    /// Number of ledger queries served so far.
    pub fn ledger_query_count(&self) -> u64 {
        self.ledger_queries.load(Ordering::SeqCst)
    }

    /// Number of successful config writes so far.
    pub fn config_write_count(&self) -> u64 {
        self.config_writes.load(Ordering::SeqCst)
    }

    fn with_tenant(&self, tenant: &TenantId, f: impl FnOnce(&mut TenantState)) {
        if let Some(state) = self.tenants.write().get_mut(tenant) {
            f(state);
        }
    }

    fn check_write(&self) -> Result<(), StoreError> {
        match self.write_failure.read().as_deref() {
            Some(reason) => Err(StoreError::Unavailable(reason.to_string())),
            None => Ok(()),
        }
    }

    fn ledger_read<T>(
        &self,
        tenant: &TenantId,
        f: impl FnOnce(&TenantState) -> T,
    ) -> Result<T, StoreError> {
        self.ledger_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.ledger_failure.read().as_deref() {
            return Err(StoreError::Unavailable(reason.to_string()));
        }
        self.tenants
            .read()
            .get(tenant)
            .map(f)
            .ok_or(StoreError::NotFound(*tenant))
    }
}

#[async_trait]
impl ConfigStore for InMemoryStore {
    async fn get_config(&self, tenant: &TenantId) -> Result<ConfigSnapshot, StoreError> {
        self.snapshot(tenant).ok_or(StoreError::NotFound(*tenant))
    }

    async fn update_toggles(&self, tenant: &TenantId, writes: &ToggleSet) -> Result<(), StoreError> {
        self.check_write()?;
        let mut tenants = self.tenants.write();
        let state = tenants.get_mut(tenant).ok_or(StoreError::NotFound(*tenant))?;
        state.snapshot.toggles.merge(writes);
        self.config_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_fiscal_attributes(
        &self,
        tenant: &TenantId,
        attrs: &FiscalAttributeSet,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        let mut tenants = self.tenants.write();
        let state = tenants.get_mut(tenant).ok_or(StoreError::NotFound(*tenant))?;
        state.snapshot.fiscal = attrs.clone();
        self.config_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl OperationalLedger for InMemoryStore {
    async fn open_cash_sessions(&self, tenant: &TenantId) -> Result<Vec<CashSession>, StoreError> {
        self.ledger_read(tenant, |state| state.cash_sessions.clone())
    }

    async fn open_tabs(&self, tenant: &TenantId, kind: TabKind) -> Result<Vec<OrderRef>, StoreError> {
        self.ledger_read(tenant, |state| {
            state
                .orders
                .iter()
                .filter(|o| o.status.is_pending())
                .filter(|o| o.tab_kind == Some(kind) && o.tab_number.is_some())
                .cloned()
                .collect()
        })
    }

    async fn saved_orders(
        &self,
        tenant: &TenantId,
        kind: TabKind,
    ) -> Result<Vec<OrderRef>, StoreError> {
        self.ledger_read(tenant, |state| {
            state
                .orders
                .iter()
                .filter(|o| o.status == OrderStatus::Saved && o.tab_kind == Some(kind))
                .cloned()
                .collect()
        })
    }

    async fn debtor_balances(&self, tenant: &TenantId) -> Result<Vec<DebtorBalance>, StoreError> {
        self.ledger_read(tenant, |state| {
            state
                .debtors
                .iter()
                .filter(|d| d.balance.is_positive())
                .cloned()
                .collect()
        })
    }
}
