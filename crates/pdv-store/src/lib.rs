//! # pdv-store -- Data-access contracts for tenant configuration
//!
//! The governance and fiscal engines never talk to a database directly.
//! They consume two narrow contracts:
//!
//! - [`ConfigStore`]: read a tenant's [`ConfigSnapshot`], write toggle groups
//!   and fiscal attribute sets, each as one atomic update.
//! - [`OperationalLedger`]: read-only queries over the tenant's live
//!   transactional state (cash sessions, tabbed orders, customer balances).
//!
//! Two implementations ship with the crate:
//!
//! - [`InMemoryStore`]: process-local, for tests and embedded use.
//! - [`RestStore`]: PostgREST-style HTTP backend (`/rest/v1/<table>`).
//!
//! ## Concurrency
//!
//! Writes are last-write-wins. Neither implementation carries a version or
//! timestamp check; an optimistic-concurrency token belongs at this boundary
//! when a deployment needs one.

pub mod config;
pub mod error;
pub mod memory;
pub mod rest;
pub(crate) mod retry;
mod rows;

pub use config::{ConfigError, StoreConfig};
pub use error::StoreError;
pub use memory::InMemoryStore;
pub use rest::RestStore;

use async_trait::async_trait;
use pdv_core::{
    CashSession, Cents, ConfigSnapshot, DebtorBalance, FiscalAttributeSet, OrderRef, TabKind,
    TenantId, ToggleSet,
};

/// Tenant configuration persistence.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read the tenant's current configuration.
    async fn get_config(&self, tenant: &TenantId) -> Result<ConfigSnapshot, StoreError>;

    /// Write every entry of `writes` in one atomic update.
    async fn update_toggles(&self, tenant: &TenantId, writes: &ToggleSet) -> Result<(), StoreError>;

    /// Overwrite the tenant's fiscal attribute set in one atomic update.
    async fn update_fiscal_attributes(
        &self,
        tenant: &TenantId,
        attrs: &FiscalAttributeSet,
    ) -> Result<(), StoreError>;
}

/// Read-only queries over a tenant's live transactional state.
///
/// Every method is side-effect-free and safe to call concurrently.
#[async_trait]
pub trait OperationalLedger: Send + Sync {
    /// Cash-register sessions currently open.
    async fn open_cash_sessions(&self, tenant: &TenantId) -> Result<Vec<CashSession>, StoreError>;

    /// Pending (open or saved) orders occupying a tab number of `kind`.
    async fn open_tabs(&self, tenant: &TenantId, kind: TabKind) -> Result<Vec<OrderRef>, StoreError>;

    /// Orders in status `saved` opened under `kind`, with or without a number.
    async fn saved_orders(&self, tenant: &TenantId, kind: TabKind)
        -> Result<Vec<OrderRef>, StoreError>;

    /// Customers with a non-zero store-credit balance.
    async fn debtor_balances(&self, tenant: &TenantId) -> Result<Vec<DebtorBalance>, StoreError>;

    /// Number of open cash-register sessions.
    async fn count_open_cash_sessions(&self, tenant: &TenantId) -> Result<usize, StoreError> {
        Ok(self.open_cash_sessions(tenant).await?.len())
    }

    /// Total outstanding store credit together with the debtors behind it.
    async fn sum_debtor_balances(
        &self,
        tenant: &TenantId,
    ) -> Result<(Cents, Vec<DebtorBalance>), StoreError> {
        let debtors = self.debtor_balances(tenant).await?;
        let total = debtors.iter().map(|d| d.balance).sum();
        Ok((total, debtors))
    }
}
