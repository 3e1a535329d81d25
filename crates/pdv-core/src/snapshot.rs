//! # Configuration Snapshot
//!
//! The request-scoped copy of a tenant's configuration. Callers fetch one
//! from the config store, pass it by value into the governor or the fiscal
//! resolver, and discard it when the request ends.

use serde::{Deserialize, Serialize};

use crate::fiscal::FiscalAttributeSet;
use crate::identity::TenantId;
use crate::toggle::ToggleSet;

/// Tenant configuration as read in a single store call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Registered tax regime code (CRT).
    pub regime_code: i32,
    /// Current toggle values.
    pub toggles: ToggleSet,
    /// Current sale-without-product fiscal attributes.
    pub fiscal: FiscalAttributeSet,
}

impl ConfigSnapshot {
    /// Snapshot of a freshly provisioned tenant: every toggle `false`,
    /// fiscal attributes at their defaults.
    pub fn provisioned(tenant_id: TenantId, regime_code: i32) -> Self {
        Self {
            tenant_id,
            regime_code,
            toggles: ToggleSet::new(),
            fiscal: FiscalAttributeSet::default(),
        }
    }
}
