//! # Operational Ledger Records
//!
//! Read-only views of the tenant's live transactional state: cash-register
//! sessions, orders attached to tabs or tables, and customer balances on
//! store credit. Deactivation preconditions are evaluated against these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Cents;

/// Kind of service tab an order can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabKind {
    /// Tab-ticket (comanda).
    Comanda,
    /// Table (mesa).
    Mesa,
}

impl TabKind {
    /// Stored name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comanda => "comanda",
            Self::Mesa => "mesa",
        }
    }
}

impl std::fmt::Display for TabKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an order in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Being rung up.
    #[serde(rename = "aberta")]
    Open,
    /// Parked for later completion.
    #[serde(rename = "salva")]
    Saved,
    /// Paid and closed.
    #[serde(rename = "finalizada")]
    Finalized,
    /// Cancelled.
    #[serde(rename = "cancelada")]
    Cancelled,
}

impl OrderStatus {
    /// Whether the order still holds its tab.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Open | Self::Saved)
    }
}

/// An order as seen by the precondition queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    /// Store identifier of the order.
    pub id: String,
    /// Human-facing sale number.
    pub number: String,
    /// Current status.
    pub status: OrderStatus,
    /// Service mode the order was opened under, if any.
    pub tab_kind: Option<TabKind>,
    /// Tab or table number the order occupies, if any.
    pub tab_number: Option<String>,
}

/// An open cash-register session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashSession {
    /// Store identifier of the session.
    pub id: String,
    /// Operator who opened the session.
    pub operator: Option<String>,
    /// When the session was opened.
    pub opened_at: DateTime<Utc>,
}

/// A customer with an outstanding store-credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtorBalance {
    /// Store identifier of the customer.
    pub customer_id: String,
    /// Customer display name.
    pub name: String,
    /// Outstanding balance.
    pub balance: Cents,
}
