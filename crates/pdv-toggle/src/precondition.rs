//! # Deactivation Preconditions
//!
//! A precondition is a read-only query against the tenant's live ledger that
//! reports the resources still depending on a toggle. A non-empty answer
//! means the toggle cannot be disabled.
//!
//! The [`PreconditionRegistry`] maps toggle keys to their preconditions. It is
//! the single extension point for guarded keys: the governor consults the
//! registry and never names resource kinds itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pdv_core::{Cents, DebtorBalance, TenantId, ToggleKey};
use pdv_store::{OperationalLedger, StoreError};

use crate::checks::{OpenCashSessions, OpenTabs, OutstandingDebt};

// ---------------------------------------------------------------------------
// Blocking resources
// ---------------------------------------------------------------------------

/// Kind of live resource that can block a deactivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingKind {
    /// An order holding a tab-ticket.
    Comanda,
    /// An order holding a table.
    Mesa,
    /// An open cash-register session.
    CashSession,
    /// A customer with outstanding store credit.
    Debtor,
}

impl BlockingKind {
    /// Stable name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comanda => "comanda",
            Self::Mesa => "mesa",
            Self::CashSession => "cash_session",
            Self::Debtor => "debtor",
        }
    }
}

impl fmt::Display for BlockingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live resource that prevents a toggle from being disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingResource {
    /// What kind of resource this is.
    pub kind: BlockingKind,
    /// Store identifier of the resource.
    pub identifier: String,
    /// Human-readable label for display.
    pub label: String,
}

/// Outstanding store credit across the tenant's customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtorExposure {
    /// Sum of all outstanding balances.
    pub total: Cents,
    /// Customers with a non-zero balance.
    pub debtors: Vec<DebtorBalance>,
}

/// Result of a precondition query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Blockers {
    /// Individual resources still in use.
    Resources {
        /// The blocking resources, in ledger order.
        resources: Vec<BlockingResource>,
    },
    /// Outstanding customer debt.
    Debt(DebtorExposure),
}

impl Blockers {
    /// No blocking resources.
    pub fn none() -> Self {
        Self::Resources {
            resources: Vec::new(),
        }
    }

    /// Whether the deactivation may proceed. Debt clears once the total
    /// owed is no longer positive.
    pub fn is_clear(&self) -> bool {
        match self {
            Self::Resources { resources } => resources.is_empty(),
            Self::Debt(exposure) => !exposure.total.is_positive(),
        }
    }

    /// Every blocker as a [`BlockingResource`]. Debtors become
    /// [`BlockingKind::Debtor`] entries labelled with their balance.
    pub fn resources(&self) -> Vec<BlockingResource> {
        match self {
            Self::Resources { resources } => resources.clone(),
            Self::Debt(exposure) => exposure
                .debtors
                .iter()
                .map(|d| BlockingResource {
                    kind: BlockingKind::Debtor,
                    identifier: d.customer_id.clone(),
                    label: format!("{}: R$ {}", d.name, d.balance),
                })
                .collect(),
        }
    }

    /// Number of blocking entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Resources { resources } => resources.len(),
            Self::Debt(exposure) => exposure.debtors.len(),
        }
    }

    /// Whether there are no blocking entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Blockers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resources { resources } => {
                let labels: Vec<&str> = resources.iter().map(|r| r.label.as_str()).collect();
                write!(f, "{} blocking resource(s): {}", resources.len(), labels.join(", "))
            }
            Self::Debt(exposure) => write!(
                f,
                "outstanding balance R$ {} across {} customer(s)",
                exposure.total,
                exposure.debtors.len()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Precondition trait and registry
// ---------------------------------------------------------------------------

/// A read-only deactivation check.
///
/// Implementations must be side-effect-free and safe to run concurrently
/// with any other precondition.
#[async_trait]
pub trait Precondition: Send + Sync + fmt::Debug {
    /// Short name used in log events.
    fn name(&self) -> &'static str;

    /// Query the ledger for resources blocking deactivation.
    async fn blockers(&self, tenant: &TenantId) -> Result<Blockers, StoreError>;
}

/// Mapping from toggle key to its deactivation precondition.
#[derive(Debug, Clone, Default)]
pub struct PreconditionRegistry {
    checks: HashMap<ToggleKey, Arc<dyn Precondition>>,
}

impl PreconditionRegistry {
    /// An empty registry: every key transitions freely.
    pub fn new() -> Self {
        Self::default()
    }

    /// The four guarded keys of the PDV configuration:
    ///
    /// | Key | Blocked while |
    /// |-----|---------------|
    /// | `controla_caixa` | any cash-register session is open |
    /// | `comandas` | any order holds a tab-ticket, or a saved order uses one |
    /// | `mesas` | any order holds a table, or a saved order uses one |
    /// | `fiado` | any customer owes store credit |
    pub fn standard(ledger: Arc<dyn OperationalLedger>) -> Self {
        let mut registry = Self::new();
        registry.register(
            ToggleKey::ControlaCaixa,
            Arc::new(OpenCashSessions::new(ledger.clone())),
        );
        registry.register(
            ToggleKey::Comandas,
            Arc::new(OpenTabs::comandas(ledger.clone())),
        );
        registry.register(ToggleKey::Mesas, Arc::new(OpenTabs::mesas(ledger.clone())));
        registry.register(ToggleKey::Fiado, Arc::new(OutstandingDebt::new(ledger)));
        registry
    }

    /// Register (or replace) the precondition for `key`, returning the
    /// previous one.
    pub fn register(
        &mut self,
        key: ToggleKey,
        check: Arc<dyn Precondition>,
    ) -> Option<Arc<dyn Precondition>> {
        self.checks.insert(key, check)
    }

    /// The precondition guarding `key`, if any.
    pub fn get(&self, key: ToggleKey) -> Option<&Arc<dyn Precondition>> {
        self.checks.get(&key)
    }

    /// Guarded keys, in declaration order.
    pub fn guarded_keys(&self) -> Vec<ToggleKey> {
        let mut keys: Vec<_> = self.checks.keys().copied().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdv_store::InMemoryStore;

    #[test]
    fn standard_registry_guards_exactly_four_keys() {
        let registry = PreconditionRegistry::standard(Arc::new(InMemoryStore::new()));
        assert_eq!(
            registry.guarded_keys(),
            vec![
                ToggleKey::Comandas,
                ToggleKey::Mesas,
                ToggleKey::ControlaCaixa,
                ToggleKey::Fiado,
            ]
        );
        assert!(registry.get(ToggleKey::Delivery).is_none());
        assert!(registry.get(ToggleKey::CardapioDigital).is_none());
    }

    #[test]
    fn debt_blockers_expand_to_debtor_resources() {
        let blockers = Blockers::Debt(DebtorExposure {
            total: Cents::parse("150.00").unwrap(),
            debtors: vec![DebtorBalance {
                customer_id: "c1".into(),
                name: "Maria".into(),
                balance: Cents::parse("150.00").unwrap(),
            }],
        });
        assert!(!blockers.is_clear());
        let resources = blockers.resources();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].kind, BlockingKind::Debtor);
        assert_eq!(resources[0].label, "Maria: R$ 150.00");
        assert!(blockers.to_string().contains("150.00"));
    }

    #[test]
    fn debt_netting_to_zero_is_clear() {
        let debtor = |id: &str, amount: &str| DebtorBalance {
            customer_id: id.into(),
            name: id.into(),
            balance: Cents::parse(amount).unwrap(),
        };
        let blockers = Blockers::Debt(DebtorExposure {
            total: Cents::ZERO,
            debtors: vec![debtor("a", "10.00"), debtor("b", "-10.00")],
        });
        assert!(blockers.is_clear());
    }

    #[test]
    fn empty_resources_are_clear() {
        assert!(Blockers::none().is_clear());
        assert!(Blockers::none().is_empty());
    }

    #[test]
    fn blockers_serialize_with_type_tag() {
        let json = serde_json::to_value(Blockers::none()).unwrap();
        assert_eq!(json["type"], "resources");
    }
}
