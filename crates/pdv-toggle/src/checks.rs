//! Standard preconditions over the operational ledger.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use pdv_core::{CashSession, OrderRef, TabKind, TenantId};
use pdv_store::{OperationalLedger, StoreError};

use crate::precondition::{BlockingKind, BlockingResource, Blockers, DebtorExposure, Precondition};

/// Blocks while any cash-register session is open.
#[derive(Clone)]
pub struct OpenCashSessions {
    ledger: Arc<dyn OperationalLedger>,
}

impl OpenCashSessions {
    /// Check against `ledger`.
    pub fn new(ledger: Arc<dyn OperationalLedger>) -> Self {
        Self { ledger }
    }
}

impl std::fmt::Debug for OpenCashSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenCashSessions").finish_non_exhaustive()
    }
}

fn session_resource(session: CashSession) -> BlockingResource {
    let opened = session.opened_at.format("%d/%m/%Y %H:%M");
    let label = match &session.operator {
        Some(operator) => format!("Caixa {} aberto por {operator} em {opened}", session.id),
        None => format!("Caixa {} aberto em {opened}", session.id),
    };
    BlockingResource {
        kind: BlockingKind::CashSession,
        identifier: session.id,
        label,
    }
}

#[async_trait]
impl Precondition for OpenCashSessions {
    fn name(&self) -> &'static str {
        "open_cash_sessions"
    }

    async fn blockers(&self, tenant: &TenantId) -> Result<Blockers, StoreError> {
        let sessions = self.ledger.open_cash_sessions(tenant).await?;
        Ok(Blockers::Resources {
            resources: sessions.into_iter().map(session_resource).collect(),
        })
    }
}

/// Blocks while any order holds a tab of the given kind, or any saved order
/// was opened under it.
///
/// The two ledger queries are independent: an order saved without a tab
/// number still blocks, and an open order with a number blocks even though
/// it is not saved. An order matching both is reported once.
#[derive(Clone)]
pub struct OpenTabs {
    ledger: Arc<dyn OperationalLedger>,
    kind: TabKind,
}

impl OpenTabs {
    /// Tab-ticket check.
    pub fn comandas(ledger: Arc<dyn OperationalLedger>) -> Self {
        Self {
            ledger,
            kind: TabKind::Comanda,
        }
    }

    /// Table check.
    pub fn mesas(ledger: Arc<dyn OperationalLedger>) -> Self {
        Self {
            ledger,
            kind: TabKind::Mesa,
        }
    }

    fn resource(&self, order: OrderRef) -> BlockingResource {
        let (kind, noun) = match self.kind {
            TabKind::Comanda => (BlockingKind::Comanda, "Comanda"),
            TabKind::Mesa => (BlockingKind::Mesa, "Mesa"),
        };
        let label = match &order.tab_number {
            Some(tab) => format!("{noun} {tab} (venda {})", order.number),
            None => format!("{noun} sem número (venda {} salva)", order.number),
        };
        BlockingResource {
            kind,
            identifier: order.id,
            label,
        }
    }
}

impl std::fmt::Debug for OpenTabs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenTabs")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Precondition for OpenTabs {
    fn name(&self) -> &'static str {
        match self.kind {
            TabKind::Comanda => "open_comandas",
            TabKind::Mesa => "open_mesas",
        }
    }

    async fn blockers(&self, tenant: &TenantId) -> Result<Blockers, StoreError> {
        let open = self.ledger.open_tabs(tenant, self.kind).await?;
        let saved = self.ledger.saved_orders(tenant, self.kind).await?;

        let mut seen = HashSet::new();
        let resources = open
            .into_iter()
            .chain(saved)
            .filter(|order| seen.insert(order.id.clone()))
            .map(|order| self.resource(order))
            .collect();
        Ok(Blockers::Resources { resources })
    }
}

/// Blocks while the tenant's customers owe any store credit.
#[derive(Clone)]
pub struct OutstandingDebt {
    ledger: Arc<dyn OperationalLedger>,
}

impl OutstandingDebt {
    /// Check against `ledger`.
    pub fn new(ledger: Arc<dyn OperationalLedger>) -> Self {
        Self { ledger }
    }
}

impl std::fmt::Debug for OutstandingDebt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutstandingDebt").finish_non_exhaustive()
    }
}

#[async_trait]
impl Precondition for OutstandingDebt {
    fn name(&self) -> &'static str {
        "outstanding_debt"
    }

    async fn blockers(&self, tenant: &TenantId) -> Result<Blockers, StoreError> {
        let (total, debtors) = self.ledger.sum_debtor_balances(tenant).await?;
        Ok(Blockers::Debt(DebtorExposure { total, debtors }))
    }
}
