//! # pdv-toggle -- Feature-toggle governance
//!
//! Decides whether an operational toggle of the PDV terminal may change,
//! given the tenant's live transactional state, and carries the change
//! through an optimistic local apply and a single atomic store write.
//!
//! ## Architecture
//!
//! - [`PreconditionRegistry`] maps guarded keys to read-only ledger queries
//!   ([`Precondition`]). The standard registry guards `controla_caixa`,
//!   `comandas`, `mesas` and `fiado`; every other key transitions freely.
//! - [`MutualExclusionGroup`] keeps at most one member enabled; enabling a
//!   member writes the whole group.
//! - [`ToggleGovernor`] runs plan, check, apply and persist for one request
//!   and holds no state between requests.
//! - [`LocalToggleView`] is the caller-owned copy the governor applies to;
//!   [`RollbackToken`] undoes a failed apply.
//!
//! ## Usage
//!
//! ```ignore
//! let governor = ToggleGovernor::standard(store.clone(), ledger.clone());
//! let mut view = governor.load_view(&tenant).await?;
//! let result = governor.request_change(&mut view, ToggleKey::Fiado, false).await;
//! let change = view.settle(result)?;
//! ```

pub mod checks;
pub mod error;
pub mod governor;
pub mod group;
pub mod precondition;
pub mod view;

pub use checks::{OpenCashSessions, OpenTabs, OutstandingDebt};
pub use error::GovernanceError;
pub use governor::{AppliedChange, ToggleGovernor};
pub use group::MutualExclusionGroup;
pub use precondition::{
    BlockingKind, BlockingResource, Blockers, DebtorExposure, Precondition, PreconditionRegistry,
};
pub use view::{LocalToggleView, RollbackToken};
