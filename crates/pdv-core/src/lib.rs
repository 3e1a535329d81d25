//! # pdv-core -- Foundational Types for the PDV Settings Engine
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies, only `serde`, `serde_json`, `thiserror`, `chrono` and
//! `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Enum-keyed toggles.** Feature toggles are addressed by [`ToggleKey`],
//!    never by free-form column names. An unknown key is a parse error at the
//!    boundary, not a silently ignored write.
//!
//! 2. **Fixed-point arithmetic.** Money ([`Cents`]), percentages ([`Rate`]) and
//!    weights ([`Weight`]) are integers in minor units. Floats never enter the
//!    fiscal computations.
//!
//! 3. **Request-scoped snapshots.** Tenant configuration travels as a
//!    [`ConfigSnapshot`] value passed into each call. There is no global
//!    configuration state.
//!
//! 4. **[`PdvError`] hierarchy.** Structured errors with `thiserror`, no
//!    `.unwrap()` outside tests.

pub mod error;
pub mod fiscal;
pub mod identity;
pub mod ledger;
pub mod money;
pub mod snapshot;
pub mod toggle;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{PdvError, ValidationError};
pub use fiscal::{FiscalAttributeSet, TaxSituation};
pub use identity::TenantId;
pub use ledger::{CashSession, DebtorBalance, OrderRef, OrderStatus, TabKind};
pub use money::{Cents, Rate, Weight};
pub use snapshot::ConfigSnapshot;
pub use toggle::{ToggleKey, ToggleSet};
