//! Tick orchestration: sequences market data → context → brains → portfolio
//! manager → command mapper → executor for one tick, persists every step to
//! the ledger, and streams it live.
//!
//! The [`Desk`] is the top-level supervisor record: it owns the operational
//! state, the edge-health monitor, the audit trail, and the executor view.
//! There are no hidden globals; everything else is passed in by reference
//! through [`TickDeps`].

pub mod global_mode;
pub mod lifecycle;
pub mod orchestrator;

pub use global_mode::derive_global_mode;
pub use lifecycle::normalize_lifecycle;
pub use orchestrator::{Actor, Desk, TickArgs, TickDeps};
