//! Portfolio manager: one intent plus the evolving in-tick portfolio state
//! in, one decision out.
//!
//! # Invariants
//!
//! - The guard chain runs in a fixed order (global mode, cooldown,
//!   correlation, hard caps, per-symbol/currency caps, fit, queue); the
//!   first breach decides.
//! - ALLOW/MODIFY mutate the state so the next intent of the same tick sees
//!   the new exposure and position count; DENY/QUEUE leave it untouched.
//! - A numeric fault (NaN, ∞) never escapes: it becomes a DENY with
//!   `PM_INTERNAL_ERROR` and the tick continues.

pub mod currency;
pub mod engine;
pub mod state;

pub use engine::evaluate;
pub use state::{Cooldown, PortfolioState};
