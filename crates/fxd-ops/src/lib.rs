//! Operational state and the gate promotion authority.
//!
//! # Invariants
//!
//! - Boot is fail-closed: gate G0, arm DISARMED, connectivity unknown. A
//!   restart never inherits a live posture.
//! - ARMED is unreachable while the gate is G0; committing a demotion to G0
//!   forces DISARMED.
//! - `kill` = disarm + risk-off, and risk-off stays set until explicitly
//!   cleared.
//! - Every mutation goes through a named operation that returns a structured
//!   transition (before/after views) for auditing; there are no ad-hoc field
//!   writes from outside this crate.

pub mod gate;
pub mod state;

pub use gate::{validate_transition, GateChange, GateRefusal};
pub use state::{OpsRefusal, OpsState, OpsTransition};
