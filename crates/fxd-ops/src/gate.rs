//! Gate promotion authority.
//!
//! Validates a requested gate transition against the operational state:
//!
//! - Demotion is always allowed; committing a demotion to G0 forces
//!   DISARMED (enforced in `OpsState::set_gate`).
//! - Promotion must raise the gate by exactly one step and requires, against
//!   the most recent tick: an MCL snapshot, a brain intent-or-skip, a PM
//!   decision, at least one persisted event, executor connectivity
//!   `connected`, and the Admin role. Any missing prerequisite refuses the
//!   transition with the structured list of missing codes; nothing mutates.

use std::fmt;

use fxd_schemas::{ActorRole, ConnectivityState, Gate, ReasonCode, Why};

use crate::state::{OpsState, OpsTransition};

// ---------------------------------------------------------------------------
// Refusal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRefusal {
    /// Promotion attempted by a non-Admin actor.
    RoleForbidden { role: ActorRole },
    /// Promotion must be by exactly one step.
    StepInvalid { from: Gate, to: Gate },
    /// One or more prerequisites are missing; the codes say which.
    PrereqMissing { missing: Vec<ReasonCode> },
}

impl GateRefusal {
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            GateRefusal::RoleForbidden { .. } => ReasonCode::GateRoleForbidden,
            GateRefusal::StepInvalid { .. } => ReasonCode::GateStepInvalid,
            GateRefusal::PrereqMissing { missing } => missing
                .first()
                .copied()
                .unwrap_or(ReasonCode::GateStepInvalid),
        }
    }
}

impl fmt::Display for GateRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateRefusal::RoleForbidden { role } => {
                write!(f, "GATE_REFUSED: role {role:?} may not change the gate")
            }
            GateRefusal::StepInvalid { from, to } => {
                write!(f, "GATE_REFUSED: {from} -> {to} is not a single-step promotion")
            }
            GateRefusal::PrereqMissing { missing } => {
                let codes: Vec<&str> = missing.iter().map(|c| c.as_str()).collect();
                write!(f, "GATE_REFUSED: missing prerequisites [{}]", codes.join(", "))
            }
        }
    }
}

impl std::error::Error for GateRefusal {}

// ---------------------------------------------------------------------------
// Validated change
// ---------------------------------------------------------------------------

/// A validated transition, ready to commit.
#[derive(Debug, Clone, PartialEq)]
pub struct GateChange {
    pub from: Gate,
    pub to: Gate,
    pub demotion: bool,
    pub why: Why,
}

impl GateChange {
    /// Commit onto the state; returns the transition for the audit mirror.
    pub fn commit(self, state: &mut OpsState) -> OpsTransition {
        state.set_gate(self.to, self.why)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate `state.gate -> to` for `role`. Read-only: commit happens via
/// [`GateChange::commit`].
pub fn validate_transition(
    state: &OpsState,
    to: Gate,
    role: ActorRole,
) -> Result<GateChange, GateRefusal> {
    let from = state.gate;

    // Demotion (including no-op handled below) is always allowed.
    if to < from {
        return Ok(GateChange {
            from,
            to,
            demotion: true,
            why: Why::new(
                ReasonCode::GateDemoted,
                format!("gate demoted {from} -> {to}"),
            ),
        });
    }

    // Promotion must be exactly one step (same-gate requests included).
    if to.level() != from.level() + 1 {
        return Err(GateRefusal::StepInvalid { from, to });
    }

    if role != ActorRole::Admin {
        return Err(GateRefusal::RoleForbidden { role });
    }

    // Prerequisites against the most recent tick, in contract order.
    let mut missing = Vec::new();
    match &state.last_tick_result {
        None => {
            missing.push(ReasonCode::GatePrereqMissingMclSnapshot);
            missing.push(ReasonCode::GatePrereqMissingBrainIntent);
            missing.push(ReasonCode::GatePrereqMissingPmDecision);
            missing.push(ReasonCode::GatePrereqMissingLedger);
        }
        Some(tick) => {
            if !tick.has_mcl_snapshot {
                missing.push(ReasonCode::GatePrereqMissingMclSnapshot);
            }
            if !tick.has_brain_intent_or_skip {
                missing.push(ReasonCode::GatePrereqMissingBrainIntent);
            }
            if !tick.has_pm_decision {
                missing.push(ReasonCode::GatePrereqMissingPmDecision);
            }
            if tick.events_persisted == 0 {
                missing.push(ReasonCode::GatePrereqMissingLedger);
            }
        }
    }
    if state.executor_connectivity != ConnectivityState::Connected {
        missing.push(ReasonCode::GatePrereqMissingExecutor);
    }

    if !missing.is_empty() {
        return Err(GateRefusal::PrereqMissing { missing });
    }

    Ok(GateChange {
        from,
        to,
        demotion: false,
        why: Why::new(
            ReasonCode::GatePromoted,
            format!("gate promoted {from} -> {to}"),
        ),
    })
}
