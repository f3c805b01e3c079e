//! The process-wide operational state record.
//!
//! The supervisor owns the single instance and passes it by reference; there
//! are no hidden globals. Readers see a consistent snapshot per read (the
//! owner serialises access); mutations happen only through the operations
//! below, each of which yields an [`OpsTransition`] for the audit mirror.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use fxd_schemas::{
    Arm, ConnectivityState, ExecutionHealth, Gate, GlobalMode, ProviderStatus, ReasonCode,
    TickSummary, Why,
};

// ---------------------------------------------------------------------------
// Confirmation phrases
// ---------------------------------------------------------------------------

const CONFIRM_ARM: &str = "ARM";
const CONFIRM_DISARM: &str = "DISARM";
const CONFIRM_KILL: &str = "KILL";

// ---------------------------------------------------------------------------
// Refusals
// ---------------------------------------------------------------------------

/// Why an operational mutation was refused. No partial apply ever happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpsRefusal {
    /// The confirmation phrase did not match the required word.
    ConfirmMismatch { expected: &'static str },
    /// Arming is unreachable while the gate is G0.
    ArmBlockedInG0,
}

impl OpsRefusal {
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            OpsRefusal::ConfirmMismatch { .. } => ReasonCode::GateConfirmMismatch,
            OpsRefusal::ArmBlockedInG0 => ReasonCode::GateArmBlocked,
        }
    }
}

impl fmt::Display for OpsRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpsRefusal::ConfirmMismatch { expected } => {
                write!(f, "REFUSED: confirmation phrase must be {expected:?}")
            }
            OpsRefusal::ArmBlockedInG0 => {
                write!(f, "REFUSED: cannot arm while gate is G0")
            }
        }
    }
}

impl std::error::Error for OpsRefusal {}

// ---------------------------------------------------------------------------
// Transition record
// ---------------------------------------------------------------------------

/// One committed mutation: what changed and why, with before/after views
/// ready for the audit record.
#[derive(Debug, Clone)]
pub struct OpsTransition {
    pub action: &'static str,
    pub before: Value,
    pub after: Value,
    pub why: Why,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpsState {
    pub gate: Gate,
    pub arm: Arm,
    pub global_mode: GlobalMode,
    pub execution_state: ExecutionHealth,
    pub provider_states: BTreeMap<String, ProviderStatus>,
    pub executor_connectivity: ConnectivityState,
    pub mock_mode: bool,
    pub risk_off: bool,
    pub last_tick_result: Option<TickSummary>,
}

impl Default for OpsState {
    fn default() -> Self {
        Self::boot()
    }
}

impl OpsState {
    /// Fail-closed boot posture.
    pub fn boot() -> Self {
        Self {
            gate: Gate::G0,
            arm: Arm::Disarmed,
            global_mode: GlobalMode::Normal,
            execution_state: ExecutionHealth::Ok,
            provider_states: BTreeMap::new(),
            executor_connectivity: ConnectivityState::Unknown,
            mock_mode: true,
            risk_off: false,
            last_tick_result: None,
        }
    }

    /// Commands may leave the process only when the gate is past shadow AND
    /// the system is armed AND risk-off is not engaged.
    pub fn may_send_commands(&self) -> bool {
        self.gate != Gate::G0 && self.arm.is_armed() && !self.risk_off
    }

    fn view(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn transition(&self, action: &'static str, before: Value, why: Why) -> OpsTransition {
        OpsTransition {
            action,
            before,
            after: self.view(),
            why,
        }
    }

    // -----------------------------------------------------------------------
    // Operator actions
    // -----------------------------------------------------------------------

    /// Arm. Requires the literal confirmation phrase and a gate past G0.
    pub fn arm(&mut self, confirm: &str) -> Result<OpsTransition, OpsRefusal> {
        if confirm != CONFIRM_ARM {
            return Err(OpsRefusal::ConfirmMismatch {
                expected: CONFIRM_ARM,
            });
        }
        if self.gate == Gate::G0 {
            return Err(OpsRefusal::ArmBlockedInG0);
        }

        let before = self.view();
        self.arm = Arm::Armed;
        Ok(self.transition("ops.arm", before, Why::from_code(ReasonCode::GateArmed)))
    }

    /// Disarm. Always reachable.
    pub fn disarm(&mut self, confirm: &str) -> Result<OpsTransition, OpsRefusal> {
        if confirm != CONFIRM_DISARM {
            return Err(OpsRefusal::ConfirmMismatch {
                expected: CONFIRM_DISARM,
            });
        }

        let before = self.view();
        self.arm = Arm::Disarmed;
        Ok(self.transition("ops.disarm", before, Why::from_code(ReasonCode::GateDisarmed)))
    }

    /// Kill switch: disarm + risk-off in one committed step.
    pub fn kill(&mut self, confirm: &str) -> Result<OpsTransition, OpsRefusal> {
        if confirm != CONFIRM_KILL {
            return Err(OpsRefusal::ConfirmMismatch {
                expected: CONFIRM_KILL,
            });
        }

        let before = self.view();
        self.arm = Arm::Disarmed;
        self.risk_off = true;
        Ok(self.transition("ops.kill", before, Why::from_code(ReasonCode::GateKillEngaged)))
    }

    /// Clear risk-off after a kill. Arm state is untouched; re-arming is a
    /// separate explicit step.
    pub fn clear_risk_off(&mut self) -> OpsTransition {
        let before = self.view();
        self.risk_off = false;
        self.transition(
            "ops.clear_risk_off",
            before,
            Why::new(ReasonCode::GateDisarmed, "risk-off cleared; still disarmed"),
        )
    }

    /// Commit a gate change validated by the gate authority. Demoting to G0
    /// forces DISARMED.
    pub(crate) fn set_gate(&mut self, gate: Gate, why: Why) -> OpsTransition {
        let before = self.view();
        self.gate = gate;
        if self.gate == Gate::G0 {
            self.arm = Arm::Disarmed;
        }
        self.transition("ops.set_gate", before, why)
    }

    // -----------------------------------------------------------------------
    // Observed-state setters
    // -----------------------------------------------------------------------

    pub fn set_global_mode(&mut self, mode: GlobalMode) {
        self.global_mode = mode;
    }

    pub fn set_execution_state(&mut self, state: ExecutionHealth) {
        self.execution_state = state;
    }

    pub fn set_provider_state(&mut self, symbol: &str, status: ProviderStatus) -> bool {
        let changed = self.provider_states.get(symbol) != Some(&status);
        self.provider_states.insert(symbol.to_string(), status);
        changed
    }

    pub fn set_connectivity(&mut self, connectivity: ConnectivityState) {
        self.executor_connectivity = connectivity;
    }

    pub fn set_mock_mode(&mut self, mock: bool) {
        self.mock_mode = mock;
    }

    pub fn record_tick(&mut self, summary: TickSummary) {
        self.last_tick_result = Some(summary);
    }
}
