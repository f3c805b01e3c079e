//! Operational-state vocabulary: gate levels, arm state, executor
//! connectivity, actor roles, and the per-tick summary that gates promotion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// How "live" the system is.
///
/// | Gate | Meaning                           |
/// |------|-----------------------------------|
/// | G0   | shadow (no commands ever leave)   |
/// | G1   | paper (simulator only)            |
/// | G2   | live restricted                   |
/// | G3   | live full                         |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gate {
    G0,
    G1,
    G2,
    G3,
}

impl Gate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::G0 => "G0",
            Gate::G1 => "G1",
            Gate::G2 => "G2",
            Gate::G3 => "G3",
        }
    }

    /// Numeric level, G0 = 0.
    pub fn level(&self) -> u8 {
        match self {
            Gate::G0 => 0,
            Gate::G1 => 1,
            Gate::G2 => 2,
            Gate::G3 => 3,
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Arm
// ---------------------------------------------------------------------------

/// Permission to act. ARMED ⇒ commands may be emitted; DISARMED ⇒ never.
/// ARMED is unreachable while the gate is G0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Arm {
    Disarmed,
    Armed,
}

impl Arm {
    pub fn is_armed(&self) -> bool {
        matches!(self, Arm::Armed)
    }
}

// ---------------------------------------------------------------------------
// Connectivity / roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    Unknown,
    Connected,
    Disconnected,
}

/// Authenticated actor role, proved by the boundary and consumed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorRole {
    Admin,
    Operator,
    Viewer,
}

// ---------------------------------------------------------------------------
// Tick summary
// ---------------------------------------------------------------------------

/// What the last tick produced. The gate promotion authority validates its
/// prerequisites against this record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub correlation_id: Uuid,
    pub at: DateTime<Utc>,
    pub has_mcl_snapshot: bool,
    pub has_brain_intent_or_skip: bool,
    pub has_pm_decision: bool,
    pub events_persisted: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_levels_order() {
        assert!(Gate::G0 < Gate::G1);
        assert!(Gate::G2 < Gate::G3);
        assert_eq!(Gate::G0.level(), 0);
        assert_eq!(Gate::G3.level(), 3);
    }

    #[test]
    fn connectivity_serialises_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConnectivityState::Connected).unwrap(),
            "\"connected\""
        );
    }

    #[test]
    fn arm_serialises_screaming() {
        assert_eq!(serde_json::to_string(&Arm::Disarmed).unwrap(), "\"DISARMED\"");
        assert!(Arm::Armed.is_armed());
    }
}
