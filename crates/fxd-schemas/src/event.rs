//! The ledger event envelope (the sole persisted record) plus the
//! replay-day record derived from a day's events.
//!
//! # Invariants
//!
//! - `event_id` is unique across the ledger; re-appending an existing id is
//!   a no-op (enforced by the ledger, not here).
//! - `correlation_id` is shared by every event of one tick or one operator
//!   action; ordering within a correlation is append order.
//! - `payload` is opaque: stored verbatim, returned untouched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::reason::ReasonCode;
use crate::trade::BrainId;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Event type tags (closed set)
// ---------------------------------------------------------------------------

/// The closed set of event-type tags. Exactly the tags of the external
/// contract; adding one here is a contract revision, not a refactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    MclSnapshot,
    BrainIntent,
    BrainSkip,
    PmDecision,
    EhmAction,
    ExecStateChange,
    ProvStateChange,
    ExecutorCommand,
    ExecutorEvent,
    ExecSimulatedFill,
    ExecPositionOpened,
    ExecPositionClosed,
    ExecPositionUpdated,
    ExecPnlUpdate,
    ExecDaySummary,
    ConfigSnapshot,
    AuditLog,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        use EventType::*;
        match self {
            MclSnapshot => "MCL_SNAPSHOT",
            BrainIntent => "BRAIN_INTENT",
            BrainSkip => "BRAIN_SKIP",
            PmDecision => "PM_DECISION",
            EhmAction => "EHM_ACTION",
            ExecStateChange => "EXEC_STATE_CHANGE",
            ProvStateChange => "PROV_STATE_CHANGE",
            ExecutorCommand => "EXECUTOR_COMMAND",
            ExecutorEvent => "EXECUTOR_EVENT",
            ExecSimulatedFill => "EXEC_SIMULATED_FILL",
            ExecPositionOpened => "EXEC_POSITION_OPENED",
            ExecPositionClosed => "EXEC_POSITION_CLOSED",
            ExecPositionUpdated => "EXEC_POSITION_UPDATED",
            ExecPnlUpdate => "EXEC_PNL_UPDATE",
            ExecDaySummary => "EXEC_DAY_SUMMARY",
            ConfigSnapshot => "CONFIG_SNAPSHOT",
            AuditLog => "AUDIT_LOG",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Component tags
// ---------------------------------------------------------------------------

/// The component that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Component {
    Mcl,
    A2,
    B3,
    C3,
    D2,
    Pm,
    Ehm,
    System,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Mcl => "MCL",
            Component::A2 => "A2",
            Component::B3 => "B3",
            Component::C3 => "C3",
            Component::D2 => "D2",
            Component::Pm => "PM",
            Component::Ehm => "EHM",
            Component::System => "SYSTEM",
        }
    }

    pub fn from_brain(brain: BrainId) -> Self {
        match brain {
            BrainId::A2 => Component::A2,
            BrainId::B3 => Component::B3,
            BrainId::C3 => Component::C3,
            BrainId::D2 => Component::D2,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ledger event
// ---------------------------------------------------------------------------

/// The persisted (and streamed) event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub event_id: Uuid,
    pub correlation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub event_type: EventType,
    pub component: Component,
    pub symbol: Option<String>,
    pub brain_id: Option<BrainId>,
    pub reason_code: Option<ReasonCode>,
    /// Opaque document; stored verbatim, returned untouched.
    pub payload: Value,
}

impl LedgerEvent {
    /// Start a builder with the mandatory fields; the rest default to
    /// INFO / SYSTEM / no symbol / no brain / no reason / empty payload.
    pub fn new(correlation_id: Uuid, timestamp: DateTime<Utc>, event_type: EventType) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            correlation_id,
            timestamp,
            severity: Severity::Info,
            event_type,
            component: Component::System,
            symbol: None,
            brain_id: None,
            reason_code: None,
            payload: Value::Object(Default::default()),
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn component(mut self, component: Component) -> Self {
        self.component = component;
        self
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn brain(mut self, brain: BrainId) -> Self {
        self.brain_id = Some(brain);
        self
    }

    pub fn reason(mut self, code: ReasonCode) -> Self {
        self.reason_code = Some(code);
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// Replay day
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStatus {
    Complete,
    Partial,
}

impl ReplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplayStatus::Complete => "complete",
            ReplayStatus::Partial => "partial",
        }
    }
}

/// Per-day replay record derived from the day's ledger events.
///
/// `status == Complete` ⇔ the day contains at least one MCL snapshot AND at
/// least one brain intent-or-skip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDay {
    pub date: NaiveDate,
    pub status: ReplayStatus,
    pub summary: Value,
}
