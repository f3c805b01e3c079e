//! Executor-facing envelopes: typed commands going out, lifecycle events
//! coming back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::market::Timeframe;
use crate::reason::ReasonCode;
use crate::trade::Direction;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// The closed set of command tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Arm,
    Disarm,
    SetStrategy,
    SetParams,
    SetRisk,
    SetSymbolsActive,
    CloseDay,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Arm => "ARM",
            CommandType::Disarm => "DISARM",
            CommandType::SetStrategy => "SET_STRATEGY",
            CommandType::SetParams => "SET_PARAMS",
            CommandType::SetRisk => "SET_RISK",
            CommandType::SetSymbolsActive => "SET_SYMBOLS_ACTIVE",
            CommandType::CloseDay => "CLOSE_DAY",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trade parameters carried by SET_PARAMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetParamsPayload {
    pub symbol: String,
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub timeframe: Timeframe,
    pub quantity: f64,
}

/// Risk profile carried by SET_RISK.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetRiskPayload {
    pub risk_pct: f64,
}

/// A typed executor command. Serialises as `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutorCommand {
    Arm,
    Disarm,
    SetStrategy { strategy: String },
    SetParams(SetParamsPayload),
    SetRisk(SetRiskPayload),
    SetSymbolsActive { symbols: Vec<String> },
    CloseDay { symbols: Vec<String> },
}

impl ExecutorCommand {
    pub fn command_type(&self) -> CommandType {
        match self {
            ExecutorCommand::Arm => CommandType::Arm,
            ExecutorCommand::Disarm => CommandType::Disarm,
            ExecutorCommand::SetStrategy { .. } => CommandType::SetStrategy,
            ExecutorCommand::SetParams(_) => CommandType::SetParams,
            ExecutorCommand::SetRisk(_) => CommandType::SetRisk,
            ExecutorCommand::SetSymbolsActive { .. } => CommandType::SetSymbolsActive,
            ExecutorCommand::CloseDay { .. } => CommandType::CloseDay,
        }
    }
}

/// The wire envelope sent to the executor port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    #[serde(flatten)]
    pub command: ExecutorCommand,
    pub correlation_id: Uuid,
}

impl CommandEnvelope {
    pub fn new(command: ExecutorCommand, correlation_id: Uuid) -> Self {
        Self {
            command,
            correlation_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle events
// ---------------------------------------------------------------------------

/// Asynchronous lifecycle event kinds reported by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleKind {
    OrderFilled,
    SlHit,
    TpHit,
    PositionOpened,
    PositionClosed,
    PositionUpdated,
    PnlUpdate,
    DaySummary,
    Info,
    Error,
}

impl LifecycleKind {
    pub fn as_str(&self) -> &'static str {
        use LifecycleKind::*;
        match self {
            OrderFilled => "ORDER_FILLED",
            SlHit => "SL_HIT",
            TpHit => "TP_HIT",
            PositionOpened => "POSITION_OPENED",
            PositionClosed => "POSITION_CLOSED",
            PositionUpdated => "POSITION_UPDATED",
            PnlUpdate => "PNL_UPDATE",
            DaySummary => "DAY_SUMMARY",
            Info => "INFO",
            Error => "ERROR",
        }
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The lifecycle envelope delivered back from the executor port.
///
/// `details` is opaque except for the optional `event_type` key: when present
/// and drawn from the `EXEC_*` ledger tags, the tick orchestrator normalises
/// the lifecycle into an explicit ledger event of that type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorLifecycle {
    #[serde(rename = "type")]
    pub kind: LifecycleKind,
    pub symbol: String,
    pub strategy: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
}

// ---------------------------------------------------------------------------
// Send outcome
// ---------------------------------------------------------------------------

/// Typed result of one executor call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub ok: bool,
    pub reason_code: Option<ReasonCode>,
    pub latency_ms: u64,
}

impl SendOutcome {
    pub fn accepted(latency_ms: u64) -> Self {
        Self {
            ok: true,
            reason_code: None,
            latency_ms,
        }
    }

    pub fn failed(code: ReasonCode, latency_ms: u64) -> Self {
        Self {
            ok: false,
            reason_code: Some(code),
            latency_ms,
        }
    }
}
