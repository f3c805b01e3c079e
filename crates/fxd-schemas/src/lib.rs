//! Shared wire shapes for the fxdesk decision engine.
//!
//! Everything that crosses a subsystem boundary lives here: the ledger event
//! envelope, the closed enum catalogues (event type, severity, component,
//! gate, arm, verdict, intent, command), the reason-code catalogue, market
//! bars and snapshots, intents and decisions, executor command and lifecycle
//! envelopes, the audit record, and the replay-day record.
//!
//! This crate is deliberately logic-free: no IO, no clock, no classification.
//! Engines consume and produce these types; they do not extend them.

pub mod audit;
pub mod command;
pub mod event;
pub mod market;
pub mod ops;
pub mod reason;
pub mod trade;

pub use audit::AuditRecord;
pub use command::{
    CommandEnvelope, CommandType, ExecutorCommand, ExecutorLifecycle, LifecycleKind, SendOutcome,
    SetParamsPayload, SetRiskPayload,
};
pub use event::{
    Component, EventType, LedgerEvent, ReplayDay, ReplayStatus, Severity,
};
pub use market::{
    Bar, EventProximity, ExecutionHealth, GlobalMode, LiquidityPhase, MarketSnapshot,
    MarketStructure, ProviderStatus, Session, SnapshotMetrics, SymbolBars, Timeframe,
    VolatilityBand,
};
pub use ops::{ActorRole, Arm, ConnectivityState, Gate, TickSummary};
pub use reason::{ReasonCode, Why};
pub use trade::{
    BrainId, Decision, Direction, Intent, IntentConstraints, IntentType, OpenPosition,
    RiskAdjustment, RiskLimits, RiskStateSnapshot, TradePlan, Verdict,
};
