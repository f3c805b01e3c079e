//! The tick orchestrator and the supervisor-owned [`Desk`] record.
//!
//! One tick:
//!
//!   1. fresh correlation id + executor status probe
//!   2. per-symbol fetch (bounded fan-out) → quality gate → snapshot →
//!      `MCL_SNAPSHOT`
//!   3. global-mode update from the snapshot set
//!   4. brain fan-out in fixed order → `BRAIN_INTENT` / `BRAIN_SKIP`
//!   5. PM pass threading one portfolio state → `PM_DECISION`
//!   6. if `may_send_commands`: mapper → executor send → lifecycle
//!      normalisation, all under the tick's correlation id
//!   7. tick summary into operational state (gates promotion)
//!
//! Isolation: a failing symbol, intent, or command is appended as WARN/ERROR
//! and the rest of the tick proceeds. Persist-before-publish: every event is
//! appended to the ledger first; only a successful append is streamed.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use fxd_audit::{to_ledger_event, AuditTrail};
use fxd_brains::{BrainMeta, BrainOutput, BrainRegistry};
use fxd_context::{build_snapshot, compute_metrics, ContextInput};
use fxd_exec::{
    map_commands, EdgeHealthMonitor, EhmAction, EmergencyExit, ExecutorPort, MapperContext,
};
use fxd_ledger::EventLedger;
use fxd_md::{data_quality, fetch_with_retry, BarSource, FetchError};
use fxd_ops::{validate_transition, GateRefusal, OpsRefusal, OpsState, OpsTransition};
use fxd_pm::{evaluate as pm_evaluate, Cooldown, PortfolioState};
use fxd_schemas::{
    ActorRole, AuditRecord, CommandEnvelope, Component, EventProximity, EventType,
    ExecutorCommand, ExecutorLifecycle, Gate, GlobalMode, LedgerEvent, MarketSnapshot,
    ProviderStatus, ReasonCode, RiskLimits, Severity, SymbolBars, TickSummary, Timeframe,
};
use fxd_stream::{StreamHub, Topic};

use crate::global_mode::derive_global_mode;
use crate::lifecycle::normalize_lifecycle;

/// Bounded per-symbol fetch fan-out.
const MAX_FETCH_FANOUT: usize = 4;

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Everything a tick borrows. The desk owns none of it.
pub struct TickDeps<'a> {
    pub ledger: &'a dyn EventLedger,
    pub hub: Option<&'a StreamHub>,
    pub source: &'a dyn BarSource,
    pub registry: &'a BrainRegistry,
    pub executor: &'a dyn ExecutorPort,
}

/// Per-tick inputs supplied by the caller.
pub struct TickArgs {
    pub symbols: Vec<String>,
    pub now: DateTime<Utc>,
    /// From the news-calendar collaborator.
    pub event_proximity: EventProximity,
    pub limits: RiskLimits,
    pub cooldowns: Vec<Cooldown>,
    /// One-shot scenario label, recorded in snapshot payloads. Never stored.
    pub scenario_label: Option<String>,
}

impl TickArgs {
    pub fn new(symbols: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            symbols,
            now,
            event_proximity: EventProximity::None,
            limits: RiskLimits::default(),
            cooldowns: Vec::new(),
            scenario_label: None,
        }
    }
}

/// Authenticated operator identity, proved by the boundary.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

// ---------------------------------------------------------------------------
// Desk
// ---------------------------------------------------------------------------

/// The top-level supervisor record: operational state, edge-health monitor,
/// audit trail, executor view, and the lifecycle inbox. Passed by reference
/// into everything that needs it; no hidden globals.
pub struct Desk {
    pub ops: OpsState,
    ehm: EdgeHealthMonitor,
    trail: AuditTrail,
    executor_strategy: Option<String>,
    executor_symbols: Vec<String>,
    pending_emergency: Option<EmergencyExit>,
    lifecycle_inbox: Arc<Mutex<Vec<ExecutorLifecycle>>>,
}

impl Default for Desk {
    fn default() -> Self {
        Self::new()
    }
}

impl Desk {
    pub fn new() -> Self {
        Self {
            ops: OpsState::boot(),
            ehm: EdgeHealthMonitor::default(),
            trail: AuditTrail::new(),
            executor_strategy: None,
            executor_symbols: Vec::new(),
            pending_emergency: None,
            lifecycle_inbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared inbox for executor lifecycle callbacks. Register it with the
    /// simulator (or the webhook boundary) so `run_tick` can drain events
    /// synchronously per command.
    pub fn lifecycle_inbox(&self) -> Arc<Mutex<Vec<ExecutorLifecycle>>> {
        Arc::clone(&self.lifecycle_inbox)
    }

    /// Best-effort ingest for late lifecycle callbacks (webhook path): the
    /// event is normalised and appended under its own correlation id even
    /// when the originating tick has long returned.
    pub fn ingest_lifecycle(&self, deps: &TickDeps<'_>, event: &ExecutorLifecycle) {
        let mut sink = 0u32;
        persist(deps, normalize_lifecycle(event), &mut sink);
    }

    // -----------------------------------------------------------------------
    // Operator actions (audited)
    // -----------------------------------------------------------------------

    pub fn arm(
        &mut self,
        deps: &TickDeps<'_>,
        actor: &Actor,
        confirm: &str,
    ) -> Result<(), OpsRefusal> {
        let transition = self.ops.arm(confirm)?;
        self.audit_and_mirror(deps, actor, transition, Uuid::new_v4());
        Ok(())
    }

    pub fn disarm(
        &mut self,
        deps: &TickDeps<'_>,
        actor: &Actor,
        confirm: &str,
    ) -> Result<(), OpsRefusal> {
        let transition = self.ops.disarm(confirm)?;
        self.audit_and_mirror(deps, actor, transition, Uuid::new_v4());
        Ok(())
    }

    pub fn kill(
        &mut self,
        deps: &TickDeps<'_>,
        actor: &Actor,
        confirm: &str,
    ) -> Result<(), OpsRefusal> {
        let transition = self.ops.kill(confirm)?;
        self.audit_and_mirror(deps, actor, transition, Uuid::new_v4());
        Ok(())
    }

    pub fn clear_risk_off(&mut self, deps: &TickDeps<'_>, actor: &Actor) {
        let transition = self.ops.clear_risk_off();
        self.audit_and_mirror(deps, actor, transition, Uuid::new_v4());
    }

    /// Validate and commit a gate change. Success writes the audit record
    /// and a config-snapshot event carrying the committed posture.
    pub fn change_gate(
        &mut self,
        deps: &TickDeps<'_>,
        actor: &Actor,
        to: Gate,
    ) -> Result<Gate, GateRefusal> {
        let change = validate_transition(&self.ops, to, actor.role)?;
        let correlation_id = Uuid::new_v4();
        let transition = change.commit(&mut self.ops);
        let posture = transition.after.clone();
        self.audit_and_mirror(deps, actor, transition, correlation_id);

        let mut sink = 0u32;
        persist(
            deps,
            LedgerEvent::new(correlation_id, Utc::now(), EventType::ConfigSnapshot)
                .reason(ReasonCode::AuditConfigSnapshot)
                .payload(json!({ "ops": posture })),
            &mut sink,
        );

        Ok(self.ops.gate)
    }

    fn audit_and_mirror(
        &mut self,
        deps: &TickDeps<'_>,
        actor: &Actor,
        transition: OpsTransition,
        correlation_id: Uuid,
    ) {
        let record = AuditRecord::new(
            Utc::now(),
            actor.user_id.clone(),
            actor.role,
            transition.action,
            "ops/state",
            transition.why.message.clone(),
            transition.before,
            transition.after,
            correlation_id,
        );

        let stamped = match self.trail.stamp(record) {
            Ok(stamped) => stamped,
            Err(err) => {
                error!(error = %err, "audit stamping failed");
                return;
            }
        };

        match deps.ledger.append_audit(&stamped) {
            Ok(_) => {
                if let Some(hub) = deps.hub {
                    hub.publish(Topic::Audit, &stamped);
                }
            }
            Err(err) => error!(error = %err, "audit append failed"),
        }

        match to_ledger_event(&stamped) {
            Ok(event) => {
                let mut sink = 0u32;
                persist(deps, event, &mut sink);
            }
            Err(err) => error!(error = %err, "audit mirror failed"),
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one complete tick over `args.symbols`.
    pub fn run_tick(&mut self, deps: &TickDeps<'_>, args: &TickArgs) -> Result<TickSummary> {
        let correlation_id = Uuid::new_v4();
        let now = args.now;
        let mut persisted = 0u32;
        let mut has_mcl = false;
        let mut has_brain = false;
        let mut has_pm = false;

        // 1. Executor status probe.
        let status = deps.executor.status();
        if self.ops.execution_state != status.state {
            self.ops.set_execution_state(status.state);
            persist(
                deps,
                LedgerEvent::new(correlation_id, now, EventType::ExecStateChange)
                    .severity(Severity::Warn)
                    .reason(ReasonCode::ExecStateChange)
                    .payload(json!({ "status": status })),
                &mut persisted,
            );
        }
        self.ops.set_connectivity(status.connectivity);

        // 2. Fetch + quality + snapshot per symbol.
        let mut snapshots: Vec<MarketSnapshot> = Vec::new();
        let mut metas: Vec<BrainMeta> = Vec::new();

        for (symbol, fetched) in fetch_all(deps.source, &args.symbols) {
            match fetched {
                Err(err) => {
                    self.ops.set_provider_state(&symbol, ProviderStatus::Down);
                    persist(
                        deps,
                        LedgerEvent::new(correlation_id, now, EventType::ProvStateChange)
                            .severity(Severity::Warn)
                            .symbol(symbol.clone())
                            .reason(err.reason_code())
                            .payload(json!({ "error": err.to_string() })),
                        &mut persisted,
                    );
                }
                Ok(bars) => {
                    let (snapshot, meta) = self.symbol_snapshot(
                        deps,
                        args,
                        correlation_id,
                        &symbol,
                        &bars,
                        &mut persisted,
                    );
                    if let (Some(snapshot), Some(meta)) = (snapshot, meta) {
                        has_mcl = true;
                        snapshots.push(snapshot);
                        metas.push(meta);
                    }
                }
            }
        }

        // 3. Global mode from the snapshot set; risk-off overrides.
        let derived = derive_global_mode(&snapshots);
        self.ops.set_global_mode(derived);
        let pm_mode = if self.ops.risk_off {
            GlobalMode::RiskOff
        } else {
            derived
        };
        for snapshot in &mut snapshots {
            snapshot.global_mode = pm_mode;
        }

        // 4. Brain fan-out, fixed order per snapshot.
        let mut proposals = Vec::new();
        for (snapshot, meta) in snapshots.iter().zip(&metas) {
            for brain in deps.registry.iterate_in_fixed_order() {
                match brain.evaluate(snapshot, meta) {
                    BrainOutput::Intent(intent) => {
                        has_brain = true;
                        persist(
                            deps,
                            LedgerEvent::new(correlation_id, now, EventType::BrainIntent)
                                .component(Component::from_brain(intent.brain_id))
                                .symbol(intent.symbol.clone())
                                .brain(intent.brain_id)
                                .reason(intent.why.reason_code)
                                .payload(json!({ "intent": &intent })),
                            &mut persisted,
                        );
                        proposals.push(intent);
                    }
                    BrainOutput::Skip(why) => {
                        has_brain = true;
                        persist(
                            deps,
                            LedgerEvent::new(correlation_id, now, EventType::BrainSkip)
                                .component(Component::from_brain(brain.id()))
                                .symbol(snapshot.symbol.clone())
                                .brain(brain.id())
                                .reason(why.reason_code)
                                .payload(json!({ "message": why.message })),
                            &mut persisted,
                        );
                    }
                }
            }
        }

        // 5. PM pass over the full intent list, one evolving state.
        let mut portfolio = PortfolioState::fresh(args.limits, pm_mode);
        portfolio.cooldowns = args.cooldowns.clone();
        portfolio.executor_health = self.ops.execution_state;

        let mut actionable = Vec::new();
        for intent in proposals {
            let decision = pm_evaluate(&intent, &mut portfolio, now);
            has_pm = true;
            persist(
                deps,
                LedgerEvent::new(correlation_id, now, EventType::PmDecision)
                    .component(Component::Pm)
                    .symbol(intent.symbol.clone())
                    .brain(intent.brain_id)
                    .reason(decision.why.reason_code)
                    .payload(json!({ "decision": &decision })),
                &mut persisted,
            );
            if decision.verdict.is_actionable() {
                actionable.push((decision, intent));
            }
        }

        // 6. Commands, only when the gate and arm permit.
        if self.ops.may_send_commands() {
            for (decision, intent) in &actionable {
                self.dispatch(deps, args, correlation_id, decision, intent, &mut persisted);
            }
        }

        // 7. Tick summary gates promotion.
        let summary = TickSummary {
            correlation_id,
            at: now,
            has_mcl_snapshot: has_mcl,
            has_brain_intent_or_skip: has_brain,
            has_pm_decision: has_pm,
            events_persisted: persisted,
        };
        self.ops.record_tick(summary);
        Ok(summary)
    }

    /// Quality-gate one symbol's series and build its snapshot. `None` when
    /// the data is unusable (DOWN or MARKET_CLOSED).
    fn symbol_snapshot(
        &mut self,
        deps: &TickDeps<'_>,
        args: &TickArgs,
        correlation_id: Uuid,
        symbol: &str,
        bars: &SymbolBars,
        persisted: &mut u32,
    ) -> (Option<MarketSnapshot>, Option<BrainMeta>) {
        let q_h1 = data_quality(&bars.h1, Timeframe::H1, symbol, args.now);
        let q_m15 = data_quality(&bars.m15, Timeframe::M15, symbol, args.now);
        let status = worst_status(q_h1.status, q_m15.status);

        if self.ops.set_provider_state(symbol, status) {
            let severity = match status {
                ProviderStatus::Ok => Severity::Info,
                ProviderStatus::MarketClosed => Severity::Info,
                ProviderStatus::Degraded => Severity::Warn,
                ProviderStatus::Down => Severity::Warn,
            };
            persist(
                deps,
                LedgerEvent::new(correlation_id, args.now, EventType::ProvStateChange)
                    .severity(severity)
                    .symbol(symbol.to_string())
                    .reason(status.reason_code())
                    .payload(json!({ "h1": &q_h1, "m15": &q_m15 })),
                persisted,
            );
        }

        if matches!(status, ProviderStatus::Down | ProviderStatus::MarketClosed) {
            return (None, None);
        }

        let metrics = compute_metrics(bars);
        let input = ContextInput {
            symbol,
            at: args.now,
            h1: &bars.h1,
            m15: &bars.m15,
            metrics,
            event_proximity: args.event_proximity,
            execution_health: self.ops.execution_state,
            global_mode: self.ops.global_mode,
        };
        let snapshot = build_snapshot(&input);

        persist(
            deps,
            LedgerEvent::new(correlation_id, args.now, EventType::MclSnapshot)
                .component(Component::Mcl)
                .symbol(symbol.to_string())
                .reason(snapshot.why.reason_code)
                .payload(json!({
                    "snapshot": &snapshot,
                    "quality": { "h1": &q_h1, "m15": &q_m15 },
                    "scenario": &args.scenario_label,
                })),
            persisted,
        );

        let n = bars.h1.len();
        let ref_price = bars.h1.last().map(|b| b.close).unwrap_or(0.0);
        let momentum = if n >= 3 {
            bars.h1[n - 1].close - bars.h1[n - 3].close
        } else {
            0.0
        };

        (
            Some(snapshot),
            Some(BrainMeta {
                correlation_id,
                at: args.now,
                ref_price,
                momentum,
            }),
        )
    }

    /// Map one actionable decision and walk its commands through the
    /// executor, edge-health monitor, and lifecycle inbox.
    fn dispatch(
        &mut self,
        deps: &TickDeps<'_>,
        args: &TickArgs,
        correlation_id: Uuid,
        decision: &fxd_schemas::Decision,
        intent: &fxd_schemas::Intent,
        persisted: &mut u32,
    ) {
        let emergency = self.pending_emergency.clone();
        let ctx = MapperContext {
            gate: self.ops.gate,
            arm: self.ops.arm,
            risk_off: self.ops.risk_off,
            emergency: emergency.as_ref(),
            current_strategy: self.executor_strategy.as_deref(),
            active_symbols: &self.executor_symbols,
        };
        let output = map_commands(decision, intent, &ctx);

        if output.not_supported {
            persist(
                deps,
                LedgerEvent::new(correlation_id, args.now, EventType::ExecutorEvent)
                    .severity(Severity::Warn)
                    .symbol(intent.symbol.clone())
                    .brain(intent.brain_id)
                    .reason(ReasonCode::ExecOrderFailed)
                    .payload(json!({
                        "status": "NOT_SUPPORTED",
                        "intent_type": intent.intent_type,
                    })),
                persisted,
            );
        }

        let emergency_mapped = emergency.is_some() && !output.commands.is_empty();

        for command in output.commands {
            let envelope = CommandEnvelope::new(command, correlation_id);
            persist(
                deps,
                LedgerEvent::new(correlation_id, args.now, EventType::ExecutorCommand)
                    .symbol(intent.symbol.clone())
                    .reason(ReasonCode::ExecCommandSent)
                    .payload(json!({ "envelope": &envelope })),
                persisted,
            );

            let outcome = deps.executor.send(&envelope);
            if outcome.ok {
                match &envelope.command {
                    ExecutorCommand::SetStrategy { strategy } => {
                        self.executor_strategy = Some(strategy.clone());
                    }
                    ExecutorCommand::SetSymbolsActive { symbols } => {
                        self.executor_symbols = symbols.clone();
                    }
                    _ => {}
                }
            } else {
                warn!(
                    command = envelope.command.command_type().as_str(),
                    code = outcome.reason_code.map(|c| c.as_str()).unwrap_or("?"),
                    "executor send failed"
                );
                persist(
                    deps,
                    LedgerEvent::new(correlation_id, args.now, EventType::ExecutorEvent)
                        .severity(Severity::Error)
                        .symbol(intent.symbol.clone())
                        .reason(outcome.reason_code.unwrap_or(ReasonCode::ExecOrderFailed))
                        .payload(json!({
                            "command": envelope.command.command_type(),
                            "latency_ms": outcome.latency_ms,
                        })),
                    persisted,
                );
            }

            // Edge health folds every outcome.
            let assessment = self.ehm.observe(&outcome);
            if assessment.state_changed {
                self.ops.set_execution_state(assessment.state);
                persist(
                    deps,
                    LedgerEvent::new(correlation_id, args.now, EventType::ExecStateChange)
                        .severity(Severity::Warn)
                        .component(Component::Ehm)
                        .reason(ReasonCode::ExecStateChange)
                        .payload(json!({ "state": assessment.state })),
                    persisted,
                );
            }
            if assessment.action == EhmAction::ExitNow {
                self.pending_emergency = Some(EmergencyExit {
                    symbols: args.symbols.clone(),
                });
                persist(
                    deps,
                    LedgerEvent::new(correlation_id, args.now, EventType::EhmAction)
                        .severity(Severity::Error)
                        .component(Component::Ehm)
                        .reason(ReasonCode::EhmExitNow)
                        .payload(json!({
                            "action": "EXIT_NOW",
                            "symbols": &args.symbols,
                            "message": assessment.why.message,
                        })),
                    persisted,
                );
            }

            // Lifecycle callbacks for this command, same correlation id.
            let callbacks: Vec<ExecutorLifecycle> = self
                .lifecycle_inbox
                .lock()
                .expect("lifecycle inbox poisoned")
                .drain(..)
                .collect();
            for event in callbacks {
                persist(deps, normalize_lifecycle(&event), persisted);
            }
        }

        if emergency_mapped {
            self.pending_emergency = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append then publish. Duplicate ids are silent no-ops; append failures are
/// logged and the tick continues (local recovery is the default policy).
fn persist(deps: &TickDeps<'_>, event: LedgerEvent, persisted: &mut u32) -> bool {
    match deps.ledger.append(&event) {
        Ok(true) => {
            *persisted += 1;
            if let Some(hub) = deps.hub {
                hub.publish(Topic::Ledger, &event);
            }
            true
        }
        Ok(false) => false,
        Err(err) => {
            error!(
                error = %err,
                event_type = event.event_type.as_str(),
                "ledger append failed"
            );
            false
        }
    }
}

fn worst_status(a: ProviderStatus, b: ProviderStatus) -> ProviderStatus {
    fn rank(s: ProviderStatus) -> u8 {
        match s {
            ProviderStatus::Ok => 0,
            ProviderStatus::Degraded => 1,
            ProviderStatus::MarketClosed => 2,
            ProviderStatus::Down => 3,
        }
    }
    if rank(b) > rank(a) {
        b
    } else {
        a
    }
}

/// Fetch all symbols with a bounded thread fan-out. A panicking fetch worker
/// is converted into a transport error for that symbol alone.
fn fetch_all(
    source: &dyn BarSource,
    symbols: &[String],
) -> Vec<(String, Result<SymbolBars, FetchError>)> {
    let mut out = Vec::with_capacity(symbols.len());

    for chunk in symbols.chunks(MAX_FETCH_FANOUT) {
        let mut results = std::thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|symbol| {
                    let symbol = symbol.clone();
                    scope.spawn(move || {
                        let result = fetch_with_retry(source, &symbol);
                        (symbol, result)
                    })
                })
                .collect();

            chunk
                .iter()
                .zip(handles)
                .map(|(symbol, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        (
                            symbol.clone(),
                            Err(FetchError::Transport("fetch worker panicked".to_string())),
                        )
                    })
                })
                .collect::<Vec<_>>()
        });
        out.append(&mut results);
    }

    out
}
