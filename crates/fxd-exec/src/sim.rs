//! Simulated executor.
//!
//! Deterministic in-memory stand-in for the live execution service: no
//! network, no RNG, no imposed latency (nominal figures are reported, not
//! slept). Lifecycle callbacks fire synchronously inside `send`, so a test
//! observes the full FILL → POSITION_OPENED → PNL_UPDATE sequence before
//! the call returns.
//!
//! Health modes:
//!
//! | Mode     | Latency | Errors                      | State    |
//! |----------|---------|-----------------------------|----------|
//! | Normal   | 25 ms   | none                        | OK       |
//! | Degraded | 800 ms  | 7 of every 20 sends fail    | DEGRADED |
//! | Down     | 3000 ms | everything rejected         | BROKEN   |
//!
//! The degraded error cadence is a fixed cycle, not a random draw, so runs
//! replay identically.

use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;

use fxd_schemas::{
    CommandEnvelope, ConnectivityState, ExecutorCommand, ExecutorLifecycle, LifecycleKind,
    ReasonCode, SendOutcome, SetParamsPayload, SetRiskPayload,
};

use crate::port::{derive_execution_state, ExecStatus, ExecutorPort};

// ---------------------------------------------------------------------------
// Health modes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimHealthMode {
    Normal,
    Degraded,
    Down,
}

impl SimHealthMode {
    fn latency_ms(&self) -> u64 {
        match self {
            SimHealthMode::Normal => 25,
            SimHealthMode::Degraded => 800,
            SimHealthMode::Down => 3000,
        }
    }

    fn error_rate(&self) -> f64 {
        match self {
            SimHealthMode::Normal => 0.0,
            SimHealthMode::Degraded => 0.35,
            SimHealthMode::Down => 1.0,
        }
    }
}

/// 7 errors per 20 sends ≈ the degraded error rate, deterministically.
const DEGRADED_ERROR_CYCLE: u64 = 20;
const DEGRADED_ERRORS_PER_CYCLE: u64 = 7;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SimPosition {
    symbol: String,
    quantity: f64,
    entry: f64,
}

#[derive(Default)]
struct SimState {
    armed: bool,
    strategy: Option<String>,
    active_symbols: Vec<String>,
    risk: Option<SetRiskPayload>,
    positions: Vec<SimPosition>,
    sends_today: u64,
    fills_today: u64,
    send_counter: u64,
}

type LifecycleCallback = Box<dyn Fn(&ExecutorLifecycle) + Send + Sync>;

/// The simulator. Interior-mutable so it sits behind the `&self` port trait.
pub struct SimulatedExecutor {
    state: Mutex<SimState>,
    mode: Mutex<SimHealthMode>,
    callbacks: Mutex<Vec<LifecycleCallback>>,
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            mode: Mutex::new(SimHealthMode::Normal),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn set_health_mode(&self, mode: SimHealthMode) {
        *self.mode.lock().expect("sim lock poisoned") = mode;
    }

    pub fn health_mode(&self) -> SimHealthMode {
        *self.mode.lock().expect("sim lock poisoned")
    }

    /// Register an observer for lifecycle events. Delivery is synchronous
    /// inside `send`, in registration order.
    pub fn on_lifecycle(&self, callback: impl Fn(&ExecutorLifecycle) + Send + Sync + 'static) {
        self.callbacks
            .lock()
            .expect("sim lock poisoned")
            .push(Box::new(callback));
    }

    pub fn is_armed(&self) -> bool {
        self.state.lock().expect("sim lock poisoned").armed
    }

    pub fn active_strategy(&self) -> Option<String> {
        self.state
            .lock()
            .expect("sim lock poisoned")
            .strategy
            .clone()
    }

    pub fn active_symbols(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("sim lock poisoned")
            .active_symbols
            .clone()
    }

    pub fn open_position_count(&self) -> usize {
        self.state.lock().expect("sim lock poisoned").positions.len()
    }

    pub fn risk_profile(&self) -> Option<SetRiskPayload> {
        self.state.lock().expect("sim lock poisoned").risk
    }

    fn emit(&self, event: &ExecutorLifecycle) {
        for callback in self.callbacks.lock().expect("sim lock poisoned").iter() {
            callback(event);
        }
    }

    fn lifecycle(
        &self,
        kind: LifecycleKind,
        symbol: &str,
        strategy: &str,
        ledger_tag: &str,
        details: serde_json::Value,
        envelope: &CommandEnvelope,
    ) -> ExecutorLifecycle {
        let mut details = details;
        details["event_type"] = json!(ledger_tag);
        ExecutorLifecycle {
            kind,
            symbol: symbol.to_string(),
            strategy: strategy.to_string(),
            details,
            timestamp: Utc::now(),
            correlation_id: envelope.correlation_id,
        }
    }

    /// SET_PARAMS with a full plan: deterministic FILL → POSITION_OPENED →
    /// PNL_UPDATE(0).
    fn fill_plan(&self, params: &SetParamsPayload, envelope: &CommandEnvelope) {
        let strategy = {
            let mut state = self.state.lock().expect("sim lock poisoned");
            let strategy = state.strategy.clone().unwrap_or_else(|| "NONE".to_string());
            state.positions.push(SimPosition {
                symbol: params.symbol.clone(),
                quantity: params.quantity,
                entry: params.entry,
            });
            state.fills_today += 1;
            strategy
        };

        let fill = self.lifecycle(
            LifecycleKind::OrderFilled,
            &params.symbol,
            &strategy,
            "EXEC_SIMULATED_FILL",
            json!({
                "entry": params.entry,
                "quantity": params.quantity,
                "direction": params.direction,
            }),
            envelope,
        );
        self.emit(&fill);

        let opened = self.lifecycle(
            LifecycleKind::PositionOpened,
            &params.symbol,
            &strategy,
            "EXEC_POSITION_OPENED",
            json!({
                "entry": params.entry,
                "stop": params.stop,
                "target": params.target,
                "quantity": params.quantity,
            }),
            envelope,
        );
        self.emit(&opened);

        let pnl = self.lifecycle(
            LifecycleKind::PnlUpdate,
            &params.symbol,
            &strategy,
            "EXEC_PNL_UPDATE",
            json!({ "pnl": 0.0 }),
            envelope,
        );
        self.emit(&pnl);
    }

    /// CLOSE_DAY: DAY_SUMMARY, then daily counters reset.
    fn close_day(&self, symbols: &[String], envelope: &CommandEnvelope) {
        let (sends, fills, strategy, closed) = {
            let mut state = self.state.lock().expect("sim lock poisoned");
            let closed: Vec<serde_json::Value> = state
                .positions
                .iter()
                .filter(|p| symbols.contains(&p.symbol))
                .map(|p| json!({"symbol": p.symbol, "quantity": p.quantity, "entry": p.entry}))
                .collect();
            let out = (
                state.sends_today,
                state.fills_today,
                state.strategy.clone().unwrap_or_else(|| "NONE".to_string()),
                closed,
            );
            state.positions.retain(|p| !symbols.contains(&p.symbol));
            state.sends_today = 0;
            state.fills_today = 0;
            out
        };

        let summary_symbol = symbols.first().cloned().unwrap_or_default();
        let summary = self.lifecycle(
            LifecycleKind::DaySummary,
            &summary_symbol,
            &strategy,
            "EXEC_DAY_SUMMARY",
            json!({
                "symbols": symbols,
                "sends": sends,
                "fills": fills,
                "closed_positions": closed,
            }),
            envelope,
        );
        self.emit(&summary);
    }
}

impl ExecutorPort for SimulatedExecutor {
    fn name(&self) -> &'static str {
        "simulator"
    }

    fn status(&self) -> ExecStatus {
        let mode = self.health_mode();
        ExecStatus {
            state: derive_execution_state(mode.latency_ms(), mode.error_rate()),
            latency_ms: mode.latency_ms(),
            error_rate: mode.error_rate(),
            connectivity: match mode {
                SimHealthMode::Down => ConnectivityState::Disconnected,
                _ => ConnectivityState::Connected,
            },
        }
    }

    fn send(&self, envelope: &CommandEnvelope) -> SendOutcome {
        let mode = self.health_mode();
        let latency = mode.latency_ms();

        let counter = {
            let mut state = self.state.lock().expect("sim lock poisoned");
            state.sends_today += 1;
            state.send_counter += 1;
            state.send_counter
        };

        match mode {
            SimHealthMode::Down => {
                return SendOutcome::failed(ReasonCode::ExecBroken, latency);
            }
            SimHealthMode::Degraded => {
                if counter % DEGRADED_ERROR_CYCLE < DEGRADED_ERRORS_PER_CYCLE {
                    return SendOutcome::failed(ReasonCode::ExecOrderFailed, latency);
                }
            }
            SimHealthMode::Normal => {}
        }

        match &envelope.command {
            ExecutorCommand::Arm => {
                self.state.lock().expect("sim lock poisoned").armed = true;
            }
            ExecutorCommand::Disarm => {
                self.state.lock().expect("sim lock poisoned").armed = false;
            }
            ExecutorCommand::SetStrategy { strategy } => {
                self.state.lock().expect("sim lock poisoned").strategy = Some(strategy.clone());
            }
            ExecutorCommand::SetRisk(risk) => {
                self.state.lock().expect("sim lock poisoned").risk = Some(*risk);
            }
            ExecutorCommand::SetSymbolsActive { symbols } => {
                self.state.lock().expect("sim lock poisoned").active_symbols = symbols.clone();
            }
            ExecutorCommand::SetParams(params) => {
                self.fill_plan(params, envelope);
            }
            ExecutorCommand::CloseDay { symbols } => {
                self.close_day(symbols, envelope);
            }
        }

        SendOutcome::accepted(latency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxd_schemas::{Direction, ExecutionHealth, Timeframe};
    use std::sync::{Arc, Mutex as StdMutex};
    use uuid::Uuid;

    fn params() -> SetParamsPayload {
        SetParamsPayload {
            symbol: "EURUSD".to_string(),
            direction: Direction::Long,
            entry: 1.1000,
            stop: 1.0950,
            target: 1.1100,
            timeframe: Timeframe::H1,
            quantity: 1.0,
        }
    }

    fn envelope(command: ExecutorCommand) -> CommandEnvelope {
        CommandEnvelope::new(command, Uuid::new_v4())
    }

    fn collect_lifecycle(sim: &SimulatedExecutor) -> Arc<StdMutex<Vec<ExecutorLifecycle>>> {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        sim.on_lifecycle(move |ev| sink.lock().unwrap().push(ev.clone()));
        seen
    }

    #[test]
    fn set_params_emits_fill_opened_pnl_in_order() {
        let sim = SimulatedExecutor::new();
        let seen = collect_lifecycle(&sim);
        let env = envelope(ExecutorCommand::SetParams(params()));

        let outcome = sim.send(&env);
        assert!(outcome.ok);

        let events = seen.lock().unwrap();
        let kinds: Vec<LifecycleKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LifecycleKind::OrderFilled,
                LifecycleKind::PositionOpened,
                LifecycleKind::PnlUpdate,
            ]
        );
        // All under the command's correlation id, zero PnL on open.
        assert!(events.iter().all(|e| e.correlation_id == env.correlation_id));
        assert_eq!(events[2].details["pnl"], 0.0);
        assert_eq!(events[0].details["event_type"], "EXEC_SIMULATED_FILL");
        assert_eq!(sim.open_position_count(), 1);
    }

    #[test]
    fn repeating_from_clean_state_is_identical() {
        let run = || {
            let sim = SimulatedExecutor::new();
            let seen = collect_lifecycle(&sim);
            sim.send(&CommandEnvelope::new(
                ExecutorCommand::SetParams(params()),
                Uuid::nil(),
            ));
            let events = seen.lock().unwrap();
            events
                .iter()
                .map(|e| (e.kind, e.symbol.clone(), e.details["event_type"].clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn close_day_emits_summary_and_resets_counters() {
        let sim = SimulatedExecutor::new();
        sim.send(&envelope(ExecutorCommand::SetStrategy {
            strategy: "FXD_A2".to_string(),
        }));
        sim.send(&envelope(ExecutorCommand::SetParams(params())));

        let seen = collect_lifecycle(&sim);
        sim.send(&envelope(ExecutorCommand::CloseDay {
            symbols: vec!["EURUSD".to_string()],
        }));

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, LifecycleKind::DaySummary);
        assert_eq!(events[0].details["fills"], 1);
        assert_eq!(sim.open_position_count(), 0, "positions flattened");

        drop(events);
        // Counters were reset: a fresh close-day reports zero fills.
        let seen2 = collect_lifecycle(&sim);
        sim.send(&envelope(ExecutorCommand::CloseDay {
            symbols: vec!["EURUSD".to_string()],
        }));
        let events2 = seen2.lock().unwrap();
        assert_eq!(events2.last().unwrap().details["fills"], 0);
    }

    #[test]
    fn command_surface_mutates_profile() {
        let sim = SimulatedExecutor::new();
        sim.send(&envelope(ExecutorCommand::SetStrategy {
            strategy: "FXD_B3".to_string(),
        }));
        sim.send(&envelope(ExecutorCommand::SetSymbolsActive {
            symbols: vec!["EURUSD".to_string(), "GBPUSD".to_string()],
        }));
        sim.send(&envelope(ExecutorCommand::SetRisk(SetRiskPayload {
            risk_pct: 0.3,
        })));
        sim.send(&envelope(ExecutorCommand::Arm));

        assert_eq!(sim.active_strategy().as_deref(), Some("FXD_B3"));
        assert_eq!(sim.active_symbols().len(), 2);
        assert_eq!(sim.risk_profile().unwrap().risk_pct, 0.3);
        assert!(sim.is_armed());

        sim.send(&envelope(ExecutorCommand::Disarm));
        assert!(!sim.is_armed());
    }

    #[test]
    fn down_mode_rejects_everything() {
        let sim = SimulatedExecutor::new();
        sim.set_health_mode(SimHealthMode::Down);

        let outcome = sim.send(&envelope(ExecutorCommand::Arm));
        assert!(!outcome.ok);
        assert_eq!(outcome.reason_code, Some(ReasonCode::ExecBroken));
        assert!(!sim.is_armed(), "rejected command has no effect");

        let status = sim.status();
        assert_eq!(status.state, ExecutionHealth::Broken);
        assert_eq!(status.connectivity, ConnectivityState::Disconnected);
    }

    #[test]
    fn degraded_mode_fails_a_deterministic_fraction() {
        let sim = SimulatedExecutor::new();
        sim.set_health_mode(SimHealthMode::Degraded);

        let mut failures = 0;
        for _ in 0..40 {
            if !sim.send(&envelope(ExecutorCommand::Arm)).ok {
                failures += 1;
            }
        }
        // 7 per 20 over two full cycles.
        assert_eq!(failures, 14);
        assert_eq!(sim.status().state, ExecutionHealth::Degraded);
    }

    #[test]
    fn status_reflects_mode() {
        let sim = SimulatedExecutor::new();
        assert_eq!(sim.status().state, ExecutionHealth::Ok);
        assert_eq!(sim.status().latency_ms, 25);

        sim.set_health_mode(SimHealthMode::Degraded);
        assert_eq!(sim.status().state, ExecutionHealth::Degraded);
        assert_eq!(sim.status().latency_ms, 800);
    }
}
