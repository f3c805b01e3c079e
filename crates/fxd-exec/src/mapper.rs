//! Command mapper: pure function from (decision, intent, operational view)
//! to the ordered executor command list.
//!
//! Rules, evaluated in order:
//!
//!   1. Gate G0 or risk-off ⇒ no commands, unconditionally.
//!   2. EXIT_NOW emergency ⇒ a single CLOSE_DAY carrying the affected
//!      symbols, nothing else.
//!   3. Verdict not actionable (DENY/QUEUE) ⇒ no commands.
//!   4. CLOSE intents ⇒ no commands (position lifecycle belongs to the
//!      executor).
//!   5. Otherwise, in this fixed order: SET_STRATEGY (only when different
//!      from current), SET_PARAMS, SET_RISK (only when the PM adjusted),
//!      SET_SYMBOLS_ACTIVE (adding the symbol), ARM (only when disarmed and
//!      the gate is at least G1).
//!
//! The mapper never invents a command outside the enumerated set: an intent
//! the command set cannot express (HEDGE) yields no commands and raises the
//! `not_supported` flag so the orchestrator can ledger it.

use fxd_schemas::{
    Arm, Decision, Direction, ExecutorCommand, Gate, Intent, IntentType, SetParamsPayload,
    SetRiskPayload,
};

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

/// EXIT_NOW emergency raised by the edge-health monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyExit {
    pub symbols: Vec<String>,
}

/// The operational view the mapper reads. All fields are plain values; the
/// mapper holds no state and reads no clock.
#[derive(Debug, Clone)]
pub struct MapperContext<'a> {
    pub gate: Gate,
    pub arm: Arm,
    pub risk_off: bool,
    pub emergency: Option<&'a EmergencyExit>,
    /// Strategy currently set on the executor, if known.
    pub current_strategy: Option<&'a str>,
    /// Symbols currently active on the executor.
    pub active_symbols: &'a [String],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapperOutput {
    pub commands: Vec<ExecutorCommand>,
    /// The intent asked for something the command set cannot express; the
    /// orchestrator ledgers it as NOT_SUPPORTED.
    pub not_supported: bool,
}

impl MapperOutput {
    fn empty() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Strategy label per brain.
pub fn strategy_for(intent: &Intent) -> String {
    format!("FXD_{}", intent.brain_id)
}

/// Lot size for a granted risk percentage (one lot per half percent).
fn quantity_for(granted_pct: f64) -> f64 {
    (granted_pct / 0.5).max(0.0)
}

/// Map one decision to its ordered command list.
pub fn map_commands(decision: &Decision, intent: &Intent, ctx: &MapperContext<'_>) -> MapperOutput {
    // 1. Shadow gate / risk-off: nothing ever leaves.
    if ctx.gate == Gate::G0 || ctx.risk_off {
        return MapperOutput::empty();
    }

    // 2. Edge-health emergency preempts everything else.
    if let Some(emergency) = ctx.emergency {
        return MapperOutput {
            commands: vec![ExecutorCommand::CloseDay {
                symbols: emergency.symbols.clone(),
            }],
            not_supported: false,
        };
    }

    // 3. Only actionable verdicts produce commands.
    if !decision.verdict.is_actionable() {
        return MapperOutput::empty();
    }

    // 4. Position lifecycle is the executor's job.
    if intent.intent_type == IntentType::Close {
        return MapperOutput::empty();
    }

    // HEDGE has no representation in the command set.
    if intent.intent_type == IntentType::Hedge {
        return MapperOutput {
            commands: Vec::new(),
            not_supported: true,
        };
    }

    // 5. The fixed emission order.
    let mut commands = Vec::new();

    let strategy = strategy_for(intent);
    if ctx.current_strategy != Some(strategy.as_str()) {
        commands.push(ExecutorCommand::SetStrategy { strategy });
    }

    let granted = decision.granted_risk_pct(intent.risk_pct);
    let direction = if intent.plan.target >= intent.plan.entry {
        Direction::Long
    } else {
        Direction::Short
    };
    commands.push(ExecutorCommand::SetParams(SetParamsPayload {
        symbol: intent.symbol.clone(),
        direction,
        entry: intent.plan.entry,
        stop: intent.plan.stop,
        target: intent.plan.target,
        timeframe: intent.plan.timeframe,
        quantity: quantity_for(granted),
    }));

    if let Some(adjustment) = &decision.risk_adjustment {
        commands.push(ExecutorCommand::SetRisk(SetRiskPayload {
            risk_pct: adjustment.adjusted_pct,
        }));
    }

    if !ctx.active_symbols.iter().any(|s| s == &intent.symbol) {
        let mut symbols = ctx.active_symbols.to_vec();
        symbols.push(intent.symbol.clone());
        commands.push(ExecutorCommand::SetSymbolsActive { symbols });
    }

    if ctx.arm == Arm::Disarmed && ctx.gate >= Gate::G1 {
        commands.push(ExecutorCommand::Arm);
    }

    MapperOutput {
        commands,
        not_supported: false,
    }
}
