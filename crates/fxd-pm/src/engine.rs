//! The PM guard chain.
//!
//! Evaluation order for a single intent (the first breach decides):
//!
//!   1. global-mode guard (RISK_OFF denies anything that opens exposure)
//!   2. cooldown guard
//!   3. correlation guard
//!   4. hard caps: positions, daily loss, drawdown
//!   5. per-symbol / per-currency caps (MODIFY down when the residual is
//!      worth taking, DENY otherwise)
//!   6. fit against the remaining total budget (MODIFY down / ALLOW)
//!   7. queue when the executor is BROKEN
//!
//! Intents that do not open exposure (CLOSE, SCALE_OUT) skip the exposure
//! guards: cooldown still applies, everything else passes through.

use chrono::{DateTime, Utc};

use fxd_schemas::{
    Decision, ExecutionHealth, GlobalMode, Intent, ReasonCode, RiskAdjustment, Verdict, Why,
};

use crate::currency::split_currencies;
use crate::state::PortfolioState;

/// Below this residual a MODIFY is not worth executing; the intent is
/// denied instead.
const MIN_RISK_PCT: f64 = 0.1;

/// Evaluate one intent against the evolving state. On ALLOW/MODIFY the
/// state is updated so the next intent of this tick sees the new exposure.
pub fn evaluate(intent: &Intent, state: &mut PortfolioState, now: DateTime<Utc>) -> Decision {
    // Internal-error guard: a numeric fault becomes a DENY, never a panic.
    if !state.is_numerically_sound() || !intent_is_numerically_sound(intent) {
        return decision(
            intent,
            Verdict::Deny,
            None,
            state,
            Why::from_code(ReasonCode::PmInternalError),
        );
    }

    let opens = intent.intent_type.opens_exposure();

    // 1. Global mode guard.
    if state.global_mode == GlobalMode::RiskOff && opens {
        return decision(
            intent,
            Verdict::Deny,
            None,
            state,
            Why::from_code(ReasonCode::GlobalRiskOff),
        );
    }

    // 2. Cooldown guard.
    if state.cooldown_active(intent.brain_id, &intent.symbol, now) {
        return decision(
            intent,
            Verdict::Deny,
            None,
            state,
            Why::from_code(ReasonCode::CooldownActive),
        );
    }

    // Non-opening intents pass the remaining exposure guards by definition.
    if !opens {
        return decision(
            intent,
            Verdict::Allow,
            None,
            state,
            Why::new(
                ReasonCode::PmAllow,
                "risk-reducing intent; exposure guards not applicable",
            ),
        );
    }

    let proposed = intent.risk_pct;

    // 3. Correlation guard.
    let correlated = state.correlated_exposure_pct(&intent.symbol);
    if correlated + proposed > state.limits.max_correlated_exposure_pct {
        return decision(
            intent,
            Verdict::Deny,
            None,
            state,
            Why::new(
                ReasonCode::PmCorrelationBlock,
                format!(
                    "correlated exposure {:.2}% + {:.2}% exceeds limit {:.2}%",
                    correlated, proposed, state.limits.max_correlated_exposure_pct
                ),
            ),
        );
    }

    // 4. Hard caps.
    if state.open_position_count() >= state.limits.max_positions {
        return decision(
            intent,
            Verdict::Deny,
            None,
            state,
            Why::from_code(ReasonCode::PmMaxPositions),
        );
    }
    if state.daily_loss_pct >= state.limits.max_daily_loss_pct {
        return decision(
            intent,
            Verdict::Deny,
            None,
            state,
            Why::from_code(ReasonCode::PmMaxDailyLoss),
        );
    }
    if state.drawdown_pct >= state.limits.max_drawdown_pct {
        return decision(
            intent,
            Verdict::Deny,
            None,
            state,
            Why::from_code(ReasonCode::PmMaxDrawdown),
        );
    }

    // 5. Per-symbol / per-currency caps. The binding residual decides.
    let symbol_residual =
        state.limits.max_exposure_per_symbol_pct - state.symbol_exposure_pct(&intent.symbol);
    let currency_residual = match split_currencies(&intent.symbol) {
        Some((base, quote)) => {
            let base_res =
                state.limits.max_exposure_per_currency_pct - state.currency_exposure_pct(base);
            let quote_res =
                state.limits.max_exposure_per_currency_pct - state.currency_exposure_pct(quote);
            base_res.min(quote_res)
        }
        None => f64::INFINITY,
    };

    let cap_residual = symbol_residual.min(currency_residual);
    let cap_code = if symbol_residual <= currency_residual {
        ReasonCode::PmSymbolExposureCap
    } else {
        ReasonCode::PmCurrencyExposureCap
    };

    let mut granted = proposed;
    let mut adjust_code: Option<ReasonCode> = None;

    if proposed > cap_residual {
        if cap_residual < MIN_RISK_PCT {
            return decision(intent, Verdict::Deny, None, state, Why::from_code(cap_code));
        }
        granted = cap_residual;
        adjust_code = Some(cap_code);
    }

    // 6. Fit against the remaining total budget.
    let available = state.available_risk_pct();
    if granted > available {
        if available < MIN_RISK_PCT {
            return decision(
                intent,
                Verdict::Deny,
                None,
                state,
                Why::from_code(ReasonCode::PmMaxExposure),
            );
        }
        granted = available;
        adjust_code.get_or_insert(ReasonCode::PmRiskScaled);
    }

    // 7. Queue when the executor is broken: record, no side effect.
    if state.executor_health == ExecutionHealth::Broken {
        return decision(
            intent,
            Verdict::Queue,
            None,
            state,
            Why::from_code(ReasonCode::PmQueuedExecutorBroken),
        );
    }

    // Approve, threading the state for the next intent of this tick.
    let snapshot_before = state.snapshot();
    state.apply_open(intent, granted, now);

    if let Some(code) = adjust_code {
        let adjustment = RiskAdjustment {
            original_pct: proposed,
            adjusted_pct: granted,
            reason: code.describe().to_string(),
        };
        Decision {
            intent_id: intent.intent_id,
            verdict: Verdict::Modify,
            risk_adjustment: Some(adjustment),
            risk_state: snapshot_before,
            why: Why::from_code(ReasonCode::PmRiskScaled),
        }
    } else {
        Decision {
            intent_id: intent.intent_id,
            verdict: Verdict::Allow,
            risk_adjustment: None,
            risk_state: snapshot_before,
            why: Why::from_code(ReasonCode::PmAllow),
        }
    }
}

fn intent_is_numerically_sound(intent: &Intent) -> bool {
    intent.risk_pct.is_finite()
        && intent.risk_pct >= 0.0
        && intent.plan.entry.is_finite()
        && intent.plan.stop.is_finite()
        && intent.plan.target.is_finite()
}

fn decision(
    intent: &Intent,
    verdict: Verdict,
    risk_adjustment: Option<RiskAdjustment>,
    state: &PortfolioState,
    why: Why,
) -> Decision {
    Decision {
        intent_id: intent.intent_id,
        verdict,
        risk_adjustment,
        risk_state: state.snapshot(),
        why,
    }
}
