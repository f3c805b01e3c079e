//! The value-typed portfolio state threaded through one tick.
//!
//! The orchestrator holds the only copy; brains and the mapper never see it.
//! It is rebuilt each tick from the account snapshot and live positions;
//! nothing here survives the tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fxd_schemas::{
    BrainId, Direction, ExecutionHealth, GlobalMode, Intent, OpenPosition, RiskLimits,
    RiskStateSnapshot,
};

use crate::currency::{correlated, split_currencies};

/// An active cooldown covering one (brain, symbol) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cooldown {
    pub brain_id: BrainId,
    pub symbol: String,
    pub until: DateTime<Utc>,
}

/// The PM's working state for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub drawdown_pct: f64,
    pub exposure_pct: f64,
    pub daily_loss_pct: f64,
    pub open_positions: Vec<OpenPosition>,
    pub limits: RiskLimits,
    pub global_mode: GlobalMode,
    pub cooldowns: Vec<Cooldown>,
    pub executor_health: ExecutionHealth,
}

impl PortfolioState {
    /// Fresh state at tick start: no exposure, given limits and mode.
    pub fn fresh(limits: RiskLimits, global_mode: GlobalMode) -> Self {
        Self {
            drawdown_pct: 0.0,
            exposure_pct: 0.0,
            daily_loss_pct: 0.0,
            open_positions: Vec::new(),
            limits,
            global_mode,
            cooldowns: Vec::new(),
            executor_health: ExecutionHealth::Ok,
        }
    }

    pub fn open_position_count(&self) -> u32 {
        self.open_positions.len() as u32
    }

    /// Risk budget still open under the total exposure cap.
    pub fn available_risk_pct(&self) -> f64 {
        (self.limits.max_exposure_pct - self.exposure_pct).max(0.0)
    }

    /// Exposure already committed to one symbol.
    pub fn symbol_exposure_pct(&self, symbol: &str) -> f64 {
        self.open_positions
            .iter()
            .filter(|p| p.symbol == symbol)
            .map(|p| p.risk_pct)
            .sum()
    }

    /// Exposure already committed to one currency leg.
    pub fn currency_exposure_pct(&self, currency: &str) -> f64 {
        self.open_positions
            .iter()
            .filter(|p| {
                split_currencies(&p.symbol)
                    .map(|(b, q)| b == currency || q == currency)
                    .unwrap_or(false)
            })
            .map(|p| p.risk_pct)
            .sum()
    }

    /// Exposure in positions correlated with `symbol` (shared currency leg).
    pub fn correlated_exposure_pct(&self, symbol: &str) -> f64 {
        self.open_positions
            .iter()
            .filter(|p| correlated(&p.symbol, symbol))
            .map(|p| p.risk_pct)
            .sum()
    }

    /// Whether an active cooldown covers this (brain, symbol) at `now`.
    pub fn cooldown_active(&self, brain: BrainId, symbol: &str, now: DateTime<Utc>) -> bool {
        self.cooldowns
            .iter()
            .any(|c| c.brain_id == brain && c.symbol == symbol && c.until > now)
    }

    /// Record an approved opening intent so the next intent in the tick sees
    /// the new exposure and count.
    pub fn apply_open(&mut self, intent: &Intent, granted_pct: f64, now: DateTime<Utc>) {
        self.exposure_pct += granted_pct;
        let direction = match intent.intent_type {
            fxd_schemas::IntentType::OpenShort => Direction::Short,
            _ => Direction::Long,
        };
        self.open_positions.push(OpenPosition {
            symbol: intent.symbol.clone(),
            brain_id: intent.brain_id,
            direction,
            risk_pct: granted_pct,
            opened_at: now,
        });
    }

    /// Point-in-time view embedded in every decision.
    pub fn snapshot(&self) -> RiskStateSnapshot {
        RiskStateSnapshot {
            drawdown_pct: self.drawdown_pct,
            exposure_pct: self.exposure_pct,
            open_positions: self.open_position_count(),
            daily_loss_pct: self.daily_loss_pct,
            available_risk_pct: self.available_risk_pct(),
            global_mode: self.global_mode,
        }
    }

    /// `false` when any tracked figure is non-finite; the internal-error
    /// guard checks this before evaluating.
    pub fn is_numerically_sound(&self) -> bool {
        self.drawdown_pct.is_finite()
            && self.exposure_pct.is_finite()
            && self.daily_loss_pct.is_finite()
            && self.open_positions.iter().all(|p| p.risk_pct.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn position(symbol: &str, risk: f64) -> OpenPosition {
        OpenPosition {
            symbol: symbol.to_string(),
            brain_id: BrainId::A2,
            direction: Direction::Long,
            risk_pct: risk,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn available_risk_clamps_at_zero() {
        let mut state = PortfolioState::fresh(RiskLimits::default(), GlobalMode::Normal);
        state.exposure_pct = state.limits.max_exposure_pct + 1.0;
        assert_eq!(state.available_risk_pct(), 0.0);
    }

    #[test]
    fn exposure_views_sum_by_symbol_currency_and_correlation() {
        let mut state = PortfolioState::fresh(RiskLimits::default(), GlobalMode::Normal);
        state.open_positions = vec![
            position("EURUSD", 0.5),
            position("EURUSD", 0.3),
            position("GBPUSD", 0.4),
            position("AUDNZD", 0.2),
        ];

        assert!((state.symbol_exposure_pct("EURUSD") - 0.8).abs() < 1e-9);
        assert!((state.currency_exposure_pct("USD") - 1.2).abs() < 1e-9);
        // EURUSD correlates with itself and GBPUSD (USD leg), not AUDNZD.
        assert!((state.correlated_exposure_pct("EURUSD") - 1.2).abs() < 1e-9);
    }

    #[test]
    fn cooldown_expiry_is_checked_against_now() {
        let now = Utc::now();
        let mut state = PortfolioState::fresh(RiskLimits::default(), GlobalMode::Normal);
        state.cooldowns.push(Cooldown {
            brain_id: BrainId::B3,
            symbol: "EURUSD".to_string(),
            until: now + Duration::minutes(30),
        });

        assert!(state.cooldown_active(BrainId::B3, "EURUSD", now));
        assert!(!state.cooldown_active(BrainId::A2, "EURUSD", now));
        assert!(!state.cooldown_active(
            BrainId::B3,
            "EURUSD",
            now + Duration::minutes(31)
        ));
    }

    #[test]
    fn numeric_soundness_detects_nan() {
        let mut state = PortfolioState::fresh(RiskLimits::default(), GlobalMode::Normal);
        assert!(state.is_numerically_sound());
        state.exposure_pct = f64::NAN;
        assert!(!state.is_numerically_sound());
    }
}
