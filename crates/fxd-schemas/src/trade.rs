//! Trade-side shapes: brain intents, portfolio-manager decisions, risk
//! limits, and open positions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::market::{GlobalMode, Timeframe};
use crate::reason::Why;

// ---------------------------------------------------------------------------
// Brain identity
// ---------------------------------------------------------------------------

/// The fixed set of decision agents. Registry iteration order is A2, B3,
/// C3, D2; replay determinism depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BrainId {
    A2,
    B3,
    C3,
    D2,
}

impl BrainId {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrainId::A2 => "A2",
            BrainId::B3 => "B3",
            BrainId::C3 => "C3",
            BrainId::D2 => "D2",
        }
    }

    /// All brains in registry iteration order.
    pub fn ordered() -> [BrainId; 4] {
        [BrainId::A2, BrainId::B3, BrainId::C3, BrainId::D2]
    }
}

impl fmt::Display for BrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentType {
    OpenLong,
    OpenShort,
    Close,
    ScaleIn,
    ScaleOut,
    Hedge,
}

impl IntentType {
    /// `true` when executing this intent adds exposure.
    pub fn opens_exposure(&self) -> bool {
        matches!(
            self,
            IntentType::OpenLong | IntentType::OpenShort | IntentType::ScaleIn | IntentType::Hedge
        )
    }
}

/// Price plan attached to an intent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub timeframe: Timeframe,
}

impl TradePlan {
    /// Reward/risk of the plan; `None` when the stop distance is zero or the
    /// plan is degenerate.
    pub fn reward_risk(&self) -> Option<f64> {
        let risk = (self.entry - self.stop).abs();
        if risk <= f64::EPSILON {
            return None;
        }
        Some((self.target - self.entry).abs() / risk)
    }
}

/// Execution constraints attached to an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentConstraints {
    pub max_slippage_bps: f64,
    pub valid_until: DateTime<Utc>,
    pub min_reward_risk: f64,
}

/// A brain's proposal to trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub intent_id: Uuid,
    pub symbol: String,
    pub brain_id: BrainId,
    pub intent_type: IntentType,
    /// Proposed risk as a percentage of account equity (e.g. 0.5 = 0.5%).
    pub risk_pct: f64,
    pub plan: TradePlan,
    pub constraints: IntentConstraints,
    pub why: Why,
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Allow,
    Deny,
    Queue,
    Modify,
}

impl Verdict {
    /// `true` when the decision lets the intent proceed to execution.
    pub fn is_actionable(&self) -> bool {
        matches!(self, Verdict::Allow | Verdict::Modify)
    }
}

/// Recorded when the PM scales a proposed risk down to fit the budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAdjustment {
    pub original_pct: f64,
    pub adjusted_pct: f64,
    pub reason: String,
}

/// Snapshot of the PM's risk state at decision time, embedded in every
/// decision for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskStateSnapshot {
    pub drawdown_pct: f64,
    pub exposure_pct: f64,
    pub open_positions: u32,
    pub daily_loss_pct: f64,
    pub available_risk_pct: f64,
    pub global_mode: GlobalMode,
}

/// The portfolio manager's verdict over one intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub intent_id: Uuid,
    pub verdict: Verdict,
    pub risk_adjustment: Option<RiskAdjustment>,
    pub risk_state: RiskStateSnapshot,
    pub why: Why,
}

impl Decision {
    /// Risk the decision actually grants: the adjusted figure on MODIFY, the
    /// original on ALLOW, zero otherwise.
    pub fn granted_risk_pct(&self, proposed_pct: f64) -> f64 {
        match self.verdict {
            Verdict::Allow => proposed_pct,
            Verdict::Modify => self
                .risk_adjustment
                .as_ref()
                .map(|adj| adj.adjusted_pct)
                .unwrap_or(proposed_pct),
            Verdict::Deny | Verdict::Queue => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Risk limits and positions
// ---------------------------------------------------------------------------

/// Bounded numeric limits the PM enforces. Percentages are of account
/// equity; counts are absolute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    pub max_drawdown_pct: f64,
    pub max_exposure_pct: f64,
    pub max_daily_loss_pct: f64,
    pub max_positions: u32,
    pub max_exposure_per_symbol_pct: f64,
    pub max_exposure_per_currency_pct: f64,
    pub max_correlated_exposure_pct: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_drawdown_pct: 10.0,
            max_exposure_pct: 6.0,
            max_daily_loss_pct: 3.0,
            max_positions: 5,
            max_exposure_per_symbol_pct: 2.0,
            max_exposure_per_currency_pct: 4.0,
            max_correlated_exposure_pct: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

/// One open position as the PM sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: String,
    pub brain_id: BrainId,
    pub direction: Direction,
    pub risk_pct: f64,
    pub opened_at: DateTime<Utc>,
}
