//! Brain registry: the fixed set of independent decision agents.
//!
//! # Invariants
//!
//! - A brain is a pure function: snapshot + per-tick metadata in, exactly
//!   one intent **or** one skip out. Never both, never a panic, never a read
//!   of external state.
//! - Registry iteration order is fixed (A2, B3, C3, D2); replay determinism
//!   and PM tie-breaking depend on it.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use fxd_schemas::{
    BrainId, Direction, Intent, IntentConstraints, IntentType, MarketSnapshot, TradePlan, Why,
};

pub mod brains;
pub mod registry;

pub use registry::BrainRegistry;

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

/// Per-tick metadata handed to every brain alongside the snapshot.
///
/// `ref_price` and `momentum` are symbol metadata the intent plan needs
/// (intents carry absolute prices); they are computed once by the
/// orchestrator from the same bars the snapshot was built from.
#[derive(Debug, Clone, Copy)]
pub struct BrainMeta {
    pub correlation_id: Uuid,
    pub at: DateTime<Utc>,
    /// Last H1 close.
    pub ref_price: f64,
    /// Signed H1 close change over the classification window.
    pub momentum: f64,
}

/// A brain's output: a proposal or a reasoned skip.
#[derive(Debug, Clone)]
pub enum BrainOutput {
    Intent(Intent),
    Skip(Why),
}

impl BrainOutput {
    pub fn skip(why: Why) -> Self {
        BrainOutput::Skip(why)
    }

    pub fn as_intent(&self) -> Option<&Intent> {
        match self {
            BrainOutput::Intent(intent) => Some(intent),
            BrainOutput::Skip(_) => None,
        }
    }
}

/// One decision agent.
pub trait Brain: Send + Sync {
    fn id(&self) -> BrainId;

    /// Evaluate one snapshot. Total: every input yields an intent or a skip.
    fn evaluate(&self, snapshot: &MarketSnapshot, meta: &BrainMeta) -> BrainOutput;
}

// ---------------------------------------------------------------------------
// Shared plan construction
// ---------------------------------------------------------------------------

/// Validity horizon for every brain's intent.
const INTENT_VALIDITY_MINUTES: i64 = 15;

/// Build an intent around an ATR-scaled plan. Returns a skip when the plan
/// would be degenerate (non-positive ATR or reward/risk below the floor).
#[allow(clippy::too_many_arguments)]
pub(crate) fn atr_plan_intent(
    brain: BrainId,
    snapshot: &MarketSnapshot,
    meta: &BrainMeta,
    direction: Direction,
    stop_atr: f64,
    target_atr: f64,
    risk_pct: f64,
    min_reward_risk: f64,
    why: Why,
) -> BrainOutput {
    let atr = snapshot.metrics.atr;
    if !(atr.is_finite() && atr > 0.0) || !meta.ref_price.is_finite() {
        return BrainOutput::skip(Why::from_code(
            fxd_schemas::ReasonCode::BrainNoSetup,
        ));
    }

    let entry = meta.ref_price;
    let (stop, target) = match direction {
        Direction::Long => (entry - stop_atr * atr, entry + target_atr * atr),
        Direction::Short => (entry + stop_atr * atr, entry - target_atr * atr),
    };

    let plan = TradePlan {
        entry,
        stop,
        target,
        timeframe: fxd_schemas::Timeframe::H1,
    };

    match plan.reward_risk() {
        Some(rr) if rr >= min_reward_risk => {}
        _ => {
            return BrainOutput::skip(Why::from_code(
                fxd_schemas::ReasonCode::BrainLowRewardRisk,
            ))
        }
    }

    let intent_type = match direction {
        Direction::Long => IntentType::OpenLong,
        Direction::Short => IntentType::OpenShort,
    };

    BrainOutput::Intent(Intent {
        intent_id: Uuid::new_v4(),
        symbol: snapshot.symbol.clone(),
        brain_id: brain,
        intent_type,
        risk_pct,
        plan,
        constraints: IntentConstraints {
            max_slippage_bps: 1.5,
            valid_until: meta.at + Duration::minutes(INTENT_VALIDITY_MINUTES),
            min_reward_risk,
        },
        why,
    })
}
