//! C3: liquidity-raid reversal.
//!
//! Trades the snap-back after a stop hunt: when the last M15 bar is
//! raid-shaped, positions against the push that produced it. Stop 1.2 ATR,
//! target 2.4 ATR. Stands down ahead of scheduled events.

use fxd_schemas::{
    BrainId, Direction, EventProximity, ExecutionHealth, LiquidityPhase, MarketSnapshot,
    ReasonCode, Why,
};

use crate::{atr_plan_intent, Brain, BrainMeta, BrainOutput};

const RISK_PCT: f64 = 0.6;
const STOP_ATR: f64 = 1.2;
const TARGET_ATR: f64 = 2.4;
const MIN_REWARD_RISK: f64 = 1.5;

pub struct RaidReversal;

impl Brain for RaidReversal {
    fn id(&self) -> BrainId {
        BrainId::C3
    }

    fn evaluate(&self, snapshot: &MarketSnapshot, meta: &BrainMeta) -> BrainOutput {
        if snapshot.execution_health == ExecutionHealth::Broken {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainExecutionDegraded));
        }
        if snapshot.event_proximity == EventProximity::PreEvent {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainEventGuard));
        }
        if snapshot.liquidity_phase != LiquidityPhase::Raid {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainNoSetup));
        }

        // Reversal: against the push that swept the liquidity.
        let direction = if meta.momentum > 0.0 {
            Direction::Short
        } else {
            Direction::Long
        };

        atr_plan_intent(
            self.id(),
            snapshot,
            meta,
            direction,
            STOP_ATR,
            TARGET_ATR,
            RISK_PCT,
            MIN_REWARD_RISK,
            Why::from_code(ReasonCode::BrainRaidReversal),
        )
    }
}
