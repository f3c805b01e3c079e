//! A2: trend continuation.
//!
//! Enters in the direction of an established H1 trend, stop 1.5 ATR behind,
//! target 3 ATR ahead. Stands down around scheduled events, in HIGH
//! volatility, and when execution health is broken.

use fxd_schemas::{
    BrainId, Direction, EventProximity, ExecutionHealth, MarketSnapshot, MarketStructure,
    ReasonCode, VolatilityBand, Why,
};

use crate::{atr_plan_intent, Brain, BrainMeta, BrainOutput};

const RISK_PCT: f64 = 0.5;
const STOP_ATR: f64 = 1.5;
const TARGET_ATR: f64 = 3.0;
const MIN_REWARD_RISK: f64 = 1.5;

pub struct TrendRider;

impl Brain for TrendRider {
    fn id(&self) -> BrainId {
        BrainId::A2
    }

    fn evaluate(&self, snapshot: &MarketSnapshot, meta: &BrainMeta) -> BrainOutput {
        if snapshot.execution_health == ExecutionHealth::Broken {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainExecutionDegraded));
        }
        if snapshot.event_proximity != EventProximity::None {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainEventGuard));
        }
        if snapshot.structure != MarketStructure::Trend {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainNoSetup));
        }
        if snapshot.volatility == VolatilityBand::High {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainVolRegimeBlocked));
        }

        let direction = if meta.momentum > 0.0 {
            Direction::Long
        } else if meta.momentum < 0.0 {
            Direction::Short
        } else {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainNoSetup));
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
            Why::from_code(ReasonCode::BrainTrendEntry),
        )
    }
}
