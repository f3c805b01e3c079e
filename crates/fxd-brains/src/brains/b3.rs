//! B3: range fade.
//!
//! Fades moves inside an established range: sells strength, buys weakness,
//! stop 1 ATR, target 1.6 ATR. Trades London and NY only and stands down in
//! HIGH volatility or during a liquidity raid.

use fxd_schemas::{
    BrainId, Direction, ExecutionHealth, LiquidityPhase, MarketSnapshot, MarketStructure,
    ReasonCode, Session, VolatilityBand, Why,
};

use crate::{atr_plan_intent, Brain, BrainMeta, BrainOutput};

const RISK_PCT: f64 = 0.4;
const STOP_ATR: f64 = 1.0;
const TARGET_ATR: f64 = 1.6;
const MIN_REWARD_RISK: f64 = 1.2;

pub struct RangeFader;

impl Brain for RangeFader {
    fn id(&self) -> BrainId {
        BrainId::B3
    }

    fn evaluate(&self, snapshot: &MarketSnapshot, meta: &BrainMeta) -> BrainOutput {
        if snapshot.execution_health == ExecutionHealth::Broken {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainExecutionDegraded));
        }
        if snapshot.session == Session::Asia {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainSessionBlocked));
        }
        if snapshot.structure != MarketStructure::Range {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainNoSetup));
        }
        if snapshot.volatility == VolatilityBand::High {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainVolRegimeBlocked));
        }
        if snapshot.liquidity_phase == LiquidityPhase::Raid {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainNoSetup));
        }

        // Fade the most recent push: strength is sold, weakness is bought.
        let direction = if meta.momentum >= 0.0 {
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
            Why::from_code(ReasonCode::BrainRangeFade),
        )
    }
}
