//! D2: expansion breakout.
//!
//! Joins a volatility expansion in the direction of the push: requires HIGH
//! volatility or a strong range-expansion reading. Wide stop (2 ATR), wide
//! target (4 ATR). Stands down ahead of scheduled events.

use fxd_schemas::{
    BrainId, Direction, EventProximity, ExecutionHealth, MarketSnapshot, ReasonCode,
    VolatilityBand, Why,
};

use crate::{atr_plan_intent, Brain, BrainMeta, BrainOutput};

const RISK_PCT: f64 = 0.5;
const STOP_ATR: f64 = 2.0;
const TARGET_ATR: f64 = 4.0;
const MIN_REWARD_RISK: f64 = 1.8;
const EXPANSION_TRIGGER: f64 = 1.5;

pub struct ExpansionBreakout;

impl Brain for ExpansionBreakout {
    fn id(&self) -> BrainId {
        BrainId::D2
    }

    fn evaluate(&self, snapshot: &MarketSnapshot, meta: &BrainMeta) -> BrainOutput {
        if snapshot.execution_health == ExecutionHealth::Broken {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainExecutionDegraded));
        }
        if snapshot.event_proximity == EventProximity::PreEvent {
            return BrainOutput::skip(Why::from_code(ReasonCode::BrainEventGuard));
        }

        let expanding = snapshot.volatility == VolatilityBand::High
            || snapshot.metrics.range_expansion > EXPANSION_TRIGGER;
        if !expanding {
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
            Why::from_code(ReasonCode::BrainExpansionBreakout),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{meta, snapshot};
    use fxd_schemas::IntentType;

    #[test]
    fn joins_expansion_in_push_direction() {
        let mut snap = snapshot();
        snap.volatility = VolatilityBand::High;
        let out = ExpansionBreakout.evaluate(&snap, &meta(0.0020));
        let intent = out.as_intent().expect("intent");
        assert_eq!(intent.intent_type, IntentType::OpenLong);
        assert_eq!(intent.why.reason_code, ReasonCode::BrainExpansionBreakout);
    }

    #[test]
    fn range_expansion_metric_also_triggers() {
        let mut snap = snapshot();
        snap.metrics.range_expansion = 2.0;
        let out = ExpansionBreakout.evaluate(&snap, &meta(-0.0020));
        assert_eq!(
            out.as_intent().expect("intent").intent_type,
            IntentType::OpenShort
        );
    }

    #[test]
    fn skips_quiet_volatility() {
        let snap = snapshot(); // Normal vol, expansion 1.0
        match ExpansionBreakout.evaluate(&snap, &meta(0.0020)) {
            BrainOutput::Skip(why) => {
                assert_eq!(why.reason_code, ReasonCode::BrainVolRegimeBlocked)
            }
            BrainOutput::Intent(_) => panic!("expected skip"),
        }
    }

    #[test]
    fn skips_flat_momentum() {
        let mut snap = snapshot();
        snap.volatility = VolatilityBand::High;
        match ExpansionBreakout.evaluate(&snap, &meta(0.0)) {
            BrainOutput::Skip(why) => assert_eq!(why.reason_code, ReasonCode::BrainNoSetup),
            BrainOutput::Intent(_) => panic!("expected skip"),
        }
    }
}
