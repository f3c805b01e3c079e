//! The ordered brain registry.

use fxd_schemas::BrainId;

use crate::brains::{ExpansionBreakout, RaidReversal, RangeFader, TrendRider};
use crate::Brain;

/// Explicit ordered list of `(brain_id, brain)` pairs. The order is part of
/// the contract: replay and PM tie-breaking iterate it verbatim.
pub struct BrainRegistry {
    brains: Vec<Box<dyn Brain>>,
}

impl Default for BrainRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl BrainRegistry {
    /// The production set: A2, B3, C3, D2.
    pub fn standard() -> Self {
        Self {
            brains: vec![
                Box::new(TrendRider),
                Box::new(RangeFader),
                Box::new(RaidReversal),
                Box::new(ExpansionBreakout),
            ],
        }
    }

    /// Iterate brains in fixed registration order.
    pub fn iterate_in_fixed_order(&self) -> impl Iterator<Item = &dyn Brain> {
        self.brains.iter().map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.brains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brains.is_empty()
    }

    pub fn ids(&self) -> Vec<BrainId> {
        self.brains.iter().map(|b| b.id()).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{BrainMeta, BrainOutput};
    use chrono::{TimeZone, Utc};
    use fxd_schemas::{
        EventProximity, ExecutionHealth, GlobalMode, LiquidityPhase, MarketSnapshot,
        MarketStructure, ReasonCode, Session, SnapshotMetrics, VolatilityBand, Why,
    };
    use uuid::Uuid;

    /// Baseline snapshot fixture shared across the brain tests: ranging,
    /// normal volatility, clean liquidity, Asia session.
    pub(crate) fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            symbol: "EURUSD".to_string(),
            at: Utc.with_ymd_and_hms(2026, 3, 4, 3, 0, 0).unwrap(),
            structure: MarketStructure::Range,
            volatility: VolatilityBand::Normal,
            liquidity_phase: LiquidityPhase::Clean,
            session: Session::Asia,
            event_proximity: EventProximity::None,
            metrics: SnapshotMetrics {
                atr: 0.0008,
                spread_bps: 0.6,
                volume_ratio: 1.0,
                correlation_index: 0.2,
                session_overlap: 0.0,
                range_expansion: 1.0,
            },
            execution_health: ExecutionHealth::Ok,
            global_mode: GlobalMode::Normal,
            why: Why::from_code(ReasonCode::MclBaseline),
        }
    }

    pub(crate) fn meta(momentum: f64) -> BrainMeta {
        BrainMeta {
            correlation_id: Uuid::new_v4(),
            at: Utc.with_ymd_and_hms(2026, 3, 4, 3, 0, 0).unwrap(),
            ref_price: 1.1000,
            momentum,
        }
    }

    #[test]
    fn registry_order_is_a2_b3_c3_d2() {
        let registry = BrainRegistry::standard();
        assert_eq!(
            registry.ids(),
            vec![BrainId::A2, BrainId::B3, BrainId::C3, BrainId::D2]
        );
        let iterated: Vec<BrainId> = registry
            .iterate_in_fixed_order()
            .map(|b| b.id())
            .collect();
        assert_eq!(iterated, registry.ids());
    }

    #[test]
    fn every_brain_yields_exactly_one_output_per_snapshot() {
        let registry = BrainRegistry::standard();
        let snap = snapshot();
        let m = meta(0.0010);
        let outputs: Vec<BrainOutput> = registry
            .iterate_in_fixed_order()
            .map(|b| b.evaluate(&snap, &m))
            .collect();
        assert_eq!(outputs.len(), 4);
    }

    #[test]
    fn brains_are_pure_given_equal_inputs() {
        let registry = BrainRegistry::standard();
        let snap = snapshot();
        let m = meta(0.0010);

        for brain in registry.iterate_in_fixed_order() {
            let a = brain.evaluate(&snap, &m);
            let b = brain.evaluate(&snap, &m);
            match (&a, &b) {
                (BrainOutput::Skip(wa), BrainOutput::Skip(wb)) => {
                    assert_eq!(wa.reason_code, wb.reason_code)
                }
                (BrainOutput::Intent(ia), BrainOutput::Intent(ib)) => {
                    // Identical up to the freshly minted intent id.
                    assert_eq!(ia.symbol, ib.symbol);
                    assert_eq!(ia.intent_type, ib.intent_type);
                    assert_eq!(ia.plan, ib.plan);
                    assert_eq!(ia.risk_pct, ib.risk_pct);
                }
                _ => panic!("brain {:?} was not deterministic", brain.id()),
            }
        }
    }
}
