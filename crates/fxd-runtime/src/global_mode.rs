//! Global-mode derivation from the tick's snapshot set.
//!
//! RISK_OFF is never derived here: it is an operator posture (kill switch)
//! applied on top of the derived mode by the orchestrator.

use fxd_schemas::{EventProximity, GlobalMode, MarketSnapshot};

const CORR_BREAK_INDEX: f64 = 0.8;
const FLOW_PAYING_SPREAD_BPS: f64 = 2.0;

/// Derive the process-wide regime from one tick's snapshots.
///
/// Priority: EVENT_CLUSTER (two or more symbols inside an event window) >
/// CORR_BREAK (mean |correlation index| above threshold) > FLOW_PAYING
/// (mean spread above threshold) > NORMAL.
pub fn derive_global_mode(snapshots: &[MarketSnapshot]) -> GlobalMode {
    if snapshots.is_empty() {
        return GlobalMode::Normal;
    }

    let in_event = snapshots
        .iter()
        .filter(|s| s.event_proximity != EventProximity::None)
        .count();
    if in_event >= 2 {
        return GlobalMode::EventCluster;
    }

    let n = snapshots.len() as f64;
    let mean_corr = snapshots
        .iter()
        .map(|s| s.metrics.correlation_index.abs())
        .sum::<f64>()
        / n;
    if mean_corr > CORR_BREAK_INDEX {
        return GlobalMode::CorrBreak;
    }

    let mean_spread = snapshots.iter().map(|s| s.metrics.spread_bps).sum::<f64>() / n;
    if mean_spread > FLOW_PAYING_SPREAD_BPS {
        return GlobalMode::FlowPaying;
    }

    GlobalMode::Normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fxd_schemas::{
        ExecutionHealth, LiquidityPhase, MarketStructure, ReasonCode, Session, SnapshotMetrics,
        VolatilityBand, Why,
    };

    fn snapshot(symbol: &str) -> MarketSnapshot {
        MarketSnapshot {
            symbol: symbol.to_string(),
            at: Utc::now(),
            structure: MarketStructure::Range,
            volatility: VolatilityBand::Normal,
            liquidity_phase: LiquidityPhase::Clean,
            session: Session::London,
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

    #[test]
    fn empty_or_quiet_set_is_normal() {
        assert_eq!(derive_global_mode(&[]), GlobalMode::Normal);
        let snaps = vec![snapshot("EURUSD"), snapshot("GBPUSD")];
        assert_eq!(derive_global_mode(&snaps), GlobalMode::Normal);
    }

    #[test]
    fn two_event_windows_make_a_cluster() {
        let mut a = snapshot("EURUSD");
        a.event_proximity = EventProximity::PreEvent;
        let mut b = snapshot("GBPUSD");
        b.event_proximity = EventProximity::PostEvent;
        let c = snapshot("USDJPY");

        assert_eq!(
            derive_global_mode(&[a.clone(), b.clone(), c]),
            GlobalMode::EventCluster
        );
        // A single event window is not a cluster.
        assert_eq!(
            derive_global_mode(&[a, snapshot("GBPUSD")]),
            GlobalMode::Normal
        );
    }

    #[test]
    fn high_mean_correlation_is_corr_break() {
        let mut a = snapshot("EURUSD");
        a.metrics.correlation_index = 0.95;
        let mut b = snapshot("GBPUSD");
        b.metrics.correlation_index = -0.9;
        assert_eq!(derive_global_mode(&[a, b]), GlobalMode::CorrBreak);
    }

    #[test]
    fn wide_mean_spread_is_flow_paying() {
        let mut a = snapshot("EURUSD");
        a.metrics.spread_bps = 3.5;
        let mut b = snapshot("GBPUSD");
        b.metrics.spread_bps = 2.1;
        assert_eq!(derive_global_mode(&[a, b]), GlobalMode::FlowPaying);
    }

    #[test]
    fn event_cluster_outranks_corr_break() {
        let mut a = snapshot("EURUSD");
        a.event_proximity = EventProximity::PreEvent;
        a.metrics.correlation_index = 0.99;
        let mut b = snapshot("GBPUSD");
        b.event_proximity = EventProximity::PreEvent;
        b.metrics.correlation_index = 0.99;
        assert_eq!(derive_global_mode(&[a, b]), GlobalMode::EventCluster);
    }
}
