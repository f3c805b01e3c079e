//! Market-data shapes: bars, timeframes, and the unified context snapshot
//! produced by the context engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::reason::Why;

// ---------------------------------------------------------------------------
// Timeframes
// ---------------------------------------------------------------------------

/// The four aligned timeframes every symbol carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    D1,
    H4,
    H1,
    M15,
}

impl Timeframe {
    /// Bar-to-bar interval in seconds.
    pub fn secs(&self) -> i64 {
        match self {
            Timeframe::D1 => 86_400,
            Timeframe::H4 => 14_400,
            Timeframe::H1 => 3_600,
            Timeframe::M15 => 900,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::D1 => "D1",
            Timeframe::H4 => "H4",
            Timeframe::H1 => "H1",
            Timeframe::M15 => "M15",
        }
    }

    pub fn all() -> [Timeframe; 4] {
        [Timeframe::D1, Timeframe::H4, Timeframe::H1, Timeframe::M15]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Bars
// ---------------------------------------------------------------------------

/// One immutable OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Bar close instant.
    pub timestamp: DateTime<Utc>,
}

impl Bar {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// The four aligned series fetched for one symbol, oldest bar first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolBars {
    pub symbol: String,
    pub d1: Vec<Bar>,
    pub h4: Vec<Bar>,
    pub h1: Vec<Bar>,
    pub m15: Vec<Bar>,
    pub fetched_at: DateTime<Utc>,
}

impl SymbolBars {
    pub fn series(&self, tf: Timeframe) -> &[Bar] {
        match tf {
            Timeframe::D1 => &self.d1,
            Timeframe::H4 => &self.h4,
            Timeframe::H1 => &self.h1,
            Timeframe::M15 => &self.m15,
        }
    }
}

// ---------------------------------------------------------------------------
// Classified states
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStructure {
    Trend,
    Range,
    Transition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityBand {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiquidityPhase {
    Buildup,
    Raid,
    Clean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Session {
    Asia,
    London,
    Ny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventProximity {
    None,
    PreEvent,
    PostEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionHealth {
    Ok,
    Degraded,
    Broken,
}

/// Process-wide market regime, derived each tick from the snapshot set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlobalMode {
    Normal,
    EventCluster,
    FlowPaying,
    CorrBreak,
    RiskOff,
}

/// Per-symbol market-data health, as classified by the data-quality gate
/// and tracked in the operational state's provider map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderStatus {
    Ok,
    Degraded,
    Down,
    MarketClosed,
}

impl ProviderStatus {
    pub fn reason_code(&self) -> crate::reason::ReasonCode {
        use crate::reason::ReasonCode;
        match self {
            ProviderStatus::Ok => ReasonCode::ProvOk,
            ProviderStatus::Degraded => ReasonCode::ProvDegraded,
            ProviderStatus::Down => ReasonCode::ProvDown,
            ProviderStatus::MarketClosed => ReasonCode::ProvMarketClosed,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Resolved numeric metrics carried by a snapshot. A metric the input bundle
/// could not supply is replaced by its neutral value and flagged in `why`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    pub atr: f64,
    pub spread_bps: f64,
    pub volume_ratio: f64,
    pub correlation_index: f64,
    pub session_overlap: f64,
    pub range_expansion: f64,
}

impl SnapshotMetrics {
    /// The neutral metric set used when an input is missing.
    pub fn neutral() -> Self {
        Self {
            atr: 0.0,
            spread_bps: 0.0,
            volume_ratio: 1.0,
            correlation_index: 0.0,
            session_overlap: 0.0,
            range_expansion: 1.0,
        }
    }
}

/// The unified market-context snapshot for one symbol at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub at: DateTime<Utc>,
    pub structure: MarketStructure,
    pub volatility: VolatilityBand,
    pub liquidity_phase: LiquidityPhase,
    pub session: Session,
    pub event_proximity: EventProximity,
    pub metrics: SnapshotMetrics,
    pub execution_health: ExecutionHealth,
    pub global_mode: GlobalMode,
    pub why: Why,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_intervals() {
        assert_eq!(Timeframe::D1.secs(), 86_400);
        assert_eq!(Timeframe::H4.secs(), 14_400);
        assert_eq!(Timeframe::H1.secs(), 3_600);
        assert_eq!(Timeframe::M15.secs(), 900);
    }

    #[test]
    fn session_serializes_to_contract_tags() {
        assert_eq!(serde_json::to_string(&Session::Ny).unwrap(), "\"NY\"");
        assert_eq!(
            serde_json::to_string(&EventProximity::PreEvent).unwrap(),
            "\"PRE_EVENT\""
        );
        assert_eq!(
            serde_json::to_string(&GlobalMode::EventCluster).unwrap(),
            "\"EVENT_CLUSTER\""
        );
    }

    #[test]
    fn bar_geometry_helpers() {
        let bar = Bar {
            open: 1.1000,
            high: 1.1010,
            low: 1.0990,
            close: 1.1005,
            volume: 1000.0,
            timestamp: Utc::now(),
        };
        assert!((bar.range() - 0.0020).abs() < 1e-9);
        assert!((bar.body() - 0.0005).abs() < 1e-9);
        assert!(bar.is_bullish());
    }
}
