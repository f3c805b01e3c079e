//! Snapshot construction and the classification rules.
//!
//! # Classification
//!
//! - **Structure** over the last three H1 bars: strictly rising closes AND
//!   strictly rising lows ⇒ TREND; strictly falling closes and highs ⇒
//!   TREND; otherwise RANGE when the last close sits within ±0.2·ATR of the
//!   three-bar mean, else TRANSITION.
//! - **Volatility** from ATR against the reference: ratio < 0.7 ⇒ LOW,
//!   > 1.5 ⇒ HIGH, else NORMAL.
//! - **Liquidity** from the last M15 bar: body/range < 0.3 with a dominant
//!   wick on one side ⇒ RAID; compressed range with overlapping bodies ⇒
//!   BUILDUP; else CLEAN.
//! - **Session** by UTC wall hour, priority NY > LONDON > ASIA.
//! - **Event proximity** passes through from the input.
//!
//! The reason code is the first state that differs from the neutral baseline
//! (RANGE / NORMAL / CLEAN / ASIA / NONE), checked in that order.

use chrono::{DateTime, Timelike, Utc};

use fxd_schemas::{
    Bar, EventProximity, ExecutionHealth, GlobalMode, LiquidityPhase, MarketSnapshot,
    MarketStructure, ReasonCode, Session, SnapshotMetrics, VolatilityBand, Why,
};

use crate::metrics::MetricsInput;

// ---------------------------------------------------------------------------
// Input bundle
// ---------------------------------------------------------------------------

/// Everything the engine needs for one symbol at one instant.
#[derive(Debug, Clone)]
pub struct ContextInput<'a> {
    pub symbol: &'a str,
    pub at: DateTime<Utc>,
    pub h1: &'a [Bar],
    pub m15: &'a [Bar],
    pub metrics: MetricsInput,
    pub event_proximity: EventProximity,
    pub execution_health: ExecutionHealth,
    pub global_mode: GlobalMode,
}

// ---------------------------------------------------------------------------
// Classifiers
// ---------------------------------------------------------------------------

const RANGE_BAND_ATR_FACTOR: f64 = 0.2;
const VOL_LOW_RATIO: f64 = 0.7;
const VOL_HIGH_RATIO: f64 = 1.5;
const RAID_BODY_RATIO: f64 = 0.3;
const RAID_WICK_RATIO: f64 = 0.5;
const BUILDUP_RANGE_RATIO: f64 = 0.5;
const BUILDUP_LOOKBACK: usize = 10;

fn classify_structure(h1: &[Bar], atr: f64) -> MarketStructure {
    let n = h1.len();
    if n < 3 {
        return MarketStructure::Transition;
    }
    let a = &h1[n - 3];
    let b = &h1[n - 2];
    let c = &h1[n - 1];

    let rising = a.close < b.close && b.close < c.close && a.low < b.low && b.low < c.low;
    let falling = a.close > b.close && b.close > c.close && a.high > b.high && b.high > c.high;
    if rising || falling {
        return MarketStructure::Trend;
    }

    let mean = (a.close + b.close + c.close) / 3.0;
    if (c.close - mean).abs() <= RANGE_BAND_ATR_FACTOR * atr {
        MarketStructure::Range
    } else {
        MarketStructure::Transition
    }
}

fn classify_volatility(atr: f64, atr_ref: f64) -> VolatilityBand {
    if atr_ref <= 0.0 {
        return VolatilityBand::Normal;
    }
    let ratio = atr / atr_ref;
    if ratio < VOL_LOW_RATIO {
        VolatilityBand::Low
    } else if ratio > VOL_HIGH_RATIO {
        VolatilityBand::High
    } else {
        VolatilityBand::Normal
    }
}

fn classify_liquidity(m15: &[Bar]) -> LiquidityPhase {
    let Some(last) = m15.last() else {
        return LiquidityPhase::Clean;
    };
    let range = last.range();
    if range <= 0.0 {
        return LiquidityPhase::Clean;
    }

    // Raid: small body with one dominant wick.
    let body_ratio = last.body() / range;
    let upper_wick = last.high - last.open.max(last.close);
    let lower_wick = last.open.min(last.close) - last.low;
    let wick_ratio = upper_wick.max(lower_wick) / range;
    if body_ratio < RAID_BODY_RATIO && wick_ratio > RAID_WICK_RATIO {
        return LiquidityPhase::Raid;
    }

    // Buildup: compressed range plus successively overlapping bodies.
    let lookback = m15.len().min(BUILDUP_LOOKBACK);
    if lookback >= 3 {
        let window = &m15[m15.len() - lookback..];
        let avg_range = window.iter().map(Bar::range).sum::<f64>() / lookback as f64;
        let compressed = range < BUILDUP_RANGE_RATIO * avg_range;
        let overlapping = window.windows(2).all(|w| bodies_overlap(&w[0], &w[1]));
        if compressed && overlapping {
            return LiquidityPhase::Buildup;
        }
    }

    LiquidityPhase::Clean
}

fn bodies_overlap(a: &Bar, b: &Bar) -> bool {
    let (a_lo, a_hi) = (a.open.min(a.close), a.open.max(a.close));
    let (b_lo, b_hi) = (b.open.min(b.close), b.open.max(b.close));
    a_lo <= b_hi && b_lo <= a_hi
}

/// Session by UTC wall hour, priority NY > LONDON > ASIA on overlap.
fn classify_session(at: DateTime<Utc>) -> Session {
    let hour = at.hour();
    if (12..21).contains(&hour) {
        Session::Ny
    } else if (7..16).contains(&hour) {
        Session::London
    } else {
        Session::Asia
    }
}

/// Fraction of overlap with another major session at this hour.
fn session_overlap(at: DateTime<Utc>) -> f64 {
    let hour = at.hour();
    if (12..16).contains(&hour) {
        1.0 // London/NY overlap
    } else if (7..9).contains(&hour) {
        0.5 // Asia tail into London open
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Build the snapshot. Total: every input shape, including empty series and
/// absent metrics, yields a classified snapshot.
pub fn build_snapshot(input: &ContextInput<'_>) -> MarketSnapshot {
    let neutral = SnapshotMetrics::neutral();
    let mut missing: Vec<&'static str> = Vec::new();

    let atr = resolve(input.metrics.atr, neutral.atr, "atr", &mut missing);
    let atr_ref = input.metrics.atr_ref.unwrap_or(atr);
    let spread_bps = resolve(
        input.metrics.spread_bps,
        neutral.spread_bps,
        "spread_bps",
        &mut missing,
    );
    let volume_ratio = resolve(
        input.metrics.volume_ratio,
        neutral.volume_ratio,
        "volume_ratio",
        &mut missing,
    );
    let correlation_index = resolve(
        input.metrics.correlation_index,
        neutral.correlation_index,
        "correlation_index",
        &mut missing,
    );
    let range_expansion = resolve(
        input.metrics.range_expansion,
        neutral.range_expansion,
        "range_expansion",
        &mut missing,
    );

    let structure = classify_structure(input.h1, atr);
    let volatility = classify_volatility(atr, atr_ref);
    let liquidity_phase = classify_liquidity(input.m15);
    let session = classify_session(input.at);
    let overlap = session_overlap(input.at);

    let why = pick_reason(
        structure,
        volatility,
        liquidity_phase,
        session,
        input.event_proximity,
        &missing,
    );

    MarketSnapshot {
        symbol: input.symbol.to_string(),
        at: input.at,
        structure,
        volatility,
        liquidity_phase,
        session,
        event_proximity: input.event_proximity,
        metrics: SnapshotMetrics {
            atr,
            spread_bps,
            volume_ratio,
            correlation_index,
            session_overlap: overlap,
            range_expansion,
        },
        execution_health: input.execution_health,
        global_mode: input.global_mode,
        why,
    }
}

fn resolve(value: Option<f64>, neutral: f64, name: &'static str, missing: &mut Vec<&'static str>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => {
            missing.push(name);
            neutral
        }
    }
}

/// First state that differs from the neutral baseline, in fixed order.
fn pick_reason(
    structure: MarketStructure,
    volatility: VolatilityBand,
    liquidity: LiquidityPhase,
    session: Session,
    event: EventProximity,
    missing: &[&'static str],
) -> Why {
    let code = if structure != MarketStructure::Range {
        ReasonCode::MclStructureShift
    } else if volatility != VolatilityBand::Normal {
        ReasonCode::MclVolatilityShift
    } else if liquidity != LiquidityPhase::Clean {
        ReasonCode::MclLiquidityShift
    } else if session != Session::Asia {
        ReasonCode::MclSessionShift
    } else if event != EventProximity::None {
        ReasonCode::MclEventWindow
    } else if !missing.is_empty() {
        ReasonCode::MclMetricMissing
    } else {
        ReasonCode::MclBaseline
    };

    let mut message = code.describe().to_string();
    if !missing.is_empty() {
        message.push_str(&format!("; neutral applied for: {}", missing.join(", ")));
    }
    Why::new(code, message)
}
