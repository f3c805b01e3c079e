//! Metric precomputation for the context input bundle.
//!
//! Everything derivable from the fetched bars is computed here; metrics that
//! need data the bars cannot supply (cross-symbol correlation, live spread)
//! stay `None` and the engine applies their neutral value.

use fxd_schemas::{Bar, SymbolBars};

/// Optional metrics feeding [`crate::build_snapshot`]. `None` means the
/// input bundle could not supply the metric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsInput {
    /// Mean true range of the recent H1 window.
    pub atr: Option<f64>,
    /// Reference ATR (full-series mean) the volatility ratio compares to.
    pub atr_ref: Option<f64>,
    pub spread_bps: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub correlation_index: Option<f64>,
    pub range_expansion: Option<f64>,
}

const ATR_WINDOW: usize = 14;

/// Mean true range over the last `window` bars of a series.
fn mean_true_range(bars: &[Bar], window: usize) -> Option<f64> {
    if bars.len() < 2 {
        return None;
    }
    let start = bars.len().saturating_sub(window + 1);
    let slice = &bars[start..];

    let mut sum = 0.0;
    let mut n = 0usize;
    for w in slice.windows(2) {
        let prev_close = w[0].close;
        let bar = &w[1];
        let tr = (bar.high - bar.low)
            .max((bar.high - prev_close).abs())
            .max((bar.low - prev_close).abs());
        sum += tr;
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Derive the bar-sourced metrics for one symbol.
pub fn compute_metrics(bars: &SymbolBars) -> MetricsInput {
    let atr = mean_true_range(&bars.h1, ATR_WINDOW);
    let atr_ref = mean_true_range(&bars.h1, bars.h1.len());

    // Spread proxy from M15 geometry: a twentieth of the mean range in bps
    // of the last close. A live feed overrides this at the boundary.
    let spread_bps = match (bars.m15.last(), mean_range(&bars.m15)) {
        (Some(last), Some(range)) if last.close > 0.0 => {
            Some(range / last.close * 10_000.0 * 0.05)
        }
        _ => None,
    };

    let volume_ratio = match (bars.m15.last(), mean_volume(&bars.m15)) {
        (Some(last), Some(mean)) if mean > 0.0 => Some(last.volume / mean),
        _ => None,
    };

    let range_expansion = match (bars.h1.last(), mean_range(&bars.h1)) {
        (Some(last), Some(mean)) if mean > 0.0 => Some(last.range() / mean),
        _ => None,
    };

    MetricsInput {
        atr,
        atr_ref,
        spread_bps,
        volume_ratio,
        // Needs the full symbol set; the orchestrator fills it when it can.
        correlation_index: None,
        range_expansion,
    }
}

fn mean_range(bars: &[Bar]) -> Option<f64> {
    if bars.is_empty() {
        return None;
    }
    Some(bars.iter().map(Bar::range).sum::<f64>() / bars.len() as f64)
}

fn mean_volume(bars: &[Bar]) -> Option<f64> {
    if bars.is_empty() {
        return None;
    }
    Some(bars.iter().map(|b| b.volume).sum::<f64>() / bars.len() as f64)
}
