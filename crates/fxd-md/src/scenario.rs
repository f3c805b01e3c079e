//! Deterministic synthetic bar source.
//!
//! Drives the pipeline in shadow (G0) and paper (G1) gates without any
//! upstream feed. Generation is pure arithmetic over a per-symbol seed and
//! the caller-supplied anchor instant (no RNG, no clock reads), so a tick
//! replayed with the same anchor produces byte-identical series.
//!
//! A scenario override is one-shot: it is chosen per tick by the caller and
//! never stored in operational state.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use fxd_schemas::{Bar, SymbolBars, Timeframe};

use crate::source::{BarSource, FetchError};

const SERIES_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Pick a regime per symbol from its seed.
    Auto,
    TrendUp,
    TrendDown,
    Range,
    /// Wide ranges, raid-shaped M15 bars; exercises HIGH volatility and
    /// RAID liquidity classification.
    Stress,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Auto => "AUTO",
            Scenario::TrendUp => "TREND_UP",
            Scenario::TrendDown => "TREND_DOWN",
            Scenario::Range => "RANGE",
            Scenario::Stress => "STRESS",
        }
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AUTO" => Ok(Scenario::Auto),
            "TREND_UP" => Ok(Scenario::TrendUp),
            "TREND_DOWN" => Ok(Scenario::TrendDown),
            "RANGE" => Ok(Scenario::Range),
            "STRESS" => Ok(Scenario::Stress),
            other => Err(format!("unknown scenario: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Synthetic [`BarSource`] for one scenario at one anchor instant.
pub struct ScenarioSource {
    scenario: Scenario,
    anchor: DateTime<Utc>,
}

impl ScenarioSource {
    pub fn new(scenario: Scenario, anchor: DateTime<Utc>) -> Self {
        Self { scenario, anchor }
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }
}

impl BarSource for ScenarioSource {
    fn name(&self) -> &'static str {
        "scenario"
    }

    fn fetch(&self, symbol: &str) -> Result<SymbolBars, FetchError> {
        let seed = symbol_seed(symbol);
        let resolved = resolve(self.scenario, seed);

        Ok(SymbolBars {
            symbol: symbol.to_string(),
            d1: gen_series(resolved, seed, Timeframe::D1, self.anchor),
            h4: gen_series(resolved, seed, Timeframe::H4, self.anchor),
            h1: gen_series(resolved, seed, Timeframe::H1, self.anchor),
            m15: gen_series(resolved, seed, Timeframe::M15, self.anchor),
            fetched_at: self.anchor,
        })
    }
}

fn symbol_seed(symbol: &str) -> u64 {
    symbol.bytes().fold(0u64, |acc, b| {
        acc.wrapping_mul(31).wrapping_add(b as u64)
    })
}

fn resolve(scenario: Scenario, seed: u64) -> Scenario {
    match scenario {
        Scenario::Auto => match seed % 3 {
            0 => Scenario::TrendUp,
            1 => Scenario::Range,
            _ => Scenario::TrendDown,
        },
        other => other,
    }
}

fn base_price(seed: u64) -> f64 {
    0.80 + (seed % 90) as f64 * 0.01
}

fn gen_series(
    scenario: Scenario,
    seed: u64,
    tf: Timeframe,
    anchor: DateTime<Utc>,
) -> Vec<Bar> {
    let base = base_price(seed);
    let pip = 0.0002;
    let step = tf.secs();

    (0..SERIES_LEN)
        .map(|i| {
            let timestamp = anchor - Duration::seconds(step * (SERIES_LEN - i) as i64);
            let volume = 900.0 + ((seed as usize + i * 7) % 300) as f64;
            let fi = i as f64;

            let (open, high, low, close) = match scenario {
                Scenario::TrendUp => {
                    // Strictly rising closes and strictly rising lows.
                    let close = base + fi * pip;
                    let open = close - 0.6 * pip;
                    (open, close + 0.4 * pip, open - 0.4 * pip, close)
                }
                Scenario::TrendDown => {
                    // Strictly falling closes and strictly falling highs.
                    let close = base - fi * pip;
                    let open = close + 0.6 * pip;
                    (open, open + 0.4 * pip, close - 0.4 * pip, close)
                }
                Scenario::Range => {
                    // Tight oscillation around base; overlapping bodies. The
                    // cycle sums to zero so recent closes centre on base.
                    let offset = match i % 4 {
                        0 => 0.0,
                        1 => 0.2,
                        2 => -0.2,
                        _ => 0.0,
                    } * pip;
                    let close = base + offset;
                    let open = base - offset;
                    let hi = base + 0.5 * pip;
                    let lo = base - 0.5 * pip;
                    (open, hi, lo, close)
                }
                Scenario::Stress => {
                    // Swings widen through the series so recent ATR runs hot
                    // against the series reference; dominant upper wick keeps
                    // body/range under 0.3 for raid classification.
                    let range = pip * (2.0 + fi / 4.0);
                    let dir = if i % 2 == 0 { 1.0 } else { -1.0 };
                    let open = base + dir * 0.5 * pip;
                    let close = open + dir * 0.2 * range;
                    let low = open.min(close) - 0.05 * range;
                    let high = low + range;
                    (open, high, low, close)
                }
                // Auto resolved before generation.
                Scenario::Auto => unreachable!("auto resolves to a concrete scenario"),
            };

            Bar {
                open,
                high,
                low,
                close,
                volume,
                timestamp,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 14, 0, 0).unwrap()
    }

    #[test]
    fn generation_is_deterministic() {
        let a = ScenarioSource::new(Scenario::Auto, anchor());
        let b = ScenarioSource::new(Scenario::Auto, anchor());
        assert_eq!(a.fetch("EURUSD").unwrap(), b.fetch("EURUSD").unwrap());
    }

    #[test]
    fn series_are_aligned_and_fresh() {
        let source = ScenarioSource::new(Scenario::TrendUp, anchor());
        let bars = source.fetch("EURUSD").unwrap();
        assert_eq!(bars.h1.len(), SERIES_LEN);
        // Last bar lands one step before the anchor.
        let last = bars.h1.last().unwrap();
        assert_eq!((anchor() - last.timestamp).num_seconds(), 3600);
        let last_m15 = bars.m15.last().unwrap();
        assert_eq!((anchor() - last_m15.timestamp).num_seconds(), 900);
    }

    #[test]
    fn trend_up_has_rising_closes_and_lows() {
        let source = ScenarioSource::new(Scenario::TrendUp, anchor());
        let bars = source.fetch("EURUSD").unwrap();
        let h1 = &bars.h1;
        let n = h1.len();
        for w in h1[n - 3..].windows(2) {
            assert!(w[1].close > w[0].close);
            assert!(w[1].low > w[0].low);
        }
    }

    #[test]
    fn trend_down_has_falling_closes_and_highs() {
        let source = ScenarioSource::new(Scenario::TrendDown, anchor());
        let bars = source.fetch("EURUSD").unwrap();
        let h1 = &bars.h1;
        let n = h1.len();
        for w in h1[n - 3..].windows(2) {
            assert!(w[1].close < w[0].close);
            assert!(w[1].high < w[0].high);
        }
    }

    #[test]
    fn stress_m15_bars_are_raid_shaped() {
        let source = ScenarioSource::new(Scenario::Stress, anchor());
        let bars = source.fetch("EURUSD").unwrap();
        let last = bars.m15.last().unwrap();
        assert!(last.body() / last.range() < 0.3);
    }

    #[test]
    fn bar_geometry_is_coherent() {
        for scenario in [
            Scenario::TrendUp,
            Scenario::TrendDown,
            Scenario::Range,
            Scenario::Stress,
        ] {
            let source = ScenarioSource::new(scenario, anchor());
            let bars = source.fetch("GBPUSD").unwrap();
            for b in bars.h1.iter().chain(&bars.m15) {
                assert!(b.high >= b.low, "{scenario:?}: high < low");
                assert!(b.high >= b.open && b.high >= b.close, "{scenario:?}");
                assert!(b.low <= b.open && b.low <= b.close, "{scenario:?}");
            }
        }
    }

    #[test]
    fn auto_resolution_is_stable_per_symbol() {
        let source = ScenarioSource::new(Scenario::Auto, anchor());
        let a = source.fetch("EURUSD").unwrap();
        let b = source.fetch("EURUSD").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn scenario_parse_round_trip() {
        for s in ["AUTO", "TREND_UP", "TREND_DOWN", "RANGE", "STRESS"] {
            let parsed: Scenario = s.parse().unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert!("WILD".parse::<Scenario>().is_err());
    }
}
