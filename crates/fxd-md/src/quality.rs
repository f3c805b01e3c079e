//! Data-quality gate for one fetched bar series.
//!
//! Classification rules, evaluated against the fetch instant:
//!
//! | Status          | Condition                                             |
//! |-----------------|-------------------------------------------------------|
//! | `MARKET_CLOSED` | inside the FX weekend window                          |
//! | `DOWN`          | empty series on a trading day                         |
//! | `DEGRADED`      | last bar older than 2× the interval, or any internal  |
//! |                 | gap wider than 3× the interval                        |
//! | `OK`            | otherwise                                             |
//!
//! `volume_missing` is informational and never changes the status.
//! The function is deterministic and never panics: classification of a
//! malformed series is a status, not an error.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use fxd_schemas::{Bar, ProviderStatus, Timeframe};

/// The status type is shared with the operational state's provider map.
pub type DataQualityStatus = ProviderStatus;

// ---------------------------------------------------------------------------
// FX weekend window
// ---------------------------------------------------------------------------

/// The FX weekend: Friday from 22:00 UTC, all Saturday, Sunday until
/// 21:00 UTC.
pub fn is_fx_weekend(now: DateTime<Utc>) -> bool {
    match now.weekday() {
        Weekday::Fri => now.hour() >= 22,
        Weekday::Sat => true,
        Weekday::Sun => now.hour() < 21,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// An internal gap wider than the degradation threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapIssue {
    pub prev_ts: DateTime<Utc>,
    pub next_ts: DateTime<Utc>,
    pub delta_secs: i64,
    pub expected_step_secs: i64,
}

/// The quality verdict for one `(symbol, timeframe)` series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub status: DataQualityStatus,
    pub reason: String,
    pub gaps: Vec<GapIssue>,
    pub stale: bool,
    pub market_closed: bool,
    pub volume_missing: bool,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

const STALE_MULTIPLIER: i64 = 2;
const GAP_MULTIPLIER: i64 = 3;

/// Classify one series. `now` is the fetch instant supplied by the caller;
/// no clock is read here.
pub fn data_quality(
    series: &[Bar],
    timeframe: Timeframe,
    symbol: &str,
    now: DateTime<Utc>,
) -> QualityReport {
    let step = timeframe.secs();

    if is_fx_weekend(now) {
        return QualityReport {
            status: DataQualityStatus::MarketClosed,
            reason: format!("{symbol} {timeframe}: FX weekend window"),
            gaps: Vec::new(),
            stale: false,
            market_closed: true,
            volume_missing: false,
        };
    }

    if series.is_empty() {
        return QualityReport {
            status: DataQualityStatus::Down,
            reason: format!("{symbol} {timeframe}: empty series on a trading day"),
            gaps: Vec::new(),
            stale: false,
            market_closed: false,
            volume_missing: false,
        };
    }

    // Last-bar staleness.
    let last_ts = series.last().map(|b| b.timestamp).unwrap_or(now);
    let age_secs = (now - last_ts).num_seconds();
    let stale = age_secs > STALE_MULTIPLIER * step;

    // Internal gaps wider than the tolerance.
    let mut gaps = Vec::new();
    for w in series.windows(2) {
        let delta = (w[1].timestamp - w[0].timestamp).num_seconds();
        if delta > GAP_MULTIPLIER * step {
            gaps.push(GapIssue {
                prev_ts: w[0].timestamp,
                next_ts: w[1].timestamp,
                delta_secs: delta,
                expected_step_secs: step,
            });
        }
    }

    let volume_missing = series.iter().all(|b| b.volume <= 0.0);

    let (status, reason) = if stale {
        (
            DataQualityStatus::Degraded,
            format!("{symbol} {timeframe}: last bar {age_secs}s old (limit {})", STALE_MULTIPLIER * step),
        )
    } else if !gaps.is_empty() {
        (
            DataQualityStatus::Degraded,
            format!("{symbol} {timeframe}: {} gap(s) wider than {}s", gaps.len(), GAP_MULTIPLIER * step),
        )
    } else {
        (
            DataQualityStatus::Ok,
            format!("{symbol} {timeframe}: nominal"),
        )
    };

    QualityReport {
        status,
        reason,
        gaps,
        stale,
        market_closed: false,
        volume_missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bar(ts: DateTime<Utc>, volume: f64) -> Bar {
        Bar {
            open: 1.1000,
            high: 1.1010,
            low: 1.0990,
            close: 1.1005,
            volume,
            timestamp: ts,
        }
    }

    /// A Wednesday well inside trading hours.
    fn trading_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 14, 0, 0).unwrap()
    }

    fn fresh_series(now: DateTime<Utc>, step_secs: i64, n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let ts = now - Duration::seconds(step_secs * (n as i64 - i as i64));
                bar(ts, 1000.0)
            })
            .collect()
    }

    // --- weekend window ---

    #[test]
    fn weekend_window_boundaries() {
        // Friday 21:59 is still trading; 22:00 is closed.
        assert!(!is_fx_weekend(
            Utc.with_ymd_and_hms(2026, 3, 6, 21, 59, 0).unwrap()
        ));
        assert!(is_fx_weekend(
            Utc.with_ymd_and_hms(2026, 3, 6, 22, 0, 0).unwrap()
        ));
        // Saturday all day.
        assert!(is_fx_weekend(
            Utc.with_ymd_and_hms(2026, 3, 7, 3, 0, 0).unwrap()
        ));
        // Sunday 20:59 closed; 21:00 open.
        assert!(is_fx_weekend(
            Utc.with_ymd_and_hms(2026, 3, 8, 20, 59, 0).unwrap()
        ));
        assert!(!is_fx_weekend(
            Utc.with_ymd_and_hms(2026, 3, 8, 21, 0, 0).unwrap()
        ));
    }

    #[test]
    fn weekend_classifies_market_closed_even_when_empty() {
        let now = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
        let report = data_quality(&[], Timeframe::H1, "EURUSD", now);
        assert_eq!(report.status, DataQualityStatus::MarketClosed);
        assert!(report.market_closed);
    }

    // --- down ---

    #[test]
    fn empty_series_on_trading_day_is_down() {
        let report = data_quality(&[], Timeframe::H1, "EURUSD", trading_now());
        assert_eq!(report.status, DataQualityStatus::Down);
    }

    // --- degraded ---

    #[test]
    fn stale_last_bar_is_degraded() {
        let now = trading_now();
        let mut series = fresh_series(now, 3600, 5);
        // Push everything back so the last bar is 3 intervals old.
        for b in &mut series {
            b.timestamp = b.timestamp - Duration::seconds(3 * 3600);
        }
        let report = data_quality(&series, Timeframe::H1, "EURUSD", now);
        assert_eq!(report.status, DataQualityStatus::Degraded);
        assert!(report.stale);
    }

    #[test]
    fn internal_gap_over_threshold_is_degraded() {
        let now = trading_now();
        let step = 900;
        let series = vec![
            bar(now - Duration::seconds(step * 6), 1000.0),
            // gap of 4 intervals (> 3x tolerance)
            bar(now - Duration::seconds(step * 2), 1000.0),
            bar(now - Duration::seconds(step), 1000.0),
        ];
        let report = data_quality(&series, Timeframe::M15, "GBPUSD", now);
        assert_eq!(report.status, DataQualityStatus::Degraded);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].expected_step_secs, step);
        assert_eq!(report.gaps[0].delta_secs, step * 4);
    }

    #[test]
    fn gap_at_threshold_is_tolerated() {
        let now = trading_now();
        let step = 3600;
        let series = vec![
            bar(now - Duration::seconds(step * 4), 1000.0),
            // exactly 3 intervals: tolerated
            bar(now - Duration::seconds(step), 1000.0),
        ];
        let report = data_quality(&series, Timeframe::H1, "EURUSD", now);
        assert_eq!(report.status, DataQualityStatus::Ok);
        assert!(report.gaps.is_empty());
    }

    // --- ok / informational ---

    #[test]
    fn fresh_contiguous_series_is_ok() {
        let now = trading_now();
        let series = fresh_series(now, 3600, 10);
        let report = data_quality(&series, Timeframe::H1, "EURUSD", now);
        assert_eq!(report.status, DataQualityStatus::Ok);
        assert!(!report.stale);
        assert!(!report.volume_missing);
    }

    #[test]
    fn zero_volume_is_informational_only() {
        let now = trading_now();
        let series: Vec<Bar> = fresh_series(now, 3600, 5)
            .into_iter()
            .map(|mut b| {
                b.volume = 0.0;
                b
            })
            .collect();
        let report = data_quality(&series, Timeframe::H1, "EURUSD", now);
        assert_eq!(report.status, DataQualityStatus::Ok);
        assert!(report.volume_missing);
    }

    #[test]
    fn status_maps_to_prov_reason_codes() {
        use fxd_schemas::ReasonCode;
        assert_eq!(DataQualityStatus::Ok.reason_code(), ReasonCode::ProvOk);
        assert_eq!(
            DataQualityStatus::MarketClosed.reason_code(),
            ReasonCode::ProvMarketClosed
        );
    }
}
