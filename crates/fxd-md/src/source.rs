//! Source boundary for OHLC bar series.
//!
//! This module defines **only** the source trait, its error type, and the
//! retry policy. No wire-protocol details belong here: the upstream feed
//! (cTrader framing, OAuth refresh) lives behind an implementation of
//! [`BarSource`] outside the core.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tracing::warn;

use fxd_schemas::{ReasonCode, SymbolBars};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`BarSource`] implementation may return.
#[derive(Debug, Clone)]
pub enum FetchError {
    /// Network or transport failure (connection refused, reset, DNS).
    Transport(String),
    /// The upstream API returned an application-level error.
    Api { code: Option<i64>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// A required configuration value (token, endpoint) is missing.
    Config(String),
    /// The call exceeded its deadline.
    Timeout,
}

impl FetchError {
    /// `true` for failures worth one more attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Timeout)
    }

    /// The provider reason code this failure surfaces as.
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            FetchError::Transport(_) | FetchError::Timeout => ReasonCode::ProvRetryExhausted,
            FetchError::Api { .. } | FetchError::Decode(_) | FetchError::Config(_) => {
                ReasonCode::ProvDown
            }
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchError::Api {
                code: Some(c),
                message,
            } => write!(f, "source api error code={c}: {message}"),
            FetchError::Api {
                code: None,
                message,
            } => write!(f, "source api error: {message}"),
            FetchError::Decode(msg) => write!(f, "decode error: {msg}"),
            FetchError::Config(msg) => write!(f, "config error: {msg}"),
            FetchError::Timeout => write!(f, "fetch deadline exceeded"),
        }
    }
}

impl std::error::Error for FetchError {}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Upstream bar-series contract: four aligned series per symbol.
///
/// Implementations must be object-safe (`Box<dyn BarSource>`) and
/// `Send + Sync` so the orchestrator can fan fetches out across threads.
pub trait BarSource: Send + Sync {
    /// Human-readable name identifying this source (e.g. `"ctrader"`).
    fn name(&self) -> &'static str;

    /// Fetch the aligned D1/H4/H1/M15 series for one symbol.
    fn fetch(&self, symbol: &str) -> Result<SymbolBars, FetchError>;
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

const MAX_RETRIES: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(150);

/// Fetch with the boundary retry policy: retryable failures get at most two
/// more attempts with a small backoff; the last error is surfaced.
pub fn fetch_with_retry(source: &dyn BarSource, symbol: &str) -> Result<SymbolBars, FetchError> {
    let mut last_err: Option<FetchError> = None;

    for attempt in 0..=MAX_RETRIES {
        match source.fetch(symbol) {
            Ok(bars) => return Ok(bars),
            Err(err) => {
                let retryable = err.is_retryable() && attempt < MAX_RETRIES;
                warn!(
                    source = source.name(),
                    symbol,
                    attempt,
                    retryable,
                    error = %err,
                    "bar fetch failed"
                );
                last_err = Some(err);
                if !retryable {
                    break;
                }
                std::thread::sleep(RETRY_BACKOFF);
            }
        }
    }

    Err(last_err.unwrap_or(FetchError::Timeout))
}

/// Best-effort batch fetch: one symbol's failure is isolated from the rest.
pub fn fetch_batch(
    source: &dyn BarSource,
    symbols: &[String],
) -> BTreeMap<String, Result<SymbolBars, FetchError>> {
    symbols
        .iter()
        .map(|s| (s.clone(), fetch_with_retry(source, s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Source that fails `failures` times, then succeeds.
    struct FlakySource {
        failures: u32,
        calls: AtomicU32,
        error: fn() -> FetchError,
    }

    impl BarSource for FlakySource {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn fetch(&self, symbol: &str) -> Result<SymbolBars, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err((self.error)());
            }
            Ok(SymbolBars {
                symbol: symbol.to_string(),
                d1: vec![],
                h4: vec![],
                h1: vec![],
                m15: vec![],
                fetched_at: Utc::now(),
            })
        }
    }

    #[test]
    fn transient_failure_is_retried() {
        let source = FlakySource {
            failures: 2,
            calls: AtomicU32::new(0),
            error: || FetchError::Transport("reset".to_string()),
        };
        let got = fetch_with_retry(&source, "EURUSD");
        assert!(got.is_ok());
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn retries_are_bounded() {
        let source = FlakySource {
            failures: 10,
            calls: AtomicU32::new(0),
            error: || FetchError::Timeout,
        };
        let got = fetch_with_retry(&source, "EURUSD");
        assert!(got.is_err());
        // Initial attempt + two retries, never more.
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn non_retryable_failure_is_not_retried() {
        let source = FlakySource {
            failures: 10,
            calls: AtomicU32::new(0),
            error: || FetchError::Config("missing token".to_string()),
        };
        let got = fetch_with_retry(&source, "EURUSD");
        assert!(got.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn batch_isolates_symbol_failures() {
        struct OneBadSymbol;
        impl BarSource for OneBadSymbol {
            fn name(&self) -> &'static str {
                "onebad"
            }
            fn fetch(&self, symbol: &str) -> Result<SymbolBars, FetchError> {
                if symbol == "USDJPY" {
                    return Err(FetchError::Api {
                        code: Some(404),
                        message: "unknown symbol".to_string(),
                    });
                }
                Ok(SymbolBars {
                    symbol: symbol.to_string(),
                    d1: vec![],
                    h4: vec![],
                    h1: vec![],
                    m15: vec![],
                    fetched_at: Utc::now(),
                })
            }
        }

        let symbols = vec!["EURUSD".to_string(), "USDJPY".to_string()];
        let got = fetch_batch(&OneBadSymbol, &symbols);
        assert!(got["EURUSD"].is_ok());
        assert!(got["USDJPY"].is_err());
    }

    #[test]
    fn reason_codes_partition_by_failure_kind() {
        assert_eq!(
            FetchError::Timeout.reason_code(),
            ReasonCode::ProvRetryExhausted
        );
        assert_eq!(
            FetchError::Decode("bad json".to_string()).reason_code(),
            ReasonCode::ProvDown
        );
    }
}
