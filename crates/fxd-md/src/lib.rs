//! Market-data port: the bar-series source boundary, the retry policy, the
//! data-quality gate, and the deterministic scenario source used in shadow
//! and paper gates.

pub mod quality;
pub mod scenario;
pub mod source;

pub use quality::{data_quality, is_fx_weekend, DataQualityStatus, GapIssue, QualityReport};
pub use scenario::{Scenario, ScenarioSource};
pub use source::{fetch_batch, fetch_with_retry, BarSource, FetchError};
