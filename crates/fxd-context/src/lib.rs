//! Context engine (MCL): one input bundle in, one market snapshot out.
//!
//! The engine is a total pure function: no IO, no clock, no randomness, no
//! panics. A missing metric is replaced by its neutral value and noted in
//! the snapshot's `why` message.

pub mod engine;
pub mod metrics;

pub use engine::{build_snapshot, ContextInput};
pub use metrics::{compute_metrics, MetricsInput};
