//! The executor port contract and health derivation.

use serde::{Deserialize, Serialize};

use fxd_schemas::{CommandEnvelope, ConnectivityState, ExecutionHealth, SendOutcome};

/// Point-in-time executor health as reported by `status()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecStatus {
    pub state: ExecutionHealth,
    pub latency_ms: u64,
    pub error_rate: f64,
    pub connectivity: ConnectivityState,
}

/// The two interchangeable executor implementations sit behind this trait.
/// Both operations complete within their deadline or report a typed failure;
/// neither panics.
pub trait ExecutorPort: Send + Sync {
    fn name(&self) -> &'static str;

    fn status(&self) -> ExecStatus;

    fn send(&self, envelope: &CommandEnvelope) -> SendOutcome;
}

/// Health thresholds of the executor contract.
///
/// | Condition                              | State    |
/// |----------------------------------------|----------|
/// | latency > 2000 ms or error rate > 0.5  | BROKEN   |
/// | latency > 500 ms or error rate > 0.2   | DEGRADED |
/// | otherwise                              | OK       |
pub fn derive_execution_state(latency_ms: u64, error_rate: f64) -> ExecutionHealth {
    if latency_ms > 2000 || error_rate > 0.5 {
        ExecutionHealth::Broken
    } else if latency_ms > 500 || error_rate > 0.2 {
        ExecutionHealth::Degraded
    } else {
        ExecutionHealth::Ok
    }
}
