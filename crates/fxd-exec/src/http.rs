//! Live executor adapter: HTTP to the external execution service.
//!
//! reqwest's blocking client is deliberate: this adapter is the single
//! blocking choke-point for executor IO. Callers running inside an async
//! context must wrap calls in `tokio::task::block_in_place` so the worker
//! does not stall its runtime (lifecycle callbacks arrive over a webhook
//! handled outside the core).
//!
//! Both `status()` and `send()` complete within the 3 s deadline or are
//! retried once; definitive failures map to typed `EXEC_*` outcomes, never
//! to a panic or an unbounded wait.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::warn;

use fxd_schemas::{
    CommandEnvelope, ConnectivityState, ExecutionHealth, ReasonCode, SendOutcome,
};

use crate::port::{derive_execution_state, ExecStatus, ExecutorPort};

const CALL_DEADLINE: Duration = Duration::from_secs(3);

pub struct HttpExecutor {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpExecutor {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(CALL_DEADLINE)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn commands_url(&self) -> String {
        format!("{}/v1/commands", self.base_url.trim_end_matches('/'))
    }

    fn status_url(&self) -> String {
        format!("{}/v1/status", self.base_url.trim_end_matches('/'))
    }

    fn send_once(&self, envelope: &CommandEnvelope) -> Result<(), ReasonCode> {
        let response = self
            .client
            .post(self.commands_url())
            .json(envelope)
            .send()
            .map_err(classify_transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ReasonCode::ExecOrderFailed)
        }
    }
}

/// Timeouts are their own failure class; everything else at the transport
/// level means the executor is unreachable.
fn classify_transport_error(err: reqwest::Error) -> ReasonCode {
    if err.is_timeout() {
        ReasonCode::ExecOrderTimeout
    } else {
        ReasonCode::ExecBroken
    }
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    latency_ms: u64,
    error_rate: f64,
}

impl ExecutorPort for HttpExecutor {
    fn name(&self) -> &'static str {
        "live"
    }

    fn status(&self) -> ExecStatus {
        let started = Instant::now();
        let result = self
            .client
            .get(self.status_url())
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<StatusBody>());

        match result {
            Ok(body) => ExecStatus {
                state: derive_execution_state(body.latency_ms, body.error_rate),
                latency_ms: body.latency_ms,
                error_rate: body.error_rate,
                connectivity: ConnectivityState::Connected,
            },
            Err(err) => {
                warn!(error = %err, "executor status probe failed");
                ExecStatus {
                    state: ExecutionHealth::Broken,
                    latency_ms: started.elapsed().as_millis() as u64,
                    error_rate: 1.0,
                    connectivity: ConnectivityState::Disconnected,
                }
            }
        }
    }

    fn send(&self, envelope: &CommandEnvelope) -> SendOutcome {
        let started = Instant::now();

        // One retry after a failed attempt, then surface the typed failure.
        let mut last = ReasonCode::ExecOrderFailed;
        for attempt in 0..2 {
            match self.send_once(envelope) {
                Ok(()) => {
                    return SendOutcome::accepted(started.elapsed().as_millis() as u64);
                }
                Err(code) => {
                    warn!(
                        attempt,
                        command = envelope.command.command_type().as_str(),
                        code = code.as_str(),
                        "executor send failed"
                    );
                    last = code;
                }
            }
        }

        SendOutcome::failed(last, started.elapsed().as_millis() as u64)
    }
}
