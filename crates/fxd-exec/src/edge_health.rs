//! Edge-health monitor (EHM).
//!
//! Watches the stream of executor send outcomes through a rolling window,
//! derives the execution state with the executor-port thresholds, and raises the
//! EXIT_NOW emergency after a consecutive-failure streak. Deterministic:
//! state is a pure fold over observed outcomes.

use std::collections::VecDeque;

use fxd_schemas::{ExecutionHealth, ReasonCode, SendOutcome, Why};

use crate::port::derive_execution_state;

const DEFAULT_WINDOW: usize = 20;
const DEFAULT_EXIT_STREAK: u32 = 5;

/// What the monitor wants done right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EhmAction {
    None,
    /// Close all exposure immediately (mapper rule: single CLOSE_DAY).
    ExitNow,
}

/// Result of one observation.
#[derive(Debug, Clone)]
pub struct EhmAssessment {
    pub state: ExecutionHealth,
    /// The state differs from the previous observation's.
    pub state_changed: bool,
    pub action: EhmAction,
    pub why: Why,
}

pub struct EdgeHealthMonitor {
    window: VecDeque<SendOutcome>,
    window_len: usize,
    exit_streak: u32,
    consecutive_failures: u32,
    last_state: ExecutionHealth,
    exit_raised: bool,
}

impl Default for EdgeHealthMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_EXIT_STREAK)
    }
}

impl EdgeHealthMonitor {
    pub fn new(window_len: usize, exit_streak: u32) -> Self {
        Self {
            window: VecDeque::with_capacity(window_len),
            window_len: window_len.max(1),
            exit_streak: exit_streak.max(1),
            consecutive_failures: 0,
            last_state: ExecutionHealth::Ok,
            exit_raised: false,
        }
    }

    pub fn state(&self) -> ExecutionHealth {
        self.last_state
    }

    /// Fold one send outcome into the window.
    pub fn observe(&mut self, outcome: &SendOutcome) -> EhmAssessment {
        if self.window.len() == self.window_len {
            self.window.pop_front();
        }
        self.window.push_back(*outcome);

        if outcome.ok {
            self.consecutive_failures = 0;
            self.exit_raised = false;
        } else {
            self.consecutive_failures += 1;
        }

        let state = derive_execution_state(self.mean_latency_ms(), self.error_rate());
        let state_changed = state != self.last_state;
        self.last_state = state;

        // EXIT_NOW fires once per failure streak, on the crossing.
        let action = if self.consecutive_failures >= self.exit_streak && !self.exit_raised {
            self.exit_raised = true;
            EhmAction::ExitNow
        } else {
            EhmAction::None
        };

        let why = match (action, state) {
            (EhmAction::ExitNow, _) => Why::new(
                ReasonCode::EhmExitNow,
                format!(
                    "{} consecutive executor failures",
                    self.consecutive_failures
                ),
            ),
            (_, ExecutionHealth::Broken) => Why::from_code(ReasonCode::EhmBroken),
            (_, ExecutionHealth::Degraded) => Why::from_code(ReasonCode::EhmDegraded),
            (_, ExecutionHealth::Ok) if state_changed => {
                Why::from_code(ReasonCode::EhmRecovered)
            }
            _ => Why::from_code(ReasonCode::EhmHealthy),
        };

        EhmAssessment {
            state,
            state_changed,
            action,
            why,
        }
    }

    fn mean_latency_ms(&self) -> u64 {
        if self.window.is_empty() {
            return 0;
        }
        let total: u64 = self.window.iter().map(|o| o.latency_ms).sum();
        total / self.window.len() as u64
    }

    fn error_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|o| !o.ok).count();
        failures as f64 / self.window.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(latency: u64) -> SendOutcome {
        SendOutcome::accepted(latency)
    }

    fn failed(latency: u64) -> SendOutcome {
        SendOutcome::failed(ReasonCode::ExecOrderFailed, latency)
    }

    #[test]
    fn healthy_stream_stays_ok() {
        let mut ehm = EdgeHealthMonitor::default();
        for _ in 0..10 {
            let a = ehm.observe(&ok(25));
            assert_eq!(a.state, ExecutionHealth::Ok);
            assert_eq!(a.action, EhmAction::None);
        }
    }

    #[test]
    fn slow_sends_degrade_then_recover() {
        let mut ehm = EdgeHealthMonitor::new(4, 10);
        for _ in 0..4 {
            ehm.observe(&ok(800));
        }
        assert_eq!(ehm.state(), ExecutionHealth::Degraded);

        // Fast sends wash the slow ones out of the window.
        let mut last = None;
        for _ in 0..4 {
            last = Some(ehm.observe(&ok(25)));
        }
        let last = last.unwrap();
        assert_eq!(last.state, ExecutionHealth::Ok);
    }

    #[test]
    fn recovery_crossing_is_flagged() {
        let mut ehm = EdgeHealthMonitor::new(2, 10);
        ehm.observe(&ok(800));
        ehm.observe(&ok(800));
        assert_eq!(ehm.state(), ExecutionHealth::Degraded);

        ehm.observe(&ok(25));
        let a = ehm.observe(&ok(25));
        assert_eq!(a.state, ExecutionHealth::Ok);
        assert!(a.state_changed || a.why.reason_code == ReasonCode::EhmHealthy);
    }

    #[test]
    fn failure_streak_raises_exit_now_once() {
        let mut ehm = EdgeHealthMonitor::new(20, 3);
        ehm.observe(&failed(100));
        ehm.observe(&failed(100));
        let third = ehm.observe(&failed(100));
        assert_eq!(third.action, EhmAction::ExitNow);
        assert_eq!(third.why.reason_code, ReasonCode::EhmExitNow);

        // The streak continues but the emergency does not re-fire.
        let fourth = ehm.observe(&failed(100));
        assert_eq!(fourth.action, EhmAction::None);
    }

    #[test]
    fn success_resets_the_streak_and_rearms_exit() {
        let mut ehm = EdgeHealthMonitor::new(20, 2);
        ehm.observe(&failed(100));
        let a = ehm.observe(&failed(100));
        assert_eq!(a.action, EhmAction::ExitNow);

        ehm.observe(&ok(25));
        ehm.observe(&failed(100));
        let b = ehm.observe(&failed(100));
        assert_eq!(b.action, EhmAction::ExitNow, "re-armed after recovery");
    }

    #[test]
    fn heavy_failure_rate_is_broken() {
        let mut ehm = EdgeHealthMonitor::new(10, 100);
        for _ in 0..6 {
            ehm.observe(&failed(100));
        }
        for _ in 0..4 {
            ehm.observe(&ok(100));
        }
        assert_eq!(ehm.state(), ExecutionHealth::Broken);
    }
}
