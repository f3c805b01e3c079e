//! Shared wiring for the runtime scenario tests: memory ledger, scenario
//! source, standard registry, simulator.

// Each scenario binary uses its own slice of this module.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use fxd_brains::BrainRegistry;
use fxd_exec::SimulatedExecutor;
use fxd_ledger::MemoryLedger;
use fxd_md::{Scenario, ScenarioSource};
use fxd_runtime::{Desk, TickArgs, TickDeps};
use fxd_schemas::{ActorRole, EventType, LedgerEvent};

pub struct Rig {
    pub ledger: MemoryLedger,
    pub source: ScenarioSource,
    pub registry: BrainRegistry,
    pub sim: Arc<SimulatedExecutor>,
}

impl Rig {
    /// Trend-up scenario anchored at a Wednesday 14:00 UTC (NY session).
    pub fn trending() -> Self {
        Self::with_scenario(Scenario::TrendUp)
    }

    pub fn with_scenario(scenario: Scenario) -> Self {
        Self {
            ledger: MemoryLedger::new(),
            source: ScenarioSource::new(scenario, trading_now()),
            registry: BrainRegistry::standard(),
            sim: Arc::new(SimulatedExecutor::new()),
        }
    }

    pub fn deps(&self) -> TickDeps<'_> {
        TickDeps {
            ledger: &self.ledger,
            hub: None,
            source: &self.source,
            registry: &self.registry,
            executor: self.sim.as_ref(),
        }
    }

    /// Wire the simulator's lifecycle callbacks into the desk's inbox.
    pub fn wire_lifecycle(&self, desk: &Desk) {
        let inbox = desk.lifecycle_inbox();
        self.sim.on_lifecycle(move |ev| {
            inbox.lock().expect("inbox poisoned").push(ev.clone());
        });
    }

    pub fn args(&self, symbols: &[&str]) -> TickArgs {
        TickArgs::new(
            symbols.iter().map(|s| s.to_string()).collect(),
            trading_now(),
        )
    }
}

pub fn trading_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 4, 14, 0, 0).unwrap()
}

pub fn admin() -> fxd_runtime::Actor {
    fxd_runtime::Actor::new("ops-admin", ActorRole::Admin)
}

pub fn count_type(events: &[LedgerEvent], event_type: EventType) -> usize {
    events
        .iter()
        .filter(|ev| ev.event_type == event_type)
        .count()
}

/// Assert `wanted` appears as a subsequence of the event-type stream.
pub fn assert_subsequence(events: &[LedgerEvent], wanted: &[EventType]) {
    let mut it = wanted.iter();
    let mut next = it.next();
    for ev in events {
        if Some(&ev.event_type) == next {
            next = it.next();
        }
    }
    assert!(
        next.is_none(),
        "missing {next:?} in stream {:?}",
        events.iter().map(|e| e.event_type).collect::<Vec<_>>()
    );
}
