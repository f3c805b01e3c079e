//! A failing symbol is appended as a WARN provider event and the tick
//! carries on with the rest.

mod common;

use common::{count_type, trading_now, Rig};
use fxd_ledger::EventLedger;
use fxd_md::{BarSource, FetchError, ScenarioSource};
use fxd_runtime::{Desk, TickDeps};
use fxd_schemas::{EventType, ProviderStatus, Severity, SymbolBars};

/// Delegates to the scenario source but refuses one symbol outright.
struct OneBadSymbol {
    inner: ScenarioSource,
    bad: &'static str,
}

impl BarSource for OneBadSymbol {
    fn name(&self) -> &'static str {
        "one-bad-symbol"
    }

    fn fetch(&self, symbol: &str) -> Result<SymbolBars, FetchError> {
        if symbol == self.bad {
            return Err(FetchError::Api {
                code: Some(503),
                message: "upstream unavailable".to_string(),
            });
        }
        self.inner.fetch(symbol)
    }
}

#[test]
fn scenario_symbol_failure_isolated() {
    let rig = Rig::trending();
    let source = OneBadSymbol {
        inner: ScenarioSource::new(fxd_md::Scenario::TrendUp, trading_now()),
        bad: "USDJPY",
    };
    let deps = TickDeps {
        ledger: &rig.ledger,
        hub: None,
        source: &source,
        registry: &rig.registry,
        executor: rig.sim.as_ref(),
    };

    let mut desk = Desk::new();
    let summary = desk
        .run_tick(&deps, &rig.args(&["EURUSD", "USDJPY"]))
        .unwrap();

    let events = rig.ledger.by_correlation(summary.correlation_id).unwrap();

    // The healthy symbol went through the whole pipeline.
    assert_eq!(count_type(&events, EventType::MclSnapshot), 1);
    assert!(summary.has_brain_intent_or_skip);
    assert!(summary.has_pm_decision);

    // The failing one left a WARN provider event and a DOWN provider state.
    let failure = events
        .iter()
        .find(|ev| {
            ev.event_type == EventType::ProvStateChange
                && ev.symbol.as_deref() == Some("USDJPY")
                && ev.severity == Severity::Warn
        })
        .expect("provider failure event");
    assert!(failure.payload["error"]
        .as_str()
        .unwrap()
        .contains("upstream unavailable"));
    assert_eq!(
        desk.ops.provider_states.get("USDJPY"),
        Some(&ProviderStatus::Down)
    );
    assert_eq!(
        desk.ops.provider_states.get("EURUSD"),
        Some(&ProviderStatus::Ok)
    );
}
