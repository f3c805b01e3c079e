//! Armed at G1, an allowed intent walks the simulator and the full
//! lifecycle lands in the ledger under the tick's correlation id.

mod common;

use common::{admin, assert_subsequence, count_type, Rig};
use fxd_ledger::EventLedger;
use fxd_runtime::Desk;
use fxd_schemas::{EventType, Gate};

fn armed_g1_desk(rig: &Rig) -> Desk {
    let mut desk = Desk::new();
    rig.wire_lifecycle(&desk);
    desk.run_tick(&rig.deps(), &rig.args(&["EURUSD"])).unwrap();
    desk.change_gate(&rig.deps(), &admin(), Gate::G1).unwrap();
    desk.arm(&rig.deps(), &admin(), "ARM").unwrap();
    desk
}

#[test]
fn scenario_simulator_lifecycle_armed_g1() {
    let rig = Rig::trending();
    let mut desk = armed_g1_desk(&rig);

    let summary = desk.run_tick(&rig.deps(), &rig.args(&["EURUSD"])).unwrap();
    let events = rig.ledger.by_correlation(summary.correlation_id).unwrap();

    // The contract sequence, in order, inside one correlation.
    assert_subsequence(
        &events,
        &[
            EventType::MclSnapshot,
            EventType::BrainIntent,
            EventType::PmDecision,
            EventType::ExecutorCommand,
            EventType::ExecSimulatedFill,
            EventType::ExecPositionOpened,
            EventType::ExecPnlUpdate,
        ],
    );

    // The SET_PARAMS command carries the plan.
    let set_params = events
        .iter()
        .find(|ev| {
            ev.event_type == EventType::ExecutorCommand
                && ev.payload["envelope"]["type"] == "SET_PARAMS"
        })
        .expect("SET_PARAMS command event");
    let payload = &set_params.payload["envelope"]["payload"];
    assert_eq!(payload["symbol"], "EURUSD");
    assert_eq!(payload["quantity"], 1.0);

    // The simulator actually opened the position.
    assert_eq!(rig.sim.open_position_count(), 1);
    assert_eq!(rig.sim.active_strategy().as_deref(), Some("FXD_A2"));
    assert!(rig.sim.active_symbols().contains(&"EURUSD".to_string()));

    // Lifecycle events preserved the tick's correlation id.
    assert!(events
        .iter()
        .all(|ev| ev.correlation_id == summary.correlation_id));
    assert_eq!(count_type(&events, EventType::ExecSimulatedFill), 1);
}

#[test]
fn scenario_lifecycle_repeats_identically_from_clean_state() {
    let run = || {
        let rig = Rig::trending();
        let mut desk = armed_g1_desk(&rig);
        let summary = desk.run_tick(&rig.deps(), &rig.args(&["EURUSD"])).unwrap();
        rig.ledger
            .by_correlation(summary.correlation_id)
            .unwrap()
            .iter()
            .map(|ev| ev.event_type)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run(), "deterministic lifecycle from a clean state");
}
