//! The kill switch disarms, sets risk-off, and silences the mapper until
//! risk-off is cleared and the desk is re-armed.

mod common;

use common::{admin, count_type, Rig};
use fxd_ledger::EventLedger;
use fxd_runtime::Desk;
use fxd_schemas::{Arm, EventType, Gate};

#[test]
fn scenario_kill_switch() {
    let rig = Rig::trending();
    let mut desk = Desk::new();
    rig.wire_lifecycle(&desk);

    // Reach G2 armed: tick → G1 → tick → G2.
    desk.run_tick(&rig.deps(), &rig.args(&["EURUSD"])).unwrap();
    desk.change_gate(&rig.deps(), &admin(), Gate::G1).unwrap();
    desk.run_tick(&rig.deps(), &rig.args(&["EURUSD"])).unwrap();
    desk.change_gate(&rig.deps(), &admin(), Gate::G2).unwrap();
    desk.arm(&rig.deps(), &admin(), "ARM").unwrap();
    assert!(desk.ops.may_send_commands());

    desk.kill(&rig.deps(), &admin(), "KILL").unwrap();
    assert_eq!(desk.ops.arm, Arm::Disarmed);
    assert!(desk.ops.risk_off);
    assert_eq!(desk.ops.gate, Gate::G2, "kill does not demote the gate");

    // Subsequent ticks emit zero commands while risk-off holds.
    let summary = desk.run_tick(&rig.deps(), &rig.args(&["EURUSD"])).unwrap();
    let events = rig.ledger.by_correlation(summary.correlation_id).unwrap();
    assert_eq!(count_type(&events, EventType::ExecutorCommand), 0);

    // Clearing risk-off alone is not enough: still disarmed.
    desk.clear_risk_off(&rig.deps(), &admin());
    let summary = desk.run_tick(&rig.deps(), &rig.args(&["EURUSD"])).unwrap();
    let events = rig.ledger.by_correlation(summary.correlation_id).unwrap();
    assert_eq!(count_type(&events, EventType::ExecutorCommand), 0);

    // Re-armed: commands flow again.
    desk.arm(&rig.deps(), &admin(), "ARM").unwrap();
    let summary = desk.run_tick(&rig.deps(), &rig.args(&["EURUSD"])).unwrap();
    let events = rig.ledger.by_correlation(summary.correlation_id).unwrap();
    assert!(count_type(&events, EventType::ExecutorCommand) > 0);
}

#[test]
fn scenario_kill_is_audited() {
    let rig = Rig::trending();
    let mut desk = Desk::new();
    desk.run_tick(&rig.deps(), &rig.args(&["EURUSD"])).unwrap();
    desk.change_gate(&rig.deps(), &admin(), Gate::G1).unwrap();
    desk.arm(&rig.deps(), &admin(), "ARM").unwrap();
    desk.kill(&rig.deps(), &admin(), "KILL").unwrap();

    let bundle = rig.ledger.day(common::trading_now().date_naive()).unwrap();
    let kill = bundle
        .audit_logs
        .iter()
        .find(|record| record.action == "ops.kill")
        .expect("kill audit record");
    assert_eq!(kill.after["risk_off"], true);
    assert_eq!(kill.after["arm"], "DISARMED");

    // The audit chain holds together.
    assert_eq!(
        fxd_audit::verify_hash_chain(&bundle.audit_logs).unwrap(),
        fxd_audit::VerifyResult::Valid {
            records: bundle.audit_logs.len()
        }
    );
}
