//! Duplicate-append idempotence: the first append inserts, the second is a
//! no-op, and the correlation read sees the event exactly once.

use chrono::Utc;
use uuid::Uuid;

use fxd_ledger::{EventLedger, MemoryLedger};
use fxd_schemas::{Component, EventType, LedgerEvent, ReasonCode};

#[test]
fn scenario_duplicate_event_append() {
    let ledger = MemoryLedger::new();
    let corr = Uuid::new_v4();
    let event = LedgerEvent::new(corr, Utc::now(), EventType::MclSnapshot)
        .component(Component::Mcl)
        .symbol("EURUSD")
        .reason(ReasonCode::MclBaseline)
        .payload(serde_json::json!({"structure": "RANGE"}));

    assert!(ledger.append(&event).unwrap(), "first append inserts");
    assert!(!ledger.append(&event).unwrap(), "second append is a no-op");

    let got = ledger.by_correlation(corr).unwrap();
    assert_eq!(got.len(), 1, "event appears exactly once");
    assert_eq!(got[0].event_id, event.event_id);
    // Payload returned byte-for-byte.
    assert_eq!(got[0].payload, event.payload);
}

#[test]
fn scenario_batch_append_skips_duplicates() {
    let ledger = MemoryLedger::new();
    let corr = Uuid::new_v4();
    let a = LedgerEvent::new(corr, Utc::now(), EventType::MclSnapshot);
    let b = LedgerEvent::new(corr, Utc::now(), EventType::BrainSkip);

    let inserted = ledger
        .append_batch(&[a.clone(), b.clone(), a.clone()])
        .unwrap();
    assert_eq!(inserted, 2, "the in-batch duplicate is skipped");
    assert_eq!(ledger.by_correlation(corr).unwrap().len(), 2);
}
