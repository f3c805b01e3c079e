//! Postgres round-trip: append → by_correlation returns the payload
//! byte-for-byte, duplicate append is a no-op, and the day view derives the
//! replay record.
//!
//! Requires a live database; skips (green) when FXD_DATABASE_URL is unset so
//! `cargo test --workspace` needs no infrastructure.

use chrono::Utc;
use uuid::Uuid;

use fxd_ledger::{connect_from_env, migrate, PgLedger, ENV_DB_URL};
use fxd_schemas::{Component, EventType, LedgerEvent, ReasonCode, ReplayStatus};

#[tokio::test(flavor = "multi_thread")]
async fn scenario_pg_ledger_roundtrip() {
    if std::env::var(ENV_DB_URL).is_err() {
        eprintln!("skipping: {ENV_DB_URL} not set");
        return;
    }

    let pool = connect_from_env().await.unwrap();
    migrate(&pool).await.unwrap();
    let ledger = PgLedger::new(pool);

    let corr = Uuid::new_v4();
    let payload = serde_json::json!({"nested": {"k": [1, 2, 3]}, "note": "verbatim"});
    let snapshot = LedgerEvent::new(corr, Utc::now(), EventType::MclSnapshot)
        .component(Component::Mcl)
        .symbol("EURUSD")
        .reason(ReasonCode::MclBaseline)
        .payload(payload.clone());
    let skip = LedgerEvent::new(corr, Utc::now(), EventType::BrainSkip)
        .component(Component::A2)
        .symbol("EURUSD")
        .brain(fxd_schemas::BrainId::A2)
        .reason(ReasonCode::BrainNoSetup);

    assert!(ledger.append(&snapshot).await.unwrap());
    assert!(!ledger.append(&snapshot).await.unwrap(), "duplicate no-op");
    assert!(ledger.append(&skip).await.unwrap());

    let got = ledger.by_correlation(corr).await.unwrap();
    assert_eq!(got.len(), 2);
    assert_eq!(got[0].event_id, snapshot.event_id, "append order preserved");
    assert_eq!(got[0].payload, payload, "payload byte-for-byte");
    assert_eq!(got[1].brain_id, Some(fxd_schemas::BrainId::A2));

    let bundle = ledger.day(Utc::now().date_naive()).await.unwrap();
    assert!(bundle.events.len() >= 2);
    assert_eq!(bundle.replay_day.status, ReplayStatus::Complete);
}
