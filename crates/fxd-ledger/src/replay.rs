//! Replay-day derivation.
//!
//! A day is **complete** iff its events contain at least one MCL snapshot
//! AND at least one brain intent-or-skip; otherwise **partial**. The summary
//! document carries per-type counts and the correlation span so the replay
//! view can render a day without re-scanning the ledger.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde_json::json;

use fxd_schemas::{EventType, LedgerEvent, ReplayDay, ReplayStatus};

/// Derive the replay-day record from one day's events.
pub fn derive_replay_day(date: NaiveDate, events: &[LedgerEvent]) -> ReplayDay {
    let has_snapshot = events
        .iter()
        .any(|ev| ev.event_type == EventType::MclSnapshot);
    let has_brain_output = events.iter().any(|ev| {
        matches!(
            ev.event_type,
            EventType::BrainIntent | EventType::BrainSkip
        )
    });

    let status = if has_snapshot && has_brain_output {
        ReplayStatus::Complete
    } else {
        ReplayStatus::Partial
    };

    let mut counts: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut correlations: BTreeSet<String> = BTreeSet::new();
    for ev in events {
        *counts.entry(ev.event_type.as_str()).or_insert(0) += 1;
        correlations.insert(ev.correlation_id.to_string());
    }

    let first_ts = events.iter().map(|ev| ev.timestamp).min();
    let last_ts = events.iter().map(|ev| ev.timestamp).max();

    let summary = json!({
        "event_count": events.len(),
        "counts_by_type": counts,
        "correlation_count": correlations.len(),
        "first_event_at": first_ts.map(|t| t.to_rfc3339()),
        "last_event_at": last_ts.map(|t| t.to_rfc3339()),
    });

    ReplayDay {
        date,
        status,
        summary,
    }
}
