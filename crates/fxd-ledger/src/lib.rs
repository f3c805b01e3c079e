//! Append-only event ledger.
//!
//! # Invariants
//!
//! - Appends are idempotent on `event_id`: re-inserting an existing id is a
//!   no-op and reports `false`. No event is ever updated or deleted.
//! - Reads after a successful append observe the event.
//! - `payload` is stored verbatim and returned untouched.
//! - Within one `correlation_id`, `by_correlation` returns events in append
//!   order; that order, not wall time, is the causal order of a tick.
//!
//! Two backends implement [`EventLedger`]: [`MemoryLedger`] (tests, CLI,
//! simulator wiring) and the Postgres backend in [`pg`]. The trait is
//! synchronous; the Postgres backend wraps its async pool behind a blocking
//! adapter at the single documented choke-point.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use fxd_schemas::{AuditRecord, BrainId, EventType, LedgerEvent, ReplayDay, Severity};

pub mod memory;
pub mod pg;
pub mod replay;

pub use memory::MemoryLedger;
pub use pg::{connect_from_env, migrate, BlockingPgLedger, PgLedger, ENV_DB_URL};
pub use replay::derive_replay_day;

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Conjunctive filter over ledger reads. Empty vectors / `None` match all.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_types: Vec<EventType>,
    pub severities: Vec<Severity>,
    pub symbol: Option<String>,
    pub brain_id: Option<BrainId>,
}

impl EventFilter {
    pub fn matches(&self, ev: &LedgerEvent) -> bool {
        if !self.event_types.is_empty() && !self.event_types.contains(&ev.event_type) {
            return false;
        }
        if !self.severities.is_empty() && !self.severities.contains(&ev.severity) {
            return false;
        }
        if let Some(symbol) = &self.symbol {
            if ev.symbol.as_deref() != Some(symbol.as_str()) {
                return false;
            }
        }
        if let Some(brain) = self.brain_id {
            if ev.brain_id != Some(brain) {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Day bundle
// ---------------------------------------------------------------------------

/// Everything the replay view needs for one day.
#[derive(Debug, Clone)]
pub struct DayBundle {
    pub events: Vec<LedgerEvent>,
    pub audit_logs: Vec<AuditRecord>,
    pub replay_day: ReplayDay,
}

// ---------------------------------------------------------------------------
// Ledger trait
// ---------------------------------------------------------------------------

/// The append-only ledger contract.
pub trait EventLedger: Send + Sync {
    /// Append one event. Returns `true` iff newly inserted; `false` means
    /// the event id already existed and nothing was written.
    fn append(&self, event: &LedgerEvent) -> Result<bool>;

    /// Append a batch; returns the number of newly inserted events.
    /// Per-event idempotence applies; a duplicate in the batch is skipped.
    fn append_batch(&self, events: &[LedgerEvent]) -> Result<usize> {
        let mut inserted = 0;
        for event in events {
            if self.append(event)? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// The `n` most recent matching events, newest first.
    fn tail(&self, n: usize, filter: &EventFilter) -> Result<Vec<LedgerEvent>>;

    /// Every event of one correlation, in append order.
    fn by_correlation(&self, correlation_id: Uuid) -> Result<Vec<LedgerEvent>>;

    /// Matching events in `[start, end)`, append order, with paging.
    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &EventFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEvent>>;

    /// One day's events, audit logs, and the derived replay-day record.
    fn day(&self, date: NaiveDate) -> Result<DayBundle>;

    /// Append one audit record, idempotent on `audit_id`.
    fn append_audit(&self, record: &AuditRecord) -> Result<bool>;
}
