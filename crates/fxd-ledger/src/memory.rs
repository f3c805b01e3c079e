//! In-memory ledger backend.
//!
//! Same contract as the Postgres backend, held in a mutex-guarded vector.
//! Used by unit tests, the scenario suites, and the CLI's offline loop.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use fxd_schemas::{AuditRecord, LedgerEvent};

use crate::replay::derive_replay_day;
use crate::{DayBundle, EventFilter, EventLedger};

#[derive(Default)]
struct Inner {
    /// Append order is the causal order; never reordered.
    events: Vec<LedgerEvent>,
    event_ids: HashSet<Uuid>,
    audits: Vec<AuditRecord>,
    audit_ids: HashSet<Uuid>,
}

/// Mutex-guarded append-only store.
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total events held (all correlations).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("ledger lock poisoned").events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventLedger for MemoryLedger {
    fn append(&self, event: &LedgerEvent) -> Result<bool> {
        let mut inner = self.inner.lock().expect("ledger lock poisoned");
        if !inner.event_ids.insert(event.event_id) {
            return Ok(false);
        }
        inner.events.push(event.clone());
        Ok(true)
    }

    fn tail(&self, n: usize, filter: &EventFilter) -> Result<Vec<LedgerEvent>> {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        Ok(inner
            .events
            .iter()
            .rev()
            .filter(|ev| filter.matches(ev))
            .take(n)
            .cloned()
            .collect())
    }

    fn by_correlation(&self, correlation_id: Uuid) -> Result<Vec<LedgerEvent>> {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        Ok(inner
            .events
            .iter()
            .filter(|ev| ev.correlation_id == correlation_id)
            .cloned()
            .collect())
    }

    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &EventFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEvent>> {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        Ok(inner
            .events
            .iter()
            .filter(|ev| ev.timestamp >= start && ev.timestamp < end)
            .filter(|ev| filter.matches(ev))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn day(&self, date: NaiveDate) -> Result<DayBundle> {
        let inner = self.inner.lock().expect("ledger lock poisoned");
        let events: Vec<LedgerEvent> = inner
            .events
            .iter()
            .filter(|ev| ev.timestamp.date_naive() == date)
            .cloned()
            .collect();
        let audit_logs: Vec<AuditRecord> = inner
            .audits
            .iter()
            .filter(|a| a.timestamp.date_naive() == date)
            .cloned()
            .collect();
        let replay_day = derive_replay_day(date, &events);
        Ok(DayBundle {
            events,
            audit_logs,
            replay_day,
        })
    }

    fn append_audit(&self, record: &AuditRecord) -> Result<bool> {
        let mut inner = self.inner.lock().expect("ledger lock poisoned");
        if !inner.audit_ids.insert(record.audit_id) {
            return Ok(false);
        }
        inner.audits.push(record.clone());
        Ok(true)
    }
}
