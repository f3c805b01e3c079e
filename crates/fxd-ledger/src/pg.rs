//! Postgres ledger backend.
//!
//! Append-only semantics are enforced at the application layer: inserts use
//! `on conflict do nothing` on the primary key, there are no updates and no
//! deletes. `seq` (bigserial) captures append order; `by_correlation` orders
//! by it, never by timestamp.
//!
//! The async API lives on [`PgLedger`]. The synchronous [`EventLedger`]
//! contract is served by [`BlockingPgLedger`], which parks the current
//! worker via `block_in_place`, the same pattern the live executor adapter
//! uses for its blocking HTTP client. It therefore requires the
//! multi-threaded Tokio runtime.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use fxd_schemas::{AuditRecord, LedgerEvent, ReplayDay};

use crate::replay::derive_replay_day;
use crate::{DayBundle, EventFilter, EventLedger};

pub const ENV_DB_URL: &str = "FXD_DATABASE_URL";

/// Connect using `FXD_DATABASE_URL`.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("ledger migrate failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tag codecs
// ---------------------------------------------------------------------------

/// Closed-set enums are persisted as their wire strings; the serde
/// representation is the single source of truth for both directions.
fn encode_tag<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value).context("encode tag")? {
        Value::String(s) => Ok(s),
        other => anyhow::bail!("tag did not serialise to a string: {other}"),
    }
}

fn decode_tag<T: DeserializeOwned>(s: String) -> Result<T> {
    serde_json::from_value(Value::String(s)).context("decode tag")
}

fn decode_opt_tag<T: DeserializeOwned>(s: Option<String>) -> Result<Option<T>> {
    s.map(decode_tag).transpose()
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<LedgerEvent> {
    Ok(LedgerEvent {
        event_id: row.try_get("event_id")?,
        correlation_id: row.try_get("correlation_id")?,
        timestamp: row.try_get("ts")?,
        severity: decode_tag(row.try_get::<String, _>("severity")?)?,
        event_type: decode_tag(row.try_get::<String, _>("event_type")?)?,
        component: decode_tag(row.try_get::<String, _>("component")?)?,
        symbol: row.try_get("symbol")?,
        brain_id: decode_opt_tag(row.try_get::<Option<String>, _>("brain_id")?)?,
        reason_code: decode_opt_tag(row.try_get::<Option<String>, _>("reason_code")?)?,
        payload: row.try_get("payload")?,
    })
}

fn row_to_audit(row: &sqlx::postgres::PgRow) -> Result<AuditRecord> {
    Ok(AuditRecord {
        audit_id: row.try_get("audit_id")?,
        timestamp: row.try_get("ts")?,
        actor_user_id: row.try_get("actor_user_id")?,
        actor_role: decode_tag(row.try_get::<String, _>("actor_role")?)?,
        action: row.try_get("action")?,
        resource: row.try_get("resource")?,
        reason: row.try_get("reason")?,
        before: row.try_get("before")?,
        after: row.try_get("after")?,
        correlation_id: row.try_get("correlation_id")?,
        hash_prev: row.try_get("hash_prev")?,
        hash_self: row.try_get("hash_self")?,
    })
}

/// Optional text-array binds for the conjunctive filter. `None` matches all.
fn filter_binds(filter: &EventFilter) -> Result<(Option<Vec<String>>, Option<Vec<String>>)> {
    let types = if filter.event_types.is_empty() {
        None
    } else {
        Some(
            filter
                .event_types
                .iter()
                .map(encode_tag)
                .collect::<Result<Vec<_>>>()?,
        )
    };
    let severities = if filter.severities.is_empty() {
        None
    } else {
        Some(
            filter
                .severities
                .iter()
                .map(encode_tag)
                .collect::<Result<Vec<_>>>()?,
        )
    };
    Ok((types, severities))
}

// ---------------------------------------------------------------------------
// Async API
// ---------------------------------------------------------------------------

/// Postgres-backed ledger.
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Wrap this ledger for use behind the synchronous [`EventLedger`]
    /// contract. Must be called from inside a multi-threaded Tokio runtime.
    pub fn blocking(&self) -> BlockingPgLedger {
        BlockingPgLedger {
            ledger: self.clone(),
            handle: tokio::runtime::Handle::current(),
        }
    }

    pub async fn append(&self, event: &LedgerEvent) -> Result<bool> {
        let brain = event.brain_id.as_ref().map(encode_tag).transpose()?;
        let reason = event.reason_code.as_ref().map(encode_tag).transpose()?;

        let result = sqlx::query(
            r#"
            insert into ledger_events (
              event_id, correlation_id, ts, severity, event_type, component,
              symbol, brain_id, reason_code, payload
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            )
            on conflict (event_id) do nothing
            "#,
        )
        .bind(event.event_id)
        .bind(event.correlation_id)
        .bind(event.timestamp)
        .bind(encode_tag(&event.severity)?)
        .bind(encode_tag(&event.event_type)?)
        .bind(encode_tag(&event.component)?)
        .bind(&event.symbol)
        .bind(brain)
        .bind(reason)
        .bind(&event.payload)
        .execute(&self.pool)
        .await
        .context("ledger append failed")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn append_batch(&self, events: &[LedgerEvent]) -> Result<usize> {
        let mut inserted = 0;
        for event in events {
            if self.append(event).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    pub async fn tail(&self, n: usize, filter: &EventFilter) -> Result<Vec<LedgerEvent>> {
        let (types, severities) = filter_binds(filter)?;
        let brain = filter.brain_id.as_ref().map(encode_tag).transpose()?;

        let rows = sqlx::query(
            r#"
            select event_id, correlation_id, ts, severity, event_type, component,
                   symbol, brain_id, reason_code, payload
            from ledger_events
            where ($1::text[] is null or event_type = any($1))
              and ($2::text[] is null or severity = any($2))
              and ($3::text is null or symbol = $3)
              and ($4::text is null or brain_id = $4)
            order by seq desc
            limit $5
            "#,
        )
        .bind(types)
        .bind(severities)
        .bind(&filter.symbol)
        .bind(brain)
        .bind(n as i64)
        .fetch_all(&self.pool)
        .await
        .context("ledger tail query failed")?;

        rows.iter().map(row_to_event).collect()
    }

    pub async fn by_correlation(&self, correlation_id: Uuid) -> Result<Vec<LedgerEvent>> {
        let rows = sqlx::query(
            r#"
            select event_id, correlation_id, ts, severity, event_type, component,
                   symbol, brain_id, reason_code, payload
            from ledger_events
            where correlation_id = $1
            order by seq asc
            "#,
        )
        .bind(correlation_id)
        .fetch_all(&self.pool)
        .await
        .context("ledger by_correlation query failed")?;

        rows.iter().map(row_to_event).collect()
    }

    pub async fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &EventFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEvent>> {
        let (types, severities) = filter_binds(filter)?;
        let brain = filter.brain_id.as_ref().map(encode_tag).transpose()?;

        let rows = sqlx::query(
            r#"
            select event_id, correlation_id, ts, severity, event_type, component,
                   symbol, brain_id, reason_code, payload
            from ledger_events
            where ts >= $1 and ts < $2
              and ($3::text[] is null or event_type = any($3))
              and ($4::text[] is null or severity = any($4))
              and ($5::text is null or symbol = $5)
              and ($6::text is null or brain_id = $6)
            order by seq asc
            limit $7 offset $8
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(types)
        .bind(severities)
        .bind(&filter.symbol)
        .bind(brain)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .context("ledger between query failed")?;

        rows.iter().map(row_to_event).collect()
    }

    pub async fn day(&self, date: NaiveDate) -> Result<DayBundle> {
        let rows = sqlx::query(
            r#"
            select event_id, correlation_id, ts, severity, event_type, component,
                   symbol, brain_id, reason_code, payload
            from ledger_events
            where ts::date = $1
            order by seq asc
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .context("ledger day query failed")?;
        let events: Vec<LedgerEvent> = rows.iter().map(row_to_event).collect::<Result<_>>()?;

        let rows = sqlx::query(
            r#"
            select audit_id, ts, actor_user_id, actor_role, action, resource,
                   reason, before, after, correlation_id, hash_prev, hash_self
            from audit_logs
            where ts::date = $1
            order by ts asc
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .context("audit day query failed")?;
        let audit_logs: Vec<AuditRecord> = rows.iter().map(row_to_audit).collect::<Result<_>>()?;

        let replay_day = derive_replay_day(date, &events);
        self.record_replay_day(&replay_day).await?;

        Ok(DayBundle {
            events,
            audit_logs,
            replay_day,
        })
    }

    /// Upsert the derived record; a day's status may move from partial to
    /// complete as more events land.
    async fn record_replay_day(&self, day: &ReplayDay) -> Result<()> {
        sqlx::query(
            r#"
            insert into replay_days (date, status, summary)
            values ($1, $2, $3)
            on conflict (date) do update
              set status = excluded.status, summary = excluded.summary
            "#,
        )
        .bind(day.date)
        .bind(day.status.as_str())
        .bind(&day.summary)
        .execute(&self.pool)
        .await
        .context("replay day upsert failed")?;
        Ok(())
    }

    pub async fn append_audit(&self, record: &AuditRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            insert into audit_logs (
              audit_id, ts, actor_user_id, actor_role, action, resource,
              reason, before, after, correlation_id, hash_prev, hash_self
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
            )
            on conflict (audit_id) do nothing
            "#,
        )
        .bind(record.audit_id)
        .bind(record.timestamp)
        .bind(&record.actor_user_id)
        .bind(encode_tag(&record.actor_role)?)
        .bind(&record.action)
        .bind(&record.resource)
        .bind(&record.reason)
        .bind(&record.before)
        .bind(&record.after)
        .bind(record.correlation_id)
        .bind(&record.hash_prev)
        .bind(&record.hash_self)
        .execute(&self.pool)
        .await
        .context("audit append failed")?;

        Ok(result.rows_affected() == 1)
    }
}

// ---------------------------------------------------------------------------
// Blocking adapter
// ---------------------------------------------------------------------------

/// Synchronous facade over [`PgLedger`] for the orchestrator's trait-typed
/// wiring. Each call parks the current worker with `block_in_place`.
pub struct BlockingPgLedger {
    ledger: PgLedger,
    handle: tokio::runtime::Handle,
}

impl BlockingPgLedger {
    fn run<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        tokio::task::block_in_place(|| self.handle.block_on(fut))
    }
}

impl EventLedger for BlockingPgLedger {
    fn append(&self, event: &LedgerEvent) -> Result<bool> {
        self.run(self.ledger.append(event))
    }

    fn append_batch(&self, events: &[LedgerEvent]) -> Result<usize> {
        self.run(self.ledger.append_batch(events))
    }

    fn tail(&self, n: usize, filter: &EventFilter) -> Result<Vec<LedgerEvent>> {
        self.run(self.ledger.tail(n, filter))
    }

    fn by_correlation(&self, correlation_id: Uuid) -> Result<Vec<LedgerEvent>> {
        self.run(self.ledger.by_correlation(correlation_id))
    }

    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: &EventFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEvent>> {
        self.run(self.ledger.between(start, end, filter, limit, offset))
    }

    fn day(&self, date: NaiveDate) -> Result<DayBundle> {
        self.run(self.ledger.day(date))
    }

    fn append_audit(&self, record: &AuditRecord) -> Result<bool> {
        self.run(self.ledger.append_audit(record))
    }
}
