//! Audit-trail construction: hash-chained operator-action records, mirrored
//! into the ledger as `AUDIT_LOG` events.
//!
//! # Invariants
//!
//! - Each stamped record's `hash_self` is SHA-256 over its canonical JSON
//!   (sorted keys, compact, `hash_self` excluded to avoid self-reference).
//! - `hash_prev` links to the previous record's `hash_self`; the first
//!   record in a trail has `hash_prev = None`.
//! - Verification walks the sequence and reports the first break.
//!
//! The trail stamps and mirrors; persistence belongs to the ledger.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use fxd_schemas::{AuditRecord, EventType, LedgerEvent, ReasonCode, Severity};

// ---------------------------------------------------------------------------
// Canonical JSON
// ---------------------------------------------------------------------------

/// Canonicalize by sorting keys recursively and emitting compact JSON.
pub fn canonical_json<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize for canonical json failed")?;
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Hash computed from canonical JSON of the record WITHOUT `hash_self`.
pub fn compute_record_hash(record: &AuditRecord) -> Result<String> {
    let mut clone = record.clone();
    clone.hash_self = None;

    let canonical = canonical_json(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Trail
// ---------------------------------------------------------------------------

/// Stamps the hash chain over a sequence of audit records.
///
/// When resuming an existing trail (restart), restore with
/// [`AuditTrail::resume`] using the last persisted `hash_self`.
#[derive(Default)]
pub struct AuditTrail {
    last_hash: Option<String>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume(last_hash: Option<String>) -> Self {
        Self { last_hash }
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    /// Stamp `hash_prev`/`hash_self` onto the record and advance the chain.
    pub fn stamp(&mut self, mut record: AuditRecord) -> Result<AuditRecord> {
        record.hash_prev = self.last_hash.clone();
        let hash = compute_record_hash(&record)?;
        record.hash_self = Some(hash.clone());
        self.last_hash = Some(hash);
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Ledger mirror
// ---------------------------------------------------------------------------

/// Mirror an audit record as an `AUDIT_LOG` ledger event under the same
/// correlation id. The record document is the event payload.
pub fn to_ledger_event(record: &AuditRecord) -> Result<LedgerEvent> {
    let payload = serde_json::to_value(record).context("serialize audit record failed")?;
    Ok(
        LedgerEvent::new(record.correlation_id, record.timestamp, EventType::AuditLog)
            .severity(Severity::Info)
            .reason(ReasonCode::AuditRecorded)
            .payload(payload),
    )
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Result of hash-chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// The entire chain is valid.
    Valid { records: usize },
    /// The chain is broken at the given index (0-based).
    Broken { index: usize, reason: String },
}

/// Verify the hash chain over a sequence of stamped records.
pub fn verify_hash_chain(records: &[AuditRecord]) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;

    for (i, record) in records.iter().enumerate() {
        if record.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                index: i,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, record.hash_prev
                ),
            });
        }

        match &record.hash_self {
            None => {
                return Ok(VerifyResult::Broken {
                    index: i,
                    reason: "record is not stamped (hash_self missing)".to_string(),
                });
            }
            Some(claimed) => {
                let recomputed = compute_record_hash(record)?;
                if *claimed != recomputed {
                    return Ok(VerifyResult::Broken {
                        index: i,
                        reason: format!(
                            "hash_self mismatch: claimed {claimed}, recomputed {recomputed}"
                        ),
                    });
                }
            }
        }

        prev_hash = record.hash_self.clone();
    }

    Ok(VerifyResult::Valid {
        records: records.len(),
    })
}
