//! Layered desk configuration.
//!
//! YAML files merge in order (later overrides earlier, objects deep-merge,
//! arrays replace), the merged document is canonicalised (sorted keys,
//! compact JSON) and hashed, and the typed [`DeskConfig`] decodes from it.
//! Loading a config is an auditable act: [`config_snapshot_event`] builds
//! the `CONFIG_SNAPSHOT` ledger event carrying the hash and the document.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use uuid::Uuid;

use fxd_schemas::{EventType, LedgerEvent, ReasonCode, RiskLimits, Severity};

// ---------------------------------------------------------------------------
// Typed config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Base URL of the external execution service.
    pub base_url: String,
    /// Run against the simulated executor instead of the live adapter.
    pub mock_mode: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9400".to_string(),
            mock_mode: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Per-subscriber channel capacity; a sink this far behind is dropped.
    pub subscriber_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: 256,
        }
    }
}

/// The desk's typed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub symbols: Vec<String>,
    pub risk: RiskLimits,
    pub executor: ExecutorConfig,
    pub stream: StreamConfig,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["EURUSD".to_string(), "GBPUSD".to_string()],
            risk: RiskLimits::default(),
            executor: ExecutorConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl DeskConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        serde_json::from_value(loaded.config_json.clone()).context("decode DeskConfig failed")
    }
}

// ---------------------------------------------------------------------------
// Layered load + canonical hash
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Load + merge YAML files in order, then canonicalize to JSON and hash.
/// Later files override earlier files via deep-merge.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for p in paths {
        let s = fs::read_to_string(p).with_context(|| format!("read config: {p}"))?;
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {p}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    finish(merged)
}

/// Same canonicalisation/hash over an already-assembled document. Used by
/// the CLI when no files are given (defaults) and by tests.
pub fn load_from_value(doc: Value) -> Result<LoadedConfig> {
    finish(doc)
}

fn finish(merged: Value) -> Result<LoadedConfig> {
    let canonical = canonicalize_json(&merged)?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash: hash,
    })
}

/// Deep-merge: objects merge recursively; arrays replaced; scalars overwritten.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

/// Canonicalize JSON by sorting all object keys recursively and emitting
/// compact JSON.
fn canonicalize_json(v: &Value) -> Result<String> {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).context("json serialization failed")
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

// ---------------------------------------------------------------------------
// Snapshot event
// ---------------------------------------------------------------------------

/// Build the `CONFIG_SNAPSHOT` ledger event for a loaded config.
pub fn config_snapshot_event(
    loaded: &LoadedConfig,
    correlation_id: Uuid,
    at: DateTime<Utc>,
) -> LedgerEvent {
    LedgerEvent::new(correlation_id, at, EventType::ConfigSnapshot)
        .severity(Severity::Info)
        .reason(ReasonCode::AuditConfigSnapshot)
        .payload(serde_json::json!({
            "config_hash": loaded.config_hash,
            "config": loaded.config_json,
        }))
}
