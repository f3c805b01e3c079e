//! The audit record for operator actions. Persisted in its own table and
//! mirrored into the ledger as an `AUDIT_LOG` event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::ops::ActorRole;

/// One operator action: who, what, on which resource, and the before/after
/// view of the touched state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor_user_id: String,
    pub actor_role: ActorRole,
    pub action: String,
    pub resource: String,
    pub reason: String,
    pub before: Value,
    pub after: Value,
    pub correlation_id: Uuid,
    /// Canonical-JSON hash chain over the audit sequence; `None` until the
    /// chain writer stamps it.
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

impl AuditRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        actor_user_id: impl Into<String>,
        actor_role: ActorRole,
        action: impl Into<String>,
        resource: impl Into<String>,
        reason: impl Into<String>,
        before: Value,
        after: Value,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            audit_id: Uuid::new_v4(),
            timestamp,
            actor_user_id: actor_user_id.into(),
            actor_role,
            action: action.into(),
            resource: resource.into(),
            reason: reason.into(),
            before,
            after,
            correlation_id,
            hash_prev: None,
            hash_self: None,
        }
    }
}
