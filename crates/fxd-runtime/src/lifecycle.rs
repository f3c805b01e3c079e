//! Executor lifecycle normalisation.
//!
//! A lifecycle envelope whose `details.event_type` carries one of the
//! `EXEC_*` ledger tags becomes an explicit ledger event of that type;
//! anything else lands as a generic `EXECUTOR_EVENT`. The tick's
//! correlation id is preserved verbatim; a late callback still files under
//! the tick that caused it.

use fxd_schemas::{
    Component, EventType, ExecutorLifecycle, LedgerEvent, LifecycleKind, ReasonCode, Severity,
};

fn event_type_from_tag(tag: &str) -> Option<EventType> {
    match tag {
        "EXEC_SIMULATED_FILL" => Some(EventType::ExecSimulatedFill),
        "EXEC_POSITION_OPENED" => Some(EventType::ExecPositionOpened),
        "EXEC_POSITION_CLOSED" => Some(EventType::ExecPositionClosed),
        "EXEC_POSITION_UPDATED" => Some(EventType::ExecPositionUpdated),
        "EXEC_PNL_UPDATE" => Some(EventType::ExecPnlUpdate),
        "EXEC_DAY_SUMMARY" => Some(EventType::ExecDaySummary),
        _ => None,
    }
}

fn reason_for(kind: LifecycleKind) -> ReasonCode {
    match kind {
        LifecycleKind::OrderFilled => ReasonCode::ExecFill,
        LifecycleKind::SlHit
        | LifecycleKind::TpHit
        | LifecycleKind::PositionOpened
        | LifecycleKind::PositionClosed
        | LifecycleKind::PositionUpdated => ReasonCode::ExecPositionEvent,
        LifecycleKind::PnlUpdate => ReasonCode::ExecPnlUpdate,
        LifecycleKind::DaySummary => ReasonCode::ExecDaySummary,
        LifecycleKind::Info => ReasonCode::ExecCommandSent,
        LifecycleKind::Error => ReasonCode::ExecOrderFailed,
    }
}

/// Normalise one lifecycle envelope into its ledger event.
pub fn normalize_lifecycle(event: &ExecutorLifecycle) -> LedgerEvent {
    let event_type = event
        .details
        .get("event_type")
        .and_then(|v| v.as_str())
        .and_then(event_type_from_tag)
        .unwrap_or(EventType::ExecutorEvent);

    let severity = if event.kind == LifecycleKind::Error {
        Severity::Error
    } else {
        Severity::Info
    };

    let payload = serde_json::to_value(event)
        .unwrap_or_else(|_| serde_json::json!({"kind": event.kind.as_str()}));

    LedgerEvent::new(event.correlation_id, event.timestamp, event_type)
        .severity(severity)
        .component(Component::System)
        .symbol(event.symbol.clone())
        .reason(reason_for(event.kind))
        .payload(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn lifecycle(kind: LifecycleKind, details: serde_json::Value) -> ExecutorLifecycle {
        ExecutorLifecycle {
            kind,
            symbol: "EURUSD".to_string(),
            strategy: "FXD_A2".to_string(),
            details,
            timestamp: Utc::now(),
            correlation_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn tagged_details_select_the_explicit_event_type() {
        let ev = lifecycle(
            LifecycleKind::OrderFilled,
            json!({"event_type": "EXEC_SIMULATED_FILL", "entry": 1.1}),
        );
        let ledger = normalize_lifecycle(&ev);
        assert_eq!(ledger.event_type, EventType::ExecSimulatedFill);
        assert_eq!(ledger.correlation_id, ev.correlation_id);
        assert_eq!(ledger.reason_code, Some(ReasonCode::ExecFill));
        assert_eq!(ledger.symbol.as_deref(), Some("EURUSD"));
    }

    #[test]
    fn unknown_tag_falls_back_to_executor_event() {
        let ev = lifecycle(LifecycleKind::Info, json!({"event_type": "SOMETHING_ELSE"}));
        let ledger = normalize_lifecycle(&ev);
        assert_eq!(ledger.event_type, EventType::ExecutorEvent);
    }

    #[test]
    fn missing_tag_falls_back_to_executor_event() {
        let ev = lifecycle(LifecycleKind::PnlUpdate, json!({"pnl": 0.0}));
        let ledger = normalize_lifecycle(&ev);
        assert_eq!(ledger.event_type, EventType::ExecutorEvent);
        assert_eq!(ledger.reason_code, Some(ReasonCode::ExecPnlUpdate));
    }

    #[test]
    fn error_kind_raises_severity() {
        let ev = lifecycle(LifecycleKind::Error, json!({"message": "rejected"}));
        let ledger = normalize_lifecycle(&ev);
        assert_eq!(ledger.severity, Severity::Error);
        assert_eq!(ledger.reason_code, Some(ReasonCode::ExecOrderFailed));
    }

    #[test]
    fn payload_carries_the_full_envelope() {
        let ev = lifecycle(
            LifecycleKind::DaySummary,
            json!({"event_type": "EXEC_DAY_SUMMARY", "fills": 3}),
        );
        let ledger = normalize_lifecycle(&ev);
        assert_eq!(ledger.payload["details"]["fills"], 3);
        assert_eq!(ledger.payload["strategy"], "FXD_A2");
    }
}
