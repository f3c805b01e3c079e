//! The closed reason-code catalogue.
//!
//! Every event the engine emits carries a `Why` whose `reason_code` is drawn
//! from this catalogue. Codes are partitioned by owning component (`MCL_*`,
//! `BRAIN_*`, `PM_*`, `EHM_*`, `EXEC_*`, `PROV_*`, `AUDIT_*`, `GATE_*`,
//! `MOCK_*`). New codes may be added at the end of a partition; existing
//! codes are never renamed or repurposed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry in the closed reason-code catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    // --- MCL (context engine) ---
    MclStructureShift,
    MclVolatilityShift,
    MclLiquidityShift,
    MclSessionShift,
    MclEventWindow,
    MclBaseline,
    MclMetricMissing,

    // --- Brains ---
    BrainTrendEntry,
    BrainRangeFade,
    BrainRaidReversal,
    BrainExpansionBreakout,
    BrainNoSetup,
    BrainLowRewardRisk,
    BrainSessionBlocked,
    BrainVolRegimeBlocked,
    BrainEventGuard,
    BrainExecutionDegraded,

    // --- Portfolio manager ---
    GlobalRiskOff,
    CooldownActive,
    PmCorrelationBlock,
    PmMaxPositions,
    PmMaxDailyLoss,
    PmMaxDrawdown,
    PmSymbolExposureCap,
    PmCurrencyExposureCap,
    PmMaxExposure,
    PmRiskScaled,
    PmAllow,
    PmQueuedExecutorBroken,
    PmInternalError,

    // --- Edge-health monitor ---
    EhmHealthy,
    EhmDegraded,
    EhmBroken,
    EhmExitNow,
    EhmRecovered,

    // --- Executor ---
    ExecOrderTimeout,
    ExecBroken,
    ExecOrderFailed,
    ExecCommandSent,
    ExecFill,
    ExecPositionEvent,
    ExecPnlUpdate,
    ExecDaySummary,
    ExecStateChange,

    // --- Market-data provider ---
    ProvOk,
    ProvDegraded,
    ProvDown,
    ProvMarketClosed,
    ProvRetryExhausted,

    // --- Audit / config ---
    AuditRecorded,
    AuditConfigSnapshot,

    // --- Gate / arm state machine ---
    GatePromoted,
    GateDemoted,
    GateStepInvalid,
    GateRoleForbidden,
    GatePrereqMissingMclSnapshot,
    GatePrereqMissingBrainIntent,
    GatePrereqMissingPmDecision,
    GatePrereqMissingLedger,
    GatePrereqMissingExecutor,
    GateArmed,
    GateDisarmed,
    GateArmBlocked,
    GateConfirmMismatch,
    GateKillEngaged,

    // --- Mock / scenario drive ---
    MockScenarioApplied,
    MockModeActive,
}

impl ReasonCode {
    /// Wire string for this code, exactly as persisted and streamed.
    pub fn as_str(&self) -> &'static str {
        use ReasonCode::*;
        match self {
            MclStructureShift => "MCL_STRUCTURE_SHIFT",
            MclVolatilityShift => "MCL_VOLATILITY_SHIFT",
            MclLiquidityShift => "MCL_LIQUIDITY_SHIFT",
            MclSessionShift => "MCL_SESSION_SHIFT",
            MclEventWindow => "MCL_EVENT_WINDOW",
            MclBaseline => "MCL_BASELINE",
            MclMetricMissing => "MCL_METRIC_MISSING",

            BrainTrendEntry => "BRAIN_TREND_ENTRY",
            BrainRangeFade => "BRAIN_RANGE_FADE",
            BrainRaidReversal => "BRAIN_RAID_REVERSAL",
            BrainExpansionBreakout => "BRAIN_EXPANSION_BREAKOUT",
            BrainNoSetup => "BRAIN_NO_SETUP",
            BrainLowRewardRisk => "BRAIN_LOW_REWARD_RISK",
            BrainSessionBlocked => "BRAIN_SESSION_BLOCKED",
            BrainVolRegimeBlocked => "BRAIN_VOL_REGIME_BLOCKED",
            BrainEventGuard => "BRAIN_EVENT_GUARD",
            BrainExecutionDegraded => "BRAIN_EXECUTION_DEGRADED",

            GlobalRiskOff => "GLOBAL_RISK_OFF",
            CooldownActive => "COOLDOWN_ACTIVE",
            PmCorrelationBlock => "PM_CORRELATION_BLOCK",
            PmMaxPositions => "PM_MAX_POSITIONS",
            PmMaxDailyLoss => "PM_MAX_DAILY_LOSS",
            PmMaxDrawdown => "PM_MAX_DRAWDOWN",
            PmSymbolExposureCap => "PM_SYMBOL_EXPOSURE_CAP",
            PmCurrencyExposureCap => "PM_CURRENCY_EXPOSURE_CAP",
            PmMaxExposure => "PM_MAX_EXPOSURE",
            PmRiskScaled => "PM_RISK_SCALED",
            PmAllow => "PM_ALLOW",
            PmQueuedExecutorBroken => "PM_QUEUED_EXECUTOR_BROKEN",
            PmInternalError => "PM_INTERNAL_ERROR",

            EhmHealthy => "EHM_HEALTHY",
            EhmDegraded => "EHM_DEGRADED",
            EhmBroken => "EHM_BROKEN",
            EhmExitNow => "EHM_EXIT_NOW",
            EhmRecovered => "EHM_RECOVERED",

            ExecOrderTimeout => "EXEC_ORDER_TIMEOUT",
            ExecBroken => "EXEC_BROKEN",
            ExecOrderFailed => "EXEC_ORDER_FAILED",
            ExecCommandSent => "EXEC_COMMAND_SENT",
            ExecFill => "EXEC_FILL",
            ExecPositionEvent => "EXEC_POSITION_EVENT",
            ExecPnlUpdate => "EXEC_PNL_UPDATE",
            ExecDaySummary => "EXEC_DAY_SUMMARY",
            ExecStateChange => "EXEC_STATE_CHANGE",

            ProvOk => "PROV_OK",
            ProvDegraded => "PROV_DEGRADED",
            ProvDown => "PROV_DOWN",
            ProvMarketClosed => "PROV_MARKET_CLOSED",
            ProvRetryExhausted => "PROV_RETRY_EXHAUSTED",

            AuditRecorded => "AUDIT_RECORDED",
            AuditConfigSnapshot => "AUDIT_CONFIG_SNAPSHOT",

            GatePromoted => "GATE_PROMOTED",
            GateDemoted => "GATE_DEMOTED",
            GateStepInvalid => "GATE_STEP_INVALID",
            GateRoleForbidden => "GATE_ROLE_FORBIDDEN",
            GatePrereqMissingMclSnapshot => "GATE_PREREQ_MISSING_MCL_SNAPSHOT",
            GatePrereqMissingBrainIntent => "GATE_PREREQ_MISSING_BRAIN_INTENT",
            GatePrereqMissingPmDecision => "GATE_PREREQ_MISSING_PM_DECISION",
            GatePrereqMissingLedger => "GATE_PREREQ_MISSING_LEDGER",
            GatePrereqMissingExecutor => "GATE_PREREQ_MISSING_EXECUTOR",
            GateArmed => "GATE_ARMED",
            GateDisarmed => "GATE_DISARMED",
            GateArmBlocked => "GATE_ARM_BLOCKED",
            GateConfirmMismatch => "GATE_CONFIRM_MISMATCH",
            GateKillEngaged => "GATE_KILL_ENGAGED",

            MockScenarioApplied => "MOCK_SCENARIO_APPLIED",
            MockModeActive => "MOCK_MODE_ACTIVE",
        }
    }

    /// Human description, one per code. Shown in cockpits and replay views.
    pub fn describe(&self) -> &'static str {
        use ReasonCode::*;
        match self {
            MclStructureShift => "market structure differs from the neutral baseline",
            MclVolatilityShift => "volatility band differs from the neutral baseline",
            MclLiquidityShift => "liquidity phase differs from the neutral baseline",
            MclSessionShift => "active session differs from the neutral baseline",
            MclEventWindow => "inside a pre/post economic-event window",
            MclBaseline => "all classified states match the neutral baseline",
            MclMetricMissing => "a context metric was missing and replaced by its neutral value",

            BrainTrendEntry => "trend continuation setup detected",
            BrainRangeFade => "range-extreme fade setup detected",
            BrainRaidReversal => "liquidity-raid reversal setup detected",
            BrainExpansionBreakout => "range-expansion breakout setup detected",
            BrainNoSetup => "no qualifying setup in this snapshot",
            BrainLowRewardRisk => "projected reward/risk below the brain's minimum",
            BrainSessionBlocked => "brain does not trade this session",
            BrainVolRegimeBlocked => "volatility band outside the brain's operating regime",
            BrainEventGuard => "event proximity blocks new entries for this brain",
            BrainExecutionDegraded => "execution health too poor to propose entries",

            GlobalRiskOff => "global mode is RISK_OFF; no new exposure",
            CooldownActive => "an active cooldown covers this brain/symbol pair",
            PmCorrelationBlock => "adding the position breaches the correlated-exposure limit",
            PmMaxPositions => "open-position cap reached",
            PmMaxDailyLoss => "daily loss cap reached",
            PmMaxDrawdown => "drawdown cap reached",
            PmSymbolExposureCap => "per-symbol exposure cap breached",
            PmCurrencyExposureCap => "per-currency exposure cap breached",
            PmMaxExposure => "total exposure cap breached; no remaining budget",
            PmRiskScaled => "proposed risk scaled down to fit the remaining budget",
            PmAllow => "all portfolio checks passed",
            PmQueuedExecutorBroken => "intent queued: executor reported BROKEN",
            PmInternalError => "portfolio manager internal numeric fault; intent denied",

            EhmHealthy => "edge health nominal",
            EhmDegraded => "edge health degraded beyond thresholds",
            EhmBroken => "edge health broken beyond thresholds",
            EhmExitNow => "edge-health emergency: close exposure immediately",
            EhmRecovered => "edge health recovered to nominal",

            ExecOrderTimeout => "executor call exceeded its deadline after retry",
            ExecBroken => "executor rejected the call as broken/unavailable",
            ExecOrderFailed => "executor reported the command as failed or unsupported",
            ExecCommandSent => "command accepted by the executor",
            ExecFill => "order filled",
            ExecPositionEvent => "position lifecycle event",
            ExecPnlUpdate => "profit-and-loss update",
            ExecDaySummary => "end-of-day summary",
            ExecStateChange => "executor health state changed",

            ProvOk => "provider data quality nominal",
            ProvDegraded => "provider data stale or gapped beyond tolerance",
            ProvDown => "provider returned no data on a trading day",
            ProvMarketClosed => "FX weekend window; market closed",
            ProvRetryExhausted => "provider fetch failed after retries",

            AuditRecorded => "operator action recorded",
            AuditConfigSnapshot => "configuration snapshot recorded",

            GatePromoted => "gate promoted by one step",
            GateDemoted => "gate demoted",
            GateStepInvalid => "promotion must raise the gate by exactly one step",
            GateRoleForbidden => "actor role is not permitted to change the gate",
            GatePrereqMissingMclSnapshot => "last tick produced no MCL snapshot",
            GatePrereqMissingBrainIntent => "last tick produced no brain intent or skip",
            GatePrereqMissingPmDecision => "last tick produced no PM decision",
            GatePrereqMissingLedger => "last tick persisted no events",
            GatePrereqMissingExecutor => "executor connectivity is not 'connected'",
            GateArmed => "system armed",
            GateDisarmed => "system disarmed",
            GateArmBlocked => "arming is unreachable while the gate is G0",
            GateConfirmMismatch => "confirmation phrase did not match",
            GateKillEngaged => "kill switch engaged: disarmed and risk-off",

            MockScenarioApplied => "synthetic scenario override applied for this tick",
            MockModeActive => "running against the simulated executor",
        }
    }

    /// The full catalogue in declaration order. Used by closure tests and by
    /// the replay view's code legend.
    pub fn catalogue() -> &'static [ReasonCode] {
        use ReasonCode::*;
        &[
            MclStructureShift,
            MclVolatilityShift,
            MclLiquidityShift,
            MclSessionShift,
            MclEventWindow,
            MclBaseline,
            MclMetricMissing,
            BrainTrendEntry,
            BrainRangeFade,
            BrainRaidReversal,
            BrainExpansionBreakout,
            BrainNoSetup,
            BrainLowRewardRisk,
            BrainSessionBlocked,
            BrainVolRegimeBlocked,
            BrainEventGuard,
            BrainExecutionDegraded,
            GlobalRiskOff,
            CooldownActive,
            PmCorrelationBlock,
            PmMaxPositions,
            PmMaxDailyLoss,
            PmMaxDrawdown,
            PmSymbolExposureCap,
            PmCurrencyExposureCap,
            PmMaxExposure,
            PmRiskScaled,
            PmAllow,
            PmQueuedExecutorBroken,
            PmInternalError,
            EhmHealthy,
            EhmDegraded,
            EhmBroken,
            EhmExitNow,
            EhmRecovered,
            ExecOrderTimeout,
            ExecBroken,
            ExecOrderFailed,
            ExecCommandSent,
            ExecFill,
            ExecPositionEvent,
            ExecPnlUpdate,
            ExecDaySummary,
            ExecStateChange,
            ProvOk,
            ProvDegraded,
            ProvDown,
            ProvMarketClosed,
            ProvRetryExhausted,
            AuditRecorded,
            AuditConfigSnapshot,
            GatePromoted,
            GateDemoted,
            GateStepInvalid,
            GateRoleForbidden,
            GatePrereqMissingMclSnapshot,
            GatePrereqMissingBrainIntent,
            GatePrereqMissingPmDecision,
            GatePrereqMissingLedger,
            GatePrereqMissingExecutor,
            GateArmed,
            GateDisarmed,
            GateArmBlocked,
            GateConfirmMismatch,
            GateKillEngaged,
            MockScenarioApplied,
            MockModeActive,
        ]
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `why` block attached to every emitted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Why {
    pub reason_code: ReasonCode,
    pub message: String,
}

impl Why {
    /// Build a `Why` with the catalogue description as the message.
    pub fn from_code(code: ReasonCode) -> Self {
        Self {
            reason_code: code,
            message: code.describe().to_string(),
        }
    }

    /// Build a `Why` with a context-specific message.
    pub fn new(code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            reason_code: code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn wire_strings_are_unique() {
        let mut seen = BTreeSet::new();
        for code in ReasonCode::catalogue() {
            assert!(seen.insert(code.as_str()), "duplicate code {}", code);
        }
    }

    #[test]
    fn every_code_has_a_description() {
        for code in ReasonCode::catalogue() {
            assert!(!code.describe().is_empty(), "missing description for {}", code);
        }
    }

    #[test]
    fn wire_string_matches_partition_prefix() {
        // Every code belongs to exactly one named partition.
        let prefixes = [
            "MCL_", "BRAIN_", "PM_", "EHM_", "EXEC_", "PROV_", "AUDIT_", "GATE_", "MOCK_",
            // Two PM codes are carried verbatim from the decision contract.
            "GLOBAL_RISK_OFF", "COOLDOWN_ACTIVE",
        ];
        for code in ReasonCode::catalogue() {
            let s = code.as_str();
            assert!(
                prefixes.iter().any(|p| s.starts_with(p)),
                "code {} not in a known partition",
                s
            );
        }
    }

    #[test]
    fn serde_uses_wire_string() {
        let json = serde_json::to_string(&ReasonCode::PmCorrelationBlock).unwrap();
        assert_eq!(json, "\"PM_CORRELATION_BLOCK\"");
        let back: ReasonCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ReasonCode::PmCorrelationBlock);
    }

    #[test]
    fn gate_prereq_codes_match_promotion_contract() {
        // The five prerequisite codes the gate authority returns on refusal.
        assert_eq!(
            ReasonCode::GatePrereqMissingMclSnapshot.as_str(),
            "GATE_PREREQ_MISSING_MCL_SNAPSHOT"
        );
        assert_eq!(
            ReasonCode::GatePrereqMissingBrainIntent.as_str(),
            "GATE_PREREQ_MISSING_BRAIN_INTENT"
        );
        assert_eq!(
            ReasonCode::GatePrereqMissingPmDecision.as_str(),
            "GATE_PREREQ_MISSING_PM_DECISION"
        );
        assert_eq!(
            ReasonCode::GatePrereqMissingLedger.as_str(),
            "GATE_PREREQ_MISSING_LEDGER"
        );
        assert_eq!(
            ReasonCode::GatePrereqMissingExecutor.as_str(),
            "GATE_PREREQ_MISSING_EXECUTOR"
        );
    }
}
