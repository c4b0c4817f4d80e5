use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============ Domain Models ============

/// A validated enterprise account, immutable for the duration of a pipeline run.
///
/// Created by the [`crate::validator`] module from a raw feed record.
/// Persistence is a collaborator concern; the core never stores accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique, stable account identifier.
    pub id: String,
    /// Display name of the account.
    pub name: String,
    /// Contract end date, if known.
    pub contract_end: Option<NaiveDate>,
    /// Annual contract value (non-negative).
    pub annual_value: f64,
    /// Days the oldest open invoice is overdue. Missing signal = 0.
    pub days_overdue: f64,
    /// Percentage drop in product usage over the last period. Missing signal = 0.
    pub usage_drop_pct: f64,
    /// Late payments in the last six months. Missing signal = 0.
    pub late_payment_count: u32,
}

/// One measurable indicator of account risk.
///
/// Declaration order doubles as the tie-break order when two signals
/// contribute equally: overdue > usage drop > proximity > payment history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Overdue,
    UsageDrop,
    ContractProximity,
    PaymentHistory,
}

impl SignalKind {
    /// All signals in tie-break order.
    pub const ALL: [SignalKind; 4] = [
        SignalKind::Overdue,
        SignalKind::UsageDrop,
        SignalKind::ContractProximity,
        SignalKind::PaymentHistory,
    ];
}

/// Per-signal contribution to the risk score, retained for explainability.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SignalBreakdown {
    pub overdue: f64,
    pub usage_drop: f64,
    pub contract_proximity: f64,
    pub payment_history: f64,
}

impl SignalBreakdown {
    /// Sum of all four contributions (the unclamped score).
    pub fn sum(&self) -> f64 {
        self.overdue + self.usage_drop + self.contract_proximity + self.payment_history
    }

    /// Contribution of a single signal.
    pub fn contribution(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Overdue => self.overdue,
            SignalKind::UsageDrop => self.usage_drop,
            SignalKind::ContractProximity => self.contract_proximity,
            SignalKind::PaymentHistory => self.payment_history,
        }
    }

    /// The signal with the largest contribution, or `None` when every
    /// contribution is zero (a quiet account has no dominant risk driver).
    /// Ties resolve in the fixed order overdue > usage drop > proximity >
    /// payment history so that strategy selection stays deterministic.
    pub fn dominant(&self) -> Option<SignalKind> {
        let mut best = SignalKind::Overdue;
        for kind in SignalKind::ALL {
            if self.contribution(kind) > self.contribution(best) {
                best = kind;
            }
        }
        (self.contribution(best) > 0.0).then_some(best)
    }
}

/// Risk classification derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Result of scoring one account in one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub account_id: String,
    pub account_name: String,
    pub annual_value: f64,
    /// Clamped sum of the four signal contributions, in [0, 1].
    pub score: f64,
    pub level: RiskLevel,
    pub signal_breakdown: SignalBreakdown,
    /// Estimated likelihood of a successful recovery, in [0, 1].
    pub recovery_probability: f64,
    /// Set when the score is high enough to warrant immediate human
    /// escalation regardless of routing.
    pub escalation_required: bool,
}

/// Execution priority of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// One outreach step inside a recovery playbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StrategyAction {
    /// Templated email to an account contact.
    Email {
        recipient: String,
        template: String,
        tone: String,
        timing: String,
    },
    /// Internal chat notification (e.g. finance channel).
    Chat {
        channel: String,
        message: String,
        timing: String,
    },
    /// Incentive attached to the outreach (fee waiver, workshop).
    OfferIncentive {
        incentive: String,
        conditions: String,
        timing: String,
    },
    /// Calendar invite for a live conversation.
    CalendarInvite {
        recipient: String,
        subject: String,
        timing: String,
    },
}

/// A recovery playbook selected for one account. Never mutated after
/// creation; a re-run of the pipeline produces a fresh strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub account_id: String,
    pub account_name: String,
    /// Stable playbook identifier (e.g. "invoice_recovery").
    pub playbook_id: String,
    pub risk_level: RiskLevel,
    /// The signal that drove playbook selection; `None` for quiet accounts
    /// that get general outreach.
    pub dominant_signal: Option<SignalKind>,
    /// Ordered outreach steps.
    pub actions: Vec<StrategyAction>,
    /// Estimated recoverable revenue: annual_value x recovery fraction x score.
    pub estimated_recovery: f64,
    pub timeline_days: u32,
    pub priority: Priority,
}

/// State of a strategy awaiting (or past) human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

/// A strategy queued for human approval.
///
/// At most one record per account may be PENDING at any time; a newer
/// strategy for the same account replaces the queued one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub account_id: String,
    pub strategy: Strategy,
    pub state: ApprovalState,
    pub queued_at: DateTime<Utc>,
    /// Set only on transition out of PENDING.
    pub decided_by: Option<String>,
    pub notes: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// Outcome of dispatching one strategy to the outbound-action collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionOutcome {
    Sent { executed_at: DateTime<Utc> },
    Failed { reason: String },
}

impl ExecutionOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, ExecutionOutcome::Sent { .. })
    }
}

/// Per-account execution result surfaced in the pipeline response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub account_id: String,
    pub outcome: ExecutionOutcome,
}

/// Process-wide audit counters, accumulated across runs.
///
/// Initialized empty at process start; mutated only through
/// [`crate::audit::AuditAggregator::record`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Completed pipeline runs.
    pub runs: u64,
    /// Accounts ever assessed, regardless of execution outcome.
    pub total_risk_identified: u64,
    /// Strategies produced by the selector.
    pub strategies_created: u64,
    /// Strategies dispatched with a `sent` outcome.
    pub strategies_executed: u64,
    /// Strategies rejected by a human reviewer.
    pub strategies_rejected: u64,
    /// Dispatch attempts that came back `failed`.
    pub executions_failed: u64,
    /// Sum of estimated recovery over executed (`sent`) strategies only.
    pub estimated_recovery: f64,
    /// Analyst hours credited per executed strategy, accumulated.
    pub human_time_saved_hours: f64,
}

/// A record that failed validation, reported alongside its batch index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub index: usize,
    pub reason: String,
}

// ============ Run Report ============

/// Executive-level summary of a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub accounts_analyzed: usize,
    pub high_risk_accounts: usize,
    pub medium_risk_accounts: usize,
    pub total_at_risk_revenue: f64,
    pub immediate_actions_required: usize,
}

/// A high-risk account highlighted in the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopAccount {
    pub account_id: String,
    pub account_name: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

/// Explainability report generated per run for dashboard consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub executive_summary: ExecutiveSummary,
    /// Up to five high-risk accounts, highest score first.
    pub top_accounts: Vec<TopAccount>,
    pub recommendations: Vec<String>,
}

// ============ API Models ============

/// POST /api/v1/analyze request body.
///
/// Records arrive as loose key-value objects; each one is validated
/// individually so a malformed record never aborts its siblings.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub accounts: Vec<serde_json::Value>,
}

/// Structured result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResult {
    pub run_id: Uuid,
    pub assessments: Vec<RiskAssessment>,
    pub strategies: Vec<Strategy>,
    /// AUTO-tagged strategies that were dispatched, with their outcomes.
    pub auto_executed: Vec<ExecutionResult>,
    /// Account ids now holding a PENDING approval record.
    pub pending: Vec<String>,
    /// Per-record validation failures (index into the request batch).
    pub errors: Vec<ValidationFailure>,
    pub report: RunReport,
}

/// POST /api/v1/approvals/decide request body.
#[derive(Debug, Clone, Deserialize)]
pub struct DecideRequest {
    pub account_id: String,
    pub approved: bool,
    pub notes: Option<String>,
    pub decided_by: Option<String>,
}

/// Response for an approval decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecideResponse {
    /// "executed" or "rejected".
    pub status: String,
    pub account_id: String,
    /// Dispatch outcome when the decision was an approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ExecutionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// GET /api/v1/approvals/pending response body.
#[derive(Debug, Clone, Serialize)]
pub struct PendingApprovalsResponse {
    pub pending: Vec<ApprovalRecord>,
}
