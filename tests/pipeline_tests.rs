/// End-to-end pipeline tests at the library level: batch semantics, audit
/// math, idempotence, and the caller-facing approve/reject flow through the
/// actual handlers.
use async_trait::async_trait;
use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use revenuepilot_api::approvals::ApprovalGate;
use revenuepilot_api::audit::AuditAggregator;
use revenuepilot_api::config::Config;
use revenuepilot_api::connector::{LogConnector, OutboundConnector};
use revenuepilot_api::errors::AppError;
use revenuepilot_api::executor::Executor;
use revenuepilot_api::handlers::{self, AppState};
use revenuepilot_api::models::*;
use revenuepilot_api::pipeline::PipelineOrchestrator;

/// Connector that counts dispatches, for asserting at-most-once execution.
#[derive(Default)]
struct CountingConnector {
    sends: AtomicUsize,
}

#[async_trait]
impl OutboundConnector for CountingConnector {
    async fn send(&self, _account_id: &str, _strategy: &Strategy) -> Result<(), AppError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector whose collaborator is down.
struct FailingConnector;

#[async_trait]
impl OutboundConnector for FailingConnector {
    async fn send(&self, _account_id: &str, _strategy: &Strategy) -> Result<(), AppError> {
        Err(AppError::CollaboratorFailure("smtp relay down".to_string()))
    }
}

fn build_state(connector: Arc<dyn OutboundConnector>) -> Arc<AppState> {
    let config = Config::default();
    let gate = Arc::new(ApprovalGate::new(&config));
    let audit = Arc::new(AuditAggregator::new(&config));
    let executor = Executor::new(connector);
    let pipeline = PipelineOrchestrator::new(
        &config,
        Arc::clone(&gate),
        executor.clone(),
        Arc::clone(&audit),
    );
    Arc::new(AppState {
        pipeline,
        gate,
        executor,
        audit,
    })
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

/// Worked account: 45 days overdue, 20% usage drop, 1 late payment,
/// contract 20 days out of the fixed reference date.
fn techcorp() -> serde_json::Value {
    json!({
        "id": "acc_001",
        "name": "TechCorp Solutions",
        "contract_end": "2026-03-21",
        "annual_value": 150_000.0,
        "days_overdue": 45.0,
        "usage_drop_pct": 20.0,
        "late_payment_count": 1
    })
}

/// A quiet low-value account that routes AUTO.
fn innovatelabs() -> serde_json::Value {
    json!({
        "id": "acc_002",
        "name": "InnovateLabs",
        "annual_value": 20_000.0,
        "days_overdue": 10.0
    })
}

#[tokio::test]
async fn batch_splits_into_pending_and_auto() {
    let state = build_state(Arc::new(LogConnector));
    let result = state
        .pipeline
        .run_at(&[techcorp(), innovatelabs()], today())
        .await;

    assert_eq!(result.assessments.len(), 2);
    assert_eq!(result.strategies.len(), 2);
    assert!(result.errors.is_empty());

    // TechCorp: 0.18 + 0.06 + 0.20 + 0.025 = 0.465, MEDIUM, recovery 13950.
    let assessment = &result.assessments[0];
    assert!((assessment.score - 0.465).abs() < 1e-9);
    assert_eq!(assessment.level, RiskLevel::Medium);
    assert!((assessment.recovery_probability - 0.53).abs() < 1e-9);
    assert!(!assessment.escalation_required);
    let strategy = &result.strategies[0];
    assert_eq!(strategy.estimated_recovery, 13_950.0);
    assert_eq!(strategy.playbook_id, "invoice_recovery");
    assert_eq!(result.pending, vec!["acc_001".to_string()]);

    // InnovateLabs: score 0.04, recovery 160, dispatched immediately.
    assert_eq!(result.auto_executed.len(), 1);
    assert_eq!(result.auto_executed[0].account_id, "acc_002");
    assert!(result.auto_executed[0].outcome.is_sent());

    // Audit: both assessed, one executed, only its recovery counted.
    let metrics = state.audit.snapshot();
    assert_eq!(metrics.runs, 1);
    assert_eq!(metrics.total_risk_identified, 2);
    assert_eq!(metrics.strategies_created, 2);
    assert_eq!(metrics.strategies_executed, 1);
    assert_eq!(metrics.estimated_recovery, 160.0);
    assert_eq!(metrics.human_time_saved_hours, 2.0);
}

#[tokio::test]
async fn signalless_account_routes_to_general_outreach() {
    let state = build_state(Arc::new(LogConnector));
    let quiet = json!({
        "id": "acc_005",
        "name": "Steady State Inc",
        "annual_value": 50_000.0
    });
    let result = state.pipeline.run_at(&[quiet], today()).await;

    assert_eq!(result.assessments[0].score, 0.0);
    let strategy = &result.strategies[0];
    assert_eq!(strategy.playbook_id, "general_outreach");
    assert_eq!(strategy.dominant_signal, None);
    // Nothing to recover: dispatched immediately, never queued.
    assert!(result.pending.is_empty());
    assert_eq!(result.auto_executed.len(), 1);
}

#[tokio::test]
async fn malformed_records_never_abort_the_batch() {
    let state = build_state(Arc::new(LogConnector));
    let batch = vec![
        techcorp(),
        json!({"name": "missing id"}),
        json!({"id": "acc_003", "name": "Globex", "annual_value": -1.0}),
        innovatelabs(),
    ];
    let result = state.pipeline.run_at(&batch, today()).await;

    assert_eq!(result.assessments.len(), 2);
    assert_eq!(result.errors.len(), 2);
    assert_eq!(result.errors[0].index, 1);
    assert_eq!(result.errors[1].index, 2);
    // One outcome or one error per input record.
    assert_eq!(
        result.pending.len() + result.auto_executed.len() + result.errors.len(),
        batch.len()
    );
}

#[tokio::test]
async fn reanalysis_is_idempotent_and_replaces_pending() {
    let state = build_state(Arc::new(LogConnector));
    let first = state.pipeline.run_at(&[techcorp()], today()).await;
    let second = state.pipeline.run_at(&[techcorp()], today()).await;

    assert_eq!(first.assessments[0].score, second.assessments[0].score);
    assert_eq!(first.strategies[0], second.strategies[0]);

    // The second run superseded the first pending record, not appended.
    assert_eq!(state.gate.pending_count().await, 1);
}

#[tokio::test]
async fn run_report_summarizes_risk_and_recommendations() {
    let state = build_state(Arc::new(LogConnector));
    let severe = json!({
        "id": "acc_004",
        "name": "Global Dynamics",
        "annual_value": 250_000.0,
        "days_overdue": 95.0,
        "usage_drop_pct": 65.0,
        "late_payment_count": 3,
        "contract_end": "2026-03-20"
    });
    let result = state.pipeline.run_at(&[severe, innovatelabs()], today()).await;

    let summary = &result.report.executive_summary;
    assert_eq!(summary.accounts_analyzed, 2);
    assert_eq!(summary.high_risk_accounts, 1);
    assert_eq!(result.report.top_accounts.len(), 1);
    assert_eq!(result.report.top_accounts[0].account_id, "acc_004");

    let recs = result.report.recommendations.join(" ");
    assert!(recs.contains("collections"));
    assert!(recs.contains("usage decline"));
    assert!(recs.contains("renewal"));
}

#[tokio::test]
async fn quiet_batch_gets_monitoring_recommendation() {
    let state = build_state(Arc::new(LogConnector));
    let result = state.pipeline.run_at(&[innovatelabs()], today()).await;
    assert_eq!(
        result.report.recommendations,
        vec!["No immediate critical actions identified. Continue monitoring.".to_string()]
    );
}

#[tokio::test]
async fn approving_a_pending_strategy_executes_exactly_once() {
    let connector = Arc::new(CountingConnector::default());
    let state = build_state(connector.clone());

    // No contract_end so the score is date-independent: 0.40 + 0.06 + 0.025
    // = 0.485, recovery 14550 > threshold, queued.
    let account = json!({
        "id": "acc_001",
        "name": "TechCorp Solutions",
        "annual_value": 150_000.0,
        "days_overdue": 100.0,
        "usage_drop_pct": 20.0,
        "late_payment_count": 1
    });
    let result = handlers::analyze(
        State(state.clone()),
        Json(AnalyzeRequest {
            accounts: vec![account],
        }),
    )
    .await
    .unwrap();
    assert_eq!(result.0.pending, vec!["acc_001".to_string()]);
    assert_eq!(connector.sends.load(Ordering::SeqCst), 0);

    let listed = handlers::list_pending_approvals(State(state.clone())).await;
    assert_eq!(listed.0.pending.len(), 1);
    assert_eq!(listed.0.pending[0].state, ApprovalState::Pending);

    let decision = handlers::decide_approval(
        State(state.clone()),
        Json(DecideRequest {
            account_id: "acc_001".to_string(),
            approved: true,
            notes: Some("Approved by VP Sales".to_string()),
            decided_by: Some("vp_sales".to_string()),
        }),
    )
    .await
    .unwrap();

    assert_eq!(decision.0.status, "executed");
    assert!(decision.0.outcome.as_ref().unwrap().is_sent());
    assert_eq!(connector.sends.load(Ordering::SeqCst), 1);

    let metrics = state.audit.snapshot();
    assert_eq!(metrics.strategies_executed, 1);
    assert_eq!(metrics.estimated_recovery, 14_550.0);

    // Deciding again is a definite NotFound, not a silent no-op.
    let err = handlers::decide_approval(
        State(state.clone()),
        Json(DecideRequest {
            account_id: "acc_001".to_string(),
            approved: true,
            notes: None,
            decided_by: None,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(connector.sends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_strategies_are_discarded_and_uncounted() {
    let connector = Arc::new(CountingConnector::default());
    let state = build_state(connector.clone());

    let account = json!({
        "id": "acc_001",
        "name": "TechCorp Solutions",
        "annual_value": 150_000.0,
        "days_overdue": 100.0,
        "usage_drop_pct": 20.0,
        "late_payment_count": 1
    });
    state.pipeline.run_at(&[account], today()).await;

    let decision = handlers::decide_approval(
        State(state.clone()),
        Json(DecideRequest {
            account_id: "acc_001".to_string(),
            approved: false,
            notes: Some("budget freeze".to_string()),
            decided_by: None,
        }),
    )
    .await
    .unwrap();

    assert_eq!(decision.0.status, "rejected");
    assert!(decision.0.outcome.is_none());
    assert_eq!(connector.sends.load(Ordering::SeqCst), 0);

    let metrics = state.audit.snapshot();
    assert_eq!(metrics.strategies_rejected, 1);
    assert_eq!(metrics.strategies_executed, 0);
    assert_eq!(metrics.estimated_recovery, 0.0);
}

#[tokio::test]
async fn failed_dispatch_is_surfaced_and_excluded_from_success_metrics() {
    let state = build_state(Arc::new(FailingConnector));
    let result = state.pipeline.run_at(&[innovatelabs()], today()).await;

    assert_eq!(result.auto_executed.len(), 1);
    match &result.auto_executed[0].outcome {
        ExecutionOutcome::Failed { reason } => assert!(reason.contains("smtp relay down")),
        ExecutionOutcome::Sent { .. } => panic!("expected failed outcome"),
    }

    let metrics = state.audit.snapshot();
    assert_eq!(metrics.executions_failed, 1);
    assert_eq!(metrics.strategies_executed, 0);
    assert_eq!(metrics.estimated_recovery, 0.0);
    assert_eq!(metrics.human_time_saved_hours, 0.0);
    // The account still counts as assessed.
    assert_eq!(metrics.total_risk_identified, 1);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let state = build_state(Arc::new(LogConnector));
    let err = handlers::analyze(
        State(state),
        Json(AnalyzeRequest { accounts: vec![] }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn metrics_accumulate_across_runs() {
    let state = build_state(Arc::new(LogConnector));
    state.pipeline.run_at(&[innovatelabs()], today()).await;
    state.pipeline.run_at(&[innovatelabs()], today()).await;
    state.pipeline.run_at(&[innovatelabs()], today()).await;

    let metrics = handlers::get_metrics(State(state)).await;
    assert_eq!(metrics.0.runs, 3);
    assert_eq!(metrics.0.total_risk_identified, 3);
    assert_eq!(metrics.0.strategies_executed, 3);
    assert_eq!(metrics.0.estimated_recovery, 480.0);
}
