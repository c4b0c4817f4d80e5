use crate::approvals::ApprovalGate;
use crate::audit::{AuditAggregator, AuditEvent};
use crate::errors::AppError;
use crate::executor::Executor;
use crate::models::*;
use crate::pipeline::PipelineOrchestrator;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// The batch pipeline.
    pub pipeline: PipelineOrchestrator,
    /// Pending-approval queue and its state machine.
    pub gate: Arc<ApprovalGate>,
    /// Dispatcher for approved strategies.
    pub executor: Executor,
    /// Cross-run metrics accumulator.
    pub audit: Arc<AuditAggregator>,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "revenuepilot-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/v1/analyze
///
/// Main endpoint: runs a batch of raw account records through the full
/// risk pipeline. Individual malformed records are reported in the result's
/// `errors` list; only an empty batch is rejected outright.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - JSON body with the raw account records.
///
/// # Returns
///
/// * `Result<Json<AnalyzeResult>, AppError>` - The structured pipeline result or an error.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResult>, AppError> {
    tracing::info!("POST /analyze - {} record(s)", request.accounts.len());

    if request.accounts.is_empty() {
        return Err(AppError::BadRequest(
            "At least one account record is required".to_string(),
        ));
    }

    let result = state.pipeline.run(&request.accounts).await;
    Ok(Json(result))
}

/// GET /api/v1/approvals/pending
///
/// Returns strategies waiting for human approval, oldest first.
///
/// # Arguments
///
/// * `state` - The application state.
///
/// # Returns
///
/// * `Json<PendingApprovalsResponse>` - The ordered pending queue.
pub async fn list_pending_approvals(
    State(state): State<Arc<AppState>>,
) -> Json<PendingApprovalsResponse> {
    let pending = state.gate.list_pending().await;
    tracing::debug!("GET /approvals/pending - {} record(s)", pending.len());
    Json(PendingApprovalsResponse { pending })
}

/// POST /api/v1/approvals/decide
///
/// Applies a human approve/reject decision to the pending strategy for an
/// account. Approval dispatches the strategy exactly once and reports the
/// outcome; rejection discards it. Returns 404 when no PENDING record
/// exists for the account (no state is mutated in that case).
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - JSON body with the account id, verdict and optional notes.
///
/// # Returns
///
/// * `Result<Json<DecideResponse>, AppError>` - The decision outcome or NotFound.
pub async fn decide_approval(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DecideRequest>,
) -> Result<Json<DecideResponse>, AppError> {
    tracing::info!(
        "POST /approvals/decide - account {} approved={}",
        request.account_id,
        request.approved
    );

    let record = state
        .gate
        .decide(
            &request.account_id,
            request.approved,
            request.decided_by.clone(),
            request.notes.clone(),
        )
        .await?;

    if !request.approved {
        state.audit.record(AuditEvent::StrategyRejected);
        tracing::info!(
            "Strategy for account {} rejected, not executed",
            record.account_id
        );
        return Ok(Json(DecideResponse {
            status: "rejected".to_string(),
            account_id: record.account_id,
            outcome: None,
            notes: record.notes,
        }));
    }

    let outcome = state.executor.execute(&record.strategy).await;
    if outcome.is_sent() {
        state.audit.record(AuditEvent::StrategyExecuted {
            estimated_recovery: record.strategy.estimated_recovery,
        });
    } else {
        state.audit.record(AuditEvent::ExecutionFailed);
    }

    Ok(Json(DecideResponse {
        status: "executed".to_string(),
        account_id: record.account_id,
        outcome: Some(outcome),
        notes: record.notes,
    }))
}

/// GET /api/v1/metrics
///
/// Returns the cumulative audit metrics.
///
/// # Arguments
///
/// * `state` - The application state.
///
/// # Returns
///
/// * `Json<MetricsSnapshot>` - A consistent point-in-time copy of the counters.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.audit.snapshot())
}
