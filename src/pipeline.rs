//! Per-batch pipeline orchestration.
//!
//! Composes Validator -> RiskScorer -> StrategySelector -> ApprovalGate ->
//! (Executor | hold) -> AuditAggregator for one batch request. Runs are
//! independent; errors local to one account never abort the batch, and
//! completed sub-steps are final even if the caller goes away mid-batch.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::approvals::{ApprovalGate, Routing};
use crate::audit::{build_report, AuditAggregator, AuditEvent};
use crate::config::Config;
use crate::executor::Executor;
use crate::models::{AnalyzeResult, ExecutionResult};
use crate::scoring::RiskScorer;
use crate::strategy::StrategySelector;
use crate::validator::validate_batch;

/// Orchestrates the scoring -> selection -> approval -> execution pipeline.
pub struct PipelineOrchestrator {
    scorer: RiskScorer,
    selector: StrategySelector,
    gate: Arc<ApprovalGate>,
    executor: Executor,
    audit: Arc<AuditAggregator>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: &Config,
        gate: Arc<ApprovalGate>,
        executor: Executor,
        audit: Arc<AuditAggregator>,
    ) -> Self {
        Self {
            scorer: RiskScorer::new(config),
            selector: StrategySelector::new(config),
            gate,
            executor,
            audit,
        }
    }

    /// Runs one batch against today's date.
    pub async fn run(&self, records: &[Value]) -> AnalyzeResult {
        self.run_at(records, Utc::now().date_naive()).await
    }

    /// Runs one batch against an explicit reference date. Scoring and
    /// selection are pure, so a fixed date makes the whole run reproducible.
    pub async fn run_at(&self, records: &[Value], today: NaiveDate) -> AnalyzeResult {
        let run_id = Uuid::new_v4();
        tracing::info!("Pipeline run {} started ({} record(s))", run_id, records.len());

        let (accounts, errors) = validate_batch(records);
        if !errors.is_empty() {
            tracing::warn!(
                "Run {}: {} record(s) failed validation, continuing with {}",
                run_id,
                errors.len(),
                accounts.len()
            );
        }

        let mut assessments = Vec::with_capacity(accounts.len());
        let mut strategies = Vec::with_capacity(accounts.len());
        for account in &accounts {
            let assessment = self.scorer.score(account, today);
            self.audit.record(AuditEvent::AccountAssessed);

            let strategy = self.selector.select(account, &assessment);
            self.audit.record(AuditEvent::StrategyCreated);

            assessments.push(assessment);
            strategies.push(strategy);
        }

        let mut auto_executed = Vec::new();
        let mut pending = Vec::new();
        for strategy in &strategies {
            match self.gate.submit(strategy.clone()).await {
                Routing::Pending => {
                    tracing::info!(
                        "Run {}: account {} queued for approval (estimated recovery {})",
                        run_id,
                        strategy.account_id,
                        strategy.estimated_recovery
                    );
                    pending.push(strategy.account_id.clone());
                }
                Routing::Auto => {
                    let outcome = self.executor.execute(strategy).await;
                    if outcome.is_sent() {
                        self.audit.record(AuditEvent::StrategyExecuted {
                            estimated_recovery: strategy.estimated_recovery,
                        });
                    } else {
                        self.audit.record(AuditEvent::ExecutionFailed);
                    }
                    auto_executed.push(ExecutionResult {
                        account_id: strategy.account_id.clone(),
                        outcome,
                    });
                }
            }
        }

        let report = build_report(&accounts, &assessments, &strategies, today);
        self.audit.record(AuditEvent::RunCompleted);

        tracing::info!(
            "Pipeline run {} finished: {} assessed, {} auto-executed, {} pending, {} error(s)",
            run_id,
            assessments.len(),
            auto_executed.len(),
            pending.len(),
            errors.len()
        );

        AnalyzeResult {
            run_id,
            assessments,
            strategies,
            auto_executed,
            pending,
            errors,
            report,
        }
    }
}
