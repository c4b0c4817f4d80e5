//! Cross-run audit accumulation and per-run reporting.
//!
//! The aggregator is the only mutable global state besides the approval
//! queue. All mutation funnels through [`AuditAggregator::record`], which
//! takes a short-lived mutex per event, so concurrent pipeline runs never
//! lose updates and readers get a consistent point-in-time copy.

use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;

use crate::config::Config;
use crate::models::{
    Account, ExecutiveSummary, MetricsSnapshot, RiskAssessment, RiskLevel, RunReport, Strategy,
    TopAccount,
};

/// A single bookkeeping event emitted by the pipeline or the decision path.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    /// An account was assessed, regardless of what happened downstream.
    AccountAssessed,
    /// A strategy was produced by the selector.
    StrategyCreated,
    /// A strategy was dispatched with a `sent` outcome.
    StrategyExecuted { estimated_recovery: f64 },
    /// A dispatch attempt came back `failed`.
    ExecutionFailed,
    /// A human reviewer rejected a pending strategy.
    StrategyRejected,
    /// A pipeline run finished.
    RunCompleted,
}

/// Accumulates explainable audit metrics across runs.
pub struct AuditAggregator {
    hours_saved_per_execution: f64,
    metrics: Mutex<MetricsSnapshot>,
}

impl AuditAggregator {
    pub fn new(config: &Config) -> Self {
        Self {
            hours_saved_per_execution: config.hours_saved_per_execution,
            metrics: Mutex::new(MetricsSnapshot::default()),
        }
    }

    /// Single mutation entry point. Each call applies atomically; the lock
    /// is held only for the field updates and never across awaits.
    pub fn record(&self, event: AuditEvent) {
        let mut metrics = self
            .metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match event {
            AuditEvent::AccountAssessed => metrics.total_risk_identified += 1,
            AuditEvent::StrategyCreated => metrics.strategies_created += 1,
            AuditEvent::StrategyExecuted { estimated_recovery } => {
                metrics.strategies_executed += 1;
                metrics.estimated_recovery += estimated_recovery;
                metrics.human_time_saved_hours += self.hours_saved_per_execution;
            }
            AuditEvent::ExecutionFailed => metrics.executions_failed += 1,
            AuditEvent::StrategyRejected => metrics.strategies_rejected += 1,
            AuditEvent::RunCompleted => metrics.runs += 1,
        }
    }

    /// Consistent point-in-time copy of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Builds the executive report for one run: risk distribution, the top
/// high-risk accounts, and actionable recommendations.
pub fn build_report(
    accounts: &[Account],
    assessments: &[RiskAssessment],
    strategies: &[Strategy],
    today: NaiveDate,
) -> RunReport {
    let high_risk: Vec<&RiskAssessment> = assessments
        .iter()
        .filter(|a| a.level == RiskLevel::High)
        .collect();
    let medium_risk = assessments
        .iter()
        .filter(|a| a.level == RiskLevel::Medium)
        .count();
    let immediate_actions = strategies
        .iter()
        .filter(|s| s.priority == crate::models::Priority::High)
        .count();
    let total_at_risk_revenue: f64 = strategies.iter().map(|s| s.estimated_recovery).sum();

    let mut top_accounts: Vec<TopAccount> = high_risk
        .iter()
        .map(|a| TopAccount {
            account_id: a.account_id.clone(),
            account_name: a.account_name.clone(),
            risk_score: a.score,
            risk_level: a.level,
        })
        .collect();
    top_accounts.sort_by(|a, b| {
        b.risk_score
            .partial_cmp(&a.risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    top_accounts.truncate(5);

    RunReport {
        executive_summary: ExecutiveSummary {
            accounts_analyzed: assessments.len(),
            high_risk_accounts: high_risk.len(),
            medium_risk_accounts: medium_risk,
            total_at_risk_revenue: (total_at_risk_revenue * 100.0).round() / 100.0,
            immediate_actions_required: immediate_actions,
        },
        top_accounts,
        recommendations: build_recommendations(accounts, today),
    }
}

fn build_recommendations(accounts: &[Account], today: NaiveDate) -> Vec<String> {
    let mut recommendations = Vec::new();

    let severe_overdue = accounts.iter().filter(|a| a.days_overdue > 60.0).count();
    if severe_overdue > 0 {
        recommendations.push(format!(
            "Escalate {} account(s) with invoices >60 days overdue to collections immediately.",
            severe_overdue
        ));
    }

    let high_drop = accounts.iter().filter(|a| a.usage_drop_pct > 40.0).count();
    if high_drop > 0 {
        recommendations.push(format!(
            "Schedule proactive check-in calls for {} account(s) showing >40% usage decline.",
            high_drop
        ));
    }

    let expiring = accounts
        .iter()
        .filter(|a| {
            a.contract_end
                .map(|end| {
                    let days = (end - today).num_days();
                    (0..=90).contains(&days)
                })
                .unwrap_or(false)
        })
        .count();
    if expiring > 0 {
        recommendations.push(format!(
            "Initiate renewal conversations for {} account(s) with contracts expiring within 90 days.",
            expiring
        ));
    }

    if recommendations.is_empty() {
        recommendations
            .push("No immediate critical actions identified. Continue monitoring.".to_string());
    }

    recommendations
}
