//! Human-in-the-loop approval gate.
//!
//! Owns the pending-approval set and its state machine. The set is a map
//! keyed by account id behind a single async mutex: submissions, decisions
//! and listings all serialize on it, which is what enforces the core
//! invariant that at most one PENDING record exists per account and that a
//! decision racing a re-analysis applies wholly to one record or the other.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{ApprovalRecord, ApprovalState, Priority, Strategy};

/// Entry decision for a freshly selected strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// No human gate needed; forward straight to the executor.
    Auto,
    /// Queued for human approval.
    Pending,
}

/// Gates high-value strategies behind human approval.
pub struct ApprovalGate {
    approval_threshold_amount: f64,
    pending: Mutex<HashMap<String, ApprovalRecord>>,
}

impl ApprovalGate {
    pub fn new(config: &Config) -> Self {
        Self {
            approval_threshold_amount: config.approval_threshold_amount,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Entry rule: a strategy needs sign-off when its estimated recovery
    /// exceeds the configured threshold or its priority is high.
    pub fn requires_approval(&self, strategy: &Strategy) -> bool {
        strategy.estimated_recovery > self.approval_threshold_amount
            || strategy.priority == Priority::High
    }

    /// Routes a new strategy: AUTO strategies pass through untouched,
    /// gated strategies enter the pending set. A new PENDING record for an
    /// account replaces (never appends to) any existing one; the stale
    /// record is discarded.
    pub async fn submit(&self, strategy: Strategy) -> Routing {
        if !self.requires_approval(&strategy) {
            return Routing::Auto;
        }

        let record = ApprovalRecord {
            account_id: strategy.account_id.clone(),
            strategy,
            state: ApprovalState::Pending,
            queued_at: Utc::now(),
            decided_by: None,
            notes: None,
            decided_at: None,
        };

        let mut pending = self.pending.lock().await;
        if let Some(stale) = pending.insert(record.account_id.clone(), record) {
            tracing::info!(
                "Superseded pending strategy for account {} (playbook {})",
                stale.account_id,
                stale.strategy.playbook_id
            );
        }
        Routing::Pending
    }

    /// Applies a human decision to the pending record for `account_id`.
    ///
    /// Removes the record from the pending set and returns it transitioned
    /// to APPROVED or REJECTED. The caller forwards approved strategies to
    /// the executor. Returns `NotFound` (mutating nothing) when no PENDING
    /// record exists for the account.
    pub async fn decide(
        &self,
        account_id: &str,
        approved: bool,
        decided_by: Option<String>,
        notes: Option<String>,
    ) -> Result<ApprovalRecord, AppError> {
        let mut pending = self.pending.lock().await;
        let mut record = pending.remove(account_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "No pending strategy found for account '{}'",
                account_id
            ))
        })?;
        drop(pending);

        record.state = if approved {
            ApprovalState::Approved
        } else {
            ApprovalState::Rejected
        };
        record.decided_by = decided_by;
        record.notes = notes;
        record.decided_at = Some(Utc::now());

        tracing::info!(
            "Strategy for account {} {}",
            account_id,
            if approved { "approved" } else { "rejected" }
        );
        Ok(record)
    }

    /// Snapshot of the pending queue, oldest first (ties broken by account
    /// id for a stable order).
    pub async fn list_pending(&self) -> Vec<ApprovalRecord> {
        let pending = self.pending.lock().await;
        let mut records: Vec<ApprovalRecord> = pending.values().cloned().collect();
        records.sort_by(|a, b| {
            a.queued_at
                .cmp(&b.queued_at)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });
        records
    }

    /// Number of strategies currently awaiting a decision.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
