//! Strategy dispatch.
//!
//! Invokes the outbound-action collaborator exactly once per accepted
//! strategy and converts the result into an [`ExecutionOutcome`]. Retry
//! policy, if any, belongs to the collaborator or an outer caller.

use std::sync::Arc;

use chrono::Utc;

use crate::connector::OutboundConnector;
use crate::errors::ResultExt;
use crate::models::{ExecutionOutcome, Strategy};

/// Dispatches approved and AUTO strategies.
#[derive(Clone)]
pub struct Executor {
    connector: Arc<dyn OutboundConnector>,
}

impl Executor {
    pub fn new(connector: Arc<dyn OutboundConnector>) -> Self {
        Self { connector }
    }

    /// Executes one strategy. A collaborator failure is captured as a
    /// `failed` outcome with its reason, never swallowed and never retried.
    pub async fn execute(&self, strategy: &Strategy) -> ExecutionOutcome {
        let sent = self
            .connector
            .send(&strategy.account_id, strategy)
            .await
            .with_context(|| {
                format!(
                    "Dispatching {} for account {}",
                    strategy.playbook_id, strategy.account_id
                )
            });

        match sent {
            Ok(()) => {
                tracing::info!(
                    "Executed {} for account {} (estimated recovery {})",
                    strategy.playbook_id,
                    strategy.account_id,
                    strategy.estimated_recovery
                );
                ExecutionOutcome::Sent {
                    executed_at: Utc::now(),
                }
            }
            Err(e) => {
                tracing::error!(
                    "Execution failed for account {}: {}",
                    strategy.account_id,
                    e
                );
                ExecutionOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
