//! Outbound-action collaborator boundary.
//!
//! The core treats outbound communication (email/chat/CRM actions) as an
//! at-most-once, fire-and-observe dependency. `send` is called exactly once
//! per accepted strategy and never retried here.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::errors::AppError;
use crate::models::{Strategy, StrategyAction};

/// Dispatches one strategy's actions to the communication collaborator.
#[async_trait]
pub trait OutboundConnector: Send + Sync {
    async fn send(&self, account_id: &str, strategy: &Strategy) -> Result<(), AppError>;
}

/// Development connector: logs each action via tracing and reports success.
#[derive(Debug, Default, Clone)]
pub struct LogConnector;

#[async_trait]
impl OutboundConnector for LogConnector {
    async fn send(&self, account_id: &str, strategy: &Strategy) -> Result<(), AppError> {
        for action in &strategy.actions {
            match action {
                StrategyAction::Email {
                    recipient,
                    template,
                    tone,
                    ..
                } => tracing::info!(
                    "[EMAIL] To: {} | Template: {} | Tone: {} | Account: {}",
                    recipient,
                    template,
                    tone,
                    strategy.account_name
                ),
                StrategyAction::Chat {
                    channel, message, ..
                } => tracing::info!("[CHAT] Channel: {} | {}", channel, message),
                StrategyAction::OfferIncentive {
                    incentive,
                    conditions,
                    ..
                } => tracing::info!(
                    "[INCENTIVE] Type: {} | Conditions: {} | Account: {}",
                    incentive,
                    conditions,
                    strategy.account_name
                ),
                StrategyAction::CalendarInvite {
                    recipient, subject, ..
                } => tracing::info!("[CALENDAR] To: {} | Subject: {}", recipient, subject),
            }
        }
        tracing::debug!(
            "Dispatched {} action(s) for account {}",
            strategy.actions.len(),
            account_id
        );
        Ok(())
    }
}

/// Production connector: POSTs the strategy to a configured webhook
/// (communication/CRM gateway). Non-2xx responses and transport errors are
/// surfaced as collaborator failures.
#[derive(Clone)]
pub struct WebhookConnector {
    client: reqwest::Client,
    url: String,
}

impl WebhookConnector {
    pub fn new(url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::CollaboratorFailure(format!("Failed to create webhook client: {}", e))
            })?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl OutboundConnector for WebhookConnector {
    async fn send(&self, account_id: &str, strategy: &Strategy) -> Result<(), AppError> {
        tracing::info!(
            "Dispatching playbook {} for account {} to {}",
            strategy.playbook_id,
            account_id,
            self.url
        );

        let body = json!({
            "account_id": account_id,
            "account_name": strategy.account_name,
            "playbook_id": strategy.playbook_id,
            "priority": strategy.priority,
            "timeline_days": strategy.timeline_days,
            "actions": strategy.actions,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::CollaboratorFailure(format!("Outbound request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::CollaboratorFailure(format!(
                "Outbound collaborator returned {}: {}",
                status, error_text
            )));
        }

        tracing::info!("Dispatch accepted for account {}", account_id);
        Ok(())
    }
}
