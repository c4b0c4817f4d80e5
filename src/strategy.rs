//! Deterministic strategy selection.
//!
//! Maps a scored account to a recovery playbook: an ordered action sequence,
//! tone, estimated recovery and timeline. The playbook table is keyed by the
//! dominant risk signal, with tone and priority modulated by risk level and
//! the raw signal values.

use crate::config::Config;
use crate::models::{
    Account, Priority, RiskAssessment, RiskLevel, SignalKind, Strategy, StrategyAction,
};

/// Selects recovery playbooks for scored accounts.
#[derive(Debug, Clone)]
pub struct StrategySelector {
    /// Fraction of annual value considered recoverable at full risk.
    /// Estimated recovery = annual_value * recovery_fraction * score.
    recovery_fraction: f64,
    approval_threshold_amount: f64,
}

impl StrategySelector {
    pub fn new(config: &Config) -> Self {
        Self {
            recovery_fraction: config.recovery_fraction,
            approval_threshold_amount: config.approval_threshold_amount,
        }
    }

    /// Builds the strategy for one account. Deterministic: a re-run over the
    /// same account and assessment yields an identical strategy.
    pub fn select(&self, account: &Account, assessment: &RiskAssessment) -> Strategy {
        let dominant = assessment.signal_breakdown.dominant();

        let (playbook_id, actions, timeline_days) = match dominant {
            Some(SignalKind::Overdue) => invoice_recovery_playbook(account),
            Some(SignalKind::UsageDrop) => reengagement_playbook(),
            Some(SignalKind::ContractProximity) => renewal_playbook(),
            // No dedicated payment playbook; a quiet account with no
            // contributing signal gets the same health-check outreach.
            Some(SignalKind::PaymentHistory) | None => general_outreach_playbook(),
        };

        let estimated_recovery = round_currency(
            account.annual_value * self.recovery_fraction * assessment.score,
        );

        let priority = if estimated_recovery > self.approval_threshold_amount
            || assessment.level == RiskLevel::High
        {
            Priority::High
        } else if assessment.level == RiskLevel::Medium {
            Priority::Medium
        } else {
            Priority::Low
        };

        Strategy {
            account_id: account.id.clone(),
            account_name: account.name.clone(),
            playbook_id: playbook_id.to_string(),
            risk_level: assessment.level,
            dominant_signal: dominant,
            actions,
            estimated_recovery,
            timeline_days,
            priority,
        }
    }
}

fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Multi-step recovery for overdue invoices. Tone and escalation pace depend
/// on how late the account is.
fn invoice_recovery_playbook(account: &Account) -> (&'static str, Vec<StrategyAction>, u32) {
    let days_overdue = account.days_overdue;
    let tone = if days_overdue < 30.0 {
        "friendly_reminder"
    } else {
        "urgent"
    };
    let escalation_delay = if days_overdue < 30.0 { "+3_days" } else { "+1_day" };

    let mut actions = vec![StrategyAction::Email {
        recipient: "finance_contact".to_string(),
        template: "overdue_invoice_reminder".to_string(),
        tone: tone.to_string(),
        timing: "immediate".to_string(),
    }];

    // Late-fee waiver for significantly overdue accounts
    if days_overdue > 45.0 {
        actions.push(StrategyAction::OfferIncentive {
            incentive: "late_fee_waiver".to_string(),
            conditions: "Payment within 5 business days".to_string(),
            timing: "after_reminder".to_string(),
        });
    }

    actions.push(StrategyAction::Email {
        recipient: "executive_sponsor".to_string(),
        template: "payment_escalation".to_string(),
        tone: "escalated".to_string(),
        timing: escalation_delay.to_string(),
    });
    actions.push(StrategyAction::Chat {
        channel: "internal-finance".to_string(),
        message: "Consider escalating to collections if no response within 48h.".to_string(),
        timing: "+7_days".to_string(),
    });

    let timeline_days = if days_overdue >= 30.0 { 3 } else { 7 };
    ("invoice_recovery", actions, timeline_days)
}

/// Re-engagement for accounts with declining usage.
fn reengagement_playbook() -> (&'static str, Vec<StrategyAction>, u32) {
    let actions = vec![
        StrategyAction::Email {
            recipient: "power_user".to_string(),
            template: "usage_drop_alert".to_string(),
            tone: "supportive".to_string(),
            timing: "immediate".to_string(),
        },
        StrategyAction::OfferIncentive {
            incentive: "training_session".to_string(),
            conditions: "Free workshop for the account team".to_string(),
            timing: "+2_days".to_string(),
        },
        StrategyAction::Email {
            recipient: "executive_sponsor".to_string(),
            template: "executive_check_in".to_string(),
            tone: "personal".to_string(),
            timing: "+7_days".to_string(),
        },
    ];
    ("reengagement", actions, 5)
}

/// Renewal conversation for accounts approaching contract expiry.
fn renewal_playbook() -> (&'static str, Vec<StrategyAction>, u32) {
    let actions = vec![
        StrategyAction::Email {
            recipient: "executive_sponsor".to_string(),
            template: "renewal_intro".to_string(),
            tone: "warm".to_string(),
            timing: "immediate".to_string(),
        },
        StrategyAction::CalendarInvite {
            recipient: "executive_sponsor".to_string(),
            subject: "Contract Renewal Discussion".to_string(),
            timing: "+3_days".to_string(),
        },
    ];
    ("contract_renewal", actions, 14)
}

/// Generic outreach when no dedicated playbook applies (payment-history
/// dominant or no meaningful signal).
fn general_outreach_playbook() -> (&'static str, Vec<StrategyAction>, u32) {
    let actions = vec![StrategyAction::Email {
        recipient: "primary_contact".to_string(),
        template: "account_health_check".to_string(),
        tone: "friendly".to_string(),
        timing: "immediate".to_string(),
    }];
    ("general_outreach", actions, 7)
}
