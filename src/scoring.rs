//! Deterministic multi-signal risk scoring.
//!
//! Pure computation: the same account and reference date always produce the
//! same assessment, and nothing here blocks or mutates shared state.

use chrono::NaiveDate;

use crate::config::{Config, SignalWeights};
use crate::models::{Account, RiskAssessment, RiskLevel, SignalBreakdown};

/// Days-overdue count at which the overdue signal saturates.
const OVERDUE_SATURATION_DAYS: f64 = 100.0;
/// Usage-drop percentage at which the usage signal saturates.
const USAGE_DROP_SATURATION_PCT: f64 = 100.0;
/// Share of the payment-history signal contributed by each late payment.
/// Calibrated so one late payment yields 0.025 at the default 0.10 weight.
const LATE_PAYMENT_STEP: f64 = 0.25;
/// Optimistic prior for the recovery-probability estimate.
const RECOVERY_PROBABILITY_PRIOR: f64 = 0.65;
/// Scores above this require immediate human escalation regardless of
/// approval routing. Kept above the HIGH classification boundary so merely
/// high-risk accounts do not over-escalate.
const ESCALATION_SCORE_THRESHOLD: f64 = 0.85;

/// Proximity band factors applied to the contract-proximity weight.
/// An already-expired contract counts as the nearest band.
fn proximity_factor(days_until_end: i64) -> f64 {
    if days_until_end <= 30 {
        1.0
    } else if days_until_end <= 90 {
        0.6
    } else if days_until_end <= 180 {
        0.3
    } else {
        0.0
    }
}

/// Likelihood of a successful recovery: an optimistic prior worn down by
/// how deep the overdue, usage and payment signals run. Clamped to [0, 1]
/// and rounded to four decimals.
pub fn recovery_probability(account: &Account) -> f64 {
    let mut prob = RECOVERY_PROBABILITY_PRIOR;

    if account.days_overdue > 60.0 {
        prob -= 0.20;
    } else if account.days_overdue > 30.0 {
        prob -= 0.10;
    }

    if account.usage_drop_pct > 50.0 {
        prob -= 0.15;
    } else if account.usage_drop_pct > 25.0 {
        prob -= 0.07;
    }

    prob -= f64::from(account.late_payment_count) * 0.02;

    (prob.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0
}

/// Computes risk scores from weighted account signals.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    weights: SignalWeights,
    high_threshold: f64,
    medium_threshold: f64,
}

impl RiskScorer {
    pub fn new(config: &Config) -> Self {
        Self {
            weights: config.signal_weights,
            high_threshold: config.high_risk_score_threshold,
            medium_threshold: config.medium_risk_score_threshold,
        }
    }

    /// Scores one account against a reference date.
    ///
    /// The per-signal contributions are retained on the assessment and sum
    /// to the score exactly (the clamp only guards against float drift, as
    /// the weights themselves sum to 1.0).
    pub fn score(&self, account: &Account, today: NaiveDate) -> RiskAssessment {
        let breakdown = SignalBreakdown {
            overdue: (account.days_overdue / OVERDUE_SATURATION_DAYS).min(1.0)
                * self.weights.overdue,
            usage_drop: (account.usage_drop_pct / USAGE_DROP_SATURATION_PCT).min(1.0)
                * self.weights.usage_drop,
            contract_proximity: account
                .contract_end
                .map(|end| {
                    proximity_factor((end - today).num_days()) * self.weights.contract_proximity
                })
                .unwrap_or(0.0),
            payment_history: (f64::from(account.late_payment_count) * LATE_PAYMENT_STEP)
                .min(1.0)
                * self.weights.payment_history,
        };

        let score = breakdown.sum().clamp(0.0, 1.0);

        RiskAssessment {
            account_id: account.id.clone(),
            account_name: account.name.clone(),
            annual_value: account.annual_value,
            score,
            level: self.classify(score),
            signal_breakdown: breakdown,
            recovery_probability: recovery_probability(account),
            escalation_required: score > ESCALATION_SCORE_THRESHOLD,
        }
    }

    /// Classification is a pure function of the score.
    pub fn classify(&self, score: f64) -> RiskLevel {
        if score >= self.high_threshold {
            RiskLevel::High
        } else if score >= self.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}
