use serde::Deserialize;

/// Signal weights applied by the risk scorer.
///
/// Must sum to 1.0 at configuration-load time; the process refuses to start
/// otherwise.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SignalWeights {
    pub overdue: f64,
    pub usage_drop: f64,
    pub contract_proximity: f64,
    pub payment_history: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            overdue: 0.40,
            usage_drop: 0.30,
            contract_proximity: 0.20,
            payment_history: 0.10,
        }
    }
}

impl SignalWeights {
    pub fn sum(&self) -> f64 {
        self.overdue + self.usage_drop + self.contract_proximity + self.payment_history
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Strategies whose estimated recovery exceeds this amount are routed
    /// to the human approval queue.
    pub approval_threshold_amount: f64,
    /// Score boundary for HIGH classification.
    pub high_risk_score_threshold: f64,
    /// Score boundary for MEDIUM classification.
    pub medium_risk_score_threshold: f64,
    pub signal_weights: SignalWeights,
    /// Fraction of annual value considered recoverable at full risk.
    /// Estimated recovery = annual_value * recovery_fraction * score.
    pub recovery_fraction: f64,
    /// Analyst hours credited per executed strategy.
    pub hours_saved_per_execution: f64,
    /// Outbound-action collaborator endpoint. When unset, dispatch is
    /// logged locally and reported as sent (development mode).
    pub outbound_webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            approval_threshold_amount: 10_000.0,
            high_risk_score_threshold: 0.70,
            medium_risk_score_threshold: 0.40,
            signal_weights: SignalWeights::default(),
            recovery_fraction: 0.20,
            hours_saved_per_execution: 2.0,
            outbound_webhook_url: None,
        }
    }
}

fn env_f64(name: &str, default: f64) -> anyhow::Result<f64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            approval_threshold_amount: env_f64(
                "APPROVAL_THRESHOLD_AMOUNT",
                defaults.approval_threshold_amount,
            )?,
            high_risk_score_threshold: env_f64(
                "HIGH_RISK_SCORE_THRESHOLD",
                defaults.high_risk_score_threshold,
            )?,
            medium_risk_score_threshold: env_f64(
                "MEDIUM_RISK_SCORE_THRESHOLD",
                defaults.medium_risk_score_threshold,
            )?,
            signal_weights: SignalWeights {
                overdue: env_f64("WEIGHT_OVERDUE", defaults.signal_weights.overdue)?,
                usage_drop: env_f64("WEIGHT_USAGE_DROP", defaults.signal_weights.usage_drop)?,
                contract_proximity: env_f64(
                    "WEIGHT_CONTRACT_PROXIMITY",
                    defaults.signal_weights.contract_proximity,
                )?,
                payment_history: env_f64(
                    "WEIGHT_PAYMENT_HISTORY",
                    defaults.signal_weights.payment_history,
                )?,
            },
            recovery_fraction: env_f64("RECOVERY_FRACTION", defaults.recovery_fraction)?,
            hours_saved_per_execution: env_f64(
                "HOURS_SAVED_PER_EXECUTION",
                defaults.hours_saved_per_execution,
            )?,
            outbound_webhook_url: std::env::var("OUTBOUND_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        config.validate()?;

        // Log successful configuration load (without repeating every value)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Approval threshold: {}, high/medium score thresholds: {}/{}",
            config.approval_threshold_amount,
            config.high_risk_score_threshold,
            config.medium_risk_score_threshold
        );
        if let Some(ref url) = config.outbound_webhook_url {
            tracing::info!("Outbound webhook configured: {}", url);
        } else {
            tracing::info!("No outbound webhook configured, dispatch will be logged locally");
        }

        Ok(config)
    }

    /// Fail-fast validation of thresholds and weights. Invalid configuration
    /// must never start serving.
    pub fn validate(&self) -> anyhow::Result<()> {
        let w = &self.signal_weights;
        if w.overdue < 0.0 || w.usage_drop < 0.0 || w.contract_proximity < 0.0
            || w.payment_history < 0.0
        {
            anyhow::bail!("signal weights must be non-negative");
        }
        if (w.sum() - 1.0).abs() > 1e-6 {
            anyhow::bail!("signal weights must sum to 1.0, got {}", w.sum());
        }
        if !(self.high_risk_score_threshold > 0.0 && self.high_risk_score_threshold <= 1.0) {
            anyhow::bail!(
                "HIGH_RISK_SCORE_THRESHOLD must be in (0, 1], got {}",
                self.high_risk_score_threshold
            );
        }
        if !(self.medium_risk_score_threshold > 0.0
            && self.medium_risk_score_threshold < self.high_risk_score_threshold)
        {
            anyhow::bail!(
                "MEDIUM_RISK_SCORE_THRESHOLD must be in (0, {}), got {}",
                self.high_risk_score_threshold,
                self.medium_risk_score_threshold
            );
        }
        if self.approval_threshold_amount < 0.0 {
            anyhow::bail!(
                "APPROVAL_THRESHOLD_AMOUNT must be non-negative, got {}",
                self.approval_threshold_amount
            );
        }
        if !(self.recovery_fraction > 0.0 && self.recovery_fraction <= 1.0) {
            anyhow::bail!(
                "RECOVERY_FRACTION must be in (0, 1], got {}",
                self.recovery_fraction
            );
        }
        if self.hours_saved_per_execution < 0.0 {
            anyhow::bail!("HOURS_SAVED_PER_EXECUTION must be non-negative");
        }
        Ok(())
    }
}
