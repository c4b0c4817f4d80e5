//! Account validation with partial-failure semantics.
//!
//! A batch of N raw records yields up to N validated accounts plus a list of
//! (index, reason) failures. One malformed record never aborts its siblings.

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{Account, ValidationFailure};

/// Extracts a required, non-empty string field.
fn required_string(record: &Value, field: &str) -> Result<String, String> {
    match record.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(format!("'{}' must be non-empty", field)),
        Some(_) => Err(format!("'{}' must be a string", field)),
        None => Err(format!("'{}' is required", field)),
    }
}

/// Extracts an optional numeric field, defaulting to zero when absent or null.
fn numeric_or_zero(record: &Value, field: &str) -> Result<f64, String> {
    match record.get(field) {
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("'{}' is not a finite number", field)),
        Some(Value::Null) | None => Ok(0.0),
        Some(_) => Err(format!("'{}' must be a number", field)),
    }
}

/// Validates a single raw record into an [`Account`].
///
/// Rules: `id` and `name` required and non-empty; `annual_value` non-negative
/// (missing means zero, "no signal"); `contract_end`, when present, must be a
/// `YYYY-MM-DD` calendar date; missing signal inputs default to zero. Extra
/// fields supplied by the account source are tolerated and ignored.
pub fn validate_account(record: &Value) -> Result<Account, String> {
    if !record.is_object() {
        return Err("record must be an object".to_string());
    }

    let id = required_string(record, "id")?;
    let name = required_string(record, "name")?;

    let annual_value = numeric_or_zero(record, "annual_value")?;
    if annual_value < 0.0 {
        return Err(format!("'annual_value' must be non-negative, got {}", annual_value));
    }

    let contract_end = match record.get("contract_end") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| format!("'contract_end' is not a valid YYYY-MM-DD date: '{}'", s))?,
        ),
        Some(Value::Null) | None => None,
        Some(Value::String(_)) => None,
        Some(_) => return Err("'contract_end' must be a date string".to_string()),
    };

    let days_overdue = numeric_or_zero(record, "days_overdue")?;
    if days_overdue < 0.0 {
        return Err("'days_overdue' must be non-negative".to_string());
    }

    let usage_drop_pct = numeric_or_zero(record, "usage_drop_pct")?;
    if usage_drop_pct < 0.0 {
        return Err("'usage_drop_pct' must be non-negative".to_string());
    }

    let late_payment_count = numeric_or_zero(record, "late_payment_count")?;
    if late_payment_count < 0.0 || late_payment_count.fract() != 0.0 {
        return Err("'late_payment_count' must be a non-negative integer".to_string());
    }

    Ok(Account {
        id,
        name,
        contract_end,
        annual_value,
        days_overdue,
        usage_drop_pct,
        late_payment_count: late_payment_count as u32,
    })
}

/// Validates a whole batch, collecting failures instead of aborting.
pub fn validate_batch(records: &[Value]) -> (Vec<Account>, Vec<ValidationFailure>) {
    let mut accounts = Vec::with_capacity(records.len());
    let mut failures = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match validate_account(record) {
            Ok(account) => accounts.push(account),
            Err(reason) => {
                tracing::warn!("Record {} rejected: {}", index, reason);
                failures.push(ValidationFailure { index, reason });
            }
        }
    }

    (accounts, failures)
}
