use crate::error::{IntakeError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds used by the validation passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ValidationConfig {
    /// Largest tolerated gap between debit and credit column totals.
    pub balance_tolerance: f64,
    /// Points removed from the quality score for every error.
    pub error_penalty: u32,
    /// Date spans longer than this many days are reported.
    pub max_date_span_days: i64,
    /// Absolute amounts above this are considered implausibly large.
    pub large_amount_threshold: f64,
    /// Positive amounts below this are considered implausibly small.
    pub small_amount_threshold: f64,
    /// Date used as "today" by the future-date check. Defaults to the local date.
    pub reference_date: Option<NaiveDate>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: 0.01,
            error_penalty: 10,
            max_date_span_days: 365,
            large_amount_threshold: 1e9,
            small_amount_threshold: 0.01,
            reference_date: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct IntegrationConfig {
    pub balance_tolerance: f64,
    /// Number of audit records kept; older records are dropped first.
    pub audit_log_capacity: usize,
    /// How many audit records the comprehensive report repeats.
    pub recent_activity_limit: usize,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: 0.01,
            audit_log_capacity: 100,
            recent_activity_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct IntakeConfig {
    pub validation: ValidationConfig,
    pub integration: IntegrationConfig,
}

impl IntakeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IntakeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        let v = &self.validation;
        if !(v.balance_tolerance >= 0.0) {
            return Err(IntakeError::InvalidConfig(format!(
                "validation.balance_tolerance must be non-negative, got {}",
                v.balance_tolerance
            )));
        }
        if v.max_date_span_days < 0 {
            return Err(IntakeError::InvalidConfig(format!(
                "validation.max_date_span_days must be non-negative, got {}",
                v.max_date_span_days
            )));
        }
        if v.small_amount_threshold >= v.large_amount_threshold {
            return Err(IntakeError::InvalidConfig(format!(
                "validation.small_amount_threshold ({}) must be below large_amount_threshold ({})",
                v.small_amount_threshold, v.large_amount_threshold
            )));
        }

        let i = &self.integration;
        if !(i.balance_tolerance >= 0.0) {
            return Err(IntakeError::InvalidConfig(format!(
                "integration.balance_tolerance must be non-negative, got {}",
                i.balance_tolerance
            )));
        }
        if i.audit_log_capacity == 0 {
            return Err(IntakeError::InvalidConfig(
                "integration.audit_log_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
