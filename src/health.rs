use crate::error::{IntakeError, Result};
use crate::parsing::round_to_cents;
use crate::schema::JournalEntryRecord;
use chrono::{DateTime, Utc};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const DOUBLE_ENTRY_COMPLIANCE: &str = "Double Entry Compliance";
pub const LEDGER_CONSISTENCY: &str = "Ledger Consistency";
pub const TRIAL_BALANCE_IMPACT: &str = "Trial Balance Impact";
pub const STATEMENT_INTEGRATION: &str = "Financial Statement Integration";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    IssuesFound,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: BTreeMap<String, Value>,
}

impl HealthCheck {
    fn new(name: &str, passed: bool, message: String, details: Value) -> Self {
        let details = match details {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Self {
            name: name.to_string(),
            passed,
            message,
            details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthReport {
    pub overall_health: HealthStatus,
    pub validations: Vec<HealthCheck>,
    pub checked_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl HealthReport {
    pub fn check(&self, name: &str) -> Option<&HealthCheck> {
        self.validations.iter().find(|c| c.name == name)
    }

    pub fn failing_checks(&self) -> usize {
        self.validations.iter().filter(|c| !c.passed).count()
    }
}

/// Runs the four fixed checks over a batch. Any failing check yields
/// `IssuesFound`; a batch that cannot be evaluated yields `Error`.
pub fn validate_integration_health(entries: &[JournalEntryRecord], tolerance: f64) -> HealthReport {
    let checked_at = Utc::now();

    match run_checks(entries, tolerance) {
        Ok(validations) => {
            let overall_health = if validations.iter().all(|c| c.passed) {
                HealthStatus::Healthy
            } else {
                HealthStatus::IssuesFound
            };
            HealthReport {
                overall_health,
                validations,
                checked_at,
                error: None,
            }
        }
        Err(e) => {
            warn!("Integration health check failed: {}", e);
            HealthReport {
                overall_health: HealthStatus::Error,
                validations: Vec::new(),
                checked_at,
                error: Some(e.to_string()),
            }
        }
    }
}

fn run_checks(entries: &[JournalEntryRecord], tolerance: f64) -> Result<Vec<HealthCheck>> {
    for entry in entries {
        let amounts_finite = entry.total_debit.is_finite()
            && entry.total_credit.is_finite()
            && entry
                .debit_lines
                .iter()
                .chain(entry.credit_lines.iter())
                .all(|l| l.amount.is_finite());
        if !amounts_finite {
            return Err(IntakeError::HealthCheckFailure(format!(
                "entry {} has non-finite amounts",
                entry.entry_id
            )));
        }
    }

    Ok(vec![
        double_entry_compliance(entries, tolerance),
        ledger_consistency(entries, tolerance),
        trial_balance_impact(entries, tolerance),
        statement_integration(entries),
    ])
}

fn double_entry_compliance(entries: &[JournalEntryRecord], tolerance: f64) -> HealthCheck {
    let total_debits: f64 = entries.iter().map(|e| e.total_debit).sum();
    let total_credits: f64 = entries.iter().map(|e| e.total_credit).sum();
    let difference = (total_debits - total_credits).abs();
    let passed = difference <= tolerance;

    let message = if passed {
        format!(
            "Total debits equal total credits across {} entries",
            entries.len()
        )
    } else {
        format!(
            "Total debits ({:.2}) and credits ({:.2}) differ by {:.2}",
            total_debits, total_credits, difference
        )
    };

    HealthCheck::new(
        DOUBLE_ENTRY_COMPLIANCE,
        passed,
        message,
        json!({
            "total_debits": round_to_cents(total_debits),
            "total_credits": round_to_cents(total_credits),
            "difference": round_to_cents(difference),
            "entry_count": entries.len(),
        }),
    )
}

fn ledger_consistency(entries: &[JournalEntryRecord], tolerance: f64) -> HealthCheck {
    let mismatched: Vec<&str> = entries
        .iter()
        .filter(|e| {
            (e.line_debit_total() - e.total_debit).abs() > tolerance
                || (e.line_credit_total() - e.total_credit).abs() > tolerance
        })
        .map(|e| e.entry_id.as_str())
        .collect();

    let passed = mismatched.is_empty();
    let message = if passed {
        "Line amounts agree with entry totals".to_string()
    } else {
        format!(
            "{} entries have line amounts that disagree with their totals",
            mismatched.len()
        )
    };

    HealthCheck::new(
        LEDGER_CONSISTENCY,
        passed,
        message,
        json!({
            "entries_checked": entries.len(),
            "mismatched_entries": mismatched,
        }),
    )
}

fn trial_balance_impact(entries: &[JournalEntryRecord], tolerance: f64) -> HealthCheck {
    let mut movements: BTreeMap<&str, f64> = BTreeMap::new();
    for entry in entries {
        for line in &entry.debit_lines {
            *movements.entry(line.account_code.as_str()).or_default() += line.amount;
        }
        for line in &entry.credit_lines {
            *movements.entry(line.account_code.as_str()).or_default() -= line.amount;
        }
    }

    let net: f64 = movements.values().sum();
    let passed = net.abs() <= tolerance;
    let message = if passed {
        format!(
            "Trial balance stays balanced across {} accounts",
            movements.len()
        )
    } else {
        format!("Trial balance would be out by {:.2}", net)
    };

    HealthCheck::new(
        TRIAL_BALANCE_IMPACT,
        passed,
        message,
        json!({
            "accounts_affected": movements.len(),
            "net_movement": round_to_cents(net),
        }),
    )
}

fn statement_integration(entries: &[JournalEntryRecord]) -> HealthCheck {
    let posted: Vec<&JournalEntryRecord> = entries.iter().filter(|e| e.is_posted()).collect();
    let incomplete: Vec<&str> = posted
        .iter()
        .filter(|e| e.debit_lines.is_empty() || e.credit_lines.is_empty())
        .map(|e| e.entry_id.as_str())
        .collect();

    let passed = incomplete.is_empty();
    let message = if passed {
        format!("{} posted entries are ready for statements", posted.len())
    } else {
        format!(
            "{} posted entries lack a debit or credit side",
            incomplete.len()
        )
    };

    HealthCheck::new(
        STATEMENT_INTEGRATION,
        passed,
        message,
        json!({
            "posted_entries": posted.len(),
            "incomplete_entries": incomplete,
        }),
    )
}
