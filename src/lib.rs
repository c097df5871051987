//! # Ledger Intake
//!
//! A library for deciding whether an uploaded financial table is safe to post
//! into an accounting ledger, and for propagating posted journal entries into
//! the ledger, trial balance and financial statements while keeping the
//! double-entry invariant across the whole batch.
//!
//! ## Core Concepts
//!
//! - **Semantic columns**: headers are mapped to meanings ("date", "amount",
//!   "reference") by keyword matching, see [`columns`]
//! - **Validation passes**: eight independent checks (structure, types,
//!   double entry, completeness, consistency, ranges, formats, duplicates)
//!   merged into one [`ValidationReport`] with a 0-100 quality score
//! - **Integration**: approved [`JournalEntryRecord`]s are fanned out to
//!   downstream targets; one failing entry never aborts the batch
//! - **Health checks**: a fixed matrix of assertions over a batch, e.g.
//!   "Double Entry Compliance"
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_intake::*;
//!
//! let table = Table::from_text_rows(
//!     &["Date", "Description", "Amount"],
//!     &[vec!["2024-04-01", "Office rent", "25,000"]],
//! )?;
//! let report = validate_table(&table);
//! assert!(report.is_valid);
//!
//! let mut orchestrator =
//!     IntegrationOrchestrator::new(InMemoryLedger::new(), IntegrationConfig::default());
//! let result = orchestrator.integrate(&entries, false);
//! let health = orchestrator.validate_integration_health(&entries);
//! ```

pub mod chart_of_accounts;
pub mod checks;
pub mod columns;
pub mod config;
pub mod error;
pub mod health;
pub mod integration;
pub mod ledger;
pub mod parsing;
pub mod reporting;
pub mod schema;
pub mod table;
pub mod validation;

pub use chart_of_accounts::{AccountCategory, AccountEntry, ChartOfAccounts};
pub use checks::{PassFindings, ValidationPass};
pub use columns::{resolve, resolve_all, resolve_index, ColumnResolver, SemanticField};
pub use config::{IntakeConfig, IntegrationConfig, ValidationConfig};
pub use error::{IntakeError, Result};
pub use health::{validate_integration_health, HealthCheck, HealthReport, HealthStatus};
pub use integration::{
    AuditLog, AuditRecord, EntryFailure, EntryOutcome, FinancialImpact, IntegrationOrchestrator,
    IntegrationResult, IntegrationSummary, IntegrationType,
};
pub use ledger::{AccountingEngine, EntryPayload, InMemoryLedger, Posting, ReportHooks};
pub use reporting::IntegrationReport;
pub use schema::{EntryLine, EntryStatus, JournalEntryRecord};
pub use table::{CellValue, Row, Table, TabularSource};
pub use validation::{
    quality_score, PassSummary, ValidationEngine, ValidationIssue, ValidationReport,
    ValidationSummary,
};

use log::debug;

/// Validates `source` with the default thresholds.
pub fn validate_table<S: TabularSource>(source: &S) -> ValidationReport {
    ValidationEngine::default().validate(source)
}

/// Validates `source` with the thresholds from `config`, rejecting an
/// inconsistent configuration before any pass runs.
pub fn validate_with_config<S: TabularSource>(
    source: &S,
    config: &IntakeConfig,
) -> Result<ValidationReport> {
    config.validate()?;
    debug!("Validating with configuration: {:?}", config.validation);
    Ok(ValidationEngine::new(config.validation.clone()).validate(source))
}

/// Builds an orchestrator over `hooks` after checking `config`.
pub fn orchestrator_with_config<H: ReportHooks>(
    hooks: H,
    config: &IntakeConfig,
) -> Result<IntegrationOrchestrator<H>> {
    config.validate()?;
    Ok(IntegrationOrchestrator::new(hooks, config.integration.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_uses_defaults() {
        let table = Table::from_text_rows(
            &["Date", "Description", "Amount"],
            &[vec!["2024-04-01", "Office rent", "25,000"]],
        )
        .unwrap();

        let report = validate_table(&table);
        assert!(report.is_valid);
        assert_eq!(report.score, 100);
        assert_eq!(report.column_names, vec!["Date", "Description", "Amount"]);
    }

    #[test]
    fn test_invalid_config_is_rejected_before_validation() {
        let table = Table::from_text_rows(&["Date"], &[vec!["2024-01-01"]]).unwrap();
        let mut config = IntakeConfig::default();
        config.validation.balance_tolerance = -1.0;

        assert!(matches!(
            validate_with_config(&table, &config),
            Err(IntakeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_orchestrator_with_config_applies_capacity() {
        let mut config = IntakeConfig::default();
        config.integration.audit_log_capacity = 5;

        let orchestrator = orchestrator_with_config(InMemoryLedger::new(), &config).unwrap();
        assert_eq!(orchestrator.audit_log().capacity(), 5);
    }
}
