use crate::config::IntegrationConfig;
use crate::error::IntakeError;
use crate::health::{self, HealthReport};
use crate::ledger::{AccountingEngine, EntryPayload, ReportHooks};
use crate::parsing::round_to_cents;
use crate::reporting::IntegrationReport;
use crate::schema::JournalEntryRecord;
use chrono::{DateTime, Utc};
use log::{info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Report surfaces refreshed by a financial-reports integration.
pub const UPDATED_REPORTS: [&str; 5] = [
    "General Ledger",
    "Trial Balance",
    "Profit & Loss",
    "Balance Sheet",
    "Cash Flow",
];

pub const ACCOUNTING_LEDGER: &str = "Accounting Ledger";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationType {
    FinancialReports,
    AutomatedAccounting,
    BankReconciliation,
    LedgerSystem,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialImpact {
    pub total_debits: f64,
    pub total_credits: f64,
    pub net_impact: f64,
    pub entry_count: usize,
}

impl FinancialImpact {
    pub fn from_entries(entries: &[JournalEntryRecord]) -> Self {
        let total_debits: f64 = entries.iter().map(|e| e.total_debit).sum();
        let total_credits: f64 = entries.iter().map(|e| e.total_credit).sum();
        Self {
            total_debits: round_to_cents(total_debits),
            total_credits: round_to_cents(total_credits),
            net_impact: round_to_cents(total_debits - total_credits),
            entry_count: entries.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntegrationSummary {
    pub total_entries: usize,
    pub successful_entries: usize,
    pub failed_entries: usize,
    pub reports_updated_count: usize,
    pub integration_timestamp: String,
    pub accounts_affected: usize,
    pub financial_impact: FinancialImpact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntegrationResult {
    pub success: bool,
    pub integration_type: IntegrationType,
    /// Number of entries attempted, including those that failed.
    pub entries_processed: usize,
    pub reports_updated: Vec<String>,
    pub errors: Vec<String>,
    pub integration_summary: IntegrationSummary,
    pub timestamp: DateTime<Utc>,
}

impl IntegrationResult {
    fn orchestration_failure(
        integration_type: IntegrationType,
        error: &IntakeError,
        entries: &[JournalEntryRecord],
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            success: false,
            integration_type,
            entries_processed: 0,
            reports_updated: Vec::new(),
            errors: vec![error.to_string()],
            integration_summary: IntegrationSummary {
                total_entries: entries.len(),
                successful_entries: 0,
                failed_entries: 0,
                reports_updated_count: 0,
                integration_timestamp: timestamp.to_rfc3339(),
                accounts_affected: 0,
                financial_impact: FinancialImpact::from_entries(entries),
            },
            timestamp,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub integration_type: IntegrationType,
    pub success: bool,
    pub entries_processed: usize,
    pub error_count: usize,
}

impl From<&IntegrationResult> for AuditRecord {
    fn from(result: &IntegrationResult) -> Self {
        Self {
            timestamp: result.timestamp,
            integration_type: result.integration_type,
            success: result.success,
            entries_processed: result.entries_processed,
            error_count: result.errors.len(),
        }
    }
}

/// Bounded audit trail; once full, the oldest record is dropped first.
#[derive(Debug, Clone)]
pub struct AuditLog {
    records: VecDeque<AuditRecord>,
    capacity: usize,
}

impl AuditLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: AuditRecord) {
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditRecord> {
        self.records.iter()
    }

    /// Up to `n` most recent records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<AuditRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryOutcome {
    pub entry_id: String,
}

#[derive(Debug)]
pub struct EntryFailure {
    pub entry_id: String,
    pub error: IntakeError,
}

impl EntryFailure {
    pub fn message(&self) -> String {
        format!("Entry {}: {}", self.entry_id, self.error)
    }
}

fn select_entries(
    entries: &[JournalEntryRecord],
    include_drafts: bool,
) -> Vec<&JournalEntryRecord> {
    entries
        .iter()
        .filter(|e| include_drafts || e.is_posted())
        .collect()
}

fn distinct_accounts(entries: &[&JournalEntryRecord]) -> usize {
    entries
        .iter()
        .flat_map(|e| e.account_codes())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Propagates approved journal entries into downstream targets and keeps an
/// audit trail of every call. Integration takes `&mut self`, so hook calls and
/// audit appends are serialized per instance.
pub struct IntegrationOrchestrator<H: ReportHooks> {
    hooks: H,
    config: IntegrationConfig,
    audit_log: AuditLog,
}

impl<H: ReportHooks> IntegrationOrchestrator<H> {
    pub fn new(hooks: H, config: IntegrationConfig) -> Self {
        let audit_log = AuditLog::with_capacity(config.audit_log_capacity);
        Self {
            hooks,
            config,
            audit_log,
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    pub fn recent_integrations(&self, n: usize) -> Vec<AuditRecord> {
        self.audit_log.recent(n)
    }

    fn apply_to_reports(
        &mut self,
        record: &JournalEntryRecord,
    ) -> Result<EntryOutcome, EntryFailure> {
        let applied = EntryPayload::from_record(record).and_then(|payload| {
            self.hooks.update_ledger_accounts(&payload)?;
            self.hooks.update_trial_balance(&payload)?;
            self.hooks.update_financial_statements(&payload)
        });

        match applied {
            Ok(()) => Ok(EntryOutcome {
                entry_id: record.entry_id.clone(),
            }),
            Err(error) => Err(EntryFailure {
                entry_id: record.entry_id.clone(),
                error,
            }),
        }
    }

    /// Pushes entries into the ledger, trial balance and financial statements.
    ///
    /// Only posted entries are selected unless `include_drafts` is set. A
    /// failing entry is recorded in `errors` and the batch continues. Only a
    /// failure of [`ReportHooks::prepare`] fails the call as a whole.
    pub fn integrate(
        &mut self,
        entries: &[JournalEntryRecord],
        include_drafts: bool,
    ) -> IntegrationResult {
        let timestamp = Utc::now();
        let integration_type = IntegrationType::FinancialReports;

        info!(
            "Integrating {} journal entries into financial reports (include_drafts = {})",
            entries.len(),
            include_drafts
        );

        if let Err(e) = self.hooks.prepare() {
            let error = IntakeError::OrchestrationFailure(e.to_string());
            warn!("{}", error);
            let result =
                IntegrationResult::orchestration_failure(integration_type, &error, entries, timestamp);
            self.audit_log.push(AuditRecord::from(&result));
            return result;
        }

        let selected = select_entries(entries, include_drafts);
        let outcomes: Vec<_> = selected
            .iter()
            .map(|record| self.apply_to_reports(record))
            .collect();

        let result = self.finish(
            integration_type,
            entries,
            &selected,
            outcomes,
            UPDATED_REPORTS.iter().map(|s| s.to_string()).collect(),
            timestamp,
        );
        self.audit_log.push(AuditRecord::from(&result));
        result
    }

    /// Same catch-and-continue contract as [`integrate`](Self::integrate), but
    /// posts the posted entries into a single accounting ledger.
    pub fn integrate_with_accounting_engine<E: AccountingEngine>(
        &mut self,
        entries: &[JournalEntryRecord],
        engine: &mut E,
    ) -> IntegrationResult {
        let timestamp = Utc::now();
        info!(
            "Posting {} journal entries to the accounting engine",
            entries.len()
        );

        let selected = select_entries(entries, false);
        let outcomes: Vec<_> = selected
            .iter()
            .map(|record| {
                EntryPayload::from_record(record)
                    .and_then(|payload| engine.post_entry(&payload))
                    .map(|()| EntryOutcome {
                        entry_id: record.entry_id.clone(),
                    })
                    .map_err(|error| EntryFailure {
                        entry_id: record.entry_id.clone(),
                        error,
                    })
            })
            .collect();

        let result = self.finish(
            IntegrationType::AutomatedAccounting,
            entries,
            &selected,
            outcomes,
            vec![ACCOUNTING_LEDGER.to_string()],
            timestamp,
        );
        self.audit_log.push(AuditRecord::from(&result));
        result
    }

    fn finish(
        &self,
        integration_type: IntegrationType,
        entries: &[JournalEntryRecord],
        selected: &[&JournalEntryRecord],
        outcomes: Vec<Result<EntryOutcome, EntryFailure>>,
        targets: Vec<String>,
        timestamp: DateTime<Utc>,
    ) -> IntegrationResult {
        let mut succeeded = 0;
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(_) => succeeded += 1,
                Err(failure) => {
                    warn!("{}", failure.message());
                    errors.push(failure.message());
                }
            }
        }

        let reports_updated = if succeeded > 0 { targets } else { Vec::new() };

        let result = IntegrationResult {
            success: selected.is_empty() || succeeded > 0,
            integration_type,
            entries_processed: selected.len(),
            integration_summary: IntegrationSummary {
                total_entries: entries.len(),
                successful_entries: succeeded,
                failed_entries: errors.len(),
                reports_updated_count: reports_updated.len(),
                integration_timestamp: timestamp.to_rfc3339(),
                accounts_affected: distinct_accounts(selected),
                financial_impact: FinancialImpact::from_entries(entries),
            },
            reports_updated,
            errors,
            timestamp,
        };

        info!(
            "Integration finished: {} of {} entries applied, {} failed",
            succeeded,
            result.entries_processed,
            result.errors.len()
        );
        result
    }

    /// Runs the fixed health-check matrix over a batch.
    pub fn validate_integration_health(&self, entries: &[JournalEntryRecord]) -> HealthReport {
        health::validate_integration_health(entries, self.config.balance_tolerance)
    }

    pub fn generate_integration_report(&self, entries: &[JournalEntryRecord]) -> IntegrationReport {
        IntegrationReport::build(
            entries,
            self.validate_integration_health(entries),
            self.recent_integrations(self.config.recent_activity_limit),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::ledger::InMemoryLedger;
    use crate::schema::{EntryLine, EntryStatus};
    use chrono::NaiveDate;

    fn entry(id: &str, amount: f64, status: EntryStatus) -> JournalEntryRecord {
        JournalEntryRecord {
            entry_id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            reference: format!("V-{}", id),
            description: "Purchase".to_string(),
            debit_lines: vec![EntryLine::new("5000", amount)],
            credit_lines: vec![EntryLine::new("1000", amount)],
            total_debit: amount,
            total_credit: amount,
            status,
        }
    }

    struct FailingPrepare;

    impl ReportHooks for FailingPrepare {
        fn prepare(&mut self) -> Result<()> {
            Err(IntakeError::TargetFailure {
                target: "General Ledger".to_string(),
                details: "store unavailable".to_string(),
            })
        }
        fn update_ledger_accounts(&mut self, _: &EntryPayload) -> Result<()> {
            Ok(())
        }
        fn update_trial_balance(&mut self, _: &EntryPayload) -> Result<()> {
            Ok(())
        }
        fn update_financial_statements(&mut self, _: &EntryPayload) -> Result<()> {
            Ok(())
        }
    }

    fn record(success: bool) -> AuditRecord {
        AuditRecord {
            timestamp: Utc::now(),
            integration_type: IntegrationType::FinancialReports,
            success,
            entries_processed: 1,
            error_count: 0,
        }
    }

    #[test]
    fn test_audit_log_drops_oldest_first() {
        let mut log = AuditLog::with_capacity(3);
        log.push(record(false));
        for _ in 0..3 {
            log.push(record(true));
        }

        assert_eq!(log.len(), 3);
        assert!(log.iter().all(|r| r.success));
        assert_eq!(log.recent(2).len(), 2);
        assert_eq!(log.recent(10).len(), 3);
    }

    #[test]
    fn test_drafts_are_skipped_by_default() {
        let mut orchestrator =
            IntegrationOrchestrator::new(InMemoryLedger::new(), IntegrationConfig::default());
        let entries = vec![
            entry("JE-1", 100.0, EntryStatus::Posted),
            entry("JE-2", 50.0, EntryStatus::Draft),
        ];

        let result = orchestrator.integrate(&entries, false);
        assert!(result.success);
        assert_eq!(result.entries_processed, 1);
        assert_eq!(result.integration_summary.total_entries, 2);
        assert_eq!(result.integration_summary.financial_impact.total_debits, 150.0);
        assert_eq!(result.reports_updated.len(), 5);
        assert_eq!(orchestrator.hooks().applied_entries(), 1);

        let result = orchestrator.integrate(&entries, true);
        assert_eq!(result.entries_processed, 2);
        assert_eq!(orchestrator.hooks().applied_entries(), 2);
        assert_eq!(orchestrator.audit_log().len(), 2);
    }

    #[test]
    fn test_prepare_failure_fails_whole_call() {
        let mut orchestrator =
            IntegrationOrchestrator::new(FailingPrepare, IntegrationConfig::default());
        let result = orchestrator.integrate(&[entry("JE-1", 10.0, EntryStatus::Posted)], false);

        assert!(!result.success);
        assert_eq!(result.entries_processed, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("store unavailable"));
        assert!(result.reports_updated.is_empty());
        assert_eq!(orchestrator.audit_log().len(), 1);
    }

    #[test]
    fn test_empty_batch_succeeds_without_updating_reports() {
        let mut orchestrator =
            IntegrationOrchestrator::new(InMemoryLedger::new(), IntegrationConfig::default());
        let result = orchestrator.integrate(&[], false);

        assert!(result.success);
        assert_eq!(result.entries_processed, 0);
        assert!(result.reports_updated.is_empty());
        assert_eq!(result.integration_summary.financial_impact.entry_count, 0);
    }

    #[test]
    fn test_accounting_engine_posts_only_posted_entries() {
        let mut orchestrator =
            IntegrationOrchestrator::new(InMemoryLedger::new(), IntegrationConfig::default());
        let mut engine = InMemoryLedger::new();
        let entries = vec![
            entry("JE-1", 100.0, EntryStatus::Posted),
            entry("JE-2", 40.0, EntryStatus::Draft),
        ];

        let result = orchestrator.integrate_with_accounting_engine(&entries, &mut engine);
        assert!(result.success);
        assert_eq!(result.integration_type, IntegrationType::AutomatedAccounting);
        assert_eq!(result.reports_updated, vec![ACCOUNTING_LEDGER.to_string()]);
        assert_eq!(engine.account_balance("5000"), 100.0);
        assert_eq!(orchestrator.hooks().applied_entries(), 0);
    }
}
