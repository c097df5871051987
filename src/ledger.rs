//! Downstream targets that posted entries are propagated into.
//!
//! The orchestrator only depends on the [`ReportHooks`] and
//! [`AccountingEngine`] traits. [`InMemoryLedger`] is the reference target:
//! a general ledger, a trial balance and statement movement buckets, each of
//! which applies a given entry at most once.

use crate::chart_of_accounts::{is_cash_account, AccountCategory, ChartOfAccounts};
use crate::error::{IntakeError, Result};
use crate::schema::JournalEntryRecord;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub account_code: String,
    pub debit: f64,
    pub credit: f64,
}

/// Normalized form of a journal entry, as handed to every downstream target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPayload {
    pub entry_id: String,
    pub date: NaiveDate,
    pub reference: String,
    pub description: String,
    pub postings: Vec<Posting>,
    pub total_debit: f64,
    pub total_credit: f64,
}

impl EntryPayload {
    pub fn from_record(record: &JournalEntryRecord) -> Result<Self> {
        let entry_id = record.entry_id.trim().to_string();
        let invalid = |details: String| IntakeError::InvalidEntry {
            entry_id: if entry_id.is_empty() {
                "<unnamed>".to_string()
            } else {
                entry_id.clone()
            },
            details,
        };

        if entry_id.is_empty() {
            return Err(invalid("entry id is empty".to_string()));
        }
        if record.debit_lines.is_empty() && record.credit_lines.is_empty() {
            return Err(invalid("entry has no debit or credit lines".to_string()));
        }

        let mut postings = Vec::with_capacity(record.debit_lines.len() + record.credit_lines.len());
        for (line, is_debit) in record
            .debit_lines
            .iter()
            .map(|l| (l, true))
            .chain(record.credit_lines.iter().map(|l| (l, false)))
        {
            let code = line.account_code.trim();
            if code.is_empty() {
                return Err(invalid("line has an empty account code".to_string()));
            }
            if !line.amount.is_finite() || line.amount < 0.0 {
                return Err(invalid(format!(
                    "line for account {} has invalid amount {}",
                    code, line.amount
                )));
            }
            postings.push(Posting {
                account_code: code.to_string(),
                debit: if is_debit { line.amount } else { 0.0 },
                credit: if is_debit { 0.0 } else { line.amount },
            });
        }

        Ok(Self {
            entry_id,
            date: record.date,
            reference: record.reference.trim().to_string(),
            description: record.description.trim().to_string(),
            postings,
            total_debit: record.total_debit,
            total_credit: record.total_credit,
        })
    }

    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.postings.iter().map(|p| p.account_code.as_str())
    }
}

/// Report surfaces updated for every integrated entry.
pub trait ReportHooks {
    /// Called once per batch before any entry is applied. A failure here
    /// aborts the whole batch.
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn update_ledger_accounts(&mut self, payload: &EntryPayload) -> Result<()>;

    fn update_trial_balance(&mut self, payload: &EntryPayload) -> Result<()>;

    fn update_financial_statements(&mut self, payload: &EntryPayload) -> Result<()>;
}

/// A single downstream accounting ledger.
pub trait AccountingEngine {
    fn post_entry(&mut self, payload: &EntryPayload) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerMovement {
    pub entry_id: String,
    pub date: NaiveDate,
    pub debit: f64,
    pub credit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub movements: Vec<LedgerMovement>,
    /// Debit-positive running balance.
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceLine {
    pub debit: f64,
    pub credit: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTotals {
    pub revenue: f64,
    pub expenses: f64,
    pub assets: f64,
    pub liabilities: f64,
    pub equity: f64,
    pub net_cash_flow: f64,
}

impl StatementTotals {
    pub fn net_income(&self) -> f64 {
        self.revenue - self.expenses
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    chart: Option<ChartOfAccounts>,
    general_ledger: BTreeMap<String, LedgerAccount>,
    trial_balance: BTreeMap<String, TrialBalanceLine>,
    statements: StatementTotals,
    ledger_applied: HashSet<String>,
    trial_balance_applied: HashSet<String>,
    statements_applied: HashSet<String>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects postings to accounts missing from `chart`.
    pub fn with_chart(chart: ChartOfAccounts) -> Self {
        Self {
            chart: Some(chart),
            ..Self::default()
        }
    }

    pub fn general_ledger(&self) -> &BTreeMap<String, LedgerAccount> {
        &self.general_ledger
    }

    pub fn account_balance(&self, code: &str) -> f64 {
        self.general_ledger
            .get(code)
            .map(|a| a.balance)
            .unwrap_or(0.0)
    }

    pub fn trial_balance(&self) -> &BTreeMap<String, TrialBalanceLine> {
        &self.trial_balance
    }

    pub fn trial_balance_totals(&self) -> (f64, f64) {
        self.trial_balance
            .values()
            .fold((0.0, 0.0), |(d, c), line| (d + line.debit, c + line.credit))
    }

    pub fn is_trial_balance_balanced(&self, tolerance: f64) -> bool {
        let (debits, credits) = self.trial_balance_totals();
        (debits - credits).abs() <= tolerance
    }

    pub fn statements(&self) -> &StatementTotals {
        &self.statements
    }

    pub fn applied_entries(&self) -> usize {
        self.ledger_applied.len()
    }

    fn check_accounts(&self, target: &str, payload: &EntryPayload) -> Result<()> {
        if let Some(chart) = &self.chart {
            if let Some(unknown) = payload.accounts().find(|code| !chart.contains(code)) {
                return Err(IntakeError::TargetFailure {
                    target: target.to_string(),
                    details: format!(
                        "entry {} posts to unknown account {}",
                        payload.entry_id, unknown
                    ),
                });
            }
        }
        Ok(())
    }

    fn category_of(&self, code: &str) -> AccountCategory {
        self.chart
            .as_ref()
            .and_then(|chart| chart.get(code))
            .map(|account| account.category)
            .unwrap_or_else(|| AccountCategory::from_code(code))
    }

    fn post_to_general_ledger(&mut self, payload: &EntryPayload) -> Result<()> {
        self.check_accounts("General Ledger", payload)?;
        if !self.ledger_applied.insert(payload.entry_id.clone()) {
            debug!("Entry {} already in general ledger", payload.entry_id);
            return Ok(());
        }

        for posting in &payload.postings {
            let account = self
                .general_ledger
                .entry(posting.account_code.clone())
                .or_default();
            account.balance += posting.debit - posting.credit;
            account.movements.push(LedgerMovement {
                entry_id: payload.entry_id.clone(),
                date: payload.date,
                debit: posting.debit,
                credit: posting.credit,
            });
        }
        Ok(())
    }
}

impl ReportHooks for InMemoryLedger {
    fn update_ledger_accounts(&mut self, payload: &EntryPayload) -> Result<()> {
        self.post_to_general_ledger(payload)
    }

    fn update_trial_balance(&mut self, payload: &EntryPayload) -> Result<()> {
        self.check_accounts("Trial Balance", payload)?;
        if !self.trial_balance_applied.insert(payload.entry_id.clone()) {
            return Ok(());
        }

        for posting in &payload.postings {
            let line = self
                .trial_balance
                .entry(posting.account_code.clone())
                .or_default();
            line.debit += posting.debit;
            line.credit += posting.credit;
        }
        Ok(())
    }

    fn update_financial_statements(&mut self, payload: &EntryPayload) -> Result<()> {
        self.check_accounts("Financial Statements", payload)?;
        if !self.statements_applied.insert(payload.entry_id.clone()) {
            return Ok(());
        }

        for posting in &payload.postings {
            let net_debit = posting.debit - posting.credit;
            match self.category_of(&posting.account_code) {
                AccountCategory::Asset => self.statements.assets += net_debit,
                AccountCategory::Liability => self.statements.liabilities -= net_debit,
                AccountCategory::Equity => self.statements.equity -= net_debit,
                AccountCategory::Revenue => self.statements.revenue -= net_debit,
                AccountCategory::Expense => self.statements.expenses += net_debit,
            }
            if is_cash_account(&posting.account_code) {
                self.statements.net_cash_flow += net_debit;
            }
        }
        Ok(())
    }
}

impl AccountingEngine for InMemoryLedger {
    fn post_entry(&mut self, payload: &EntryPayload) -> Result<()> {
        self.post_to_general_ledger(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntryLine, EntryStatus};

    fn record(id: &str, debit: (&str, f64), credit: (&str, f64)) -> JournalEntryRecord {
        JournalEntryRecord {
            entry_id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            reference: format!("REF-{}", id),
            description: "Cash sale".to_string(),
            debit_lines: vec![EntryLine::new(debit.0, debit.1)],
            credit_lines: vec![EntryLine::new(credit.0, credit.1)],
            total_debit: debit.1,
            total_credit: credit.1,
            status: EntryStatus::Posted,
        }
    }

    fn apply_all(ledger: &mut InMemoryLedger, payload: &EntryPayload) {
        ledger.update_ledger_accounts(payload).unwrap();
        ledger.update_trial_balance(payload).unwrap();
        ledger.update_financial_statements(payload).unwrap();
    }

    #[test]
    fn test_payload_rejects_invalid_lines() {
        let mut bad = record("JE-1", ("1000", 100.0), ("4000", 100.0));
        bad.credit_lines[0].amount = f64::NAN;
        assert!(matches!(
            EntryPayload::from_record(&bad),
            Err(IntakeError::InvalidEntry { .. })
        ));

        let mut unnamed = record("  ", ("1000", 100.0), ("4000", 100.0));
        unnamed.debit_lines.clear();
        let err = EntryPayload::from_record(&unnamed).unwrap_err();
        assert!(err.to_string().contains("<unnamed>"));
    }

    #[test]
    fn test_payload_splits_sides() {
        let payload =
            EntryPayload::from_record(&record("JE-1", ("1000", 250.0), ("4000", 250.0))).unwrap();
        assert_eq!(payload.postings.len(), 2);
        assert_eq!(payload.postings[0].debit, 250.0);
        assert_eq!(payload.postings[1].credit, 250.0);
    }

    #[test]
    fn test_entries_apply_at_most_once() {
        let mut ledger = InMemoryLedger::new();
        let payload =
            EntryPayload::from_record(&record("JE-1", ("1000", 500.0), ("4000", 500.0))).unwrap();

        apply_all(&mut ledger, &payload);
        apply_all(&mut ledger, &payload);

        assert_eq!(ledger.applied_entries(), 1);
        assert_eq!(ledger.account_balance("1000"), 500.0);
        assert_eq!(ledger.account_balance("4000"), -500.0);
        assert_eq!(ledger.trial_balance_totals(), (500.0, 500.0));
        assert!(ledger.is_trial_balance_balanced(0.01));

        let statements = ledger.statements();
        assert_eq!(statements.revenue, 500.0);
        assert_eq!(statements.assets, 500.0);
        assert_eq!(statements.net_cash_flow, 500.0);
        assert_eq!(statements.net_income(), 500.0);
    }

    #[test]
    fn test_unknown_account_fails_target() {
        let chart = ChartOfAccounts::new().with_account("1000", "Cash");
        let mut ledger = InMemoryLedger::with_chart(chart);
        let payload =
            EntryPayload::from_record(&record("JE-9", ("1000", 10.0), ("4999", 10.0))).unwrap();

        let err = ledger.update_ledger_accounts(&payload).unwrap_err();
        assert!(matches!(err, IntakeError::TargetFailure { .. }));
        assert!(err.to_string().contains("4999"));
        assert_eq!(ledger.applied_entries(), 0);
    }

    #[test]
    fn test_chart_category_overrides_code_prefix() {
        let chart = ChartOfAccounts::new()
            .with_account("1000", "Cash")
            .with_categorized_account("9100", "Interest Income", AccountCategory::Revenue);
        let mut ledger = InMemoryLedger::with_chart(chart);
        let payload =
            EntryPayload::from_record(&record("JE-5", ("1000", 75.0), ("9100", 75.0))).unwrap();

        apply_all(&mut ledger, &payload);

        let statements = ledger.statements();
        assert_eq!(statements.revenue, 75.0);
        assert_eq!(statements.expenses, 0.0);
        assert_eq!(statements.net_income(), 75.0);
    }
}
