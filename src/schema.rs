use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[schemars(description = "Entry has been prepared but not yet posted to the ledger")]
    Draft,

    #[schemars(description = "Entry has been approved and posted")]
    Posted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EntryLine {
    #[schemars(description = "Ledger account code, e.g. '1000' for Cash or '4000' for Sales")]
    pub account_code: String,

    #[schemars(description = "Line amount in currency units. Always non-negative; the side is given by the list the line belongs to.")]
    pub amount: f64,
}

impl EntryLine {
    pub fn new(account_code: impl Into<String>, amount: f64) -> Self {
        Self {
            account_code: account_code.into(),
            amount,
        }
    }
}

/// An approved journal entry handed over by the upstream entry producer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct JournalEntryRecord {
    #[schemars(description = "Unique identifier of the entry, e.g. 'JE-2024-0001'")]
    pub entry_id: String,

    #[schemars(description = "Accounting date of the entry in YYYY-MM-DD format")]
    pub date: NaiveDate,

    #[serde(default)]
    #[schemars(description = "External reference such as an invoice or voucher number")]
    pub reference: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub debit_lines: Vec<EntryLine>,

    #[serde(default)]
    pub credit_lines: Vec<EntryLine>,

    #[schemars(description = "Header total of all debit lines")]
    pub total_debit: f64,

    #[schemars(description = "Header total of all credit lines")]
    pub total_credit: f64,

    pub status: EntryStatus,
}

impl JournalEntryRecord {
    pub fn is_posted(&self) -> bool {
        self.status == EntryStatus::Posted
    }

    pub fn line_debit_total(&self) -> f64 {
        self.debit_lines.iter().map(|l| l.amount).sum()
    }

    pub fn line_credit_total(&self) -> f64 {
        self.credit_lines.iter().map(|l| l.amount).sum()
    }

    /// Account codes on both sides, debit lines first, in line order.
    pub fn account_codes(&self) -> impl Iterator<Item = &str> {
        self.debit_lines
            .iter()
            .chain(self.credit_lines.iter())
            .map(|l| l.account_code.as_str())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(JournalEntryRecord)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
