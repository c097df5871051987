use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum AccountCategory {
    #[schemars(description = "Codes starting with 1: cash, receivables, inventory, fixed assets (debit balance)")]
    Asset,

    #[schemars(description = "Codes starting with 2: payables, loans, tax payable (credit balance)")]
    Liability,

    #[schemars(description = "Codes starting with 3: capital, retained earnings (credit balance)")]
    Equity,

    #[schemars(description = "Codes starting with 4: sales and other income (credit balance)")]
    Revenue,

    #[schemars(description = "Codes starting with 5-9: cost of sales and operating expenses (debit balance)")]
    Expense,
}

impl AccountCategory {
    /// Classifies an account by the leading digit of its code. Codes without a
    /// leading digit are treated as expenses.
    pub fn from_code(code: &str) -> Self {
        match code.trim().chars().next() {
            Some('1') => AccountCategory::Asset,
            Some('2') => AccountCategory::Liability,
            Some('3') => AccountCategory::Equity,
            Some('4') => AccountCategory::Revenue,
            _ => AccountCategory::Expense,
        }
    }
}

/// Cash and bank accounts live under 10xx and 11xx.
pub fn is_cash_account(code: &str) -> bool {
    let code = code.trim();
    code.starts_with("10") || code.starts_with("11")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountEntry {
    pub code: String,
    pub name: String,
    pub category: AccountCategory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChartOfAccounts {
    accounts: BTreeMap<String, AccountEntry>,
}

impl ChartOfAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, code: &str, name: &str) -> Self {
        self.insert(code, name);
        self
    }

    /// Adds an account whose category does not follow its code prefix.
    pub fn with_categorized_account(
        mut self,
        code: &str,
        name: &str,
        category: AccountCategory,
    ) -> Self {
        self.insert_with_category(code, name, category);
        self
    }

    pub fn insert(&mut self, code: &str, name: &str) {
        self.insert_with_category(code, name, AccountCategory::from_code(code));
    }

    fn insert_with_category(&mut self, code: &str, name: &str, category: AccountCategory) {
        self.accounts.insert(
            code.to_string(),
            AccountEntry {
                code: code.to_string(),
                name: name.to_string(),
                category,
            },
        );
    }

    pub fn contains(&self, code: &str) -> bool {
        self.accounts.contains_key(code)
    }

    pub fn get(&self, code: &str) -> Option<&AccountEntry> {
        self.accounts.get(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(AccountCategory::from_code("1000"), AccountCategory::Asset);
        assert_eq!(AccountCategory::from_code(" 2200"), AccountCategory::Liability);
        assert_eq!(AccountCategory::from_code("3100"), AccountCategory::Equity);
        assert_eq!(AccountCategory::from_code("4000"), AccountCategory::Revenue);
        assert_eq!(AccountCategory::from_code("6500"), AccountCategory::Expense);
        assert_eq!(AccountCategory::from_code("MISC"), AccountCategory::Expense);
    }

    #[test]
    fn test_cash_accounts() {
        assert!(is_cash_account("1000"));
        assert!(is_cash_account("1105"));
        assert!(!is_cash_account("1200"));
    }

    #[test]
    fn test_chart_lookup() {
        let chart = ChartOfAccounts::new()
            .with_account("1000", "Cash at Bank")
            .with_account("4000", "Sales")
            .with_categorized_account("9100", "Interest Income", AccountCategory::Revenue);

        assert!(chart.contains("1000"));
        assert!(!chart.contains("9999"));
        assert_eq!(
            chart.get("4000").map(|a| a.category),
            Some(AccountCategory::Revenue)
        );
        assert_eq!(
            chart.get("9100").map(|a| a.category),
            Some(AccountCategory::Revenue)
        );
    }
}
