use crate::columns::{resolve_all, ColumnResolver, SemanticField, AMOUNT_KEYWORDS, NUMERIC_KEYWORDS};
use crate::config::ValidationConfig;
use crate::error::Result;
use crate::parsing::{parse_amount, parse_date};
use crate::table::{CellValue, TabularSource};
use chrono::NaiveDate;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

const PHONE_PATTERN: &str = r"^[+]?[1-9]\d{0,15}$";
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";

type CompiledPattern = OnceLock<std::result::Result<Regex, regex::Error>>;

fn compiled(cell: &'static CompiledPattern, pattern: &str) -> Result<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| e.clone().into())
}

fn phone_pattern() -> Result<&'static Regex> {
    static RE: CompiledPattern = OnceLock::new();
    compiled(&RE, PHONE_PATTERN)
}

fn email_pattern() -> Result<&'static Regex> {
    static RE: CompiledPattern = OnceLock::new();
    compiled(&RE, EMAIL_PATTERN)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassFindings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PassFindings {
    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPass {
    Structure,
    DataTypes,
    BusinessLogic,
    Completeness,
    Consistency,
    Ranges,
    Formats,
    Duplicates,
}

/// Everything a pass may read. Passes never see each other's findings.
pub struct PassContext<'a> {
    pub source: &'a dyn TabularSource,
    pub config: &'a ValidationConfig,
    pub today: NaiveDate,
}

impl ValidationPass {
    pub const ALL: [ValidationPass; 8] = [
        ValidationPass::Structure,
        ValidationPass::DataTypes,
        ValidationPass::BusinessLogic,
        ValidationPass::Completeness,
        ValidationPass::Consistency,
        ValidationPass::Ranges,
        ValidationPass::Formats,
        ValidationPass::Duplicates,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ValidationPass::Structure => "structure",
            ValidationPass::DataTypes => "data_types",
            ValidationPass::BusinessLogic => "business_logic",
            ValidationPass::Completeness => "completeness",
            ValidationPass::Consistency => "consistency",
            ValidationPass::Ranges => "ranges",
            ValidationPass::Formats => "formats",
            ValidationPass::Duplicates => "duplicates",
        }
    }

    pub fn run(&self, ctx: &PassContext<'_>) -> Result<PassFindings> {
        match self {
            ValidationPass::Structure => check_structure(ctx),
            ValidationPass::DataTypes => check_data_types(ctx),
            ValidationPass::BusinessLogic => check_business_logic(ctx),
            ValidationPass::Completeness => check_completeness(ctx),
            ValidationPass::Consistency => check_consistency(ctx),
            ValidationPass::Ranges => check_ranges(ctx),
            ValidationPass::Formats => check_formats(ctx),
            ValidationPass::Duplicates => check_duplicates(ctx),
        }
    }
}

fn column_name(source: &dyn TabularSource, idx: usize) -> &str {
    source.columns().get(idx).map(String::as_str).unwrap_or("")
}

fn check_structure(ctx: &PassContext<'_>) -> Result<PassFindings> {
    let mut findings = PassFindings::default();
    let source = ctx.source;

    let missing = ColumnResolver::missing_required(source);
    if !missing.is_empty() {
        let labels: Vec<&str> = missing.iter().map(|f| f.label()).collect();
        findings.error(format!(
            "Missing required columns: no column matches {}",
            labels.join(", ")
        ));
    }

    for (idx, name) in source.columns().iter().enumerate() {
        if source.column_values(idx)?.iter().all(|cell| cell.is_empty()) {
            findings.error(format!("Column '{}' is entirely empty", name));
        }
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in source.columns() {
        *counts.entry(name.as_str()).or_default() += 1;
    }
    let mut reported = HashSet::new();
    for name in source.columns() {
        let count = counts[name.as_str()];
        if count > 1 && reported.insert(name.as_str()) {
            findings.error(format!(
                "Duplicate column name '{}' appears {} times",
                name, count
            ));
        }
    }

    Ok(findings)
}

fn check_data_types(ctx: &PassContext<'_>) -> Result<PassFindings> {
    let mut findings = PassFindings::default();
    let source = ctx.source;

    for idx in resolve_all(source, NUMERIC_KEYWORDS) {
        let invalid = source
            .column_values(idx)?
            .into_iter()
            .filter(|cell| !cell.is_empty() && parse_amount(cell).is_none())
            .count();
        if invalid > 0 {
            findings.error(format!(
                "Column '{}' has {} non-numeric values",
                column_name(source, idx),
                invalid
            ));
        }
    }

    for idx in resolve_all(source, SemanticField::Date.keywords()) {
        let invalid = source
            .column_values(idx)?
            .into_iter()
            .filter(|cell| !cell.is_empty() && parse_date(cell).is_none())
            .count();
        if invalid > 0 {
            findings.error(format!(
                "Column '{}' has {} invalid dates",
                column_name(source, idx),
                invalid
            ));
        }
    }

    Ok(findings)
}

fn check_business_logic(ctx: &PassContext<'_>) -> Result<PassFindings> {
    let mut findings = PassFindings::default();
    let source = ctx.source;

    let debit = ColumnResolver::resolve_field(source, SemanticField::Debit);
    let credit = ColumnResolver::resolve_field(source, SemanticField::Credit);

    if let (Some(debit_idx), Some(credit_idx)) = (debit, credit) {
        if debit_idx != credit_idx {
            let debits = source.column_values(debit_idx)?;
            let credits = source.column_values(credit_idx)?;

            let total_debit: f64 = debits.iter().filter_map(|c| parse_amount(c)).sum();
            let total_credit: f64 = credits.iter().filter_map(|c| parse_amount(c)).sum();

            if (total_debit - total_credit).abs() > ctx.config.balance_tolerance {
                findings.error(format!(
                    "Double-entry violation: total debits ({:.2}) do not equal total credits ({:.2})",
                    total_debit, total_credit
                ));
            }

            let ambiguous = debits
                .iter()
                .zip(credits.iter())
                .filter(|(d, c)| {
                    let d = parse_amount(d).unwrap_or(0.0);
                    let c = parse_amount(c).unwrap_or(0.0);
                    d != 0.0 && c != 0.0
                })
                .count();
            if ambiguous > 0 {
                findings.warn(format!(
                    "{} rows carry both a debit and a credit amount",
                    ambiguous
                ));
            }
        }
    }

    for idx in resolve_all(source, AMOUNT_KEYWORDS) {
        let negatives = source
            .column_values(idx)?
            .into_iter()
            .filter_map(parse_amount)
            .filter(|v| *v < 0.0)
            .count();
        if negatives > 0 {
            findings.warn(format!(
                "Column '{}' contains {} negative values",
                column_name(source, idx),
                negatives
            ));
        }
    }

    Ok(findings)
}

fn check_completeness(ctx: &PassContext<'_>) -> Result<PassFindings> {
    let mut findings = PassFindings::default();
    let source = ctx.source;

    for field in [
        SemanticField::Description,
        SemanticField::Amount,
        SemanticField::Date,
    ] {
        if let Some(idx) = ColumnResolver::resolve_field(source, field) {
            let missing = source
                .column_values(idx)?
                .iter()
                .filter(|cell| cell.is_empty())
                .count();
            if missing > 0 {
                findings.error(format!(
                    "Missing {} values in column '{}': {} rows",
                    field.label(),
                    column_name(source, idx),
                    missing
                ));
            }
        }
    }

    let empty_rows = source
        .rows()
        .iter()
        .filter(|row| row.iter().all(CellValue::is_empty))
        .count();
    if empty_rows > 0 {
        findings.warn(format!("{} completely empty rows", empty_rows));
    }

    Ok(findings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CodeFormat {
    Numeric,
    Alphanumeric,
    Other,
}

impl CodeFormat {
    fn classify(code: &str) -> Self {
        if code.chars().all(|c| c.is_ascii_digit()) {
            CodeFormat::Numeric
        } else if code.chars().all(|c| c.is_ascii_alphanumeric()) {
            CodeFormat::Alphanumeric
        } else {
            CodeFormat::Other
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CodeFormat::Numeric => "numeric",
            CodeFormat::Alphanumeric => "alphanumeric",
            CodeFormat::Other => "other",
        }
    }
}

fn check_consistency(ctx: &PassContext<'_>) -> Result<PassFindings> {
    let mut findings = PassFindings::default();
    let source = ctx.source;

    if let Some(idx) = ColumnResolver::resolve_field(source, SemanticField::Date) {
        let dates: Vec<NaiveDate> = source
            .column_values(idx)?
            .into_iter()
            .filter_map(parse_date)
            .collect();

        if let (Some(min), Some(max)) = (dates.iter().min(), dates.iter().max()) {
            let span = (*max - *min).num_days();
            if span > ctx.config.max_date_span_days {
                findings.warn(format!(
                    "Dates span {} days ({} to {}), more than {} days",
                    span, min, max, ctx.config.max_date_span_days
                ));
            }
        }

        let future = dates.iter().filter(|d| **d > ctx.today).count();
        if future > 0 {
            findings.warn(format!(
                "{} dates are later than {}",
                future, ctx.today
            ));
        }
    }

    // Reference numbers stand in for account codes when no account column exists.
    let code_column = ColumnResolver::resolve_field(source, SemanticField::Account)
        .or_else(|| ColumnResolver::resolve_field(source, SemanticField::Reference));
    if let Some(idx) = code_column {
        let formats: BTreeSet<CodeFormat> = source
            .column_values(idx)?
            .into_iter()
            .filter(|cell| !cell.is_empty())
            .map(|cell| CodeFormat::classify(&cell.as_text()))
            .collect();

        if formats.len() > 1 {
            let labels: Vec<&str> = formats.iter().map(|f| f.label()).collect();
            findings.warn(format!(
                "Mixed code formats in column '{}': {}",
                column_name(source, idx),
                labels.join(", ")
            ));
        }
    }

    Ok(findings)
}

fn check_ranges(ctx: &PassContext<'_>) -> Result<PassFindings> {
    let mut findings = PassFindings::default();
    let source = ctx.source;

    for idx in resolve_all(source, AMOUNT_KEYWORDS) {
        let values: Vec<f64> = source
            .column_values(idx)?
            .into_iter()
            .filter_map(parse_amount)
            .collect();
        let name = column_name(source, idx);

        let max_abs = values.iter().map(|v| v.abs()).fold(0.0_f64, f64::max);
        if max_abs > ctx.config.large_amount_threshold {
            findings.warn(format!(
                "Column '{}' has an implausibly large amount ({:.2})",
                name, max_abs
            ));
        }

        let min_positive = values
            .iter()
            .copied()
            .filter(|v| *v > 0.0)
            .fold(f64::INFINITY, f64::min);
        if min_positive < ctx.config.small_amount_threshold {
            findings.warn(format!(
                "Column '{}' has an implausibly small amount ({})",
                name, min_positive
            ));
        }
    }

    Ok(findings)
}

fn count_mismatches(
    source: &dyn TabularSource,
    idx: usize,
    pattern: &Regex,
    normalize: impl Fn(&CellValue) -> String,
) -> Result<usize> {
    Ok(source
        .column_values(idx)?
        .into_iter()
        .filter(|cell| !cell.is_empty())
        .filter(|cell| !pattern.is_match(&normalize(*cell)))
        .count())
}

fn check_formats(ctx: &PassContext<'_>) -> Result<PassFindings> {
    let mut findings = PassFindings::default();
    let source = ctx.source;

    let phone = phone_pattern()?;
    for idx in resolve_all(source, SemanticField::Phone.keywords()) {
        let invalid = count_mismatches(source, idx, phone, |cell| {
            cell.as_text()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect()
        })?;
        if invalid > 0 {
            findings.error(format!(
                "Column '{}' has {} invalid phone numbers",
                column_name(source, idx),
                invalid
            ));
        }
    }

    let email = email_pattern()?;
    for idx in resolve_all(source, SemanticField::Email.keywords()) {
        let invalid = count_mismatches(source, idx, email, CellValue::as_text)?;
        if invalid > 0 {
            findings.error(format!(
                "Column '{}' has {} invalid email addresses",
                column_name(source, idx),
                invalid
            ));
        }
    }

    Ok(findings)
}

/// Rows that share their key with at least one other row; a duplicated pair counts 2.
fn rows_in_duplicate_groups<K: std::hash::Hash + Eq>(keys: impl Iterator<Item = K>) -> usize {
    let mut counts: HashMap<K, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    counts.values().filter(|n| **n > 1).sum()
}

fn check_duplicates(ctx: &PassContext<'_>) -> Result<PassFindings> {
    let mut findings = PassFindings::default();
    let source = ctx.source;

    let duplicate_rows = rows_in_duplicate_groups(
        source
            .rows()
            .iter()
            .filter(|row| !row.iter().all(CellValue::is_empty))
            .map(|row| row.iter().map(CellValue::as_text).collect::<Vec<_>>()),
    );
    if duplicate_rows > 0 {
        findings.warn(format!("{} duplicate rows found", duplicate_rows));
    }

    if let Some(idx) = ColumnResolver::resolve_field(source, SemanticField::Reference) {
        let duplicate_refs = rows_in_duplicate_groups(
            source
                .column_values(idx)?
                .into_iter()
                .filter(|cell| !cell.is_empty())
                .map(CellValue::as_text),
        );
        if duplicate_refs > 0 {
            findings.warn(format!(
                "Column '{}' has {} rows with duplicate reference values",
                column_name(source, idx),
                duplicate_refs
            ));
        }
    }

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    fn run(pass: ValidationPass, table: &Table) -> PassFindings {
        let config = ValidationConfig::default();
        let ctx = PassContext {
            source: table,
            config: &config,
            today: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        };
        pass.run(&ctx).unwrap()
    }

    fn table(columns: &[&str], rows: &[Vec<&str>]) -> Table {
        let rows: Vec<Vec<&str>> = rows.to_vec();
        Table::from_text_rows(columns, &rows).unwrap()
    }

    #[test]
    fn test_structure_reports_empty_and_duplicate_columns() {
        let t = table(
            &["Date", "Description", "Amount", "Amount", "Notes"],
            &[vec!["2024-01-01", "Rent", "100", "100", ""]],
        );
        let findings = run(ValidationPass::Structure, &t);

        assert_eq!(findings.errors.len(), 2);
        assert!(findings.errors.iter().any(|e| e.contains("'Notes' is entirely empty")));
        assert!(findings
            .errors
            .iter()
            .any(|e| e.contains("Duplicate column name 'Amount' appears 2 times")));
    }

    #[test]
    fn test_data_types_counts_bad_cells_per_column() {
        let t = table(
            &["Date", "Amount", "Quantity"],
            &[
                vec!["2024-01-01", "abc", "1"],
                vec!["yesterday", "$1,000", "two"],
                vec!["2024-01-03", "n/a", "3"],
            ],
        );
        let findings = run(ValidationPass::DataTypes, &t);

        assert_eq!(
            findings.errors,
            vec![
                "Column 'Amount' has 2 non-numeric values".to_string(),
                "Column 'Quantity' has 1 non-numeric values".to_string(),
                "Column 'Date' has 1 invalid dates".to_string(),
            ]
        );
    }

    #[test]
    fn test_business_logic_flags_imbalance_and_ambiguous_rows() {
        let t = table(
            &["Date", "Debit", "Credit"],
            &[
                vec!["2024-01-01", "500", ""],
                vec!["2024-01-01", "", "400"],
                vec!["2024-01-02", "50", "50"],
            ],
        );
        let findings = run(ValidationPass::BusinessLogic, &t);

        assert_eq!(findings.errors.len(), 1);
        assert!(findings.errors[0].contains("550.00"));
        assert!(findings.errors[0].contains("450.00"));
        assert_eq!(
            findings.warnings,
            vec!["1 rows carry both a debit and a credit amount".to_string()]
        );
    }

    #[test]
    fn test_business_logic_balanced_within_tolerance() {
        let t = table(
            &["Debit", "Credit"],
            &[vec!["100.004", ""], vec!["", "100.00"]],
        );
        let findings = run(ValidationPass::BusinessLogic, &t);
        assert!(findings.errors.is_empty());
        assert!(findings.warnings.is_empty());
    }

    #[test]
    fn test_negative_amounts_are_warnings() {
        let t = table(&["Amount"], &[vec!["-10"], vec!["(5.00)"], vec!["7"]]);
        let findings = run(ValidationPass::BusinessLogic, &t);
        assert!(findings.errors.is_empty());
        assert_eq!(
            findings.warnings,
            vec!["Column 'Amount' contains 2 negative values".to_string()]
        );
    }

    #[test]
    fn test_completeness_reports_missing_values_and_empty_rows() {
        let t = table(
            &["Date", "Description", "Amount"],
            &[
                vec!["2024-01-01", "", "10"],
                vec!["", "", ""],
                vec!["2024-01-03", "Fuel", "30"],
            ],
        );
        let findings = run(ValidationPass::Completeness, &t);

        assert_eq!(
            findings.errors,
            vec![
                "Missing description values in column 'Description': 2 rows".to_string(),
                "Missing amount values in column 'Amount': 1 rows".to_string(),
                "Missing date values in column 'Date': 1 rows".to_string(),
            ]
        );
        assert_eq!(findings.warnings, vec!["1 completely empty rows".to_string()]);
    }

    #[test]
    fn test_consistency_span_future_and_mixed_codes() {
        let t = table(
            &["Date", "Account Code"],
            &[
                vec!["2023-01-01", "1001"],
                vec!["2024-06-30", "CASH01"],
                vec!["2025-02-01", "AR-100"],
            ],
        );
        let findings = run(ValidationPass::Consistency, &t);

        assert!(findings.errors.is_empty());
        assert_eq!(findings.warnings.len(), 3);
        assert!(findings.warnings[0].contains("762 days"));
        assert!(findings.warnings[1].starts_with("1 dates are later than 2024-12-31"));
        assert!(findings.warnings[2].ends_with("numeric, alphanumeric, other"));
    }

    #[test]
    fn test_consistency_falls_back_to_reference_codes() {
        let t = table(
            &["Date", "Description", "Amount", "Voucher No"],
            &[
                vec!["2024-03-01", "Freight", "100", "1001"],
                vec!["2024-03-02", "Packing", "200", "JV-2"],
            ],
        );
        let findings = run(ValidationPass::Consistency, &t);

        assert_eq!(
            findings.warnings,
            vec!["Mixed code formats in column 'Voucher No': numeric, other".to_string()]
        );
    }

    #[test]
    fn test_account_column_takes_precedence_over_reference() {
        let t = table(
            &["Reference", "Account"],
            &[vec!["1001", "4000"], vec!["JV-2", "4100"]],
        );
        let findings = run(ValidationPass::Consistency, &t);
        assert!(findings.warnings.is_empty());
    }

    #[test]
    fn test_ranges_flag_extreme_magnitudes() {
        let t = table(&["Amount"], &[vec!["2000000000"], vec!["0.001"], vec!["50"]]);
        let findings = run(ValidationPass::Ranges, &t);
        assert_eq!(findings.warnings.len(), 2);
        assert!(findings.warnings[0].contains("implausibly large"));
        assert!(findings.warnings[1].contains("implausibly small"));
    }

    #[test]
    fn test_formats_validate_phone_and_email() {
        let t = table(
            &["Phone", "Email"],
            &[
                vec!["+91 98765 43210", "ops@example.com"],
                vec!["0123", "not-an-email"],
                vec!["(555) 123-4567", "a@b"],
            ],
        );
        let findings = run(ValidationPass::Formats, &t);

        assert_eq!(
            findings.errors,
            vec![
                "Column 'Phone' has 1 invalid phone numbers".to_string(),
                "Column 'Email' has 2 invalid email addresses".to_string(),
            ]
        );
    }

    #[test]
    fn test_duplicates_count_every_row_in_a_group() {
        let t = table(
            &["Reference", "Amount"],
            &[
                vec!["INV-1", "10"],
                vec!["INV-1", "10"],
                vec!["INV-2", "20"],
                vec!["", ""],
                vec!["", ""],
            ],
        );
        let findings = run(ValidationPass::Duplicates, &t);

        assert_eq!(
            findings.warnings,
            vec![
                "2 duplicate rows found".to_string(),
                "Column 'Reference' has 2 rows with duplicate reference values".to_string(),
            ]
        );
    }

    #[test]
    fn test_shared_invoice_dates_are_not_duplicate_references() {
        let t = table(
            &["Invoice Date", "Invoice No", "Description", "Amount"],
            &[
                vec!["2024-04-02", "INV-1", "Laptops", "1000"],
                vec!["2024-04-02", "INV-2", "Monitors", "400"],
            ],
        );
        let findings = run(ValidationPass::Duplicates, &t);
        assert!(findings.warnings.is_empty(), "{:?}", findings.warnings);

        let repeated = table(
            &["Invoice Date", "Invoice No", "Description", "Amount"],
            &[
                vec!["2024-04-02", "INV-1", "Laptops", "1000"],
                vec!["2024-04-03", "INV-1", "Monitors", "400"],
            ],
        );
        assert_eq!(
            run(ValidationPass::Duplicates, &repeated).warnings,
            vec!["Column 'Invoice No' has 2 rows with duplicate reference values".to_string()]
        );
    }

    #[test]
    fn test_value_header_is_not_mistaken_for_the_amount_column() {
        let t = table(
            &["Date", "Description", "Value"],
            &[
                vec!["2024-01-01", "Rent", "abc"],
                vec!["2024-01-02", "Fuel", "-5000000000"],
            ],
        );
        let findings = run(ValidationPass::Structure, &t);
        assert_eq!(
            findings.errors,
            vec!["Missing required columns: no column matches amount".to_string()]
        );
    }

    #[test]
    fn test_resolved_amount_column_gets_every_amount_rule() {
        let t = table(
            &["Date", "Description", "Net Amt"],
            &[
                vec!["2024-01-01", "Rent", "abc"],
                vec!["2024-01-02", "Fuel", "-5000000000"],
            ],
        );
        assert_eq!(
            run(ValidationPass::DataTypes, &t).errors,
            vec!["Column 'Net Amt' has 1 non-numeric values".to_string()]
        );
        assert_eq!(
            run(ValidationPass::BusinessLogic, &t).warnings,
            vec!["Column 'Net Amt' contains 1 negative values".to_string()]
        );
        assert!(run(ValidationPass::Ranges, &t).warnings[0].contains("implausibly large"));
    }

    #[test]
    fn test_format_patterns_compile_once() {
        let first = phone_pattern().unwrap();
        assert!(std::ptr::eq(first, phone_pattern().unwrap()));
        assert!(email_pattern().unwrap().is_match("ops@example.com"));
    }
}
