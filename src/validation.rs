use crate::checks::{PassContext, PassFindings, ValidationPass};
use crate::config::ValidationConfig;
use crate::parsing::{infer_kind, round_to_cents, CellKind};
use crate::table::TabularSource;
use chrono::Local;
use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationIssue {
    pub message: String,
}

impl From<String> for ValidationIssue {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PassSummary {
    pub pass: ValidationPass,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationSummary {
    pub total_rows: usize,
    pub total_columns: usize,
    pub error_count: usize,
    pub warning_count: usize,
    /// Blend of the score, completeness and consistency, on a 0-100 scale.
    pub data_quality_score: f64,
    /// Fraction of non-empty cells.
    pub completeness_score: f64,
    /// Fraction of columns whose non-empty cells share one inferred kind.
    pub consistency_score: f64,
    pub passes: Vec<PassSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub score: u32,
    pub row_count: usize,
    pub column_names: Vec<String>,
    pub summary: ValidationSummary,
}

impl ValidationReport {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ValidationReport)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{}: score {}/100, {} errors, {} warnings over {} rows",
            if self.is_valid { "VALID" } else { "INVALID" },
            self.score,
            self.errors.len(),
            self.warnings.len(),
            self.row_count
        )
    }
}

/// `100 - penalty * errors`, clamped to `[0, 100]`. Warnings are not scored.
pub fn quality_score(error_count: usize, penalty: u32) -> u32 {
    let deduction = (error_count as u64).saturating_mul(penalty as u64);
    100u64.saturating_sub(deduction) as u32
}

pub struct ValidationEngine {
    config: ValidationConfig,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl ValidationEngine {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Runs every pass over `source`. Never fails: a pass that errors
    /// internally contributes no findings.
    pub fn validate<S: TabularSource>(&self, source: &S) -> ValidationReport {
        let columns = source.columns().to_vec();
        let row_count = source.row_count();

        info!(
            "Validating table with {} rows and {} columns",
            row_count,
            columns.len()
        );

        if columns.is_empty() || row_count == 0 {
            return self.empty_table_report(columns, row_count);
        }

        let ctx = PassContext {
            source,
            config: &self.config,
            today: self
                .config
                .reference_date
                .unwrap_or_else(|| Local::now().date_naive()),
        };

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut passes = Vec::with_capacity(ValidationPass::ALL.len());

        for pass in ValidationPass::ALL {
            let findings = match pass.run(&ctx) {
                Ok(findings) => findings,
                Err(e) => {
                    warn!("Validation pass '{}' failed, skipping: {}", pass.name(), e);
                    PassFindings::default()
                }
            };

            debug!(
                "Pass '{}': {} errors, {} warnings",
                pass.name(),
                findings.errors.len(),
                findings.warnings.len()
            );

            passes.push(PassSummary {
                pass,
                errors: findings.errors.len(),
                warnings: findings.warnings.len(),
            });
            errors.extend(findings.errors.into_iter().map(ValidationIssue::from));
            warnings.extend(findings.warnings.into_iter().map(ValidationIssue::from));
        }

        let score = quality_score(errors.len(), self.config.error_penalty);
        let completeness = completeness_score(source);
        let consistency = consistency_score(source);

        let report = ValidationReport {
            is_valid: errors.is_empty(),
            score,
            row_count,
            summary: ValidationSummary {
                total_rows: row_count,
                total_columns: columns.len(),
                error_count: errors.len(),
                warning_count: warnings.len(),
                data_quality_score: blended_quality(score, completeness, consistency),
                completeness_score: completeness,
                consistency_score: consistency,
                passes,
            },
            column_names: columns,
            errors,
            warnings,
        };

        info!("Validation finished: {}", report.summary_line());
        report
    }

    fn empty_table_report(&self, columns: Vec<String>, row_count: usize) -> ValidationReport {
        let errors = vec![ValidationIssue::from(
            "Table is empty: no rows or columns to validate".to_string(),
        )];
        let score = quality_score(errors.len(), self.config.error_penalty);

        ValidationReport {
            is_valid: false,
            score,
            row_count,
            summary: ValidationSummary {
                total_rows: row_count,
                total_columns: columns.len(),
                error_count: errors.len(),
                warning_count: 0,
                data_quality_score: blended_quality(score, 0.0, 0.0),
                completeness_score: 0.0,
                consistency_score: 0.0,
                passes: vec![PassSummary {
                    pass: ValidationPass::Structure,
                    errors: 1,
                    warnings: 0,
                }],
            },
            column_names: columns,
            errors,
            warnings: Vec::new(),
        }
    }
}

fn completeness_score<S: TabularSource>(source: &S) -> f64 {
    let total: usize = source.rows().iter().map(|r| r.len()).sum();
    if total == 0 {
        return 0.0;
    }
    let filled = source
        .rows()
        .iter()
        .flat_map(|r| r.iter())
        .filter(|cell| !cell.is_empty())
        .count();
    filled as f64 / total as f64
}

fn consistency_score<S: TabularSource>(source: &S) -> f64 {
    let column_count = source.columns().len();
    if column_count == 0 {
        return 0.0;
    }

    let consistent = (0..column_count)
        .filter(|idx| {
            let kinds: HashSet<CellKind> = source
                .rows()
                .iter()
                .filter_map(|row| row.get(*idx))
                .filter_map(infer_kind)
                .collect();
            kinds.len() <= 1
        })
        .count();

    consistent as f64 / column_count as f64
}

fn blended_quality(score: u32, completeness: f64, consistency: f64) -> f64 {
    round_to_cents((score as f64 + completeness * 100.0 + consistency * 100.0) / 3.0)
}
