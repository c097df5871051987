use crate::health::{HealthReport, HealthStatus};
use crate::integration::{AuditRecord, FinancialImpact};
use crate::schema::JournalEntryRecord;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntegrationReport {
    pub generated_at: DateTime<Utc>,
    pub total_entries: usize,
    pub posted_entries: usize,
    pub draft_entries: usize,
    pub financial_impact: FinancialImpact,
    /// Appearances of each account code across debit and credit lines.
    pub account_usage: BTreeMap<String, usize>,
    pub recent_integrations: Vec<AuditRecord>,
    pub health: HealthReport,
    pub recommendations: Vec<String>,
}

impl IntegrationReport {
    pub fn build(
        entries: &[JournalEntryRecord],
        health: HealthReport,
        recent_integrations: Vec<AuditRecord>,
    ) -> Self {
        let posted_entries = entries.iter().filter(|e| e.is_posted()).count();
        let draft_entries = entries.len() - posted_entries;
        let financial_impact = FinancialImpact::from_entries(entries);

        let mut account_usage: BTreeMap<String, usize> = BTreeMap::new();
        for code in entries.iter().flat_map(|e| e.account_codes()) {
            *account_usage.entry(code.to_string()).or_default() += 1;
        }

        let recommendations = recommendations(
            draft_entries,
            &financial_impact,
            &health,
            &recent_integrations,
        );

        Self {
            generated_at: Utc::now(),
            total_entries: entries.len(),
            posted_entries,
            draft_entries,
            financial_impact,
            account_usage,
            recent_integrations,
            health,
            recommendations,
        }
    }

    /// Account codes ordered by usage, most used first.
    pub fn top_accounts(&self, n: usize) -> Vec<(&str, usize)> {
        let mut usage: Vec<(&str, usize)> = self
            .account_usage
            .iter()
            .map(|(code, count)| (code.as_str(), *count))
            .collect();
        usage.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        usage.truncate(n);
        usage
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Integration Report\n\n");
        output.push_str(&format!(
            "**Generated:** {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        output.push_str("## Entries\n\n");
        output.push_str(&format!("- Total: {}\n", self.total_entries));
        output.push_str(&format!("- Posted: {}\n", self.posted_entries));
        output.push_str(&format!("- Draft: {}\n\n", self.draft_entries));

        output.push_str("## Financial Impact\n\n");
        output.push_str(&format!(
            "- Total debits: {:.2}\n",
            self.financial_impact.total_debits
        ));
        output.push_str(&format!(
            "- Total credits: {:.2}\n",
            self.financial_impact.total_credits
        ));
        output.push_str(&format!(
            "- Net impact: {:.2}\n\n",
            self.financial_impact.net_impact
        ));

        output.push_str("## Account Usage\n\n");
        output.push_str("| Account | Lines |\n|---|---|\n");
        for (code, count) in &self.account_usage {
            output.push_str(&format!("| {} | {} |\n", code, count));
        }
        output.push('\n');

        output.push_str(&format!("## Health: {:?}\n\n", self.health.overall_health));
        for check in &self.health.validations {
            output.push_str(&format!(
                "- [{}] {}: {}\n",
                if check.passed { "x" } else { " " },
                check.name,
                check.message
            ));
        }
        output.push('\n');

        output.push_str("## Recommendations\n\n");
        for recommendation in &self.recommendations {
            output.push_str(&format!("- {}\n", recommendation));
        }

        output
    }
}

fn recommendations(
    draft_entries: usize,
    impact: &FinancialImpact,
    health: &HealthReport,
    recent: &[AuditRecord],
) -> Vec<String> {
    let mut out = Vec::new();

    if draft_entries > 0 {
        out.push(format!("Review and post {} draft entries", draft_entries));
    }

    if impact.net_impact.abs() > 0.01 {
        out.push(format!(
            "Investigate the debit/credit imbalance of {:.2}",
            impact.net_impact
        ));
    }

    match health.overall_health {
        HealthStatus::IssuesFound => out.push(format!(
            "Resolve {} failing integration health checks",
            health.failing_checks()
        )),
        HealthStatus::Error => {
            out.push("Repair entry data so the integration health check can run".to_string())
        }
        HealthStatus::Healthy => {}
    }

    let failed_runs = recent.iter().filter(|r| !r.success).count();
    if failed_runs > 0 {
        out.push(format!(
            "Review {} recent integration runs that did not succeed",
            failed_runs
        ));
    }

    if out.is_empty() {
        out.push("All entries are integrated; no action required".to_string());
    }

    out
}
