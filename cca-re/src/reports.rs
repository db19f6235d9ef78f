//! Comprehensive report: every completed result, completion progress and
//! stored AI insights, rendered as JSON or Markdown

use crate::completion::{self, CompletionStatus};
use crate::db::insights::StoredInsights;
use crate::db::results;
use crate::db::users::{self, UserSummary};
use crate::insights;
use crate::scoring::ScoringOutcome;
use cca_common::cache::CacheProvider;
use cca_common::catalog::TestKind;
use cca_common::db::{catalog, ResultConfiguration};
use cca_common::time::now;
use cca_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Json => "application/json",
            ReportFormat::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub test_id: i64,
    pub test_code: String,
    pub test_name: String,
    pub result_code: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub scores: ScoringOutcome,
    pub interpretation: Option<ResultConfiguration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveReport {
    pub user: UserSummary,
    pub generated_at: DateTime<Utc>,
    pub completion: CompletionStatus,
    pub sections: Vec<ReportSection>,
    pub insights: Option<StoredInsights>,
}

pub async fn build_report(
    pool: &SqlitePool,
    cache: &CacheProvider,
    user_id: &str,
) -> Result<ComprehensiveReport> {
    let user = users::find_user(pool, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User not found: {}", user_id)))?;
    let completion = completion::completion_status(pool, cache, user_id).await?;

    let mut sections = Vec::new();
    for result in results::list_results(pool, user_id).await? {
        if !result.is_completed {
            continue;
        }
        let Some(kind) = TestKind::from_id(result.test_id) else {
            continue;
        };
        let interpretation =
            catalog::get_result_configuration(pool, result.test_id, &result.result_code).await?;
        sections.push(ReportSection {
            test_id: result.test_id,
            test_code: kind.code().to_string(),
            test_name: kind.display_name().to_string(),
            result_code: result.result_code,
            completed_at: result.completed_at,
            scores: result.scores,
            interpretation,
        });
    }

    let insights = insights::cached_insights(pool, cache, user_id).await?;

    Ok(ComprehensiveReport {
        user,
        generated_at: now(),
        completion,
        sections,
        insights,
    })
}

pub fn render(report: &ComprehensiveReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Markdown => Ok(render_markdown(report)),
    }
}

fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::String(text) => {
            let _ = writeln!(out, "{}\n", text);
        }
        Value::Array(items) if items.iter().all(Value::is_string) => {
            for item in items.iter().filter_map(Value::as_str) {
                let _ = writeln!(out, "- {}", item);
            }
            out.push('\n');
        }
        other => {
            let pretty = serde_json::to_string_pretty(other).unwrap_or_default();
            let _ = writeln!(out, "```json\n{}\n```\n", pretty);
        }
    }
}

/// Human-readable report
pub fn render_markdown(report: &ComprehensiveReport) -> String {
    let mut out = String::new();
    let who = report.user.name.as_deref().unwrap_or(&report.user.email);

    let _ = writeln!(out, "# Career Compass Report: {}\n", who);
    let _ = writeln!(
        out,
        "_Generated {}_\n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    let c = &report.completion;
    let _ = writeln!(out, "## Progress\n");
    let _ = writeln!(
        out,
        "{} of {} assessments completed ({:.1}%).\n",
        c.completed_count, c.total, c.percentage
    );
    let _ = writeln!(out, "| Assessment | Status | Result |");
    let _ = writeln!(out, "|---|---|---|");
    for test in &c.tests {
        let result = report
            .sections
            .iter()
            .find(|s| s.test_id == test.test_id)
            .map(|s| s.result_code.as_str())
            .unwrap_or("-");
        let status = if test.completed { "Completed" } else { "Pending" };
        let _ = writeln!(out, "| {} | {} | {} |", test.name, status, result);
    }
    out.push('\n');

    for section in &report.sections {
        match &section.interpretation {
            Some(i) => {
                let _ = writeln!(
                    out,
                    "## {}: {} ({})\n",
                    section.test_name, i.title, section.result_code
                );
                let _ = writeln!(out, "{}\n", i.description);
            }
            None => {
                let _ = writeln!(out, "## {}: {}\n", section.test_name, section.result_code);
            }
        }

        let _ = writeln!(out, "| Dimension | Score |");
        let _ = writeln!(out, "|---|---|");
        for d in &section.scores.dimensions {
            let _ = writeln!(out, "| {} | {:.1}% |", d.code, d.percentage);
        }
        out.push('\n');

        if let Some(i) = &section.interpretation {
            if !i.strengths.is_empty() {
                let _ = writeln!(out, "**Strengths:** {}\n", i.strengths.join(", "));
            }
            if !i.career_suggestions.is_empty() {
                let _ = writeln!(
                    out,
                    "**Career suggestions:** {}\n",
                    i.career_suggestions.join(", ")
                );
            }
        }
    }

    if let Some(insights) = &report.insights {
        let _ = writeln!(out, "## AI Insights\n");
        match &insights.insights {
            Value::Object(map) => {
                for (key, value) in map {
                    let _ = writeln!(out, "### {}\n", title_case(key));
                    write_value(&mut out, value);
                }
            }
            other => write_value(&mut out, other),
        }
        let _ = writeln!(
            out,
            "_Generated by {} on {}_",
            insights.model,
            insights.generated_at.format("%Y-%m-%d")
        );
    }

    out
}
