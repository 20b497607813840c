//! Markdown report generation.
//!
//! This module generates the Markdown feedback report from the computed
//! statistics, plus the JSON twin consumed by chart rendering and export.

use crate::models::{
    CategoryAverage, CommentEntry, Distribution, RankedCategory, Report, ReportMetadata,
    ScoreSummary, TrendPoint, SCALE_MAX,
};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Widest bar drawn in distribution tables.
const BAR_WIDTH: u64 = 20;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# 360° Feedback Report\n\n");

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Summary section
    output.push_str(&generate_summary_section(&report.summary));

    // Per-category breakdown
    output.push_str(&generate_categories_section(&report.summary.category_averages));

    // Strengths and weaknesses
    output.push_str(&generate_rankings_section(
        &report.summary.strengths,
        &report.summary.weaknesses,
    ));

    // Score trend over cycles
    output.push_str(&generate_trend_section(&report.trend));

    // Respondent comments
    output.push_str(&generate_comments_section(&report.comments));

    // Recommendations
    output.push_str(&generate_recommendations_section(
        report.recommendations.as_deref(),
    ));

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    if let Some(ref subject) = metadata.subject {
        section.push_str(&format!("- **Employee:** {}\n", subject));
    }
    if let Some(ref cycle) = metadata.cycle {
        section.push_str(&format!("- **Cycle:** {}\n", cycle));
    }
    section.push_str(&format!("- **Scope:** {}\n", metadata.scope));
    section.push_str(&format!("- **Dataset:** `{}`\n", metadata.dataset));
    section.push_str(&format!("- **Respondents:** {}\n", metadata.respondents));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(ref model) = metadata.model_used {
        section.push_str(&format!("- **Recommendation Model:** `{}`\n", model));
    }
    section.push('\n');

    section
}

/// Generate the score summary section.
fn generate_summary_section(summary: &ScoreSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    if summary.category_averages.is_empty() {
        section.push_str("No rating responses were recorded for this scope yet.\n\n");
        return section;
    }

    section.push_str(&format!(
        "**Overall average: {:.2} / {}** across {} categories and {} responses.\n\n",
        summary.overall_average,
        SCALE_MAX,
        summary.category_averages.len(),
        summary.total_responses
    ));

    section.push_str("### Rating Distribution\n\n");
    section.push_str(&distribution_table(&summary.response_distribution));

    section
}

/// Render a distribution as a score/count table with bars.
fn distribution_table(distribution: &Distribution) -> String {
    let mut table = String::new();
    let max = distribution.values().copied().max().unwrap_or(0);

    table.push_str("| Score | Count | |\n");
    table.push_str("|:---:|:---:|:---|\n");
    for (score, count) in distribution {
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            score,
            count,
            bar(*count, max)
        ));
    }
    table.push('\n');

    table
}

/// A proportional text bar for distribution tables.
fn bar(count: u64, max: u64) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let width = ((count * BAR_WIDTH).div_ceil(max)).max(1);
    "█".repeat(width as usize)
}

/// Generate the per-category breakdown.
fn generate_categories_section(categories: &[CategoryAverage]) -> String {
    if categories.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Scores by Category\n\n");
    section.push_str("| Category | Average | Responses | 1 | 2 | 3 | 4 | 5 |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    for category in categories {
        let counts: Vec<String> = category
            .distribution
            .values()
            .map(|c| c.to_string())
            .collect();
        section.push_str(&format!(
            "| {} | **{:.2}** | {} | {} |\n",
            category.name,
            category.average,
            category.count,
            counts.join(" | ")
        ));
    }
    section.push('\n');

    section
}

/// Generate the strengths and weaknesses sections.
fn generate_rankings_section(
    strengths: &[RankedCategory],
    weaknesses: &[RankedCategory],
) -> String {
    if strengths.is_empty() && weaknesses.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    if !strengths.is_empty() {
        section.push_str("## Strengths\n\n");
        for (i, entry) in strengths.iter().enumerate() {
            section.push_str(&format!(
                "{}. **{}** — {:.2}\n",
                i + 1,
                entry.name,
                entry.average
            ));
        }
        section.push('\n');
    }

    if !weaknesses.is_empty() {
        section.push_str("## Growth Areas\n\n");
        for (i, entry) in weaknesses.iter().enumerate() {
            section.push_str(&format!(
                "{}. **{}** — {:.2}\n",
                i + 1,
                entry.name,
                entry.average
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the score trend section.
fn generate_trend_section(trend: &[TrendPoint]) -> String {
    if trend.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Score Trend\n\n");
    section.push_str("| Cycle End | Overall Average |\n");
    section.push_str("|:---|:---:|\n");
    for point in trend {
        section.push_str(&format!("| {} | {:.2} |\n", point.date, point.score));
    }
    section.push('\n');

    section
}

/// Generate the respondent comments section, grouped by category.
fn generate_comments_section(comments: &[CommentEntry]) -> String {
    if comments.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Respondent Comments\n\n");

    let mut current_category: Option<&str> = None;
    for comment in comments {
        if current_category != Some(comment.category_name.as_str()) {
            section.push_str(&format!("### {}\n\n", comment.category_name));
            current_category = Some(comment.category_name.as_str());
        }
        section.push_str(&format!(
            "> {}\n>\n> — *{}*, on \"{}\"\n\n",
            comment.text,
            comment.respondent_role.label(),
            comment.question_text
        ));
    }

    section
}

/// Generate the recommendations section.
fn generate_recommendations_section(recommendations: Option<&str>) -> String {
    let text = match recommendations {
        Some(t) if !t.trim().is_empty() => t,
        _ => return String::new(),
    };

    let mut section = String::new();

    section.push_str("## Development Recommendations\n\n");
    section.push_str(text.trim());
    section.push_str("\n\n");

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by pulse360*\n");

    footer
}

/// Write the Markdown report to a file.
#[allow(dead_code)] // Alternative to generating and writing separately
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let content = generate_markdown_report(report);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

/// Generate a JSON report.
///
/// Field names match the wire contract exactly; the presentation layer
/// consumes this document verbatim.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
#[allow(dead_code)] // Convenience wrapper
pub fn write_json_report(report: &Report, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
