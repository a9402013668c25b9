//! Markdown rendering of a run.

use super::report_stem;
use crate::models::Report;
use std::error::Error;
use std::fmt::Write;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Render `report` as a Markdown document.
///
/// Sections: quick stats, market analysis, startup ideas, competitive
/// analysis, and the source articles.
pub fn report_to_markdown(report: &Report) -> String {
    let result = &report.result;
    let mut md = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(md, "# Startup Ideas & Funding Report\n");
    let _ = writeln!(
        md,
        "_{} {} · model `{}` · focus: {}_\n",
        report.local_date, report.local_time, report.model, report.focus_area
    );

    let _ = writeln!(md, "## Quick Stats\n");
    let _ = writeln!(md, "- **Articles Analyzed:** {}", result.corpus.len());
    let _ = writeln!(md, "- **Sources:**");
    for (source, count) in result.corpus.source_counts() {
        let _ = writeln!(md, "    - {}: {} articles", source, count);
    }
    md.push('\n');

    let _ = writeln!(md, "## Market & Funding Analysis\n\n{}\n", result.market_analysis.trim());
    let _ = writeln!(md, "## Generated Startup Ideas\n\n{}\n", result.startup_ideas.trim());
    let _ = writeln!(
        md,
        "## Competitive Landscape Analysis\n\n{}\n",
        result.competitive_analysis.trim()
    );

    let _ = writeln!(md, "## Source Articles\n");
    for article in result.corpus.articles() {
        let _ = writeln!(md, "### {} - {}\n", article.title, article.source);
        let _ = writeln!(md, "- **Date:** {}", article.published_at);
        if article.link.starts_with("http") {
            let _ = writeln!(md, "- **Link:** [View Article]({})", article.link);
        } else {
            let _ = writeln!(md, "- **Link:** {}", article.link);
        }
        let _ = writeln!(md, "- **Excerpt:** {}\n", article.excerpt);
    }
    md
}

/// Write the Markdown report next to the JSON one.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
pub async fn write_report(report: &Report, output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let dir = PathBuf::from(output_dir).join(&report.local_date);
    fs::create_dir_all(&dir).await?;
    let path = dir.join(format!("{}.md", report_stem(report)));
    fs::write(&path, report_to_markdown(report)).await?;
    info!(path = %path.display(), "Wrote Markdown report");
    Ok(path)
}
