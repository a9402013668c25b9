//! Plain text export of the generated ideas.

use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Write `startup_ideas` to `{output_dir}/startup_ideas_{YYYYMMDD}.txt`.
///
/// `date` is the run date in `YYYY-MM-DD` form. A second run on the same day
/// replaces the file.
#[instrument(level = "info", skip(startup_ideas))]
pub async fn write_ideas(
    startup_ideas: &str,
    output_dir: &str,
    date: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let path = PathBuf::from(output_dir).join(format!("startup_ideas_{}.txt", date.replace('-', "")));
    fs::write(&path, startup_ideas).await?;
    info!(path = %path.display(), bytes = startup_ideas.len(), "Exported startup ideas");
    Ok(path)
}

/// Write the analysis of a user supplied idea to
/// `{output_dir}/idea_analysis_{YYYYMMDD}.txt`, headed by the idea itself.
#[instrument(level = "info", skip(analysis))]
pub async fn write_idea_analysis(
    idea: &str,
    analysis: &str,
    output_dir: &str,
    date: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let path = PathBuf::from(output_dir).join(format!("idea_analysis_{}.txt", date.replace('-', "")));
    fs::write(&path, format!("IDEA: {}\n\n{}\n", idea.trim(), analysis.trim())).await?;
    info!(path = %path.display(), "Exported idea analysis");
    Ok(path)
}
