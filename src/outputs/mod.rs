//! Report writers.
//!
//! # Submodules
//!
//! - [`json`]: the full [`Report`](crate::models::Report) as JSON
//! - [`markdown`]: a readable report with stats, the three analyses and sources
//! - [`export`]: the plain text idea list
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2025-05-06/
//! │   ├── report_143000.json
//! │   └── report_143000.md
//! └── startup_ideas_20250506.txt
//! ```

pub mod export;
pub mod json;
pub mod markdown;

use crate::models::Report;

/// File stem shared by the JSON and Markdown files of one run.
pub(crate) fn report_stem(report: &Report) -> String {
    format!("report_{}", report.local_time.replace(':', ""))
}
