//! TechCrunch source definition.
//!
//! The startups category is the most targeted listing, the funding tag page
//! is broader, and the homepage is the last resort. Post blocks have carried
//! `post-block*` classes for years; newer layouts use `wp-block*` containers.

use super::SourceConfig;

pub const LABEL: &str = "TechCrunch";

pub fn config() -> SourceConfig {
    SourceConfig {
        label: LABEL.to_string(),
        candidate_urls: vec![
            "https://techcrunch.com/category/startups/".to_string(),
            "https://techcrunch.com/tag/funding/".to_string(),
            "https://techcrunch.com/".to_string(),
        ],
        selector_strategies: vec![
            r#"article[class*="post-block"]"#.to_string(),
            r#"div[class*="post-"]"#.to_string(),
            "article".to_string(),
            r#"div[class*="wp-block"]"#.to_string(),
            "h2".to_string(),
            "h3".to_string(),
        ],
        headings: vec!["h2".to_string(), "h3".to_string()],
        keywords: [
            "raises",
            "funding",
            "series",
            "million",
            "billion",
            "investment",
            "venture",
            "seed",
            "round",
            "capital",
            "valuation",
            "startup",
            "vc",
            "investor",
        ]
        .iter()
        .map(|k| k.to_string())
        .collect(),
        limit_divisor: 1,
        limit_cap: None,
    }
}
