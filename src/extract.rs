//! Heuristic article extraction from listing pages.
//!
//! Listing pages change layout without notice, so extraction is driven by an
//! ordered list of [`SelectorStrategy`] values, most structural first, bare
//! headline tags last. The first strategy that matches anything is used.
//!
//! For every matched element a title and an anchor are located in three
//! layers:
//!
//! 1. the element is itself a heading: it is the title, the anchor is inside it
//! 2. a heading inside the element is the title, the anchor is inside that heading
//! 3. the first anchor inside the element, with its parent as the title
//!
//! Headlines without a funding keyword are dropped, and links are deduplicated
//! within one call. Anything odd about a single element only skips that element.

use crate::error::{ConfigurationError, ExtractionElementError};
use crate::models::ArticleRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use tracing::{debug, instrument};
use url::Url;

/// Characters of excerpt kept before the `...` marker.
pub const EXCERPT_MAX_CHARS: usize = 200;
const EXCERPT_ELLIPSIS: &str = "...";

/// Each strategy looks at up to this many candidates per accepted article.
const CANDIDATES_PER_RESULT: usize = 2;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));
static DIV: Lazy<Selector> = Lazy::new(|| Selector::parse("div").expect("static selector"));
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").expect("static selector"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// A named CSS rule locating elements that probably hold a headline.
#[derive(Debug, Clone)]
pub struct SelectorStrategy {
    name: String,
    selector: Selector,
}

impl SelectorStrategy {
    /// Compile `css` for the source labelled `source_label`.
    pub fn parse(source_label: &str, css: &str) -> Result<Self, ConfigurationError> {
        let selector = Selector::parse(css).map_err(|e| ConfigurationError::InvalidSelector {
            source_label: source_label.to_string(),
            selector: css.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: css.to_string(),
            selector,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Matching elements in document order, at most `limit` of them.
    pub fn candidates<'a>(&self, document: &'a Html, limit: usize) -> Vec<ElementRef<'a>> {
        document.select(&self.selector).take(limit).collect()
    }
}

/// Lower-cased keywords, one of which a headline must contain.
#[derive(Debug, Clone)]
pub struct RelevanceLexicon(Vec<String>);

impl RelevanceLexicon {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        )
    }

    /// Substring match against the lower-cased title.
    pub fn matches(&self, title: &str) -> bool {
        let lowered = title.to_lowercase();
        self.0.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// Extraction rules for one source.
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    strategies: Vec<SelectorStrategy>,
    headings: Vec<String>,
    heading_selector: Selector,
    lexicon: RelevanceLexicon,
}

impl ArticleExtractor {
    /// `headings` are the tag names treated as headline elements, e.g. `h2`, `h3`.
    pub fn new(
        source_label: &str,
        strategies: Vec<SelectorStrategy>,
        headings: &[String],
        lexicon: RelevanceLexicon,
    ) -> Result<Self, ConfigurationError> {
        let headings: Vec<String> = headings.iter().map(|h| h.trim().to_lowercase()).collect();
        let css = headings.join(", ");
        let heading_selector =
            Selector::parse(&css).map_err(|e| ConfigurationError::InvalidSelector {
                source_label: source_label.to_string(),
                selector: css.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            strategies,
            headings,
            heading_selector,
            lexicon,
        })
    }

    /// Extract at most `max_results` funding articles from `html`.
    ///
    /// `base_url` is the URL the page was fetched from and is used to resolve
    /// relative links. The result never contains two records with the same link.
    #[instrument(level = "debug", skip(self, html, base_url, source_label), fields(base_url = %base_url, source = source_label))]
    pub fn extract(
        &self,
        html: &str,
        base_url: &Url,
        source_label: &str,
        max_results: usize,
    ) -> Vec<ArticleRecord> {
        if max_results == 0 {
            return Vec::new();
        }
        let document = Html::parse_document(html);
        let limit = max_results.saturating_mul(CANDIDATES_PER_RESULT);

        let Some((strategy, elements)) = self
            .strategies
            .iter()
            .map(|s| (s, s.candidates(&document, limit)))
            .find(|(_, elements)| !elements.is_empty())
        else {
            debug!("No selector strategy matched");
            return Vec::new();
        };
        debug!(strategy = strategy.name(), count = elements.len(), "Strategy matched");

        let mut seen = HashSet::new();
        let mut articles = Vec::new();
        for element in elements {
            if articles.len() >= max_results {
                break;
            }
            match self.extract_element(element, base_url, source_label) {
                Ok(record) => {
                    if !seen.insert(record.link.clone()) {
                        let skip = ExtractionElementError::Duplicate(record.link);
                        debug!(reason = %skip, "Skipped element");
                        continue;
                    }
                    debug!(title = %record.title, "Accepted article");
                    articles.push(record);
                }
                Err(skip) => debug!(reason = %skip, "Skipped element"),
            }
        }
        articles
    }

    fn extract_element(
        &self,
        element: ElementRef<'_>,
        base_url: &Url,
        source_label: &str,
    ) -> Result<ArticleRecord, ExtractionElementError> {
        let (title_elem, anchor) = self.locate_title_and_anchor(element)?;

        let title = collapse_whitespace(&title_elem.text().collect::<String>());
        if title.is_empty() {
            return Err(ExtractionElementError::EmptyTitle);
        }
        let href = anchor.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            return Err(ExtractionElementError::EmptyLink);
        }
        let link = resolve_link(base_url, href)?;

        if !self.lexicon.matches(&title) {
            return Err(ExtractionElementError::Irrelevant);
        }

        Ok(ArticleRecord {
            title,
            link,
            excerpt: excerpt_of(element),
            published_at: date_of(element),
            source: source_label.to_string(),
        })
    }

    fn locate_title_and_anchor<'a>(
        &self,
        element: ElementRef<'a>,
    ) -> Result<(ElementRef<'a>, ElementRef<'a>), ExtractionElementError> {
        if self.is_heading(element) {
            let anchor = first_descendant(element, &ANCHOR).ok_or(ExtractionElementError::NoAnchor)?;
            return Ok((element, anchor));
        }
        if let Some(heading) = first_descendant(element, &self.heading_selector) {
            let anchor = first_descendant(heading, &ANCHOR).ok_or(ExtractionElementError::NoAnchor)?;
            return Ok((heading, anchor));
        }
        let anchor = first_descendant(element, &ANCHOR).ok_or(ExtractionElementError::NoAnchor)?;
        let parent = anchor
            .parent()
            .and_then(ElementRef::wrap)
            .ok_or(ExtractionElementError::NoTitleElement)?;
        Ok((parent, anchor))
    }

    fn is_heading(&self, element: ElementRef<'_>) -> bool {
        let name = element.value().name();
        self.headings.iter().any(|h| h == name)
    }
}

/// First match strictly below `element`.
fn first_descendant<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).find(|d| d.id() != element.id())
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Resolve `href` against the page URL. Absolute links come back unchanged.
///
/// Only http(s) links count. A link back to the listing page itself (`#`,
/// `#top`, an empty query) is rejected too.
pub fn resolve_link(base_url: &Url, href: &str) -> Result<String, ExtractionElementError> {
    let unresolvable = || ExtractionElementError::UnresolvableLink(href.to_string());
    let link = base_url.join(href).map_err(|_| unresolvable())?;
    if !matches!(link.scheme(), "http" | "https") {
        return Err(unresolvable());
    }
    if without_fragment(&link) == without_fragment(base_url) {
        return Err(unresolvable());
    }
    Ok(link.into())
}

fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    if url.query() == Some("") {
        url.set_query(None);
    }
    url
}

/// Cut `text` to [`EXCERPT_MAX_CHARS`] characters and append `...`.
///
/// Empty (or whitespace only) text gives an empty excerpt.
pub fn truncate_excerpt(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    let mut excerpt: String = text.chars().take(EXCERPT_MAX_CHARS).collect();
    excerpt.push_str(EXCERPT_ELLIPSIS);
    excerpt
}

/// Text of the first paragraph, falling back to the first text-only div.
fn excerpt_of(element: ElementRef<'_>) -> String {
    let source = first_descendant(element, &PARAGRAPH).or_else(|| {
        element
            .select(&DIV)
            .filter(|d| d.id() != element.id())
            .find(|d| is_text_only(*d))
    });
    source
        .map(|e| truncate_excerpt(&e.text().collect::<String>()))
        .unwrap_or_default()
}

/// True when the element's only child is a single text node.
fn is_text_only(element: ElementRef<'_>) -> bool {
    let mut children = element.children();
    matches!(
        (children.next().map(|c| c.value()), children.next()),
        (Some(Node::Text(_)), None)
    )
}

/// `datetime` of the first `<time>`, else its visible text.
fn date_of(element: ElementRef<'_>) -> String {
    let Some(time) = first_descendant(element, &TIME) else {
        return String::new();
    };
    match time.value().attr("datetime").map(str::trim) {
        Some(dt) if !dt.is_empty() => dt.to_string(),
        _ => time.text().collect::<String>().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEXICON: [&str; 14] = [
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
    ];

    fn extractor(strategies: &[&str]) -> ArticleExtractor {
        let strategies = strategies
            .iter()
            .map(|css| SelectorStrategy::parse("Test", css).unwrap())
            .collect();
        ArticleExtractor::new(
            "Test",
            strategies,
            &["h2".to_string(), "h3".to_string()],
            RelevanceLexicon::new(LEXICON),
        )
        .unwrap()
    }

    fn base() -> Url {
        Url::parse("https://example.com/news/").unwrap()
    }

    #[test]
    fn test_structural_article_resolved_and_labelled() {
        let html = r#"
            <html><body>
              <article class="post-block post-block--image">
                <h2><a href="/news/acme">Acme Raises $50M Series B</a></h2>
                <p>Acme, the maker of everything, raised a big round.</p>
                <time datetime="2024-01-15T10:00:00Z">Jan 15</time>
              </article>
            </body></html>
        "#;
        let records = extractor(&[r#"article[class*="post-block"]"#, "h2"]).extract(
            html,
            &base(),
            "TechCrunch",
            10,
        );
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.title, "Acme Raises $50M Series B");
        assert_eq!(r.link, "https://example.com/news/acme");
        assert_eq!(r.source, "TechCrunch");
        assert_eq!(r.published_at, "2024-01-15T10:00:00Z");
        assert_eq!(r.excerpt, "Acme, the maker of everything, raised a big round....");
    }

    #[test]
    fn test_path_relative_link_resolves_under_base_directory() {
        let html = r#"<article><h3><a href="acme">Acme Raises Seed</a></h3></article>"#;
        let records = extractor(&["article"]).extract(html, &base(), "Test", 5);
        assert_eq!(records[0].link, "https://example.com/news/acme");
    }

    #[test]
    fn test_irrelevant_headline_is_dropped() {
        let html = r#"
            <article class="post-block">
              <h2><a href="/news/logo">Acme Launches New Logo</a></h2>
            </article>
        "#;
        let records = extractor(&[r#"article[class*="post-block"]"#]).extract(
            html,
            &base(),
            "TechCrunch",
            10,
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_first_matching_strategy_wins() {
        // The bare h2 outside the article also has a keyword, but the structural
        // strategy matched first so it is never considered.
        let html = r#"
            <h2><a href="/stray">Stray Funding Headline</a></h2>
            <article class="post-block"><h2><a href="/a">Alpha Raises Seed Round</a></h2></article>
        "#;
        let records =
            extractor(&[r#"article[class*="post-block"]"#, "h2"]).extract(html, &base(), "T", 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Alpha Raises Seed Round");
    }

    #[test]
    fn test_falls_back_to_generic_headings() {
        let html = r#"
            <div class="river">
              <h3><a href="https://other.example/beta">Beta Closes $10M Series A</a></h3>
              <h3><a href="/gamma">Gamma hires a CFO</a></h3>
            </div>
        "#;
        let records =
            extractor(&[r#"article[class*="post-block"]"#, "h2", "h3"]).extract(html, &base(), "T", 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link, "https://other.example/beta");
        assert_eq!(records[0].excerpt, "");
        assert_eq!(records[0].published_at, "");
    }

    #[test]
    fn test_anchor_parent_is_title_when_no_heading() {
        let html = r#"
            <article>
              <span class="headline"><a href="/delta">Delta raises $5M</a> exclusive</span>
            </article>
        "#;
        let records = extractor(&["article"]).extract(html, &base(), "T", 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Delta raises $5M exclusive");
        assert_eq!(records[0].link, "https://example.com/delta");
    }

    #[test]
    fn test_heading_without_anchor_is_skipped() {
        let html = r#"
            <article><h2>Epsilon Raises Nothing Linkable</h2><a href="/e">read</a></article>
            <article><h2><a href="/z">Zeta Raises $1M</a></h2></article>
        "#;
        let records = extractor(&["article"]).extract(html, &base(), "T", 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link, "https://example.com/z");
    }

    #[test]
    fn test_empty_href_and_empty_title_are_skipped() {
        let html = r#"
            <article><h2><a href="">Eta Raises $1M</a></h2></article>
            <article><h2><a href="/theta">   </a></h2></article>
            <article><h2><a>Iota Raises $2M</a></h2></article>
        "#;
        let records = extractor(&["article"]).extract(html, &base(), "T", 10);
        assert!(records.is_empty());
    }

    #[test]
    fn test_resolve_link_rejects_non_web_and_self_links() {
        for href in ["#", "#comments", "?", "javascript:void(0)", "mailto:tips@example.com"] {
            assert_eq!(
                resolve_link(&base(), href),
                Err(ExtractionElementError::UnresolvableLink(href.to_string())),
                "{href}"
            );
        }
        assert_eq!(
            resolve_link(&base(), "https://example.com/news/#latest"),
            Err(ExtractionElementError::UnresolvableLink(
                "https://example.com/news/#latest".to_string()
            ))
        );
        assert_eq!(
            resolve_link(&base(), "acme#comments").unwrap(),
            "https://example.com/news/acme#comments"
        );
    }

    #[test]
    fn test_placeholder_anchors_are_skipped() {
        let html = r##"
            <article><h2><a href="#">Funding roundup</a></h2></article>
            <article><h2><a href="javascript:void(0)">Omega Raises $3M</a></h2></article>
            <article><h2><a href="mailto:tips@example.com">Send funding tips</a></h2></article>
            <article><h2><a href="/mu">Mu Raises Seed</a></h2></article>
        "##;
        let records = extractor(&["article"]).extract(html, &base(), "T", 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link, "https://example.com/mu");
    }

    #[test]
    fn test_duplicate_links_keep_first() {
        let html = r#"
            <article><h2><a href="/same">Kappa Raises Series A</a></h2></article>
            <article><h2><a href="https://example.com/same">Kappa Raises Series A (update)</a></h2></article>
            <article><h2><a href="/other">Lambda Raises Seed</a></h2></article>
        "#;
        let records = extractor(&["article"]).extract(html, &base(), "T", 10);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Kappa Raises Series A");
        assert_eq!(records[1].title, "Lambda Raises Seed");
    }

    #[test]
    fn test_max_results_caps_output() {
        let html: String = (0..10)
            .map(|i| format!(r#"<article><h2><a href="/a{i}">Startup {i} raises</a></h2></article>"#))
            .collect();
        let records = extractor(&["article"]).extract(&html, &base(), "T", 3);
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].link, "https://example.com/a2");
    }

    #[test]
    fn test_candidates_limited_to_twice_max_results() {
        // First four candidates are irrelevant; with max 2 only four are looked at.
        let mut html: String = (0..4)
            .map(|i| format!(r#"<article><h2><a href="/n{i}">Nothing {i}</a></h2></article>"#))
            .collect();
        html.push_str(r#"<article><h2><a href="/late">Late Raises</a></h2></article>"#);
        let records = extractor(&["article"]).extract(&html, &base(), "T", 2);
        assert!(records.is_empty());
    }

    #[test]
    fn test_zero_max_results_returns_nothing() {
        let html = r#"<article><h2><a href="/x">X raises</a></h2></article>"#;
        assert!(extractor(&["article"]).extract(html, &base(), "T", 0).is_empty());
    }

    #[test]
    fn test_excerpt_falls_back_to_text_only_div() {
        let html = r#"
            <article>
              <h2><a href="/mu">Mu Raises Series C</a></h2>
              <div class="meta"><span>by someone</span></div>
              <div class="summary">Mu builds robots.</div>
            </article>
        "#;
        let records = extractor(&["article"]).extract(html, &base(), "T", 10);
        assert_eq!(records[0].excerpt, "Mu builds robots....");
    }

    #[test]
    fn test_time_text_used_without_datetime() {
        let html = r#"
            <article><h2><a href="/nu">Nu Raises Seed</a></h2><time> 3 hours ago </time></article>
        "#;
        let records = extractor(&["article"]).extract(html, &base(), "T", 10);
        assert_eq!(records[0].published_at, "3 hours ago");
    }

    #[test]
    fn test_whitespace_in_title_collapsed() {
        let html = "<article><h2><a href=\"/xi\">\n  Xi   Raises\n  $3M  </a></h2></article>";
        let records = extractor(&["article"]).extract(html, &base(), "T", 10);
        assert_eq!(records[0].title, "Xi Raises $3M");
    }

    #[test]
    fn test_malformed_html_does_not_panic() {
        let html = "<article><h2><a href='/o'>Omicron raises <b>big<article><p>unterminated";
        let records = extractor(&["article", "h2"]).extract(html, &base(), "T", 10);
        assert!(records.iter().all(|r| !r.title.is_empty()));
    }

    #[test]
    fn test_truncate_excerpt_limits() {
        let long = "x".repeat(500);
        let excerpt = truncate_excerpt(&long);
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS + 3);
        assert!(excerpt.ends_with("..."));
        assert_eq!(truncate_excerpt("   "), "");
        assert_eq!(truncate_excerpt("short"), "short...");
    }

    #[test]
    fn test_truncate_excerpt_counts_chars_not_bytes() {
        let text = "é".repeat(300);
        assert_eq!(truncate_excerpt(&text).chars().count(), 203);
    }

    #[test]
    fn test_lexicon_is_case_insensitive_substring() {
        let lexicon = RelevanceLexicon::new(["Raises", " vc "]);
        assert_eq!(lexicon.0, ["raises", "vc"]);
        assert!(lexicon.matches("ACME RAISES"));
        assert!(lexicon.matches("Top VCs of the year"));
        assert!(!lexicon.matches("Acme Launches New Logo"));
    }

    #[test]
    fn test_invalid_selector_is_configuration_error() {
        let err = SelectorStrategy::parse("Broken", "article[").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSelector { .. }));
    }

    #[test]
    fn test_extracted_records_hold_invariants() {
        let html = r#"
            <article><h2><a href="/p1">Pi Raises $1M</a></h2><p>x</p></article>
            <article><h2><a href="p2">Rho Venture Round</a></h2><p>y</p></article>
            <article><h2><a href="//cdn.example.org/p3">Sigma Seed Funding</a></h2></article>
        "#;
        let ex = extractor(&["article"]);
        let records = ex.extract(html, &base(), "T", 10);
        assert_eq!(records.len(), 3);
        let mut links = HashSet::new();
        for r in &records {
            assert!(!r.title.is_empty());
            assert!(Url::parse(&r.link).is_ok(), "not absolute: {}", r.link);
            assert!(links.insert(r.link.clone()));
            assert!(ex.lexicon.matches(&r.title));
            assert!(r.excerpt.is_empty() || r.excerpt.chars().count() <= 203);
        }
        assert_eq!(records[2].link, "https://cdn.example.org/p3");
    }
}
