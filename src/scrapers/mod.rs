//! Funding news sources and the policy that combines them.
//!
//! Everything site specific lives in a [`SourceConfig`] record: the label,
//! candidate listing URLs, selector strategies, heading tags, keyword lexicon
//! and the share of the article budget. Layout drift is fixed by editing a
//! record (or a `sources.yaml`), never by writing a new scraper.
//!
//! # Built-in sources
//!
//! | Source | Module | Budget |
//! |--------|--------|--------|
//! | TechCrunch | [`techcrunch`] | `num_articles` |
//! | VentureBeat | [`venturebeat`] | `min(num_articles / 2, 5)` |
//!
//! # Flow
//!
//! 1. [`SourceScraper::scrape`] walks a source's candidate URLs, most targeted
//!    first, and stops at the first one that yields an article
//! 2. [`Aggregator::aggregate`] concatenates the sources in order and falls
//!    back to [`sample`] data when nothing was found

pub mod sample;
pub mod techcrunch;
pub mod venturebeat;

use crate::error::ConfigurationError;
use crate::extract::{ArticleExtractor, RelevanceLexicon, SelectorStrategy};
use crate::http::{FETCH_TIMEOUT, PageFetcher};
use crate::models::{ArticleRecord, Corpus};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Site knowledge for one news source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Value of `source` on every record from this site.
    pub label: String,
    /// Listing pages in priority order, homepage last.
    pub candidate_urls: Vec<String>,
    /// CSS selectors in priority order, most structural first.
    pub selector_strategies: Vec<String>,
    /// Tag names treated as headlines.
    pub headings: Vec<String>,
    /// Funding keywords; a headline needs at least one.
    pub keywords: Vec<String>,
    /// The source takes `num_articles / limit_divisor` articles...
    #[serde(default = "default_divisor")]
    pub limit_divisor: usize,
    /// ...but never more than this.
    #[serde(default)]
    pub limit_cap: Option<usize>,
}

fn default_divisor() -> usize {
    1
}

impl SourceConfig {
    /// How many articles this source may contribute out of `num_articles`.
    pub fn limit_for(&self, num_articles: usize) -> usize {
        let share = num_articles / self.limit_divisor.max(1);
        match self.limit_cap {
            Some(cap) => share.min(cap),
            None => share,
        }
    }
}

/// TechCrunch then VentureBeat.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![techcrunch::config(), venturebeat::config()]
}

/// Read source definitions from a YAML list of [`SourceConfig`].
pub async fn load_sources(path: &Path) -> Result<Vec<SourceConfig>, ConfigurationError> {
    let to_err = |reason: String| ConfigurationError::SourcesFile {
        path: path.display().to_string(),
        reason,
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| to_err(e.to_string()))?;
    let sources: Vec<SourceConfig> =
        serde_yaml::from_str(&raw).map_err(|e| to_err(e.to_string()))?;
    if sources.is_empty() {
        return Err(to_err("no sources defined".to_string()));
    }
    Ok(sources)
}

/// A compiled [`SourceConfig`], ready to scrape.
#[derive(Debug, Clone)]
pub struct SourceScraper {
    config: SourceConfig,
    candidate_urls: Vec<Url>,
    extractor: ArticleExtractor,
}

impl SourceScraper {
    /// Compile the selectors and parse the URLs of `config`.
    pub fn new(config: SourceConfig) -> Result<Self, ConfigurationError> {
        let candidate_urls = config
            .candidate_urls
            .iter()
            .map(|u| {
                Url::parse(u).map_err(|e| ConfigurationError::InvalidUrl {
                    url: u.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let strategies = config
            .selector_strategies
            .iter()
            .map(|css| SelectorStrategy::parse(&config.label, css))
            .collect::<Result<Vec<_>, _>>()?;
        let extractor = ArticleExtractor::new(
            &config.label,
            strategies,
            &config.headings,
            RelevanceLexicon::new(&config.keywords),
        )?;
        Ok(Self {
            config,
            candidate_urls,
            extractor,
        })
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Scrape up to `max_results` articles, trying candidate URLs in order.
    ///
    /// Unreachable pages and failed fetches move on to the next URL. The
    /// first URL that yields any article ends the search. An empty result
    /// means nothing was found; it is never an error.
    #[instrument(level = "info", skip(self, fetcher), fields(source = %self.config.label))]
    pub async fn scrape<F: PageFetcher>(
        &self,
        fetcher: &F,
        max_results: usize,
    ) -> Vec<ArticleRecord> {
        if max_results == 0 {
            return Vec::new();
        }
        for url in &self.candidate_urls {
            info!(%url, "Trying listing page");
            if !fetcher.probe(url.as_str()).await {
                warn!(%url, "Listing page unreachable; trying next");
                continue;
            }
            let page = match fetcher.fetch(url.as_str(), FETCH_TIMEOUT).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(%url, error = %e, "Fetch failed; trying next");
                    continue;
                }
            };
            debug!(%url, status = page.status, bytes = page.body.len(), "Listing page fetched");
            let html = page.text();
            let articles = self
                .extractor
                .extract(&html, url, &self.config.label, max_results);
            if !articles.is_empty() {
                info!(%url, count = articles.len(), "Scraped funding articles");
                return articles;
            }
            info!(%url, "No funding articles on page");
        }
        warn!("No candidate URL yielded articles");
        Vec::new()
    }
}

/// Combines every source into one non-empty [`Corpus`].
#[derive(Debug)]
pub struct Aggregator<'a, F> {
    fetcher: &'a F,
    scrapers: &'a [SourceScraper],
    /// Pause between two sources when scraping one after the other.
    source_delay: Duration,
    /// Scrape all sources at once instead of one after the other.
    parallel: bool,
}

impl<'a, F: PageFetcher> Aggregator<'a, F> {
    pub fn new(fetcher: &'a F, scrapers: &'a [SourceScraper]) -> Self {
        Self {
            fetcher,
            scrapers,
            source_delay: Duration::from_secs(2),
            parallel: false,
        }
    }

    pub fn with_source_delay(mut self, delay: Duration) -> Self {
        self.source_delay = delay;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Build the corpus for one run.
    ///
    /// With `use_sample` set no request is made and the sample set is
    /// returned. Otherwise sources are concatenated in their configured
    /// order; if all of them come back empty the sample set is used instead.
    #[instrument(level = "info", skip(self))]
    pub async fn aggregate(&self, num_articles: usize, use_sample: bool) -> Corpus {
        if use_sample {
            info!(version = sample::SAMPLE_DATA_VERSION, "Using sample funding data");
            return sample::corpus();
        }

        let per_source = if self.parallel {
            join_all(
                self.scrapers
                    .iter()
                    .map(|s| s.scrape(self.fetcher, s.config().limit_for(num_articles))),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(self.scrapers.len());
            for (i, scraper) in self.scrapers.iter().enumerate() {
                if i > 0 && !self.source_delay.is_zero() {
                    tokio::time::sleep(self.source_delay).await;
                }
                let limit = scraper.config().limit_for(num_articles);
                results.push(scraper.scrape(self.fetcher, limit).await);
            }
            results
        };

        for (scraper, articles) in self.scrapers.iter().zip(&per_source) {
            info!(source = scraper.label(), count = articles.len(), "Source finished");
        }

        let articles: Vec<ArticleRecord> = per_source.into_iter().flatten().collect();
        if articles.is_empty() {
            warn!(
                version = sample::SAMPLE_DATA_VERSION,
                "Scraping found no articles; using sample data instead"
            );
            return sample::corpus();
        }
        info!(count = articles.len(), "Aggregated funding articles");
        Corpus::new(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::http::FetchedPage;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Serves canned pages and records every request.
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, String>,
        unreachable: Vec<String>,
        failing: Vec<String>,
        log: Mutex<Vec<String>>,
        /// Every request with the (tokio) time it was made.
        timed: Mutex<Vec<(String, Instant)>>,
        /// Timeout passed to each fetch.
        timeouts: Mutex<Vec<Duration>>,
    }

    impl StubFetcher {
        fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.log
                .lock()
                .unwrap()
                .iter()
                .filter_map(|l| l.strip_prefix("fetch ").map(str::to_string))
                .collect()
        }

        fn record(&self, entry: String) {
            self.timed.lock().unwrap().push((entry.clone(), Instant::now()));
            self.log.lock().unwrap().push(entry);
        }

        /// Time of the first and last request whose URL starts with `prefix`.
        fn window(&self, prefix: &str) -> (Instant, Instant) {
            let timed = self.timed.lock().unwrap();
            let times: Vec<Instant> = timed
                .iter()
                .filter(|(entry, _)| {
                    entry
                        .split_once(' ')
                        .is_some_and(|(_, url)| url.starts_with(prefix))
                })
                .map(|(_, at)| *at)
                .collect();
            (times[0], times[times.len() - 1])
        }
    }

    impl PageFetcher for StubFetcher {
        async fn probe(&self, url: &str) -> bool {
            self.record(format!("probe {url}"));
            !self.unreachable.iter().any(|u| u == url)
        }

        async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
            self.record(format!("fetch {url}"));
            self.timeouts.lock().unwrap().push(timeout);
            if self.failing.iter().any(|u| u == url) {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: 503,
                });
            }
            let body = self.pages.get(url).cloned().unwrap_or_default();
            Ok(FetchedPage {
                body: body.into_bytes(),
                status: 200,
            })
        }
    }

    fn funding_page(prefix: &str, n: usize) -> String {
        (0..n)
            .map(|i| {
                format!(
                    r#"<article class="post-block"><h2><a href="/{prefix}/{i}">{prefix} {i} raises $10M</a></h2></article>"#
                )
            })
            .collect()
    }

    fn scrapers() -> Vec<SourceScraper> {
        default_sources()
            .into_iter()
            .map(|c| SourceScraper::new(c).unwrap())
            .collect()
    }

    #[test]
    fn test_limits_follow_source_budget() {
        let tc = techcrunch::config();
        let vb = venturebeat::config();
        assert_eq!(tc.limit_for(10), 10);
        assert_eq!(vb.limit_for(10), 5);
        assert_eq!(vb.limit_for(25), 5);
        assert_eq!(vb.limit_for(5), 2);
    }

    #[test]
    fn test_default_sources_compile() {
        let scrapers = scrapers();
        assert_eq!(scrapers.len(), 2);
        assert_eq!(scrapers[0].label(), "TechCrunch");
        assert_eq!(scrapers[1].label(), "VentureBeat");
    }

    #[tokio::test]
    async fn test_first_productive_url_stops_escalation() {
        let scraper = &scrapers()[0];
        let fetcher = StubFetcher::default()
            .page("https://techcrunch.com/category/startups/", &funding_page("tc", 3));
        let articles = scraper.scrape(&fetcher, 10).await;
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].link, "https://techcrunch.com/tc/0");
        assert_eq!(
            fetcher.fetched(),
            vec!["https://techcrunch.com/category/startups/".to_string()]
        );
        assert_eq!(*fetcher.timeouts.lock().unwrap(), vec![FETCH_TIMEOUT]);
        assert_eq!(FETCH_TIMEOUT, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_unreachable_and_failing_urls_fall_through() {
        let scraper = &scrapers()[0];
        let mut fetcher = StubFetcher::default()
            .page("https://techcrunch.com/", &funding_page("home", 2));
        fetcher.unreachable = vec!["https://techcrunch.com/category/startups/".to_string()];
        fetcher.failing = vec!["https://techcrunch.com/tag/funding/".to_string()];

        let articles = scraper.scrape(&fetcher, 10).await;
        assert_eq!(articles.len(), 2);
        assert_eq!(
            fetcher.fetched(),
            vec![
                "https://techcrunch.com/tag/funding/".to_string(),
                "https://techcrunch.com/".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_page_without_funding_news_escalates() {
        let scraper = &scrapers()[0];
        let fetcher = StubFetcher::default()
            .page(
                "https://techcrunch.com/category/startups/",
                r#"<article class="post-block"><h2><a href="/x">Acme Launches New Logo</a></h2></article>"#,
            )
            .page("https://techcrunch.com/tag/funding/", &funding_page("tag", 1));
        let articles = scraper.scrape(&fetcher, 10).await;
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].link, "https://techcrunch.com/tag/0");
    }

    #[tokio::test]
    async fn test_nothing_anywhere_is_empty_not_error() {
        let scraper = &scrapers()[1];
        let fetcher = StubFetcher::default();
        assert!(scraper.scrape(&fetcher, 5).await.is_empty());
        assert_eq!(fetcher.fetched().len(), 3);
    }

    #[tokio::test]
    async fn test_aggregate_concatenates_in_source_order() {
        let scrapers = scrapers();
        let fetcher = StubFetcher::default()
            .page("https://techcrunch.com/category/startups/", &funding_page("tc", 12))
            .page("https://venturebeat.com/category/deals/", &funding_page("vb", 12));
        let corpus = Aggregator::new(&fetcher, &scrapers)
            .with_source_delay(Duration::ZERO)
            .aggregate(10, false)
            .await;
        assert_eq!(corpus.len(), 15);
        assert!(corpus.articles()[..10].iter().all(|a| a.source == "TechCrunch"));
        assert!(corpus.articles()[10..].iter().all(|a| a.source == "VentureBeat"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_sources_are_spaced_by_delay() {
        let scrapers = scrapers();
        let fetcher = StubFetcher::default()
            .page("https://techcrunch.com/category/startups/", &funding_page("tc", 2))
            .page("https://venturebeat.com/category/deals/", &funding_page("vb", 2));
        let start = Instant::now();
        let corpus = Aggregator::new(&fetcher, &scrapers).aggregate(10, false).await;
        assert_eq!(corpus.len(), 4);

        let (tc_first, tc_last) = fetcher.window("https://techcrunch.com/");
        let (vb_first, _) = fetcher.window("https://venturebeat.com/");
        assert_eq!(tc_first.duration_since(start), Duration::ZERO);
        assert!(vb_first.duration_since(tc_last) >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_delay_is_used() {
        let scrapers = scrapers();
        let fetcher = StubFetcher::default()
            .page("https://techcrunch.com/category/startups/", &funding_page("tc", 1))
            .page("https://venturebeat.com/category/deals/", &funding_page("vb", 1));
        Aggregator::new(&fetcher, &scrapers)
            .with_source_delay(Duration::from_secs(7))
            .aggregate(10, false)
            .await;

        let (_, tc_last) = fetcher.window("https://techcrunch.com/");
        let (vb_first, _) = fetcher.window("https://venturebeat.com/");
        let gap = vb_first.duration_since(tc_last);
        assert!(gap >= Duration::from_secs(7) && gap < Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_sources_are_not_delayed() {
        let scrapers = scrapers();
        let fetcher = StubFetcher::default()
            .page("https://techcrunch.com/category/startups/", &funding_page("tc", 1))
            .page("https://venturebeat.com/category/deals/", &funding_page("vb", 1));
        let start = Instant::now();
        Aggregator::new(&fetcher, &scrapers)
            .with_parallel(true)
            .aggregate(10, false)
            .await;

        let (vb_first, _) = fetcher.window("https://venturebeat.com/");
        assert_eq!(vb_first.duration_since(start), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_parallel_aggregate_keeps_source_order() {
        let scrapers = scrapers();
        let fetcher = StubFetcher::default()
            .page("https://techcrunch.com/category/startups/", &funding_page("tc", 2))
            .page("https://venturebeat.com/category/deals/", &funding_page("vb", 2));
        let corpus = Aggregator::new(&fetcher, &scrapers)
            .with_parallel(true)
            .aggregate(10, false)
            .await;
        let sources: Vec<_> = corpus.articles().iter().map(|a| a.source.as_str()).collect();
        assert_eq!(sources, ["TechCrunch", "TechCrunch", "VentureBeat", "VentureBeat"]);
    }

    #[tokio::test]
    async fn test_empty_sources_fall_back_to_sample() {
        let scrapers = scrapers();
        let mut fetcher = StubFetcher::default();
        fetcher.unreachable = scrapers
            .iter()
            .flat_map(|s| s.config().candidate_urls.clone())
            .collect();
        let corpus = Aggregator::new(&fetcher, &scrapers)
            .with_source_delay(Duration::ZERO)
            .aggregate(10, false)
            .await;
        assert!(corpus.len() >= 5);
        assert!(corpus.articles().iter().all(|a| a.source == "Sample Data"));
        assert!(fetcher.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_sample_override_makes_no_requests() {
        let scrapers = scrapers();
        let fetcher = StubFetcher::default();
        let corpus = Aggregator::new(&fetcher, &scrapers).aggregate(10, true).await;
        assert_eq!(corpus, sample::corpus());
        assert!(fetcher.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_never_empty() {
        let scrapers = scrapers();
        let fetcher = StubFetcher::default();
        for num in [0, 1, 5, 25] {
            for use_sample in [false, true] {
                let corpus = Aggregator::new(&fetcher, &scrapers)
                    .with_source_delay(Duration::ZERO)
                    .aggregate(num, use_sample)
                    .await;
                assert!(!corpus.is_empty());
            }
        }
    }

    #[tokio::test]
    async fn test_load_sources_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.yaml");
        std::fs::write(
            &path,
            r#"
- label: Example Wire
  candidate_urls: ["https://wire.example/funding/"]
  selector_strategies: ["li.story", "h2"]
  headings: [h2]
  keywords: [raises, funding]
  limit_cap: 3
"#,
        )
        .unwrap();
        let sources = load_sources(&path).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].limit_divisor, 1);
        assert_eq!(sources[0].limit_for(10), 3);
        assert!(SourceScraper::new(sources[0].clone()).is_ok());
    }

    #[tokio::test]
    async fn test_bad_source_definitions_are_configuration_errors() {
        let mut config = techcrunch::config();
        config.candidate_urls.push("not a url".to_string());
        assert!(matches!(
            SourceScraper::new(config),
            Err(ConfigurationError::InvalidUrl { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(
            load_sources(&path).await,
            Err(ConfigurationError::SourcesFile { .. })
        ));
        assert!(matches!(
            load_sources(&dir.path().join("missing.yaml")).await,
            Err(ConfigurationError::SourcesFile { .. })
        ));
    }
}
