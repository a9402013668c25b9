//! Page fetching with browser-like headers.
//!
//! News sites tend to reject obvious bots, so every request carries the header
//! set of a desktop Chrome. One [`HttpFetcher`] (and so one connection pool) is
//! shared by all sources of a run.

use crate::error::{ConfigurationError, FetchError};
use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, HeaderMap, HeaderName, HeaderValue,
    UPGRADE_INSECURE_REQUESTS,
};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Timeout of the reachability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout of a content fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// A fetched page body and the status it was served with.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub body: Vec<u8>,
    pub status: u16,
}

impl FetchedPage {
    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Something that can check and download pages.
///
/// [`HttpFetcher`] is the real implementation; the scraper tests serve canned
/// HTML through their own.
pub trait PageFetcher {
    /// Quick check that `url` answers with HTTP 200.
    async fn probe(&self, url: &str) -> bool;

    /// Download `url`, failing on network errors, timeouts and non-2xx statuses.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError>;
}

/// `reqwest`-backed [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, ConfigurationError> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(browser_headers())
            .build()
            .map_err(ConfigurationError::HttpClient)?;
        Ok(Self { client })
    }
}

/// Headers sent with every request besides the user agent.
///
/// `Accept-Encoding` is left to reqwest, which advertises gzip, deflate and
/// brotli and decodes the body accordingly.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn probe(&self, url: &str) -> bool {
        match self.client.get(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(resp) => {
                let ok = resp.status().as_u16() == 200;
                debug!(status = resp.status().as_u16(), ok, "Probe answered");
                ok
            }
            Err(e) => {
                debug!(error = %e, "Probe failed");
                false
            }
        }
    }

    #[instrument(level = "info", skip(self, timeout))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(FetchedPage {
            body: body.to_vec(),
            status: status.as_u16(),
        })
    }
}
