//! Text generation backends with timeout and exponential backoff.
//!
//! The analysis pipeline only needs "prompt in, text out". This module
//! provides that capability behind the [`AskAsync`] trait:
//!
//! - [`OllamaGenerator`]: a local Ollama server (`/api/generate`)
//! - [`AwfulJadeGenerator`]: any OpenAI-compatible endpoint configured through
//!   `awful_aj`'s `config.yaml` and a chat template
//! - [`Generator`]: the backend picked on the command line
//! - [`TimeoutAsk`] and [`RetryAsk`]: decorators the host wraps around it
//!
//! # Retry Strategy
//!
//! - Configurable number of retries (2 by default)
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::error::{ConfigurationError, GenerationError};
use awful_aj::api::ask;
use awful_aj::{config, config::AwfulJadeConfig, config_dir, template, template::ChatTemplate};
use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{error, info, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors of this trait can send text to an LLM and receive a response.
/// This abstraction allows for different LLM backends or decorators (like retry logic).
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, GenerationError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Wrap `inner`; `max_retries` of 0 means a single attempt.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, GenerationError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let shift = (attempt - 1).min(16) as u32;
                    let mut delay = self.base_delay.saturating_mul(1u32 << shift);
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Bounds every call of the wrapped generator.
#[derive(Debug)]
pub struct TimeoutAsk<T> {
    inner: T,
    limit: StdDuration,
}

impl<T> TimeoutAsk<T> {
    pub fn new(inner: T, limit: StdDuration) -> Self {
        Self { inner, limit }
    }
}

impl<T: AskAsync> AskAsync for TimeoutAsk<T> {
    type Response = T::Response;

    async fn ask(&self, text: &str) -> Result<Self::Response, GenerationError> {
        match timeout(self.limit, self.inner.ask(text)).await {
            Ok(res) => res,
            Err(_) => Err(GenerationError::Timeout(self.limit.as_secs())),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Generator backed by a local Ollama server.
pub struct OllamaGenerator {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    /// `host` is the server root, e.g. `http://localhost:11434`.
    pub fn new(host: &str, model: &str) -> Result<Self, ConfigurationError> {
        // A trailing slash keeps a path prefix such as `/ollama` when joining.
        let root = format!("{}/", host.trim().trim_end_matches('/'));
        let base = url::Url::parse(&root).map_err(|e| ConfigurationError::InvalidUrl {
            url: host.to_string(),
            reason: e.to_string(),
        })?;
        let endpoint = base
            .join("api/generate")
            .map_err(|e| ConfigurationError::InvalidUrl {
                url: host.to_string(),
                reason: e.to_string(),
            })?;
        if model.trim().is_empty() {
            return Err(ConfigurationError::Generator(
                "an Ollama model name is required".to_string(),
            ));
        }
        let client = Client::builder()
            .build()
            .map_err(ConfigurationError::HttpClient)?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.trim().to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for OllamaGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaGenerator")
            .field("client", &"<reqwest::Client>")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl AskAsync for OllamaGenerator {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, GenerationError> {
        let t0 = Instant::now();
        let body = GenerateRequest {
            model: &self.model,
            prompt: text,
            stream: false,
        };
        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            warn!(status = status.as_u16(), "Ollama returned an error status");
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = parsed.response.len(),
            "Ollama answered"
        );
        Ok(parsed.response)
    }
}

/// Generator backed by `awful_aj`: an OpenAI-compatible API plus a chat template.
pub struct AwfulJadeGenerator {
    /// LLM configuration (API keys, endpoints, model settings).
    config: AwfulJadeConfig,
    /// Chat template defining the conversation structure.
    template: ChatTemplate,
    template_name: String,
    /// Model named in `config.yaml`.
    model: String,
}

impl AwfulJadeGenerator {
    /// Load `config.yaml` (from `config_path`, or awful_aj's config directory)
    /// and the chat template named `template_name`.
    pub async fn load(
        config_path: Option<&Path>,
        template_name: &str,
    ) -> Result<Self, ConfigurationError> {
        let to_err = |e: &dyn fmt::Display| ConfigurationError::Generator(e.to_string());

        let conf_file = match config_path {
            Some(p) => p.to_path_buf(),
            None => config_dir().map_err(|e| to_err(&e))?.join("config.yaml"),
        };
        let conf_str = conf_file.to_str().ok_or_else(|| {
            ConfigurationError::Generator(format!("not a valid config filename: {:?}", conf_file))
        })?;
        let config = config::load_config(conf_str).map_err(|e| to_err(&e))?;
        let model = config.model.clone();
        info!(config_path = conf_str, %model, "Loaded awful_aj configuration");

        let template = template::load_template(template_name)
            .await
            .map_err(|e| to_err(&e))?;
        info!(template = template_name, "Loaded template");

        Ok(Self {
            config,
            template,
            template_name: template_name.to_string(),
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for AwfulJadeGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwfulJadeGenerator")
            .field("template_name", &self.template_name)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AskAsync for AwfulJadeGenerator {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, GenerationError> {
        let t0 = Instant::now();
        let res = ask(&self.config, text.to_string(), &self.template, None, None).await;
        let dt = t0.elapsed();

        match res {
            Ok(answer) => Ok(answer),
            Err(e) => {
                warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "API call failed");
                Err(GenerationError::Backend(e.to_string()))
            }
        }
    }
}

/// The backend chosen for this run.
#[derive(Debug)]
pub enum Generator {
    Ollama(OllamaGenerator),
    AwfulJade(AwfulJadeGenerator),
}

impl Generator {
    /// Backend and model for logs and reports, e.g. `ollama/llama3.2`.
    pub fn describe(&self) -> String {
        match self {
            Generator::Ollama(g) => describe_model("ollama", g.model()),
            Generator::AwfulJade(g) => describe_model("awful_jade", g.model()),
        }
    }
}

fn describe_model(backend: &str, model: &str) -> String {
    let model = model.trim();
    if model.is_empty() {
        format!("{backend}/unknown-model")
    } else {
        format!("{backend}/{model}")
    }
}

impl AskAsync for Generator {
    type Response = String;

    async fn ask(&self, text: &str) -> Result<Self::Response, GenerationError> {
        match self {
            Generator::Ollama(g) => g.ask(text).await,
            Generator::AwfulJade(g) => g.ask(text).await,
        }
    }
}
