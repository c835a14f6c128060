//! Extraction service client
//!
//! Wraps the remote crawl API: one POST starts a crawl job, then
//! [`CrawlStream`] polls job status and yields pages as they arrive.
//! All rendering, link discovery, and markdown conversion happens
//! server-side; this module only moves requests and results.

use crate::error::Error;
use crate::types::{CrawlConfig, CrawlResult, Page, PageFormat};
use crate::DEFAULT_USER_AGENT;
use reqwest::header::{HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default extraction service endpoint
pub const DEFAULT_API_URL: &str = "https://api.firecrawl.dev";

/// Connect timeout for service calls
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Total timeout per service call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the extraction service
///
/// Explicit configuration object; the client never reads ambient state.
/// Use [`ClientConfig::from_env`] to opt into environment lookup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key, sent as a bearer token
    pub api_key: String,
    /// Service base URL (no trailing slash)
    pub api_url: String,
    /// Custom User-Agent
    pub user_agent: Option<String>,
}

impl ClientConfig {
    /// Create a config with the default service endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: None,
        }
    }

    /// Override the service base URL
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        let url = api_url.into();
        self.api_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Set a custom User-Agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Read the key from `FIRECRAWL_API_KEY` (and optionally
    /// `FIRECRAWL_API_URL`)
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("FIRECRAWL_API_KEY").map_err(|_| Error::MissingApiKey)?;
        if api_key.is_empty() {
            return Err(Error::MissingApiKey);
        }
        let mut config = Self::new(api_key);
        if let Ok(api_url) = std::env::var("FIRECRAWL_API_URL") {
            if !api_url.is_empty() {
                config = config.api_url(api_url);
            }
        }
        Ok(config)
    }
}

/// Client for the documentation extraction service
pub struct ExtractorClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ClientConfig,
}

impl ExtractorClient {
    /// Build a client from explicit configuration
    ///
    /// Fails with [`Error::MissingApiKey`] for an empty key and
    /// [`Error::ClientBuild`] if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        if config.api_key.is_empty() {
            return Err(Error::MissingApiKey);
        }
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::ClientBuild)?;
        Ok(Self { http, config })
    }

    /// Start a crawl and return the lazy result sequence
    ///
    /// Issues the initial job request. Authentication rejection and
    /// transport failures surface here, before any result is yielded;
    /// everything after that arrives through [`CrawlStream::next`].
    pub async fn crawl(&self, root_url: &str, config: CrawlConfig) -> Result<CrawlStream, Error> {
        validate_root_url(root_url)?;

        let body = CrawlRequestBody {
            url: root_url,
            limit: config.limit,
            max_depth: config.max_depth,
            scrape_options: ScrapeOptions {
                formats: &config.formats,
                wait_for: config.wait_for_ms,
                only_main_content: config.only_main_content,
            },
        };

        let endpoint = format!("{}/v1/crawl", self.config.api_url);
        debug!(url = root_url, limit = config.limit, "Starting crawl job");

        let response = self
            .http
            .post(&endpoint)
            .header(AUTHORIZATION, self.bearer_header()?)
            .header(USER_AGENT, self.user_agent_header())
            .json(&body)
            .send()
            .await
            .map_err(Error::from_reqwest)?;

        let status: CrawlStatusResponse = read_service_response(response).await?;

        let mut stream = CrawlStream {
            http: self.http.clone(),
            api_key: self.config.api_key.clone(),
            user_agent: self.config.user_agent.clone(),
            poll_interval: config.poll_interval,
            limit: config.limit,
            completed_count: 0,
            buffer: VecDeque::new(),
            state: StreamState::Done,
            polled_once: false,
        };

        // The POST either returns the finished crawl inline or hands back
        // a job id to poll.
        if status.status.as_deref() == Some("completed") {
            info!(url = root_url, pages = status.data.len(), "Crawl completed inline");
            stream.ingest_chunk(status);
        } else if let Some(id) = status.id {
            let status_url = format!("{}/v1/crawl/{}", self.config.api_url, id);
            info!(url = root_url, job_id = %id, "Crawl job accepted");
            stream.state = StreamState::Polling { status_url };
        } else {
            return Err(Error::Protocol(
                "crawl response carried neither a job id nor completed data".to_string(),
            ));
        }

        Ok(stream)
    }

    fn bearer_header(&self) -> Result<HeaderValue, Error> {
        bearer_header(&self.config.api_key)
    }

    fn user_agent_header(&self) -> HeaderValue {
        user_agent_header(self.config.user_agent.as_deref())
    }
}

/// Lazy, pull-based sequence of crawl results
///
/// Finite and not restartable. Each [`next`](Self::next) call may block on
/// network I/O. Dropping the stream abandons the crawl locally; files
/// already persisted by the caller are unaffected. A transport error ends
/// the sequence.
pub struct CrawlStream {
    http: reqwest::Client,
    api_key: String,
    user_agent: Option<String>,
    poll_interval: Duration,
    limit: u32,
    completed_count: u32,
    buffer: VecDeque<CrawlResult>,
    state: StreamState,
    polled_once: bool,
}

enum StreamState {
    /// Waiting on the job; sleep then GET the status URL
    Polling { status_url: String },
    /// A completed status pointed at another result chunk
    Paginating { next_url: String },
    /// Terminal; only the buffer remains
    Done,
}

impl CrawlStream {
    /// Pull the next result, or `None` when the crawl is finished
    ///
    /// `Err` items are fatal: the stream yields nothing after one.
    pub async fn next(&mut self) -> Option<Result<CrawlResult, Error>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                if item.is_completed() {
                    // Local cap: never yield more pages than the config asked
                    // for, even if the service over-returns.
                    if self.completed_count >= self.limit {
                        continue;
                    }
                    self.completed_count += 1;
                }
                return Some(Ok(item));
            }

            match std::mem::replace(&mut self.state, StreamState::Done) {
                StreamState::Done => return None,
                StreamState::Paginating { next_url } => {
                    debug!(url = %next_url, "Fetching next result chunk");
                    match self.get_status(&next_url).await {
                        Ok(status) => self.ingest_chunk(status),
                        Err(e) => return Some(Err(e)),
                    }
                }
                StreamState::Polling { status_url } => {
                    if self.polled_once {
                        tokio::time::sleep(self.poll_interval).await;
                    }
                    self.polled_once = true;

                    let status = match self.get_status(&status_url).await {
                        Ok(status) => status,
                        Err(e) => return Some(Err(e)),
                    };

                    match status.status.as_deref() {
                        Some("completed") => self.ingest_chunk(status),
                        Some("failed") => {
                            let reason = status
                                .error
                                .unwrap_or_else(|| "crawl job failed".to_string());
                            warn!(reason = %reason, "Crawl job failed");
                            self.buffer
                                .push_back(CrawlResult::PageError { url: None, reason });
                        }
                        _ => {
                            self.state = StreamState::Polling { status_url };
                            return Some(Ok(CrawlResult::InProgress {
                                total: status.total,
                                completed: status.completed,
                                credits_used: status.credits_used,
                            }));
                        }
                    }
                }
            }
        }
    }

    /// Number of `Completed` results yielded so far
    pub fn completed_count(&self) -> u32 {
        self.completed_count
    }

    /// Queue a chunk's documents and line up pagination or termination
    fn ingest_chunk(&mut self, status: CrawlStatusResponse) {
        for document in status.data {
            self.buffer.push_back(document.into_result());
        }
        self.state = match status.next {
            Some(next_url) => StreamState::Paginating { next_url },
            None => StreamState::Done,
        };
    }

    async fn get_status(&self, url: &str) -> Result<CrawlStatusResponse, Error> {
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, bearer_header(&self.api_key)?)
            .header(USER_AGENT, user_agent_header(self.user_agent.as_deref()))
            .send()
            .await
            .map_err(Error::from_reqwest)?;
        read_service_response(response).await
    }
}

pub(crate) fn validate_root_url(root_url: &str) -> Result<(), Error> {
    let parsed = Url::parse(root_url).map_err(|_| Error::InvalidUrl(root_url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(Error::InvalidUrl(root_url.to_string()));
    }
    Ok(())
}

pub(crate) fn bearer_header(api_key: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|_| Error::Protocol("API key contains invalid header characters".to_string()))
}

pub(crate) fn user_agent_header(user_agent: Option<&str>) -> HeaderValue {
    user_agent
        .and_then(|ua| HeaderValue::from_str(ua).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_USER_AGENT))
}

/// Map a service response to its parsed payload
///
/// 401/403 becomes [`Error::Auth`]; any other non-2xx becomes
/// [`Error::Api`] carrying whatever reason the body offers.
pub(crate) async fn read_service_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, Error> {
    let status = response.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(Error::Auth {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        let message = match response.text().await {
            Ok(body) => extract_error_message(&body),
            Err(_) => status.to_string(),
        };
        return Err(Error::Api {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| Error::Protocol(format!("failed to parse service response: {e}")))
}

/// Pull the `error` field out of a JSON error body, or fall back to raw text
fn extract_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no error detail provided".to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

// Wire format for POST /v1/crawl

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlRequestBody<'a> {
    url: &'a str,
    limit: u32,
    max_depth: u32,
    scrape_options: ScrapeOptions<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeOptions<'a> {
    formats: &'a [PageFormat],
    wait_for: u64,
    only_main_content: bool,
}

/// Shared shape of the job-start and job-status responses
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CrawlStatusResponse {
    id: Option<String>,
    status: Option<String>,
    error: Option<String>,
    next: Option<String>,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    completed: u32,
    #[serde(default)]
    credits_used: u32,
    #[serde(default)]
    data: Vec<WireDocument>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDocument {
    markdown: Option<String>,
    html: Option<String>,
    raw_html: Option<String>,
    #[serde(default)]
    links: Vec<String>,
    #[serde(default)]
    metadata: WireMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata {
    #[serde(default)]
    title: String,
    description: Option<String>,
    language: Option<String>,
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    status_code: Option<u16>,
    error: Option<String>,
}

impl WireDocument {
    /// Turn a service document into a tagged result
    ///
    /// A document reporting a scrape error, a failing status code, or no
    /// usable content becomes a `PageError`; the crawl keeps going.
    fn into_result(self) -> CrawlResult {
        let url = self.metadata.source_url.clone();
        let status_code = self.metadata.status_code.unwrap_or(200);

        if let Some(reason) = self.metadata.error {
            return CrawlResult::PageError { url, reason };
        }
        if status_code >= 400 {
            return CrawlResult::PageError {
                url,
                reason: format!("page scrape returned HTTP {status_code}"),
            };
        }

        // Markdown preferred, HTML fallbacks, links last.
        let (content, format) = if let Some(markdown) = self.markdown {
            (markdown, PageFormat::Markdown)
        } else if let Some(html) = self.html {
            (html, PageFormat::Html)
        } else if let Some(raw_html) = self.raw_html {
            (raw_html, PageFormat::RawHtml)
        } else if !self.links.is_empty() {
            (self.links.join("\n"), PageFormat::Links)
        } else {
            return CrawlResult::PageError {
                url,
                reason: "no content available in any requested format".to_string(),
            };
        };

        CrawlResult::Completed(Page {
            url: url.unwrap_or_default(),
            title: self.metadata.title,
            description: self.metadata.description,
            language: self.metadata.language,
            status_code,
            content,
            format,
        })
    }
}
