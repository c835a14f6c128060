//! Schema-driven documentation extraction
//!
//! The service's second entry point. Instead of crawling page by page, a
//! single job asks the service to pull every documentation page under a
//! root URL into a fixed document schema (title, content, url). One POST
//! starts the job; [`ExtractStream`] polls until the service hands back
//! the complete document set. There is no per-page streaming and no
//! pagination here; the job is all-or-nothing on the service side.

use crate::client::{
    bearer_header, read_service_response, user_agent_header, validate_root_url, ExtractorClient,
};
use crate::error::Error;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Instructions sent with an extract job unless the caller overrides them
pub const DEFAULT_EXTRACT_PROMPT: &str = "Extract every documentation page, capturing the full \
content, title, and URL of each page. Do not lose content or code examples, and do not split \
one page across multiple documents.";

/// Tunable parameters for an extract job
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    /// Natural-language extraction instructions for the service
    pub prompt: String,
    /// Delay between job status polls
    pub poll_interval: Duration,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_EXTRACT_PROMPT.to_string(),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl ExtractConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the extraction instructions
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the status poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// One document extracted by a schema-driven job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDoc {
    /// Page title
    pub title: String,
    /// Source URL of the page
    pub url: String,
    /// Extracted page content
    pub content: String,
}

/// One item pulled from an extract job
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractResult {
    /// Job status update; no documents yet
    InProgress {
        /// Raw status string from the service (e.g. "processing")
        status: String,
    },
    /// A document from the completed job
    Completed(ExtractedDoc),
    /// The whole job failed server-side; nothing follows
    Failed {
        /// Service-supplied failure reason
        reason: String,
    },
}

impl ExtractorClient {
    /// Start a schema-driven extract job over everything under `root_url`
    ///
    /// The root is widened to a `<root>/*` wildcard, matching how the
    /// service scopes extract jobs. Authentication rejection and transport
    /// failures surface here; job progress and documents arrive through
    /// [`ExtractStream::next`].
    pub async fn extract(
        &self,
        root_url: &str,
        config: ExtractConfig,
    ) -> Result<ExtractStream, Error> {
        validate_root_url(root_url)?;
        let wildcard = format!("{}/*", root_url.trim_end_matches('/'));

        let body = ExtractRequestBody {
            urls: vec![wildcard],
            prompt: &config.prompt,
            schema: documentation_schema(),
        };

        let endpoint = format!("{}/v1/extract", self.config.api_url);
        debug!(url = root_url, "Starting extract job");

        let response = self
            .http
            .post(&endpoint)
            .header(AUTHORIZATION, bearer_header(&self.config.api_key)?)
            .header(
                USER_AGENT,
                user_agent_header(self.config.user_agent.as_deref()),
            )
            .json(&body)
            .send()
            .await
            .map_err(Error::from_reqwest)?;

        let status: ExtractStatusResponse = read_service_response(response).await?;

        let mut stream = ExtractStream {
            http: self.http.clone(),
            api_key: self.config.api_key.clone(),
            user_agent: self.config.user_agent.clone(),
            poll_interval: config.poll_interval,
            buffer: VecDeque::new(),
            status_url: None,
            polled_once: false,
        };

        if status.status.as_deref() == Some("completed") {
            info!(
                url = root_url,
                documents = status.data.documentation.len(),
                "Extract completed inline"
            );
            stream.ingest(status);
        } else if let Some(id) = status.id {
            info!(url = root_url, job_id = %id, "Extract job accepted");
            stream.status_url = Some(format!("{}/v1/extract/{}", self.config.api_url, id));
        } else {
            return Err(Error::Protocol(
                "extract response carried neither a job id nor completed data".to_string(),
            ));
        }

        Ok(stream)
    }
}

/// Lazy, pull-based sequence of extract results
///
/// Finite and not restartable, like [`CrawlStream`](crate::CrawlStream).
/// A transport error ends the sequence.
pub struct ExtractStream {
    http: reqwest::Client,
    api_key: String,
    user_agent: Option<String>,
    poll_interval: Duration,
    buffer: VecDeque<ExtractResult>,
    /// Polling target; `None` once the job reached a terminal state
    status_url: Option<String>,
    polled_once: bool,
}

impl ExtractStream {
    /// Pull the next result, or `None` when the job is finished
    ///
    /// `Err` items are fatal: the stream yields nothing after one.
    pub async fn next(&mut self) -> Option<Result<ExtractResult, Error>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }

            let status_url = self.status_url.take()?;

            if self.polled_once {
                tokio::time::sleep(self.poll_interval).await;
            }
            self.polled_once = true;

            let status = match self.get_status(&status_url).await {
                Ok(status) => status,
                Err(e) => return Some(Err(e)),
            };

            match status.status.as_deref() {
                Some("completed") => self.ingest(status),
                Some("failed") => {
                    let reason = status
                        .error
                        .unwrap_or_else(|| "extract job failed".to_string());
                    warn!(reason = %reason, "Extract job failed");
                    self.buffer.push_back(ExtractResult::Failed { reason });
                }
                other => {
                    self.status_url = Some(status_url);
                    return Some(Ok(ExtractResult::InProgress {
                        status: other.unwrap_or("processing").to_string(),
                    }));
                }
            }
        }
    }

    fn ingest(&mut self, status: ExtractStatusResponse) {
        for doc in status.data.documentation {
            self.buffer.push_back(ExtractResult::Completed(ExtractedDoc {
                title: doc.title,
                url: doc.url,
                content: doc.content,
            }));
        }
        self.status_url = None;
    }

    async fn get_status(&self, url: &str) -> Result<ExtractStatusResponse, Error> {
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

/// JSON schema the service fills in: a flat list of documentation pages
fn documentation_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "documentation": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "content": { "type": "string" },
                        "url": { "type": "string" }
                    },
                    "required": ["title", "content", "url"]
                }
            }
        },
        "required": ["documentation"]
    })
}

// Wire format for POST /v1/extract

#[derive(Debug, Serialize)]
struct ExtractRequestBody<'a> {
    urls: Vec<String>,
    prompt: &'a str,
    schema: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractStatusResponse {
    id: Option<String>,
    status: Option<String>,
    error: Option<String>,
    #[serde(default)]
    data: ExtractData,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractData {
    #[serde(default)]
    documentation: Vec<WireExtractedDoc>,
}

#[derive(Debug, Default, Deserialize)]
struct WireExtractedDoc {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ExtractConfig::default();
        assert_eq!(config.prompt, DEFAULT_EXTRACT_PROMPT);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_config_builder() {
        let config = ExtractConfig::new()
            .prompt("just the API reference")
            .poll_interval(Duration::from_millis(50));
        assert_eq!(config.prompt, "just the API reference");
        assert_eq!(config.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_request_body_shape() {
        let body = ExtractRequestBody {
            urls: vec!["https://docs.example.com/*".to_string()],
            prompt: "capture everything",
            schema: documentation_schema(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["urls"][0], "https://docs.example.com/*");
        assert_eq!(json["prompt"], "capture everything");
        assert_eq!(json["schema"]["required"][0], "documentation");
        assert_eq!(
            json["schema"]["properties"]["documentation"]["items"]["required"],
            serde_json::json!(["title", "content", "url"])
        );
    }

    #[test]
    fn test_status_response_parses_job_start() {
        let status: ExtractStatusResponse =
            serde_json::from_str(r#"{"success": true, "id": "ex-1"}"#).unwrap();
        assert_eq!(status.id.as_deref(), Some("ex-1"));
        assert!(status.data.documentation.is_empty());
    }

    #[test]
    fn test_status_response_parses_documents() {
        let status: ExtractStatusResponse = serde_json::from_str(
            r#"{
                "status": "completed",
                "data": {
                    "documentation": [
                        {"title": "Intro", "url": "https://a.example/intro", "content": "Welcome"}
                    ]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(status.status.as_deref(), Some("completed"));
        assert_eq!(status.data.documentation.len(), 1);
        assert_eq!(status.data.documentation[0].title, "Intro");
    }
}
