//! Core types for docgrab

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Content format requested from the extraction service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PageFormat {
    /// Converted markdown (default)
    #[default]
    #[serde(rename = "markdown")]
    Markdown,
    /// Cleaned HTML
    #[serde(rename = "html")]
    Html,
    /// Unprocessed HTML as served
    #[serde(rename = "rawHtml")]
    RawHtml,
    /// Links discovered on the page
    #[serde(rename = "links")]
    Links,
}

impl PageFormat {
    /// File extension used when persisting content in this format
    pub fn extension(self) -> &'static str {
        match self {
            PageFormat::Markdown => "md",
            PageFormat::Html | PageFormat::RawHtml => "html",
            PageFormat::Links => "txt",
        }
    }

    /// Wire name as the extraction service spells it
    pub fn wire_name(self) -> &'static str {
        match self {
            PageFormat::Markdown => "markdown",
            PageFormat::Html => "html",
            PageFormat::RawHtml => "rawHtml",
            PageFormat::Links => "links",
        }
    }
}

impl FromStr for PageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markdown" | "md" => Ok(PageFormat::Markdown),
            "html" => Ok(PageFormat::Html),
            "rawHtml" | "raw-html" => Ok(PageFormat::RawHtml),
            "links" => Ok(PageFormat::Links),
            _ => Err(format!(
                "Invalid format '{s}': must be markdown, html, rawHtml, or links"
            )),
        }
    }
}

impl std::fmt::Display for PageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// One extracted page, as returned by the service
///
/// Immutable once constructed; handed to the persister and then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Source URL of the page (service-canonical)
    pub url: String,

    /// Page title from metadata
    pub title: String,

    /// Page description, if the service extracted one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Content language (e.g. "en")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// HTTP status code the service saw when scraping
    pub status_code: u16,

    /// Converted content, verbatim from the service
    pub content: String,

    /// Format of `content`
    pub format: PageFormat,
}

/// Tunable crawl parameters, passed through to the extraction service
///
/// Pure value object; field validation beyond types is the service's job.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlConfig {
    /// Maximum number of pages to crawl
    pub limit: u32,
    /// Link-following depth from the root URL
    pub max_depth: u32,
    /// Render wait per page, in milliseconds
    pub wait_for_ms: u64,
    /// Strip navigation and boilerplate server-side
    pub only_main_content: bool,
    /// Formats to request for each page
    pub formats: Vec<PageFormat>,
    /// Delay between job status polls
    pub poll_interval: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            max_depth: 1,
            wait_for_ms: 1000,
            only_main_content: true,
            formats: vec![PageFormat::Markdown],
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl CrawlConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of pages
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the link-following depth
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the per-page render wait in milliseconds
    pub fn wait_for_ms(mut self, ms: u64) -> Self {
        self.wait_for_ms = ms;
        self
    }

    /// Toggle server-side boilerplate stripping
    pub fn only_main_content(mut self, on: bool) -> Self {
        self.only_main_content = on;
        self
    }

    /// Set the requested content formats
    pub fn formats(mut self, formats: Vec<PageFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Set the status poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Primary format for persisted files (first requested, default markdown)
    pub fn primary_format(&self) -> PageFormat {
        self.formats.first().copied().unwrap_or_default()
    }
}

/// One item pulled from a crawl in progress
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlResult {
    /// Job status update; no page yet
    InProgress {
        /// Pages the service plans to crawl
        total: u32,
        /// Pages crawled so far
        completed: u32,
        /// API credits consumed so far
        credits_used: u32,
    },
    /// A page was extracted successfully
    Completed(Page),
    /// A single page failed server-side; the crawl continues
    PageError {
        /// URL of the failing page, when the service reports it
        url: Option<String>,
        /// Service-supplied failure reason
        reason: String,
    },
}

impl CrawlResult {
    /// Returns the page for `Completed` results
    pub fn page(&self) -> Option<&Page> {
        match self {
            CrawlResult::Completed(page) => Some(page),
            _ => None,
        }
    }

    /// True for `Completed` results
    pub fn is_completed(&self) -> bool {
        matches!(self, CrawlResult::Completed(_))
    }
}
