//! docgrab - thin client for API-based documentation crawling
//!
//! All crawling, rendering, and markdown conversion is delegated to a
//! hosted extraction service (a Firecrawl-compatible API). This crate
//! covers the two pieces that live on this side of the wire:
//!
//! - [`ExtractorClient`] starts a crawl job and exposes the results as a
//!   lazy pull-based [`CrawlStream`]; its [`extract`](ExtractorClient::extract)
//!   entry point runs a schema-driven extract job instead, yielding whole
//!   documents through an [`ExtractStream`];
//! - [`save_page`] and [`save_document`] persist results under
//!   deterministic, collision-resistant filenames derived from their URLs.
//!
//! Per-page failures arrive as tagged results and the sequence continues;
//! authentication and transport failures are fatal to the operation that
//! raised them. Filesystem failures are scoped to the single write that
//! failed — callers persisting many pages can report one and keep going.
//!
//! ```rust,no_run
//! use docgrab::{ClientConfig, CrawlConfig, CrawlResult, ExtractorClient};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), docgrab::Error> {
//! let client = ExtractorClient::new(ClientConfig::from_env()?)?;
//! let mut stream = client
//!     .crawl("https://docs.example.com", CrawlConfig::new().limit(10))
//!     .await?;
//!
//! while let Some(result) = stream.next().await {
//!     match result? {
//!         CrawlResult::Completed(page) => {
//!             let path = docgrab::save_page(&page, Path::new(docgrab::DEFAULT_OUTPUT_DIR))?;
//!             println!("saved {}", path.display());
//!         }
//!         CrawlResult::InProgress { completed, total, .. } => {
//!             println!("progress: {completed}/{total}");
//!         }
//!         CrawlResult::PageError { url, reason } => {
//!             eprintln!("page failed ({url:?}): {reason}");
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
mod error;
mod extract;
mod persist;
mod types;

pub use client::{ClientConfig, CrawlStream, ExtractorClient, DEFAULT_API_URL};
pub use error::Error;
pub use extract::{
    ExtractConfig, ExtractResult, ExtractStream, ExtractedDoc, DEFAULT_EXTRACT_PROMPT,
};
pub use persist::{filename_for_url, save_document, save_page};
pub use types::{CrawlConfig, CrawlResult, Page, PageFormat};

/// Default output directory for persisted pages
pub const DEFAULT_OUTPUT_DIR: &str = "docs";

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "docgrab/0.1";
