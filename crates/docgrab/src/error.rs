//! Error types for docgrab

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while crawling or persisting pages
///
/// Per-page extraction failures are not errors; they arrive as
/// [`CrawlResult::PageError`](crate::CrawlResult::PageError) items and the
/// crawl continues. Everything here is fatal to the operation that raised it.
#[derive(Debug, Error)]
pub enum Error {
    /// No API key supplied and none found in the environment
    #[error("Missing API key: set FIRECRAWL_API_KEY or pass one explicitly")]
    MissingApiKey,

    /// The service rejected the API key
    #[error("Authentication rejected by extraction service (HTTP {status})")]
    Auth {
        /// Status code the service answered with (401 or 403)
        status: u16,
    },

    /// Root URL is not a well-formed absolute http(s) URL
    #[error("Invalid URL '{0}': must be an absolute http:// or https:// URL")]
    InvalidUrl(String),

    /// Failed to build the HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    /// Network failure talking to the service; fatal to the current crawl
    #[error("Transport failure talking to extraction service")]
    Transport(#[source] reqwest::Error),

    /// The service answered with an unexpected status
    #[error("Extraction service error (HTTP {status}): {message}")]
    Api {
        /// HTTP status of the response
        status: u16,
        /// Body or reason phrase, as available
        message: String,
    },

    /// The service answered 2xx but the payload made no sense
    #[error("Malformed extraction service response: {0}")]
    Protocol(String),

    /// Writing a page (or creating the output directory) failed
    #[error("Failed to write {path}")]
    Filesystem {
        /// Path of the file or directory involved
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Classify a reqwest error from a service call
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Error::ClientBuild(err)
        } else {
            Error::Transport(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::MissingApiKey.to_string(),
            "Missing API key: set FIRECRAWL_API_KEY or pass one explicitly"
        );
        assert_eq!(
            Error::Auth { status: 401 }.to_string(),
            "Authentication rejected by extraction service (HTTP 401)"
        );
        assert_eq!(
            Error::InvalidUrl("not a url".to_string()).to_string(),
            "Invalid URL 'not a url': must be an absolute http:// or https:// URL"
        );
        assert_eq!(
            Error::Api {
                status: 500,
                message: "internal error".to_string()
            }
            .to_string(),
            "Extraction service error (HTTP 500): internal error"
        );
    }

    #[test]
    fn test_filesystem_error_carries_path() {
        let err = Error::Filesystem {
            path: PathBuf::from("docs/page.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("docs/page.md"));
    }
}
