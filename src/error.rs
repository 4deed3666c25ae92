//! Error types for sitemap generation

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures. Every variant aborts the run with a nonzero exit.
#[derive(Debug, Error)]
pub enum Error {
    /// No feed URL was configured for remote mode
    #[error("FEED_URL is missing; set it or pass --feed-url (or use --local)")]
    MissingFeedUrl,

    /// The configured feed URL is not an absolute URL
    #[error("invalid feed URL `{url}`: {source}")]
    InvalidFeedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The local feed has not been produced yet
    #[error("{} not found; run `news-sitemap scrape` first to generate it", path.display())]
    MissingInput { path: PathBuf },

    /// Upstream answered with a non-success status
    #[error("failed to fetch feed: HTTP {status}")]
    Status { status: u16 },

    /// Transport-level HTTP failure
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed XML input
    #[error("malformed XML: {0}")]
    Parse(String),

    /// XML serialization failure
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
