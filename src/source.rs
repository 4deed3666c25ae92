//! Feed acquisition: fetch over HTTP or read from disk.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

/// User agent sent when fetching the feed
pub const SITEMAP_USER_AGENT: &str = "asclub-sitemap-bot/1.0";

/// Where the feed document comes from.
#[derive(Debug, Clone)]
pub enum FeedSource {
    Remote { url: Url, timeout: Duration },
    Local { path: PathBuf },
}

impl FeedSource {
    /// Build a remote source from an optional configured URL.
    pub fn remote(url: Option<&str>, timeout: Duration) -> Result<Self> {
        let raw = url.map(str::trim).filter(|s| !s.is_empty()).ok_or(Error::MissingFeedUrl)?;
        let url = Url::parse(raw).map_err(|source| Error::InvalidFeedUrl {
            url: raw.to_string(),
            source,
        })?;
        Ok(FeedSource::Remote { url, timeout })
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        FeedSource::Local { path: path.into() }
    }

    /// Produce the raw feed document as text.
    pub fn read(&self) -> Result<String> {
        match self {
            FeedSource::Remote { url, timeout } => {
                info!("fetching feed from {}", url);
                let client = build_client(SITEMAP_USER_AGENT, *timeout)?;
                get_text(&client, url, SITEMAP_USER_AGENT)
            }
            FeedSource::Local { path } => {
                if !path.exists() {
                    return Err(Error::MissingInput { path: path.clone() });
                }
                info!("reading feed from {}", path.display());
                fs::read_to_string(path).map_err(|source| Error::Read {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

/// Blocking client with a request timeout and a bounded redirect chain.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;
    Ok(client)
}

/// GET a URL and return its body; any non-2xx status is an error.
pub fn get_text(client: &Client, url: &Url, user_agent: &str) -> Result<String> {
    let resp = client
        .get(url.as_str())
        .header(USER_AGENT, user_agent)
        .header(ACCEPT, "application/rss+xml,application/atom+xml,application/xml;q=0.9,*/*;q=0.8")
        .send()?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
        });
    }

    let body = resp.text()?;
    debug!("received {} bytes from {}", body.len(), url);
    Ok(body)
}
