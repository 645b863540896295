//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Defaulting the scheme of bare URIs before any request is made
//! - The success policy: a document is produced only for status exactly 200
//! - Classifying failures into status and transport errors

use crate::config::Config;
use crate::crawler::document::Document;
use crate::url::ensure_scheme;
use chrono::Local;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Why a fetch produced no document
///
/// Both variants are soft: the crawl logs them and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered, but not with `200 OK`
    #[error("status {status_code} on {uri}")]
    Status { uri: String, status_code: u16 },

    /// DNS, connection, timeout or body-read failure
    #[error("transport error on {uri}: {source}")]
    Transport {
        uri: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// The normalized URI the request was made against
    pub fn uri(&self) -> &str {
        match self {
            Self::Status { uri, .. } | Self::Transport { uri, .. } => uri,
        }
    }

    /// HTTP status for a non-200 answer, `None` for transport failures
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status_code, .. } => Some(*status_code),
            Self::Transport { .. } => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed with reqwest's default policy.
///
/// # Example
///
/// ```no_run
/// use walker::config::Config;
/// use walker::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.crawler.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches URIs and turns successful responses into documents
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher with a client built from `config`
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches `uri` and parses the body
    ///
    /// # Request Flow
    ///
    /// 1. Prefix `http://` if `uri` has no `://`
    /// 2. GET the normalized URI, following redirects
    /// 3. Anything but status 200 → [`FetchError::Status`]; other 2xx codes
    ///    included
    /// 4. Read the body as text and parse it into a [`Document`] whose origin
    ///    is the normalized URI
    ///
    /// # Returns
    ///
    /// * `Ok(Document)` - The page was fetched with status 200
    /// * `Err(FetchError)` - Non-200 status or transport failure
    pub async fn fetch(&self, uri: &str) -> Result<Document, FetchError> {
        let uri = ensure_scheme(uri).into_owned();
        tracing::debug!("GET {}", uri);

        let response = match self.client.get(&uri).send().await {
            Ok(response) => response,
            Err(source) => {
                tracing::warn!("{} could not be fetched: {}", uri, source);
                return Err(FetchError::Transport { uri, source });
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            tracing::info!("{} is not ok, status code {}", uri, status.as_u16());
            return Err(FetchError::Status {
                uri,
                status_code: status.as_u16(),
            });
        }

        let fetched_at = Local::now();
        match response.text().await {
            Ok(body) => Ok(Document::parse(uri, body, fetched_at)),
            Err(source) => {
                tracing::warn!("{} body could not be read: {}", uri, source);
                Err(FetchError::Transport { uri, source })
            }
        }
    }
}
