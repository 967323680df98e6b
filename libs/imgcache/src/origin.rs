//! Origin fetcher: retrieves image bytes from the remote URL.
//!
//! The response is trusted for nothing but its status code. The payload
//! type is decided by sniffing the body, so an origin that labels HTML or
//! SVG as `image/png` is still rejected.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::sniff;

/// Errors from origin fetches.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("fetch of {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("origin returned status {status} for {url}")]
    BadStatus { url: String, status: u16 },

    #[error("{url} is not an image (sniffed {content_type})")]
    NotAnImage {
        url: String,
        content_type: &'static str,
    },
}

/// Source of image bytes for cache misses.
#[async_trait]
pub trait Origin: Send + Sync {
    /// Fetch and validate the image at `url`.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Configuration for [`HttpOrigin`].
#[derive(Debug, Clone)]
pub struct OriginConfig {
    /// Deadline for the whole exchange, body included.
    pub timeout: Duration,
    /// User-Agent sent to origins.
    pub user_agent: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!("imgcache/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Fetches images over HTTP(S).
pub struct HttpOrigin {
    config: OriginConfig,
    client: Client,
}

impl HttpOrigin {
    /// Create a new HTTP origin.
    pub fn new(config: OriginConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;

        Ok(Self { config, client })
    }

    /// Deadline applied to each fetch.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    async fn download(&self, url: Url) -> Result<Bytes, FetchError> {
        let network = |source: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().await.map_err(network)?;

        let status = response.status();
        if status.as_u16() >= 300 {
            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(network)
    }
}

#[async_trait]
impl Origin for HttpOrigin {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        debug!(url = %url, timeout = ?self.config.timeout, "Fetching from origin");

        let body = tokio::time::timeout(self.config.timeout, self.download(parsed))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                after: self.config.timeout,
            })?
            .inspect_err(|e| warn!(url = %url, error = %e, "Origin fetch failed"))?;

        let content_type = sniff::detect(&body);
        if !sniff::is_image(content_type) {
            warn!(url = %url, content_type = %content_type, "Origin payload is not an image");
            return Err(FetchError::NotAnImage {
                url: url.to_string(),
                content_type,
            });
        }

        info!(
            url = %url,
            content_type = %content_type,
            size = body.len(),
            "Fetched image from origin"
        );

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        assert_eq!(OriginConfig::default().timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let origin = HttpOrigin::new(OriginConfig::default()).unwrap();

        let err = origin.fetch("").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));

        let err = origin.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = FetchError::BadStatus {
            url: "http://origin/a.jpg".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "origin returned status 404 for http://origin/a.jpg");
    }
}
