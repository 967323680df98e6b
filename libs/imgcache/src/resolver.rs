//! Get-or-populate orchestration over the cache and the origin.
//!
//! ```text
//! START --hit--> DONE(bytes)
//! START --miss--> FETCH --err--> DONE(error)
//! FETCH --ok--> STORE --err--> DONE(error)
//! STORE --ok--> DONE(bytes)
//! ```
//!
//! Nothing is retried. Concurrent misses for the same URL are not
//! coalesced: each fetches and writes, and the last write wins.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use crate::origin::{FetchError, Origin};
use crate::store::{CacheError, ShardedCache};

/// Errors from resolving a URL.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to store fetched image: {0}")]
    Store(#[from] CacheError),
}

impl ResolveError {
    /// Whether the failure happened while fetching from the origin.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

/// Pull-through resolver.
pub struct Resolver {
    cache: ShardedCache,
    origin: Arc<dyn Origin>,
}

impl Resolver {
    /// Create a resolver over a cache and an origin.
    pub fn new(cache: ShardedCache, origin: Arc<dyn Origin>) -> Self {
        Self { cache, origin }
    }

    /// The backing cache.
    pub fn cache(&self) -> &ShardedCache {
        &self.cache
    }

    /// Return the image for `url`, from cache if present, otherwise from the
    /// origin after persisting it.
    ///
    /// Any cache read failure counts as a miss. A fetched image that cannot
    /// be stored is reported as an error rather than returned.
    pub async fn resolve(&self, url: &str) -> Result<Bytes, ResolveError> {
        match self.cache.get(url).await {
            Ok(data) => {
                debug!(url = %url, "Cache hit");
                return Ok(Bytes::from(data));
            }
            Err(e) if e.is_not_found() => debug!(url = %url, "Cache miss"),
            Err(e) => warn!(url = %url, error = %e, "Cache read failed, fetching from origin"),
        }

        let data = self.origin.fetch(url).await?;

        let key = self.cache.put(url, &data).await.inspect_err(|e| {
            warn!(url = %url, error = %e, "Failed to store fetched image");
        })?;
        debug!(url = %url, key = %key, "Stored fetched image");

        Ok(data)
    }
}
