//! # imgcache
//!
//! Pull-through cache for remote images.
//!
//! Given a URL, [`Resolver::resolve`] returns the image bytes: the first
//! request fetches the image from its origin, validates that the payload
//! really is an image, and persists it; every later request for the same
//! URL is served from disk without touching the network.
//!
//! ## Layout on disk
//!
//! Entries are keyed by the MD5 digest of the raw URL string and stored in
//! a two level shard tree below the cache root:
//!
//! ```text
//! <root>/
//!   c/                 key[0..1]
//!     29/              key[1..3]
//!       b7f54b2d...    key[4..]
//! ```
//!
//! At most 16 top level and 256 second level directories exist per parent,
//! which keeps every directory small without any rebalancing. There is no
//! index and no metadata: the file tree is the whole persisted state.
//!
//! ## Modules
//!
//! - `key`: URL to cache key digest and shard path derivation
//! - `store`: the sharded file cache (get/put/delete)
//! - `sniff`: content type detection from a byte prefix
//! - `origin`: network fetch with deadline and image validation
//! - `resolver`: the get-or-populate orchestration

mod key;
mod origin;
mod resolver;
pub mod sniff;
mod store;

pub use key::{key_for, path_for, CacheKey};
pub use origin::{FetchError, HttpOrigin, Origin, OriginConfig};
pub use resolver::{ResolveError, Resolver};
pub use store::{CacheError, ShardedCache};
