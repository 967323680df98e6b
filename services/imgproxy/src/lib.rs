//! imgproxy service library.
//!
//! HTTP front end for the [`imgcache`] pull-through cache:
//!
//! - `GET /?url=<image url>` returns the image, fetching and caching it on
//!   first use
//! - `GET /` without a URL is a health check
//! - every failure is an empty 404, every non-GET method a 503
//!
//! Exposed as a library so integration tests can build the router.

pub mod api;
pub mod config;
pub mod metrics;
pub mod state;
