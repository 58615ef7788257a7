//! Client Module
//!
//! Transport, rate limit tracking, and pagination.

pub mod http;
pub(crate) mod pages;
pub mod rate_limit;

pub use http::{ApiRequest, HttpClient};
pub use rate_limit::{Bucket, RateLimitState};
