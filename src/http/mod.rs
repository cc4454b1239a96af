//! Outbound HTTP for plugins: rate limiting, response caching and
//! response normalization behind one entry point.

pub mod cache;
pub mod client;
pub mod rate_limit;
pub mod response;

pub use client::{CallOptions, HttpClient};
pub use response::{HttpResponse, JsonResponse, RawResponse};
