//! Shared helpers: retry, jitter, URL handling and human-readable formatting

pub mod human_format;
pub mod jitter;
pub mod retry;
pub mod url;

pub use human_format::{format_bytes, format_duration, format_latency, format_speed};
pub use retry::{Attempted, RetryConfig, with_retry};
pub use url::UrlUtils;
