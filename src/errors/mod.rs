//! Centralized error handling for vod-probe
//!
//! Errors are split by layer so that callers can decide what is fatal:
//!
//! - **Probe Errors**: transport and payload failures scoped to a single
//!   query. They are recorded against a keyword and never abort a run.
//! - **Application Errors**: start-up and output problems (configuration,
//!   report writing) that the binary reports and exits on.
//!
//! # Usage
//!
//! ```rust
//! use vod_probe::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for single probe step results
pub type ProbeResult<T> = Result<T, ProbeError>;
