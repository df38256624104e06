pub mod config;
pub mod errors;
pub mod models;
pub mod normalize;
pub mod probe;
pub mod report;
pub mod resolve;
pub mod scoring;
pub mod utils;

pub use config::Config;
pub use errors::{AppError, AppResult, ProbeError, ProbeResult};
pub use probe::{ProviderTransport, SpeedTestRunner};
pub use report::ReportWriter;
pub use scoring::{MetricScorer, ScoreRecord, ScoreWeights};
