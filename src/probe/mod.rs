//! Network probing: the HTTP transport and the run orchestration

pub mod runner;
pub mod transport;

pub use runner::SpeedTestRunner;
pub use transport::{ProviderTransport, QueryResponse, throughput};
