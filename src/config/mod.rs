use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::{duration, parse_default};

use crate::errors::{AppError, AppResult};
use crate::models::Endpoint;
use crate::scoring::ScoreWeights;
use crate::utils::UrlUtils;

/// Top-level configuration, read from `vod-probe.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointConfig>,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// One provider collection API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub api: String,
    #[serde(default)]
    pub is_xml: bool,
}

impl EndpointConfig {
    pub fn to_endpoint(&self) -> Endpoint {
        Endpoint::new(self.name.trim(), self.api.trim(), self.is_xml)
    }
}

/// Query behaviour shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-attempt timeout of search and detail queries
    #[serde(default = "default_timeout", with = "duration")]
    pub timeout: Duration,
    /// Attempts per search/detail query, including the first
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay", with = "duration")]
    pub retry_delay: Duration,
    /// Endpoints probed at the same time
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Stream candidate measurement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_stream_enabled")]
    pub enabled: bool,
    /// Candidates measured per keyword
    #[serde(default = "default_test_result_count")]
    pub test_result_count: usize,
    #[serde(default = "default_stream_timeout", with = "duration")]
    pub stream_timeout: Duration,
    /// Upper bound of bytes read from any stream body, in bytes
    #[serde(default = "default_max_stream_test_size")]
    pub max_stream_test_size: u64,
    #[serde(default = "default_download_speed_test")]
    pub download_speed_test: bool,
}

/// Playback candidate extraction and manifest resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Multi-source flags accepted when no source tag matches
    #[serde(default = "default_accepted_flags")]
    pub accepted_flags: Vec<String>,
    /// Deepest nested manifest followed; the top-level manifest is depth 0
    #[serde(default = "default_max_manifest_depth")]
    pub max_manifest_depth: u8,
}

impl ResolverConfig {
    pub fn accepts_flag(&self, flag: &str) -> bool {
        self.accepted_flags.iter().any(|f| f == flag)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub weights: ScoreWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_write_html")]
    pub write_html: bool,
}

fn default_endpoints() -> Vec<EndpointConfig> {
    DEFAULT_ENDPOINTS
        .iter()
        .map(|(name, api, is_xml)| EndpointConfig {
            name: name.to_string(),
            api: api.to_string(),
            is_xml: *is_xml,
        })
        .collect()
}

fn default_timeout() -> Duration {
    parse_default(DEFAULT_TIMEOUT)
}

fn default_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}

fn default_retry_delay() -> Duration {
    parse_default(DEFAULT_RETRY_DELAY)
}

fn default_concurrent_requests() -> usize {
    DEFAULT_CONCURRENT_REQUESTS
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_stream_enabled() -> bool {
    DEFAULT_STREAM_ENABLED
}

fn default_test_result_count() -> usize {
    DEFAULT_TEST_RESULT_COUNT
}

fn default_stream_timeout() -> Duration {
    parse_default(DEFAULT_STREAM_TIMEOUT)
}

fn default_max_stream_test_size() -> u64 {
    DEFAULT_MAX_STREAM_TEST_SIZE
}

fn default_download_speed_test() -> bool {
    DEFAULT_DOWNLOAD_SPEED_TEST
}

fn default_accepted_flags() -> Vec<String> {
    DEFAULT_ACCEPTED_FLAGS.iter().map(|f| f.to_string()).collect()
}

fn default_max_manifest_depth() -> u8 {
    DEFAULT_MAX_MANIFEST_DEPTH
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_write_html() -> bool {
    DEFAULT_WRITE_HTML
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            retry_count: default_retry_count(),
            retry_delay: default_retry_delay(),
            concurrent_requests: default_concurrent_requests(),
            keywords: default_keywords(),
            user_agent: default_user_agent(),
            stream: StreamConfig::default(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: default_stream_enabled(),
            test_result_count: default_test_result_count(),
            stream_timeout: default_stream_timeout(),
            max_stream_test_size: default_max_stream_test_size(),
            download_speed_test: default_download_speed_test(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            accepted_flags: default_accepted_flags(),
            max_manifest_depth: default_max_manifest_depth(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            write_html: default_write_html(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            probe: ProbeConfig::default(),
            resolver: ResolverConfig::default(),
            ranking: RankingConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    /// Config file to use: explicit path, then `CONFIG_FILE`, then `vod-probe.toml`
    pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
        explicit
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var(CONFIG_FILE_ENV)
                    .ok()
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Read the config file, writing the defaults to it first when it is missing
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> Result<Self> {
        let config_file = config_file.as_ref();
        if config_file.exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file.display());
            Ok(default_config)
        }
    }

    /// Endpoints in configuration order
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.iter().map(EndpointConfig::to_endpoint).collect()
    }

    /// Collect every configuration problem; an empty list means the config is usable
    ///
    /// Weights that do not sum to 1 only produce a warning.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.endpoints.is_empty() {
            problems.push("no endpoints configured".to_string());
        }
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            if endpoint.name.trim().is_empty() {
                problems.push(format!("endpoint #{} has an empty name", index + 1));
            }
            if !UrlUtils::is_http_url(endpoint.api.trim()) {
                problems.push(format!(
                    "endpoint '{}' has an invalid api url '{}'",
                    endpoint.name, endpoint.api
                ));
            }
        }
        let mut names: Vec<&str> = self.endpoints.iter().map(|e| e.name.trim()).collect();
        names.sort_unstable();
        for pair in names.windows(2) {
            if pair[0] == pair[1] && !pair[0].is_empty() {
                problems.push(format!("endpoint name '{}' is used more than once", pair[0]));
            }
        }

        if self.probe.retry_count == 0 {
            problems.push("probe.retry_count must be at least 1".to_string());
        }
        if self.probe.concurrent_requests == 0 {
            problems.push("probe.concurrent_requests must be at least 1".to_string());
        }
        if self.probe.timeout.is_zero() {
            problems.push("probe.timeout must be greater than zero".to_string());
        }
        if self.probe.keywords.iter().all(|k| k.trim().is_empty()) {
            problems.push("probe.keywords must contain at least one keyword".to_string());
        }
        if self.probe.stream.enabled {
            if self.probe.stream.stream_timeout.is_zero() {
                problems.push("probe.stream.stream_timeout must be greater than zero".to_string());
            }
            if self.probe.stream.max_stream_test_size == 0 {
                problems.push(
                    "probe.stream.max_stream_test_size must be greater than zero".to_string(),
                );
            }
        }

        for (name, weight) in self.ranking.weights.named() {
            if weight < 0.0 || !weight.is_finite() {
                problems.push(format!("ranking.weights.{name} must be a non-negative number"));
            }
        }

        let sum = self.ranking.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            warn!("Ranking weights sum to {sum:.3} instead of 1; composite scores are clamped");
        }

        problems
    }

    /// [`Config::validate`] as a single configuration error listing every problem
    pub fn ensure_valid(&self) -> AppResult<()> {
        let problems = self.validate();
        if problems.is_empty() {
            return Ok(());
        }
        Err(AppError::configuration(format!(
            "invalid configuration:\n  - {}",
            problems.join("\n  - ")
        )))
    }
}
