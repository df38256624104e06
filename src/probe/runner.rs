//! Per-endpoint search → detail → stream orchestration

use futures::StreamExt;
use futures::stream;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, ResolverConfig, StreamConfig};
use crate::errors::AppResult;
use crate::models::{
    DetailRecord, DetailSample, Endpoint, EndpointResults, SearchResults, SearchSample,
    StreamCandidate, StreamSummary,
};
use crate::normalize::{parse_detail, parse_search};
use crate::probe::transport::ProviderTransport;
use crate::resolve::extract_candidates;
use crate::utils::{RetryConfig, UrlUtils, format_duration, with_retry};

/// Drives the probes of a whole run
pub struct SpeedTestRunner {
    transport: ProviderTransport,
    keywords: Vec<String>,
    retry: RetryConfig,
    concurrency: usize,
    stream: StreamConfig,
    resolver: ResolverConfig,
}

impl SpeedTestRunner {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            transport: ProviderTransport::new(&config.probe, &config.resolver)?,
            keywords: config
                .probe
                .keywords
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            retry: RetryConfig::new(config.probe.retry_count, config.probe.retry_delay),
            concurrency: config.probe.concurrent_requests.max(1),
            stream: config.probe.stream.clone(),
            resolver: config.resolver.clone(),
        })
    }

    /// Probe every endpoint, at most `concurrent_requests` at a time
    ///
    /// Results come back in the order the endpoints were given.
    pub async fn run(&self, endpoints: &[Endpoint]) -> Vec<EndpointResults> {
        let start = Instant::now();
        info!(
            endpoints = endpoints.len(),
            keywords = self.keywords.len(),
            concurrency = self.concurrency,
            "Starting speed test"
        );

        let results: Vec<EndpointResults> = stream::iter(endpoints)
            .map(|endpoint| self.probe_endpoint(endpoint))
            .buffered(self.concurrency)
            .collect()
            .await;

        info!("Speed test finished in {}", format_duration(start.elapsed().as_millis() as u64));
        results
    }

    /// Run every keyword against one endpoint, sequentially
    pub async fn probe_endpoint(&self, endpoint: &Endpoint) -> EndpointResults {
        let start = Instant::now();
        info!(
            endpoint = %endpoint.name,
            api = %UrlUtils::obfuscate_credentials(&endpoint.api),
            format = %endpoint.format,
            "Probing endpoint"
        );

        let mut results =
            EndpointResults::new(endpoint.name.clone(), endpoint.api.clone(), endpoint.is_xml());
        for keyword in &self.keywords {
            self.probe_keyword(endpoint, keyword, &mut results).await;
        }

        info!(
            endpoint = %endpoint.name,
            searches_ok = results.search.values().filter(|s| s.success).count(),
            details_ok = results.detail.values().filter(|d| d.success).count(),
            streams_ok = results.stream.values().filter(|s| s.is_success()).count(),
            "Endpoint finished in {}",
            format_duration(start.elapsed().as_millis() as u64)
        );
        results
    }

    async fn probe_keyword(
        &self,
        endpoint: &Endpoint,
        keyword: &str,
        results: &mut EndpointResults,
    ) {
        let search = self.search(endpoint, keyword).await;
        let first_id = search.first_id().map(str::to_string);
        let search_ok = search.success;
        results.search.insert(keyword.to_string(), search);

        if !search_ok {
            return;
        }
        let Some(vod_id) = first_id else {
            debug!(
                endpoint = %endpoint.name,
                keyword,
                "No search result with an id, skipping detail"
            );
            return;
        };

        let detail = self.detail(endpoint, &vod_id).await;
        let detail_ok = detail.success;
        let candidates = detail.candidates.clone();
        results.detail.insert(keyword.to_string(), detail);

        if !detail_ok || !self.stream.enabled {
            return;
        }

        let summary = if candidates.is_empty() {
            StreamSummary::no_candidates()
        } else {
            self.measure_streams(endpoint, &candidates).await
        };
        results.stream.insert(keyword.to_string(), summary);
    }

    async fn search(&self, endpoint: &Endpoint, keyword: &str) -> SearchSample {
        let url = ProviderTransport::search_url(endpoint, keyword);
        let attempted = with_retry(
            &self.retry,
            || async {
                let response = self.transport.query(endpoint, &url).await?;
                let results: SearchResults = parse_search(&response.body, endpoint.format)?;
                Ok((response.elapsed_ms, results))
            },
            &format!("search {} '{}'", endpoint.name, keyword),
        )
        .await;

        match attempted.result {
            Ok((elapsed_ms, results)) => {
                debug!(
                    endpoint = %endpoint.name,
                    keyword,
                    elapsed_ms,
                    results = results.result_count,
                    "Search succeeded"
                );
                SearchSample::succeeded(elapsed_ms, results.records, attempted.attempts)
            }
            Err(e) => SearchSample::failed(e.to_string(), attempted.attempts),
        }
    }

    async fn detail(&self, endpoint: &Endpoint, vod_id: &str) -> DetailSample {
        let url = ProviderTransport::detail_url(endpoint, vod_id);
        let endpoint_tag = endpoint.source_tag();
        let attempted = with_retry(
            &self.retry,
            || async {
                let response = self.transport.query(endpoint, &url).await?;
                let record: Option<DetailRecord> =
                    parse_detail(&response.body, endpoint.format, endpoint_tag.as_ref())?;
                Ok((response.elapsed_ms, record))
            },
            &format!("detail {} '{}'", endpoint.name, vod_id),
        )
        .await;

        match attempted.result {
            Ok((elapsed_ms, record)) => {
                let (source_tag, candidates) = match record {
                    Some(record) => {
                        let candidates = extract_candidates(
                            &record.item,
                            endpoint.format,
                            record.source_tag.as_ref(),
                            &self.resolver,
                        );
                        (record.source_tag, candidates)
                    }
                    None => (endpoint_tag, Vec::new()),
                };
                debug!(
                    endpoint = %endpoint.name,
                    vod_id,
                    elapsed_ms,
                    candidates = candidates.len(),
                    "Detail succeeded"
                );
                DetailSample::succeeded(
                    vod_id.to_string(),
                    elapsed_ms,
                    source_tag,
                    candidates,
                    attempted.attempts,
                )
            }
            Err(e) => DetailSample::failed(vod_id.to_string(), e.to_string(), attempted.attempts),
        }
    }

    /// Probe the first `test_result_count` candidates, one at a time
    async fn measure_streams(
        &self,
        endpoint: &Endpoint,
        candidates: &[StreamCandidate],
    ) -> StreamSummary {
        let mut probes = Vec::new();
        for candidate in candidates.iter().take(self.stream.test_result_count) {
            let probe = self.transport.probe_stream(candidate).await;
            if let Some(error) = &probe.error {
                warn!(
                    endpoint = %endpoint.name,
                    url = %UrlUtils::obfuscate_credentials(candidate.as_str()),
                    "Stream probe problem: {error}"
                );
            }
            probes.push(probe);
        }
        StreamSummary::from_probes(probes)
    }
}
