//! HTTP transport for provider queries and stream measurement

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::config::{ProbeConfig, ResolverConfig, StreamConfig};
use crate::errors::{AppResult, ProbeError, ProbeResult};
use crate::models::{Endpoint, StreamCandidate, StreamProbe};
use crate::resolve::{FetchedManifest, ManifestFetcher, is_manifest, resolve_media};
use crate::utils::UrlUtils;

const PREVIEW_CHARS: usize = 200;

/// Body and latency of a provider query
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub body: String,
    /// Send until the whole body was read
    pub elapsed_ms: u64,
}

/// `reqwest` based transport shared by every endpoint probe
#[derive(Debug, Clone)]
pub struct ProviderTransport {
    client: Client,
    query_timeout: Duration,
    stream: StreamConfig,
    max_manifest_depth: u8,
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Bytes per second, when both size and time are non-zero
pub fn throughput(size: u64, elapsed_ms: u64) -> Option<f64> {
    if size == 0 || elapsed_ms == 0 {
        return None;
    }
    Some((size as f64 / elapsed_ms as f64 * 1000.0).round())
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}

fn map_request_error(error: reqwest::Error, url: &str, limit: Duration) -> ProbeError {
    if error.is_timeout() {
        ProbeError::Timeout {
            url: UrlUtils::obfuscate_credentials(url),
            timeout_ms: limit.as_millis() as u64,
        }
    } else {
        ProbeError::connection(error.to_string())
    }
}

fn check_status(response: &Response, url: &str) -> ProbeResult<()> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(ProbeError::Http {
            status: status.as_u16(),
            url: UrlUtils::obfuscate_credentials(url),
        });
    }
    Ok(())
}

fn content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Read a response body, stopping once `max_bytes` were collected
async fn read_bounded(response: Response, max_bytes: u64) -> ProbeResult<Vec<u8>> {
    let max_bytes = max_bytes as usize;
    let mut body = response.bytes_stream();
    let mut collected: Vec<u8> = Vec::with_capacity(8192.min(max_bytes));

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| ProbeError::connection(e.to_string()))?;
        if collected.len() + chunk.len() > max_bytes {
            collected.extend_from_slice(&chunk[..(max_bytes - collected.len())]);
            break;
        }
        collected.extend_from_slice(&chunk);
    }

    Ok(collected)
}

impl ProviderTransport {
    pub fn new(probe: &ProbeConfig, resolver: &ResolverConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(probe.user_agent.as_str())
            .connect_timeout(probe.timeout)
            .build()?;

        Ok(Self {
            client,
            query_timeout: probe.timeout,
            stream: probe.stream.clone(),
            max_manifest_depth: resolver.max_manifest_depth,
        })
    }

    /// `{base}?ac=detail&wd={keyword}`
    pub fn search_url(endpoint: &Endpoint, keyword: &str) -> String {
        UrlUtils::with_query(&endpoint.api, &[("ac", "detail"), ("wd", keyword)])
    }

    /// `{base}?ac=detail&ids={id}`
    pub fn detail_url(endpoint: &Endpoint, id: &str) -> String {
        UrlUtils::with_query(&endpoint.api, &[("ac", "detail"), ("ids", id)])
    }

    /// Run one search or detail query under the query timeout
    pub async fn query(&self, endpoint: &Endpoint, url: &str) -> ProbeResult<QueryResponse> {
        let start = Instant::now();
        let request = async {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, endpoint.format.accept_header())
                .send()
                .await
                .map_err(|e| map_request_error(e, url, self.query_timeout))?;
            check_status(&response, url)?;
            response
                .text()
                .await
                .map_err(|e| map_request_error(e, url, self.query_timeout))
        };

        let body = timeout(self.query_timeout, request)
            .await
            .map_err(|_| ProbeError::Timeout {
                url: UrlUtils::obfuscate_credentials(url),
                timeout_ms: self.query_timeout.as_millis() as u64,
            })??;

        let elapsed_ms = elapsed_ms(start);
        trace!(endpoint = %endpoint.name, elapsed_ms, bytes = body.len(), "Query completed");
        Ok(QueryResponse { body, elapsed_ms })
    }

    /// Measure one stream candidate; failures are recorded on the probe
    pub async fn probe_stream(&self, candidate: &StreamCandidate) -> StreamProbe {
        let url = candidate.as_str();
        match timeout(self.stream.stream_timeout, self.measure_stream(url)).await {
            Ok(probe) => probe,
            Err(_) => StreamProbe::failed(
                url,
                ProbeError::Timeout {
                    url: UrlUtils::obfuscate_credentials(url),
                    timeout_ms: self.stream.stream_timeout.as_millis() as u64,
                }
                .to_string(),
            ),
        }
    }

    async fn measure_stream(&self, url: &str) -> StreamProbe {
        let start = Instant::now();
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = map_request_error(e, url, self.stream.stream_timeout);
                return StreamProbe::failed(url, error.to_string());
            }
        };

        let content_type = content_type(&response);
        let final_uri = response.url().to_string();
        let mut probe = StreamProbe {
            url: url.to_string(),
            success: true,
            response_time_ms: Some(elapsed_ms(start)),
            status: Some(response.status().as_u16()),
            content_type: content_type.clone(),
            ..Default::default()
        };

        if let Err(e) = check_status(&response, url) {
            probe.success = false;
            probe.error = Some(e.to_string());
            return probe;
        }
        if !self.stream.download_speed_test {
            return probe;
        }

        let download_start = Instant::now();
        let body = match read_bounded(response, self.stream.max_stream_test_size).await {
            Ok(body) => body,
            Err(e) => {
                probe.error = Some(e.to_string());
                return probe;
            }
        };
        let download_ms = elapsed_ms(download_start);
        let text = String::from_utf8_lossy(&body);
        probe.preview = Some(preview(&text));
        probe.download_size = Some(body.len() as u64);
        probe.download_time_ms = Some(download_ms);

        if is_manifest(&final_uri, content_type.as_deref(), &text) {
            probe.is_manifest = true;
            probe.media_url = resolve_media(
                self,
                &final_uri,
                &text,
                content_type.as_deref(),
                self.max_manifest_depth,
            )
            .await;

            match &probe.media_url {
                Some(media) => match self.download(media).await {
                    Ok((size, ms)) => {
                        probe.download_size = Some(size);
                        probe.download_time_ms = Some(ms);
                        probe.download_speed = throughput(size, ms);
                    }
                    Err(e) => {
                        debug!(
                            media = %UrlUtils::obfuscate_credentials(media),
                            "Media segment download failed: {e}"
                        );
                        probe.error = Some(format!("media segment download failed: {e}"));
                    }
                },
                None => debug!(
                    url = %UrlUtils::obfuscate_credentials(url),
                    "No media segment found in manifest"
                ),
            }
        } else {
            probe.download_speed = throughput(body.len() as u64, download_ms);
        }

        probe
    }

    /// Download a media segment (bounded); returns bytes read and elapsed ms
    async fn download(&self, url: &str) -> ProbeResult<(u64, u64)> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_request_error(e, url, self.stream.stream_timeout))?;
        check_status(&response, url)?;
        let body = read_bounded(response, self.stream.max_stream_test_size).await?;
        Ok((body.len() as u64, elapsed_ms(start)))
    }
}

#[async_trait]
impl ManifestFetcher for ProviderTransport {
    async fn fetch_manifest(&self, uri: &str) -> ProbeResult<FetchedManifest> {
        let fetch = async {
            let response = self
                .client
                .get(uri)
                .send()
                .await
                .map_err(|e| map_request_error(e, uri, self.stream.stream_timeout))?;
            check_status(&response, uri)?;
            let content_type = content_type(&response);
            let final_uri = response.url().to_string();
            let body = read_bounded(response, self.stream.max_stream_test_size).await?;
            Ok(FetchedManifest {
                uri: final_uri,
                body: String::from_utf8_lossy(&body).into_owned(),
                content_type,
            })
        };

        timeout(self.stream.stream_timeout, fetch)
            .await
            .map_err(|_| ProbeError::Timeout {
                url: UrlUtils::obfuscate_credentials(uri),
                timeout_ms: self.stream.stream_timeout.as_millis() as u64,
            })?
    }
}
