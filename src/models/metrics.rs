//! Raw measurements gathered while probing an endpoint

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::records::{SearchRecord, SourceTag, StreamCandidate};

/// Outcome of the search query for one keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSample {
    pub success: bool,
    /// Send-to-full-body latency of the successful attempt
    pub response_time_ms: Option<u64>,
    pub result_count: usize,
    pub results: Vec<SearchRecord>,
    pub error: Option<String>,
    pub attempts: u32,
}

impl SearchSample {
    pub fn succeeded(response_time_ms: u64, results: Vec<SearchRecord>, attempts: u32) -> Self {
        Self {
            success: true,
            response_time_ms: Some(response_time_ms),
            result_count: results.len(),
            results,
            error: None,
            attempts,
        }
    }

    pub fn failed<E: Into<String>>(error: E, attempts: u32) -> Self {
        Self {
            success: false,
            response_time_ms: None,
            result_count: 0,
            results: Vec::new(),
            error: Some(error.into()),
            attempts,
        }
    }

    /// Id of the first hit, which drives the detail stage
    pub fn first_id(&self) -> Option<&str> {
        self.results.first().and_then(|r| r.id.as_deref())
    }
}

/// Outcome of the detail query for the first search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailSample {
    pub success: bool,
    pub response_time_ms: Option<u64>,
    pub vod_id: String,
    pub source_tag: Option<SourceTag>,
    /// Stream candidates extracted from the detail record
    pub candidates: Vec<StreamCandidate>,
    pub error: Option<String>,
    pub attempts: u32,
}

impl DetailSample {
    pub fn succeeded(
        vod_id: String,
        response_time_ms: u64,
        source_tag: Option<SourceTag>,
        candidates: Vec<StreamCandidate>,
        attempts: u32,
    ) -> Self {
        Self {
            success: true,
            response_time_ms: Some(response_time_ms),
            vod_id,
            source_tag,
            candidates,
            error: None,
            attempts,
        }
    }

    pub fn failed<E: Into<String>>(vod_id: String, error: E, attempts: u32) -> Self {
        Self {
            success: false,
            response_time_ms: None,
            vod_id,
            source_tag: None,
            candidates: Vec::new(),
            error: Some(error.into()),
            attempts,
        }
    }
}

/// Measurement of one stream candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamProbe {
    pub url: String,
    pub success: bool,
    /// Time to response headers
    pub response_time_ms: Option<u64>,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub is_manifest: bool,
    /// Terminal media segment resolved from a manifest
    pub media_url: Option<String>,
    /// Bytes downloaded for the throughput measurement
    pub download_size: Option<u64>,
    pub download_time_ms: Option<u64>,
    /// Bytes per second
    pub download_speed: Option<f64>,
    /// First characters of the fetched body
    pub preview: Option<String>,
    pub error: Option<String>,
}

impl StreamProbe {
    pub fn failed<U: Into<String>, E: Into<String>>(url: U, error: E) -> Self {
        Self {
            url: url.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Aggregate of the stream probes run for one keyword
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub tested: usize,
    pub successful: usize,
    /// Rounded mean of successful probe latencies
    pub avg_response_time_ms: Option<u64>,
    /// Mean throughput of probes that measured one
    pub avg_download_speed: Option<f64>,
    pub probes: Vec<StreamProbe>,
    pub error: Option<String>,
}

impl StreamSummary {
    pub fn from_probes(probes: Vec<StreamProbe>) -> Self {
        let latencies: Vec<u64> = probes
            .iter()
            .filter(|p| p.success)
            .filter_map(|p| p.response_time_ms)
            .collect();
        let speeds: Vec<f64> = probes
            .iter()
            .filter(|p| p.success)
            .filter_map(|p| p.download_speed)
            .collect();

        let avg_response_time_ms = if latencies.is_empty() {
            None
        } else {
            let sum: u64 = latencies.iter().sum();
            Some((sum as f64 / latencies.len() as f64).round() as u64)
        };
        let avg_download_speed = if speeds.is_empty() {
            None
        } else {
            Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
        };

        let successful = probes.iter().filter(|p| p.success).count();
        let error = if successful == 0 && !probes.is_empty() {
            Some("all stream candidates failed".to_string())
        } else {
            None
        };

        Self {
            tested: probes.len(),
            successful,
            avg_response_time_ms,
            avg_download_speed,
            probes,
            error,
        }
    }

    /// Entry recorded when a successful detail yielded nothing playable
    pub fn no_candidates() -> Self {
        Self {
            error: Some("no playable stream candidates found".to_string()),
            ..Default::default()
        }
    }

    /// A keyword counts as a stream success once any probe produced a latency
    pub fn is_success(&self) -> bool {
        self.avg_response_time_ms.is_some()
    }
}

/// Every sample gathered for one endpoint, keyed by keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointResults {
    pub name: String,
    pub api: String,
    pub is_xml: bool,
    pub search: BTreeMap<String, SearchSample>,
    pub detail: BTreeMap<String, DetailSample>,
    pub stream: BTreeMap<String, StreamSummary>,
}

impl EndpointResults {
    pub fn new<N: Into<String>, A: Into<String>>(name: N, api: A, is_xml: bool) -> Self {
        Self {
            name: name.into(),
            api: api.into(),
            is_xml,
            search: BTreeMap::new(),
            detail: BTreeMap::new(),
            stream: BTreeMap::new(),
        }
    }

    /// Flatten the per-stage maps into one scoring sample per keyword
    pub fn metric_samples(&self) -> Vec<MetricSample> {
        let keywords: BTreeSet<&String> = self
            .search
            .keys()
            .chain(self.detail.keys())
            .chain(self.stream.keys())
            .collect();

        keywords
            .into_iter()
            .map(|keyword| {
                let search = self.search.get(keyword);
                MetricSample {
                    keyword: keyword.clone(),
                    search: search.map(|s| StageMeasurement {
                        success: s.success,
                        latency_ms: s.response_time_ms,
                    }),
                    detail: self.detail.get(keyword).map(|d| StageMeasurement {
                        success: d.success,
                        latency_ms: d.response_time_ms,
                    }),
                    stream: self.stream.get(keyword).map(|s| StreamMeasurement {
                        success: s.is_success(),
                        latency_ms: s.avg_response_time_ms,
                        throughput: s.avg_download_speed,
                    }),
                    result_count: search.filter(|s| s.success).map(|s| s.result_count).unwrap_or(0),
                }
            })
            .collect()
    }
}

/// Latency and outcome of a search or detail query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageMeasurement {
    pub success: bool,
    pub latency_ms: Option<u64>,
}

/// Aggregated stream outcome for one keyword
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamMeasurement {
    pub success: bool,
    pub latency_ms: Option<u64>,
    /// Bytes per second
    pub throughput: Option<f64>,
}

/// Per endpoint, per keyword input to the scorer
///
/// A stage that was never attempted is `None` and does not count towards
/// that stage's success rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub keyword: String,
    pub search: Option<StageMeasurement>,
    pub detail: Option<StageMeasurement>,
    pub stream: Option<StreamMeasurement>,
    pub result_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(url: &str, latency: Option<u64>, speed: Option<f64>) -> StreamProbe {
        StreamProbe {
            url: url.to_string(),
            success: latency.is_some(),
            response_time_ms: latency,
            download_speed: speed,
            ..Default::default()
        }
    }

    #[test]
    fn test_stream_summary_averages_successes_only() {
        let summary = StreamSummary::from_probes(vec![
            probe("https://a.example.com/1.m3u8", Some(100), Some(2048.0)),
            probe("https://a.example.com/2.m3u8", Some(201), None),
            StreamProbe::failed("https://a.example.com/3.m3u8", "timeout"),
        ]);

        assert_eq!(summary.tested, 3);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.avg_response_time_ms, Some(151));
        assert_eq!(summary.avg_download_speed, Some(2048.0));
        assert!(summary.is_success());
        assert!(summary.error.is_none());
    }

    #[test]
    fn test_stream_summary_all_failed() {
        let probe = StreamProbe::failed("https://a.example.com/x", "HTTP error");
        let summary = StreamSummary::from_probes(vec![probe]);
        assert!(!summary.is_success());
        assert!(summary.error.is_some());

        let empty = StreamSummary::no_candidates();
        assert_eq!(empty.tested, 0);
        assert!(!empty.is_success());
    }

    #[test]
    fn test_metric_samples_merge_stages() {
        let mut results = EndpointResults::new("a", "https://a.example.com/api", false);
        results.search.insert(
            "k1".to_string(),
            SearchSample::succeeded(
                420,
                vec![SearchRecord {
                    id: Some("7".to_string()),
                    title: "X".to_string(),
                }],
                1,
            ),
        );
        results.search.insert("k2".to_string(), SearchSample::failed("timeout", 3));
        results.detail.insert(
            "k1".to_string(),
            DetailSample::succeeded("7".to_string(), 300, None, vec![], 1),
        );
        results.stream.insert("k1".to_string(), StreamSummary::no_candidates());

        let samples = results.metric_samples();
        assert_eq!(samples.len(), 2);

        assert_eq!(samples[0].keyword, "k1");
        assert_eq!(samples[0].result_count, 1);
        assert_eq!(samples[0].detail.map(|d| d.latency_ms), Some(Some(300)));
        assert_eq!(samples[0].stream.map(|s| s.success), Some(false));

        assert_eq!(samples[1].keyword, "k2");
        assert_eq!(samples[1].search.map(|s| s.success), Some(false));
        assert!(samples[1].detail.is_none());
        assert!(samples[1].stream.is_none());
    }
}
