//! Multi-metric endpoint scoring
//!
//! Raw per-keyword samples are reduced to per-class averages and success
//! rates, mapped through the step tables in [`buckets`] and combined under
//! [`ScoreWeights`] into a 0-100 composite. Three guard caps keep endpoints
//! that never completed a whole stage out of the top of the ranking.

pub mod buckets;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::defaults::*;
use crate::models::{EndpointResults, MetricSample};
use buckets::*;

const SEARCH_SUCCESS_SHARE: f64 = 0.3;
const DETAIL_SUCCESS_SHARE: f64 = 0.3;
const STREAM_SUCCESS_SHARE: f64 = 0.4;
const STREAM_LATENCY_SHARE: f64 = 0.3;
const THROUGHPUT_SHARE: f64 = 0.7;

const SEARCH_FAILED_CAP: u8 = 40;
const DETAIL_FAILED_CAP: u8 = 60;
const STREAM_FAILED_CAP: u8 = 30;

/// Relative importance of each metric class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_search_time")]
    pub search_time: f64,
    #[serde(default = "default_detail_time")]
    pub detail_time: f64,
    /// Split 30/70 between stream latency and download throughput
    #[serde(default = "default_stream_time")]
    pub stream_time: f64,
    /// Split 30/30/40 between search, detail and stream success
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    #[serde(default = "default_result_count")]
    pub result_count: f64,
}

fn default_search_time() -> f64 {
    DEFAULT_WEIGHT_SEARCH_TIME
}

fn default_detail_time() -> f64 {
    DEFAULT_WEIGHT_DETAIL_TIME
}

fn default_stream_time() -> f64 {
    DEFAULT_WEIGHT_STREAM_TIME
}

fn default_success_rate() -> f64 {
    DEFAULT_WEIGHT_SUCCESS_RATE
}

fn default_result_count() -> f64 {
    DEFAULT_WEIGHT_RESULT_COUNT
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            search_time: default_search_time(),
            detail_time: default_detail_time(),
            stream_time: default_stream_time(),
            success_rate: default_success_rate(),
            result_count: default_result_count(),
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.search_time
            + self.detail_time
            + self.stream_time
            + self.success_rate
            + self.result_count
    }

    /// Weights with their configuration key, for validation messages
    pub fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("search_time", self.search_time),
            ("detail_time", self.detail_time),
            ("stream_time", self.stream_time),
            ("success_rate", self.success_rate),
            ("result_count", self.result_count),
        ]
    }
}

/// The eight 0-100 sub-scores behind a composite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScores {
    pub search_time: u8,
    pub detail_time: u8,
    pub stream_time: u8,
    pub download_speed: u8,
    pub search_success: u8,
    pub detail_success: u8,
    pub stream_success: u8,
    pub result_count: u8,
}

/// Aggregated, scored view of one endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    pub api: String,
    pub is_xml: bool,
    pub avg_search_time_ms: Option<u64>,
    pub avg_detail_time_ms: Option<u64>,
    pub avg_stream_time_ms: Option<u64>,
    /// Rounded mean throughput in bytes per second
    pub avg_download_speed: Option<u64>,
    pub search_success_rate: u8,
    pub detail_success_rate: u8,
    pub stream_success_rate: u8,
    /// 30/30/40 blend of the per-class success rates
    pub success_rate: u8,
    pub total_result_count: usize,
    pub sub_scores: SubScores,
    /// 0-100, higher is better; the ranking key
    pub composite_score: u8,
    /// Lower is better; kept for comparison with older reports
    pub legacy_score: f64,
}

/// Per-class aggregation of an endpoint's samples
#[derive(Debug, Default)]
struct Aggregate {
    avg_search_time: Option<u64>,
    avg_detail_time: Option<u64>,
    avg_stream_time: Option<u64>,
    avg_download_speed: Option<u64>,
    search_success_rate: f64,
    detail_success_rate: f64,
    stream_success_rate: f64,
    total_result_count: usize,
}

fn rounded_mean(values: &[u64]) -> Option<u64> {
    if values.is_empty() {
        return None;
    }
    let sum: u64 = values.iter().sum();
    Some((sum as f64 / values.len() as f64).round() as u64)
}

fn rate(successes: usize, attempts: usize) -> f64 {
    if attempts == 0 {
        0.0
    } else {
        successes as f64 / attempts as f64 * 100.0
    }
}

impl Aggregate {
    fn from_samples(samples: &[MetricSample]) -> Self {
        let mut search_times = Vec::new();
        let mut detail_times = Vec::new();
        let mut stream_times = Vec::new();
        let mut speeds = Vec::new();
        let (mut search_ok, mut search_total) = (0, 0);
        let (mut detail_ok, mut detail_total) = (0, 0);
        let (mut stream_ok, mut stream_total) = (0, 0);
        let mut total_result_count = 0;

        for sample in samples {
            if let Some(search) = &sample.search {
                search_total += 1;
                if search.success {
                    search_ok += 1;
                    search_times.extend(search.latency_ms);
                    total_result_count += sample.result_count;
                }
            }
            if let Some(detail) = &sample.detail {
                detail_total += 1;
                if detail.success {
                    detail_ok += 1;
                    detail_times.extend(detail.latency_ms);
                }
            }
            if let Some(stream) = &sample.stream {
                stream_total += 1;
                if stream.success
                    && let Some(latency) = stream.latency_ms
                {
                    stream_ok += 1;
                    stream_times.push(latency);
                    speeds.extend(stream.throughput);
                }
            }
        }

        let avg_download_speed = if speeds.is_empty() {
            None
        } else {
            Some((speeds.iter().sum::<f64>() / speeds.len() as f64).round() as u64)
        };

        Self {
            avg_search_time: rounded_mean(&search_times),
            avg_detail_time: rounded_mean(&detail_times),
            avg_stream_time: rounded_mean(&stream_times),
            avg_download_speed,
            search_success_rate: rate(search_ok, search_total),
            detail_success_rate: rate(detail_ok, detail_total),
            stream_success_rate: rate(stream_ok, stream_total),
            total_result_count,
        }
    }

    fn composite_success_rate(&self) -> f64 {
        (self.search_success_rate * SEARCH_SUCCESS_SHARE
            + self.detail_success_rate * DETAIL_SUCCESS_SHARE
            + self.stream_success_rate * STREAM_SUCCESS_SHARE)
            .round()
    }

    fn sub_scores(&self) -> SubScores {
        SubScores {
            search_time: search_latency_score(self.avg_search_time),
            detail_time: detail_latency_score(self.avg_detail_time),
            stream_time: stream_latency_score(self.avg_stream_time),
            download_speed: throughput_score(self.avg_download_speed.map(|s| s as f64)),
            search_success: success_rate_score(self.search_success_rate),
            detail_success: success_rate_score(self.detail_success_rate),
            stream_success: success_rate_score(self.stream_success_rate),
            result_count: result_count_score(self.total_result_count),
        }
    }
}

/// Round and clamp a weighted sum, then apply every failed-stage cap
///
/// Caps combine by minimum: whichever failed stage has the lowest cap wins.
fn apply_caps(weighted: f64, sub: &SubScores) -> u8 {
    let mut score = weighted.round().clamp(0.0, 100.0) as u8;
    if sub.search_success == 0 {
        score = score.min(SEARCH_FAILED_CAP);
    }
    if sub.detail_success == 0 {
        score = score.min(DETAIL_FAILED_CAP);
    }
    if sub.stream_success == 0 {
        score = score.min(STREAM_FAILED_CAP);
    }
    score
}

/// Turns endpoint measurements into scores under a fixed set of weights
#[derive(Debug, Clone, Default)]
pub struct MetricScorer {
    weights: ScoreWeights,
}

impl MetricScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn score(&self, results: &EndpointResults) -> ScoreRecord {
        let samples = results.metric_samples();
        let record = self.score_samples(&results.name, &results.api, results.is_xml, &samples);
        debug!(
            endpoint = %record.name,
            composite = record.composite_score,
            legacy = record.legacy_score,
            "Scored endpoint"
        );
        record
    }

    /// Score every endpoint and order them best first; ties keep input order
    pub fn rank(&self, results: &[EndpointResults]) -> Vec<ScoreRecord> {
        let mut records: Vec<ScoreRecord> = results.iter().map(|r| self.score(r)).collect();
        records.sort_by(|a, b| b.composite_score.cmp(&a.composite_score));
        records
    }

    pub fn score_samples(
        &self,
        name: &str,
        api: &str,
        is_xml: bool,
        samples: &[MetricSample],
    ) -> ScoreRecord {
        let aggregate = Aggregate::from_samples(samples);
        let sub_scores = aggregate.sub_scores();
        let success_rate = aggregate.composite_success_rate();

        ScoreRecord {
            name: name.to_string(),
            api: api.to_string(),
            is_xml,
            avg_search_time_ms: aggregate.avg_search_time,
            avg_detail_time_ms: aggregate.avg_detail_time,
            avg_stream_time_ms: aggregate.avg_stream_time,
            avg_download_speed: aggregate.avg_download_speed,
            search_success_rate: aggregate.search_success_rate.round() as u8,
            detail_success_rate: aggregate.detail_success_rate.round() as u8,
            stream_success_rate: aggregate.stream_success_rate.round() as u8,
            success_rate: success_rate as u8,
            total_result_count: aggregate.total_result_count,
            sub_scores,
            composite_score: self.composite(&aggregate, &sub_scores),
            legacy_score: self.legacy(&aggregate, success_rate),
        }
    }

    fn composite(&self, aggregate: &Aggregate, sub: &SubScores) -> u8 {
        if aggregate.avg_search_time.is_none() {
            return 0;
        }

        let w = &self.weights;
        let weighted = f64::from(sub.search_time) * w.search_time
            + f64::from(sub.detail_time) * w.detail_time
            + f64::from(sub.stream_time) * w.stream_time * STREAM_LATENCY_SHARE
            + f64::from(sub.download_speed) * w.stream_time * THROUGHPUT_SHARE
            + f64::from(sub.search_success) * w.success_rate * SEARCH_SUCCESS_SHARE
            + f64::from(sub.detail_success) * w.success_rate * DETAIL_SUCCESS_SHARE
            + f64::from(sub.stream_success) * w.success_rate * STREAM_SUCCESS_SHARE
            + f64::from(sub.result_count) * w.result_count;

        apply_caps(weighted, sub)
    }

    fn legacy(&self, aggregate: &Aggregate, success_rate: f64) -> f64 {
        let Some(search) = aggregate.avg_search_time else {
            return 10_000.0;
        };

        let w = &self.weights;
        let mut score = search as f64 * w.search_time;
        score += aggregate.avg_detail_time.unwrap_or(1000) as f64 * w.detail_time;
        score += match (aggregate.avg_stream_time, aggregate.avg_download_speed) {
            (Some(_), Some(speed)) if speed > 0 && w.stream_time > 0.0 => {
                1_000_000.0 / speed as f64
            }
            (Some(stream), _) => stream as f64,
            (None, _) => 2000.0,
        } * w.stream_time;
        score += (100.0 - success_rate) * w.success_rate;
        if aggregate.total_result_count > 0 {
            score += 1000.0 / ((aggregate.total_result_count + 10) as f64).log10() * w.result_count;
        }
        score
    }
}
