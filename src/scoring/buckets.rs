//! Step tables mapping raw measurements to 0-100 sub-scores

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Upper latency bound (inclusive, ms) and the score awarded at or below it
type LatencyStep = (u64, u8);

const SEARCH_LATENCY_STEPS: &[LatencyStep] =
    &[(500, 100), (1000, 90), (1500, 80), (2000, 70), (3000, 50), (5000, 30)];
const SEARCH_LATENCY_FLOOR: u8 = 10;

const DETAIL_LATENCY_STEPS: &[LatencyStep] =
    &[(300, 100), (600, 90), (1000, 70), (1500, 50), (2000, 30), (3000, 20)];
const DETAIL_LATENCY_FLOOR: u8 = 10;

const STREAM_LATENCY_STEPS: &[LatencyStep] = &[
    (300, 100),
    (600, 90),
    (1000, 80),
    (1500, 70),
    (2000, 60),
    (3000, 40),
    (5000, 20),
];
const STREAM_LATENCY_FLOOR: u8 = 10;

/// Lower throughput bound (inclusive, bytes/s)
const THROUGHPUT_STEPS: &[(f64, u8)] = &[
    (10.0 * MIB, 100),
    (5.0 * MIB, 90),
    (2.0 * MIB, 80),
    (MIB, 70),
    (500.0 * KIB, 60),
    (200.0 * KIB, 50),
    (100.0 * KIB, 40),
    (50.0 * KIB, 20),
];
const THROUGHPUT_FLOOR: u8 = 10;

/// Lower success-rate bound (inclusive, percent)
const SUCCESS_RATE_STEPS: &[(f64, u8)] =
    &[(100.0, 100), (80.0, 90), (60.0, 70), (40.0, 50), (20.0, 30)];

/// Lower result-count bound (inclusive)
const RESULT_COUNT_STEPS: &[(usize, u8)] =
    &[(30, 100), (20, 90), (15, 80), (10, 70), (5, 50), (2, 30), (1, 10)];

fn latency_score(steps: &[LatencyStep], floor: u8, latency_ms: Option<u64>) -> u8 {
    let Some(latency) = latency_ms else {
        return 0;
    };
    steps
        .iter()
        .find(|(bound, _)| latency <= *bound)
        .map(|(_, score)| *score)
        .unwrap_or(floor)
}

pub fn search_latency_score(latency_ms: Option<u64>) -> u8 {
    latency_score(SEARCH_LATENCY_STEPS, SEARCH_LATENCY_FLOOR, latency_ms)
}

pub fn detail_latency_score(latency_ms: Option<u64>) -> u8 {
    latency_score(DETAIL_LATENCY_STEPS, DETAIL_LATENCY_FLOOR, latency_ms)
}

pub fn stream_latency_score(latency_ms: Option<u64>) -> u8 {
    latency_score(STREAM_LATENCY_STEPS, STREAM_LATENCY_FLOOR, latency_ms)
}

/// Throughput in bytes per second
pub fn throughput_score(bytes_per_second: Option<f64>) -> u8 {
    let Some(speed) = bytes_per_second else {
        return 0;
    };
    THROUGHPUT_STEPS
        .iter()
        .find(|(bound, _)| speed >= *bound)
        .map(|(_, score)| *score)
        .unwrap_or(THROUGHPUT_FLOOR)
}

/// Success rate in percent (0-100)
pub fn success_rate_score(rate: f64) -> u8 {
    if rate <= 0.0 {
        return 0;
    }
    SUCCESS_RATE_STEPS
        .iter()
        .find(|(bound, _)| rate >= *bound)
        .map(|(_, score)| *score)
        .unwrap_or(10)
}

pub fn result_count_score(count: usize) -> u8 {
    RESULT_COUNT_STEPS
        .iter()
        .find(|(bound, _)| count >= *bound)
        .map(|(_, score)| *score)
        .unwrap_or(0)
}
