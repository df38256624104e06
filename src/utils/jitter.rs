//! Lightweight jitter for retry back-off
//!
//! Uses the system clock as a pseudo-random source rather than pulling in a
//! random number crate.

use std::time::{SystemTime, UNIX_EPOCH};

/// Pseudo-random jitter between 0 and `max_jitter_ms` (inclusive)
///
/// ```
/// use vod_probe::utils::jitter::generate_jitter_ms;
///
/// assert!(generate_jitter_ms(100) <= 100);
/// ```
pub fn generate_jitter_ms(max_jitter_ms: u64) -> u64 {
    if max_jitter_ms == 0 {
        return 0;
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    (nanos % (max_jitter_ms as u128 + 1)) as u64
}

/// Jitter of up to `jitter_percent` percent of `base_value`
///
/// ```
/// use vod_probe::utils::jitter::generate_jitter_percent;
///
/// assert!(generate_jitter_percent(200, 25) <= 50);
/// ```
pub fn generate_jitter_percent(base_value: u64, jitter_percent: u8) -> u64 {
    if jitter_percent == 0 || base_value == 0 {
        return 0;
    }

    let max_jitter = base_value.saturating_mul(jitter_percent as u64) / 100;
    generate_jitter_ms(max_jitter)
}
