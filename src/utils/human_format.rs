//! Human-readable formatting for throughput, sizes and latencies

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Formats a download rate in bytes per second, e.g. `1.50MB/s`
pub fn format_speed(bytes_per_second: f64) -> String {
    if bytes_per_second >= MIB {
        format!("{:.2}MB/s", bytes_per_second / MIB)
    } else if bytes_per_second >= KIB {
        format!("{:.2}KB/s", bytes_per_second / KIB)
    } else {
        format!("{:.2}B/s", bytes_per_second)
    }
}

/// Formats a byte count with binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit_index = 0;
    while size >= KIB && unit_index < UNITS.len() - 1 {
        size /= KIB;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{}B", bytes)
    } else {
        format!("{:.2}{}", size, UNITS[unit_index])
    }
}

/// Formats a time duration in milliseconds
pub fn format_duration(millis: u64) -> String {
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        let seconds = millis as f64 / 1000.0;
        if seconds >= 10.0 {
            format!("{:.1}s", seconds)
        } else {
            format!("{:.2}s", seconds)
        }
    } else {
        let total_seconds = millis / 1000;
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if seconds == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m{}s", minutes, seconds)
        }
    }
}

/// Formats an optional latency, `N/A` when nothing was measured
pub fn format_latency(millis: Option<u64>) -> String {
    millis.map(format_duration).unwrap_or_else(|| "N/A".to_string())
}
