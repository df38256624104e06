//! Self-contained HTML rendering of a run report

use std::fmt::Write;

use super::RunReport;
use crate::models::EndpointResults;
use crate::scoring::ScoreRecord;
use crate::utils::{format_bytes, format_latency, format_speed};

const STYLE: &str = "body{font-family:sans-serif;margin:20px;background:#f5f5f5;color:#333}\
table{border-collapse:collapse;width:100%;margin-bottom:20px;background:#fff}\
th,td{border:1px solid #ddd;padding:6px 8px;text-align:left}\
th{background:#f0f0f0}\
.section{background:#fff;border-radius:8px;padding:16px;margin-bottom:24px}\
.ok{color:#2e7d32}.fail{color:#c62828}\
.score-excellent{color:#2e7d32;font-weight:bold}.score-good{color:#558b2f}\
.score-average{color:#ef6c00}.score-poor{color:#c62828}\
.muted{color:#777;font-size:0.9em}";

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn score_class(score: u8) -> &'static str {
    if score >= 90 {
        "score-excellent"
    } else if score >= 75 {
        "score-good"
    } else if score >= 60 {
        "score-average"
    } else {
        "score-poor"
    }
}

fn status(success: bool) -> &'static str {
    if success { "<span class=\"ok\">OK</span>" } else { "<span class=\"fail\">FAIL</span>" }
}

fn opt_speed(speed: Option<f64>) -> String {
    speed.map(format_speed).unwrap_or_else(|| "N/A".to_string())
}

pub fn render(report: &RunReport<'_>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
         <title>VOD endpoint speed test</title><style>{STYLE}</style></head><body>\n\
         <h1>VOD endpoint speed test</h1>\n<p class=\"muted\">Generated {}</p>\n",
        report.generated_at.to_rfc3339()
    );

    render_summary(&mut html, report.sorted_results);

    let w = report.weights;
    let _ = write!(
        html,
        "<div class=\"section\"><h2>Weights</h2>\
         <p>search {:.2} · detail {:.2} · stream {:.2} · success {:.2} · results {:.2}</p></div>\n",
        w.search_time, w.detail_time, w.stream_time, w.success_rate, w.result_count
    );

    for results in report.results {
        render_endpoint(&mut html, results);
    }

    html.push_str("</body></html>\n");
    html
}

fn render_summary(html: &mut String, ranking: &[ScoreRecord]) {
    html.push_str(
        "<div class=\"section\"><h2>Ranking</h2><table>\
         <tr><th>#</th><th>Endpoint</th><th>Score</th>\
         <th>Search</th><th>Detail</th><th>Stream</th><th>Speed</th>\
         <th>Search ok</th><th>Detail ok</th><th>Stream ok</th><th>Results</th></tr>\n",
    );
    for (index, record) in ranking.iter().enumerate() {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td class=\"{}\">{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}%</td><td>{}%</td><td>{}%</td><td>{}</td></tr>",
            index + 1,
            escape(&record.name),
            score_class(record.composite_score),
            record.composite_score,
            format_latency(record.avg_search_time_ms),
            format_latency(record.avg_detail_time_ms),
            format_latency(record.avg_stream_time_ms),
            opt_speed(record.avg_download_speed.map(|s| s as f64)),
            record.search_success_rate,
            record.detail_success_rate,
            record.stream_success_rate,
            record.total_result_count,
        );
    }
    html.push_str("</table></div>\n");
}

fn render_endpoint(html: &mut String, results: &EndpointResults) {
    let _ = write!(
        html,
        "<div class=\"section\"><h2>{}</h2><p class=\"muted\">{} · {}</p>\n\
         <table><tr><th>Keyword</th><th>Search</th><th>Results</th>\
         <th>Detail</th><th>Candidates</th><th>Stream</th><th>Speed</th><th>Notes</th></tr>\n",
        escape(&results.name),
        escape(&results.api),
        if results.is_xml { "XML" } else { "JSON" }
    );

    for (keyword, search) in &results.search {
        let detail = results.detail.get(keyword);
        let stream = results.stream.get(keyword);

        let mut notes = Vec::new();
        notes.extend(search.error.as_deref());
        if let Some(d) = detail {
            notes.extend(d.error.as_deref());
        }
        if let Some(s) = stream {
            notes.extend(s.error.as_deref());
            if let Some(media) = s.probes.iter().find_map(|p| p.media_url.as_deref()) {
                notes.push(media);
            }
        }
        let downloaded = stream
            .and_then(|s| s.probes.iter().find_map(|p| p.download_size))
            .map(format_bytes);

        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{} {}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(keyword),
            status(search.success),
            format_latency(search.response_time_ms),
            search.result_count,
            detail
                .map(|d| format!("{} {}", status(d.success), format_latency(d.response_time_ms)))
                .unwrap_or_else(|| "-".to_string()),
            detail.map(|d| d.candidates.len().to_string()).unwrap_or_else(|| "-".to_string()),
            stream
                .map(|s| {
                    format!(
                        "{} {} ({}/{})",
                        status(s.is_success()),
                        format_latency(s.avg_response_time_ms),
                        s.successful,
                        s.tested
                    )
                })
                .unwrap_or_else(|| "-".to_string()),
            stream
                .map(|s| match &downloaded {
                    Some(size) => format!("{} · {}", opt_speed(s.avg_download_speed), size),
                    None => opt_speed(s.avg_download_speed),
                })
                .unwrap_or_else(|| "-".to_string()),
            escape(&notes.join("; ")),
        );
    }

    html.push_str("</table></div>\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape("星际穿越"), "星际穿越");
    }

    #[test]
    fn test_score_class() {
        assert_eq!(score_class(95), "score-excellent");
        assert_eq!(score_class(75), "score-good");
        assert_eq!(score_class(60), "score-average");
        assert_eq!(score_class(10), "score-poor");
    }
}
