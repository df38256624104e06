//! Run reports: JSON and HTML files plus the console ranking table

pub mod html;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ReportConfig;
use crate::errors::{AppError, AppResult};
use crate::models::EndpointResults;
use crate::scoring::{ScoreRecord, ScoreWeights};
use crate::utils::{format_latency, format_speed};

/// Serialized shape of the JSON report
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub weights: &'a ScoreWeights,
    /// Raw samples, in configuration order
    pub results: &'a [EndpointResults],
    /// Ranking, best first
    pub sorted_results: &'a [ScoreRecord],
}

/// Files produced by one [`ReportWriter::write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub html: Option<PathBuf>,
}

pub struct ReportWriter {
    output_dir: PathBuf,
    write_html: bool,
}

/// Filesystem-safe report timestamp, e.g. `2025-01-31T12-00-00-000Z`
pub fn report_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

impl ReportWriter {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            write_html: config.write_html,
        }
    }

    pub fn with_output_dir<P: AsRef<Path>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.as_ref().to_path_buf();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `speed-test-report-<timestamp>.json` (and `.html`) into the output directory
    pub async fn write(
        &self,
        results: &[EndpointResults],
        ranking: &[ScoreRecord],
        weights: &ScoreWeights,
    ) -> AppResult<ReportPaths> {
        tokio::fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            AppError::report(format!(
                "cannot create report directory {}: {e}",
                self.output_dir.display()
            ))
        })?;

        let generated_at = Utc::now();
        let stem = format!("speed-test-report-{}", report_timestamp(&generated_at));
        let report = RunReport {
            generated_at,
            weights,
            results,
            sorted_results: ranking,
        };

        let json_path = self.output_dir.join(format!("{stem}.json"));
        tokio::fs::write(&json_path, serde_json::to_vec_pretty(&report)?).await?;
        info!("Wrote JSON report: {}", json_path.display());

        let html_path = if self.write_html {
            let path = self.output_dir.join(format!("{stem}.html"));
            tokio::fs::write(&path, html::render(&report)).await?;
            info!("Wrote HTML report: {}", path.display());
            Some(path)
        } else {
            None
        };

        Ok(ReportPaths {
            json: json_path,
            html: html_path,
        })
    }
}

/// Plain-text ranking table for the console
pub fn render_ranking_table(ranking: &[ScoreRecord]) -> String {
    let mut out = format!(
        "{:<4} {:<20} {:>5} {:>9} {:>9} {:>9} {:>12} {:>7} {:>7}\n",
        "#", "Endpoint", "Score", "Search", "Detail", "Stream", "Speed", "Success", "Results"
    );
    for (index, record) in ranking.iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:<20} {:>5} {:>9} {:>9} {:>9} {:>12} {:>6}% {:>7}\n",
            index + 1,
            truncate(&record.name, 20),
            record.composite_score,
            format_latency(record.avg_search_time_ms),
            format_latency(record.avg_detail_time_ms),
            format_latency(record.avg_stream_time_ms),
            record
                .avg_download_speed
                .map(|s| format_speed(s as f64))
                .unwrap_or_else(|| "N/A".to_string()),
            record.success_rate,
            record.total_result_count,
        ));
    }
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars - 1).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchSample;
    use crate::scoring::MetricScorer;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_run() -> (Vec<EndpointResults>, Vec<ScoreRecord>) {
        let mut a = EndpointResults::new("Alpha <fast>", "https://a.example.com/api", false);
        a.search.insert("k".to_string(), SearchSample::succeeded(300, vec![], 1));
        let b = EndpointResults::new("Beta", "https://b.example.com/api", true);
        let results = vec![a, b];
        let ranking = MetricScorer::default().rank(&results);
        (results, ranking)
    }

    #[test]
    fn test_report_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(report_timestamp(&at), "2025-03-09T07-05-01-000Z");
    }

    #[tokio::test]
    async fn test_write_reports() {
        let dir = TempDir::new().unwrap();
        let (results, ranking) = sample_run();
        let writer =
            ReportWriter::new(&ReportConfig::default()).with_output_dir(dir.path().join("nested"));

        let paths = writer.write(&results, &ranking, &ScoreWeights::default()).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
        assert_eq!(json["results"].as_array().map(|r| r.len()), Some(2));
        assert_eq!(json["sorted_results"][0]["name"], "Alpha <fast>");
        let file_name = paths.json.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("speed-test-report-"));

        let html = std::fs::read_to_string(paths.html.unwrap()).unwrap();
        assert!(html.contains("Alpha &lt;fast&gt;"));
        assert!(!html.contains("Alpha <fast>"));
    }

    #[tokio::test]
    async fn test_html_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let (results, ranking) = sample_run();
        let config = ReportConfig {
            output_dir: dir.path().to_path_buf(),
            write_html: false,
        };

        let paths = ReportWriter::new(&config)
            .write(&results, &ranking, &ScoreWeights::default())
            .await
            .unwrap();
        assert!(paths.html.is_none());
        assert!(paths.json.exists());
    }

    #[test]
    fn test_ranking_table() {
        let (_, ranking) = sample_run();
        let table = render_ranking_table(&ranking);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1"));
        assert!(lines[1].contains("Alpha <fast>"));
        assert!(lines[2].contains("N/A"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("非常非常非常长的接口名称", 5), "非常非常…");
    }
}
