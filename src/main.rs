use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vod_probe::{
    config::Config,
    probe::SpeedTestRunner,
    report::{ReportWriter, render_ranking_table},
    scoring::MetricScorer,
};

#[derive(Parser)]
#[command(name = "vod-probe")]
#[command(version)]
#[command(about = "Measure and rank VOD collection API endpoints by speed and reliability")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (defaults to $CONFIG_FILE, then vod-probe.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Report output directory (overrides config file)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Endpoints probed concurrently (overrides config file)
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Search keyword; repeat to test several (replaces configured keywords)
    #[arg(short, long = "keyword", value_name = "KEYWORD")]
    keywords: Vec<String>,

    /// Only probe endpoints with this name; repeatable
    #[arg(short, long = "endpoint", value_name = "NAME")]
    endpoints: Vec<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Skip writing report files
    #[arg(long)]
    no_report: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("vod_probe={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(
            cli.log_json
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!cli.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    info!("Starting vod-probe v{}", env!("CARGO_PKG_VERSION"));

    let config_path = Config::resolve_path(cli.config.as_deref());
    let mut config = Config::load_from_file(&config_path)?;
    info!("Configuration loaded from: {}", config_path.display());

    // Override config with CLI arguments
    if let Some(output_dir) = cli.output_dir {
        config.report.output_dir = output_dir.into();
    }
    if let Some(concurrency) = cli.concurrency {
        config.probe.concurrent_requests = concurrency;
    }
    if !cli.keywords.is_empty() {
        config.probe.keywords = cli.keywords;
    }
    if !cli.endpoints.is_empty() {
        let unknown: Vec<&String> = cli
            .endpoints
            .iter()
            .filter(|name| !config.endpoints.iter().any(|e| &e.name == *name))
            .collect();
        for name in unknown {
            warn!("Unknown endpoint filter: {}", name);
        }
        config.endpoints.retain(|e| cli.endpoints.contains(&e.name));
    }

    config.ensure_valid()?;

    let runner = SpeedTestRunner::new(&config)?;
    let endpoints = config.endpoints();

    let results = tokio::select! {
        results = runner.run(&endpoints) => results,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, no report written");
            return Ok(());
        }
    };

    let scorer = MetricScorer::new(config.ranking.weights);
    let ranking = scorer.rank(&results);

    println!("{}", render_ranking_table(&ranking));

    if !cli.no_report {
        let paths = ReportWriter::new(&config.report)
            .write(&results, &ranking, scorer.weights())
            .await?;
        println!("JSON report: {}", paths.json.display());
        if let Some(html) = paths.html {
            println!("HTML report: {}", html.display());
        }
    }

    Ok(())
}
