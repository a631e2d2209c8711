use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use jobscraper::config::{Command, Config, LogFormat};
use jobscraper::fetch::{HttpFetch, ReqwestFetcher};
use jobscraper::pacing::{Pacing, SystemPacing};
use jobscraper::scrapers::runner::{self, MemorySink};
use jobscraper::sources::{build_scraper, source_names};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("jobscraper=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);

    let fetcher: Arc<dyn HttpFetch> =
        Arc::new(ReqwestFetcher::new(Duration::from_secs(config.request_timeout))?);
    let pacing: Arc<dyn Pacing> = Arc::new(SystemPacing);

    match config.command {
        Command::Sources => {
            for name in source_names() {
                println!("{name}");
            }
        }
        Command::Scrape(args) => {
            let mut scraper = build_scraper(&args.source, fetcher, pacing)?;
            let mut sink = MemorySink::new();
            runner::run_once(&mut scraper, &args.options(), args.deadline(), &mut sink).await?;
            println!("{}", serde_json::to_string_pretty(sink.jobs())?);
        }
        Command::Health { source } => {
            let mut scraper = build_scraper(&source, fetcher, pacing)?;
            if scraper.is_healthy().await {
                println!("healthy");
            } else {
                println!("unhealthy");
                std::process::exit(1);
            }
        }
        Command::Versions { source } => {
            let scraper = build_scraper(&source, fetcher, pacing)?;
            let info = json!({
                "source": scraper.source_name(),
                "current": scraper.current_version(),
                "available": scraper.available_versions(),
                "rate_limit": scraper.rate_limit(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Watch {
            scrape,
            poll_interval,
        } => {
            let mut scraper = build_scraper(&scrape.source, fetcher, pacing)?;
            let mut sink = MemorySink::new();
            runner::run_loop(
                &mut scraper,
                &scrape.options(),
                scrape.deadline(),
                Duration::from_secs(poll_interval),
                &mut sink,
            )
            .await?;
            tracing::info!("Watch finished with {} distinct jobs", sink.jobs().len());
        }
    }

    Ok(())
}
