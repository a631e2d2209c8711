use std::time::Duration;

use clap::Parser;

use crate::models::ScrapingOptions;
use crate::models::options::{DEFAULT_MAX_JOBS, DEFAULT_MAX_PAGES};

#[derive(Parser, Debug, Clone)]
#[command(name = "jobscraper", about = "Scrape job listings from versioned job boards")]
pub struct Config {
    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "30", global = true)]
    pub request_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// List registered sources
    Sources,
    /// Scrape one source and print the jobs as JSON
    Scrape(ScrapeArgs),
    /// Check whether a source answers
    Health {
        #[arg(long)]
        source: String,
    },
    /// Show the parser versions registered for a source
    Versions {
        #[arg(long)]
        source: String,
    },
    /// Scrape a source repeatedly until interrupted
    Watch {
        #[command(flatten)]
        scrape: ScrapeArgs,

        /// Poll interval in seconds
        #[arg(long, env = "POLL_INTERVAL", default_value = "3600")]
        poll_interval: u64,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct ScrapeArgs {
    /// Source name (see `sources`)
    #[arg(long)]
    pub source: String,

    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: u32,

    #[arg(long, default_value_t = DEFAULT_MAX_JOBS)]
    pub max_jobs: usize,

    /// Extra query parameter as key=value; repeatable
    #[arg(long = "filter", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// Rotate to a fresh session before scraping
    #[arg(long)]
    pub force_refresh: bool,

    /// Abort the whole scrape after this many seconds
    #[arg(long, env = "SCRAPE_DEADLINE")]
    pub deadline: Option<u64>,
}

impl ScrapeArgs {
    pub fn options(&self) -> ScrapingOptions {
        ScrapingOptions {
            max_pages: self.max_pages,
            max_jobs: self.max_jobs,
            filters: self.filters.clone(),
            force_refresh: self.force_refresh,
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline.map(Duration::from_secs)
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_args_build_options() {
        let config = Config::try_parse_from([
            "jobscraper",
            "scrape",
            "--source",
            "remoteok",
            "--max-pages",
            "2",
            "--filter",
            "q=rust",
            "--filter",
            "location = remote",
            "--force-refresh",
            "--deadline",
            "90",
        ])
        .unwrap();

        let Command::Scrape(args) = config.command else {
            panic!("expected scrape command");
        };
        let options = args.options();
        assert_eq!(options.max_pages, 2);
        assert_eq!(options.max_jobs, DEFAULT_MAX_JOBS);
        assert_eq!(
            options.filters,
            vec![
                ("q".to_string(), "rust".to_string()),
                ("location".to_string(), "remote".to_string())
            ]
        );
        assert!(options.force_refresh);
        assert_eq!(args.deadline(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn malformed_filter_is_rejected() {
        let result = Config::try_parse_from([
            "jobscraper",
            "scrape",
            "--source",
            "remoteok",
            "--filter",
            "=oops",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let config =
            Config::try_parse_from(["jobscraper", "sources", "--log-format", "json"]).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.request_timeout, 30);
    }
}
