use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Result, ScrapeError};
use crate::models::{Job, ScrapingOptions};
use crate::scrapers::Scraper;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub found: usize,
    pub new: usize,
    pub updated: usize,
}

/// Persistence collaborator. Implementations upsert on `Job::upsert_key`.
#[async_trait]
pub trait JobSink: Send {
    async fn upsert_jobs(&mut self, jobs: Vec<Job>) -> UpsertSummary;
}

/// Keeps the latest copy of every job in memory, in first-seen order.
#[derive(Debug, Default)]
pub struct MemorySink {
    index: HashMap<String, usize>,
    jobs: Vec<Job>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }
}

#[async_trait]
impl JobSink for MemorySink {
    async fn upsert_jobs(&mut self, jobs: Vec<Job>) -> UpsertSummary {
        let mut summary = UpsertSummary {
            found: jobs.len(),
            ..UpsertSummary::default()
        };

        for mut job in jobs {
            match self.index.get(job.upsert_key()) {
                Some(&pos) => {
                    let existing = &self.jobs[pos];
                    job.applied = existing.applied;
                    job.date_scraped = existing.date_scraped;
                    self.jobs[pos] = job;
                    summary.updated += 1;
                }
                None => {
                    self.index.insert(job.upsert_key().to_string(), self.jobs.len());
                    self.jobs.push(job);
                    summary.new += 1;
                }
            }
        }

        summary
    }
}

/// Run one scrape, bounded by `deadline` when given, and hand the jobs to
/// `sink`.
pub async fn run_once(
    scraper: &mut Scraper,
    options: &ScrapingOptions,
    deadline: Option<Duration>,
    sink: &mut dyn JobSink,
) -> Result<UpsertSummary> {
    let source = scraper.source_name().to_string();
    let jobs = match deadline {
        Some(limit) => tokio::time::timeout(limit, scraper.scrape_jobs(options))
            .await
            .map_err(|_| ScrapeError::DeadlineExceeded {
                source_name: source.clone(),
                secs: limit.as_secs(),
            })??,
        None => scraper.scrape_jobs(options).await?,
    };

    let summary = sink.upsert_jobs(jobs).await;
    tracing::info!(
        "Scrape of '{source}' completed with version '{}': {} found, {} new, {} updated",
        scraper.current_version(),
        summary.found,
        summary.new,
        summary.updated
    );
    Ok(summary)
}

/// Worker loop: scrape, store, sleep. Failed runs are logged and retried on
/// the next tick; exits gracefully on SIGINT.
pub async fn run_loop(
    scraper: &mut Scraper,
    options: &ScrapingOptions,
    deadline: Option<Duration>,
    poll_interval: Duration,
    sink: &mut dyn JobSink,
) -> anyhow::Result<()> {
    tracing::info!(
        "Worker started for source '{}', polling every {}s",
        scraper.source_name(),
        poll_interval.as_secs()
    );

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, exiting gracefully");
                break;
            }
            _ = async {
                if let Err(e) = run_once(scraper, options, deadline, sink).await {
                    tracing::error!("Run for '{}' failed: {e}", scraper.source_name());
                }
                tokio::time::sleep(poll_interval).await;
            } => {}
        }
    }

    Ok(())
}
