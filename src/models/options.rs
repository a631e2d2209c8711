use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_PAGES: u32 = 5;
pub const DEFAULT_MAX_JOBS: usize = 100;

/// Inputs for one `scrape_jobs` call. Never mutated by the scraper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapingOptions {
    pub max_pages: u32,
    pub max_jobs: usize,
    /// Extra query parameters, appended to every page URL in order.
    pub filters: Vec<(String, String)>,
    /// Start from a fresh session identity.
    pub force_refresh: bool,
}

impl Default for ScrapingOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            max_jobs: DEFAULT_MAX_JOBS,
            filters: Vec::new(),
            force_refresh: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms.max(self.min_ms))
    }
}

/// Fixed per scraper; nothing at runtime feeds back into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub delay_between_requests: DelayRange,
    pub max_concurrent_requests: u32,
}

impl RateLimitConfig {
    /// Sequential scraping: concurrency is always 1.
    pub const fn sequential(requests_per_minute: u32, min_ms: u64, max_ms: u64) -> Self {
        Self {
            requests_per_minute,
            delay_between_requests: DelayRange { min_ms, max_ms },
            max_concurrent_requests: 1,
        }
    }
}
