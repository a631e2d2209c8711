// Source registry: maps a source name to a fully wired Scraper.

pub mod remoteok;
pub mod weworkremotely;

use std::sync::Arc;

use crate::error::{Result, ScrapeError};
use crate::fetch::HttpFetch;
use crate::pacing::Pacing;
use crate::scrapers::Scraper;

pub fn source_names() -> &'static [&'static str] {
    &[remoteok::NAME, weworkremotely::NAME]
}

/// Build a scraper for `name`. Every call returns an independent instance
/// with its own session.
pub fn build_scraper(
    name: &str,
    fetcher: Arc<dyn HttpFetch>,
    pacing: Arc<dyn Pacing>,
) -> Result<Scraper> {
    match name {
        remoteok::NAME => remoteok::scraper(fetcher, pacing),
        weworkremotely::NAME => weworkremotely::scraper(fetcher, pacing),
        other => Err(ScrapeError::UnknownSource(other.to_string())),
    }
}
