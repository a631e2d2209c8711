use std::sync::Arc;

use crate::error::Result;
use crate::fetch::HttpFetch;
use crate::models::RateLimitConfig;
use crate::pacing::Pacing;
use crate::parsers::{SelectorParser, SelectorSet};
use crate::scrapers::{ParserVersion, Scraper, SourceProfile};
use crate::session::SessionManager;

pub const NAME: &str = "weworkremotely";
const BASE_URL: &str = "https://weworkremotely.com/remote-jobs/search";
const ORIGIN: &str = "https://weworkremotely.com";

/// Listing redesign with `new-listing` cards.
const V2: SelectorSet = SelectorSet {
    job_card: &["li.new-listing-container", "section.jobs li.new-listing-container"],
    title: &["h4.new-listing__header__title", ".new-listing__header h4"],
    company: &["p.new-listing__company-name", ".new-listing__company-name"],
    location: &["p.new-listing__company-headquarters", ".new-listing__categories__category--region"],
    apply_link: &["a[href*='/remote-jobs/']", "a"],
    posted_date: &["p.new-listing__header__icons__date", "time"],
    salary: &[".new-listing__categories__category--salary"],
    tags: &["p.new-listing__categories__category"],
    next_page: &["a.next_page", "a[rel=next]"],
    current_page: &[".pagination em.current", ".pagination .current"],
};

/// Classic `section.jobs` list layout.
const V1: SelectorSet = SelectorSet {
    job_card: &["section.jobs article li.feature", "section.jobs article li"],
    title: &["span.title"],
    company: &["span.company:first-of-type", "span.company"],
    location: &["span.region.company", "span.region"],
    apply_link: &["a[href^='/remote-jobs/']", "a"],
    posted_date: &["span.date time", "time", "span.date"],
    salary: &[],
    tags: &["span.listing-tag"],
    next_page: &["a.next_page", "a[rel=next]"],
    current_page: &[".pagination em.current"],
};

fn profile() -> SourceProfile {
    SourceProfile {
        name: NAME.to_string(),
        base_url: BASE_URL.to_string(),
        page_param: "page".to_string(),
        rate_limit: RateLimitConfig::sequential(20, 2_000, 5_000),
        no_results_markers: vec![
            "No results found".to_string(),
            "no-results".to_string(),
        ],
    }
}

pub fn scraper(fetcher: Arc<dyn HttpFetch>, pacing: Arc<dyn Pacing>) -> Result<Scraper> {
    let session = SessionManager::new(fetcher, pacing.clone());
    let current = ParserVersion::new("v2", SelectorParser::new(NAME, ORIGIN, &V2))
        .with_markers(&["new-listing-container", "new-listing__header"]);
    let mut scraper = Scraper::new(profile(), current, session, pacing)?;
    scraper.register_version(
        ParserVersion::new("v1", SelectorParser::new(NAME, ORIGIN, &V1))
            .with_markers(&["id=\"job_listings\"", "class=\"jobs\""]),
    );
    Ok(scraper)
}
