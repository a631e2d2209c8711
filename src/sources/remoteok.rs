use std::sync::Arc;

use crate::error::Result;
use crate::fetch::HttpFetch;
use crate::models::RateLimitConfig;
use crate::pacing::Pacing;
use crate::parsers::{SelectorParser, SelectorSet};
use crate::scrapers::{ParserVersion, Scraper, SourceProfile};
use crate::session::SessionManager;

pub const NAME: &str = "remoteok";
const BASE_URL: &str = "https://remoteok.com/remote-dev-jobs";
const ORIGIN: &str = "https://remoteok.com";

// Job board table; one `tr.job` row per listing.
const TABLE: SelectorSet = SelectorSet {
    job_card: &["table#jobsboard tr.job", "tr.job[data-id]"],
    title: &["h2[itemprop=title]", "td.company_and_position h2"],
    company: &["h3[itemprop=name]", "td.company_and_position h3", "span.companyLink h3"],
    location: &["div.location:not(.tooltip)", "div.location"],
    apply_link: &["a.preventLink[itemprop=url]", "a.preventLink", "td.company_and_position a"],
    posted_date: &["td.time time", "time"],
    salary: &["div.salary", "div.location.tooltip"],
    tags: &["td.tags a.tag h3", "td.tags .tag"],
    next_page: &["a.pagination-next", "a[rel=next]"],
    current_page: &["span.pagination-current"],
};

// Card grid.
const CARDS: SelectorSet = SelectorSet {
    job_card: &["div.jobs-grid div.job-card", "div.job-card"],
    title: &["[data-testid=job-title]", "h2.job-card__title"],
    company: &["[data-testid=company-name]", "span.job-card__company"],
    location: &["[data-testid=job-location]", "span.job-card__location"],
    apply_link: &["a.job-card__link", "a[href^='/remote-jobs/']"],
    posted_date: &["time", "span.job-card__age"],
    salary: &["[data-testid=job-salary]", "span.job-card__salary"],
    tags: &["ul.job-card__tags li", "span.job-card__tag"],
    next_page: &["a.pagination-next", "a[rel=next]"],
    current_page: &["span.pagination-current", "[aria-current=page]"],
};

fn profile() -> SourceProfile {
    SourceProfile {
        name: NAME.to_string(),
        base_url: BASE_URL.to_string(),
        page_param: "page".to_string(),
        rate_limit: RateLimitConfig::sequential(10, 4_000, 8_000),
        no_results_markers: vec!["No jobs found".to_string()],
    }
}

pub fn scraper(fetcher: Arc<dyn HttpFetch>, pacing: Arc<dyn Pacing>) -> Result<Scraper> {
    let session = SessionManager::new(fetcher, pacing.clone());
    let current = ParserVersion::new("table", SelectorParser::new(NAME, ORIGIN, &TABLE))
        .with_markers(&["id=\"jobsboard\""]);
    let mut scraper = Scraper::new(profile(), current, session, pacing)?;
    scraper.register_version(
        ParserVersion::new("cards", SelectorParser::new(NAME, ORIGIN, &CARDS))
            .with_markers(&["jobs-grid", "job-card__title"]),
    );
    Ok(scraper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScrapingOptions;
    use crate::parsers::JobParser;
    use crate::testing::{ManualPacing, MockFetcher};

    const TABLE_PAGE: &str = r#"
        <html><body><table id="jobsboard"><tbody>
          <tr class="job" data-id="1001">
            <td class="company_and_position">
              <a class="preventLink" itemprop="url" href="/remote-jobs/1001-rust-developer-initech">
                <h2 itemprop="title">Rust Developer</h2>
              </a>
              <span class="companyLink"><h3 itemprop="name">Initech</h3></span>
              <div class="location">Worldwide</div>
              <div class="location tooltip">$90k - $130k</div>
            </td>
            <td class="tags"><a class="tag"><h3>rust</h3></a><a class="tag"><h3>wasm</h3></a></td>
            <td class="time"><time datetime="2024-06-01T00:00:00+00:00">2w</time></td>
          </tr>
          <tr class="job" data-id="1002">
            <td class="company_and_position"><h2 itemprop="title">Ghost Listing</h2></td>
          </tr>
        </tbody></table>
        <a class="pagination-next" href="?page=2">Next</a>
        </body></html>
    "#;

    const CARDS_PAGE: &str = r#"
        <html><body><div class="jobs-grid">
          <div class="job-card">
            <a class="job-card__link" href="https://jobs.umbrella.example/apply/7">
              <h2 class="job-card__title" data-testid="job-title">Data Engineer</h2>
            </a>
            <span class="job-card__company" data-testid="company-name">Umbrella</span>
            <span class="job-card__location" data-testid="job-location">Remote (US)</span>
            <span class="job-card__age">5 hours ago</span>
            <ul class="job-card__tags"><li>python</li><li>spark</li></ul>
          </div>
        </div></body></html>
    "#;

    #[test]
    fn table_layout_parses() {
        let parser = SelectorParser::new(NAME, ORIGIN, &TABLE);
        let jobs = parser.parse_jobs(Some(TABLE_PAGE));
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.title, "Rust Developer");
        assert_eq!(job.company, "Initech");
        assert_eq!(job.location, "Worldwide");
        assert_eq!(job.salary.as_deref(), Some("$90k - $130k"));
        assert_eq!(
            job.apply_link,
            "https://remoteok.com/remote-jobs/1001-rust-developer-initech"
        );
        assert_eq!(job.tags, vec!["rust", "wasm"]);
        assert_eq!(job.source, "remoteok");
        assert_eq!(job.source_id, "rust-developer-initech");
        assert!(parser.has_next_page(Some(TABLE_PAGE)));
    }

    #[test]
    fn card_layout_parses() {
        let parser = SelectorParser::new(NAME, ORIGIN, &CARDS);
        let jobs = parser.parse_jobs(Some(CARDS_PAGE));
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.title, "Data Engineer");
        assert_eq!(job.company, "Umbrella");
        assert_eq!(job.location, "Remote (US)");
        assert_eq!(job.apply_link, "https://jobs.umbrella.example/apply/7");
        assert_eq!(job.tags, vec!["python", "spark"]);
        assert!(!parser.has_next_page(Some(CARDS_PAGE)));
    }

    #[tokio::test]
    async fn detects_card_redesign() {
        let fetcher = Arc::new(MockFetcher::new().with_page(BASE_URL, CARDS_PAGE));
        let mut scraper = scraper(fetcher.clone(), Arc::new(ManualPacing::new())).unwrap();

        let jobs = scraper.scrape_jobs(&ScrapingOptions::default()).await.unwrap();
        assert_eq!(jobs[0].title, "Data Engineer");
        assert_eq!(scraper.current_version(), "cards");
        assert_eq!(fetcher.urls().len(), 3);
    }

    #[test]
    fn rate_limit_is_sequential() {
        let scraper = scraper(
            Arc::new(MockFetcher::new()),
            Arc::new(ManualPacing::new()),
        )
        .unwrap();
        let limit = scraper.rate_limit();
        assert_eq!(limit.requests_per_minute, 10);
        assert_eq!(limit.max_concurrent_requests, 1);
        assert_eq!(limit, scraper.rate_limit());
    }
}
