use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::models::{Job, RateLimitConfig, ScrapingOptions};
use crate::pacing::Pacing;
use crate::parsers::JobParser;
use crate::session::{SessionInfo, SessionManager};

/// Characters that encodeURIComponent does NOT encode.
/// RFC 3986 unreserved: A-Z a-z 0-9 - _ . ! ~ * ' ( )
const ENCODE_URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Static facts about one job board.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub name: String,
    /// First listing page. Later pages add `page_param`.
    pub base_url: String,
    pub page_param: String,
    pub rate_limit: RateLimitConfig,
    /// Substrings the board renders when a search genuinely has no results.
    pub no_results_markers: Vec<String>,
}

/// A named parser for one layout, plus the markup substrings that identify
/// that layout during detection.
pub struct ParserVersion {
    pub name: String,
    pub parser: Box<dyn JobParser>,
    pub markers: Vec<String>,
}

impl ParserVersion {
    pub fn new(name: impl Into<String>, parser: impl JobParser + 'static) -> Self {
        Self {
            name: name.into(),
            parser: Box::new(parser),
            markers: Vec::new(),
        }
    }

    pub fn with_markers(mut self, markers: &[&str]) -> Self {
        self.markers = markers.iter().map(|m| m.to_string()).collect();
        self
    }
}

enum Attempt {
    Jobs(Vec<Job>),
    /// The board says there is nothing to list; not a parser failure.
    NoListings,
    Failed,
}

/// Per-source orchestrator: paginates, detects layout changes and falls back
/// across registered parser versions.
///
/// One instance per source. `&mut self` on the scraping methods keeps each
/// scraper, and the session it owns, on a single call path at a time.
pub struct Scraper {
    profile: SourceProfile,
    origin: String,
    versions: Vec<ParserVersion>,
    current_version: String,
    session: SessionManager,
    pacing: Arc<dyn Pacing>,
}

impl Scraper {
    pub fn new(
        profile: SourceProfile,
        default_version: ParserVersion,
        session: SessionManager,
        pacing: Arc<dyn Pacing>,
    ) -> Result<Self> {
        let origin = Url::parse(&profile.base_url)?.origin().ascii_serialization();
        Ok(Self {
            profile,
            origin,
            current_version: default_version.name.clone(),
            versions: vec![default_version],
            session,
            pacing,
        })
    }

    /// Add a layout version, or replace one of the same name in place.
    pub fn register_version(&mut self, version: ParserVersion) {
        match self.versions.iter_mut().find(|v| v.name == version.name) {
            Some(existing) => *existing = version,
            None => self.versions.push(version),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.profile.name
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn available_versions(&self) -> Vec<String> {
        self.versions.iter().map(|v| v.name.clone()).collect()
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        self.profile.rate_limit
    }

    pub fn session_info(&self) -> SessionInfo {
        self.session.session_info()
    }

    /// Scrape with the current version, then a detected one, then every other
    /// registered version, until one produces jobs.
    pub async fn scrape_jobs(&mut self, options: &ScrapingOptions) -> Result<Vec<Job>> {
        if options.max_pages == 0 || options.max_jobs == 0 {
            return Ok(Vec::new());
        }
        if options.force_refresh {
            self.session.rotate().await;
        }

        let source = self.profile.name.clone();
        let current = self.current_version.clone();
        let mut tried = vec![current.clone()];

        match self.attempt(&current, options).await {
            Attempt::Jobs(jobs) => return Ok(truncated(jobs, options.max_jobs)),
            Attempt::NoListings => return Ok(Vec::new()),
            Attempt::Failed => {}
        }

        match self.detect_version().await {
            Some(detected) if detected != current => {
                tracing::info!(source = %source, from = %current, to = %detected, "Detected layout version change");
                tried.push(detected.clone());
                match self.attempt(&detected, options).await {
                    Attempt::Jobs(jobs) => {
                        self.current_version = detected;
                        return Ok(truncated(jobs, options.max_jobs));
                    }
                    // The marker is per source, so it says nothing about which layout is live.
                    Attempt::NoListings => return Ok(Vec::new()),
                    Attempt::Failed => {}
                }
            }
            Some(_) => tracing::debug!(source = %source, "Detection matched the failing version"),
            None => tracing::debug!(source = %source, "No layout version detected"),
        }

        for name in self.available_versions() {
            if tried.contains(&name) {
                continue;
            }
            tracing::info!(source = %source, version = %name, "Falling back to parser version");
            match self.attempt(&name, options).await {
                Attempt::Jobs(jobs) => {
                    self.current_version = name;
                    return Ok(truncated(jobs, options.max_jobs));
                }
                Attempt::NoListings => return Ok(Vec::new()),
                Attempt::Failed => {}
            }
        }

        tracing::error!(source = %source, tried = ?self.available_versions(), "Every parser version failed");
        Err(ScrapeError::AllVersionsFailed {
            source_name: source,
        })
    }

    async fn attempt(&mut self, version: &str, options: &ScrapingOptions) -> Attempt {
        match self
            .scrape_pages(version, options.max_pages, options.max_jobs, &options.filters)
            .await
        {
            Ok(jobs) if !jobs.is_empty() => Attempt::Jobs(jobs),
            Ok(_) => Attempt::Failed,
            Err(ScrapeError::EmptyFirstPage {
                no_results: true, ..
            }) => {
                tracing::info!(source = %self.profile.name, version, "Source reports no listings");
                Attempt::NoListings
            }
            Err(e) => {
                tracing::warn!(source = %self.profile.name, version, "Parser version failed: {e}");
                Attempt::Failed
            }
        }
    }

    /// Paginate with one named version. Only a failure on page 1 is an error;
    /// later failures end pagination and keep what was collected.
    pub async fn scrape_with_version(
        &mut self,
        version: &str,
        max_pages: u32,
        max_jobs: usize,
    ) -> Result<Vec<Job>> {
        self.scrape_pages(version, max_pages, max_jobs, &[]).await
    }

    async fn scrape_pages(
        &mut self,
        version: &str,
        max_pages: u32,
        max_jobs: usize,
        filters: &[(String, String)],
    ) -> Result<Vec<Job>> {
        let idx = self
            .versions
            .iter()
            .position(|v| v.name == version)
            .ok_or_else(|| ScrapeError::UnknownVersion {
                source_name: self.profile.name.clone(),
                version: version.to_string(),
            })?;

        let mut jobs = Vec::new();
        for page in 1..=max_pages {
            if jobs.len() >= max_jobs {
                break;
            }

            let url = self.page_url(page, filters);
            let html = match fetch_page(&mut self.session, &url).await {
                Ok(html) => html,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    tracing::warn!(source = %self.profile.name, version, page, "Stopping pagination: {e}");
                    break;
                }
            };

            let parser = &self.versions[idx].parser;
            let page_jobs = parser.parse_jobs(Some(&html));
            tracing::debug!(
                source = %self.profile.name,
                version,
                page,
                reported_page = parser.current_page(Some(&html)),
                found = page_jobs.len(),
                "Parsed listing page"
            );

            if page_jobs.is_empty() {
                if page == 1 {
                    return Err(ScrapeError::EmptyFirstPage {
                        version: version.to_string(),
                        no_results: self.shows_no_results(&html),
                    });
                }
                break;
            }
            jobs.extend(page_jobs);

            if !parser.has_next_page(Some(&html)) {
                break;
            }
            if page < max_pages && jobs.len() < max_jobs {
                let delay = self.page_delay();
                self.pacing.sleep(delay).await;
            }
        }

        Ok(jobs)
    }

    /// Fetch the base URL once and match each version's markers, in registry
    /// order.
    pub async fn detect_version(&mut self) -> Option<String> {
        let html = match fetch_page(&mut self.session, &self.profile.base_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(source = %self.profile.name, "Version detection request failed: {e}");
                return None;
            }
        };

        self.versions
            .iter()
            .find(|v| v.markers.iter().any(|m| html.contains(m.as_str())))
            .map(|v| v.name.clone())
    }

    pub async fn is_healthy(&mut self) -> bool {
        match self.session.make_request(&self.profile.base_url, None).await {
            Ok(resp) => resp.ok(),
            Err(e) => {
                tracing::warn!(source = %self.profile.name, "Health check failed: {e}");
                false
            }
        }
    }

    fn page_url(&self, page: u32, filters: &[(String, String)]) -> String {
        let mut params: Vec<String> = filters
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect();
        if page > 1 {
            params.push(format!("{}={page}", self.profile.page_param));
        }
        if params.is_empty() {
            return self.profile.base_url.clone();
        }
        let sep = if self.profile.base_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}{}", self.profile.base_url, params.join("&"))
    }

    /// Fixed minimum plus jitter up to the configured maximum.
    fn page_delay(&self) -> Duration {
        let range = self.profile.rate_limit.delay_between_requests;
        let jitter = self
            .pacing
            .between(Duration::ZERO, range.max().saturating_sub(range.min()));
        range.min() + jitter
    }

    fn shows_no_results(&self, html: &str) -> bool {
        self.profile
            .no_results_markers
            .iter()
            .any(|m| html.contains(m.as_str()))
    }
}

async fn fetch_page(session: &mut SessionManager, url: &str) -> Result<String> {
    let resp = session.make_request(url, None).await?;
    if !resp.ok() {
        return Err(ScrapeError::Status {
            url: url.to_string(),
            status: resp.status,
            status_text: resp.status_text,
        });
    }
    Ok(resp.body)
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, ENCODE_URI_COMPONENT_SET).to_string()
}

fn truncated(mut jobs: Vec<Job>, max_jobs: usize) -> Vec<Job> {
    jobs.truncate(max_jobs);
    jobs
}
