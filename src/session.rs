use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::error::Result;
use crate::fetch::{FetchResponse, HttpFetch};
use crate::models::DelayRange;
use crate::pacing::Pacing;

pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Rotate once the session is older than this.
    pub ttl: Duration,
    /// Rotate once more than this many requests went out on one identity.
    pub max_requests: u32,
    pub cooldown: DelayRange,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            max_requests: 100,
            cooldown: DelayRange {
                min_ms: 2_000,
                max_ms: 5_000,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub age: Duration,
    pub request_count: u32,
    pub cookie_count: usize,
    pub current_user_agent: String,
}

/// One browser identity plus its cookie jar, for a single source.
///
/// Methods take `&mut self`: a session is driven by exactly one scraper and
/// is never shared between concurrent call paths.
pub struct SessionManager {
    fetcher: Arc<dyn HttpFetch>,
    pacing: Arc<dyn Pacing>,
    config: SessionConfig,
    cookies: BTreeMap<String, String>,
    session_start: Instant,
    request_count: u32,
    user_agent: &'static str,
}

impl SessionManager {
    pub fn new(fetcher: Arc<dyn HttpFetch>, pacing: Arc<dyn Pacing>) -> Self {
        Self::with_config(fetcher, pacing, SessionConfig::default())
    }

    pub fn with_config(
        fetcher: Arc<dyn HttpFetch>,
        pacing: Arc<dyn Pacing>,
        config: SessionConfig,
    ) -> Self {
        let user_agent = USER_AGENTS[pacing.pick(USER_AGENTS.len())];
        let session_start = pacing.now();
        Self {
            fetcher,
            pacing,
            config,
            cookies: BTreeMap::new(),
            session_start,
            request_count: 0,
            user_agent,
        }
    }

    /// Full browser-like header set for the current identity, including the
    /// serialized cookie jar.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let fixed: [(HeaderName, &'static str); 11] = [
            (
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
            (header::ACCEPT_LANGUAGE, "en-US,en;q=0.9"),
            (header::ACCEPT_ENCODING, "gzip, deflate, br"),
            (header::DNT, "1"),
            (header::CONNECTION, "keep-alive"),
            (header::UPGRADE_INSECURE_REQUESTS, "1"),
            (HeaderName::from_static("sec-fetch-dest"), "document"),
            (HeaderName::from_static("sec-fetch-mode"), "navigate"),
            (HeaderName::from_static("sec-fetch-site"), "none"),
            (HeaderName::from_static("sec-fetch-user"), "?1"),
            (header::CACHE_CONTROL, "max-age=0"),
        ];
        for (name, value) in fixed {
            headers.insert(name, HeaderValue::from_static(value));
        }
        headers.insert(header::USER_AGENT, HeaderValue::from_static(self.user_agent));

        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    headers.insert(header::COOKIE, value);
                }
                Err(e) => tracing::warn!("Dropping unencodable cookie header: {e}"),
            }
        }

        headers
    }

    /// Send a GET through the current identity, rotating first if the session
    /// is stale. Headers in `overrides` replace the session's own.
    pub async fn make_request(
        &mut self,
        url: &str,
        overrides: Option<HeaderMap>,
    ) -> Result<FetchResponse> {
        if self.needs_rotation() {
            self.rotate().await;
        }

        let mut headers = self.headers();
        if let Some(overrides) = overrides {
            for (name, value) in &overrides {
                headers.insert(name.clone(), value.clone());
            }
        }

        let response = self.fetcher.fetch(url, headers).await?;
        self.request_count += 1;

        for line in &response.set_cookies {
            self.store_cookies(line);
        }

        Ok(response)
    }

    pub fn needs_rotation(&self) -> bool {
        let age = self.pacing.now().saturating_duration_since(self.session_start);
        age > self.config.ttl || self.request_count > self.config.max_requests
    }

    /// Drop all session state, take on a new identity and wait out a cool-down.
    pub async fn rotate(&mut self) {
        let previous = self.user_agent;
        self.cookies.clear();
        self.request_count = 0;
        self.user_agent = self.next_user_agent();

        let cooldown = self
            .pacing
            .between(self.config.cooldown.min(), self.config.cooldown.max());
        tracing::info!(
            cooldown_ms = cooldown.as_millis() as u64,
            changed_identity = previous != self.user_agent,
            "Rotating scraper session"
        );
        self.pacing.sleep(cooldown).await;
        self.session_start = self.pacing.now();
    }

    fn next_user_agent(&self) -> &'static str {
        let mut idx = self.pacing.pick(USER_AGENTS.len());
        if USER_AGENTS[idx] == self.user_agent {
            idx = (idx + 1) % USER_AGENTS.len();
        }
        USER_AGENTS[idx]
    }

    pub fn session_info(&self) -> SessionInfo {
        SessionInfo {
            age: self.pacing.now().saturating_duration_since(self.session_start),
            request_count: self.request_count,
            cookie_count: self.cookies.len(),
            current_user_agent: self.user_agent.to_string(),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    fn store_cookies(&mut self, line: &str) {
        let now = self.pacing.utc_now();
        for segment in split_set_cookie(line) {
            let mut parts = segment.split(';');
            let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            if parts.any(|attr| is_expiry_attribute(attr, now)) {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.trim().to_string());
            }
        }
    }
}

/// Split one `Set-Cookie` value into per-cookie segments. A comma only starts
/// a new cookie when it is followed by `name=`, so `Expires` dates survive.
pub fn split_set_cookie(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (i, ch) in line.char_indices() {
        if ch == ',' && starts_cookie_pair(&line[i + 1..]) {
            segments.push(&line[start..i]);
            start = i + 1;
        }
    }
    segments.push(&line[start..]);
    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn starts_cookie_pair(rest: &str) -> bool {
    let rest = rest.trim_start();
    match rest.find('=') {
        Some(eq) if eq > 0 => rest[..eq].bytes().all(is_token_byte),
        _ => false,
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// `Max-Age<=0` or an `Expires` before `now`.
fn is_expiry_attribute(attr: &str, now: DateTime<Utc>) -> bool {
    let Some((key, value)) = attr.split_once('=') else {
        return false;
    };
    let value = value.trim();
    match key.trim().to_ascii_lowercase().as_str() {
        "max-age" => value.parse::<i64>().is_ok_and(|secs| secs <= 0),
        "expires" => DateTime::parse_from_rfc2822(value)
            .is_ok_and(|at| at.with_timezone(&Utc) < now),
        _ => false,
    }
}
