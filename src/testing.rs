//! Test doubles for the network and the clock.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use reqwest::header::HeaderMap;

use crate::error::{Result, ScrapeError};
use crate::fetch::{FetchResponse, HttpFetch};
use crate::pacing::Pacing;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: HeaderMap,
}

type Reply = std::result::Result<FetchResponse, String>;

/// Scripted fetcher. Each URL has a queue of replies; the last reply sticks.
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, url: &str, response: FetchResponse) -> Self {
        self.push(url, Ok(response));
        self
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.with_response(
            url,
            FetchResponse {
                status: 200,
                status_text: "OK".into(),
                set_cookies: Vec::new(),
                body: html.to_string(),
            },
        )
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_response(
            url,
            FetchResponse {
                status,
                status_text: "Scripted".into(),
                set_cookies: Vec::new(),
                body: String::new(),
            },
        )
    }

    pub fn with_error(self, url: &str) -> Self {
        self.push(url, Err("connection reset".into()));
        self
    }

    fn push(&self, url: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl HttpFetch for MockFetcher {
    async fn fetch(&self, url: &str, headers: HeaderMap) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            headers,
        });

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(message)) => Err(ScrapeError::Request {
                url: url.to_string(),
                message,
            }),
            None => Ok(FetchResponse {
                status: 404,
                status_text: "Not Found".into(),
                set_cookies: Vec::new(),
                body: String::new(),
            }),
        }
    }
}

/// Virtual clock: sleeping advances time instantly; ranges resolve to their
/// lower bound; picks cycle through indices.
pub struct ManualPacing {
    start: Instant,
    wall_start: DateTime<Utc>,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
    picks: AtomicUsize,
}

impl Default for ManualPacing {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualPacing {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            wall_start: Self::wall_start(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
            picks: AtomicUsize::new(0),
        }
    }

    /// Wall clock at creation: 2024-06-15T12:00:00Z.
    pub fn wall_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock().unwrap() += by;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacing for ManualPacing {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock().unwrap()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let elapsed = *self.elapsed.lock().unwrap();
        self.wall_start + TimeDelta::from_std(elapsed).unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }

    fn between(&self, min: Duration, _max: Duration) -> Duration {
        min
    }

    fn pick(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.picks.fetch_add(1, Ordering::SeqCst) % len
    }
}
