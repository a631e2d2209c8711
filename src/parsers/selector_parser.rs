use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use super::normalize::{normalize_url, parse_flexible_date};
use super::JobParser;
use crate::models::{Job, JobFields};

/// Declarative field mapping for one layout version. Each field lists
/// candidate CSS selectors in priority order; the first one yielding content
/// wins.
#[derive(Debug, Clone, Copy)]
pub struct SelectorSet {
    pub job_card: &'static [&'static str],
    pub title: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    /// Read from `href`.
    pub apply_link: &'static [&'static str],
    /// Read from `datetime`, then the element text.
    pub posted_date: &'static [&'static str],
    pub salary: &'static [&'static str],
    pub tags: &'static [&'static str],
    pub next_page: &'static [&'static str],
    pub current_page: &'static [&'static str],
}

struct Compiled {
    job_card: Vec<Selector>,
    title: Vec<Selector>,
    company: Vec<Selector>,
    location: Vec<Selector>,
    apply_link: Vec<Selector>,
    posted_date: Vec<Selector>,
    salary: Vec<Selector>,
    tags: Vec<Selector>,
    next_page: Vec<Selector>,
    current_page: Vec<Selector>,
}

/// Parser driven entirely by a `SelectorSet`.
pub struct SelectorParser {
    source: String,
    origin: String,
    selectors: Compiled,
}

impl SelectorParser {
    pub fn new(source: &str, origin: &str, set: &SelectorSet) -> Self {
        let compile = |field: &str, list: &[&str]| -> Vec<Selector> {
            list.iter()
                .filter_map(|css| match Selector::parse(css) {
                    Ok(sel) => Some(sel),
                    Err(e) => {
                        tracing::warn!(source, field, css, "Skipping invalid selector: {e:?}");
                        None
                    }
                })
                .collect()
        };

        Self {
            source: source.to_string(),
            origin: origin.to_string(),
            selectors: Compiled {
                job_card: compile("job_card", set.job_card),
                title: compile("title", set.title),
                company: compile("company", set.company),
                location: compile("location", set.location),
                apply_link: compile("apply_link", set.apply_link),
                posted_date: compile("posted_date", set.posted_date),
                salary: compile("salary", set.salary),
                tags: compile("tags", set.tags),
                next_page: compile("next_page", set.next_page),
                current_page: compile("current_page", set.current_page),
            },
        }
    }

    fn parse_card(&self, card: ElementRef<'_>, now: DateTime<Utc>) -> Option<Job> {
        let sel = &self.selectors;
        let title = first_text(card, &sel.title)?;
        let company = first_text(card, &sel.company)?;

        let raw_link = first_attr(card, &sel.apply_link, "href")
            .or_else(|| card.value().attr("href").map(str::to_string))
            .unwrap_or_default();

        let posted = sel.posted_date.iter().find_map(|s| {
            card.select(s).find_map(|el| {
                el.value()
                    .attr("datetime")
                    .map(str::to_string)
                    .or_else(|| Some(element_text(el)))
                    .filter(|t| !t.is_empty())
            })
        });

        let fields = JobFields {
            title,
            company,
            location: first_text(card, &sel.location).unwrap_or_default(),
            apply_link: normalize_url(&raw_link, &self.origin),
            posted_date: parse_flexible_date(posted.as_deref(), now),
            salary: first_text(card, &sel.salary),
            tags: first_list(card, &sel.tags),
        };

        Some(Job::new(fields, &self.source, now))
    }
}

impl JobParser for SelectorParser {
    fn parse_jobs(&self, html: Option<&str>) -> Vec<Job> {
        let Some(html) = html else {
            return Vec::new();
        };
        let document = Html::parse_document(html);
        let now = Utc::now();

        let Some(cards) = self.selectors.job_card.iter().find_map(|s| {
            let cards: Vec<_> = document.select(s).collect();
            (!cards.is_empty()).then_some(cards)
        }) else {
            return Vec::new();
        };

        let total = cards.len();
        let jobs: Vec<Job> = cards
            .into_iter()
            .filter_map(|card| self.parse_card(card, now))
            .collect();

        if jobs.len() < total {
            tracing::debug!(
                source = %self.source,
                skipped = total - jobs.len(),
                "Skipped job cards missing title or company"
            );
        }
        jobs
    }

    fn has_next_page(&self, html: Option<&str>) -> bool {
        let Some(html) = html else {
            return false;
        };
        let document = Html::parse_document(html);
        self.selectors
            .next_page
            .iter()
            .any(|s| document.select(s).any(|el| !is_disabled(el)))
    }

    fn current_page(&self, html: Option<&str>) -> u32 {
        let Some(html) = html else {
            return 1;
        };
        let document = Html::parse_document(html);
        self.selectors
            .current_page
            .iter()
            .find_map(|s| document.select(s).find_map(|el| leading_number(&element_text(el))))
            .filter(|page| *page >= 1)
            .unwrap_or(1)
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(card: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|s| {
        card.select(s)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

fn first_attr(card: ElementRef<'_>, selectors: &[Selector], attr: &str) -> Option<String> {
    selectors.iter().find_map(|s| {
        card.select(s)
            .filter_map(|el| el.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string)
    })
}

fn first_list(card: ElementRef<'_>, selectors: &[Selector]) -> Vec<String> {
    selectors
        .iter()
        .map(|s| {
            card.select(s)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
        })
        .find(|tags| !tags.is_empty())
        .unwrap_or_default()
}

fn is_disabled(el: ElementRef<'_>) -> bool {
    let node = el.value();
    node.attr("disabled").is_some()
        || node.attr("aria-disabled") == Some("true")
        || node.classes().any(|c| c == "disabled")
}

fn leading_number(text: &str) -> Option<u32> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|digits| digits.parse().ok())
}
