use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Active,
    Inactive,
}

/// A normalized job listing as produced by a parser.
///
/// `apply_link` is always present (possibly empty) and, when non-empty, an
/// absolute URL. Persistence upserts on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub title: String,
    pub company: String,
    pub location: String,
    pub apply_link: String,
    pub posted_date: DateTime<Utc>,
    pub salary: Option<String>,
    pub tags: Vec<String>,
    pub status: JobStatus,
    pub applied: bool,
    pub date_scraped: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub search_text: String,
    pub source: String,
    pub source_id: String,
}

/// Fields pulled out of one job card, before derivation.
#[derive(Debug, Clone, Default)]
pub struct JobFields {
    pub title: String,
    pub company: String,
    pub location: String,
    pub apply_link: String,
    pub posted_date: DateTime<Utc>,
    pub salary: Option<String>,
    pub tags: Vec<String>,
}

impl Job {
    /// Build a fresh active listing, deriving `search_text` and `source_id`.
    pub fn new(fields: JobFields, source: &str, scraped_at: DateTime<Utc>) -> Self {
        let search_text = build_search_text(&fields);
        let source_id = crate::parsers::generate_source_id(&fields.title, &fields.company);
        Self {
            title: fields.title,
            company: fields.company,
            location: fields.location,
            apply_link: fields.apply_link,
            posted_date: fields.posted_date,
            salary: fields.salary,
            tags: fields.tags,
            status: JobStatus::Active,
            applied: false,
            date_scraped: scraped_at,
            last_updated: scraped_at,
            search_text,
            source: source.to_string(),
            source_id,
        }
    }

    /// Key used by persistence: the apply link, or the source id for cards
    /// that carried no link.
    pub fn upsert_key(&self) -> &str {
        if self.apply_link.is_empty() {
            &self.source_id
        } else {
            &self.apply_link
        }
    }
}

fn build_search_text(fields: &JobFields) -> String {
    let mut parts: Vec<&str> = vec![&fields.title, &fields.company, &fields.location];
    parts.extend(fields.tags.iter().map(String::as_str));
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
