// Parsers turn raw page markup into normalized job records.
// One parser per source layout version; they hold no mutable state.

mod normalize;
mod selector_parser;

pub use normalize::{generate_source_id, normalize_url, parse_flexible_date};
pub use selector_parser::{SelectorParser, SelectorSet};

use crate::models::Job;

/// Capability set every layout version provides. None of these fail: bad or
/// missing markup yields no jobs, no next page, page 1.
pub trait JobParser: Send + Sync {
    fn parse_jobs(&self, html: Option<&str>) -> Vec<Job>;

    fn has_next_page(&self, html: Option<&str>) -> bool;

    /// 1-based page number the markup claims to show.
    fn current_page(&self, html: Option<&str>) -> u32;
}
