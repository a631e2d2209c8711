// Scraper orchestration: one Scraper per source, driven by the runner.

pub mod runner;
mod scraper;

pub use self::scraper::{ParserVersion, Scraper, SourceProfile};
