//! Job listing scraper engine.
//!
//! Versioned parsers turn board markup into [`models::Job`] records, a
//! per-source [`scrapers::Scraper`] paginates and falls back across parser
//! versions when a layout changes, and a [`session::SessionManager`] rotates
//! browser identity and cookies between requests.

pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod pacing;
pub mod parsers;
pub mod scrapers;
pub mod session;
pub mod sources;

#[cfg(test)]
pub mod testing;

pub use error::{Result, ScrapeError};
