#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} returned {status} {status_text}")]
    Status {
        url: String,
        status: u16,
        status_text: String,
    },

    #[error("Version '{version}' is not registered for {source_name}")]
    UnknownVersion {
        source_name: String,
        version: String,
    },

    /// Page 1 of an attempt parsed to zero jobs. `no_results` is set when the
    /// markup carried the source's explicit "nothing found" marker.
    #[error("Version '{version}' found no jobs on the first page")]
    EmptyFirstPage { version: String, no_results: bool },

    #[error("All {source_name} scraper versions failed")]
    AllVersionsFailed { source_name: String },

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("Scrape of {source_name} exceeded the {secs}s deadline")]
    DeadlineExceeded { source_name: String, secs: u64 },
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
