pub mod job;
pub mod options;

pub use job::{Job, JobFields, JobStatus};
pub use options::{DelayRange, RateLimitConfig, ScrapingOptions};
