pub mod config;
pub mod ingest;
pub mod report;
pub mod scrape;
pub mod status;

pub use config::FolioConfig;
pub use scrape::{ScrapeOptions, ScrapeOutcome, ScrapeRequest, execute_scrape};
pub use status::{ScrapeStatusStore, StatusError};
