pub mod config;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod frontier;
pub mod ranker;
pub mod render;
pub mod result;
pub mod robots;
pub mod scorer;
pub mod taxonomy;

pub use config::{CrawlBudget, HttpSettings};
pub use crawler::Crawler;
pub use error::{ErrorKind, ScanError};
pub use ranker::{Ranker, Ranking};
pub use render::{HttpEngine, RenderEngine, StaticEngine};
pub use result::{CrawlReport, CrawlStats, ImageCandidate, SessionState, Termination};
pub use taxonomy::{CategoryTaxonomy, KeywordSet};
