use crate::config::FolioConfig;
use crate::status::{ScrapeStatusStore, StatusError};
use folio_scanner::crawler::ProgressCallback;
use folio_scanner::extractor::Extractor;
use folio_scanner::ranker::Ranker;
use folio_scanner::taxonomy::{CategoryTaxonomy, KeywordSet};
use folio_scanner::{
    CrawlBudget, CrawlStats, Crawler, ErrorKind, HttpSettings, ImageCandidate, RenderEngine,
    ScanError, Termination,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub start_url: String,
    pub categories: Vec<String>,
}

/// Either a full result (possibly with no relevant images) or a failure with
/// its kind. Failures never carry partial results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOutcome {
    pub success: bool,
    pub total_images_found: usize,
    pub relevant_images: Vec<ImageCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CrawlStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,
}

impl ScrapeOutcome {
    pub fn failure(error: &ScanError) -> Self {
        Self {
            success: false,
            total_images_found: 0,
            relevant_images: Vec::new(),
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            stats: None,
            termination: None,
        }
    }
}

/// Everything a scrape needs besides the request itself.
#[derive(Clone)]
pub struct ScrapeOptions {
    pub budget: CrawlBudget,
    pub http: HttpSettings,
    pub taxonomy: CategoryTaxonomy,
    pub show_progress: bool,
    pub cancel: CancellationToken,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            budget: CrawlBudget::default(),
            http: HttpSettings::default(),
            taxonomy: CategoryTaxonomy::default(),
            show_progress: false,
            cancel: CancellationToken::new(),
        }
    }
}

impl From<&FolioConfig> for ScrapeOptions {
    fn from(config: &FolioConfig) -> Self {
        Self {
            budget: config.budget.clone(),
            http: config.http.clone(),
            taxonomy: config.taxonomy(),
            ..Self::default()
        }
    }
}

pub type ScrapeProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Crawl the request's site, then score and select its images.
pub async fn execute_scrape(
    request: &ScrapeRequest,
    engine: Arc<dyn RenderEngine>,
    options: &ScrapeOptions,
    progress_callback: Option<ScrapeProgressCallback>,
) -> ScrapeOutcome {
    let keywords = options.taxonomy.keywords_for(&request.categories);
    if keywords.is_empty() {
        warn!("No categories given; only size and wording signals will count");
    }

    let progress_bar = if options.show_progress {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Starting scrape of {}...", request.start_url));
        Some(pb)
    } else {
        None
    };

    let pb_clone = progress_bar.clone();
    let callback = progress_callback.clone();
    let crawl_progress: ProgressCallback = Arc::new(move |pages: usize, url: String| {
        if let Some(ref pb) = pb_clone {
            pb.set_message(format!("Crawling... {} pages ({})", pages, url));
            pb.tick();
        }
        if let Some(ref cb) = callback {
            cb(format!("[{}] {}", pages, url));
        }
    });

    let crawler = Crawler::new(engine)
        .with_budget(options.budget.clone())
        .with_http_settings(options.http.clone())
        .with_progress_callback(crawl_progress)
        .with_cancellation(options.cancel.clone());

    let report = match crawler.crawl(&request.start_url).await {
        Ok(report) => report,
        Err(e) => {
            if let Some(ref pb) = progress_bar {
                pb.finish_with_message(format!("Scrape failed: {}", e));
            }
            if let Some(ref cb) = progress_callback {
                cb(format!("[!] Scrape of {} failed: {}", request.start_url, e));
            }
            return ScrapeOutcome::failure(&e);
        }
    };

    let ranking = Ranker::new(options.budget.relevance_threshold, options.budget.output_limit)
        .rank(report.images, &keywords);

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Scrape complete! {} pages, {} of {} images relevant",
            report.stats.pages_visited,
            ranking.selected.len(),
            ranking.total_images_found
        ));
    }
    info!(
        "{}: {} relevant of {} images",
        request.start_url,
        ranking.selected.len(),
        ranking.total_images_found
    );

    ScrapeOutcome {
        success: true,
        total_images_found: ranking.total_images_found,
        relevant_images: ranking.selected,
        error: None,
        error_kind: None,
        stats: Some(report.stats),
        termination: Some(report.termination),
    }
}

/// Runs [`execute_scrape`] under the store's single-flight claim for
/// `business_id`, recording the result.
pub async fn execute_tracked_scrape(
    store: &ScrapeStatusStore,
    business_id: &str,
    request: &ScrapeRequest,
    engine: Arc<dyn RenderEngine>,
    options: &ScrapeOptions,
) -> Result<ScrapeOutcome, StatusError> {
    let guard = store.try_begin(business_id)?;
    let outcome = execute_scrape(request, engine, options, None).await;
    if outcome.success {
        guard.complete(format!(
            "{} relevant of {} images",
            outcome.relevant_images.len(),
            outcome.total_images_found
        ));
    } else {
        guard.fail(outcome.error.clone().unwrap_or_default());
    }
    Ok(outcome)
}

/// Every candidate on one page with its score, plus the subset that would be
/// selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentScores {
    pub page_url: String,
    pub scored: Vec<ImageCandidate>,
    pub selected: Vec<ImageCandidate>,
    pub scoring_failures: usize,
}

/// Extracts and scores the images of a single already-fetched page.
pub fn score_document(
    html: &str,
    page_url: &Url,
    keywords: &KeywordSet,
    budget: &CrawlBudget,
) -> DocumentScores {
    let extraction = Extractor::new(budget.max_links_per_level).extract(html, page_url);
    let ranker = Ranker::new(budget.relevance_threshold, budget.output_limit);
    let (scored, scoring_failures) = ranker.score_all(extraction.images, keywords);
    let selected = ranker.select(scored.clone());
    DocumentScores {
        page_url: page_url.to_string(),
        scored,
        selected,
        scoring_failures,
    }
}
