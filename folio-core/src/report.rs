// Report rendering for scrape outcomes

use crate::scrape::{DocumentScores, ScrapeOutcome, ScrapeRequest};
use folio_scanner::ImageCandidate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn generate_text_report(request: &ScrapeRequest, outcome: &ScrapeOutcome) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("                         FOLIO PORTFOLIO SCRAPE REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("Site:         {}\n", request.start_url));
    report.push_str(&format!("Categories:   {}\n", format_categories(&request.categories)));
    report.push_str(&format!(
        "Status:       {}\n",
        if outcome.success { "Completed" } else { "Failed" }
    ));

    if !outcome.success {
        if let Some(ref kind) = outcome.error_kind {
            report.push_str(&format!("Error kind:   {:?}\n", kind));
        }
        if let Some(ref error) = outcome.error {
            report.push_str(&format!("Error:        {}\n", error));
        }
        report.push('\n');
        return report;
    }

    if let Some(ref stats) = outcome.stats {
        report.push_str(&format!("Pages:        {} visited, {} failed\n", stats.pages_visited, stats.pages_failed));
        report.push_str(&format!(
            "Links:        {} enqueued, {} over the per-page cap\n",
            stats.links_enqueued, stats.links_over_cap
        ));
    }
    if let Some(termination) = outcome.termination {
        report.push_str(&format!("Stopped:      {}\n", describe_termination(termination)));
    }
    report.push_str(&format!(
        "Images:       {} relevant of {} found\n\n",
        outcome.relevant_images.len(),
        outcome.total_images_found
    ));

    if outcome.relevant_images.is_empty() {
        report.push_str("No images scored above the relevance threshold.\n\n");
        return report;
    }

    report.push_str(RULE);
    report.push_str("RELEVANT IMAGES\n");
    report.push_str(RULE);
    report.push('\n');
    push_images(&mut report, &outcome.relevant_images);
    report
}

/// Per-image scores for a single page, selected or not.
pub fn generate_document_report(scores: &DocumentScores) -> String {
    let mut report = String::new();
    report.push_str(&format!("Page:         {}\n", scores.page_url));
    report.push_str(&format!(
        "Images:       {} scored, {} selected\n",
        scores.scored.len(),
        scores.selected.len()
    ));
    if scores.scoring_failures > 0 {
        report.push_str(&format!("Unscored:     {}\n", scores.scoring_failures));
    }
    report.push('\n');
    push_images(&mut report, &scores.scored);
    report
}

fn push_images(report: &mut String, images: &[ImageCandidate]) {
    for (idx, image) in images.iter().enumerate() {
        let score = image
            .relevance_score()
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        report.push_str(&format!("[{}] {}  {}\n", idx + 1, score, image.source_url));
        report.push_str(&format!("    page:    {}\n", image.page_url));
        if let (Some(width), Some(height)) = (image.width, image.height) {
            report.push_str(&format!("    size:    {}x{}\n", width, height));
        }
        if !image.alt_text.is_empty() {
            report.push_str(&format!("    alt:     {}\n", image.alt_text));
        }
        if !image.title_text.is_empty() {
            report.push_str(&format!("    title:   {}\n", image.title_text));
        }
        if !image.surrounding_context.is_empty() {
            report.push_str(&format!("    context: {}\n", image.surrounding_context));
        }
        report.push('\n');
    }
}

pub fn generate_json_report(
    request: &ScrapeRequest,
    outcome: &ScrapeOutcome,
) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "metadata": {
            "generator": "Folio",
            "version": env!("CARGO_PKG_VERSION"),
            "generatedAt": chrono::Utc::now().to_rfc3339(),
        },
        "request": request,
        "outcome": outcome,
    });
    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn format_categories(categories: &[String]) -> String {
    if categories.is_empty() {
        "(none)".to_string()
    } else {
        categories.join(", ")
    }
}

fn describe_termination(termination: folio_scanner::Termination) -> &'static str {
    use folio_scanner::Termination::*;
    match termination {
        FrontierExhausted => "no more pages to visit",
        PageBudgetReached => "page budget reached",
        ImageBudgetReached => "image budget reached",
    }
}
