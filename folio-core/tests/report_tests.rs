// Tests for report generation

use folio_core::report::{
    ReportFormat, generate_document_report, generate_json_report, generate_text_report,
    save_report,
};
use folio_core::scrape::{ScrapeOutcome, ScrapeRequest, score_document};
use folio_scanner::taxonomy::CategoryTaxonomy;
use folio_scanner::{CrawlBudget, CrawlStats, ImageCandidate, ScanError, Termination};
use tempfile::NamedTempFile;
use url::Url;

fn request() -> ScrapeRequest {
    ScrapeRequest {
        start_url: "https://vendor.example".to_string(),
        categories: vec!["Florist".to_string()],
    }
}

fn scored(src: &str, score: f64) -> ImageCandidate {
    let mut image = ImageCandidate::new(
        format!("https://vendor.example{}", src),
        "https://vendor.example/gallery".to_string(),
    )
    .with_alt("Bridal bouquet with peonies")
    .with_dimensions(Some(800), Some(600));
    image.set_score(score).unwrap();
    image
}

fn successful_outcome() -> ScrapeOutcome {
    ScrapeOutcome {
        success: true,
        total_images_found: 5,
        relevant_images: vec![scored("/img/bouquet.jpg", 0.9), scored("/img/arch.jpg", 0.8)],
        error: None,
        error_kind: None,
        stats: Some(CrawlStats {
            pages_visited: 4,
            pages_failed: 1,
            links_enqueued: 6,
            ..CrawlStats::default()
        }),
        termination: Some(Termination::FrontierExhausted),
    }
}

// ============================================================================
// Report Format Tests
// ============================================================================

#[test]
fn test_report_format_from_str() {
    assert!(matches!(ReportFormat::from_str("text"), Some(ReportFormat::Text)));
    assert!(matches!(ReportFormat::from_str("txt"), Some(ReportFormat::Text)));
    assert!(matches!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json)));
    assert!(ReportFormat::from_str("pdf").is_none());
}

// ============================================================================
// Text Report Tests
// ============================================================================

#[test]
fn test_text_report_lists_images_in_order() {
    let report = generate_text_report(&request(), &successful_outcome());

    assert!(report.contains("FOLIO PORTFOLIO SCRAPE REPORT"));
    assert!(report.contains("Categories:   Florist"));
    assert!(report.contains("Pages:        4 visited, 1 failed"));
    assert!(report.contains("Stopped:      no more pages to visit"));
    assert!(report.contains("Images:       2 relevant of 5 found"));

    let first = report.find("[1] 0.90  https://vendor.example/img/bouquet.jpg").unwrap();
    let second = report.find("[2] 0.80  https://vendor.example/img/arch.jpg").unwrap();
    assert!(first < second);
    assert!(report.contains("size:    800x600"));
}

#[test]
fn test_text_report_for_failure() {
    let outcome = ScrapeOutcome::failure(&ScanError::ComplianceDenied(
        "https://vendor.example/robots.txt".to_string(),
    ));
    let report = generate_text_report(&request(), &outcome);

    assert!(report.contains("Status:       Failed"));
    assert!(report.contains("Error kind:   ComplianceDenied"));
    assert!(report.contains("robots.txt"));
    assert!(!report.contains("RELEVANT IMAGES"));
}

#[test]
fn test_text_report_without_relevant_images() {
    let mut outcome = successful_outcome();
    outcome.relevant_images.clear();
    let report = generate_text_report(&request(), &outcome);
    assert!(report.contains("No images scored above the relevance threshold."));
}

// ============================================================================
// JSON Report Tests
// ============================================================================

#[test]
fn test_json_report_structure() {
    let json = generate_json_report(&request(), &successful_outcome()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["metadata"]["generator"], "Folio");
    assert_eq!(value["request"]["startUrl"], "https://vendor.example");
    assert_eq!(value["outcome"]["success"], true);
    assert_eq!(value["outcome"]["totalImagesFound"], 5);
    assert_eq!(
        value["outcome"]["relevantImages"][0]["src"],
        "https://vendor.example/img/bouquet.jpg"
    );
    assert_eq!(value["outcome"]["relevantImages"][0]["relevanceScore"], 0.9);
}

// ============================================================================
// Document Report Tests
// ============================================================================

#[test]
fn test_document_report_shows_every_image() {
    let html = r#"<html><body>
        <img src="/img/centerpiece.jpg" alt="Wedding centerpiece with roses and peonies" width="900" height="600">
        <img src="/img/icon.png" alt="icon">
    </body></html>"#;
    let page = Url::parse("https://vendor.example/gallery").unwrap();
    let keywords = CategoryTaxonomy::default().keywords_for(&["Florist"]);
    let scores = score_document(html, &page, &keywords, &CrawlBudget::default());

    let report = generate_document_report(&scores);
    assert!(report.contains("Page:         https://vendor.example/gallery"));
    assert!(report.contains("Images:       2 scored, 1 selected"));
    assert!(report.contains("https://vendor.example/img/centerpiece.jpg"));
    assert!(report.contains("https://vendor.example/img/icon.png"));
}

#[test]
fn test_save_report() -> Result<(), Box<dyn std::error::Error>> {
    let temp_file = NamedTempFile::new()?;
    save_report("hello", temp_file.path())?;
    assert_eq!(std::fs::read_to_string(temp_file.path())?, "hello");
    Ok(())
}
