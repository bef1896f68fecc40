use folio::handlers::*;
use folio_core::FolioConfig;
use folio_scanner::HttpSettings;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_with_default_scheme_keeps_explicit_scheme() {
    assert_eq!(
        with_default_scheme("http://vendor.example/gallery"),
        "http://vendor.example/gallery"
    );
}

#[test]
fn test_with_default_scheme_adds_https() {
    assert_eq!(with_default_scheme("vendor.example"), "https://vendor.example");
    assert_eq!(with_default_scheme("  localhost:8080/ "), "https://localhost:8080/");
}

#[test]
fn test_default_log_filter() {
    assert_eq!(default_log_filter(true, false), "warn");
    assert!(default_log_filter(false, true).contains("folio_scanner=debug"));
    assert!(default_log_filter(false, false).contains("folio=info"));
}

#[test]
fn test_overrides_replace_config_values() {
    let mut config = FolioConfig::default();
    let overrides = ScrapeOverrides {
        max_depth: Some(1),
        max_pages: Some(4),
        max_images: None,
        delay_ms: Some(0),
        ignore_crawl_delay: true,
    };
    overrides.apply(&mut config);

    assert_eq!(config.budget.max_depth, 1);
    assert_eq!(config.budget.max_pages_visited, 4);
    assert_eq!(
        config.budget.max_images_per_site,
        FolioConfig::default().budget.max_images_per_site
    );
    assert_eq!(config.budget.politeness_delay_ms, 0);
    assert!(!config.http.honor_crawl_delay);
}

#[test]
fn test_empty_overrides_leave_config_alone() {
    let mut config = FolioConfig::default();
    ScrapeOverrides::default().apply(&mut config);
    assert_eq!(config.budget, FolioConfig::default().budget);
    assert!(config.http.honor_crawl_delay);
}

#[test]
fn test_load_html_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "<html><body><img src=\"/a.jpg\"></body></html>")?;

    let html = load_html_file(temp_file.path())?;
    assert!(html.contains("/a.jpg"));
    Ok(())
}

#[test]
fn test_load_html_file_rejects_empty_and_missing() -> Result<(), Box<dyn std::error::Error>> {
    let temp_file = NamedTempFile::new()?;
    assert!(load_html_file(temp_file.path()).is_err());
    assert!(load_html_file(&PathBuf::from("/nonexistent/page.html")).is_err());
    Ok(())
}

#[test]
fn test_emit_report_saves_to_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp_file = NamedTempFile::new()?;
    let path = temp_file.path().to_path_buf();

    emit_report("report body\n", Some(&path), true)?;
    assert_eq!(std::fs::read_to_string(&path)?, "report body\n");
    Ok(())
}

#[test]
fn test_select_http_engine() {
    assert!(select_engine(false, &HttpSettings::default()).is_ok());
}

#[cfg(not(feature = "chromium"))]
#[test]
fn test_browser_needs_chromium_feature() {
    let err = select_engine(true, &HttpSettings::default()).err().unwrap();
    assert!(err.to_string().contains("chromium"));
}
