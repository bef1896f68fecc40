use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use folio_core::FolioConfig;
use folio_core::report::{
    ReportFormat, generate_document_report, generate_json_report, generate_text_report,
    save_report,
};
use folio_core::scrape::{ScrapeOptions, ScrapeRequest, execute_scrape, score_document};
use folio_scanner::robots::ComplianceGate;
use folio_scanner::{HttpEngine, HttpSettings, RenderEngine};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use url::Url;

// Helper functions

/// Default log filter when `RUST_LOG` is unset.
pub fn default_log_filter(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "warn"
    } else if verbose {
        "folio=debug,folio_core=debug,folio_scanner=debug"
    } else {
        "folio=info,folio_core=info,folio_scanner=info"
    }
}

/// Logs go to stderr so reports on stdout stay pipeable.
pub fn init_tracing(quiet: bool, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(quiet, verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Assume https:// for bare hosts like `vendor.example/gallery`.
pub fn with_default_scheme(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

pub fn load_html_file(path: &Path) -> Result<String> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("Failed to read HTML file {}", path.display()))?;
    if html.trim().is_empty() {
        bail!("HTML file {} is empty", path.display());
    }
    Ok(html)
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOverrides {
    pub max_depth: Option<usize>,
    pub max_pages: Option<usize>,
    pub max_images: Option<usize>,
    pub delay_ms: Option<u64>,
    pub ignore_crawl_delay: bool,
}

impl ScrapeOverrides {
    pub fn from_matches(args: &ArgMatches) -> Self {
        Self {
            max_depth: args.get_one::<usize>("max-depth").copied(),
            max_pages: args.get_one::<usize>("max-pages").copied(),
            max_images: args.get_one::<usize>("max-images").copied(),
            delay_ms: args.get_one::<u64>("delay-ms").copied(),
            ignore_crawl_delay: args.get_flag("ignore-crawl-delay"),
        }
    }

    pub fn apply(&self, config: &mut FolioConfig) {
        if let Some(depth) = self.max_depth {
            config.budget.max_depth = depth;
        }
        if let Some(pages) = self.max_pages {
            config.budget.max_pages_visited = pages;
        }
        if let Some(images) = self.max_images {
            config.budget.max_images_per_site = images;
        }
        if let Some(delay) = self.delay_ms {
            config.budget.politeness_delay_ms = delay;
        }
        if self.ignore_crawl_delay {
            config.http.honor_crawl_delay = false;
        }
    }
}

fn categories_from(args: &ArgMatches) -> Vec<String> {
    args.get_many::<String>("category")
        .map(|values| values.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect())
        .unwrap_or_default()
}

fn load_config(args: &ArgMatches) -> Result<FolioConfig> {
    let path = args.get_one::<String>("config").map(String::as_str);
    FolioConfig::load_or_default(path)
}

/// Plain HTTP by default; headless Chromium with `--browser`.
pub fn select_engine(browser: bool, http: &HttpSettings) -> Result<Arc<dyn RenderEngine>> {
    if browser {
        return browser_engine();
    }
    Ok(Arc::new(HttpEngine::new(http.clone())))
}

#[cfg(feature = "chromium")]
fn browser_engine() -> Result<Arc<dyn RenderEngine>> {
    Ok(Arc::new(folio_scanner::render::chromium::ChromiumEngine::new()))
}

#[cfg(not(feature = "chromium"))]
fn browser_engine() -> Result<Arc<dyn RenderEngine>> {
    bail!("--browser requires folio to be built with the `chromium` feature")
}

/// Prints to stdout, or saves when `output` is given.
pub fn emit_report(content: &str, output: Option<&PathBuf>, quiet: bool) -> Result<()> {
    match output {
        Some(path) => {
            save_report(content, path)
                .with_context(|| format!("Failed to save report to {}", path.display()))?;
            if !quiet {
                println!(
                    "{} Report saved to: {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                );
            }
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

// Command handlers

pub async fn handle_scrape(args: &ArgMatches, quiet: bool, cancel: CancellationToken) -> Result<()> {
    let mut config = load_config(args)?;
    ScrapeOverrides::from_matches(args).apply(&mut config);
    config.validate()?;

    let raw_url = args
        .get_one::<String>("url")
        .context("--url is required")?;
    let request = ScrapeRequest {
        start_url: with_default_scheme(raw_url),
        categories: categories_from(args),
    };
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    let engine = select_engine(args.get_flag("browser"), &config.http)?;
    let mut options = ScrapeOptions::from(&config);
    options.show_progress = !quiet;
    options.cancel = cancel;

    if !quiet {
        print_divider();
        println!("{}", "  FOLIO SCRAPE".bright_white().bold());
        print_divider();
        println!("{} Site: {}", "→".blue(), request.start_url.bright_white());
        println!(
            "{} Categories: {}",
            "→".blue(),
            request.categories.join(", ").bright_white()
        );
        println!(
            "{} Depth {} · up to {} pages · up to {} images",
            "→".blue(),
            config.budget.max_depth,
            config.budget.max_pages_visited,
            config.budget.max_images_per_site
        );
        println!();
    }

    let outcome = execute_scrape(&request, engine, &options, None).await;
    info!(
        "Scrape of {} finished: success={}",
        request.start_url, outcome.success
    );

    let content = match format {
        ReportFormat::Text => generate_text_report(&request, &outcome),
        ReportFormat::Json => generate_json_report(&request, &outcome)?,
    };
    emit_report(&content, args.get_one::<PathBuf>("output"), quiet)?;

    if !outcome.success {
        bail!(
            "Scrape failed: {}",
            outcome.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    if !quiet {
        println!(
            "{} {} relevant of {} images",
            "✓".green().bold(),
            outcome.relevant_images.len().to_string().bright_white(),
            outcome.total_images_found
        );
    }
    Ok(())
}

pub async fn handle_check(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    config.validate()?;
    let url = args.get_one::<Url>("url").context("--url is required")?;

    let gate = ComplianceGate::new(&config.http)?;
    let robots_url = ComplianceGate::robots_url(url)?;
    debug!("Checking {}", robots_url);
    let policy = gate.check(url).await;

    println!("{} {}", "→".blue(), robots_url.as_str().bright_white());
    if let Some(delay) = policy.crawl_delay {
        println!("{} Crawl-delay: {}s", "→".blue(), delay.as_secs_f64());
    }
    if policy.denied {
        println!("{} Crawling is disallowed", "✗".red().bold());
        bail!("{} disallows crawling", robots_url);
    }
    println!("{} Crawling is allowed", "✓".green().bold());
    Ok(())
}

pub fn handle_score(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    config.validate()?;

    let file = args.get_one::<PathBuf>("file").context("--file is required")?;
    let page_url = args
        .get_one::<Url>("page-url")
        .context("--page-url is required")?;
    let html = load_html_file(file)?;

    let keywords = config.taxonomy().keywords_for(&categories_from(args));
    let scores = score_document(&html, page_url, &keywords, &config.budget);

    let content = match args.get_one::<String>("format").map(String::as_str) {
        Some("json") => serde_json::to_string_pretty(&scores)?,
        _ => generate_document_report(&scores),
    };
    print!("{}", content);
    Ok(())
}
