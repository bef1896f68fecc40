// End-to-end scrape tests against a mock vendor site

use folio_core::scrape::{ScrapeOptions, ScrapeRequest, execute_scrape, execute_tracked_scrape};
use folio_core::status::{ScrapeState, ScrapeStatusStore, StatusError};
use folio_scanner::{CrawlBudget, ErrorKind, HttpEngine, HttpSettings, StaticEngine, Termination};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_bytes(body.into_bytes()),
        )
        .mount(server)
        .await;
}

fn options() -> ScrapeOptions {
    ScrapeOptions {
        budget: CrawlBudget::default().with_politeness_delay_ms(0),
        ..ScrapeOptions::default()
    }
}

fn engine() -> Arc<HttpEngine> {
    Arc::new(HttpEngine::new(HttpSettings::default()))
}

// ============================================================================
// Full pipeline
// ============================================================================

#[tokio::test]
async fn test_scrape_ranks_portfolio_images() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        r#"<html><body>
            <header><img src="/static/logo.png" alt="Studio logo" width="120" height="40"></header>
            <nav><a href="/portfolio">Portfolio</a><a href="/contact">Contact</a></nav>
            <section>
              <p>Welcome to our studio</p>
              <img src="/img/couple.jpg" alt="Beautiful wedding photography portrait" width="500" height="400">
            </section>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_html(
        &server,
        "/portfolio",
        r#"<html><body>
            <figure>
              <img src="/img/ceremony.jpg" alt="Outdoor ceremony portrait session" title="Garden wedding" width="1600" height="1067">
              <figcaption>Engagement and wedding photography</figcaption>
            </figure>
            <figure>
              <img src="/img/couple.jpg" alt="Beautiful wedding photography portrait" width="500" height="400">
            </figure>
            <img src="/img/share-icon.png" alt="share" width="24" height="24">
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_html(&server, "/contact", "<html><body><p>Email us</p></body></html>".to_string()).await;

    let request = ScrapeRequest {
        start_url: server.uri(),
        categories: vec!["Photography".to_string()],
    };
    let outcome = execute_scrape(&request, engine(), &options(), None).await;

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.total_images_found, 4);

    let selected: Vec<_> = outcome
        .relevant_images
        .iter()
        .map(|i| i.source_url.trim_start_matches(&server.uri()).to_string())
        .collect();
    assert_eq!(selected, vec!["/img/ceremony.jpg", "/img/couple.jpg"]);
    assert_eq!(outcome.relevant_images[0].relevance_score(), Some(1.0));
    assert_eq!(outcome.relevant_images[1].relevance_score(), Some(0.8));

    let stats = outcome.stats.unwrap();
    assert_eq!(stats.pages_visited, 3);
    assert_eq!(stats.duplicate_images, 1);
    assert_eq!(outcome.termination, Some(Termination::FrontierExhausted));
}

// ============================================================================
// Compliance
// ============================================================================

#[tokio::test]
async fn test_disallowed_site_fails_without_visiting_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let request = ScrapeRequest {
        start_url: server.uri(),
        categories: vec!["Catering".to_string()],
    };
    let outcome = execute_scrape(&request, engine(), &options(), None).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::ComplianceDenied));
    assert_eq!(outcome.total_images_found, 0);
    assert!(outcome.relevant_images.is_empty());
    assert!(outcome.stats.is_none());
}

#[tokio::test]
async fn test_missing_robots_permits_scrape() {
    let server = MockServer::start().await;
    mount_html(&server, "/", "<html><body><p>Hello</p></body></html>".to_string()).await;

    let request = ScrapeRequest {
        start_url: server.uri(),
        categories: vec!["Venue".to_string()],
    };
    let outcome = execute_scrape(&request, engine(), &options(), None).await;

    assert!(outcome.success);
    assert_eq!(outcome.total_images_found, 0);
    assert!(outcome.relevant_images.is_empty());
}

// ============================================================================
// Link cap
// ============================================================================

#[tokio::test]
async fn test_homepage_with_six_links_enqueues_five() {
    let server = MockServer::start().await;

    let mut home = String::from("<html><body>");
    for i in 1..=6 {
        home.push_str(&format!(r#"<a href="/gallery/{}">Gallery {}</a>"#, i, i));
        mount_html(&server, &format!("/gallery/{}", i), "<html><body></body></html>".to_string()).await;
    }
    home.push_str("</body></html>");
    mount_html(&server, "/", home).await;

    let request = ScrapeRequest {
        start_url: server.uri(),
        categories: vec!["Florist".to_string()],
    };
    let outcome = execute_scrape(&request, engine(), &options(), None).await;

    let stats = outcome.stats.unwrap();
    assert_eq!(stats.links_enqueued, 5);
    assert_eq!(stats.links_over_cap, 1);
    assert_eq!(stats.pages_visited, 6);

    let requests = server.received_requests().await.unwrap();
    assert!(!requests.iter().any(|r| r.url.path() == "/gallery/6"));
}

// ============================================================================
// Budgets and failures
// ============================================================================

#[tokio::test]
async fn test_server_errors_do_not_abort() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<html><body><a href="/broken">x</a><a href="/ok">y</a></body></html>"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/ok",
        r#"<html><body><img src="/img/cake.jpg" alt="Three tier wedding cake with flowers" width="900" height="700"></body></html>"#.to_string(),
    )
    .await;

    let request = ScrapeRequest {
        start_url: server.uri(),
        categories: vec!["Bakery".to_string()],
    };
    let outcome = execute_scrape(&request, engine(), &options(), None).await;

    assert!(outcome.success);
    assert_eq!(outcome.stats.as_ref().unwrap().pages_failed, 1);
    assert_eq!(outcome.relevant_images.len(), 1);
}

#[tokio::test]
async fn test_slow_page_times_out_and_crawl_continues() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<html><body><a href="/slow">slow</a><a href="/fast">fast</a></body></html>"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(b"<html></html>".to_vec())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_html(&server, "/fast", "<html><body></body></html>".to_string()).await;

    let mut opts = options();
    opts.http = HttpSettings {
        page_timeout_secs: 1,
        ..HttpSettings::default()
    };
    let request = ScrapeRequest {
        start_url: server.uri(),
        categories: vec![],
    };
    let outcome = execute_scrape(&request, Arc::new(HttpEngine::new(opts.http.clone())), &opts, None).await;

    let stats = outcome.stats.unwrap();
    assert_eq!(stats.pages_visited, 3);
    assert_eq!(stats.pages_failed, 1);
}

// ============================================================================
// Status tracking
// ============================================================================

#[tokio::test]
async fn test_tracked_scrape_records_status_and_refuses_overlap() {
    let root = "https://vendor.example/";
    let engine = Arc::new(StaticEngine::new().with_page(root, "<html><body></body></html>"));
    let store = ScrapeStatusStore::default();
    let request = ScrapeRequest {
        start_url: "not a url".to_string(),
        categories: vec![],
    };

    let outcome = execute_tracked_scrape(&store, "biz-9", &request, engine.clone(), &options())
        .await
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(store.get("biz-9").unwrap().state, ScrapeState::Failed);

    let _running = store.try_begin("biz-9").unwrap();
    let err = execute_tracked_scrape(&store, "biz-9", &request, engine, &options())
        .await
        .unwrap_err();
    assert!(matches!(err, StatusError::AlreadyRunning(_)));
}
