//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, from start URL to sink records.

use std::path::Path;
use sumi_scribe::config::{parse_config, Config};
use sumi_scribe::crawler::run_crawl;
use sumi_scribe::output::{
    format_markdown_report, write_markdown_report, RecordStatus, ReportContext, ResultRecord,
    SqliteSink,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at the mock server's `/docs/`
fn create_test_config(base_url: &str, dataset_path: &Path, extra: &str) -> Config {
    let toml = format!(
        r#"
[crawler]
start-urls = ["{base}/docs/"]
max-crawl-depth = 2
include-url-globs = ["{base}/docs/**"]
max-concurrency = 4
max-requests-per-crawl = 50
{extra}

[timeouts]
navigation-secs = 5
request-handler-secs = 10

[extraction]
min-content-length = 20
min-text-length = 20
fallback-min-text-length = 10

[error-handling]
base-delay-ms = 10

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
dataset-path = '{dataset}'
report-path = '{report}'
"#,
        base = base_url,
        extra = extra,
        dataset = dataset_path.display(),
        report = dataset_path.with_extension("md").display(),
    );

    parse_config(&toml).expect("Failed to parse test config")
}

/// A documentation page with a paragraph of text and the given links
fn doc_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<li><a href="{}">{}</a></li>"#, href, href))
        .collect();

    format!(
        r#"<html><head><title>{title}</title></head><body>
        <nav><a href="/docs/">Home</a></nav>
        <main>
            <h1>{title}</h1>
            <p>This page documents {title} in enough detail to be worth extracting.</p>
            <ul>{anchors}</ul>
        </main>
        </body></html>"#,
        title = title,
        anchors = anchors
    )
}

async fn mount_page(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}

fn read_jsonl(path: &Path) -> Vec<ResultRecord> {
    std::fs::read_to_string(path)
        .expect("Failed to read dataset")
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid JSON line"))
        .collect()
}

#[tokio::test]
async fn test_full_crawl_filters_links_by_pattern_and_depth() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("data.jsonl");

    // Start page: 2 included links, 3 that match no include glob
    mount_page(
        &server,
        "/docs/",
        doc_page(
            "Overview",
            &[
                "/docs/install",
                "/docs/usage",
                "/blog/announcement",
                "/about",
                "https://elsewhere.test/docs/",
            ],
        ),
    )
    .await;

    // Depth-1 pages: every link would land at depth 2
    mount_page(
        &server,
        "/docs/install",
        doc_page("Installation", &["/docs/install/linux", "/docs/install/macos"]),
    )
    .await;
    mount_page(
        &server,
        "/docs/usage",
        doc_page("Usage", &["/docs/usage/advanced"]),
    )
    .await;

    let config = create_test_config(&base_url, &dataset, "");
    let stats = run_crawl(&config).await.expect("Crawl failed");

    assert!(stats.is_finished());
    assert_eq!(stats.total_requests(), 3);
    assert_eq!(stats.successful_requests(), 3);
    assert_eq!(stats.failed_requests(), 0);
    assert_eq!(stats.filtered_urls(), 3);
    // Install: nav link + 2, usage: nav link + 1
    assert_eq!(stats.depth_exceeded_urls(), 3 + 2);
    assert_eq!(stats.processed_pages(), 3);
    assert_eq!(stats.success_rate(), 100.0);

    let records = read_jsonl(&dataset);
    assert_eq!(records.len() as u64, stats.extracted_chunks());
    assert!(records.iter().all(|r| r.status == RecordStatus::Success));

    let install = records
        .iter()
        .find(|r| r.url.ends_with("/docs/install"))
        .expect("Missing record for /docs/install");
    assert_eq!(install.title.as_deref(), Some("Installation"));
    assert_eq!(install.depth, 1);
    assert!(install.content.contains("documents Installation"));
    // Page chrome is not part of the content
    assert!(!install.content.contains("Home"));
}

#[tokio::test]
async fn test_missing_page_produces_failure_record() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("data.db");

    mount_page(&server, "/docs/", doc_page("Overview", &["/docs/gone"])).await;
    Mock::given(method("GET"))
        .and(path("/docs/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let config = create_test_config(&base_url, &dataset, "max-request-retries = 1");
    let stats = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(stats.total_requests(), 2);
    assert_eq!(stats.successful_requests(), 1);
    assert_eq!(stats.failed_requests(), 1);
    assert_eq!(stats.success_rate(), 50.0);

    let errors = stats.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].url.ends_with("/docs/gone"));
    assert!(errors[0].message.contains("HTTP 404"));

    let sink = SqliteSink::open(&dataset).expect("Failed to open dataset");
    assert_eq!(sink.count(RecordStatus::Failed).unwrap(), 1);
    assert_eq!(sink.count(RecordStatus::Success).unwrap(), 1);
}

#[tokio::test]
async fn test_server_errors_are_retried_at_page_level() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("data.jsonl");

    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&base_url, &dataset, "max-request-retries = 2");
    let stats = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(stats.total_requests(), 1);
    assert_eq!(stats.failed_requests(), 1);
    assert_eq!(stats.errors()[0].category.map(|c| c.as_str()), Some("network"));

    let records = read_jsonl(&dataset);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Failed);
    assert!(records[0].reason.is_some());
}

#[tokio::test]
async fn test_non_html_content_is_not_processed() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("data.jsonl");

    mount_page(&server, "/docs/", doc_page("Overview", &["/docs/manual.pdf"])).await;
    Mock::given(method("GET"))
        .and(path("/docs/manual.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.7", "application/pdf"))
        .mount(&server)
        .await;

    let config = create_test_config(&base_url, &dataset, "max-request-retries = 0");
    let stats = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(stats.successful_requests(), 1);
    assert_eq!(stats.failed_requests(), 1);
    assert_eq!(stats.processed_pages(), 1);
    assert_eq!(
        stats.errors()[0].category.map(|c| c.as_str()),
        Some("validation")
    );
}

#[tokio::test]
async fn test_request_budget_stops_the_crawl() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("data.jsonl");

    mount_page(
        &server,
        "/docs/",
        doc_page("Overview", &["/docs/a", "/docs/b", "/docs/c", "/docs/d"]),
    )
    .await;
    for route in ["/docs/a", "/docs/b", "/docs/c", "/docs/d"] {
        mount_page(&server, route, doc_page(route, &[])).await;
    }

    let mut config = create_test_config(&base_url, &dataset, "");
    config.crawler.max_requests_per_crawl = 3;
    config.crawler.max_concurrency = 1;

    let stats = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(stats.total_requests(), 3);
    assert_eq!(stats.successful_requests(), 3);
}

#[tokio::test]
async fn test_report_written_after_crawl() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let temp_dir = TempDir::new().unwrap();
    let dataset = temp_dir.path().join("data.jsonl");

    mount_page(&server, "/docs/", doc_page("Overview", &["/blog/"])).await;

    let config = create_test_config(&base_url, &dataset, "");
    let stats = run_crawl(&config).await.expect("Crawl failed");

    let context = ReportContext {
        config_hash: "abc123".to_string(),
        start_urls: config.crawler.start_urls.clone(),
        dataset_path: config.output.dataset_path.clone(),
    };
    let report_path = Path::new(&config.output.report_path);
    write_markdown_report(&stats.snapshot(), &context, report_path).unwrap();

    let report = std::fs::read_to_string(report_path).unwrap();
    assert_eq!(report, format_markdown_report(&stats.snapshot(), &context));
    assert!(report.contains("| Total Requests | 1 |"));
    assert!(report.contains("| Filtered URLs | 1 |"));
    assert!(report.contains("| Success Rate | 100.00% |"));
    assert!(report.contains("- **Config Hash**: abc123"));
}
