// Tests for the run driver

use std::sync::{Arc, Mutex};
use subprobe_core::run::{EndpointRecord, RunError, RunOptions, execute_run, resolve_value};
use subprobe_scanner::{EndpointKind, ProgressCallback, Source};
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(r#"<html><script src="/static/app.js"></script></html>"#),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/static/app.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"fetch("/api/orders"); var x = "notaurl";"#),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin\n"))
        .mount(server)
        .await;
}

fn find<'a>(records: &'a [EndpointRecord], source: Source) -> Vec<&'a EndpointRecord> {
    records.iter().filter(|r| r.source == source).collect()
}

// ============================================================================
// Configuration Errors
// ============================================================================

#[tokio::test]
async fn test_filter_without_probe_is_config_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut options = RunOptions::new(mock_server.uri());
    options.filter_status = Some("200".to_string());

    let err = execute_run(options, None).await.unwrap_err();
    assert!(matches!(err, RunError::Config(_)));
    assert!(err.is_config());
}

#[tokio::test]
async fn test_invalid_filter_is_config_error() {
    let mut options = RunOptions::new("https://example.com");
    options.filter_status = Some("4xx,abc".to_string());
    options.probe = true;

    let err = execute_run(options, None).await.unwrap_err();
    assert!(matches!(err, RunError::Filter(_)));
    assert!(err.is_config());
}

#[tokio::test]
async fn test_invalid_target_is_config_error() {
    for url in ["not a url", "ftp://example.com/"] {
        let err = execute_run(RunOptions::new(url), None).await.unwrap_err();
        assert!(err.is_config(), "{url} should be rejected");
    }
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test]
async fn test_run_collects_script_and_robots_endpoints() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let report = execute_run(RunOptions::new(mock_server.uri()), None)
        .await
        .unwrap();

    let fetch = find(&report.records, Source::Fetch);
    assert_eq!(fetch.len(), 1);
    assert_eq!(fetch[0].value, "/api/orders");
    assert_eq!(fetch[0].kind, EndpointKind::Relative);
    assert_eq!(
        fetch[0].resolved_url,
        format!("{}/api/orders", mock_server.uri())
    );
    assert!(!report.records.iter().any(|r| r.value.contains("notaurl")));

    let robots = find(&report.records, Source::Robots);
    assert_eq!(robots.len(), 1);
    assert_eq!(robots[0].value, "/admin");

    assert_eq!(report.summary.pages_visited, 1);
    assert_eq!(report.summary.scripts_parsed, 1);
    assert!(!report.probed);
    assert!(report.records.iter().all(|r| r.status.is_none()));
}

#[tokio::test]
async fn test_probe_and_filter_apply_to_records() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let mut options = RunOptions::new(mock_server.uri());
    options.probe = true;
    options.filter_status = Some("2xx".to_string());

    let report = execute_run(options, None).await.unwrap();

    // Hosts without a registrable domain are never probed, so nothing passes.
    assert!(report.probed);
    assert!(report.total_candidates >= 2);
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn test_zero_class_filter_keeps_unreachable_records() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let mut options = RunOptions::new(mock_server.uri());
    options.probe = true;
    options.filter_status = Some("0xx".to_string());

    let report = execute_run(options, None).await.unwrap();

    assert!(report.total_candidates >= 2);
    assert_eq!(report.records.len(), report.total_candidates);
    assert!(report.records.iter().all(|r| r.status == Some(0)));
}

#[tokio::test]
async fn test_probe_marks_domainless_hosts_unreachable() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let mut options = RunOptions::new(mock_server.uri());
    options.probe = true;

    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let progress: ProgressCallback = Arc::new(move |message: String| {
        sink.lock().unwrap().push(message);
    });
    let report = execute_run(options, Some(progress)).await.unwrap();

    assert!(!report.records.is_empty());
    assert!(report
        .records
        .iter()
        .all(|r| r.reachable == Some(false) && r.status == Some(0)));
    assert!(messages
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.starts_with("Probing")));
}

#[test]
fn test_resolve_value_uses_target_origin() {
    let target = Url::parse("https://www.example.com:8443/shop/index.html?x=1").unwrap();
    assert_eq!(
        resolve_value("/api/cart", EndpointKind::Relative, &target),
        "https://www.example.com:8443/api/cart"
    );
    assert_eq!(
        resolve_value("https://api.example.com/v1", EndpointKind::External, &target),
        "https://api.example.com/v1"
    );
}
