// Tests for terminal report generation

use subprobe_core::report::{generate_results_report, status_badge};
use subprobe_core::run::EndpointRecord;
use subprobe_scanner::{CrawlSummary, EndpointKind, Source};

fn record(resolved_url: &str, status: Option<u16>) -> EndpointRecord {
    EndpointRecord {
        value: resolved_url.to_string(),
        resolved_url: resolved_url.to_string(),
        kind: EndpointKind::External,
        source: Source::Sitemap,
        reachable: status.map(|s| s != 0),
        status,
    }
}

fn summary() -> CrawlSummary {
    CrawlSummary {
        pages_visited: 3,
        scripts_found: 4,
        scripts_parsed: 2,
        candidates: 7,
        parse_timeouts: 0,
    }
}

#[test]
fn test_status_badge_text() {
    colored::control::set_override(false);
    assert_eq!(status_badge(Some(200)).to_string(), "[200]");
    assert_eq!(status_badge(Some(403)).to_string(), "[403]");
    assert_eq!(status_badge(None).to_string(), "[?]");
}

#[test]
fn test_report_lists_records_and_summary() {
    colored::control::set_override(false);
    let records = vec![
        record("https://example.com/admin", Some(401)),
        record("https://shop.example.com/cart", Some(0)),
    ];

    let report = generate_results_report(&records, &summary(), true);

    assert!(report.contains("EXT https://example.com/admin (sitemap) [401]"));
    assert!(report.contains("https://shop.example.com/cart (sitemap) [0]"));
    assert!(report.contains("Pages visited: 3"));
    assert!(report.contains("Scripts parsed: 2/4"));
    assert!(report.contains("Endpoints found: 2"));
    assert!(report.contains("Reachable: 1"));
    assert!(!report.contains("Parser timeouts"));
}

#[test]
fn test_report_without_probe_has_no_badges() {
    colored::control::set_override(false);
    let records = vec![record("https://example.com/admin", None)];

    let report = generate_results_report(&records, &summary(), false);

    assert!(!report.contains("[?]"));
    assert!(!report.contains("Reachable"));
}
