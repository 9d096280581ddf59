//! Auxiliary endpoint sources: robots.txt, sitemap.xml and the web archive.
//!
//! Collectors only ever add to the store. Any failure is logged and the
//! collector reports zero additions.

use crate::config::ScanConfig;
use crate::error::Result;
use crate::fetch::build_client;
use crate::result::{CandidateEndpoint, EndpointKind, Source};
use crate::store::ResultStore;
use crate::validate::{TargetDomain, clean_literal};
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

static DISALLOW: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)Disallow:[ \t]*(/\S*)").ok());

/// Web archive lookups can be slow.
const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Text of every `<loc>` element, entities decoded and CDATA unwrapped.
/// Malformed XML ends the scan but keeps what was read so far.
fn sitemap_locations(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locations = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"loc" => {
                current = Some(String::new());
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => {
                if let Some(loc) = current.take() {
                    let loc = loc.trim();
                    if !loc.is_empty() {
                        locations.push(loc.to_string());
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(loc) = current.as_mut() {
                    match e.unescape() {
                        Ok(text) => loc.push_str(&text),
                        Err(err) => debug!("Bad entity in sitemap entry: {}", err),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(loc) = current.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Sitemap XML error at {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
    }

    locations
}

pub struct ExternalSources {
    client: Client,
    timeout: Duration,
    archive_endpoint: String,
}

impl ExternalSources {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config, config.page_max_redirects)?,
            timeout: config.page_timeout,
            archive_endpoint: config.archive_endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_text(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Request to {} failed: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("{} returned {}", url, response.status());
            return None;
        }
        response.text().await.ok()
    }

    /// Records every `Disallow:` path from `<origin>/robots.txt`.
    pub async fn collect_robots(&self, origin: &str, store: &mut ResultStore) -> usize {
        let url = format!("{}/robots.txt", origin.trim_end_matches('/'));
        let Some(body) = self.fetch_text(&url).await else {
            return 0;
        };
        let Some(pattern) = DISALLOW.as_ref() else {
            return 0;
        };

        let mut added = 0;
        for capture in pattern.captures_iter(&body) {
            let path = capture[1].trim();
            if store.add_result(CandidateEndpoint::relative(path, Source::Robots)) {
                added += 1;
            }
        }

        info!("robots.txt contributed {} entries", added);
        added
    }

    /// Records every in-scope `<loc>` URL from `<origin>/sitemap.xml`.
    pub async fn collect_sitemap(
        &self,
        origin: &str,
        target: &TargetDomain,
        store: &mut ResultStore,
    ) -> usize {
        let url = format!("{}/sitemap.xml", origin.trim_end_matches('/'));
        let Some(body) = self.fetch_text(&url).await else {
            return 0;
        };
        let mut added = 0;
        for loc in sitemap_locations(&body) {
            let Ok(parsed) = Url::parse(&loc) else {
                debug!("Skipping unparseable sitemap entry {}", loc);
                continue;
            };
            if !target.matches_url(&parsed) {
                continue;
            }
            if store.add_result(CandidateEndpoint::external(&loc, Source::Sitemap)) {
                added += 1;
            }
        }

        info!("sitemap.xml contributed {} entries", added);
        added
    }

    /// Records archived URLs for `domain` from the web archive's CDX index.
    pub async fn collect_wayback(
        &self,
        domain: &str,
        target: &TargetDomain,
        store: &mut ResultStore,
    ) -> usize {
        let endpoint = format!("{}/cdx/search/cdx", self.archive_endpoint);
        let pattern = format!("{domain}/*");
        let request = self
            .client
            .get(&endpoint)
            .query(&[
                ("url", pattern.as_str()),
                ("output", "json"),
                ("fl", "original"),
                ("collapse", "urlkey"),
            ])
            .timeout(ARCHIVE_TIMEOUT.max(self.timeout));

        let rows = match request.send().await {
            Ok(response) if response.status().is_success() => {
                response.json::<Vec<Vec<String>>>().await
            }
            Ok(response) => {
                debug!("Archive index returned {}", response.status());
                return 0;
            }
            Err(e) => {
                debug!("Archive index request failed: {}", e);
                return 0;
            }
        };
        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                debug!("Archive index response was not a row list: {}", e);
                return 0;
            }
        };

        let mut added = 0;
        // The first row is the field header.
        for row in rows.iter().skip(1) {
            let Some(original) = row.first() else {
                continue;
            };
            let cleaned = clean_literal(original);
            if !target.accepts(cleaned) {
                continue;
            }
            let entry = CandidateEndpoint::new(cleaned, EndpointKind::classify(cleaned), Source::Wayback);
            if store.add_result(entry) {
                added += 1;
            }
        }

        info!("Web archive contributed {} entries", added);
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn collector(archive: &str) -> ExternalSources {
        ExternalSources::new(&ScanConfig::default().with_archive_endpoint(archive)).unwrap()
    }

    #[tokio::test]
    async fn test_robots_disallow_paths() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "User-agent: *\nDisallow: /admin/\nDisallow: /internal/api\nAllow: /public\nDisallow:\n",
            ))
            .mount(&mock_server)
            .await;

        let mut store = ResultStore::new();
        let added = collector(&mock_server.uri())
            .collect_robots(&mock_server.uri(), &mut store)
            .await;

        assert_eq!(added, 2);
        let values: Vec<_> = store
            .get_all_results()
            .iter()
            .map(|e| (e.value.as_str(), e.kind, e.source))
            .collect();
        assert_eq!(
            values,
            vec![
                ("/admin/", EndpointKind::Relative, Source::Robots),
                ("/internal/api", EndpointKind::Relative, Source::Robots),
            ]
        );
    }

    #[tokio::test]
    async fn test_sitemap_keeps_in_scope_locations() {
        let mock_server = MockServer::start().await;
        let sitemap = format!(
            "<urlset><url><loc>{0}/products</loc></url>\
             <url><loc> {0}/checkout </loc></url>\
             <url><loc>https://example.com/elsewhere</loc></url></urlset>",
            mock_server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sitemap))
            .mount(&mock_server)
            .await;

        let mut store = ResultStore::new();
        let added = collector(&mock_server.uri())
            .collect_sitemap(&mock_server.uri(), &TargetDomain::unscoped(), &mut store)
            .await;

        assert_eq!(added, 2);
        assert!(store
            .get_all_results()
            .iter()
            .all(|e| e.kind == EndpointKind::External && e.source == Source::Sitemap));
        assert_eq!(
            store.get_all_results()[1].value,
            format!("{}/checkout", mock_server.uri())
        );
    }

    #[tokio::test]
    async fn test_sitemap_decodes_entities_and_cdata() {
        let mock_server = MockServer::start().await;
        let sitemap = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\
             <url><loc>{0}/search?a=1&amp;b=2</loc></url>\
             <url><loc><![CDATA[{0}/cdata]]></loc></url></urlset>",
            mock_server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sitemap))
            .mount(&mock_server)
            .await;

        let mut store = ResultStore::new();
        let added = collector(&mock_server.uri())
            .collect_sitemap(&mock_server.uri(), &TargetDomain::unscoped(), &mut store)
            .await;

        assert_eq!(added, 2);
        let values: Vec<_> = store
            .get_all_results()
            .iter()
            .map(|e| e.value.clone())
            .collect();
        assert_eq!(
            values,
            vec![
                format!("{}/search?a=1&b=2", mock_server.uri()),
                format!("{}/cdata", mock_server.uri()),
            ]
        );
    }

    #[test]
    fn test_sitemap_locations_stop_at_malformed_xml() {
        let locations =
            sitemap_locations("<urlset><url><loc>https://example.com/a</loc></url><url><loc>x</oops>");
        assert_eq!(locations, vec!["https://example.com/a"]);
    }

    #[tokio::test]
    async fn test_wayback_rows_validated_against_target() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cdx/search/cdx"))
            .and(query_param("url", "example.com/*"))
            .and(query_param("output", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                ["original"],
                ["https://example.com/admin\\\\"],
                ["https://evil.com/phish"],
                ["https://shop.example.com/cart"],
                []
            ])))
            .mount(&mock_server)
            .await;

        let mut store = ResultStore::new();
        let added = collector(&mock_server.uri())
            .collect_wayback("example.com", &TargetDomain::new("example.com"), &mut store)
            .await;

        assert_eq!(added, 2);
        let values: Vec<_> = store
            .get_all_results()
            .iter()
            .map(|e| e.value.as_str())
            .collect();
        assert_eq!(
            values,
            vec!["https://example.com/admin", "https://shop.example.com/cart"]
        );
    }

    #[tokio::test]
    async fn test_failures_add_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let sources = collector(&mock_server.uri());
        let mut store = ResultStore::new();
        let target = TargetDomain::new("example.com");

        assert_eq!(sources.collect_robots(&mock_server.uri(), &mut store).await, 0);
        assert_eq!(
            sources
                .collect_sitemap(&mock_server.uri(), &target, &mut store)
                .await,
            0
        );
        assert_eq!(
            sources
                .collect_wayback("example.com", &target, &mut store)
                .await,
            0
        );
        assert_eq!(
            collector("http://127.0.0.1:1")
                .collect_wayback("example.com", &target, &mut store)
                .await,
            0
        );
        assert!(store.is_empty());
    }
}
