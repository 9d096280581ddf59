//! Best-effort page and script fetching.
//!
//! None of these functions fail: network errors, bad statuses and unreadable
//! bodies all come back as an empty string and are only logged.

use crate::config::ScanConfig;
use crate::error::Result;
use crate::validate::TargetDomain;
use reqwest::{Client, redirect::Policy};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub struct Fetcher {
    page_client: Client,
    script_client: Client,
    page_timeout: Duration,
    script_timeout: Duration,
}

pub(crate) fn build_client(config: &ScanConfig, max_redirects: usize) -> Result<Client> {
    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(Policy::limited(max_redirects))
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()?;
    Ok(client)
}

impl Fetcher {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        Ok(Self::with_clients(
            build_client(config, config.page_max_redirects)?,
            build_client(config, config.script_max_redirects)?,
            config,
        ))
    }

    /// Uses caller-built page and script clients; timeouts still come from
    /// `config`.
    pub fn with_clients(page_client: Client, script_client: Client, config: &ScanConfig) -> Self {
        Self {
            page_client,
            script_client,
            page_timeout: config.page_timeout,
            script_timeout: config.script_timeout,
        }
    }

    /// Fetches a page's HTML. Non-2xx responses count as failures.
    pub async fn fetch_html(&self, url: &str) -> String {
        let response = match self
            .page_client
            .get(url)
            .timeout(self.page_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("HTML fetch failed for {}: {}", url, e);
                return String::new();
            }
        };

        if !response.status().is_success() {
            debug!("HTML fetch for {} returned {}", url, response.status());
            return String::new();
        }

        response.text().await.unwrap_or_else(|e| {
            debug!("Could not read HTML body from {}: {}", url, e);
            String::new()
        })
    }

    /// Fetches a script body as text regardless of its declared content type.
    /// Any status below 400 is accepted.
    pub async fn fetch_js(&self, url: &str) -> String {
        let response = match self
            .script_client
            .get(url)
            .header(reqwest::header::ACCEPT, "*/*")
            .timeout(self.script_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("Script fetch failed for {}: {}", url, e);
                return String::new();
            }
        };

        if response.status().as_u16() >= 400 {
            debug!("Script fetch for {} returned {}", url, response.status());
            return String::new();
        }

        match response.bytes().await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!("Could not read script body from {}: {}", url, e);
                String::new()
            }
        }
    }
}

/// Every `<script src>` on the page, resolved against the page URL. No
/// filtering and no deduplication.
pub fn extract_script_links(html: &str, page_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let Ok(selector) = Selector::parse("script[src]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
        .filter(|src| !src.trim().is_empty())
        .filter_map(|src| base.join(src.trim()).ok())
        .map(|url| url.to_string())
        .collect()
}

fn resolve_anchor(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved)
}

/// Same-site anchor targets on the page: resolved, fragment-free and
/// deduplicated in document order.
pub fn extract_internal_links(html: &str, page_url: &str, target: &TargetDomain) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_anchor(&base, href) else {
            continue;
        };
        if !target.matches_url(&url) {
            debug!("Skipping off-site link {}", url);
            continue;
        }
        let link = url.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}
