use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::extractor::extract_js_info;
use crate::fetch::{Fetcher, extract_internal_links, extract_script_links};
use crate::parser::ScriptParser;
use crate::store::ResultStore;
use crate::validate::TargetDomain;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Script URLs containing any of these are skipped (analytics beacons and
/// minified vendor bundles).
const SCRIPT_NOISE: &[&str] = &["?scope=", "&delta=", "min.js"];

/// Counters for one crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages_visited: usize,
    /// Same-site script links that survived filtering.
    pub scripts_found: usize,
    /// Scripts that produced a non-empty AST.
    pub scripts_parsed: usize,
    pub candidates: usize,
    pub parse_timeouts: usize,
}

pub struct Crawler {
    fetcher: Fetcher,
    parser: ScriptParser,
    max_depth: usize,
    progress_callback: Option<ProgressCallback>,
}

fn is_script_noise(link: &str) -> bool {
    SCRIPT_NOISE.iter().any(|token| link.contains(token))
}

impl Crawler {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
            parser: ScriptParser::new(config)?,
            max_depth: 0,
            progress_callback: None,
        })
    }

    /// Replaces the default fetcher, e.g. one with custom DNS overrides.
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn report(&self, message: String) {
        if let Some(ref callback) = self.progress_callback {
            callback(message);
        }
    }

    /// Breadth-first crawl from `start_url`, one level at a time, writing
    /// every extracted candidate into `store`.
    ///
    /// Pages and scripts are fetched one after another so the store's
    /// insertion order follows discovery order.
    pub async fn crawl(&self, start_url: &str, store: &mut ResultStore) -> Result<CrawlSummary> {
        let start = Url::parse(start_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", start_url, e)))?;
        let target = TargetDomain::from_url(&start);
        info!(
            "Starting crawl of {} (target domain {}, depth {})",
            start, target, self.max_depth
        );

        let mut summary = CrawlSummary::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier = vec![start.to_string()];

        for level in 0..=self.max_depth {
            if frontier.is_empty() {
                break;
            }
            let mut next_frontier = Vec::new();

            for url in frontier {
                if !visited.insert(url.clone()) {
                    continue;
                }
                self.report(format!("Crawling {} (depth {})", url, level));

                let html = self.fetcher.fetch_html(&url).await;
                summary.pages_visited += 1;
                if html.is_empty() {
                    continue;
                }

                let scripts: Vec<String> = extract_script_links(&html, &url)
                    .into_iter()
                    .filter(|link| !is_script_noise(link))
                    .filter(|link| target.matches_str(link))
                    .collect();
                debug!("{} same-site scripts on {}", scripts.len(), url);
                summary.scripts_found += scripts.len();

                for script in &scripts {
                    self.report(format!("Parsing {}", script));
                    let source = self.fetcher.fetch_js(script).await;
                    let ast = self.parser.parse(Some(&source)).await;
                    if !ast.is_empty_program() {
                        summary.scripts_parsed += 1;
                    }
                    summary.candidates += extract_js_info(Some(&ast), &target, store);
                }

                if level < self.max_depth {
                    next_frontier.extend(
                        extract_internal_links(&html, &url, &target)
                            .into_iter()
                            .filter(|link| !visited.contains(link)),
                    );
                }
            }

            frontier = next_frontier;
        }

        summary.parse_timeouts = self.parser.timeout_count();
        info!(
            "Crawl complete. Visited {} pages, parsed {}/{} scripts, {} candidates",
            summary.pages_visited, summary.scripts_parsed, summary.scripts_found, summary.candidates
        );
        Ok(summary)
    }
}
