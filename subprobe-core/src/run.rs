use crate::filter::{FilterError, StatusFilter};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use subprobe_scanner::{
    CandidateEndpoint, CrawlSummary, Crawler, EndpointKind, ExternalSources, ProgressCallback,
    Prober, ResultStore, ScanConfig, ScanError, Source, TargetDomain,
};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("{0}")]
    Config(String),

    #[error("Invalid status filter: {0}")]
    Filter(#[from] FilterError),

    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),
}

impl RunError {
    /// Whether the error was raised before any network activity because of
    /// bad user input.
    pub fn is_config(&self) -> bool {
        matches!(self, RunError::Config(_) | RunError::Filter(_))
    }
}

/// Options for configuring a run
pub struct RunOptions {
    pub url: String,
    pub depth: usize,
    pub filter_status: Option<String>,
    pub probe: bool,
    pub wayback: bool,
    pub show_progress: bool,
    pub config: ScanConfig,
}

impl RunOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            filter_status: None,
            probe: false,
            wayback: false,
            show_progress: false,
            config: ScanConfig::default(),
        }
    }
}

/// One discovered endpoint as shown and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub value: String,
    pub resolved_url: String,
    #[serde(rename = "type")]
    pub kind: EndpointKind,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reachable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Joins relative values onto the target's `scheme://host[:port]`; external
/// values are returned unchanged.
pub fn resolve_value(value: &str, kind: EndpointKind, target: &Url) -> String {
    match kind {
        EndpointKind::Relative => format!("{}{}", target.origin().ascii_serialization(), value),
        EndpointKind::External => value.to_string(),
    }
}

impl EndpointRecord {
    pub fn from_candidate(candidate: &CandidateEndpoint, target: &Url) -> Self {
        Self {
            value: candidate.value.clone(),
            resolved_url: resolve_value(&candidate.value, candidate.kind, target),
            kind: candidate.kind,
            source: candidate.source,
            reachable: candidate.reachable(),
            status: candidate.status(),
        }
    }
}

/// Everything a finished run hands to rendering and export.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub target: Url,
    pub records: Vec<EndpointRecord>,
    pub summary: CrawlSummary,
    /// Store size before status filtering.
    pub total_candidates: usize,
    pub probed: bool,
}

/// Rejects bad input before anything touches the network.
fn validate_options(options: &RunOptions) -> Result<(Url, Option<StatusFilter>), RunError> {
    let filter = options
        .filter_status
        .as_deref()
        .map(StatusFilter::parse)
        .transpose()?;

    if filter.is_some() && !options.probe {
        return Err(RunError::Config(
            "--filter-status only works together with --probe".to_string(),
        ));
    }

    let target = Url::parse(&options.url)
        .map_err(|e| RunError::Config(format!("Invalid target URL '{}': {}", options.url, e)))?;
    if !matches!(target.scheme(), "http" | "https") || target.host_str().is_none() {
        return Err(RunError::Config(format!(
            "Target URL must be an http(s) URL with a host: {}",
            options.url
        )));
    }

    Ok((target, filter))
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Starting scan...");
    pb
}

/// Execute a full discovery run: crawl, auxiliary sources, optional probing
/// and status filtering.
pub async fn execute_run(
    options: RunOptions,
    progress_callback: Option<ProgressCallback>,
) -> Result<RunReport, RunError> {
    let (target, filter) = validate_options(&options)?;
    let RunOptions {
        depth,
        probe,
        wayback,
        show_progress,
        config,
        ..
    } = options;

    let progress_bar = show_progress.then(|| Arc::new(spinner()));

    let pb_clone = progress_bar.clone();
    let internal_progress: ProgressCallback = Arc::new(move |message: String| {
        if let Some(ref pb) = pb_clone {
            pb.set_message(message.clone());
        }
        if let Some(ref callback) = progress_callback {
            callback(message);
        }
    });

    let crawler = Crawler::new(&config)?
        .with_max_depth(depth)
        .with_progress_callback(internal_progress.clone());
    let sources = ExternalSources::new(&config)?;
    let domain = TargetDomain::from_url(&target);

    let mut store = ResultStore::new();
    let summary = crawler.crawl(target.as_str(), &mut store).await?;

    let origin = target.origin().ascii_serialization();
    internal_progress("Collecting from robots.txt and sitemap.xml".to_string());
    sources.collect_robots(&origin, &mut store).await;
    sources.collect_sitemap(&origin, &domain, &mut store).await;

    if wayback {
        let query_domain = domain
            .as_deref()
            .or_else(|| target.host_str())
            .unwrap_or_default()
            .to_string();
        internal_progress(format!("Collecting archived URLs for {}", query_domain));
        sources.collect_wayback(&query_domain, &domain, &mut store).await;
    }

    let total_candidates = store.len();
    if probe {
        internal_progress(format!("Probing {} endpoints", total_candidates));
        let prober = Prober::new(&config)?;
        prober
            .probe_all(&mut store, &target, Some(&internal_progress))
            .await;
    }

    let records: Vec<EndpointRecord> = store
        .into_results()
        .into_iter()
        .filter(|candidate| match filter {
            Some(ref filter) => filter.matches(candidate.status()),
            None => true,
        })
        .map(|candidate| EndpointRecord::from_candidate(&candidate, &target))
        .collect();
    debug!(
        "{} of {} candidates kept after filtering",
        records.len(),
        total_candidates
    );

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }
    info!("Run complete: {} endpoints", records.len());

    Ok(RunReport {
        target,
        records,
        summary,
        total_candidates,
        probed: probe,
    })
}
