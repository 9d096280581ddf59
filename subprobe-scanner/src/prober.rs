//! Liveness checks for discovered candidates.

use crate::config::ScanConfig;
use crate::crawler::ProgressCallback;
use crate::error::Result;
use crate::fetch::build_client;
use crate::result::CandidateEndpoint;
use crate::store::ResultStore;
use crate::validate::url_registrable_domain;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub reachable: bool,
    /// HTTP status, `0` when nothing answered.
    pub status: u16,
}

impl ProbeOutcome {
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            status: 0,
        }
    }

    fn answered(status: u16) -> Self {
        Self {
            reachable: true,
            status,
        }
    }
}

pub struct Prober {
    client: Client,
    get_timeout: Duration,
    head_timeout: Duration,
}

/// The absolute URL to probe for a candidate. Relative values hang off the
/// base URL's origin.
fn probe_url(candidate: &CandidateEndpoint, base: &Url) -> Option<Url> {
    if candidate.is_relative() {
        let origin = base.origin().ascii_serialization();
        Url::parse(&format!("{}{}", origin, candidate.value)).ok()
    } else {
        Url::parse(&candidate.value).ok()
    }
}

impl Prober {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        Ok(Self::with_client(
            build_client(config, config.probe_max_redirects)?,
            config,
        ))
    }

    /// Uses a caller-built client; timeouts still come from `config`.
    pub fn with_client(client: Client, config: &ScanConfig) -> Self {
        Self {
            client,
            get_timeout: config.probe_get_timeout,
            head_timeout: config.probe_head_timeout,
        }
    }

    /// GET first; any HTTP answer counts as reachable. Only a transport
    /// failure falls back to HEAD.
    pub async fn probe(&self, candidate: &CandidateEndpoint, base: &Url) -> ProbeOutcome {
        let Some(url) = probe_url(candidate, base) else {
            debug!("Cannot build probe URL for {}", candidate.value);
            return ProbeOutcome::unreachable();
        };
        if url_registrable_domain(&url).is_none() {
            debug!("Not probing {}: host has no registrable domain", url);
            return ProbeOutcome::unreachable();
        }

        match self
            .client
            .get(url.clone())
            .timeout(self.get_timeout)
            .send()
            .await
        {
            Ok(response) => return ProbeOutcome::answered(response.status().as_u16()),
            Err(e) => debug!("GET {} failed, trying HEAD: {}", url, e),
        }

        match self
            .client
            .head(url.clone())
            .timeout(self.head_timeout)
            .send()
            .await
        {
            Ok(response) => ProbeOutcome::answered(response.status().as_u16()),
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                ProbeOutcome::unreachable()
            }
        }
    }

    /// Probes every unprobed entry in store order and records the outcome on
    /// it. Returns how many entries answered.
    pub async fn probe_all(
        &self,
        store: &mut ResultStore,
        base: &Url,
        progress: Option<&ProgressCallback>,
    ) -> usize {
        let total = store.len();
        let mut reachable = 0;

        for (index, candidate) in store.iter_mut().enumerate() {
            if candidate.is_probed() {
                continue;
            }
            if let Some(callback) = progress {
                callback(format!("Probing [{}/{}] {}", index + 1, total, candidate.value));
            }

            let outcome = self.probe(candidate, base).await;
            if outcome.reachable {
                reachable += 1;
            }
            candidate.record_probe(outcome.reachable, outcome.status);
        }

        info!("{} of {} candidates answered", reachable, total);
        reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Source;
    use std::sync::{Arc, Mutex};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const HOST: &str = "app.example.com";

    /// A prober whose client resolves `HOST` to the mock server.
    fn pinned_prober(server: &MockServer, config: &ScanConfig) -> Prober {
        let client = Client::builder()
            .resolve(HOST, *server.address())
            .no_proxy()
            .build()
            .unwrap();
        Prober::with_client(client, config)
    }

    fn pinned_base(server: &MockServer) -> Url {
        Url::parse(&format!("http://{}:{}/", HOST, server.address().port())).unwrap()
    }

    #[tokio::test]
    async fn test_host_without_registrable_domain_is_not_contacted() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let prober = Prober::new(&ScanConfig::default()).unwrap();
        let base = Url::parse(&mock_server.uri()).unwrap();
        let outcome = prober
            .probe(&CandidateEndpoint::relative("/api/users", Source::Fetch), &base)
            .await;

        assert_eq!(outcome, ProbeOutcome::unreachable());
    }

    #[tokio::test]
    async fn test_any_http_status_is_reachable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let prober = pinned_prober(&mock_server, &ScanConfig::default());
        let outcome = prober
            .probe(
                &CandidateEndpoint::relative("/api/missing", Source::Static),
                &pinned_base(&mock_server),
            )
            .await;

        assert_eq!(
            outcome,
            ProbeOutcome {
                reachable: true,
                status: 404
            }
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_head_when_get_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
            .mount(&mock_server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = ScanConfig::default()
            .with_probe_timeouts(Duration::from_millis(100), Duration::from_secs(3));
        let prober = pinned_prober(&mock_server, &config);
        let outcome = prober
            .probe(
                &CandidateEndpoint::relative("/slow", Source::Axios),
                &pinned_base(&mock_server),
            )
            .await;

        assert_eq!(
            outcome,
            ProbeOutcome {
                reachable: true,
                status: 204
            }
        );
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        let mock_server = MockServer::start().await;
        let prober = pinned_prober(&mock_server, &ScanConfig::default());
        let candidate = CandidateEndpoint::external(format!("http://{}:1/api", HOST), Source::Sitemap);

        let outcome = prober.probe(&candidate, &pinned_base(&mock_server)).await;
        assert_eq!(outcome, ProbeOutcome::unreachable());
    }

    #[tokio::test]
    async fn test_probe_all_records_outcomes_in_order() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/live"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&mock_server)
            .await;

        let mut store = ResultStore::new();
        store.add_result(CandidateEndpoint::relative("/api/live", Source::Fetch));
        store.add_result(CandidateEndpoint::relative("/api/gone", Source::Static));

        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        let progress: ProgressCallback = Arc::new(move |message| {
            sink.lock().unwrap().push(message);
        });

        let prober = pinned_prober(&mock_server, &ScanConfig::default());
        let answered = prober
            .probe_all(&mut store, &pinned_base(&mock_server), Some(&progress))
            .await;

        assert_eq!(answered, 2);
        let statuses: Vec<_> = store
            .get_all_results()
            .iter()
            .map(|e| (e.reachable(), e.status()))
            .collect();
        assert_eq!(statuses, vec![(Some(true), Some(200)), (Some(true), Some(410))]);
        assert_eq!(messages.lock().unwrap().len(), 2);
    }
}
