use std::time::Duration;

/// Desktop browser identification sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_ARCHIVE_ENDPOINT: &str = "https://web.archive.org";

/// Network and parsing limits shared by the fetchers, parser, collectors and prober.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub user_agent: String,
    pub page_timeout: Duration,
    pub page_max_redirects: usize,
    pub script_timeout: Duration,
    pub script_max_redirects: usize,
    pub probe_get_timeout: Duration,
    pub probe_head_timeout: Duration,
    pub probe_max_redirects: usize,
    /// Scripts are truncated to this many bytes before parsing.
    pub max_script_bytes: usize,
    pub parse_deadline: Duration,
    /// Base URL of the web archive CDX service.
    pub archive_endpoint: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_timeout: Duration::from_secs(10),
            page_max_redirects: 5,
            script_timeout: Duration::from_secs(8),
            script_max_redirects: 3,
            probe_get_timeout: Duration::from_secs(5),
            probe_head_timeout: Duration::from_secs(3),
            probe_max_redirects: 3,
            max_script_bytes: 1024 * 1024,
            parse_deadline: Duration::from_secs(10),
            archive_endpoint: DEFAULT_ARCHIVE_ENDPOINT.to_string(),
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_probe_timeouts(mut self, get: Duration, head: Duration) -> Self {
        self.probe_get_timeout = get;
        self.probe_head_timeout = head;
        self
    }

    pub fn with_parse_deadline(mut self, deadline: Duration) -> Self {
        self.parse_deadline = deadline;
        self
    }

    pub fn with_max_script_bytes(mut self, max_bytes: usize) -> Self {
        self.max_script_bytes = max_bytes;
        self
    }

    pub fn with_archive_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.archive_endpoint = endpoint.into();
        self
    }
}
