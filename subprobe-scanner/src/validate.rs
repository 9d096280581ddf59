//! Classification and canonicalization of candidate endpoint strings.
//!
//! Everything in here is pure: no I/O, no shared state. The crawler, the
//! extractor and the external collectors all funnel candidates through
//! [`is_valid_url_like`] before anything reaches the result store.

use std::fmt;
use std::net::IpAddr;
use url::{Host, Url};

/// Candidates shorter than this are never endpoint-like.
pub const MIN_CANDIDATE_LEN: usize = 5;

/// Origin used to resolve scheme-less paths when normalizing.
const PLACEHOLDER_ORIGIN: &str = "https://placeholder.com";

/// Values equal to, or ending with, any of these are noise.
const NOISE_TOKENS: &[&str] = &[
    "http", "https", "://", "\\", "//", ".js", ".css", ".png", ".svg", ".jpg", ".jpeg", ".gif",
    ".ico", ".webp", ".woff", ".woff2",
];

/// Returns the registrable domain (domain + public suffix) of a host name.
///
/// IP literals and hosts that stop at a public suffix (`localhost`, `co.uk`)
/// have none.
pub fn registrable_domain(host: &str) -> Option<String> {
    let host = host.trim_end_matches('.');
    if host.is_empty() || host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
        return None;
    }
    psl::domain_str(host).map(|domain| domain.to_ascii_lowercase())
}

/// Registrable domain of a parsed URL's host.
pub fn url_registrable_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => registrable_domain(domain),
        Host::Ipv4(_) | Host::Ipv6(_) => None,
    }
}

/// The site being scanned, expressed as its registrable domain.
///
/// Targets without a registrable domain (an IP address, `localhost`) are
/// represented as `TargetDomain(None)`. Scoping then compares absence with
/// absence, so other domain-less hosts count as in scope and candidate
/// validation skips the domain check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetDomain(Option<String>);

impl TargetDomain {
    pub fn new(domain: impl Into<String>) -> Self {
        Self(Some(domain.into().to_ascii_lowercase()))
    }

    pub fn unscoped() -> Self {
        Self(None)
    }

    pub fn from_url(url: &Url) -> Self {
        Self(url_registrable_domain(url))
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// True when the URL's host belongs to the same registrable domain.
    pub fn matches_url(&self, url: &Url) -> bool {
        url_registrable_domain(url).as_deref() == self.as_deref()
    }

    /// [`matches_url`](Self::matches_url) for an unparsed string; unparseable
    /// input never matches.
    pub fn matches_str(&self, url: &str) -> bool {
        Url::parse(url).is_ok_and(|parsed| self.matches_url(&parsed))
    }

    /// Runs [`is_valid_url_like`] scoped to this domain.
    pub fn accepts(&self, value: &str) -> bool {
        is_valid_url_like(value, self.as_deref())
    }
}

impl fmt::Display for TargetDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_deref().unwrap_or("<none>"))
    }
}

/// Strips surrounding whitespace, trailing `\`/`;`/whitespace runs and any
/// trailing `?` characters.
fn strip_candidate_noise(value: &str) -> &str {
    value
        .trim()
        .trim_end_matches(|c: char| c.is_whitespace() || c == '\\' || c == ';')
        .trim_end_matches('?')
}

/// Decides whether a string looks like an endpoint worth keeping.
///
/// Paths starting with `/` are accepted as same-origin by construction.
/// Anything else must parse as an absolute URL whose host has a registrable
/// domain, and when `target_domain` is given that domain must match exactly.
pub fn is_valid_url_like(value: &str, target_domain: Option<&str>) -> bool {
    if value.chars().count() < MIN_CANDIDATE_LEN {
        return false;
    }

    let cleaned = strip_candidate_noise(value).to_lowercase();

    if NOISE_TOKENS
        .iter()
        .any(|token| cleaned == *token || cleaned.ends_with(token))
    {
        return false;
    }

    if cleaned.starts_with('/') {
        return true;
    }

    let Ok(url) = Url::parse(&cleaned) else {
        return false;
    };
    let Some(domain) = url_registrable_domain(&url) else {
        return false;
    };

    match target_domain {
        Some(target) => domain == target,
        None => true,
    }
}

fn collapse_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    // A leading `//` would be read back as an authority on the next pass.
    if trimmed.starts_with("//") {
        return format!("/{}", trimmed.trim_start_matches('/'));
    }
    trimmed.to_string()
}

/// Reduces a path or URL to its path component with trailing slashes
/// removed. The empty path becomes `/`. Idempotent.
pub fn normalize_url_path(value: &str) -> String {
    let resolved = Url::parse(PLACEHOLDER_ORIGIN).and_then(|base| base.join(value));
    match resolved {
        Ok(url) => collapse_path(url.path()),
        Err(_) => collapse_path(value.strip_suffix("?*").unwrap_or(value)),
    }
}

/// The form a candidate is stored in.
///
/// Relative values become their normalized path. Absolute URLs keep scheme
/// and host, lose the fragment, and have trailing slashes stripped.
pub fn normalize_candidate(value: &str) -> String {
    if value.starts_with('/') {
        return normalize_url_path(value);
    }

    let Ok(mut url) = Url::parse(value) else {
        return value.to_string();
    };
    url.set_fragment(None);
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);

    let serialized = url.to_string();
    if url.query().is_none() {
        serialized.trim_end_matches('/').to_string()
    } else {
        serialized
    }
}

/// Cleans a raw literal the way the extractor sees it: trimmed, with any
/// trailing backslashes removed.
pub fn clean_literal(raw: &str) -> &str {
    raw.trim().trim_end_matches('\\')
}
