use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a candidate is a same-origin path or a full URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Relative,
    External,
}

impl EndpointKind {
    /// Paths beginning with `/` are relative, everything else is external.
    pub fn classify(value: &str) -> Self {
        if value.starts_with('/') {
            EndpointKind::Relative
        } else {
            EndpointKind::External
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Relative => "relative",
            EndpointKind::External => "external",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The heuristic or auxiliary source that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Static,
    Fetch,
    Axios,
    Xmlhttp,
    Robots,
    Sitemap,
    Wayback,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Static => "static",
            Source::Fetch => "fetch",
            Source::Axios => "axios",
            Source::Xmlhttp => "xmlhttp",
            Source::Robots => "robots",
            Source::Sitemap => "sitemap",
            Source::Wayback => "wayback",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEndpoint {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: EndpointKind,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    reachable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

impl CandidateEndpoint {
    pub fn new(value: impl Into<String>, kind: EndpointKind, source: Source) -> Self {
        Self {
            value: value.into(),
            kind,
            source,
            reachable: None,
            status: None,
        }
    }

    pub fn relative(value: impl Into<String>, source: Source) -> Self {
        Self::new(value, EndpointKind::Relative, source)
    }

    pub fn external(value: impl Into<String>, source: Source) -> Self {
        Self::new(value, EndpointKind::External, source)
    }

    pub fn is_relative(&self) -> bool {
        self.kind == EndpointKind::Relative
    }

    pub fn reachable(&self) -> Option<bool> {
        self.reachable
    }

    /// HTTP status observed by the prober, `0` when the endpoint was unreachable.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_probed(&self) -> bool {
        self.reachable.is_some()
    }

    /// Records a probe outcome. The probe fields are written once per run;
    /// returns `false` and leaves the candidate untouched if already probed.
    pub fn record_probe(&mut self, reachable: bool, status: u16) -> bool {
        if self.is_probed() {
            return false;
        }
        self.reachable = Some(reachable);
        self.status = Some(status);
        true
    }
}
