pub mod ast;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod parser;
pub mod prober;
pub mod result;
pub mod sources;
pub mod store;
pub mod validate;

pub use config::ScanConfig;
pub use crawler::{CrawlSummary, Crawler, ProgressCallback};
pub use error::ScanError;
pub use parser::ScriptParser;
pub use prober::{ProbeOutcome, Prober};
pub use result::{CandidateEndpoint, EndpointKind, Source};
pub use sources::ExternalSources;
pub use store::ResultStore;
pub use validate::TargetDomain;
