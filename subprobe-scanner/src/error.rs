use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("JavaScript grammar failed to load: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
