use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaperscoutError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PaperscoutError {
    /// Transport failures and non-2xx responses are worth another attempt.
    /// Everything else (bad payloads, policy violations) will fail the same
    /// way again.
    pub fn is_transient(&self) -> bool {
        matches!(self, PaperscoutError::Http(_) | PaperscoutError::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, PaperscoutError>;
