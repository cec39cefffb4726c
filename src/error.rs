//! Error handling for the resume tailor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResumeTailorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("{provider} provider unavailable: {message}")]
    ProviderUnavailable {
        provider: String,
        message: String,
        retryable: bool,
    },

    #[error("{provider} provider returned an empty response")]
    ProviderEmptyResponse { provider: String },

    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    #[error("Empty formatting fingerprint: {0}")]
    EmptyFingerprint(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Archive error: {0}")]
    Archive(String),
}

pub type Result<T> = std::result::Result<T, ResumeTailorError>;

impl ResumeTailorError {
    pub fn provider_unavailable(provider: &str, message: impl Into<String>, retryable: bool) -> Self {
        ResumeTailorError::ProviderUnavailable {
            provider: provider.to_string(),
            message: message.into(),
            retryable,
        }
    }

    pub fn empty_response(provider: &str) -> Self {
        ResumeTailorError::ProviderEmptyResponse {
            provider: provider.to_string(),
        }
    }

    /// Only transient provider faults are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResumeTailorError::ProviderUnavailable { retryable: true, .. }
        )
    }
}

impl From<quick_xml::Error> for ResumeTailorError {
    fn from(err: quick_xml::Error) -> Self {
        ResumeTailorError::Xml(err.to_string())
    }
}

impl From<zip::result::ZipError> for ResumeTailorError {
    fn from(err: zip::result::ZipError) -> Self {
        ResumeTailorError::Archive(err.to_string())
    }
}

impl From<toml::de::Error> for ResumeTailorError {
    fn from(err: toml::de::Error) -> Self {
        ResumeTailorError::Configuration(format!("Failed to parse config: {}", err))
    }
}
