use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::fetcher::FetchError;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Not an HTML page")]
    NotHtml,

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("Connection failed: {0}")]
    ConnectionFailure(String),

    #[error("Failed to parse: {0}")]
    ParseFailure(String),
}

impl PreviewError {
    pub fn log(&self) {
        match self {
            PreviewError::InvalidUrl => {
                warn!("URL rejected before fetch");
            }
            PreviewError::NotHtml => {
                warn!("Invalid content type received");
            }
            PreviewError::HttpStatus(status) => {
                error!(status = %status, "Remote server returned an error status");
            }
            PreviewError::ConnectionFailure(e) => {
                error!(error = %e, "Content fetch failed");
            }
            PreviewError::ParseFailure(e) => {
                error!(error = %e, "Metadata extraction failed");
            }
        }
    }

    /// Whether the error record should echo the input URL back.
    ///
    /// Validation and content-type rejections carry only the message.
    fn echoes_url(&self) -> bool {
        !matches!(self, PreviewError::InvalidUrl | PreviewError::NotHtml)
    }

    pub fn into_result(self, request_url: &str) -> ErrorResult {
        let url = self.echoes_url().then(|| request_url.to_string());
        ErrorResult {
            error: self.to_string(),
            request_url: url.clone(),
            url,
        }
    }
}

impl From<FetchError> for PreviewError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::HttpStatus(status) => PreviewError::HttpStatus(status),
            FetchError::ConnectionFailure(reason) => PreviewError::ConnectionFailure(reason),
            FetchError::Body(detail) => PreviewError::ParseFailure(detail),
        }
    }
}

/// Error record emitted in place of metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
}

impl ErrorResult {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            url: None,
            request_url: None,
        }
    }
}
