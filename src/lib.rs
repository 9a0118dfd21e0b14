use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod classifier;
mod error;
mod extractor;
mod favicon;
mod fetcher;
mod logging;
mod platforms;
mod preview_generator;
mod preview_service;
mod utils;

pub use classifier::{classify, is_twitter_url, is_youtube_url, PlatformKind};
pub use error::{ErrorResult, PreviewError};
pub use extractor::{strip_markup, tag_events, MetaTagParser, MetadataExtractor, ParsedPage, TagEvent};
pub use favicon::{best_favicon, FaviconCandidate};
pub use fetcher::{
    browser_headers, BodyReader, Fetch, FetchError, FetchResponse, Fetcher, FetcherConfig,
    DEFAULT_USER_AGENT,
};
pub use logging::{log_error_card, log_preview_card};
#[cfg(feature = "logging")]
pub use logging::{setup_logging, LogConfig};
pub use platforms::{PlatformAdapter, TwitterAdapter, YouTubeAdapter};
pub use preview_generator::{finalize, FetchedPage, UrlPreviewGenerator};
pub use preview_service::{
    PreviewService, PreviewServiceConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_TIMEOUT,
};

/// The single output record of every successful preview.
///
/// Core fields are always serialized; missing values are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMetadata {
    pub title: String,
    pub description: String,
    pub image: String,
    pub url: String,
    /// The caller's input, verbatim.
    pub request_url: String,
    pub site_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub favicon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

impl Default for NormalizedMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            image: String::new(),
            url: String::new(),
            request_url: String::new(),
            site_name: String::new(),
            kind: "website".to_string(),
            favicon: String::new(),
            author: None,
            video_id: None,
        }
    }
}

/// Either outcome of a preview, in the shape written to stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreviewResponse {
    Metadata(NormalizedMetadata),
    Error(ErrorResult),
}

impl PreviewResponse {
    pub fn from_result(result: Result<NormalizedMetadata, PreviewError>, request_url: &str) -> Self {
        match result {
            Ok(metadata) => PreviewResponse::Metadata(metadata),
            Err(e) => PreviewResponse::Error(e.into_result(request_url)),
        }
    }
}

#[async_trait]
pub trait PreviewGenerator {
    async fn generate_preview(&self, url: &str) -> Result<NormalizedMetadata, PreviewError>;
}
