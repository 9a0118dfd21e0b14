//! Platform adapters for hosts that expose an oEmbed endpoint.
//!
//! An adapter either produces a complete record or nothing at all; every
//! failure collapses to `None` so the caller can fall back to scraping.

mod twitter;
mod youtube;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::{Fetch, NormalizedMetadata, PreviewError};

pub use twitter::TwitterAdapter;
pub use youtube::YouTubeAdapter;

/// Upper bound for an oEmbed JSON document.
const MAX_OEMBED_BYTES: usize = 64 * 1024;

#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Platform-specific content identifier, if the URL has a known shape.
    fn identify(&self, url: &str) -> Option<String>;

    async fn fetch_and_map(
        &self,
        url: &str,
        fetcher: &dyn Fetch,
        timeout: Duration,
    ) -> Option<NormalizedMetadata>;
}

fn oembed_endpoint(base: &str, params: &[(&str, &str)]) -> Result<Url, PreviewError> {
    Url::parse_with_params(base, params).map_err(|e| PreviewError::ParseFailure(e.to_string()))
}

async fn fetch_oembed<T: DeserializeOwned>(
    fetcher: &dyn Fetch,
    endpoint: &Url,
    timeout: Duration,
) -> Result<T, PreviewError> {
    debug!(endpoint = %endpoint, "Fetching oEmbed data");

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut response = fetcher.fetch(endpoint.as_str(), timeout, &headers).await?;
    let body = response.body.read_bounded(MAX_OEMBED_BYTES).await?;

    serde_json::from_slice(&body).map_err(|e| PreviewError::ParseFailure(e.to_string()))
}
