use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{fetch_oembed, oembed_endpoint, PlatformAdapter};
use crate::extractor::strip_markup;
use crate::{Fetch, NormalizedMetadata};

const OEMBED_ENDPOINT: &str = "https://publish.twitter.com/oembed";
const FAVICON: &str = "https://abs.twimg.com/favicons/twitter.3.ico";

static STATUS_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/status(?:es)?/(\d+)").expect("Failed to compile status regex"));

#[derive(Debug, Clone, Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    html: String,
    #[serde(default)]
    author_name: Option<String>,
}

/// Posts on X / Twitter, looked up by their full URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwitterAdapter;

impl TwitterAdapter {
    pub fn new() -> Self {
        Self
    }

    fn map_oembed(url: &str, oembed: OEmbedResponse) -> NormalizedMetadata {
        let author = oembed.author_name.unwrap_or_default();
        NormalizedMetadata {
            title: if author.is_empty() {
                "Tweet".to_string()
            } else {
                author.clone()
            },
            description: strip_markup(&oembed.html),
            image: String::new(),
            url: url.to_string(),
            request_url: url.to_string(),
            site_name: "X (Twitter)".to_string(),
            kind: "article".to_string(),
            favicon: FAVICON.to_string(),
            author: Some(author),
            video_id: None,
        }
    }
}

#[async_trait]
impl PlatformAdapter for TwitterAdapter {
    fn name(&self) -> &'static str {
        "twitter"
    }

    /// Numeric status id. The oEmbed lookup is keyed by URL, so a missing id
    /// does not stop the request.
    fn identify(&self, url: &str) -> Option<String> {
        STATUS_ID
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    #[instrument(level = "debug", skip(self, fetcher))]
    async fn fetch_and_map(
        &self,
        url: &str,
        fetcher: &dyn Fetch,
        timeout: Duration,
    ) -> Option<NormalizedMetadata> {
        debug!(status_id = ?self.identify(url), "Fetching Twitter oEmbed data");

        let result = match oembed_endpoint(OEMBED_ENDPOINT, &[("url", url)]) {
            Ok(endpoint) => fetch_oembed::<OEmbedResponse>(fetcher, &endpoint, timeout).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(oembed) => Some(Self::map_oembed(url, oembed)),
            Err(e) => {
                warn!(error = %e, url = %url, "Twitter oEmbed failed, falling back to page scraping");
                None
            }
        }
    }
}
