use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{fetch_oembed, oembed_endpoint, PlatformAdapter};
use crate::{Fetch, NormalizedMetadata, PreviewError};

const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";
const FAVICON: &str = "https://www.youtube.com/s/desktop/9c0f82da/img/favicon_144x144.png";

/// Tried in order; the first match wins.
static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:youtube\.com/watch\?v=|youtu\.be/)([a-zA-Z0-9_-]{11})",
        r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/v/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Failed to compile YouTube regex"))
    .collect()
});

#[derive(Debug, Deserialize)]
struct YouTubeOEmbed {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YouTubeAdapter;

impl YouTubeAdapter {
    pub fn new() -> Self {
        Self
    }

    fn map_oembed(url: &str, video_id: String, oembed: YouTubeOEmbed) -> NormalizedMetadata {
        let author = oembed.author_name.unwrap_or_default();
        NormalizedMetadata {
            title: oembed.title.unwrap_or_default(),
            description: if author.is_empty() {
                "Unknown".to_string()
            } else {
                author.clone()
            },
            image: max_resolution_thumbnail(&oembed.thumbnail_url.unwrap_or_default()),
            url: url.to_string(),
            request_url: url.to_string(),
            site_name: "YouTube".to_string(),
            kind: "video".to_string(),
            favicon: FAVICON.to_string(),
            author: Some(author),
            video_id: Some(video_id),
        }
    }

    async fn request_oembed(
        &self,
        video_id: &str,
        fetcher: &dyn Fetch,
        timeout: Duration,
    ) -> Result<YouTubeOEmbed, PreviewError> {
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        let endpoint = oembed_endpoint(
            OEMBED_ENDPOINT,
            &[("url", watch_url.as_str()), ("format", "json")],
        )?;
        fetch_oembed(fetcher, &endpoint, timeout).await
    }
}

/// Ask for the largest thumbnail variant.
///
/// The provider serves a lower resolution when `maxresdefault` does not
/// exist, so the rewritten URL is not checked.
fn max_resolution_thumbnail(thumbnail: &str) -> String {
    if thumbnail.contains("hqdefault") {
        thumbnail.replace("hqdefault", "maxresdefault")
    } else {
        thumbnail.to_string()
    }
}

#[async_trait]
impl PlatformAdapter for YouTubeAdapter {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn identify(&self, url: &str) -> Option<String> {
        VIDEO_ID_PATTERNS
            .iter()
            .find_map(|pattern| pattern.captures(url))
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
        let Some(video_id) = self.identify(url) else {
            debug!(url = %url, "No YouTube video id in URL");
            return None;
        };

        match self.request_oembed(&video_id, fetcher, timeout).await {
            Ok(oembed) => Some(Self::map_oembed(url, video_id, oembed)),
            Err(e) => {
                warn!(error = %e, url = %url, "YouTube oEmbed failed, falling back to page scraping");
                None
            }
        }
    }
}
