use crate::platforms::{PlatformAdapter, TwitterAdapter, YouTubeAdapter};
use crate::{
    classify, Fetch, Fetcher, FetcherConfig, NormalizedMetadata, PlatformKind, PreviewError,
    PreviewGenerator, UrlPreviewGenerator,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Cap on how much of a page body is read before parsing.
pub const DEFAULT_MAX_BODY_BYTES: usize = 500 * 1024;

/// PreviewService provides a unified preview generation service
/// It identifies video-host and microblog URLs and asks their oEmbed
/// endpoints first, scraping the page itself for everything else
#[derive(Clone)]
pub struct PreviewService {
    pub default_generator: Arc<UrlPreviewGenerator>,
    video_adapter: Arc<dyn PlatformAdapter>,
    microblog_adapter: Arc<dyn PlatformAdapter>,
}

impl Default for PreviewService {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewService {
    pub fn new() -> Self {
        Self::new_with_config(PreviewServiceConfig::new())
    }

    /// Service that sends every request through `fetcher`.
    pub fn with_fetcher(fetcher: Arc<dyn Fetch>) -> Self {
        Self::new_with_config(PreviewServiceConfig::new().with_fetcher(fetcher))
    }

    pub fn new_with_config(config: PreviewServiceConfig) -> Self {
        debug!(
            timeout = ?config.timeout,
            max_body_bytes = config.max_body_bytes,
            "Initializing PreviewService"
        );

        let fetcher = config
            .fetcher
            .unwrap_or_else(|| Arc::new(Fetcher::new_with_config(config.fetcher_config)));

        Self {
            default_generator: Arc::new(UrlPreviewGenerator::new_with_fetcher(
                fetcher,
                config.timeout,
                config.max_body_bytes,
            )),
            video_adapter: Arc::new(YouTubeAdapter::new()),
            microblog_adapter: Arc::new(TwitterAdapter::new()),
        }
    }

    fn adapter_for(&self, kind: PlatformKind) -> Option<&dyn PlatformAdapter> {
        match kind {
            PlatformKind::VideoHost => Some(self.video_adapter.as_ref()),
            PlatformKind::Microblog => Some(self.microblog_adapter.as_ref()),
            PlatformKind::Generic => None,
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn generate_preview(&self, url: &str) -> Result<NormalizedMetadata, PreviewError> {
        debug!("Starting preview generation for URL: {}", url);

        validate(url).inspect_err(|e| e.log())?;

        let kind = classify(url);
        if let Some(adapter) = self.adapter_for(kind) {
            debug!(platform = %kind, adapter = adapter.name(), "Trying platform adapter");
            let generator = &self.default_generator;
            if let Some(metadata) = adapter
                .fetch_and_map(url, generator.fetcher.as_ref(), generator.timeout())
                .await
            {
                return Ok(metadata);
            }
            debug!(platform = %kind, "Adapter produced nothing, using default URL handler");
        }

        self.default_generator
            .generate_preview(url)
            .await
            .inspect_err(|e| e.log())
    }
}

/// Reject input without a scheme or host before anything touches the network.
///
/// The authority must be spelled out as `scheme://host`; forms such as
/// `http:example.com` that WHATWG parsing would repair are refused.
fn validate(url: &str) -> Result<Url, PreviewError> {
    let has_authority = url
        .split_once(':')
        .is_some_and(|(_, rest)| rest.starts_with("//"));
    if !has_authority {
        debug!(url = %url, "URL has no authority component");
        return Err(PreviewError::InvalidUrl);
    }

    let parsed = Url::parse(url).map_err(|e| {
        debug!(error = %e, url = %url, "URL parsing failed");
        PreviewError::InvalidUrl
    })?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(PreviewError::InvalidUrl),
    }
}

pub struct PreviewServiceConfig {
    /// Applied to each fetch as a whole: connect, headers and body.
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub fetcher_config: FetcherConfig,
    /// Replaces the reqwest transport built from `fetcher_config`.
    pub fetcher: Option<Arc<dyn Fetch>>,
}

impl Default for PreviewServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewServiceConfig {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            fetcher_config: FetcherConfig::default(),
            fetcher: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn with_fetcher_config(mut self, fetcher_config: FetcherConfig) -> Self {
        self.fetcher_config = fetcher_config;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }
}
