use crate::extractor::ParsedPage;
use crate::fetcher::browser_headers;
use crate::utils::{authority, origin, resolve_url};
use crate::{
    Fetch, Fetcher, MetadataExtractor, NormalizedMetadata, PreviewError, PreviewGenerator,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// A page that was fetched and parsed but not yet completed with defaults.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Location after redirects; relative links resolve against it.
    pub final_url: String,
    pub page: ParsedPage,
}

/// Generic path: fetch any URL as HTML and scrape its meta tags.
#[derive(Clone)]
pub struct UrlPreviewGenerator {
    pub fetcher: Arc<dyn Fetch>,
    extractor: MetadataExtractor,
    timeout: Duration,
    max_body_bytes: usize,
}

impl UrlPreviewGenerator {
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Self {
        Self::new_with_fetcher(Arc::new(Fetcher::new()), timeout, max_body_bytes)
    }

    pub fn new_with_fetcher(
        fetcher: Arc<dyn Fetch>,
        timeout: Duration,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            fetcher,
            extractor: MetadataExtractor::new(),
            timeout,
            max_body_bytes,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `url` with browser-like headers and parse at most
    /// `max_body_bytes` of the body.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage, PreviewError> {
        let (final_url, body) = {
            let mut response = self
                .fetcher
                .fetch(url, self.timeout, &browser_headers())
                .await?;

            let content_type = response.content_type().to_ascii_lowercase();
            if !content_type.contains("text/html") {
                debug!(url = %url, content_type = %content_type, "Response is not HTML");
                return Err(PreviewError::NotHtml);
            }

            let bytes = response.body.read_bounded(self.max_body_bytes).await?;
            debug!(url = %url, final_url = %response.final_url, content_length = bytes.len(), "Successfully fetched webpage");
            (response.final_url, String::from_utf8_lossy(&bytes).into_owned())
        };

        Ok(FetchedPage {
            final_url,
            page: self.extractor.extract(&body),
        })
    }
}

/// Complete a scraped page: rank the favicon, absolutize links against the
/// final URL and fill every default.
pub fn finalize(request_url: &str, fetched: FetchedPage) -> Result<NormalizedMetadata, PreviewError> {
    let final_url = Url::parse(&fetched.final_url)
        .map_err(|e| PreviewError::ParseFailure(format!("invalid final URL: {e}")))?;

    let best_favicon = fetched.page.best_favicon();
    let mut metadata = fetched.page.metadata;
    if !best_favicon.is_empty() {
        metadata.favicon = best_favicon;
    }

    metadata.image = absolutize(&final_url, &metadata.image);
    metadata.favicon = absolutize(&final_url, &metadata.favicon);

    if metadata.favicon.is_empty() {
        metadata.favicon = format!("{}/favicon.ico", origin(&final_url));
    }
    if metadata.url.is_empty() {
        metadata.url = request_url.to_string();
    }
    metadata.request_url = request_url.to_string();
    if metadata.site_name.is_empty() {
        metadata.site_name = authority(&final_url);
    }

    Ok(metadata)
}

fn absolutize(base: &Url, value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    resolve_url(base, value).unwrap_or_else(|| {
        debug!(value = %value, base = %base, "Dropping unresolvable link");
        String::new()
    })
}

#[async_trait]
impl PreviewGenerator for UrlPreviewGenerator {
    #[instrument(level = "debug", skip(self))]
    async fn generate_preview(&self, url: &str) -> Result<NormalizedMetadata, PreviewError> {
        let fetched = self.fetch_page(url).await?;
        finalize(url, fetched)
    }
}
