use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE,
    USER_AGENT,
};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Transport-level failure reported by a [`Fetch`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("{0}")]
    ConnectionFailure(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Reads a response body up to a caller-chosen cap.
#[async_trait]
pub trait BodyReader: Send {
    /// Never returns more than `max_bytes` bytes, and stops pulling from the
    /// connection once the cap is reached.
    async fn read_bounded(&mut self, max_bytes: usize) -> Result<Vec<u8>, FetchError>;
}

pub struct FetchResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Location after all redirects were followed.
    pub final_url: String,
    pub body: Box<dyn BodyReader>,
}

impl FetchResponse {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("final_url", &self.final_url)
            .finish_non_exhaustive()
    }
}

/// The network collaborator used by the preview pipeline.
///
/// Implementations follow redirects themselves and report the final URL.
/// Non-success statuses are returned as [`FetchError::HttpStatus`].
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        headers: &HeaderMap,
    ) -> Result<FetchResponse, FetchError>;
}

/// Creates a fetcher backed by `reqwest`.
///
/// # Examples
/// ```ignore
/// let fetcher = Fetcher::new();
///
/// let custom_fetcher = Fetcher::new_with_config(FetcherConfig {
///     user_agent: "my-custom-agent/1.0".to_string(),
///     max_redirects: 5,
///     headers: Some(my_custom_headers),
/// });
/// ```
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub max_redirects: usize,
    /// Sent with every request, before per-call headers.
    pub headers: Option<HeaderMap>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 10,
            headers: None,
        }
    }
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        debug!("Fetcher initialized with default configuration");
        Self::new_with_config(FetcherConfig::default())
    }

    pub fn new_with_config(config: FetcherConfig) -> Self {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to build configured HTTP client, using defaults");
                Client::new()
            });
        Self { client, config }
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            config: FetcherConfig::default(),
        }
    }

    fn request_headers(&self, extra: &HeaderMap) -> HeaderMap {
        let mut headers = self.config.headers.clone().unwrap_or_default();
        if let Ok(ua) = HeaderValue::from_str(&self.config.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        for (name, value) in extra {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }
}

#[async_trait]
impl Fetch for Fetcher {
    #[instrument(level = "debug", skip(self, headers))]
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        headers: &HeaderMap,
    ) -> Result<FetchResponse, FetchError> {
        debug!(url = %url, "Starting fetch request");

        let response = self
            .client
            .get(url)
            .headers(self.request_headers(headers))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, url = %url, "Failed to send request");
                connection_failure(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = %status, "Server returned non-success status");
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let final_url = response.url().to_string();
        debug!(url = %url, final_url = %final_url, "Received response");

        Ok(FetchResponse {
            status: status.as_u16(),
            headers: response.headers().clone(),
            final_url,
            body: Box::new(ResponseBody(response)),
        })
    }
}

fn connection_failure(e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        return FetchError::ConnectionFailure("timed out".to_string());
    }
    FetchError::ConnectionFailure(e.to_string())
}

/// Owns the live response; dropping it releases the connection.
struct ResponseBody(reqwest::Response);

#[async_trait]
impl BodyReader for ResponseBody {
    async fn read_bounded(&mut self, max_bytes: usize) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();
        while body.len() < max_bytes {
            match self.0.chunk().await {
                Ok(Some(chunk)) => {
                    let take = chunk.len().min(max_bytes - body.len());
                    body.extend_from_slice(&chunk[..take]);
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "Failed to read response body");
                    return Err(FetchError::Body(e.to_string()));
                }
            }
        }
        Ok(body)
    }
}

/// Headers that make the generic page fetch look like a desktop browser.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    headers
}
