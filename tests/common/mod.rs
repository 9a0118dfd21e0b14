#![allow(dead_code)]

use async_trait::async_trait;
use link_card::{BodyReader, Fetch, FetchError, FetchResponse};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub enum Route {
    Page {
        final_url: String,
        content_type: String,
        body: Vec<u8>,
    },
    Fail(FetchError),
}

impl Route {
    pub fn html(body: &str) -> Self {
        Route::Page {
            final_url: String::new(),
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn json(body: &str) -> Self {
        Route::Page {
            final_url: String::new(),
            content_type: "application/json".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    /// Same page, reported as reached through redirects ending at `final_url`.
    pub fn redirected_to(self, final_url: &str) -> Self {
        match self {
            Route::Page {
                content_type, body, ..
            } => Route::Page {
                final_url: final_url.to_string(),
                content_type,
                body,
            },
            fail => fail,
        }
    }
}

/// In-memory transport: exact URL routes first, then prefix routes.
#[derive(Default)]
pub struct MockFetcher {
    exact: HashMap<String, Route>,
    prefixes: Vec<(String, Route)>,
    calls: Mutex<Vec<String>>,
    read_limits: Arc<Mutex<Vec<usize>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, route: Route) -> Self {
        self.exact.insert(url.to_string(), route);
        self
    }

    pub fn route_prefix(mut self, prefix: &str, route: Route) -> Self {
        self.prefixes.push((prefix.to_string(), route));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn read_limits(&self) -> Vec<usize> {
        self.read_limits.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str) -> Option<Route> {
        self.exact.get(url).cloned().or_else(|| {
            self.prefixes
                .iter()
                .find(|(prefix, _)| url.starts_with(prefix.as_str()))
                .map(|(_, route)| route.clone())
        })
    }
}

struct StaticBody {
    data: Vec<u8>,
    read_limits: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl BodyReader for StaticBody {
    async fn read_bounded(&mut self, max_bytes: usize) -> Result<Vec<u8>, FetchError> {
        self.read_limits.lock().unwrap().push(max_bytes);
        let take = self.data.len().min(max_bytes);
        Ok(self.data[..take].to_vec())
    }
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn fetch(
        &self,
        url: &str,
        _timeout: Duration,
        _headers: &HeaderMap,
    ) -> Result<FetchResponse, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        match self.lookup(url) {
            Some(Route::Page {
                final_url,
                content_type,
                body,
            }) => {
                let mut headers = HeaderMap::new();
                if !content_type.is_empty() {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_str(&content_type).unwrap());
                }
                Ok(FetchResponse {
                    status: 200,
                    headers,
                    final_url: if final_url.is_empty() {
                        url.to_string()
                    } else {
                        final_url
                    },
                    body: Box::new(StaticBody {
                        data: body,
                        read_limits: Arc::clone(&self.read_limits),
                    }),
                })
            }
            Some(Route::Fail(e)) => Err(e),
            None => Err(FetchError::ConnectionFailure(format!("no route for {url}"))),
        }
    }
}
