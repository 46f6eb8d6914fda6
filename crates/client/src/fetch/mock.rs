//! Scripted in-memory [`Fetcher`] for tests.

use super::{FetchRequest, FetchResponse, Fetcher};
use appshift_core::Error;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Route {
    Respond { status: u16, headers: Vec<(String, String)>, body: Vec<u8> },
    NetworkError,
}

/// Answers requests from a table of routes and records every request it sees.
///
/// Requests for URLs without a route fail with a network error.
#[derive(Debug, Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, Route>>,
    delays: Mutex<HashMap<String, Duration>>,
    redirects: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) -> &Self {
        self.respond_with_headers(url, status, &[], body)
    }

    pub fn respond_with_headers(&self, url: &str, status: u16, headers: &[(&str, &str)], body: &str) -> &Self {
        let headers = headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let route = Route::Respond { status, headers, body: body.as_bytes().to_vec() };
        self.routes.lock().unwrap().insert(url.to_string(), route);
        self
    }

    pub fn fail(&self, url: &str) -> &Self {
        self.routes.lock().unwrap().insert(url.to_string(), Route::NetworkError);
        self
    }

    /// Hold the response for `url` back by `delay`.
    pub fn delay(&self, url: &str, delay: Duration) -> &Self {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
        self
    }

    /// Report the response for `url` as served from `final_url`.
    pub fn redirect(&self, url: &str, final_url: &str) -> &Self {
        self.redirects.lock().unwrap().insert(url.to_string(), final_url.to_string());
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.url == url).count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.requests.lock().unwrap().push(request.clone());

        let delay = self.delays.lock().unwrap().get(&request.url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let route = self.routes.lock().unwrap().get(&request.url).cloned();
        match route {
            Some(Route::Respond { status, headers, body }) => {
                let mut map = HeaderMap::new();
                for (name, value) in &headers {
                    map.append(
                        HeaderName::from_bytes(name.as_bytes()).unwrap(),
                        HeaderValue::from_str(value).unwrap(),
                    );
                }
                let url = Url::parse(&request.url).unwrap();
                let final_url = match self.redirects.lock().unwrap().get(&request.url) {
                    Some(target) => Url::parse(target).unwrap(),
                    None => url.clone(),
                };
                Ok(FetchResponse {
                    final_url,
                    url,
                    status: StatusCode::from_u16(status).unwrap(),
                    content_type: None,
                    bytes: Bytes::from(body),
                    headers: map,
                    fetch_ms: 0,
                })
            }
            Some(Route::NetworkError) | None => Err(Error::HttpError(format!("network error for {}", request.url))),
        }
    }
}
