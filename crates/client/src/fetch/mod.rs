//! HTTP fetch layer used by the migration engine.
//!
//! ### Requests
//! - Migration requests carry credentials (shared cookie jar) and a marker
//!   header so intermediaries can tell them apart from navigations.
//! - Content requests use manual redirect handling: a 3xx is returned as is
//!   instead of being followed.
//!
//! ### Responses
//! - Non-2xx responses are returned to the caller, not turned into errors.
//! - Only transport failures (DNS, TLS, timeouts, oversized bodies) are errors.
//! - Max body bytes: 5MB (configurable)

#[cfg(test)]
pub(crate) mod mock;
pub mod url;

use appshift_core::{AppConfig, CachedResponse, Error};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::cookie::Jar;
use reqwest::{Client, StatusCode, header};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, resolve};

/// Default name of the marker header sent with migration requests.
pub const DEFAULT_MARKER_HEADER: &str = "X-Use-Fetch";

/// Whether cookies are attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    Include,
    #[default]
    Omit,
}

/// How redirects are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectMode {
    #[default]
    Follow,
    /// Return the redirect response itself.
    Manual,
}

/// A GET request issued through a [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub credentials: Credentials,
    pub headers: Vec<(String, String)>,
    pub redirect: RedirectMode,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: Credentials::default(),
            headers: Vec::new(),
            redirect: RedirectMode::default(),
        }
    }

    /// A credentialed request carrying the `marker_header` tooling marker.
    pub fn tooling(url: impl Into<String>, marker_header: &str) -> Self {
        Self { credentials: Credentials::Include, ..Self::new(url) }.header(marker_header, "true")
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn manual_redirects(mut self) -> Self {
        self.redirect = RedirectMode::Manual;
        self
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Whether any `Cache-Control` header asks not to store the response.
    pub fn is_no_store(&self) -> bool {
        self.headers
            .get_all(header::CACHE_CONTROL)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("no-store"))
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Convert into the form stored in the content cache.
    ///
    /// Headers whose values are not visible ASCII are dropped.
    pub fn into_cached(self) -> CachedResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        CachedResponse {
            url: self.final_url.into(),
            status: self.status.as_u16(),
            headers,
            body: self.bytes.to_vec(),
        }
    }
}

/// Asynchronous HTTP fetch.
///
/// Implementations return every HTTP response, whatever its status, and fail
/// only when no response could be obtained.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// Configuration for the fetch client. Defaults follow [`AppConfig::default`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,

    /// Maximum response body size in bytes
    pub max_bytes: usize,

    pub timeout: Duration,

    /// Redirect limit for clients in follow mode
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
        }
    }
}

/// reqwest-backed [`Fetcher`].
///
/// Holds one client per credentials/redirect combination; the credentialed
/// clients share a cookie jar.
pub struct FetchClient {
    credentialed: Client,
    credentialed_manual: Client,
    anonymous: Client,
    anonymous_manual: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let jar = Arc::new(Jar::default());

        Ok(Self {
            credentialed: build_client(&config, Some(&jar), RedirectMode::Follow)?,
            credentialed_manual: build_client(&config, Some(&jar), RedirectMode::Manual)?,
            anonymous: build_client(&config, None, RedirectMode::Follow)?,
            anonymous_manual: build_client(&config, None, RedirectMode::Manual)?,
            config,
        })
    }

    fn client_for(&self, request: &FetchRequest) -> &Client {
        match (request.credentials, request.redirect) {
            (Credentials::Include, RedirectMode::Follow) => &self.credentialed,
            (Credentials::Include, RedirectMode::Manual) => &self.credentialed_manual,
            (Credentials::Omit, RedirectMode::Follow) => &self.anonymous,
            (Credentials::Omit, RedirectMode::Manual) => &self.anonymous_manual,
        }
    }
}

fn build_client(config: &FetchConfig, jar: Option<&Arc<Jar>>, redirect: RedirectMode) -> Result<Client, Error> {
    let redirect = match redirect {
        RedirectMode::Follow => reqwest::redirect::Policy::limited(config.max_redirects),
        RedirectMode::Manual => reqwest::redirect::Policy::none(),
    };

    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout)
        .redirect(redirect)
        .use_rustls_tls()
        .gzip(true)
        .brotli(true)
        .deflate(true);

    if let Some(jar) = jar {
        builder = builder.cookie_provider(Arc::clone(jar));
    }

    builder
        .build()
        .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))
}

fn transport_error(url: &Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::HttpError(format!("network error for {url}: {err}"))
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = Url::parse(&request.url).map_err(|e| Error::MalformedUrl(format!("{}: {e}", request.url)))?;

        let mut builder = self.client_for(request).get(url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| transport_error(&url, e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| transport_error(&url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes)",
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, final_url, status, content_type, bytes, headers, fetch_ms })
    }
}
