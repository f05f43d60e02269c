// Fetcher: the `GET(url) -> bytes` capability used for the playlist and every segment.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Proxy, header::CONTENT_TYPE};
use tracing::{debug, info};
use url::Url;

use crate::config::{DownloaderConfig, ProxyConfig};
use crate::error::{FetchError, SegmuxError};

/// Body and content type of a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl FetchResponse {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issues a single GET. Non-2xx answers are errors; no retry is attempted.
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Build a reqwest proxy from our configuration
fn build_proxy(config: &ProxyConfig) -> Result<Proxy, SegmuxError> {
    let mut proxy = Proxy::all(&config.url)
        .map_err(|e| SegmuxError::Config(format!("Invalid proxy URL {}: {e}", config.url)))?;
    if let Some(auth) = &config.auth {
        proxy = proxy.basic_auth(&auth.username, &auth.password);
    }
    Ok(proxy)
}

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &DownloaderConfig) -> Result<Client, SegmuxError> {
    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(2)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if !config.read_timeout.is_zero() {
        client_builder = client_builder.read_timeout(config.read_timeout);
    }

    if let Some(proxy_config) = &config.proxy {
        client_builder = client_builder.proxy(build_proxy(proxy_config)?);
        info!(proxy_url = %proxy_config.url, "Using explicitly configured proxy");
    } else if config.use_system_proxy {
        // reqwest picks up system proxy settings unless no_proxy() is called
        debug!("Using system proxy settings");
    } else {
        client_builder = client_builder.no_proxy();
        debug!("Proxy disabled");
    }

    client_builder
        .build()
        .map_err(|e| SegmuxError::Config(format!("Failed to build HTTP client: {e}")))
}

/// [`Fetcher`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &DownloaderConfig) -> Result<Self, SegmuxError> {
        Ok(Self::with_client(create_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn classify(url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Http(error)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::classify(url, e))?;

        debug!(url = %url, bytes = bytes.len(), "Fetched");
        Ok(FetchResponse {
            bytes,
            content_type,
        })
    }
}
