//! In-memory stand-ins for the fetch and mux capabilities.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::assembler::Muxer;
use crate::error::{FetchError, MuxError};
use crate::fetcher::{FetchResponse, Fetcher};

/// Macro to initialize tracing for tests
///
/// Usage:
/// - `init_test_tracing!()` - uses DEBUG level (default)
/// - `init_test_tracing!(INFO)` - uses specified level
#[macro_export]
macro_rules! init_test_tracing {
    () => {
        init_test_tracing!(DEBUG);
    };
    ($level:ident) => {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::$level)
            .with_test_writer()
            .try_init();
    };
}

pub use crate::init_test_tracing;

#[derive(Debug, Clone)]
enum Reply {
    Body(Bytes),
    Status(StatusCode),
}

#[derive(Debug, Clone)]
struct Route {
    reply: Reply,
    delay: Option<Duration>,
}

/// Serves canned bodies keyed by URL; unknown URLs answer 404.
#[derive(Default)]
pub struct MemoryFetcher {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancel_on: Option<(String, CancellationToken)>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.route(url, Reply::Body(body.into()), None)
    }

    pub fn with_delayed_body(
        self,
        url: impl Into<String>,
        body: impl Into<Bytes>,
        delay: Duration,
    ) -> Self {
        self.route(url, Reply::Body(body.into()), Some(delay))
    }

    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        self.route(url, Reply::Status(status), None)
    }

    pub fn with_delayed_status(
        self,
        url: impl Into<String>,
        status: u16,
        delay: Duration,
    ) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        self.route(url, Reply::Status(status), Some(delay))
    }

    /// Cancels `token` while serving `url`; the request itself still succeeds.
    pub fn cancel_on(mut self, url: impl Into<String>, token: CancellationToken) -> Self {
        self.cancel_on = Some((url.into(), token));
        self
    }

    fn route(mut self, url: impl Into<String>, reply: Reply, delay: Option<Duration>) -> Self {
        self.routes.insert(url.into(), Route { reply, delay });
        self
    }

    /// URLs in the order they were requested.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.requests.lock().push(url.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some((trigger, token)) = &self.cancel_on {
            if trigger == url {
                token.cancel();
            }
        }

        let route = self.routes.get(url).cloned();
        if let Some(delay) = route.as_ref().and_then(|r| r.delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match route.map(|r| r.reply) {
            Some(Reply::Body(bytes)) => Ok(FetchResponse {
                bytes,
                content_type: Some("video/mp2t".to_string()),
            }),
            Some(Reply::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            }),
        }
    }
}

/// Concatenates the files listed in the manifest into the output, the way a
/// stream-copy concat would.
#[derive(Default)]
pub struct FakeMuxer {
    fail: bool,
    manifests: Mutex<Vec<String>>,
}

impl FakeMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Manifest contents seen by each invocation.
    pub fn manifests(&self) -> Vec<String> {
        self.manifests.lock().clone()
    }

    fn entries(manifest: &str) -> Vec<PathBuf> {
        manifest
            .lines()
            .filter_map(|line| line.strip_prefix("file '")?.strip_suffix('\''))
            .map(|entry| PathBuf::from(entry.replace(r"'\''", "'")))
            .collect()
    }

    fn failure(stderr: impl Into<String>) -> MuxError {
        MuxError::ExitStatus {
            program: "fake-ffmpeg".to_string(),
            code: Some(1),
            stderr: stderr.into(),
        }
    }
}

#[async_trait]
impl Muxer for FakeMuxer {
    async fn concat(
        &self,
        manifest: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), MuxError> {
        if cancel.is_cancelled() {
            return Err(MuxError::Cancelled);
        }

        let text = std::fs::read_to_string(manifest).map_err(|e| Self::failure(e.to_string()))?;
        self.manifests.lock().push(text.clone());

        if self.fail {
            return Err(Self::failure("Invalid data found when processing input"));
        }

        let mut joined = Vec::new();
        for entry in Self::entries(&text) {
            joined.extend(std::fs::read(&entry).map_err(|e| Self::failure(e.to_string()))?);
        }
        std::fs::write(output, joined).map_err(|e| Self::failure(e.to_string()))
    }
}
