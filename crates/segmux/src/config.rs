use std::{fmt::Display, path::PathBuf, time::Duration};

use reqwest::header::{HeaderMap, HeaderValue};

use crate::playlist::DEFAULT_SEGMENT_PATTERN;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Proxy authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// Proxy used for every request (playlist and segments).
///
/// The scheme of `url` selects the proxy kind (`http://`, `https://`, `socks5://`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub url: String,
    pub auth: Option<ProxyAuth>,
}

/// HTTP options for the [`HttpFetcher`](crate::HttpFetcher)
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Overall timeout for one request, zero disables it
    pub timeout: Duration,

    /// Time allowed to establish a connection, zero disables it
    pub connect_timeout: Duration,

    /// Maximum idle time between body chunks, zero disables it
    pub read_timeout: Duration,

    pub follow_redirects: bool,

    pub user_agent: String,

    /// Headers sent with every request, merged over the defaults
    pub headers: HeaderMap,

    pub proxy: Option<ProxyConfig>,

    /// Whether to use system proxy settings when no explicit proxy is set
    pub use_system_proxy: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::default_headers(),
            proxy: None,
            use_system_proxy: true,
        }
    }
}

impl DownloaderConfig {
    pub fn builder() -> crate::builder::DownloaderConfigBuilder {
        crate::builder::DownloaderConfigBuilder::new()
    }

    pub fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers
    }
}

/// What happens to staged segments and the manifest when a run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CleanupPolicy {
    /// Remove staging files only after a successful assembly. Failed runs leave
    /// everything on disk for inspection.
    #[default]
    OnSuccess,
    /// Remove staging files and the manifest after a failed run as well.
    Always,
}

/// Filesystem layout and execution strategy of a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Holds one file per segment, exclusive to a single run
    pub staging_dir: PathBuf,

    /// Concat manifest handed to the muxer
    pub manifest_path: PathBuf,

    /// Directory receiving the final artifact
    pub output_dir: PathBuf,

    /// Extension of the final artifact, without the dot
    pub output_extension: String,

    /// Regex locating segment paths inside the playlist text
    pub segment_pattern: String,

    /// Number of segment fetches allowed in flight, 1 is strictly sequential
    pub concurrency: usize,

    pub cleanup_policy: CleanupPolicy,

    /// Muxer executable
    pub ffmpeg_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from(".segments"),
            manifest_path: PathBuf::from("concat.txt"),
            output_dir: PathBuf::from("outputs"),
            output_extension: "mp4".to_string(),
            segment_pattern: DEFAULT_SEGMENT_PATTERN.to_string(),
            concurrency: 1,
            cleanup_policy: CleanupPolicy::default(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl Display for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PipelineConfig {{ staging_dir: {}, manifest: {}, output_dir: {}, extension: {}, concurrency: {}, cleanup: {:?} }}",
            self.staging_dir.display(),
            self.manifest_path.display(),
            self.output_dir.display(),
            self.output_extension,
            self.concurrency,
            self.cleanup_policy
        )
    }
}

impl PipelineConfig {
    pub fn builder() -> crate::builder::PipelineConfigBuilder {
        crate::builder::PipelineConfigBuilder::default()
    }

    /// `<output_dir>/<name>.<extension>`
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{name}.{}", self.output_extension))
    }
}
