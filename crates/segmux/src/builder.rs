//! # Builders for the engine configuration
//!
//! ```
//! use std::time::Duration;
//! use segmux_engine::{CleanupPolicy, DownloaderConfig, PipelineConfig};
//!
//! let http = DownloaderConfig::builder()
//!     .with_timeout(Duration::from_secs(120))
//!     .with_header("Referer", "https://cdn.example.com/")
//!     .build();
//!
//! let pipeline = PipelineConfig::builder()
//!     .output_dir("./outputs")
//!     .concurrency(4)
//!     .cleanup_policy(CleanupPolicy::Always)
//!     .build();
//!
//! assert_eq!(pipeline.concurrency, 4);
//! assert!(http.headers.contains_key("referer"));
//! ```

use std::{path::PathBuf, time::Duration};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::{CleanupPolicy, DownloaderConfig, PipelineConfig, ProxyConfig};

/// Fluent builder for [`DownloaderConfig`]
#[derive(Debug, Clone)]
pub struct DownloaderConfigBuilder {
    config: DownloaderConfig,
}

impl DownloaderConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: DownloaderConfig::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a single header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Merge `headers` over the current set; custom values win over defaults.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.config.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Explicit proxy, overrides system proxy settings
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self.config.use_system_proxy = false;
        self
    }

    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        if self.config.proxy.is_none() {
            self.config.use_system_proxy = use_system_proxy;
        }
        self
    }

    pub fn build(self) -> DownloaderConfig {
        self.config
    }
}

impl Default for DownloaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent builder for [`PipelineConfig`]
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.staging_dir = dir.into();
        self
    }

    pub fn manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.manifest_path = path.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn output_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.config.output_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn segment_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.segment_pattern = pattern.into();
        self
    }

    /// Clamped to at least 1
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    pub fn cleanup_policy(mut self, policy: CleanupPolicy) -> Self {
        self.config.cleanup_policy = policy;
        self
    }

    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffmpeg_path = path.into();
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyAuth;

    #[test]
    fn test_builder_defaults() {
        let config = DownloaderConfigBuilder::new().build();
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.follow_redirects);
        assert!(config.use_system_proxy);
    }

    #[test]
    fn test_custom_headers_override_defaults() {
        let mut custom = HeaderMap::new();
        custom.insert(reqwest::header::ACCEPT, HeaderValue::from_static("video/mp2t"));
        let config = DownloaderConfigBuilder::new()
            .with_headers(custom)
            .with_header("X-Token", "abc")
            .with_header("bad header", "ignored")
            .build();

        assert_eq!(config.headers.get("accept").unwrap(), "video/mp2t");
        assert_eq!(config.headers.get("x-token").unwrap(), "abc");
        assert!(config.headers.get("connection").is_some());
        assert!(!config.headers.contains_key("bad header"));
    }

    #[test]
    fn test_proxy_disables_system_proxy() {
        let config = DownloaderConfigBuilder::new()
            .with_proxy(ProxyConfig {
                url: "socks5://127.0.0.1:1080".to_string(),
                auth: Some(ProxyAuth {
                    username: "user".to_string(),
                    password: "pass".to_string(),
                }),
            })
            .with_system_proxy(true)
            .build();

        assert!(!config.use_system_proxy);
        assert_eq!(config.proxy.unwrap().auth.unwrap().username, "user");
    }

    #[test]
    fn test_pipeline_builder() {
        let config = PipelineConfigBuilder::default()
            .staging_dir("/tmp/run-1/.segments")
            .manifest_path("/tmp/run-1/concat.txt")
            .output_extension(".mkv")
            .concurrency(0)
            .cleanup_policy(CleanupPolicy::Always)
            .ffmpeg_path("/usr/local/bin/ffmpeg")
            .build();

        assert_eq!(config.output_extension, "mkv");
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.cleanup_policy, CleanupPolicy::Always);
        assert_eq!(config.output_path("clip"), PathBuf::from("outputs/clip.mkv"));
    }
}
