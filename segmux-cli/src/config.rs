use std::time::Duration;

use segmux_engine::{DownloaderConfig, PipelineConfig, ProxyAuth, ProxyConfig};
use tracing::info;

use crate::cli::CliArgs;
use crate::error::AppError;
use crate::utils::parse_headers;

/// Configuration for the entire program
#[derive(Debug, Clone)]
pub struct ProgramConfig {
    pub downloader_config: DownloaderConfig,

    pub pipeline_config: PipelineConfig,

    /// Whether missing job inputs may be asked for interactively
    pub allow_prompt: bool,

    pub show_progress: bool,
}

impl ProgramConfig {
    pub fn from_args(args: &CliArgs) -> Result<Self, AppError> {
        let mut pipeline = PipelineConfig::builder()
            .output_dir(&args.output_dir)
            .output_extension(&args.extension)
            .staging_dir(&args.staging_dir)
            .manifest_path(&args.manifest)
            .concurrency(args.concurrency as usize)
            .cleanup_policy(args.cleanup)
            .ffmpeg_path(&args.ffmpeg);
        if let Some(pattern) = &args.pattern {
            pipeline = pipeline.segment_pattern(pattern);
        }
        let pipeline_config = pipeline.build();

        if pipeline_config.output_extension.is_empty() {
            return Err(AppError::InvalidInput(
                "Output extension must not be empty".to_string(),
            ));
        }

        let mut downloader = DownloaderConfig::builder()
            .with_timeout(Duration::from_secs(args.timeout))
            .with_connect_timeout(Duration::from_secs(args.connect_timeout))
            .with_read_timeout(Duration::from_secs(args.read_timeout))
            .with_headers(parse_headers(&args.headers));
        if let Some(user_agent) = &args.user_agent {
            downloader = downloader.with_user_agent(user_agent);
        }

        downloader = if args.no_proxy {
            // No proxy flag overrides everything else
            info!("All proxy settings disabled (--no-proxy flag)");
            downloader.with_system_proxy(false)
        } else if let Some(proxy_url) = &args.proxy {
            let auth = match (&args.proxy_user, &args.proxy_pass) {
                (Some(username), Some(password)) => Some(ProxyAuth {
                    username: username.clone(),
                    password: password.clone(),
                }),
                (None, None) => None,
                _ => {
                    return Err(AppError::InvalidInput(
                        "--proxy-user and --proxy-pass must be given together".to_string(),
                    ));
                }
            };
            info!(proxy_url = %proxy_url, has_auth = auth.is_some(), "Using explicit proxy configuration for downloads");
            downloader.with_proxy(ProxyConfig {
                url: proxy_url.clone(),
                auth,
            })
        } else {
            downloader.with_system_proxy(true)
        };

        Ok(Self {
            downloader_config: downloader.build(),
            pipeline_config,
            allow_prompt: !args.no_prompt,
            show_progress: !args.no_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use segmux_engine::CleanupPolicy;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("segmux").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = ProgramConfig::from_args(&parse(&[])).unwrap();
        let pipeline = &config.pipeline_config;
        assert_eq!(pipeline.staging_dir, PathBuf::from(".segments"));
        assert_eq!(pipeline.manifest_path, PathBuf::from("concat.txt"));
        assert_eq!(pipeline.output_dir, PathBuf::from("outputs"));
        assert_eq!(pipeline.output_path("myclip"), PathBuf::from("outputs").join("myclip.mp4"));
        assert_eq!(pipeline.concurrency, 1);
        assert_eq!(pipeline.cleanup_policy, CleanupPolicy::OnSuccess);
        assert_eq!(config.downloader_config.timeout, Duration::from_secs(60));
        assert!(config.downloader_config.use_system_proxy);
        assert!(config.allow_prompt);
        assert!(config.show_progress);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "-o",
            "clips",
            "--extension",
            ".mkv",
            "-c",
            "4",
            "--cleanup",
            "always",
            "--ffmpeg",
            "/opt/ffmpeg/bin/ffmpeg",
            "-H",
            "Referer: https://live.example.com/",
            "--no-prompt",
            "--no-progress",
        ]);
        let config = ProgramConfig::from_args(&args).unwrap();
        let pipeline = &config.pipeline_config;
        assert_eq!(pipeline.output_path("a"), PathBuf::from("clips").join("a.mkv"));
        assert_eq!(pipeline.concurrency, 4);
        assert_eq!(pipeline.cleanup_policy, CleanupPolicy::Always);
        assert_eq!(pipeline.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(
            config.downloader_config.headers["referer"],
            "https://live.example.com/"
        );
        assert!(!config.allow_prompt);
        assert!(!config.show_progress);
    }

    #[test]
    fn test_proxy_settings() {
        let config = ProgramConfig::from_args(&parse(&[
            "--proxy",
            "http://127.0.0.1:8080",
            "--proxy-user",
            "u",
            "--proxy-pass",
            "p",
        ]))
        .unwrap();
        let proxy = config.downloader_config.proxy.unwrap();
        assert_eq!(proxy.url, "http://127.0.0.1:8080");
        assert_eq!(proxy.auth.unwrap().username, "u");
        assert!(!config.downloader_config.use_system_proxy);

        let config = ProgramConfig::from_args(&parse(&["--no-proxy"])).unwrap();
        assert!(config.downloader_config.proxy.is_none());
        assert!(!config.downloader_config.use_system_proxy);
    }

    #[test]
    fn test_partial_proxy_auth_rejected() {
        let result = ProgramConfig::from_args(&parse(&[
            "--proxy",
            "http://127.0.0.1:8080",
            "--proxy-user",
            "u",
        ]));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = CliArgs::try_parse_from(["segmux", "-c", "0"]);
        assert!(result.is_err());
    }
}
