//! # Segmux
//!
//! Downloads every segment referenced by a record playlist and joins them, in
//! playlist order, into a single media file through ffmpeg's concat demuxer.
//!
//! ## Pipeline
//!
//! - [`fetcher`]: `GET(url) -> bytes` over reqwest, behind the [`Fetcher`] trait
//! - [`playlist`]: extracts ordered segment paths from raw playlist text
//! - [`resolver`]: joins the playlist origin with each relative segment path
//! - [`downloader`]: fetches and stages segments, strictly in playlist order
//! - [`assembler`]: writes the concat manifest and runs the muxer
//! - [`staging`]: staging directory bookkeeping and cleanup
//! - [`pipeline`]: the orchestrator tying the stages together

pub mod assembler;
pub mod builder;
pub mod config;
pub mod downloader;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod pipeline;
pub mod playlist;
pub mod resolver;
pub mod staging;

#[cfg(test)]
pub(crate) mod test_utils;

pub use assembler::{Assembler, ConcatManifest, FfmpegMuxer, Muxer};
pub use builder::{DownloaderConfigBuilder, PipelineConfigBuilder};
pub use config::{CleanupPolicy, DownloaderConfig, PipelineConfig, ProxyAuth, ProxyConfig};
pub use downloader::{SegmentDownloader, StagedSegment};
pub use error::{FetchError, MuxError, SegmuxError};
pub use events::{OnProgress, PipelineEvent, StageProgress};
pub use fetcher::{FetchResponse, Fetcher, HttpFetcher, create_client};
pub use pipeline::{JobRequest, Pipeline, PipelineState, RunOutcome};
pub use playlist::{ParseOutcome, PlaylistParser, PlaylistSource, SegmentReference};
pub use resolver::{ResolvedSegment, origin_of, resolve};
pub use staging::StagingArea;
