// Orchestrator: fetch playlist -> parse -> download -> assemble -> clean up.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::assembler::{Assembler, FfmpegMuxer, Muxer};
use crate::config::{CleanupPolicy, DownloaderConfig, PipelineConfig};
use crate::downloader::SegmentDownloader;
use crate::error::SegmuxError;
use crate::events::{OnProgress, PipelineEvent};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::playlist::{ParseOutcome, PlaylistParser, PlaylistSource};
use crate::resolver::{origin_of, resolve_all};
use crate::staging::StagingArea;

/// What to download and what to call the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub playlist_url: String,
    /// Base name of the output file, without directory or extension
    pub output_name: String,
}

impl JobRequest {
    pub fn new(playlist_url: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            playlist_url: playlist_url.into(),
            output_name: output_name.into(),
        }
    }

    /// Rejects empty values and output names that would escape the output directory.
    pub fn validate(&self) -> Result<(), SegmuxError> {
        if self.playlist_url.trim().is_empty() {
            return Err(SegmuxError::InvalidInput(
                "Playlist URL is empty".to_string(),
            ));
        }

        let name = self.output_name.trim();
        if name.is_empty() {
            return Err(SegmuxError::InvalidInput(
                "Output name is empty".to_string(),
            ));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(SegmuxError::InvalidInput(format!(
                "Output name '{name}' must be a plain file name"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    PlaylistFetched,
    SegmentsParsed,
    Downloading,
    Assembled,
    /// Terminal success
    CleanedUp,
    /// Terminal, informational: the playlist held no segment path
    NoSegments,
    /// Terminal failure
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::CleanedUp | PipelineState::NoSegments | PipelineState::Failed
        )
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::PlaylistFetched => "playlist-fetched",
            PipelineState::SegmentsParsed => "segments-parsed",
            PipelineState::Downloading => "downloading",
            PipelineState::Assembled => "assembled",
            PipelineState::CleanedUp => "cleaned-up",
            PipelineState::NoSegments => "no-segments",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { output: PathBuf, segments: usize },
    NoSegments,
}

/// Files a run has created so far, used for cleanup.
#[derive(Debug, Default)]
struct RunArtifacts {
    staged: Vec<PathBuf>,
    manifest: Option<PathBuf>,
}

pub struct Pipeline {
    config: PipelineConfig,
    parser: PlaylistParser,
    fetcher: Arc<dyn Fetcher>,
    muxer: Arc<dyn Muxer>,
    on_progress: Option<OnProgress>,
    cancel: CancellationToken,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        fetcher: Arc<dyn Fetcher>,
        muxer: Arc<dyn Muxer>,
    ) -> Result<Self, SegmuxError> {
        let parser = PlaylistParser::new(&config.segment_pattern)?;
        Ok(Self {
            config,
            parser,
            fetcher,
            muxer,
            on_progress: None,
            cancel: CancellationToken::new(),
            state: PipelineState::Idle,
        })
    }

    /// Pipeline over HTTP and the configured ffmpeg executable.
    pub fn with_defaults(
        downloader_config: &DownloaderConfig,
        config: PipelineConfig,
    ) -> Result<Self, SegmuxError> {
        let fetcher = Arc::new(HttpFetcher::new(downloader_config)?);
        let muxer = Arc::new(FfmpegMuxer::new(config.ffmpeg_path.clone()));
        Self::new(config, fetcher, muxer)
    }

    pub fn with_progress(mut self, on_progress: OnProgress) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(callback) = &self.on_progress {
            callback(event);
        }
    }

    fn staging(&self) -> StagingArea {
        StagingArea::new(&self.config.staging_dir)
    }

    /// Runs one job to a terminal state.
    ///
    /// A pipeline is single-use per job: calling `run` again starts from `Idle`.
    /// Concurrent runs must not share a staging directory.
    pub async fn run(&mut self, job: &JobRequest) -> Result<RunOutcome, SegmuxError> {
        self.state = PipelineState::Idle;
        let started = Instant::now();
        let mut artifacts = RunArtifacts::default();

        match self.execute(job, &mut artifacts).await {
            Ok(outcome) => {
                info!(url = %job.playlist_url, duration = ?started.elapsed(), outcome = ?outcome, "Run finished");
                Ok(outcome)
            }
            Err(e) => {
                warn!(url = %job.playlist_url, state = %self.state, error = %e, "Run failed");
                self.transition(PipelineState::Failed);
                if self.config.cleanup_policy == CleanupPolicy::Always {
                    self.cleanup_after_failure(&artifacts).await;
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &mut self,
        job: &JobRequest,
        artifacts: &mut RunArtifacts,
    ) -> Result<RunOutcome, SegmuxError> {
        job.validate()?;
        let output = self.config.output_path(job.output_name.trim());

        // Idle -> PlaylistFetched
        let origin = origin_of(&job.playlist_url)?;
        info!(url = %job.playlist_url, "Fetching playlist");
        let response = self
            .fetcher
            .fetch(&job.playlist_url)
            .await
            .map_err(SegmuxError::Playlist)?;
        let source = PlaylistSource::new(origin, response.text());
        self.transition(PipelineState::PlaylistFetched);
        self.emit(PipelineEvent::PlaylistFetched {
            url: job.playlist_url.clone(),
            bytes: response.bytes.len(),
        });

        // PlaylistFetched -> SegmentsParsed | NoSegments
        let references = match self.parser.parse(source.raw_text()) {
            ParseOutcome::Segments(references) => references,
            ParseOutcome::NoSegments => {
                info!(url = %job.playlist_url, "No segment URLs found in the playlist");
                self.transition(PipelineState::NoSegments);
                return Ok(RunOutcome::NoSegments);
            }
        };
        let total = references.len();
        let segments = resolve_all(source.origin(), references);
        info!(total, origin = %source.origin(), "Found segments");
        self.transition(PipelineState::SegmentsParsed);
        self.emit(PipelineEvent::SegmentsParsed { total });

        // SegmentsParsed -> Downloading
        let downloader = SegmentDownloader::new(self.fetcher.clone(), self.staging())
            .with_concurrency(self.config.concurrency)
            .with_progress(self.on_progress.clone())
            .with_cancellation(self.cancel.clone());
        artifacts.staged = downloader.planned_paths(&segments);
        self.transition(PipelineState::Downloading);
        let staged = downloader.download_all(&segments).await?;

        if self.cancel.is_cancelled() {
            return Err(SegmuxError::Cancelled);
        }

        // Downloading -> Assembled
        let staged_paths: Vec<PathBuf> = staged.into_iter().map(|s| s.path).collect();
        let assembler = Assembler::new(self.muxer.clone(), &self.config.manifest_path);
        artifacts.manifest = Some(assembler.manifest_path().to_path_buf());
        self.emit(PipelineEvent::Assembling {
            manifest: assembler.manifest_path().to_path_buf(),
            output: output.clone(),
        });
        assembler.assemble(&staged_paths, &output, &self.cancel).await?;
        self.transition(PipelineState::Assembled);
        self.emit(PipelineEvent::Assembled {
            output: output.clone(),
        });
        info!(output = %output.display(), "Combined segments");

        // Assembled -> CleanedUp
        let removed = self
            .staging()
            .cleanup(&artifacts.staged, artifacts.manifest.as_deref())
            .await?;
        self.transition(PipelineState::CleanedUp);
        self.emit(PipelineEvent::CleanedUp { removed });

        Ok(RunOutcome::Completed {
            output,
            segments: total,
        })
    }

    async fn cleanup_after_failure(&self, artifacts: &RunArtifacts) {
        match self
            .staging()
            .cleanup(&artifacts.staged, artifacts.manifest.as_deref())
            .await
        {
            Ok(removed) => info!(removed, "Removed staging files after failure"),
            Err(e) => warn!(error = %e, "Cleanup after failure incomplete"),
        }
    }

    /// Removes whatever a previous run left in the staging directory for the
    /// given files, plus the manifest. Safe on an already clean directory.
    pub async fn cleanup(&self, files: &[PathBuf]) -> Result<usize, SegmuxError> {
        self.staging()
            .cleanup(files, Some(self.config.manifest_path.as_path()))
            .await
    }
}
