// Segment downloader: fetches every resolved segment and stages it on disk,
// strictly in playlist order.
//
// Fetches go through `buffered`, which keeps at most `concurrency` requests in
// flight and yields their results in submission order. Staging writes and
// progress updates therefore always happen for segment i before segment i + 1,
// whatever order the requests complete in.

use std::path::PathBuf;
use std::sync::Arc;

use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::SegmuxError;
use crate::events::{OnProgress, PipelineEvent, StageProgress};
use crate::fetcher::{FetchResponse, Fetcher};
use crate::resolver::ResolvedSegment;
use crate::staging::StagingArea;

/// A segment whose payload has been written to the staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSegment {
    pub segment: ResolvedSegment,
    pub path: PathBuf,
    pub bytes: u64,
}

pub struct SegmentDownloader {
    fetcher: Arc<dyn Fetcher>,
    staging: StagingArea,
    concurrency: usize,
    on_progress: Option<OnProgress>,
    cancel: CancellationToken,
}

impl SegmentDownloader {
    pub fn new(fetcher: Arc<dyn Fetcher>, staging: StagingArea) -> Self {
        Self {
            fetcher,
            staging,
            concurrency: 1,
            on_progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Maximum number of fetches in flight, at least 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, on_progress: Option<OnProgress>) -> Self {
        self.on_progress = on_progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stage paths this downloader will use for `segments`.
    pub fn planned_paths(&self, segments: &[ResolvedSegment]) -> Vec<PathBuf> {
        self.staging.assign_paths(segments)
    }

    async fn fetch_segment(
        fetcher: &dyn Fetcher,
        cancel: &CancellationToken,
        segment: &ResolvedSegment,
    ) -> Result<FetchResponse, SegmuxError> {
        if cancel.is_cancelled() {
            return Err(SegmuxError::Cancelled);
        }

        debug!(index = segment.index(), url = %segment.url, "Fetching segment");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SegmuxError::Cancelled),
            result = fetcher.fetch(&segment.url) => result.map_err(|source| SegmuxError::Segment {
                index: segment.index(),
                url: segment.url.clone(),
                source,
            }),
        }
    }

    /// Fetches and stages all `segments`, returning them in the same order.
    ///
    /// Stops at the first failure: nothing past the failing index is staged
    /// and in-flight requests are dropped.
    pub async fn download_all(
        &self,
        segments: &[ResolvedSegment],
    ) -> Result<Vec<StagedSegment>, SegmuxError> {
        let total = segments.len();
        let paths = self.planned_paths(segments);
        self.staging.prepare().await?;

        info!(total, concurrency = self.concurrency, "Downloading segments");

        let fetcher = self.fetcher.as_ref();
        let cancel = &self.cancel;
        let mut fetches = stream::iter(segments)
            .map(|segment| Self::fetch_segment(fetcher, cancel, segment))
            .buffered(self.concurrency);

        let mut staged = Vec::with_capacity(total);
        while let Some(result) = fetches.next().await {
            let position = staged.len();
            let segment = &segments[position];
            let response = result.inspect_err(|e| {
                error!(index = segment.index(), url = %segment.url, error = %e, "Segment download failed");
            })?;

            let path = paths[position].clone();
            self.staging.write(&path, &response.bytes).await?;

            let bytes = response.bytes.len() as u64;
            let progress = StageProgress::new(position + 1, total);
            debug!(index = segment.index(), bytes, path = %path.display(), progress = %progress, "Segment staged");

            if let Some(callback) = &self.on_progress {
                callback(PipelineEvent::SegmentStaged {
                    index: segment.index(),
                    total,
                    bytes,
                    path: path.clone(),
                });
            }

            staged.push(StagedSegment {
                segment: segment.clone(),
                path,
                bytes,
            });
        }

        Ok(staged)
    }
}
