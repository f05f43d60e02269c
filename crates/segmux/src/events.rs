use std::{fmt::Display, path::PathBuf, sync::Arc};

/// Observable milestones of a run. Purely informational, never part of the
/// data contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    PlaylistFetched {
        url: String,
        bytes: usize,
    },
    SegmentsParsed {
        total: usize,
    },
    /// Emitted once per segment, in playlist order.
    SegmentStaged {
        index: usize,
        total: usize,
        bytes: u64,
        path: PathBuf,
    },
    Assembling {
        manifest: PathBuf,
        output: PathBuf,
    },
    Assembled {
        output: PathBuf,
    },
    CleanedUp {
        removed: usize,
    },
}

/// A callback function for progress updates.
pub type OnProgress = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Completed units out of a known total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageProgress {
    pub current: usize,
    pub total: usize,
}

impl StageProgress {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.current as f64 * 100.0 / self.total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }
}

impl Display for StageProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} ({:.0}%)",
            self.current,
            self.total,
            self.percentage()
        )
    }
}
