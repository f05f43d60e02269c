use std::path::{Path, PathBuf};

use reqwest::StatusCode;

/// Failures of a single `GET(url)` call.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Server returned status code {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures of the external concat step.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {}: {stderr}", describe_code(.code))]
    ExitStatus {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Muxing cancelled")]
    Cancelled,
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        // terminated by a signal
        None => "none".to_string(),
    }
}

/// Top-level error for a segmux run.
#[derive(Debug, thiserror::Error)]
pub enum SegmuxError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to fetch playlist: {0}")]
    Playlist(#[source] FetchError),

    #[error("Failed to fetch segment #{index} ({url}): {source}")]
    Segment {
        index: usize,
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Assembly failed: {0}")]
    Mux(#[from] MuxError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl SegmuxError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        SegmuxError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether this error was caused by a cancellation request rather than a fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SegmuxError::Cancelled | SegmuxError::Mux(MuxError::Cancelled)
        )
    }
}
