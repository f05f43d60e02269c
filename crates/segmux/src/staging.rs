// Staging area: one file per segment, exclusive to a single run.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::SegmuxError;
use crate::resolver::ResolvedSegment;

#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn prepare(&self) -> Result<(), SegmuxError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SegmuxError::io(&self.dir, e))
    }

    /// Staging path of every segment, index-aligned with `segments`.
    ///
    /// Files are named after the last component of the segment path. A name
    /// already used by a different URL, renamed ones included, gets the
    /// playlist index as a prefix (plus a counter if that is taken as well).
    /// Repeated URLs share one file.
    pub fn assign_paths(&self, segments: &[ResolvedSegment]) -> Vec<PathBuf> {
        let mut by_url: HashMap<&str, PathBuf> = HashMap::with_capacity(segments.len());
        let mut taken: HashSet<String> = HashSet::with_capacity(segments.len());

        segments
            .iter()
            .map(|segment| {
                if let Some(path) = by_url.get(segment.url.as_str()) {
                    return path.clone();
                }

                let name = segment.file_name();
                let mut candidate = name.to_string();
                let mut attempt = 0usize;
                while taken.contains(&candidate) {
                    candidate = match attempt {
                        0 => format!("{:05}_{name}", segment.index()),
                        n => format!("{:05}_{n}_{name}", segment.index()),
                    };
                    attempt += 1;
                }
                if attempt > 0 {
                    debug!(index = segment.index(), name, renamed = %candidate, "Staging name collision");
                }

                let path = self.dir.join(&candidate);
                taken.insert(candidate);
                by_url.insert(segment.url.as_str(), path.clone());
                path
            })
            .collect()
    }

    pub async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), SegmuxError> {
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| SegmuxError::io(path, e))
    }

    /// Removes the given files (and the manifest, if any), then the staging
    /// directory once it is empty. Files that are already gone are skipped, so
    /// calling this twice is harmless. Returns how many files were removed.
    pub async fn cleanup(
        &self,
        files: &[PathBuf],
        manifest: Option<&Path>,
    ) -> Result<usize, SegmuxError> {
        let mut removed = 0;
        for path in files.iter().map(PathBuf::as_path).chain(manifest) {
            if remove_if_exists(path).await? {
                removed += 1;
            }
        }

        match tokio::fs::remove_dir(&self.dir).await {
            Ok(()) => debug!(dir = %self.dir.display(), "Removed staging directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            // other runs or leftovers may still live in there
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "Staging directory kept"),
        }

        Ok(removed)
    }
}

async fn remove_if_exists(path: &Path) -> Result<bool, SegmuxError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(SegmuxError::io(path, e)),
    }
}
