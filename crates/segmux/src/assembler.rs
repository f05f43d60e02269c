// Assembler: renders the concat manifest and hands it to the muxer.
//
// The muxer is ffmpeg's concat demuxer in stream-copy mode:
//   ffmpeg -f concat -safe 0 -i <manifest> -c copy <output>

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{MuxError, SegmuxError};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Longest stderr excerpt carried in a [`MuxError::ExitStatus`].
const STDERR_TAIL_LEN: usize = 2048;

/// Ordered list of staged files in concat-demuxer syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatManifest {
    entries: Vec<PathBuf>,
}

impl ConcatManifest {
    pub fn new<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `file '<path>'` directive per entry, joined by `\n`.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|path| format!("file '{}'", escape_path(path)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), SegmuxError> {
        tokio::fs::write(path, self.render())
            .await
            .map_err(|e| SegmuxError::io(path, e))
    }
}

/// Quotes inside a concat path close the string, emit an escaped quote and reopen it.
fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

/// The `concat(ordered file list) -> output file` capability.
#[async_trait]
pub trait Muxer: Send + Sync {
    async fn concat(
        &self,
        manifest: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), MuxError>;
}

/// Runs an ffmpeg executable as the muxer.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    program: PathBuf,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegMuxer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Concat mode, unsafe paths allowed, stream copy, overwrite without asking.
    pub fn args(manifest: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner", "-loglevel", "error", "-y", "-f", "concat", "-safe", "0", "-i",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(manifest.as_os_str().to_owned());
        args.extend(["-c", "copy"].into_iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }

    fn command(&self) -> Command {
        #[cfg_attr(not(windows), allow(unused_mut))]
        let mut command = Command::new(&self.program);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);
        command
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn concat(
        &self,
        manifest: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), MuxError> {
        let program = self.program.display().to_string();
        let args = Self::args(manifest, output);
        debug!(program = %program, ?args, "Spawning muxer");

        let child = self
            .command()
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MuxError::Spawn {
                program: program.clone(),
                source,
            })?;

        // dropping the child on cancellation kills it
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MuxError::Cancelled),
            result = child.wait_with_output() => result,
        };
        let finished = result.map_err(|source| MuxError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            let stderr = stderr.trim();
            let tail_start = stderr
                .char_indices()
                .rev()
                .nth(STDERR_TAIL_LEN.saturating_sub(1))
                .map_or(0, |(i, _)| i);
            return Err(MuxError::ExitStatus {
                program,
                code: finished.status.code(),
                stderr: stderr[tail_start..].to_string(),
            });
        }

        Ok(())
    }
}

/// Writes the manifest for a set of staged files and runs the muxer on it.
pub struct Assembler {
    muxer: Arc<dyn Muxer>,
    manifest_path: PathBuf,
}

impl Assembler {
    pub fn new(muxer: Arc<dyn Muxer>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            muxer,
            manifest_path: manifest_path.into(),
        }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// The concat demuxer resolves relative entries against the manifest's own
    /// directory. Entries stay as given when the manifest sits in the working
    /// directory and are made absolute otherwise.
    fn manifest_for(&self, staged: &[PathBuf]) -> Result<ConcatManifest, SegmuxError> {
        let in_working_dir = self
            .manifest_path
            .parent()
            .is_none_or(|parent| parent.as_os_str().is_empty());
        if in_working_dir {
            return Ok(ConcatManifest::new(staged.iter().cloned()));
        }

        let entries = staged
            .iter()
            .map(|path| std::path::absolute(path).map_err(|e| SegmuxError::io(path, e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ConcatManifest::new(entries))
    }

    /// Renders and writes the manifest, then muxes `staged` into `output`.
    /// The output's parent directory is created if missing.
    pub async fn assemble(
        &self,
        staged: &[PathBuf],
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<ConcatManifest, SegmuxError> {
        if staged.is_empty() {
            return Err(SegmuxError::InvalidInput(
                "Nothing to assemble: no staged segments".to_string(),
            ));
        }

        let manifest = self.manifest_for(staged)?;
        manifest.write_to(&self.manifest_path).await?;
        debug!(manifest = %self.manifest_path.display(), entries = manifest.len(), "Manifest written");

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SegmuxError::io(parent, e))?;
        }

        info!(output = %output.display(), segments = manifest.len(), "Combining segments");
        self.muxer
            .concat(&self.manifest_path, output, cancel)
            .await?;

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeMuxer;
    use tempfile::TempDir;

    #[test]
    fn test_render_three_lines_in_order() {
        let manifest = ConcatManifest::new(["a", "b", "c"]);
        let rendered = manifest.render();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines, vec!["file 'a'", "file 'b'", "file 'c'"]);
        assert!(!rendered.ends_with('\n'));
    }

    #[test]
    fn test_render_staging_paths() {
        let manifest = ConcatManifest::new([
            PathBuf::from(".segments").join("seg0.ts"),
            PathBuf::from(".segments").join("seg1.ts"),
        ]);
        let expected = format!(
            "file '{}'\nfile '{}'",
            PathBuf::from(".segments").join("seg0.ts").display(),
            PathBuf::from(".segments").join("seg1.ts").display()
        );
        assert_eq!(manifest.render(), expected);
    }

    #[test]
    fn test_render_escapes_quotes() {
        let manifest = ConcatManifest::new(["it's.ts"]);
        assert_eq!(manifest.render(), r"file 'it'\''s.ts'");
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = FfmpegMuxer::args(Path::new("concat.txt"), Path::new("outputs/myclip.mp4"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "-hide_banner",
                "-loglevel",
                "error",
                "-y",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                "concat.txt",
                "-c",
                "copy",
                "outputs/myclip.mp4",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_spawn_error() {
        let temp = TempDir::new().unwrap();
        let muxer = FfmpegMuxer::new(temp.path().join("no-such-ffmpeg"));
        let err = muxer
            .concat(
                &temp.path().join("concat.txt"),
                &temp.path().join("out.mp4"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MuxError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_assemble_writes_manifest_and_creates_output_dir() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.ts");
        let b = temp.path().join("b.ts");
        std::fs::write(&a, b"AA").unwrap();
        std::fs::write(&b, b"BB").unwrap();

        let muxer = Arc::new(FakeMuxer::new());
        let assembler = Assembler::new(muxer.clone(), temp.path().join("concat.txt"));
        let output = temp.path().join("outputs").join("clip.mp4");

        let manifest = assembler
            .assemble(&[a.clone(), b.clone()], &output, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(manifest.entries(), &[a, b]);
        assert_eq!(std::fs::read(&output).unwrap(), b"AABB");
        assert_eq!(
            std::fs::read_to_string(temp.path().join("concat.txt")).unwrap(),
            manifest.render()
        );
        assert_eq!(muxer.manifests().len(), 1);
    }

    #[tokio::test]
    async fn test_assemble_surfaces_mux_failure() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.ts");
        std::fs::write(&a, b"AA").unwrap();

        let assembler = Assembler::new(
            Arc::new(FakeMuxer::failing()),
            temp.path().join("concat.txt"),
        );
        let err = assembler
            .assemble(&[a], &temp.path().join("out.mp4"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SegmuxError::Mux(MuxError::ExitStatus { .. })));
    }

    #[tokio::test]
    async fn test_assemble_rejects_empty_input() {
        let temp = TempDir::new().unwrap();
        let assembler = Assembler::new(Arc::new(FakeMuxer::new()), temp.path().join("concat.txt"));
        let err = assembler
            .assemble(&[], &temp.path().join("out.mp4"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SegmuxError::InvalidInput(_)));
        assert!(!temp.path().join("concat.txt").exists());
    }
}
