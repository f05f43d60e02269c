// Playlist parsing: locates record segment paths inside raw playlist text.
//
// Only one playlist dialect is understood. No `#EXT` directive is interpreted;
// the order in which paths appear in the text is the playback order.

use regex::Regex;
use tracing::debug;

use crate::error::SegmuxError;
use crate::resolver::origin_of;

/// `/records/<digits>/<name>.ts`, stopping at whitespace, quotes or angle brackets
pub const DEFAULT_SEGMENT_PATTERN: &str = r#"/records/\d+/[^\s"'<>]+?\.ts\b"#;

/// A fetched playlist and the origin its segment paths are relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSource {
    origin: String,
    raw_text: String,
}

impl PlaylistSource {
    pub fn new(origin: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            raw_text: raw_text.into(),
        }
    }

    /// Derives the origin (scheme + host + non-default port) from the playlist URL.
    pub fn from_url(playlist_url: &str, raw_text: impl Into<String>) -> Result<Self, SegmuxError> {
        Ok(Self::new(origin_of(playlist_url)?, raw_text))
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }
}

/// A segment path and its position in the playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReference {
    pub index: usize,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// At least one segment, in textual order
    Segments(Vec<SegmentReference>),
    /// Well-formed text without any segment path
    NoSegments,
}

impl ParseOutcome {
    pub fn len(&self) -> usize {
        match self {
            ParseOutcome::Segments(segments) => segments.len(),
            ParseOutcome::NoSegments => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct PlaylistParser {
    pattern: Regex,
}

impl PlaylistParser {
    pub fn new(pattern: &str) -> Result<Self, SegmuxError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| SegmuxError::Config(format!("Invalid segment pattern: {e}")))?;
        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Every non-overlapping match, left to right. Duplicates are kept.
    pub fn parse(&self, raw_text: &str) -> ParseOutcome {
        let segments: Vec<SegmentReference> = self
            .pattern
            .find_iter(raw_text)
            .map(|m| m.as_str())
            .filter(|path| !path.is_empty())
            .enumerate()
            .map(|(index, path)| SegmentReference {
                index,
                path: path.to_string(),
            })
            .collect();

        debug!(matches = segments.len(), "Parsed playlist");

        if segments.is_empty() {
            ParseOutcome::NoSegments
        } else {
            ParseOutcome::Segments(segments)
        }
    }
}
