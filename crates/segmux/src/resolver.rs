use url::{Origin, Url};

use crate::error::SegmuxError;
use crate::playlist::SegmentReference;

/// Scheme + host (+ port when not the default) of an http(s) URL.
pub fn origin_of(url: &str) -> Result<String, SegmuxError> {
    let parsed = Url::parse(url)
        .map_err(|e| SegmuxError::InvalidInput(format!("Malformed playlist URL {url}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SegmuxError::InvalidInput(format!(
            "Unsupported URL scheme '{}' in {url}",
            parsed.scheme()
        )));
    }

    match parsed.origin() {
        origin @ Origin::Tuple(..) => Ok(origin.ascii_serialization()),
        Origin::Opaque(_) => Err(SegmuxError::InvalidInput(format!(
            "Playlist URL {url} has no origin"
        ))),
    }
}

/// Plain concatenation; neither side is normalized or re-encoded.
#[inline]
pub fn resolve(origin: &str, relative_path: &str) -> String {
    let mut url = String::with_capacity(origin.len() + relative_path.len());
    url.push_str(origin);
    url.push_str(relative_path);
    url
}

/// A segment reference paired with its absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSegment {
    pub reference: SegmentReference,
    pub url: String,
}

impl ResolvedSegment {
    pub fn new(origin: &str, reference: SegmentReference) -> Self {
        let url = resolve(origin, &reference.path);
        Self { reference, url }
    }

    pub fn index(&self) -> usize {
        self.reference.index
    }

    /// Last path component of the segment path, e.g. `seg0.ts`.
    pub fn file_name(&self) -> &str {
        self.reference
            .path
            .rsplit('/')
            .next()
            .unwrap_or(&self.reference.path)
    }
}

/// Resolves every reference, keeping the input order.
pub fn resolve_all(origin: &str, references: Vec<SegmentReference>) -> Vec<ResolvedSegment> {
    references
        .into_iter()
        .map(|reference| ResolvedSegment::new(origin, reference))
        .collect()
}
