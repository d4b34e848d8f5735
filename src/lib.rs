pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod render;
pub mod select;
pub mod server;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{ExtractError, Result};

/// Canonical 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Validate a bare token against the id alphabet and length.
    pub fn new(token: &str) -> Option<Self> {
        static ID_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").unwrap());
        ID_RE.is_match(token).then(|| VideoId(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a caption track was authored by a human or machine-generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Manual,
    Generated,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Manual => write!(f, "manual"),
            TrackKind::Generated => write!(f, "generated"),
        }
    }
}

/// One selectable caption stream from the track catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub language_name: String,
    pub kind: TrackKind,
    pub base_url: String,
}

/// The full caption listing for one video, in upstream order.
///
/// `default_index` points at the track the catalog marks as the video's
/// default/original-language track, when the upstream says so.
#[derive(Debug, Clone, Default)]
pub struct TrackCatalog {
    pub tracks: Vec<CaptionTrack>,
    pub default_index: Option<usize>,
}

/// One timed unit of subtitle text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start_ms: u64,
    pub end_ms: u64,
    pub lines: Vec<String>,
}

impl Cue {
    pub fn new(start_ms: u64, end_ms: u64, lines: Vec<String>) -> Self {
        Cue { start_ms, end_ms, lines }
    }

    /// The cue's display text with in-cue line breaks restored.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Normalized, ordered, non-overlapping cue sequence for one video/track pair.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub video_id: VideoId,
    pub track: CaptionTrack,
    pub cues: Vec<Cue>,
}

/// Response payload for a successful extraction, field names as consumed
/// by the browser client.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub srt: String,
    pub txt: String,
}

/// Resolve a video reference to its canonical id.
///
/// Accepts the watch, short-link, embed, and shorts URL shapes (extra query
/// parameters and surrounding whitespace tolerated) as well as a bare
/// 11-character video id.
pub fn resolve_video_id(input: &str) -> Result<VideoId> {
    static URL_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        [
            r"youtube\.com/watch\?(?:[^#\s]*&)?v=([a-zA-Z0-9_-]{11})",
            r"youtu\.be/([a-zA-Z0-9_-]{11})",
            r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
            r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    });

    let input = input.trim();

    if let Some(id) = VideoId::new(input) {
        return Ok(id);
    }

    for re in URL_RES.iter() {
        if let Some(caps) = re.captures(input) {
            if let Some(id) = VideoId::new(&caps[1]) {
                return Ok(id);
            }
        }
    }

    Err(ExtractError::InvalidReference(input.to_string()))
}
