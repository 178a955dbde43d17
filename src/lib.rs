pub mod captions;
pub mod config;
pub mod ffmpeg;
pub mod fetch;
pub mod media;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod retry;
pub mod segment;
pub mod workspace;
pub mod youtube;
pub mod ytdlp;

use std::path::PathBuf;

use serde::Serialize;

/// Where the list of videos comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum SourceRef {
    Playlist(String),
    Channel(String),
}

impl SourceRef {
    pub fn id(&self) -> &str {
        match self {
            SourceRef::Playlist(id) | SourceRef::Channel(id) => id,
        }
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceRef::Playlist(id) => write!(f, "playlist {id}"),
            SourceRef::Channel(id) => write!(f, "channel {id}"),
        }
    }
}

/// Why a video was left out of the recap
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    TooLarge { bytes: u64 },
    WrongAspectRatio { width: u32, height: u32 },
    DownloadFailed { message: String },
    SegmentFailed { message: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TooLarge { bytes } => write!(f, "too large ({bytes} bytes)"),
            SkipReason::WrongAspectRatio { width, height } => {
                write!(f, "wrong aspect ratio ({width}x{height})")
            }
            SkipReason::DownloadFailed { message } => write!(f, "download failed: {message}"),
            SkipReason::SegmentFailed { message } => write!(f, "segment failed: {message}"),
        }
    }
}

/// A skipped video and the reason it was skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkipRecord {
    pub video_id: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// A rendered clip cut from one source video
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub video_id: String,
    pub path: PathBuf,
    /// Offset into the source video, in seconds
    pub start: f64,
    pub duration: f64,
}

/// Canonical watch URL for a video ID
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Extract the playlist ID from a `playlist?list=<ID>` URL
pub fn extract_playlist_id(input: &str) -> Option<String> {
    regex::Regex::new(r"playlist\?list=([A-Za-z0-9_-]+)")
        .unwrap()
        .captures(input.trim())
        .map(|caps| caps[1].to_string())
}

/// Extract the channel ID from a `channel/<ID>` URL
pub fn extract_channel_id(input: &str) -> Option<String> {
    regex::Regex::new(r"channel/([A-Za-z0-9_-]+)")
        .unwrap()
        .captures(input.trim())
        .map(|caps| caps[1].to_string())
}

/// Work out which listing a URL points at. `None` means there is nothing to enumerate.
pub fn parse_source(input: &str) -> Option<SourceRef> {
    if let Some(id) = extract_playlist_id(input) {
        return Some(SourceRef::Playlist(id));
    }
    extract_channel_id(input).map(SourceRef::Channel)
}
