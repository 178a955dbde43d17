//! Seam between the recap policy and the external media tools.
//!
//! Everything that touches the network backend or the decoder goes through
//! [`MediaTools`]; [`Toolchain`] is the real implementation backed by
//! `yt-dlp`, `ffprobe` and `ffmpeg`.

use std::path::{Path, PathBuf};

use eyre::Result;
use serde::Serialize;

use crate::config::Canvas;
use crate::{ffmpeg, ytdlp};

/// Metadata reported by the download backend without downloading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteInfo {
    pub title: Option<String>,
    /// Size in bytes, exact or approximate, when the backend knows it
    pub filesize: Option<u64>,
    pub duration: Option<f64>,
}

/// Properties of a local media file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

/// A span of a source video, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    pub start: f64,
    pub duration: f64,
}

pub trait MediaTools {
    /// Ask the backend about a video without downloading it
    fn probe_remote(&self, url: &str) -> Result<RemoteInfo>;

    /// Download the full video to `dest`
    fn download(&self, url: &str, dest: &Path) -> Result<()>;

    /// Inspect a local file
    fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// Render `window` of `src` into `dest` on the shared codec target
    fn render_clip(&self, src: &Path, dest: &Path, window: ClipWindow, info: &MediaInfo) -> Result<()>;

    /// Append `inputs` in order into `dest`, overwriting it
    fn concat(&self, inputs: &[PathBuf], dest: &Path) -> Result<()>;
}

impl<T: MediaTools + ?Sized> MediaTools for &T {
    fn probe_remote(&self, url: &str) -> Result<RemoteInfo> {
        (**self).probe_remote(url)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        (**self).download(url, dest)
    }

    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        (**self).probe(path)
    }

    fn render_clip(&self, src: &Path, dest: &Path, window: ClipWindow, info: &MediaInfo) -> Result<()> {
        (**self).render_clip(src, dest, window, info)
    }

    fn concat(&self, inputs: &[PathBuf], dest: &Path) -> Result<()> {
        (**self).concat(inputs, dest)
    }
}

/// External binaries and their options
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub yt_dlp: String,
    pub ffmpeg: String,
    pub ffprobe: String,
    pub download: ytdlp::DownloadOptions,
    pub canvas: Canvas,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            download: ytdlp::DownloadOptions::default(),
            canvas: Canvas::default(),
        }
    }
}

impl MediaTools for Toolchain {
    fn probe_remote(&self, url: &str) -> Result<RemoteInfo> {
        ytdlp::probe(&self.yt_dlp, url, &self.download)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        ytdlp::download(&self.yt_dlp, url, dest, &self.download)
    }

    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        ffmpeg::probe(&self.ffprobe, path)
    }

    fn render_clip(&self, src: &Path, dest: &Path, window: ClipWindow, info: &MediaInfo) -> Result<()> {
        let args = ffmpeg::clip_args(src, dest, window, info, self.canvas);
        ffmpeg::run(&self.ffmpeg, &args)
    }

    fn concat(&self, inputs: &[PathBuf], dest: &Path) -> Result<()> {
        ffmpeg::concat(&self.ffmpeg, inputs, dest)
    }
}
