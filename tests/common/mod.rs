#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use eyre::{Result, bail, eyre};
use ytrecap::SourceRef;
use ytrecap::captions::CaptionLine;
use ytrecap::config::Settings;
use ytrecap::media::{ClipWindow, MediaInfo, MediaTools, RemoteInfo};
use ytrecap::youtube::VideoCatalog;

/// How a fake video behaves at each step
#[derive(Debug, Clone)]
pub struct FakeVideo {
    pub filesize: Option<u64>,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
    pub probe_error: Option<String>,
    pub download_error: Option<String>,
    pub corrupt_download: bool,
    pub render_error: bool,
}

impl FakeVideo {
    pub fn landscape(duration: f64) -> Self {
        Self {
            filesize: Some(50_000_000),
            duration,
            width: 1920,
            height: 1080,
            has_audio: true,
            probe_error: None,
            download_error: None,
            corrupt_download: false,
            render_error: false,
        }
    }

    pub fn portrait(duration: f64) -> Self {
        Self {
            width: 1080,
            height: 1920,
            ..Self::landscape(duration)
        }
    }

    pub fn size(mut self, bytes: Option<u64>) -> Self {
        self.filesize = bytes;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.download_error = Some("ERROR: Video unavailable".to_string());
        self
    }

    pub fn region_locked(mut self) -> Self {
        self.probe_error = Some("ERROR: not available in your country".to_string());
        self
    }

    pub fn corrupt(mut self) -> Self {
        self.corrupt_download = true;
        self
    }

    pub fn failing_render(mut self) -> Self {
        self.render_error = true;
        self
    }

    pub fn silent(mut self) -> Self {
        self.has_audio = false;
        self
    }
}

/// `MediaTools` that writes small text files describing the media instead of real video
#[derive(Default)]
pub struct FakeTools {
    pub videos: HashMap<String, FakeVideo>,
    pub fail_concat: bool,
    /// `concat` fails before writing anything, like a missing ffmpeg binary
    pub concat_unavailable: bool,
    pub windows: Mutex<Vec<(String, ClipWindow)>>,
    pub downloads: Mutex<Vec<PathBuf>>,
    pub concatenated: Mutex<Vec<PathBuf>>,
}

impl FakeTools {
    pub fn with(videos: &[(&str, FakeVideo)]) -> Self {
        Self {
            videos: videos.iter().map(|(id, v)| (id.to_string(), v.clone())).collect(),
            ..Default::default()
        }
    }

    fn video_for_url(&self, url: &str) -> Result<(&str, &FakeVideo)> {
        let id = url
            .rsplit_once("v=")
            .map(|(_, id)| id)
            .ok_or_else(|| eyre!("bad url {url}"))?;
        let (id, video) = self
            .videos
            .get_key_value(id)
            .ok_or_else(|| eyre!("ERROR: unknown video {id}"))?;
        Ok((id.as_str(), video))
    }

    pub fn windows(&self) -> Vec<(String, ClipWindow)> {
        self.windows.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<PathBuf> {
        self.downloads.lock().unwrap().clone()
    }
}

pub fn describe(info: &MediaInfo, tag: &str) -> String {
    format!(
        "duration={};width={};height={};audio={};tag={tag}",
        info.duration, info.width, info.height, info.has_audio as u8
    )
}

/// Write a fake media file
pub fn write_media(path: &Path, duration: f64) {
    let info = MediaInfo {
        duration,
        width: 1280,
        height: 720,
        has_audio: true,
    };
    std::fs::write(path, describe(&info, "")).unwrap();
}

fn parse_media(content: &str) -> Result<(MediaInfo, String)> {
    let fields: HashMap<&str, &str> = content.split(';').filter_map(|kv| kv.split_once('=')).collect();
    let get = |k: &str| fields.get(k).copied().ok_or_else(|| eyre!("invalid data found when processing input"));
    let info = MediaInfo {
        duration: get("duration")?.parse()?,
        width: get("width")?.parse()?,
        height: get("height")?.parse()?,
        has_audio: get("audio")? == "1",
    };
    Ok((info, get("tag")?.to_string()))
}

impl MediaTools for FakeTools {
    fn probe_remote(&self, url: &str) -> Result<RemoteInfo> {
        let (_, video) = self.video_for_url(url)?;
        if let Some(ref e) = video.probe_error {
            bail!("{e}");
        }
        Ok(RemoteInfo {
            title: Some("fake".to_string()),
            filesize: video.filesize,
            duration: Some(video.duration),
        })
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let (id, video) = self.video_for_url(url)?;
        if let Some(ref e) = video.download_error {
            bail!("{e}");
        }
        self.downloads.lock().unwrap().push(dest.to_path_buf());
        if video.corrupt_download {
            std::fs::write(dest, "moov atom not found")?;
            return Ok(());
        }
        let info = MediaInfo {
            duration: video.duration,
            width: video.width,
            height: video.height,
            has_audio: video.has_audio,
        };
        std::fs::write(dest, describe(&info, id))?;
        Ok(())
    }

    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let content = std::fs::read_to_string(path)?;
        Ok(parse_media(&content)?.0)
    }

    fn render_clip(&self, src: &Path, dest: &Path, window: ClipWindow, _info: &MediaInfo) -> Result<()> {
        let (_, id) = parse_media(&std::fs::read_to_string(src)?)?;
        if self.videos.get(&id).is_some_and(|v| v.render_error) {
            // Leave a partial file behind like a crashed encoder would
            std::fs::write(dest, "partial")?;
            bail!("Error while encoding");
        }
        self.windows.lock().unwrap().push((id.clone(), window));
        let info = MediaInfo {
            duration: window.duration,
            width: 1280,
            height: 720,
            has_audio: true,
        };
        std::fs::write(dest, describe(&info, &id))?;
        Ok(())
    }

    fn concat(&self, inputs: &[PathBuf], dest: &Path) -> Result<()> {
        if self.concat_unavailable {
            bail!("ffmpeg not found. Install ffmpeg to cut and merge clips");
        }
        if self.fail_concat {
            std::fs::write(dest, "partial")?;
            bail!("Conversion failed!");
        }
        let mut total = 0.0;
        let mut tags = Vec::new();
        for input in inputs {
            let (info, tag) = parse_media(&std::fs::read_to_string(input)?)?;
            total += info.duration;
            tags.push(tag);
        }
        self.concatenated.lock().unwrap().extend(inputs.iter().cloned());
        let info = MediaInfo {
            duration: total,
            width: 1280,
            height: 720,
            has_audio: true,
        };
        std::fs::write(dest, describe(&info, &tags.join(",")))?;
        Ok(())
    }
}

/// Listing that serves fixed IDs per playlist/channel ID
#[derive(Default)]
pub struct FakeCatalog {
    pub listings: HashMap<String, Vec<String>>,
    pub captions: HashMap<String, Vec<CaptionLine>>,
    pub fail_listing: bool,
    pub calls: Mutex<Vec<SourceRef>>,
}

impl FakeCatalog {
    pub fn with(source_id: &str, ids: &[&str]) -> Self {
        let mut listings = HashMap::new();
        listings.insert(source_id.to_string(), ids.iter().map(|s| s.to_string()).collect());
        Self {
            listings,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<SourceRef> {
        self.calls.lock().unwrap().clone()
    }
}

impl VideoCatalog for FakeCatalog {
    async fn list_videos(&self, source: &SourceRef) -> Result<Vec<String>> {
        self.calls.lock().unwrap().push(source.clone());
        if self.fail_listing {
            bail!("YouTube Data API returned 403 Forbidden: quotaExceeded");
        }
        Ok(self.listings.get(source.id()).cloned().unwrap_or_default())
    }

    async fn fetch_captions(&self, video_id: &str, _lang: &str) -> Option<Vec<CaptionLine>> {
        self.captions.get(video_id).cloned()
    }
}

/// Settings rooted in a temp dir so runs never touch the working directory
pub fn settings_in(root: &Path) -> Settings {
    Settings {
        output: root.join("final_output_video.mp4"),
        scratch_root: root.join("scratch"),
        ..Settings::default()
    }
}

/// Scratch directories still present under the scratch root
pub fn leftover_scratch(settings: &Settings) -> Vec<PathBuf> {
    std::fs::read_dir(&settings.scratch_root)
        .map(|entries| entries.flatten().map(|e| e.path()).collect())
        .unwrap_or_default()
}
