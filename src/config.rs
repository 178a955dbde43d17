use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

/// Default clip length in seconds
pub const DEFAULT_CLIP_SECONDS: f64 = 5.0;
/// Videos reported larger than this are skipped
pub const DEFAULT_MAX_BYTES: u64 = 500_000_000;
pub const DEFAULT_OUTPUT: &str = "final_output_video.mp4";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub clip_seconds: Option<f64>,
    pub max_bytes: Option<u64>,
    pub allow_portrait: Option<bool>,
    pub output: Option<PathBuf>,
    pub scratch_root: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub yt_dlp: Option<String>,
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
    pub retries: Option<u32>,
    pub socket_timeout: Option<u32>,
    pub subtitles: Option<bool>,
    pub caption_lang: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytrecap/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytrecap")
        .join("config.toml")
}

/// Canvas every segment is rendered onto so the recap can be concatenated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
        }
    }
}

/// Resolved settings for one pipeline run
#[derive(Debug, Clone)]
pub struct Settings {
    pub clip_seconds: f64,
    pub max_bytes: u64,
    pub allow_portrait: bool,
    pub output: PathBuf,
    pub scratch_root: PathBuf,
    pub keep_scratch: bool,
    pub canvas: Canvas,
    pub subtitles: bool,
    pub caption_lang: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clip_seconds: DEFAULT_CLIP_SECONDS,
            max_bytes: DEFAULT_MAX_BYTES,
            allow_portrait: false,
            output: PathBuf::from(DEFAULT_OUTPUT),
            scratch_root: std::env::temp_dir(),
            keep_scratch: false,
            canvas: Canvas::default(),
            subtitles: false,
            caption_lang: "en".to_string(),
        }
    }
}

impl Settings {
    /// Fill in settings from the config file, falling back to defaults
    pub fn from_config(config: &Config) -> Self {
        let defaults = Settings::default();
        let canvas = Canvas {
            width: config.width.unwrap_or(defaults.canvas.width),
            height: config.height.unwrap_or(defaults.canvas.height),
            fps: config.fps.unwrap_or(defaults.canvas.fps),
        };
        Self {
            clip_seconds: config.clip_seconds.unwrap_or(defaults.clip_seconds),
            max_bytes: config.max_bytes.unwrap_or(defaults.max_bytes),
            allow_portrait: config.allow_portrait.unwrap_or(defaults.allow_portrait),
            output: config.output.clone().unwrap_or(defaults.output),
            scratch_root: config.scratch_root.clone().unwrap_or(defaults.scratch_root),
            keep_scratch: defaults.keep_scratch,
            canvas,
            subtitles: config.subtitles.unwrap_or(defaults.subtitles),
            caption_lang: config.caption_lang.clone().unwrap_or(defaults.caption_lang),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
api_key = "AIzaTest"
clip_seconds = 3.5
max_bytes = 1000
allow_portrait = true
output = "recap.mp4"
width = 640
height = 360
yt_dlp = "/opt/bin/yt-dlp"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("AIzaTest"));
        assert_eq!(config.clip_seconds, Some(3.5));
        assert_eq!(config.max_bytes, Some(1000));
        assert_eq!(config.allow_portrait, Some(true));
        assert_eq!(config.output, Some(PathBuf::from("recap.mp4")));
        assert_eq!(config.yt_dlp.as_deref(), Some("/opt/bin/yt-dlp"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.api_key.is_none());
        assert!(config.clip_seconds.is_none());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_config(&Config::default());
        assert_eq!(settings.clip_seconds, 5.0);
        assert_eq!(settings.max_bytes, 500_000_000);
        assert!(!settings.allow_portrait);
        assert_eq!(settings.output, PathBuf::from("final_output_video.mp4"));
        assert_eq!(settings.canvas, Canvas { width: 1280, height: 720, fps: 30 });
        assert_eq!(settings.caption_lang, "en");
    }

    #[test]
    fn test_settings_partial_config() {
        let config: Config = toml::from_str("fps = 25\nsubtitles = true").unwrap();
        let settings = Settings::from_config(&config);
        assert_eq!(settings.canvas.fps, 25);
        assert_eq!(settings.canvas.width, 1280);
        assert!(settings.subtitles);
    }
}
