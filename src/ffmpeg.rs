//! ffprobe/ffmpeg invocations: probing, clip rendering and concatenation.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use eyre::{Result, WrapErr, bail, eyre};
use log::debug;
use serde::Deserialize;

use crate::config::Canvas;
use crate::media::{ClipWindow, MediaInfo};

const VIDEO_CODEC: &str = "libx264";
const AUDIO_CODEC: &str = "aac";
const AUDIO_RATE: &str = "44100";

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Probe a local file for duration, dimensions and audio presence
pub fn probe(bin: &str, path: &Path) -> Result<MediaInfo> {
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }

    let output = Command::new(bin)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => eyre!("{bin} not found. Install ffmpeg to cut and merge clips"),
            _ => eyre!("failed to run {bin}: {e}"),
        })?;

    if !output.status.success() {
        bail!("{bin} could not read {}", path.display());
    }

    parse_probe(&output.stdout).wrap_err_with(|| format!("unreadable media: {}", path.display()))
}

fn parse_probe(json: &[u8]) -> Result<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| eyre!("no video stream found"))?;
    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    // Container duration first; some muxers only report it per stream
    let duration = probe
        .format
        .duration
        .as_deref()
        .or(video.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .ok_or_else(|| eyre!("no duration reported"))?;

    Ok(MediaInfo {
        duration,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        has_audio,
    })
}

fn filter_args(canvas: Canvas) -> Vec<String> {
    let Canvas { width, height, fps } = canvas;
    vec![
        "-vf".to_string(),
        format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps}"
        ),
    ]
}

fn codec_args() -> Vec<String> {
    vec![
        "-c:v".to_string(),
        VIDEO_CODEC.to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        AUDIO_CODEC.to_string(),
        "-ar".to_string(),
        AUDIO_RATE.to_string(),
        "-ac".to_string(),
        "2".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ]
}

/// Arguments that cut `window` out of `src` and encode it onto the canvas.
/// Sources without audio get a silent track so every clip has the same streams.
pub fn clip_args(src: &Path, dest: &Path, window: ClipWindow, info: &MediaInfo, canvas: Canvas) -> Vec<String> {
    let start = format!("{:.3}", window.start);
    let duration = format!("{:.3}", window.duration);

    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-ss".into(),
        start,
        "-t".into(),
        duration.clone(),
        "-i".into(),
        src.to_string_lossy().to_string(),
    ];

    if info.has_audio {
        args.extend(["-map".into(), "0:v:0".into(), "-map".into(), "0:a:0".into()]);
    } else {
        args.extend([
            "-f".into(),
            "lavfi".into(),
            "-t".into(),
            duration.clone(),
            "-i".into(),
            format!("anullsrc=channel_layout=stereo:sample_rate={AUDIO_RATE}"),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
        ]);
    }

    args.extend(filter_args(canvas));
    args.extend(codec_args());
    args.extend(["-t".into(), duration, dest.to_string_lossy().to_string()]);
    args
}

/// Build the contents of an ffmpeg concat manifest, one `file '<path>'` per line
pub fn concat_manifest(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| {
            let path = std::path::absolute(p).unwrap_or_else(|_| p.clone());
            format!("file '{}'", path.to_string_lossy().replace('\'', r"'\''"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn concat_args(manifest: &Path, dest: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        manifest.to_string_lossy().to_string(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "0:a:0".into(),
    ];
    // Clips are already on a shared canvas; only the codecs are re-applied
    args.extend(codec_args());
    args.push(dest.to_string_lossy().to_string());
    args
}

/// Concatenate `inputs` in order into `dest` through the concat demuxer
pub fn concat(bin: &str, inputs: &[PathBuf], dest: &Path) -> Result<()> {
    if inputs.is_empty() {
        bail!("no clips to concatenate");
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let manifest = dest.with_extension("concat.txt");
    std::fs::write(&manifest, concat_manifest(inputs))?;
    debug!("Concat manifest written ({} clips): {}", inputs.len(), manifest.display());

    let result = run(bin, &concat_args(&manifest, dest));
    let _ = std::fs::remove_file(&manifest);
    result
}

/// Run ffmpeg with `args`, surfacing the last stderr line on failure
pub fn run(bin: &str, args: &[String]) -> Result<()> {
    debug!("Running {bin} {}", args.join(" "));
    let output = Command::new(bin)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output();

    match output {
        Ok(o) if o.status.success() => Ok(()),
        Ok(o) => {
            let stderr = String::from_utf8_lossy(&o.stderr);
            let reason = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
            bail!("{bin} exited with status {}: {reason}", o.status)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            bail!("{bin} not found. Install ffmpeg to cut and merge clips")
        }
        Err(e) => bail!("failed to run {bin}: {e}"),
    }
}
