use std::path::Path;
use std::process::{Command, Output, Stdio};

use eyre::{Result, bail};
use log::debug;
use serde::Deserialize;

use crate::media::RemoteInfo;

/// Options passed to every yt-dlp invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub format: String,
    pub retries: u32,
    pub socket_timeout: u32,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            format: "mp4".to_string(),
            retries: 3,
            socket_timeout: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InfoJson {
    title: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    duration: Option<f64>,
}

fn common_args(opts: &DownloadOptions) -> Vec<String> {
    vec![
        "--format".to_string(),
        opts.format.clone(),
        "--no-playlist".to_string(),
        "--quiet".to_string(),
        "--no-warnings".to_string(),
        "--retries".to_string(),
        opts.retries.to_string(),
        "--socket-timeout".to_string(),
        opts.socket_timeout.to_string(),
    ]
}

pub fn probe_args(url: &str, opts: &DownloadOptions) -> Vec<String> {
    let mut args = common_args(opts);
    args.push("--dump-single-json".to_string());
    args.push("--skip-download".to_string());
    args.push(url.to_string());
    args
}

pub fn download_args(url: &str, dest: &Path, opts: &DownloadOptions) -> Vec<String> {
    let mut args = common_args(opts);
    args.push("--force-overwrites".to_string());
    args.push("--output".to_string());
    args.push(dest.to_string_lossy().to_string());
    args.push(url.to_string());
    args
}

fn run(bin: &str, args: &[String]) -> Result<Output> {
    debug!("Running {bin} {}", args.join(" "));
    let output = Command::new(bin)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    match output {
        Ok(o) if o.status.success() => Ok(o),
        Ok(o) => {
            let stderr = String::from_utf8_lossy(&o.stderr);
            let reason = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
            bail!("{bin} exited with status {}: {reason}", o.status)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            bail!(
                "{bin} not found. Install it to download videos:\n  \
                 pip install yt-dlp\n  \
                 or: brew install yt-dlp"
            );
        }
        Err(e) => bail!("failed to run {bin}: {e}"),
    }
}

/// Fetch metadata for a video without downloading it
pub fn probe(bin: &str, url: &str, opts: &DownloadOptions) -> Result<RemoteInfo> {
    let output = run(bin, &probe_args(url, opts))?;
    parse_info(&output.stdout)
}

/// Download a video to exactly `dest`
pub fn download(bin: &str, url: &str, dest: &Path, opts: &DownloadOptions) -> Result<()> {
    run(bin, &download_args(url, dest, opts))?;

    if !dest.exists() {
        bail!("{bin} did not produce expected output file: {}", dest.display());
    }
    Ok(())
}

fn parse_info(json: &[u8]) -> Result<RemoteInfo> {
    let info: InfoJson = serde_json::from_slice(json)?;
    Ok(RemoteInfo {
        title: info.title,
        filesize: info.filesize.or(info.filesize_approx),
        duration: info.duration,
    })
}
