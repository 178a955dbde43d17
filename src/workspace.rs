//! Per-run scratch directory for downloads and rendered segments.

use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use log::{debug, warn};
use tempfile::TempDir;

pub const SCRATCH_PREFIX: &str = "ytrecap-";
/// Directories kept with `keep_scratch` are renamed to this prefix and never swept
pub const KEPT_PREFIX: &str = "ytrecap-kept-";
pub const MEDIA_EXTENSION: &str = "mp4";

/// Scratch space owned by a single run; removed on drop unless kept
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Sweep leftovers of earlier runs under `root`, then create a fresh scratch dir
    pub fn create(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root).wrap_err_with(|| format!("cannot create scratch root {}", root.display()))?;
        sweep_stale(root);

        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)
            .wrap_err("cannot create scratch directory")?;
        debug!("Scratch directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Deterministic download target for a video
    pub fn download_path(&self, video_id: &str) -> PathBuf {
        self.path().join(format!("temp_video_{video_id}.{MEDIA_EXTENSION}"))
    }

    /// Keep the directory on disk, out of reach of later sweeps, and return its path
    pub fn keep(self) -> PathBuf {
        let path = self.dir.keep();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            return path;
        };
        let suffix = name.strip_prefix(SCRATCH_PREFIX).unwrap_or(&name);
        let kept = path.with_file_name(format!("{KEPT_PREFIX}{suffix}"));
        match std::fs::rename(&path, &kept) {
            Ok(()) => kept,
            Err(e) => {
                warn!("Could not rename kept scratch directory {}: {e}", path.display());
                path
            }
        }
    }
}

/// Segment file name for a source: the source's base name with a `segment_` prefix
pub fn segment_path_for(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("clip.{MEDIA_EXTENSION}"));
    source.with_file_name(format!("segment_{name}"))
}

/// Remove scratch directories left behind by earlier runs, sparing kept ones.
/// Returns how many were removed.
pub fn sweep_stale(root: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        let is_stale = name.starts_with(SCRATCH_PREFIX) && !name.starts_with(KEPT_PREFIX);
        if !is_stale || !path.is_dir() {
            continue;
        }
        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                debug!("Removed stale scratch directory {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Could not remove stale scratch directory {}: {e}", path.display()),
        }
    }
    removed
}

/// Delete a file, ignoring one that is already gone
pub fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {e}", path.display()),
    }
}
