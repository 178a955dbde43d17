use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::media::MediaTools;
use crate::workspace::remove_quietly;
use crate::{SkipReason, watch_url};

/// Downloads one video, refusing ones that are too big or portrait
pub struct VideoFetcher<'a, M> {
    tools: &'a M,
    max_bytes: u64,
    allow_portrait: bool,
}

impl<'a, M: MediaTools> VideoFetcher<'a, M> {
    pub fn new(tools: &'a M, max_bytes: u64, allow_portrait: bool) -> Self {
        Self {
            tools,
            max_bytes,
            allow_portrait,
        }
    }

    /// Download `video_id` to `dest`. No file is left at `dest` when the video is rejected.
    pub fn fetch(&self, video_id: &str, dest: &Path) -> Result<PathBuf, SkipReason> {
        let url = watch_url(video_id);

        let remote = self.tools.probe_remote(&url).map_err(|e| SkipReason::DownloadFailed {
            message: format!("{e:#}"),
        })?;

        if let Some(bytes) = remote.filesize.filter(|&b| b > self.max_bytes) {
            info!("Skipping {video_id}: {bytes} bytes exceeds {}", self.max_bytes);
            return Err(SkipReason::TooLarge { bytes });
        }

        debug!(
            "Downloading {video_id} ({}) to {}",
            remote.title.as_deref().unwrap_or("untitled"),
            dest.display()
        );
        if let Err(e) = self.tools.download(&url, dest) {
            remove_quietly(dest);
            return Err(SkipReason::DownloadFailed {
                message: format!("{e:#}"),
            });
        }

        if !self.allow_portrait {
            match self.tools.probe(dest) {
                Ok(media) if media.is_portrait() => {
                    info!("Skipping {video_id}: portrait {}x{}", media.width, media.height);
                    remove_quietly(dest);
                    return Err(SkipReason::WrongAspectRatio {
                        width: media.width,
                        height: media.height,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    remove_quietly(dest);
                    return Err(SkipReason::DownloadFailed {
                        message: format!("downloaded file is unreadable: {e:#}"),
                    });
                }
            }
        }

        Ok(dest.to_path_buf())
    }
}
