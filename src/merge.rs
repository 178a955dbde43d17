use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use log::{debug, warn};
use serde::Serialize;

use crate::media::MediaTools;
use crate::workspace::{MEDIA_EXTENSION, remove_quietly};

/// A segment that was left out of the merge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedSegment {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Written {
        output: PathBuf,
        /// Segments in the order they were appended
        included: Vec<PathBuf>,
        rejected: Vec<RejectedSegment>,
    },
    /// Every input was rejected; nothing was written
    NothingToMerge { rejected: Vec<RejectedSegment> },
}

/// Deletes every input segment when dropped, whatever happened to the merge
struct SegmentCleanup<'p>(&'p [PathBuf]);

impl Drop for SegmentCleanup<'_> {
    fn drop(&mut self) {
        for path in self.0 {
            remove_quietly(path);
        }
    }
}

/// Sibling of `output` the recap is rendered into before it replaces `output`
pub fn partial_path_for(output: &Path) -> PathBuf {
    output.with_extension(format!("partial.{MEDIA_EXTENSION}"))
}

/// Concatenates rendered segments into the recap
pub struct Merger<'a, M> {
    tools: &'a M,
}

impl<'a, M: MediaTools> Merger<'a, M> {
    pub fn new(tools: &'a M) -> Self {
        Self { tools }
    }

    /// Append the valid `segments` in order into `output`.
    ///
    /// All of `segments` are deleted before this returns, used or not. An
    /// existing `output` is only replaced once the merge has succeeded.
    pub fn merge(&self, segments: &[PathBuf], output: &Path) -> Result<MergeOutcome> {
        let _cleanup = SegmentCleanup(segments);

        let mut included = Vec::new();
        let mut rejected = Vec::new();
        for path in segments {
            match self.validate(path) {
                Ok(()) => included.push(path.clone()),
                Err(reason) => {
                    warn!("Leaving {} out of the recap: {reason}", path.display());
                    rejected.push(RejectedSegment {
                        path: path.clone(),
                        reason,
                    });
                }
            }
        }

        if included.is_empty() {
            return Ok(MergeOutcome::NothingToMerge { rejected });
        }

        let partial = partial_path_for(output);
        debug!("Merging {} clip(s) into {}", included.len(), partial.display());
        if let Err(e) = self.tools.concat(&included, &partial) {
            remove_quietly(&partial);
            return Err(e.wrap_err("merging clips failed"));
        }
        if let Err(e) = std::fs::rename(&partial, output) {
            remove_quietly(&partial);
            return Err(eyre!(e).wrap_err(format!("cannot move recap into {}", output.display())));
        }

        Ok(MergeOutcome::Written {
            output: output.to_path_buf(),
            included,
            rejected,
        })
    }

    fn validate(&self, path: &Path) -> Result<(), String> {
        if !path.is_file() {
            return Err("file does not exist".to_string());
        }
        let has_extension = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(MEDIA_EXTENSION));
        if !has_extension {
            return Err(format!("not a .{MEDIA_EXTENSION} file"));
        }
        self.tools
            .probe(path)
            .map(|_| ())
            .map_err(|e| format!("unreadable clip: {e:#}"))
    }
}
