//! Playlist-to-recap orchestration.
//!
//! A run moves `Idle → ParsingUrl → Enumerating → ProcessingVideos → Merging`
//! and ends in `Done` or `Failed`. Videos are handled one at a time; a video
//! that cannot be fetched or cut becomes a [`SkipRecord`] and the loop goes on.
//! Only a listing failure aborts the run with an error.

use std::path::PathBuf;

use eyre::Result;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::captions::{self, CaptionLine};
use crate::config::Settings;
use crate::fetch::VideoFetcher;
use crate::media::MediaTools;
use crate::merge::{MergeOutcome, Merger};
use crate::output;
use crate::segment::{SegmentExtractor, check_clip_seconds};
use crate::workspace::{Workspace, remove_quietly};
use crate::youtube::VideoCatalog;
use crate::{Segment, SkipReason, SkipRecord, SourceRef, parse_source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    ParsingUrl,
    Enumerating,
    ProcessingVideos,
    Merging,
    Done,
    Failed,
}

/// Why a run ended without a recap
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailure {
    MissingUrl,
    NoVideosFound,
    NoSegments,
    NothingMerged,
    MergeFailed { message: String },
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunFailure::MissingUrl => write!(f, "no URL provided"),
            RunFailure::NoVideosFound => write!(f, "no videos found in the provided URL"),
            RunFailure::NoSegments => write!(f, "no videos processed; check the playlist for valid videos"),
            RunFailure::NothingMerged => write!(f, "none of the clips could be merged"),
            RunFailure::MergeFailed { message } => write!(f, "merging clips failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Done { output: PathBuf },
    Failed { failure: RunFailure },
}

/// Everything a run produced, for display
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source: Option<SourceRef>,
    pub outcome: RunOutcome,
    /// Videos the listing returned
    pub video_count: usize,
    /// Clips in recap order
    pub segments: Vec<Segment>,
    pub skipped: Vec<SkipRecord>,
    pub subtitles: Option<PathBuf>,
    /// Scratch directory left on disk with `keep_scratch`
    pub scratch: Option<PathBuf>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            source: None,
            outcome: RunOutcome::Failed {
                failure: RunFailure::MissingUrl,
            },
            video_count: 0,
            segments: Vec::new(),
            skipped: Vec::new(),
            subtitles: None,
            scratch: None,
        }
    }

    pub fn output(&self) -> Option<&PathBuf> {
        match &self.outcome {
            RunOutcome::Done { output } => Some(output),
            RunOutcome::Failed { .. } => None,
        }
    }
}

/// Progress notifications for whoever is driving the run
#[derive(Debug)]
pub enum Event<'a> {
    Stage(Stage),
    Listed { count: usize },
    Processing { index: usize, total: usize, video_id: &'a str },
    Clipped(&'a Segment),
    Skipped(&'a SkipRecord),
}

type Observer = Box<dyn FnMut(&Event<'_>)>;

struct Progress {
    stage: Stage,
    observer: Option<Observer>,
}

impl Progress {
    fn enter(&mut self, stage: Stage) {
        debug!("Stage {:?} -> {stage:?}", self.stage);
        self.stage = stage;
        self.emit(&Event::Stage(stage));
    }

    fn emit(&mut self, event: &Event<'_>) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }
}

pub struct Pipeline<C, M> {
    catalog: C,
    tools: M,
    settings: Settings,
    rng: StdRng,
    progress: Progress,
}

impl<C: VideoCatalog, M: MediaTools> Pipeline<C, M> {
    pub fn new(catalog: C, tools: M, settings: Settings) -> Self {
        Self {
            catalog,
            tools,
            settings,
            rng: StdRng::from_entropy(),
            progress: Progress {
                stage: Stage::Idle,
                observer: None,
            },
        }
    }

    /// Use a fixed random source, e.g. a seeded one
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn on_event(mut self, observer: impl FnMut(&Event<'_>) + 'static) -> Self {
        self.progress.observer = Some(Box::new(observer));
        self
    }

    pub fn stage(&self) -> Stage {
        self.progress.stage
    }

    /// Turn the URL into a recap. Input problems end in a failed report; an
    /// unusable clip length or a listing API failure is returned as an error.
    pub async fn run(&mut self, url: &str) -> Result<RunReport> {
        check_clip_seconds(self.settings.clip_seconds)?;
        let mut report = RunReport::new();
        self.progress.enter(Stage::ParsingUrl);

        let url = url.trim();
        if url.is_empty() {
            return Ok(self.fail(report, RunFailure::MissingUrl));
        }
        let Some(source) = parse_source(url) else {
            return Ok(self.fail(report, RunFailure::NoVideosFound));
        };
        report.source = Some(source.clone());

        self.progress.enter(Stage::Enumerating);
        info!("Listing {source}");
        let video_ids = self.catalog.list_videos(&source).await?;
        report.video_count = video_ids.len();
        self.progress.emit(&Event::Listed { count: video_ids.len() });
        if video_ids.is_empty() {
            return Ok(self.fail(report, RunFailure::NoVideosFound));
        }

        let workspace = Workspace::create(&self.settings.scratch_root)?;

        self.progress.enter(Stage::ProcessingVideos);
        let (segments, captions) = self.process_videos(&video_ids, &workspace, &mut report).await?;

        if segments.is_empty() {
            self.finish_workspace(workspace, &mut report);
            return Ok(self.fail(report, RunFailure::NoSegments));
        }

        self.progress.enter(Stage::Merging);
        let paths: Vec<PathBuf> = segments.iter().map(|s| s.path.clone()).collect();
        let merged = Merger::new(&self.tools).merge(&paths, &self.settings.output);
        self.finish_workspace(workspace, &mut report);

        let (output, included, rejected) = match merged {
            Ok(MergeOutcome::Written {
                output,
                included,
                rejected,
            }) => (output, included, rejected),
            Ok(MergeOutcome::NothingToMerge { rejected }) => {
                self.record_rejected(&segments, &rejected, &mut report);
                return Ok(self.fail(report, RunFailure::NothingMerged));
            }
            Err(e) => {
                warn!("Merge failed: {e:#}");
                return Ok(self.fail(report, RunFailure::MergeFailed { message: format!("{e:#}") }));
            }
        };
        self.record_rejected(&segments, &rejected, &mut report);

        let clips: Vec<(Segment, Option<Vec<CaptionLine>>)> = segments
            .into_iter()
            .zip(captions)
            .filter(|(s, _)| included.contains(&s.path))
            .collect();

        if self.settings.subtitles {
            report.subtitles = write_subtitles(&clips, &output);
        }
        report.segments = clips.into_iter().map(|(s, _)| s).collect();

        info!("Recap written to {} ({} clips)", output.display(), report.segments.len());
        report.outcome = RunOutcome::Done { output };
        self.progress.enter(Stage::Done);
        Ok(report)
    }

    async fn process_videos(
        &mut self,
        video_ids: &[String],
        workspace: &Workspace,
        report: &mut RunReport,
    ) -> Result<(Vec<Segment>, Vec<Option<Vec<CaptionLine>>>)> {
        let fetcher = VideoFetcher::new(&self.tools, self.settings.max_bytes, self.settings.allow_portrait);
        let extractor = SegmentExtractor::new(&self.tools, self.settings.clip_seconds)?;

        let mut segments = Vec::new();
        let mut captions = Vec::new();
        let total = video_ids.len();

        for (index, video_id) in video_ids.iter().enumerate() {
            self.progress.emit(&Event::Processing {
                index: index + 1,
                total,
                video_id,
            });

            let source = match fetcher.fetch(video_id, &workspace.download_path(video_id)) {
                Ok(path) => path,
                Err(reason) => {
                    skip(&mut self.progress, report, video_id, reason);
                    continue;
                }
            };

            let extracted = extractor.extract(video_id, &source, &mut self.rng);
            remove_quietly(&source);

            match extracted {
                Ok(segment) => {
                    self.progress.emit(&Event::Clipped(&segment));
                    let lines = if self.settings.subtitles {
                        self.catalog.fetch_captions(video_id, &self.settings.caption_lang).await
                    } else {
                        None
                    };
                    segments.push(segment);
                    captions.push(lines);
                }
                Err(e) => {
                    let reason = SkipReason::SegmentFailed {
                        message: format!("{e:#}"),
                    };
                    skip(&mut self.progress, report, video_id, reason);
                }
            }
        }

        Ok((segments, captions))
    }

    fn record_rejected(
        &mut self,
        segments: &[Segment],
        rejected: &[crate::merge::RejectedSegment],
        report: &mut RunReport,
    ) {
        for r in rejected {
            if let Some(segment) = segments.iter().find(|s| s.path == r.path) {
                let reason = SkipReason::SegmentFailed {
                    message: r.reason.clone(),
                };
                skip(&mut self.progress, report, &segment.video_id, reason);
            }
        }
    }

    fn finish_workspace(&self, workspace: Workspace, report: &mut RunReport) {
        if self.settings.keep_scratch {
            report.scratch = Some(workspace.keep());
        }
    }

    fn fail(&mut self, mut report: RunReport, failure: RunFailure) -> RunReport {
        warn!("Run failed: {failure}");
        report.outcome = RunOutcome::Failed { failure };
        self.progress.enter(Stage::Failed);
        report
    }
}

fn skip(progress: &mut Progress, report: &mut RunReport, video_id: &str, reason: SkipReason) {
    info!("Skipped {video_id}: {reason}");
    let record = SkipRecord {
        video_id: video_id.to_string(),
        reason,
    };
    progress.emit(&Event::Skipped(&record));
    report.skipped.push(record);
}

fn write_subtitles(clips: &[(Segment, Option<Vec<CaptionLine>>)], output: &std::path::Path) -> Option<PathBuf> {
    let pairs: Vec<(&Segment, Option<&[CaptionLine]>)> =
        clips.iter().map(|(s, c)| (s, c.as_deref())).collect();
    let track = captions::recap_track(&pairs);
    if track.is_empty() {
        debug!("No captions overlap any clip; not writing subtitles");
        return None;
    }

    let path = output.with_extension("srt");
    match std::fs::write(&path, output::render_srt(&track)) {
        Ok(()) => Some(path),
        Err(e) => {
            warn!("Could not write subtitles to {}: {e}", path.display());
            None
        }
    }
}
