use eyre::Result;

use crate::captions::CaptionLine;
use crate::pipeline::{RunOutcome, RunReport};

/// Render the run summary for humans
pub fn render_text(report: &RunReport) -> String {
    let mut out = Vec::new();

    match &report.outcome {
        RunOutcome::Done { output } => {
            out.push("Video processing complete!".to_string());
            out.push(format!("Recap: {}", output.display()));
            out.push(format!(
                "Clips: {} of {} video(s)",
                report.segments.len(),
                report.video_count
            ));
            if let Some(ref srt) = report.subtitles {
                out.push(format!("Subtitles: {}", srt.display()));
            }
        }
        RunOutcome::Failed { failure } => out.push(format!("Warning: {failure}")),
    }

    if !report.skipped.is_empty() {
        out.push(String::new());
        out.push("Skipped videos:".to_string());
        for skip in &report.skipped {
            out.push(format!("  {}: {}", skip.video_id, skip.reason));
        }
    }

    if let Some(ref scratch) = report.scratch {
        out.push(format!("Scratch kept at: {}", scratch.display()));
    }

    out.join("\n")
}

/// Render the run summary as pretty JSON
pub fn render_json(report: &RunReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Render caption lines as SRT
pub fn render_srt(lines: &[CaptionLine]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                srt_timestamp(line.start),
                srt_timestamp(line.start + line.duration),
                line.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let secs = (total_ms / 1000) % 60;
    let mins = (total_ms / 60_000) % 60;
    let hours = total_ms / 3_600_000;
    format!("{hours:02}:{mins:02}:{secs:02},{ms:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RunFailure;
    use crate::{Segment, SkipReason, SkipRecord, SourceRef};
    use std::path::PathBuf;

    fn done_report() -> RunReport {
        RunReport {
            source: Some(SourceRef::Playlist("PL1".to_string())),
            outcome: RunOutcome::Done {
                output: PathBuf::from("final_output_video.mp4"),
            },
            video_count: 3,
            segments: vec![
                Segment {
                    video_id: "a".to_string(),
                    path: PathBuf::from("segment_temp_video_a.mp4"),
                    start: 1.0,
                    duration: 5.0,
                },
                Segment {
                    video_id: "b".to_string(),
                    path: PathBuf::from("segment_temp_video_b.mp4"),
                    start: 0.0,
                    duration: 3.0,
                },
            ],
            skipped: vec![SkipRecord {
                video_id: "c".to_string(),
                reason: SkipReason::TooLarge { bytes: 600_000_000 },
            }],
            subtitles: None,
            scratch: None,
        }
    }

    #[test]
    fn test_render_text_done() {
        let text = render_text(&done_report());
        assert_eq!(
            text,
            "Video processing complete!\n\
             Recap: final_output_video.mp4\n\
             Clips: 2 of 3 video(s)\n\
             \n\
             Skipped videos:\n  c: too large (600000000 bytes)"
        );
    }

    #[test]
    fn test_render_text_failed() {
        let mut report = done_report();
        report.outcome = RunOutcome::Failed {
            failure: RunFailure::NoVideosFound,
        };
        report.skipped.clear();
        assert_eq!(render_text(&report), "Warning: no videos found in the provided URL");
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&done_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["outcome"]["status"], "done");
        assert_eq!(value["source"]["kind"], "playlist");
        assert_eq!(value["skipped"][0]["video_id"], "c");
        assert_eq!(value["skipped"][0]["reason"], "too_large");
        assert_eq!(value["skipped"][0]["bytes"], 600_000_000);
        assert_eq!(value["segments"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_render_srt() {
        let lines = vec![
            CaptionLine {
                text: "Hello".to_string(),
                start: 0.5,
                duration: 1.25,
            },
            CaptionLine {
                text: "World".to_string(),
                start: 3661.0,
                duration: 2.0,
            },
        ];
        assert_eq!(
            render_srt(&lines),
            "1\n00:00:00,500 --> 00:00:01,750\nHello\n\n2\n01:01:01,000 --> 01:01:03,000\nWorld\n"
        );
    }

    #[test]
    fn test_render_srt_empty() {
        assert_eq!(render_srt(&[]), "");
    }
}
