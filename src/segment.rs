use std::path::Path;

use eyre::{Result, WrapErr, bail};
use log::debug;
use rand::Rng;

use crate::Segment;
use crate::media::{ClipWindow, MediaTools};
use crate::workspace::{remove_quietly, segment_path_for};

/// Pick a window of `target` seconds inside a video of `total` seconds.
///
/// A video no longer than the target is used whole. Otherwise the start is
/// drawn uniformly from `[0, total - target)`. `None` when either length is
/// not a positive finite number.
pub fn choose_window<R: Rng>(rng: &mut R, total: f64, target: f64) -> Option<ClipWindow> {
    if !is_usable_length(total) || !is_usable_length(target) {
        return None;
    }
    if total <= target {
        return Some(ClipWindow {
            start: 0.0,
            duration: total,
        });
    }
    Some(ClipWindow {
        start: rng.gen_range(0.0..total - target),
        duration: target,
    })
}

fn is_usable_length(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0
}

/// Reject clip lengths that cannot be cut
pub fn check_clip_seconds(clip_seconds: f64) -> Result<()> {
    if !is_usable_length(clip_seconds) {
        bail!("clip length must be a positive number of seconds, got {clip_seconds}");
    }
    Ok(())
}

/// Cuts one random fixed-length clip out of a downloaded video
pub struct SegmentExtractor<'a, M> {
    tools: &'a M,
    clip_seconds: f64,
}

impl<'a, M: MediaTools> SegmentExtractor<'a, M> {
    pub fn new(tools: &'a M, clip_seconds: f64) -> Result<Self> {
        check_clip_seconds(clip_seconds)?;
        Ok(Self { tools, clip_seconds })
    }

    /// Render a clip of `source` next to it. A failed render leaves no segment file behind.
    pub fn extract<R: Rng>(&self, video_id: &str, source: &Path, rng: &mut R) -> Result<Segment> {
        let info = self.tools.probe(source).wrap_err("cannot read source video")?;
        let Some(window) = choose_window(rng, info.duration, self.clip_seconds) else {
            bail!("source video has no usable duration ({})", info.duration);
        };
        let dest = segment_path_for(source);
        debug!(
            "Cutting {video_id}: {:.2}s from {:.2}s of {:.2}s",
            window.duration, window.start, info.duration
        );

        if let Err(e) = self.tools.render_clip(source, &dest, window, &info) {
            remove_quietly(&dest);
            return Err(e.wrap_err("clip render failed"));
        }

        Ok(Segment {
            video_id: video_id.to_string(),
            path: dest,
            start: window.start,
            duration: window.duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_short_video_used_whole() {
        let mut rng = StdRng::seed_from_u64(7);
        let window = choose_window(&mut rng, 3.2, 5.0);
        assert_eq!(window, Some(ClipWindow { start: 0.0, duration: 3.2 }));
    }

    #[test]
    fn test_exact_length_video_used_whole() {
        let mut rng = StdRng::seed_from_u64(7);
        let window = choose_window(&mut rng, 5.0, 5.0);
        assert_eq!(window, Some(ClipWindow { start: 0.0, duration: 5.0 }));
    }

    #[test]
    fn test_window_stays_inside_video() {
        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            let total = 5.5 + (seed as f64) * 0.37;
            let window = choose_window(&mut rng, total, 5.0).unwrap();
            assert_eq!(window.duration, 5.0);
            assert!(window.start >= 0.0);
            assert!(window.start <= total - 5.0, "seed {seed}: start {} total {total}", window.start);
        }
    }

    #[test]
    fn test_window_is_reproducible_for_a_seed() {
        let a = choose_window(&mut StdRng::seed_from_u64(42), 600.0, 5.0);
        let b = choose_window(&mut StdRng::seed_from_u64(42), 600.0, 5.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_window_start_varies() {
        let mut rng = StdRng::seed_from_u64(1);
        let starts: Vec<f64> = (0..20)
            .map(|_| choose_window(&mut rng, 600.0, 5.0).unwrap().start)
            .collect();
        assert!(starts.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_unusable_lengths_have_no_window() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(choose_window(&mut rng, f64::INFINITY, 5.0), None);
        assert_eq!(choose_window(&mut rng, f64::NAN, 5.0), None);
        assert_eq!(choose_window(&mut rng, 0.0, 5.0), None);
        assert_eq!(choose_window(&mut rng, -3.0, 5.0), None);
        assert_eq!(choose_window(&mut rng, 60.0, f64::NAN), None);
        assert_eq!(choose_window(&mut rng, 60.0, 0.0), None);
    }

    #[test]
    fn test_check_clip_seconds() {
        assert!(check_clip_seconds(5.0).is_ok());
        assert!(check_clip_seconds(0.25).is_ok());
        assert!(check_clip_seconds(0.0).is_err());
        assert!(check_clip_seconds(-1.0).is_err());
        assert!(check_clip_seconds(f64::NAN).is_err());
        assert!(check_clip_seconds(f64::INFINITY).is_err());
    }
}
