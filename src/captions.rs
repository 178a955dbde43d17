//! Caption parsing and mapping of caption lines onto the recap timeline.

use eyre::{Result, bail};
use serde::Serialize;

use crate::Segment;

/// A single timed caption line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionLine {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

impl CaptionLine {
    fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Parse YouTube's timedtext XML (`<text start=".." dur="..">..</text>`).
/// Lines without timing or with only whitespace are dropped.
pub fn parse_caption_xml(xml: &str) -> Result<Vec<CaptionLine>> {
    use quick_xml::Reader;
    use quick_xml::events::{BytesStart, Event};

    fn timing(tag: &BytesStart) -> Option<(f64, f64)> {
        let mut start = None;
        let mut duration = None;
        for attr in tag.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
            match attr.key.as_ref() {
                b"start" => start = value,
                b"dur" => duration = value,
                _ => {}
            }
        }
        Some((start?, duration?))
    }

    let mut reader = Reader::from_str(xml);
    let mut lines = Vec::new();
    let mut pending: Option<(f64, f64)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) if tag.name().as_ref() == b"text" => pending = timing(&tag),
            Ok(Event::Text(raw)) => {
                let Some((start, duration)) = pending.take() else {
                    continue;
                };
                let unescaped = raw.unescape().unwrap_or_default();
                // Caption bodies are escaped twice: once for XML, once as HTML
                let text = html_escape::decode_html_entities(&unescaped).trim().to_string();
                if !text.is_empty() {
                    lines.push(CaptionLine { text, start, duration });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("malformed caption XML at byte {}: {e}", reader.buffer_position()),
            _ => {}
        }
    }

    Ok(lines)
}

/// Lines of `captions` that fall inside `segment`'s window, rebased so the
/// window begins at `offset` on the recap timeline.
pub fn lines_for_segment(captions: &[CaptionLine], segment: &Segment, offset: f64) -> Vec<CaptionLine> {
    let window_end = segment.start + segment.duration;
    captions
        .iter()
        .filter_map(|line| {
            let lo = line.start.max(segment.start);
            let hi = line.end().min(window_end);
            (hi > lo).then(|| CaptionLine {
                text: line.text.clone(),
                start: offset + (lo - segment.start),
                duration: hi - lo,
            })
        })
        .collect()
}

/// Stitch per-segment captions into one track for the recap, in recap order
pub fn recap_track(clips: &[(&Segment, Option<&[CaptionLine]>)]) -> Vec<CaptionLine> {
    let mut offset = 0.0;
    let mut track = Vec::new();
    for (segment, captions) in clips {
        if let Some(captions) = captions {
            track.extend(lines_for_segment(captions, segment, offset));
        }
        offset += segment.duration;
    }
    track
}
