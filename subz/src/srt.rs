//! SRT (SubRip) serialization.

use std::fmt;

use tracing::debug;

use crate::time::split_seconds;
use crate::types::Segment;

/// One numbered SRT block.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    /// 1-based position in the document.
    pub index: usize,
    pub start: f64,
    pub end: f64,
    /// Already trimmed.
    pub text: String,
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n{}\n\n",
            self.index,
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text
        )
    }
}

/// Build subtitle entries from aligned segments, in segment order.
///
/// The offset shifts the start time only; end times are rendered as the
/// aligner produced them. Whether that asymmetry is meant to compensate for
/// leading audio that was cut (or is an oversight) is unresolved, so it is
/// kept as is rather than applied to both ends. A negative offset that pushes
/// a start below zero renders with a negative hour field.
pub fn subtitles(segments: &[Segment], offset: f64) -> Vec<SubtitleEntry> {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| SubtitleEntry {
            index: i + 1,
            start: segment.start + offset,
            end: segment.end,
            text: segment.text.trim().to_string(),
        })
        .collect()
}

/// Render segments as an SRT document.
///
/// Every block ends with a blank line; no segments gives an empty string.
pub fn to_srt(segments: &[Segment], offset: f64) -> String {
    debug!(segments = segments.len(), offset, "creating subtitles");
    subtitles(segments, offset)
        .iter()
        .map(SubtitleEntry::to_string)
        .collect()
}

/// Format seconds as an SRT timestamp: `H:MM:SS,mmm`, hours unpadded.
pub fn format_timestamp(seconds: f64) -> String {
    // Round to whole milliseconds first so 59.9996 becomes 1:00,000, never 0:60,000.
    let rounded = (seconds * 1000.0).round() / 1000.0;
    let (h, m, s) = split_seconds(rounded);
    format!("{h}:{m:02}:{s:06.3}").replace('.', ",")
}
