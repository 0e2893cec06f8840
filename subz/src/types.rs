use serde::Deserialize;

/// A contiguous span of transcribed speech.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Segment {
    /// Start in seconds from the beginning of the audio.
    pub start: f64,
    /// End in seconds, never before `start` once aligned.
    pub end: f64,
    pub text: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Coarse output of the speech step, before alignment.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub segments: Vec<Segment>,
    /// Detected (or forced) language code, e.g. "en".
    pub language: String,
}
