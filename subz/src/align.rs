//! Segment-level alignment.
//!
//! Whisper's segment bounds are coarse: they often start early, in the
//! silence before a phrase, and run on past its last word. The aligner pulls
//! each bound in to the first and last voiced window inside the segment.

use tracing::{debug, info};

use crate::audio::WHISPER_SAMPLE_RATE;
use crate::config::AlignOptions;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::types::Segment;

/// Aligner resolved for one language.
#[derive(Debug, Clone)]
pub struct Aligner {
    language: String,
    threshold: f32,
    window: usize,
    pad: usize,
}

impl Aligner {
    /// Resolve the aligner for a detected language code.
    ///
    /// Fails for codes whisper does not know (including "unknown", which is
    /// what a failed detection reports).
    ///
    /// `device` is the one the pipeline selected and is only recorded in the
    /// log. Refinement is an RMS scan over the decoded waveform and always runs
    /// on the CPU, so every device gives the same bounds.
    pub fn load(language: &str, device: Device, options: &AlignOptions) -> Result<Self> {
        if whisper_rs::get_lang_id(language).is_none() {
            return Err(Error::UnsupportedLanguage(language.to_string()));
        }
        info!(language, %device, "loading aligner");

        Ok(Self {
            language: language.to_string(),
            threshold: db_to_linear(options.threshold_db),
            window: ms_to_samples(options.window_ms).max(1),
            pad: ms_to_samples(options.pad_ms),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Refine segment bounds against the 16kHz mono waveform.
    ///
    /// Segment-level only. Order and count are preserved, bounds never widen,
    /// starts are clamped to zero, and every result has `end >= start`. A
    /// segment with no voiced window keeps its coarse bounds.
    pub fn align(&self, segments: Vec<Segment>, samples: &[f32]) -> Vec<Segment> {
        let mut moved = 0usize;
        let aligned = segments
            .into_iter()
            .map(|segment| {
                let refined = self.refine(segment.clone(), samples);
                if refined != segment {
                    moved += 1;
                }
                refined
            })
            .collect::<Vec<_>>();
        debug!(segments = aligned.len(), moved, "alignment complete");
        aligned
    }

    fn refine(&self, mut segment: Segment, samples: &[f32]) -> Segment {
        segment.start = segment.start.max(0.0);
        segment.end = segment.end.max(segment.start);

        let from = seconds_to_index(segment.start).min(samples.len());
        let to = seconds_to_index(segment.end).min(samples.len());
        if to <= from {
            return segment;
        }

        let span = &samples[from..to];
        let Some(first) = first_active(span, self.window, self.threshold) else {
            return segment;
        };
        let last = last_active(span, self.window, self.threshold).unwrap_or(span.len());

        let start = from + first.saturating_sub(self.pad);
        let end = (from + last + self.pad).min(to);
        if end <= start {
            return segment;
        }

        segment.start = segment.start.max(index_to_seconds(start));
        segment.end = segment.end.min(index_to_seconds(end)).max(segment.start);
        segment
    }
}

/// Index of the first window whose RMS exceeds `threshold`.
fn first_active(samples: &[f32], window: usize, threshold: f32) -> Option<usize> {
    samples
        .windows(window)
        .step_by(window)
        .position(|w| rms(w) > threshold)
        .map(|i| i * window)
}

/// End index (exclusive) of the last window whose RMS exceeds `threshold`.
fn last_active(samples: &[f32], window: usize, threshold: f32) -> Option<usize> {
    if samples.len() < window {
        return None;
    }
    let mut end = samples.len();
    while end >= window {
        if rms(&samples[end - window..end]) > threshold {
            return Some(end);
        }
        end -= window;
    }
    None
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

fn ms_to_samples(ms: u32) -> usize {
    (WHISPER_SAMPLE_RATE as usize * ms as usize) / 1000
}

fn seconds_to_index(seconds: f64) -> usize {
    (seconds * WHISPER_SAMPLE_RATE as f64).round() as usize
}

fn index_to_seconds(index: usize) -> f64 {
    index as f64 / WHISPER_SAMPLE_RATE as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: usize = WHISPER_SAMPLE_RATE as usize;

    fn aligner() -> Aligner {
        Aligner::load("en", Device::Cpu, &AlignOptions::default()).unwrap()
    }

    /// `silence` seconds of silence, `voice` seconds of signal, `silence` again.
    fn padded_tone(silence: f64, voice: f64) -> Vec<f32> {
        let quiet = (silence * SR as f64) as usize;
        let loud = (voice * SR as f64) as usize;
        let mut samples = vec![0.0; quiet];
        samples.extend(vec![0.5; loud]);
        samples.extend(vec![0.0; quiet]);
        samples
    }

    #[test]
    fn test_tightens_to_voiced_span() {
        let samples = padded_tone(1.0, 1.0);
        let out = aligner().align(vec![Segment::new(0.0, 3.0, "hi")], &samples);

        // Voice runs 1.0..2.0, with 50ms of padding each side.
        assert!((out[0].start - 0.95).abs() < 0.011, "start {}", out[0].start);
        assert!((out[0].end - 2.05).abs() < 0.011, "end {}", out[0].end);
        assert_eq!(out[0].text, "hi");
    }

    #[test]
    fn test_never_widens() {
        let samples = vec![0.5; 3 * SR];
        let input = Segment::new(1.0, 2.0, "inside");
        let out = aligner().align(vec![input.clone()], &samples);
        assert!(out[0].start >= input.start);
        assert!(out[0].end <= input.end);
    }

    #[test]
    fn test_silent_segment_unchanged() {
        let samples = vec![0.0; 2 * SR];
        let input = Segment::new(0.25, 1.75, "...");
        let out = aligner().align(vec![input.clone()], &samples);
        assert_eq!(out[0], input);
    }

    #[test]
    fn test_preserves_order_and_count() {
        let samples = padded_tone(0.5, 4.0);
        let input = vec![
            Segment::new(3.0, 4.0, "c"),
            Segment::new(0.0, 1.0, "a"),
            Segment::new(1.0, 2.0, "b"),
        ];
        let out = aligner().align(input, &samples);
        let texts: Vec<&str> = out.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_repairs_inverted_and_negative_bounds() {
        let samples = vec![0.0; SR];
        let out = aligner().align(
            vec![Segment::new(-0.5, 0.2, "neg"), Segment::new(0.8, 0.4, "inv")],
            &samples,
        );
        assert_eq!(out[0].start, 0.0);
        assert!(out[1].end >= out[1].start);
    }

    #[test]
    fn test_segment_past_end_of_audio() {
        let samples = vec![0.5; SR];
        let input = Segment::new(5.0, 6.0, "late");
        let out = aligner().align(vec![input.clone()], &samples);
        assert_eq!(out[0], input);
    }

    #[test]
    fn test_unknown_language_has_no_aligner() {
        let err = Aligner::load("unknown", Device::Cpu, &AlignOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_device_does_not_change_bounds() {
        let samples = padded_tone(1.0, 1.0);
        let input = vec![Segment::new(0.0, 3.0, "hi"), Segment::new(2.5, 3.0, "quiet")];
        let options = AlignOptions::default();

        let on_cpu = Aligner::load("en", Device::Cpu, &options)
            .unwrap()
            .align(input.clone(), &samples);
        let on_gpu = Aligner::load("en", Device::Gpu { index: 1 }, &options)
            .unwrap()
            .align(input, &samples);
        assert_eq!(on_cpu, on_gpu);
    }

    #[test]
    fn test_language_kept() {
        let a = Aligner::load("de", Device::Cpu, &AlignOptions::default()).unwrap();
        assert_eq!(a.language(), "de");
    }

    #[test]
    fn test_first_and_last_active() {
        let mut samples = vec![0.0; 1_000];
        samples[400..600].fill(0.5);
        assert_eq!(first_active(&samples, 100, 0.01), Some(400));
        assert_eq!(last_active(&samples, 100, 0.01), Some(600));
        assert_eq!(first_active(&[0.0; 300], 100, 0.01), None);
        assert_eq!(last_active(&[0.0; 50], 100, 0.01), None);
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[1.0, -1.0, 1.0, -1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-40.0) - 0.01).abs() < 1e-6);
    }
}
