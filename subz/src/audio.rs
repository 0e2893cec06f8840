use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::config::AudioFormat;
use crate::error::{Error, Result};

/// Sample rate whisper.cpp consumes.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Pulls one audio track out of a media file into a WAV of the given format.
pub trait Extract {
    fn extract(&self, source: &Path, track: u32, dest: &Path, format: &AudioFormat)
        -> Result<()>;
}

/// Extraction through the `ffmpeg` binary on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct Ffmpeg;

impl Ffmpeg {
    fn args(source: &Path, track: u32, dest: &Path, format: &AudioFormat) -> Vec<String> {
        vec![
            "-nostdin".into(),
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            source.to_string_lossy().into_owned(),
            "-map".into(),
            format!("0:a:{track}"),
            "-acodec".into(),
            format.codec(),
            "-ar".into(),
            format.sample_rate.to_string(),
            "-ac".into(),
            format.channels.to_string(),
            dest.to_string_lossy().into_owned(),
        ]
    }
}

impl Extract for Ffmpeg {
    fn extract(
        &self,
        source: &Path,
        track: u32,
        dest: &Path,
        format: &AudioFormat,
    ) -> Result<()> {
        debug!(source = %source.display(), track, %format, "extracting audio");

        let output = Command::new("ffmpeg")
            .args(Self::args(source, track, dest, format))
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::FfmpegNotFound
                } else {
                    Error::Extraction(format!("failed to run ffmpeg: {e}"))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Extraction(format!(
                "ffmpeg failed on track {track}: {}",
                stderr.trim()
            )));
        }

        if !dest.is_file() {
            return Err(Error::Extraction(format!(
                "ffmpeg produced no output at {}",
                dest.display()
            )));
        }

        Ok(())
    }
}

/// Read a WAV written in `format` and return 16kHz mono f32 samples ready for whisper.
///
/// The header must match `format` exactly. Multi-channel audio is averaged down to mono
/// while it is read, so only the mono buffer is ever held in memory.
pub fn load_waveform(path: &Path, format: &AudioFormat) -> Result<Vec<f32>> {
    info!(path = %path.display(), "loading audio");

    if !path.exists() {
        return Err(Error::AudioNotFound {
            path: path.to_path_buf(),
        });
    }

    if format.sample_rate != WHISPER_SAMPLE_RATE {
        return Err(Error::InvalidOption(format!(
            "whisper needs {WHISPER_SAMPLE_RATE} Hz audio, format asks for {} Hz",
            format.sample_rate
        )));
    }

    let mut reader = hound::WavReader::open(path)?;
    format.check(&reader.spec())?;

    let scale = (1i64 << (format.bits_per_sample - 1)) as f32;
    let frames = reader.duration() as usize;
    let samples = downmix(
        reader.samples::<i32>().map(|s| s.map(|v| v as f32 / scale)),
        format.channels,
        frames,
    )?;

    let duration = samples.len() as f64 / WHISPER_SAMPLE_RATE as f64;
    info!(duration_secs = format!("{duration:.1}"), "audio ready");
    Ok(samples)
}

/// Average interleaved samples into a single channel as they arrive.
/// A trailing partial frame is dropped.
fn downmix<E>(
    interleaved: impl Iterator<Item = std::result::Result<f32, E>>,
    channels: u16,
    frames: usize,
) -> std::result::Result<Vec<f32>, E> {
    let channels = channels.max(1) as usize;
    let mut mono = Vec::with_capacity(frames);
    let mut sum = 0.0f32;
    let mut filled = 0usize;
    for sample in interleaved {
        sum += sample?;
        filled += 1;
        if filled == channels {
            mono.push(sum / channels as f32);
            sum = 0.0;
            filled = 0;
        }
    }
    Ok(mono)
}
