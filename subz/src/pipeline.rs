use std::path::{Path, PathBuf};

use tracing::debug;

use crate::align::Aligner;
use crate::audio;
use crate::config::{AudioFormat, TranscribeOptions};
use crate::device::Device;
use crate::error::Result;
use crate::transcribe;
use crate::types::Segment;

/// Turns a prepared audio file into aligned segments.
pub trait Pipeline {
    fn segments(&self, audio: &Path) -> Result<Vec<Segment>>;
}

/// Whisper transcription followed by segment alignment.
pub struct WhisperPipeline {
    model_path: PathBuf,
    options: TranscribeOptions,
    format: AudioFormat,
    device: Device,
}

impl WhisperPipeline {
    /// The device is chosen here, once, and kept for the whole run.
    pub fn new(model_path: impl Into<PathBuf>, options: TranscribeOptions) -> Self {
        let device = Device::select(options.gpu, options.gpu_device);
        Self {
            model_path: model_path.into(),
            options,
            format: AudioFormat::PIPELINE,
            device,
        }
    }

    /// Expect input audio in `format` instead of the default layout.
    pub fn format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn device(&self) -> Device {
        self.device
    }
}

impl Pipeline for WhisperPipeline {
    fn segments(&self, audio: &Path) -> Result<Vec<Segment>> {
        let ctx = transcribe::load_model(&self.model_path, self.device)?;
        let samples = audio::load_waveform(audio, &self.format)?;

        debug!("transcribe");
        let transcript = transcribe::transcribe_samples(&ctx, &samples, &self.options)?;

        debug!("align");
        let aligner = Aligner::load(&transcript.language, self.device, &self.options.align)?;
        Ok(aligner.align(transcript.segments, &samples))
    }
}
