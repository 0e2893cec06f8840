use std::path::Path;

use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::WHISPER_SAMPLE_RATE;
use crate::config::TranscribeOptions;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::types::{Segment, Transcript};

/// Load the whisper model at `model_path` on `device`.
pub fn load_model(model_path: &Path, device: Device) -> Result<WhisperContext> {
    info!(
        model = %model_path.display(),
        %device,
        precision = %device.precision(),
        "loading whisper model"
    );

    let mut ctx_params = WhisperContextParameters::default();
    ctx_params.use_gpu(device.use_gpu());
    ctx_params.gpu_device(device.gpu_index());
    ctx_params.flash_attn(device.flash_attn());

    let path = model_path
        .to_str()
        .ok_or_else(|| Error::Model("model path contains invalid UTF-8".into()))?;
    Ok(WhisperContext::new_with_params(path, ctx_params)?)
}

/// Run whisper over 16kHz mono samples, returning coarse segments and the language.
pub fn transcribe_samples(
    ctx: &WhisperContext,
    samples: &[f32],
    options: &TranscribeOptions,
) -> Result<Transcript> {
    let mut state = ctx.create_state()?;

    // "auto" runs detection, then transcribes in the detected language.
    let language = options.language.whisper_code().to_string();

    let mut params = match options.beam_size {
        Some(beam_size) => FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: beam_size as i32,
            patience: -1.0,
        }),
        None => FullParams::new(SamplingStrategy::Greedy { best_of: 5 }),
    };

    params.set_language(Some(&language));

    if let Some(n) = options.n_threads {
        params.set_n_threads(n as i32);
    }

    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    info!(samples = samples.len(), language = %options.language, "running transcription");
    state.full(params, samples)?;

    let num_segments = state.full_n_segments();
    debug!(num_segments, "transcription complete");

    let mut segments = Vec::with_capacity(num_segments as usize);
    for i in 0..num_segments {
        let segment = state
            .get_segment(i)
            .ok_or_else(|| Error::Transcription(format!("segment {i} not found")))?;

        let text = segment
            .to_str_lossy()
            .map_err(|e| Error::Transcription(format!("segment text error: {e}")))?
            .into_owned();

        // whisper timestamps are in centiseconds
        segments.push(Segment {
            start: segment.start_timestamp() as f64 / 100.0,
            end: segment.end_timestamp() as f64 / 100.0,
            text,
        });
    }

    let detected = state.full_lang_id_from_state();
    let language = whisper_rs::get_lang_str(detected)
        .unwrap_or("unknown")
        .to_string();
    debug!(
        language = %language,
        duration_secs = samples.len() as f64 / WHISPER_SAMPLE_RATE as f64,
        "language detected"
    );

    Ok(Transcript { segments, language })
}
