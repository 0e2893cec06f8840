use std::fmt;
use std::path::PathBuf;

use tracing::Level;

use crate::error::{Error, Result};

/// Whisper model identifiers accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Tiny,
    TinyEn,
    Base,
    BaseEn,
    Small,
    SmallEn,
    Medium,
    MediumEn,
    LargeV1,
    LargeV2,
    LargeV3,
    LargeV3Turbo,
}

impl Model {
    /// Every accepted identifier, aliases included.
    pub const NAMES: [&'static str; 14] = [
        "tiny",
        "tiny.en",
        "base",
        "base.en",
        "small",
        "small.en",
        "medium",
        "medium.en",
        "large-v1",
        "large-v2",
        "large-v3",
        "large",
        "large-v3-turbo",
        "turbo",
    ];

    /// Distinct models, smallest first.
    pub const ALL: [Model; 12] = [
        Model::Tiny,
        Model::TinyEn,
        Model::Base,
        Model::BaseEn,
        Model::Small,
        Model::SmallEn,
        Model::Medium,
        Model::MediumEn,
        Model::LargeV1,
        Model::LargeV2,
        Model::LargeV3,
        Model::LargeV3Turbo,
    ];

    /// Parse an identifier (e.g. a CLI argument). `large` and `turbo` are aliases.
    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "tiny" => Some(Model::Tiny),
            "tiny.en" => Some(Model::TinyEn),
            "base" => Some(Model::Base),
            "base.en" => Some(Model::BaseEn),
            "small" => Some(Model::Small),
            "small.en" => Some(Model::SmallEn),
            "medium" => Some(Model::Medium),
            "medium.en" => Some(Model::MediumEn),
            "large-v1" => Some(Model::LargeV1),
            "large-v2" => Some(Model::LargeV2),
            "large-v3" | "large" => Some(Model::LargeV3),
            "large-v3-turbo" | "turbo" => Some(Model::LargeV3Turbo),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Model::Tiny => "tiny",
            Model::TinyEn => "tiny.en",
            Model::Base => "base",
            Model::BaseEn => "base.en",
            Model::Small => "small",
            Model::SmallEn => "small.en",
            Model::Medium => "medium",
            Model::MediumEn => "medium.en",
            Model::LargeV1 => "large-v1",
            Model::LargeV2 => "large-v2",
            Model::LargeV3 => "large-v3",
            Model::LargeV3Turbo => "large-v3-turbo",
        }
    }

    /// ggml weights file name in the whisper.cpp model repository.
    pub fn filename(&self) -> String {
        format!("ggml-{}.bin", self.name())
    }

    /// Approximate download size, for listings.
    pub fn size_hint(&self) -> &'static str {
        match self {
            Model::Tiny | Model::TinyEn => "75 MB",
            Model::Base | Model::BaseEn => "142 MB",
            Model::Small | Model::SmallEn => "466 MB",
            Model::Medium | Model::MediumEn => "1.5 GB",
            Model::LargeV1 | Model::LargeV2 | Model::LargeV3 => "2.9 GB",
            Model::LargeV3Turbo => "1.6 GB",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::LargeV3
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transcription language: detected from the audio, or forced.
#[derive(Debug, Clone, Default)]
pub enum Language {
    #[default]
    Auto,
    /// A code whisper knows, normalized to its short form ("en", "de").
    Code(String),
}

impl Language {
    /// Accepts short codes ("en") or full names ("english"), or "auto".
    pub fn new(lang: &str) -> Result<Self> {
        let lower = lang.to_lowercase();
        if lower == "auto" {
            return Ok(Language::Auto);
        }

        let id = whisper_rs::get_lang_id(&lower)
            .ok_or_else(|| Error::UnsupportedLanguage(lang.to_string()))?;
        let code = whisper_rs::get_lang_str(id).unwrap_or(lower.as_str()).to_string();
        Ok(Language::Code(code))
    }

    /// The code passed to whisper; "auto" triggers detection.
    pub fn whisper_code(&self) -> &str {
        match self {
            Language::Auto => "auto",
            Language::Code(code) => code,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.whisper_code())
    }
}

/// The audio layout produced by extraction and expected by the pipeline.
///
/// Both sides read the same value: ffmpeg is told to write exactly this,
/// and the waveform loader rejects any WAV that does not match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// 16-bit PCM, 16 kHz, stereo.
    pub const PIPELINE: AudioFormat = AudioFormat {
        sample_rate: 16_000,
        channels: 2,
        bits_per_sample: 16,
    };

    /// ffmpeg codec name for this layout.
    pub fn codec(&self) -> String {
        format!("pcm_s{}le", self.bits_per_sample)
    }

    /// WAV header this layout produces.
    pub fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Fail unless `spec` is exactly this layout.
    pub fn check(&self, spec: &hound::WavSpec) -> Result<()> {
        let expected = self.wav_spec();
        if *spec == expected {
            return Ok(());
        }
        Err(Error::AudioFormat {
            expected: describe_spec(&expected),
            found: describe_spec(spec),
        })
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::PIPELINE
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe_spec(&self.wav_spec()))
    }
}

fn describe_spec(spec: &hound::WavSpec) -> String {
    let kind = match spec.sample_format {
        hound::SampleFormat::Int => "PCM",
        hound::SampleFormat::Float => "float",
    };
    format!(
        "{} Hz, {} ch, {}-bit {kind}",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    )
}

/// Segment aligner tuning.
#[derive(Debug, Clone)]
pub struct AlignOptions {
    /// RMS level in dB above which a window counts as voiced.
    pub threshold_db: f32,
    /// Padding kept around detected speech boundaries.
    pub pad_ms: u32,
    /// Analysis window length.
    pub window_ms: u32,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            threshold_db: -40.0,
            pad_ms: 50,
            window_ms: 10,
        }
    }
}

/// Builder for transcription options.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    pub model: Model,
    pub language: Language,
    pub gpu: bool,
    pub gpu_device: u32,
    pub n_threads: Option<u32>,
    pub beam_size: Option<u32>,
    pub cache_dir: Option<PathBuf>,
    pub align: AlignOptions,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            model: Model::LargeV3,
            language: Language::Auto,
            gpu: true,
            gpu_device: 0,
            n_threads: None,
            beam_size: None,
            cache_dir: None,
            align: AlignOptions::default(),
        }
    }
}

impl TranscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Force a language instead of detecting it.
    pub fn language(mut self, lang: &str) -> Result<Self> {
        self.language = Language::new(lang)?;
        Ok(self)
    }

    pub fn gpu(mut self, enabled: bool) -> Self {
        self.gpu = enabled;
        self
    }

    pub fn gpu_device(mut self, device: u32) -> Self {
        self.gpu_device = device;
        self
    }

    pub fn n_threads(mut self, n: u32) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidOption("thread count must be at least 1".into()));
        }
        self.n_threads = Some(n);
        Ok(self)
    }

    pub fn beam_size(mut self, size: u32) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidOption("beam size must be at least 1".into()));
        }
        self.beam_size = Some(size);
        Ok(self)
    }

    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    pub fn align(mut self, align: AlignOptions) -> Self {
        self.align = align;
        self
    }

    /// Resolve the cache directory, defaulting to ~/.cache/subz/models.
    pub fn resolve_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("subz")
                .join("models")
        })
    }
}

/// Crates whose debug output drowns ours when verbose logging is on.
const NOISY_CRATES: [&str; 6] = ["hyper", "hyper_util", "h2", "reqwest", "rustls", "tokio_util"];

/// Log filtering decided at startup and handed to the subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: Level,
    /// Per-target overrides applied on top of `level`.
    pub targets: Vec<(&'static str, Level)>,
}

impl LoggingConfig {
    /// Filter directives in `EnvFilter` syntax, most general first.
    pub fn directives(&self) -> Vec<String> {
        let mut out = vec![self.level.as_str().to_lowercase()];
        out.extend(
            self.targets
                .iter()
                .map(|(target, level)| format!("{target}={}", level.as_str().to_lowercase())),
        );
        out
    }

    /// The full `EnvFilter` string for this run.
    ///
    /// A non-empty `rust_log` replaces `level`. Per-target overrides are only
    /// appended for targets `rust_log` does not already name.
    pub fn filter(&self, rust_log: Option<&str>) -> String {
        let Some(env) = rust_log.map(str::trim).filter(|s| !s.is_empty()) else {
            return self.directives().join(",");
        };

        let named: Vec<&str> = env
            .split(',')
            .map(|d| d.split(['=', '[']).next().unwrap_or_default().trim())
            .collect();
        let mut out = vec![env.to_string()];
        out.extend(
            self.targets
                .iter()
                .filter(|(target, _)| !named.contains(target))
                .map(|(target, level)| format!("{target}={}", level.as_str().to_lowercase())),
        );
        out.join(",")
    }
}

/// Logging policy for a run. Verbose turns on debug output for everything
/// except the HTTP/TLS stack; otherwise only warnings and errors show.
pub fn configure_logging(verbose: bool) -> LoggingConfig {
    if verbose {
        LoggingConfig {
            level: Level::DEBUG,
            targets: NOISY_CRATES.iter().map(|c| (*c, Level::WARN)).collect(),
        }
    } else {
        LoggingConfig {
            level: Level::WARN,
            targets: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_parses() {
        for name in Model::NAMES {
            assert!(Model::parse_name(name).is_some(), "{name} should parse");
        }
        assert!(Model::parse_name("huge").is_none());
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Model::parse_name("large"), Some(Model::LargeV3));
        assert_eq!(Model::parse_name("turbo"), Some(Model::LargeV3Turbo));
    }

    #[test]
    fn test_canonical_names_round_trip() {
        for model in Model::ALL {
            assert_eq!(Model::parse_name(model.name()), Some(model));
        }
    }

    #[test]
    fn test_model_filename() {
        assert_eq!(Model::LargeV3.filename(), "ggml-large-v3.bin");
        assert_eq!(Model::TinyEn.filename(), "ggml-tiny.en.bin");
        assert_eq!(Model::default(), Model::LargeV3);
    }

    #[test]
    fn test_language_auto() {
        let lang = Language::new("AUTO").unwrap();
        assert!(matches!(lang, Language::Auto));
        assert_eq!(lang.whisper_code(), "auto");
    }

    #[test]
    fn test_language_full_name_normalizes() {
        let lang = Language::new("german").unwrap();
        assert_eq!(lang.whisper_code(), "de");
    }

    #[test]
    fn test_language_unknown() {
        assert!(matches!(
            Language::new("klingon"),
            Err(Error::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_pipeline_format() {
        let format = AudioFormat::default();
        assert_eq!(format.sample_rate, 16_000);
        assert_eq!(format.channels, 2);
        assert_eq!(format.codec(), "pcm_s16le");
        assert_eq!(format.to_string(), "16000 Hz, 2 ch, 16-bit PCM");
    }

    #[test]
    fn test_format_check_rejects_mismatch() {
        let format = AudioFormat::PIPELINE;
        assert!(format.check(&format.wav_spec()).is_ok());

        let mono = hound::WavSpec {
            channels: 1,
            ..format.wav_spec()
        };
        let err = format.check(&mono).unwrap_err();
        assert!(matches!(err, Error::AudioFormat { .. }));
        assert!(err.to_string().contains("1 ch"));
    }

    #[test]
    fn test_options_validation() {
        assert!(TranscribeOptions::new().n_threads(0).is_err());
        assert!(TranscribeOptions::new().beam_size(0).is_err());
        let opts = TranscribeOptions::new().n_threads(4).unwrap().beam_size(5).unwrap();
        assert_eq!(opts.n_threads, Some(4));
        assert_eq!(opts.beam_size, Some(5));
    }

    #[test]
    fn test_cache_dir_override() {
        let opts = TranscribeOptions::new().cache_dir(PathBuf::from("/srv/models"));
        assert_eq!(opts.resolve_cache_dir(), PathBuf::from("/srv/models"));
        assert!(TranscribeOptions::new()
            .resolve_cache_dir()
            .ends_with("subz/models"));
    }

    #[test]
    fn test_configure_logging_quiet() {
        let config = configure_logging(false);
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.directives(), vec!["warn".to_string()]);
    }

    #[test]
    fn test_configure_logging_verbose() {
        let config = configure_logging(true);
        assert_eq!(config.level, Level::DEBUG);
        let directives = config.directives();
        assert_eq!(directives[0], "debug");
        assert!(directives.contains(&"hyper=warn".to_string()));
        assert!(directives.contains(&"reqwest=warn".to_string()));
    }

    #[test]
    fn test_filter_without_rust_log() {
        assert_eq!(configure_logging(false).filter(None), "warn");
        assert_eq!(configure_logging(false).filter(Some("  ")), "warn");
        let verbose = configure_logging(true).filter(None);
        assert!(verbose.starts_with("debug,"));
        assert!(verbose.contains("rustls=warn"));
    }

    #[test]
    fn test_rust_log_replaces_default_level() {
        assert_eq!(configure_logging(false).filter(Some("info")), "info");
        assert_eq!(
            configure_logging(false).filter(Some("subz=trace")),
            "subz=trace"
        );
    }

    #[test]
    fn test_rust_log_keeps_its_own_target_levels() {
        let filter = configure_logging(true).filter(Some("info,reqwest=debug"));
        assert!(filter.starts_with("info,reqwest=debug,"));
        assert!(!filter.contains("reqwest=warn"));
        assert!(filter.contains("hyper=warn"));
    }

    #[test]
    fn test_configure_logging_is_pure() {
        assert_eq!(configure_logging(true), configure_logging(true));
    }
}
