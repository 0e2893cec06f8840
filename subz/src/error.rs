use std::path::PathBuf;

/// All errors that can occur in subz.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{path} not found")]
    SourceNotFound { path: PathBuf },

    #[error("ffmpeg not found — install with: apt install ffmpeg")]
    FfmpegNotFound,

    #[error("audio extraction failed: {0}")]
    Extraction(String),

    #[error("audio file not found: {path}")]
    AudioNotFound { path: PathBuf },

    #[error("unexpected audio format: expected {expected}, found {found}")]
    AudioFormat { expected: String, found: String },

    #[error("audio decoding error: {0}")]
    AudioDecode(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("model error: {0}")]
    Model(String),

    #[error("model download failed: {0}")]
    ModelDownload(String),

    #[error("unsupported language: \"{0}\" — no alignment available for it")]
    UnsupportedLanguage(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("transcription error: {0}")]
    Transcription(String),

    #[error("whisper error: {0}")]
    Whisper(#[from] whisper_rs::WhisperError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_source_not_found() {
        let e = Error::SourceNotFound {
            path: PathBuf::from("/tmp/movie.mkv"),
        };
        assert_eq!(e.to_string(), "/tmp/movie.mkv not found");
    }

    #[test]
    fn test_error_display_audio_format() {
        let e = Error::AudioFormat {
            expected: "16000 Hz, 2 ch, 16-bit".into(),
            found: "44100 Hz, 2 ch, 16-bit".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("expected 16000 Hz"));
        assert!(msg.contains("found 44100 Hz"));
    }

    #[test]
    fn test_error_display_unsupported_language() {
        let e = Error::UnsupportedLanguage("klingon".into());
        assert!(e.to_string().contains("klingon"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("read-only"));
    }

    #[test]
    fn test_error_debug_impl() {
        let e = Error::Extraction("stream map '0:a:3' matches no streams".into());
        let debug = format!("{:?}", e);
        assert!(debug.contains("Extraction"));
    }
}
