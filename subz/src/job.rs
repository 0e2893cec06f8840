use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::audio::Extract;
use crate::config::AudioFormat;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::srt;

/// One media file to subtitle.
#[derive(Debug, Clone)]
pub struct Job {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub audio_track: u32,
    /// Seconds added to every subtitle start time.
    pub offset: f64,
    pub format: AudioFormat,
    /// When the clock for `Report::elapsed` started. `None` starts it in `run`.
    pub started: Option<Instant>,
}

/// What a finished job produced.
#[derive(Debug, Clone)]
pub struct Report {
    pub destination: PathBuf,
    pub segments: usize,
    pub elapsed: Duration,
}

impl Job {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: None,
            audio_track: 0,
            offset: 0.0,
            format: AudioFormat::PIPELINE,
            started: None,
        }
    }

    pub fn output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn audio_track(mut self, track: u32) -> Self {
        self.audio_track = track;
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Count elapsed time from `at`, so work done before `run` (such as
    /// fetching the model) shows up in the report.
    pub fn started_at(mut self, at: Instant) -> Self {
        self.started = Some(at);
        self
    }

    /// The source must be an existing regular file.
    pub fn check_source(&self) -> Result<()> {
        if self.source.is_file() {
            Ok(())
        } else {
            Err(Error::SourceNotFound {
                path: self.source.clone(),
            })
        }
    }

    /// Explicit output, or the source path with an `.srt` extension.
    pub fn destination(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.source.with_extension("srt"))
    }

    /// Extract, transcribe, align, and write the subtitle file.
    ///
    /// The extracted audio lives in a temporary directory that is removed
    /// when this returns, whether it succeeded or not. The destination is
    /// only written once the pipeline has finished.
    pub fn run(&self, extractor: &impl Extract, pipeline: &impl Pipeline) -> Result<Report> {
        let started = self.started.unwrap_or_else(Instant::now);
        self.check_source()?;
        let destination = self.destination();
        debug!(source = %self.source.display(), "source");
        debug!(destination = %destination.display(), "destination");

        let scratch = tempfile::Builder::new().prefix("subz-").tempdir()?;
        let audio = scratch.path().join(scratch_name(&self.source));

        debug!(track = self.audio_track, "extraction of audio");
        extractor.extract(&self.source, self.audio_track, &audio, &self.format)?;

        let segments = pipeline.segments(&audio)?;
        let document = srt::to_srt(&segments, self.offset);
        std::fs::write(&destination, document)?;

        let report = Report {
            destination,
            segments: segments.len(),
            elapsed: started.elapsed(),
        };
        info!(
            destination = %report.destination.display(),
            segments = report.segments,
            elapsed_secs = report.elapsed.as_secs(),
            "subtitles written"
        );
        Ok(report)
    }
}

fn scratch_name(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".into());
    PathBuf::from(stem).with_extension("wav")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_defaults_to_srt_sibling() {
        let job = Job::new("/media/show/episode.01.mkv");
        assert_eq!(job.destination(), PathBuf::from("/media/show/episode.01.srt"));
    }

    #[test]
    fn test_destination_relative_source_stays_in_place() {
        let job = Job::new("clips/talk.mp4");
        assert_eq!(job.destination(), PathBuf::from("clips/talk.srt"));
    }

    #[test]
    fn test_destination_without_extension() {
        let job = Job::new("/tmp/recording");
        assert_eq!(job.destination(), PathBuf::from("/tmp/recording.srt"));
    }

    #[test]
    fn test_destination_explicit() {
        let job = Job::new("/tmp/a.mkv").output(Some(PathBuf::from("/out/b.srt")));
        assert_eq!(job.destination(), PathBuf::from("/out/b.srt"));
    }

    #[test]
    fn test_check_source_missing() {
        let err = Job::new("/nonexistent/movie.mkv").check_source().unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));
    }

    #[test]
    fn test_check_source_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Job::new(dir.path()).check_source().is_err());
    }

    #[test]
    fn test_scratch_name() {
        assert_eq!(scratch_name(Path::new("/a/b/movie.mkv")), PathBuf::from("movie.wav"));
        assert_eq!(scratch_name(Path::new("/")), PathBuf::from("audio.wav"));
    }

    #[test]
    fn test_builder_defaults() {
        let job = Job::new("x.mkv");
        assert_eq!(job.audio_track, 0);
        assert_eq!(job.offset, 0.0);
        assert_eq!(job.format, AudioFormat::PIPELINE);
        assert!(job.started.is_none());
        let job = job.audio_track(2).offset(-1.5);
        assert_eq!(job.audio_track, 2);
        assert_eq!(job.offset, -1.5);
    }
}
