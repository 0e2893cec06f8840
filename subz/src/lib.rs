//! Media file in, SRT subtitles out.
//!
//! **subz** extracts one audio track with ffmpeg, transcribes it with
//! whisper.cpp, tightens each segment to the speech it contains, and
//! writes the result as SRT.
//!
//! # Quick start
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> subz::Result<()> {
//! use subz::{Ffmpeg, Job, Model, TranscribeOptions, WhisperPipeline};
//!
//! let options = TranscribeOptions::new().model(Model::Small);
//! let model_path = subz::model::ensure_model(options.model, &options.resolve_cache_dir()).await?;
//!
//! let report = Job::new("talk.mkv")
//!     .offset(0.25)
//!     .run(&Ffmpeg, &WhisperPipeline::new(model_path, options))?;
//! println!("wrote {}", report.destination.display());
//! # Ok(())
//! # }
//! ```

pub mod align;
pub mod audio;
pub mod config;
pub mod device;
pub mod error;
pub mod job;
pub mod model;
pub mod pipeline;
pub mod srt;
pub mod time;
pub(crate) mod transcribe;
pub mod types;

pub use audio::{Extract, Ffmpeg};
pub use config::{
    configure_logging, AlignOptions, AudioFormat, Language, LoggingConfig, Model,
    TranscribeOptions,
};
pub use device::{Device, Precision};
pub use error::{Error, Result};
pub use job::{Job, Report};
pub use pipeline::{Pipeline, WhisperPipeline};
pub use srt::{to_srt, SubtitleEntry};
pub use types::{Segment, Transcript};
