use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::builder::PossibleValuesParser;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use subz::{Ffmpeg, Job, LoggingConfig, Model, Report, TranscribeOptions, WhisperPipeline};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "subz", about = "Generate SRT subtitles for a media file")]
struct Cli {
    /// Media file to subtitle.
    #[arg(required_unless_present = "list_models")]
    file: Option<PathBuf>,

    /// Path to save the output subtitle file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Whisper model to use for transcription.
    #[arg(long, default_value = "large-v3", value_parser = PossibleValuesParser::new(Model::NAMES))]
    whisper_model: String,

    /// Audio track index to extract from the media file.
    #[arg(long, default_value_t = 0)]
    audio_track: u32,

    /// Time offset (in seconds) to apply to the subtitle start times.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset: f64,

    /// Enable verbose logging for debugging.
    #[arg(short, long)]
    verbose: bool,

    /// Language code (e.g. "en", "de") or "auto" for detection.
    #[arg(long, default_value = "auto")]
    language: String,

    /// Run on the CPU even when a GPU backend is compiled in.
    #[arg(long)]
    no_gpu: bool,

    /// GPU device ID.
    #[arg(long, default_value_t = 0)]
    gpu_device: u32,

    /// Number of threads (default: whisper's choice).
    #[arg(long)]
    threads: Option<u32>,

    /// Beam search size (default: greedy).
    #[arg(long)]
    beam_size: Option<u32>,

    /// Model cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// List known and cached models.
    #[arg(long)]
    list_models: bool,
}

impl Cli {
    fn options(&self) -> subz::Result<TranscribeOptions> {
        // PossibleValuesParser only lets known names through.
        let model = Model::parse_name(&self.whisper_model).unwrap_or_default();

        let mut opts = TranscribeOptions::new()
            .model(model)
            .language(&self.language)?
            .gpu(!self.no_gpu)
            .gpu_device(self.gpu_device);
        if let Some(n) = self.threads {
            opts = opts.n_threads(n)?;
        }
        if let Some(size) = self.beam_size {
            opts = opts.beam_size(size)?;
        }
        if let Some(dir) = &self.cache_dir {
            opts = opts.cache_dir(dir.clone());
        }
        Ok(opts)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let logging = subz::configure_logging(cli.verbose);
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&logging, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{}", failure_message(&e));
        std::process::exit(1);
    }
}

fn env_filter(logging: &LoggingConfig, rust_log: Option<&str>) -> EnvFilter {
    EnvFilter::new(logging.filter(rust_log))
}

fn success_message(report: &Report) -> String {
    format!(
        "Subtitles saved at '{}' (done in {} seconds)",
        report.destination.display(),
        report.elapsed.as_secs()
    )
}

fn failure_message(err: &subz::Error) -> String {
    format!("Error: {err}")
}

async fn run(cli: Cli) -> subz::Result<()> {
    let started = Instant::now();
    let opts = cli.options()?;

    if cli.list_models {
        list_models(&opts);
        return Ok(());
    }

    let Some(file) = cli.file.clone() else {
        return Err(subz::Error::InvalidOption("no input file given".into()));
    };

    let job = Job::new(file)
        .output(cli.output.clone())
        .audio_track(cli.audio_track)
        .offset(cli.offset)
        .started_at(started);
    job.check_source()?;

    let model_path = subz::model::ensure_model(opts.model, &opts.resolve_cache_dir()).await?;
    debug!(model = %opts.model, path = %model_path.display(), "model ready");

    let pipeline = WhisperPipeline::new(model_path, opts);
    let spinner = (!cli.verbose).then(|| spinner("Transcribing..."));
    let result = job.run(&Ffmpeg, &pipeline);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = result?;

    println!("{}", success_message(&report));
    Ok(())
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn list_models(opts: &TranscribeOptions) {
    println!("{:<16} SIZE", "MODEL");
    println!("{:<16} ----", "-----");
    for model in Model::ALL {
        println!("{:<16} {}", model.name(), model.size_hint());
    }
    println!("\nAliases: large = large-v3, turbo = large-v3-turbo");

    let cache_dir = opts.resolve_cache_dir();
    let cached = subz::model::list_cached_models(&cache_dir);
    if !cached.is_empty() {
        println!("\nCached models in {}:", cache_dir.display());
        for path in cached {
            let size = std::fs::metadata(&path)
                .map(|m| format_bytes(m.len()))
                .unwrap_or_default();
            println!(
                "  {} ({})",
                path.file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                size
            );
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1} GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.0} MB", bytes as f64 / 1_000_000.0)
    } else {
        format!("{:.0} KB", bytes as f64 / 1_000.0)
    }
}
