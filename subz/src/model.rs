use std::io::Write;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::Model;
use crate::error::{Error, Result};

const MODEL_REPOSITORY: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Anything smaller than this is an error page, not ggml weights.
const MIN_MODEL_BYTES: u64 = 1_000_000;

/// Where `model` lives inside `cache_dir`.
pub fn model_path(model: Model, cache_dir: &Path) -> PathBuf {
    cache_dir.join(model.filename())
}

/// Return the cached weights for `model`, fetching them first if needed.
pub async fn ensure_model(model: Model, cache_dir: &Path) -> Result<PathBuf> {
    let path = model_path(model, cache_dir);
    if path.is_file() {
        debug!(path = %path.display(), "model already cached");
        return Ok(path);
    }

    std::fs::create_dir_all(cache_dir).map_err(|e| {
        Error::Model(format!(
            "cannot create model cache {}: {e}",
            cache_dir.display()
        ))
    })?;

    let url = format!("{MODEL_REPOSITORY}/{}", model.filename());
    info!(%model, %url, "fetching model");
    fetch(&url, &path).await?;
    Ok(path)
}

/// Stream `url` into `<dest>.part`, then move it into place.
async fn fetch(url: &str, dest: &Path) -> Result<()> {
    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| Error::ModelDownload(format!("HTTP error: {e}")))?;

    let expected = response.content_length();
    let bar = ProgressBar::new(expected.unwrap_or(0));
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .map_err(|e| Error::ModelDownload(format!("progress template: {e}")))?
            .progress_chars("#>-"),
    );
    let name = dest
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    bar.set_message(format!("Downloading {name}"));

    let partial = dest.with_extension("bin.part");
    let mut file = std::fs::File::create(&partial)?;
    let mut body = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        written += chunk.len() as u64;
        bar.set_position(written);
    }
    file.flush()?;
    drop(file);

    if written < MIN_MODEL_BYTES {
        std::fs::remove_file(&partial).ok();
        bar.abandon();
        return Err(Error::ModelDownload(format!(
            "downloaded file too small ({written} bytes) — likely an error page"
        )));
    }

    std::fs::rename(&partial, dest)?;
    bar.finish_with_message(format!("Downloaded {name}"));

    if let Some(expected) = expected.filter(|&n| n != written) {
        warn!(expected, actual = written, "size mismatch — model may be corrupt");
    }
    info!(path = %dest.display(), size = written, "model saved");
    Ok(())
}

/// ggml weight files already in `cache_dir`. Partial downloads are skipped.
pub fn list_cached_models(cache_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return Vec::new();
    };

    let mut found: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "bin"))
        .collect();
    found.sort();
    found
}
