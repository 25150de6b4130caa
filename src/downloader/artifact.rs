//! Artifact resolution after a successful fetch.

use crate::error::{Error, Result};
use crate::types::JobId;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Suffixes yt-dlp uses for in-progress and bookkeeping files
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp", ".tmp"];

/// Decide which file a finished job produced
///
/// The path reported by the fetcher wins when it exists. Otherwise the most
/// recently modified regular file in `output_dir` is used; concurrent jobs
/// sharing the directory can make that guess wrong, so the fallback is
/// logged.
pub(crate) async fn resolve_artifact(
    id: JobId,
    reported: Option<PathBuf>,
    output_dir: &Path,
) -> Result<PathBuf> {
    if let Some(path) = reported {
        if tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Ok(path);
        }
        tracing::warn!(
            job_id = %id,
            path = %path.display(),
            "Reported output file does not exist, scanning output directory"
        );
    } else {
        tracing::warn!(
            job_id = %id,
            "Fetcher reported no output path, scanning output directory"
        );
    }

    newest_file(output_dir).await?.ok_or_else(|| {
        Error::Download(format!(
            "no output file found in {}",
            output_dir.display()
        ))
    })
}

/// Most recently modified finished file directly inside `dir`
pub(crate) async fn newest_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut best: Option<(PathBuf, SystemTime)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            continue;
        }

        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let Ok(modified) = meta.modified() else {
            continue;
        };

        match &best {
            Some((_, best_time)) if modified <= *best_time => {}
            _ => best = Some((path, modified)),
        }
    }

    Ok(best.map(|(path, _)| path))
}
