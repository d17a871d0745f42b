//! Listing of produced reports, read straight from the jobs directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::StorageError;
use crate::sanitize;

pub const MAX_HISTORY_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Job directory name.
    pub job_id: String,
    pub file: String,
    pub url: String,
    pub size: u64,
    pub size_human: String,
    pub modified: DateTime<Utc>,
}

/// Reports under `<jobs_dir>/<job>/*.docx`, newest first, at most
/// `min(limit, MAX_HISTORY_LIMIT)` entries. A missing jobs directory yields
/// an empty list.
pub async fn list_history(
    jobs_dir: &Path,
    public_prefix: &str,
    limit: usize,
) -> Result<Vec<HistoryEntry>, StorageError> {
    let jobs_dir = jobs_dir.to_path_buf();
    let prefix = public_prefix.trim_end_matches('/').to_string();
    let limit = limit.min(MAX_HISTORY_LIMIT);

    let dir_for_error = jobs_dir.clone();
    tokio::task::spawn_blocking(move || scan_reports(&jobs_dir, &prefix, limit))
        .await
        .map_err(|e| StorageError::List {
            path: dir_for_error,
            source: std::io::Error::other(e.to_string()),
        })?
}

fn scan_reports(
    jobs_dir: &Path,
    prefix: &str,
    limit: usize,
) -> Result<Vec<HistoryEntry>, StorageError> {
    if !jobs_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(jobs_dir).min_depth(2).max_depth(2) {
        let entry = entry.map_err(|e| StorageError::List {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| jobs_dir.to_path_buf()),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory loop")),
        })?;
        if !entry.file_type().is_file() || !is_docx(entry.path()) {
            continue;
        }

        let Some(job_id) = parent_name(entry.path()) else {
            continue;
        };
        let file = entry.file_name().to_string_lossy().into_owned();
        let metadata = entry.metadata().map_err(|e| StorageError::List {
            path: entry.path().to_path_buf(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("metadata unavailable")),
        })?;
        let modified: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        entries.push(HistoryEntry {
            url: format!("{}/jobs/{}/{}", prefix, job_id, file),
            job_id,
            file,
            size: metadata.len(),
            size_human: sanitize::human_size(metadata.len()),
            modified,
        });
    }

    entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.job_id.cmp(&a.job_id)));
    entries.truncate(limit);
    Ok(entries)
}

fn is_docx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"))
}

fn parent_name(path: &Path) -> Option<String> {
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
}

/// Resolves a public artifact URL back to a file under `jobs_dir`.
/// Returns `None` for anything outside the `<prefix>/jobs/<dir>/<file>` shape.
pub fn resolve_public_path(jobs_dir: &Path, public_prefix: &str, url: &str) -> Option<PathBuf> {
    let prefix = format!("{}/jobs/", public_prefix.trim_end_matches('/'));
    let rest = url.strip_prefix(&prefix)?;
    let (dir, file) = rest.split_once('/')?;
    let safe = |s: &str| !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\']);
    (safe(dir) && safe(file)).then(|| jobs_dir.join(dir).join(file))
}
