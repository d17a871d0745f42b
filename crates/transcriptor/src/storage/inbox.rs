use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::error::StorageError;
use crate::sanitize;

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

/// Copies an archive into the inbox as `<base>-<millis>.zip`.
///
/// The pipeline deletes its input on success, so jobs always run on a
/// staged copy, never on the caller's file.
pub async fn stage_archive(inbox_dir: &Path, source: &Path) -> Result<PathBuf, StorageError> {
    if !is_zip(source) {
        return Err(StorageError::UnsupportedArchive(source.to_path_buf()));
    }
    match tokio::fs::metadata(source).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Err(StorageError::ArchiveNotFound(source.to_path_buf())),
    }

    tokio::fs::create_dir_all(inbox_dir)
        .await
        .map_err(|e| StorageError::CreateDirectory {
            path: inbox_dir.to_path_buf(),
            source: e,
        })?;

    let name = format!(
        "{}-{}.zip",
        sanitize::archive_base_name(source),
        Utc::now().timestamp_millis()
    );
    let mut target = inbox_dir.join(name);
    if tokio::fs::try_exists(&target).await.unwrap_or(false) {
        target = find_unique_filename(&target).await;
    }

    tokio::fs::copy(source, &target)
        .await
        .map_err(|e| StorageError::CopyFile {
            from: source.to_path_buf(),
            to: target.clone(),
            source: e,
        })?;

    info!(
        archive = %sanitize::redact_path(source),
        staged = %sanitize::redact_path(&target),
        "Archive staged"
    );
    Ok(target)
}

/// `name.zip` -> `name_1.zip`, `name_2.zip`, ... until a free name is found.
async fn find_unique_filename(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "archive".to_string());

    let extension = path
        .extension()
        .map(|s| format!(".{}", s.to_string_lossy()))
        .unwrap_or_default();

    let parent = path.parent().unwrap_or(path);

    let mut counter = 1;
    loop {
        let candidate = parent.join(format!("{}_{}{}", stem, counter, extension));
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stage_copies_with_timestamped_name() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("My Session.ZIP");
        std::fs::write(&source, b"PK").unwrap();
        let inbox = temp.path().join("inbox");

        let staged = stage_archive(&inbox, &source).await.unwrap();

        assert!(source.exists());
        assert_eq!(staged.parent(), Some(inbox.as_path()));
        let name = staged.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("My_Session-"));
        assert!(name.ends_with(".zip"));
        assert_eq!(std::fs::read(&staged).unwrap(), b"PK");
    }

    #[tokio::test]
    async fn test_stage_rejects_other_extensions() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("session.tar.gz");
        std::fs::write(&source, b"x").unwrap();

        let result = stage_archive(&temp.path().join("inbox"), &source).await;
        assert!(matches!(result, Err(StorageError::UnsupportedArchive(_))));
    }

    #[tokio::test]
    async fn test_stage_missing_source() {
        let temp = tempfile::tempdir().unwrap();
        let result =
            stage_archive(&temp.path().join("inbox"), &temp.path().join("gone.zip")).await;
        assert!(matches!(result, Err(StorageError::ArchiveNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_unique_filename() {
        let temp = tempfile::tempdir().unwrap();
        let taken = temp.path().join("a.zip");
        std::fs::write(&taken, b"x").unwrap();
        std::fs::write(temp.path().join("a_1.zip"), b"x").unwrap();

        assert_eq!(find_unique_filename(&taken).await, temp.path().join("a_2.zip"));
    }
}
