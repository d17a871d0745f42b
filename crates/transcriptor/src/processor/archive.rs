use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ArchiveError;

/// Summary of one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub files: usize,
    pub directories: usize,
    /// Entries whose names would escape the destination.
    pub skipped: usize,
}

/// Unpacks `archive` into `destination` on the blocking pool.
pub async fn extract_archive(
    archive: &Path,
    destination: &Path,
) -> Result<ExtractionSummary, ArchiveError> {
    let archive = archive.to_path_buf();
    let destination = destination.to_path_buf();
    tokio::task::spawn_blocking(move || extract_archive_blocking(&archive, &destination))
        .await
        .map_err(|e| ArchiveError::Join(e.to_string()))?
}

pub fn extract_archive_blocking(
    archive: &Path,
    destination: &Path,
) -> Result<ExtractionSummary, ArchiveError> {
    let file = File::open(archive).map_err(|e| ArchiveError::Open {
        path: archive.to_path_buf(),
        source: e,
    })?;

    let mut zip = zip::ZipArchive::new(file).map_err(|e| ArchiveError::Invalid {
        path: archive.to_path_buf(),
        message: e.to_string(),
    })?;

    std::fs::create_dir_all(destination).map_err(|e| ArchiveError::Write {
        path: destination.to_path_buf(),
        source: e,
    })?;

    let mut summary = ExtractionSummary::default();

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| ArchiveError::Extract {
            entry: format!("#{}", index),
            message: e.to_string(),
        })?;

        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = %entry.name(), "Skipping archive entry with unsafe path");
            summary.skipped += 1;
            continue;
        };
        let target: PathBuf = destination.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| ArchiveError::Write {
                path: target.clone(),
                source: e,
            })?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut out = File::create(&target).map_err(|e| ArchiveError::Write {
            path: target.clone(),
            source: e,
        })?;
        io::copy(&mut entry, &mut out).map_err(|e| ArchiveError::Extract {
            entry: entry.name().to_string(),
            message: e.to_string(),
        })?;
        summary.files += 1;
    }

    debug!(
        files = summary.files,
        directories = summary.directories,
        skipped = summary.skipped,
        "Archive extracted"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(*name, SimpleFileOptions::default())
                    .unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(content).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[tokio::test]
    async fn test_extracts_nested_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("session.zip");
        build_zip(
            &archive,
            &[
                ("Export/", b""),
                ("Export/Scenario.XML", b"<Scenario/>"),
                ("Export/Items/Item1/audio.wav", b"RIFF"),
            ],
        );

        let out = dir.path().join("work");
        let summary = extract_archive(&archive, &out).await.unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(
            std::fs::read_to_string(out.join("Export/Scenario.XML")).unwrap(),
            "<Scenario/>"
        );
        assert!(out.join("Export/Items/Item1/audio.wav").is_file());
    }

    #[test]
    fn test_skips_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        build_zip(&archive, &[("../escape.txt", b"x"), ("ok.txt", b"y")]);

        let out = dir.path().join("work");
        let summary = extract_archive_blocking(&archive, &out).unwrap();

        assert_eq!(summary.files, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!dir.path().join("escape.txt").exists());
        assert!(out.join("ok.txt").exists());
    }

    #[test]
    fn test_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("fake.zip");
        std::fs::write(&archive, b"definitely not a zip").unwrap();

        let result = extract_archive_blocking(&archive, &dir.path().join("work"));
        assert!(matches!(result, Err(ArchiveError::Invalid { .. })));
    }

    #[test]
    fn test_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            extract_archive_blocking(&dir.path().join("nope.zip"), &dir.path().join("work"));
        assert!(matches!(result, Err(ArchiveError::Open { .. })));
    }
}
