use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::error::StorageError;
use crate::sanitize;

const WORK_DIR_NAME: &str = "work";
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Directory layout owned by one job:
///
/// ```text
/// <jobs root>/<base>-<millis>/          job directory
/// <jobs root>/<base>-<millis>/work/     extracted archive, removed on success
/// <jobs root>/<base>-<millis>/<base>.docx
/// ```
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    base_name: String,
    dir_name: String,
    job_dir: PathBuf,
    work_dir: PathBuf,
}

impl JobWorkspace {
    /// Creates a fresh job directory for `archive` under `jobs_root`.
    ///
    /// The directory is created with `create_dir`, so two jobs can never end
    /// up sharing one; on a name clash a numeric suffix is appended.
    pub async fn create(jobs_root: &Path, archive: &Path) -> Result<Self, StorageError> {
        let base_name = sanitize::archive_base_name(archive);
        let stamp = Utc::now().timestamp_millis();

        tokio::fs::create_dir_all(jobs_root)
            .await
            .map_err(|e| StorageError::CreateDirectory {
                path: jobs_root.to_path_buf(),
                source: e,
            })?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let dir_name = if attempt == 0 {
                format!("{}-{}", base_name, stamp)
            } else {
                format!("{}-{}_{}", base_name, stamp, attempt)
            };
            let job_dir = jobs_root.join(&dir_name);

            match tokio::fs::create_dir(&job_dir).await {
                Ok(()) => {
                    let work_dir = job_dir.join(WORK_DIR_NAME);
                    tokio::fs::create_dir(&work_dir).await.map_err(|e| {
                        StorageError::CreateDirectory {
                            path: work_dir.clone(),
                            source: e,
                        }
                    })?;
                    debug!(job_dir = %dir_name, "Job workspace created");
                    return Ok(Self {
                        base_name,
                        dir_name,
                        job_dir,
                        work_dir,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::CreateDirectory {
                        path: job_dir,
                        source: e,
                    })
                }
            }
        }

        Err(StorageError::CreateDirectory {
            path: jobs_root.join(format!("{}-{}", base_name, stamp)),
            source: std::io::Error::new(ErrorKind::AlreadyExists, "no free job directory name"),
        })
    }

    /// Sanitized archive stem; also the report's file stem.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Name of the job directory under the jobs root.
    pub fn dir_name(&self) -> &str {
        &self.dir_name
    }

    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.job_dir.join(format!("{}.docx", self.base_name))
    }

    /// Externally addressable path of the artifact, namespaced by job.
    pub fn public_path(&self, public_prefix: &str) -> String {
        format!(
            "{}/jobs/{}/{}.docx",
            public_prefix.trim_end_matches('/'),
            self.dir_name,
            self.base_name
        )
    }

    pub async fn remove_work_dir(&self) -> Result<(), StorageError> {
        remove_dir_if_exists(&self.work_dir).await
    }
}

pub async fn remove_dir_if_exists(path: &Path) -> Result<(), StorageError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::Remove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

pub async fn remove_file_if_exists(path: &Path) -> Result<(), StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::Remove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
