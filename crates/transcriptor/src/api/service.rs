use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::error::{QueueError, Result};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::storage::{self, HistoryEntry};
use crate::worker::job::{JobId, JobResult, JobState};
use crate::worker::queue::JobQueue;

use super::status::StatusResponse;

/// Entry point for clients: stages archives, queues pipeline runs and
/// answers status and history queries.
#[derive(Clone)]
pub struct TranscriptionService {
    config: Arc<Config>,
    pipeline: Arc<Pipeline>,
    queue: JobQueue,
}

impl TranscriptionService {
    pub fn new(config: Config) -> Self {
        let pipeline = Pipeline::from_config(Arc::new(PipelineConfig::from_config(&config)));
        Self::with_pipeline(config, pipeline, JobQueue::new())
    }

    pub fn with_pipeline(config: Config, pipeline: Pipeline, queue: JobQueue) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            queue,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Asynchronous submission: stages `archive` into the inbox and returns
    /// the new job's id without waiting for it to run.
    pub async fn submit_archive(&self, archive: &Path) -> Result<JobId> {
        let staged = storage::stage_archive(&self.config.inbox_directory(), archive).await?;
        let source_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| archive.display().to_string());
        Ok(self.submit_staged(staged, source_name))
    }

    /// Queues a pipeline run over an archive already owned by the service.
    /// The report is named after `source_name`; the archive is deleted when
    /// the job finishes.
    pub fn submit_staged(&self, staged: PathBuf, source_name: String) -> JobId {
        let pipeline = Arc::clone(&self.pipeline);
        let label = source_name.clone();

        let id = self.queue.submit(label, move |updater| async move {
            let (result, _ctx) = pipeline.run_as(&staged, &source_name, &updater).await;
            result.map_err(|e| e.to_string())
        });
        info!(job_id = %id, "Archive submitted");
        id
    }

    /// Synchronous submission: runs the archive through the queue and waits
    /// for its terminal state.
    pub async fn transcribe_and_wait(&self, archive: &Path) -> Result<JobResult> {
        let id = self.submit_archive(archive).await?;
        let job = self.queue.wait_for(&id).await?;

        match (job.state, job.result) {
            (JobState::Finished, Some(result)) => Ok(result),
            _ => Err(QueueError::JobFailed {
                id: id.to_string(),
                error: job.error.unwrap_or_else(|| "unknown error".to_string()),
            }
            .into()),
        }
    }

    pub fn status(&self, id: &JobId) -> std::result::Result<StatusResponse, QueueError> {
        self.queue
            .query(id)
            .map(|job| StatusResponse::from(&job))
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    /// Status of every known job, oldest first.
    pub fn statuses(&self) -> Vec<StatusResponse> {
        self.queue.list().iter().map(StatusResponse::from).collect()
    }

    /// Previously produced reports, newest first.
    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        let limit = limit.unwrap_or(self.config.history_limit);
        let entries = storage::list_history(
            &self.config.jobs_directory(),
            &self.config.public_prefix,
            limit,
        )
        .await?;
        Ok(entries)
    }

    /// Maps a public artifact path back to the file on disk, if it exists.
    pub async fn resolve_artifact(&self, public_path: &str) -> Option<PathBuf> {
        let path = storage::resolve_public_path(
            &self.config.jobs_directory(),
            &self.config.public_prefix,
            public_path,
        )?;
        tokio::fs::metadata(&path)
            .await
            .is_ok_and(|meta| meta.is_file())
            .then_some(path)
    }
}
