//! Single-worker FIFO job queue.
//!
//! The queue owns every [`Job`] record. Running jobs publish progress through
//! a [`JobUpdater`], which can only merge patches into its own job; all state
//! transitions happen here. At most one job executes at a time.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration as ChronoDuration, Utc};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};
use crate::error::QueueError;
use crate::worker::job::{Job, JobId, JobPatch, JobResult};

/// Outcome of a job body. The error string becomes the job's `error` verbatim.
pub type JobOutcome = Result<JobResult, String>;

/// Runnable body of a job, invoked once with the job's update handle.
pub type JobTask = Box<dyn FnOnce(JobUpdater) -> BoxFuture<'static, JobOutcome> + Send>;

#[derive(Default)]
struct QueueState {
    jobs: HashMap<JobId, Job>,
    tasks: HashMap<JobId, JobTask>,
    pending: VecDeque<JobId>,
    running: Option<JobId>,
}

struct QueueInner {
    state: Mutex<QueueState>,
    broadcaster: JobProgressBroadcaster,
}

/// Cheap to clone; all clones share the same queue.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::with_broadcaster(JobProgressBroadcaster::default())
    }

    pub fn with_broadcaster(broadcaster: JobProgressBroadcaster) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                broadcaster,
            }),
        }
    }

    /// Enqueues a job and returns its id immediately.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn submit<F, Fut>(&self, label: impl Into<String>, task: F) -> JobId
    where
        F: FnOnce(JobUpdater) -> Fut + Send + 'static,
        Fut: Future<Output = JobOutcome> + Send + 'static,
    {
        let boxed: JobTask = Box::new(move |updater| task(updater).boxed());
        self.submit_boxed(label.into(), boxed)
    }

    fn submit_boxed(&self, label: String, task: JobTask) -> JobId {
        let id = JobId::new();
        let job = Job::new(id.clone(), label);
        let event = JobProgressEvent::from_job(&job);

        {
            let mut state = self.lock_state();
            state.jobs.insert(id.clone(), job);
            state.tasks.insert(id.clone(), task);
            state.pending.push_back(id.clone());
            debug!(job_id = %id, queued = state.pending.len(), "Job queued");
        }

        self.inner.broadcaster.send(event);
        self.drain();
        id
    }

    /// Immutable snapshot of a job, or `None` for unknown ids.
    pub fn query(&self, id: &JobId) -> Option<Job> {
        self.lock_state().jobs.get(id).cloned()
    }

    /// Snapshots of all known jobs, oldest first.
    pub fn list(&self) -> Vec<Job> {
        let state = self.lock_state();
        let mut jobs: Vec<Job> = state.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs
    }

    /// Number of jobs waiting to run (excluding the running one).
    pub fn pending_len(&self) -> usize {
        self.lock_state().pending.len()
    }

    pub fn running(&self) -> Option<JobId> {
        self.lock_state().running.clone()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<JobProgressEvent> {
        self.inner.broadcaster.subscribe()
    }

    pub fn broadcaster(&self) -> &JobProgressBroadcaster {
        &self.inner.broadcaster
    }

    /// Waits until the job reaches a terminal state and returns its snapshot.
    pub async fn wait_for(&self, id: &JobId) -> Result<Job, QueueError> {
        // Subscribe before the first check so no terminal event is missed.
        let mut rx = self.subscribe();
        loop {
            match self.query(id) {
                None => return Err(QueueError::NotFound(id.to_string())),
                Some(job) if job.is_terminal() => return Ok(job),
                Some(_) => {}
            }

            match rx.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return Err(QueueError::Closed(id.to_string())),
            }
        }
    }

    /// Drops terminal job records last updated before `max_age` ago.
    /// Returns how many were removed.
    pub fn prune_finished(&self, max_age: std::time::Duration) -> usize {
        let Ok(max_age) = ChronoDuration::from_std(max_age) else {
            return 0;
        };
        let cutoff = Utc::now() - max_age;
        let mut state = self.lock_state();
        let before = state.jobs.len();
        state
            .jobs
            .retain(|_, job| !(job.is_terminal() && job.updated_at < cutoff));
        let removed = before - state.jobs.len();
        if removed > 0 {
            info!(removed, "Pruned finished jobs");
        }
        removed
    }

    /// Starts the next queued job unless one is already running.
    fn drain(&self) {
        let (id, task, event) = {
            let mut state = self.lock_state();
            if state.running.is_some() {
                return;
            }

            let mut next = None;
            while let Some(id) = state.pending.pop_front() {
                let Some(task) = state.tasks.remove(&id) else {
                    warn!(job_id = %id, "Queued job has no runnable body, skipping");
                    continue;
                };
                let Some(job) = state.jobs.get_mut(&id) else {
                    warn!(job_id = %id, "Queued job record vanished, skipping");
                    continue;
                };
                if !job.start() {
                    warn!(job_id = %id, state = %job.state, "Queued job is not startable, skipping");
                    continue;
                }
                let event = JobProgressEvent::from_job(job);
                state.running = Some(id.clone());
                next = Some((id, task, event));
                break;
            }

            match next {
                Some(next) => next,
                None => return,
            }
        };

        info!(job_id = %id, "Job started");
        self.inner.broadcaster.send(event);

        let queue = self.clone();
        tokio::spawn(async move {
            queue.execute(id, task).await;
        });
    }

    async fn execute(self, id: JobId, task: JobTask) {
        let updater = JobUpdater {
            queue: self.clone(),
            id: id.clone(),
        };

        // A panicking body surfaces as a JoinError instead of wedging the queue.
        let span = info_span!("job", job_id = %id);
        let outcome = match tokio::spawn(task(updater).instrument(span)).await {
            Ok(outcome) => outcome,
            Err(e) => Err(format!("Job task aborted: {}", e)),
        };

        self.complete(&id, outcome);
        self.drain();
    }

    fn complete(&self, id: &JobId, outcome: JobOutcome) {
        let event = {
            let mut state = self.lock_state();
            if state.running.as_ref() == Some(id) {
                state.running = None;
            }

            let Some(job) = state.jobs.get_mut(id) else {
                warn!(job_id = %id, "Finished job record vanished");
                return;
            };

            let transitioned = match outcome {
                Ok(result) => {
                    info!(job_id = %id, artifact = %result.artifact, "Job finished");
                    job.finish(result)
                }
                Err(err) => {
                    error!(job_id = %id, error = %err, "Job failed");
                    job.fail(err)
                }
            };
            if !transitioned {
                warn!(job_id = %id, state = %job.state, "Ignoring second terminal transition");
                return;
            }
            JobProgressEvent::from_job(job)
        };

        self.inner.broadcaster.send(event);
    }

    fn apply_patch(&self, id: &JobId, patch: JobPatch) {
        let event = {
            let mut state = self.lock_state();
            let Some(job) = state.jobs.get_mut(id) else {
                return;
            };
            if !job.apply(patch) {
                return;
            }
            JobProgressEvent::from_job(job)
        };

        self.inner.broadcaster.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Job queue lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    #[cfg(test)]
    fn remove_record(&self, id: &JobId) {
        self.lock_state().jobs.remove(id);
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Patch-only handle given to a running job.
#[derive(Clone)]
pub struct JobUpdater {
    queue: JobQueue,
    id: JobId,
}

impl JobUpdater {
    pub fn job_id(&self) -> &JobId {
        &self.id
    }

    /// Merges `patch` into the job. Ignored once the job is terminal.
    pub fn update(&self, patch: JobPatch) {
        self.queue.apply_patch(&self.id, patch);
    }
}
