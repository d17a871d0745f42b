//! Job progress broadcaster for real-time job status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::worker::job::{Job, JobPhase, JobResult, JobState};

/// Progress event for a job: a flattened snapshot taken right after a change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Unique job identifier.
    pub job_id: String,
    /// Name of the submitted archive.
    pub label: String,
    pub state: JobState,
    pub phase: JobPhase,
    pub progress: u8,
    pub items_done: usize,
    pub total_items: usize,
    /// Human-readable message describing current activity.
    pub message: String,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
    /// Set on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    /// Set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgressEvent {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            label: job.label.clone(),
            state: job.state,
            phase: job.phase,
            progress: job.progress,
            items_done: job.items_done,
            total_items: job.total_items,
            message: job.message.clone(),
            timestamp: job.updated_at,
            result: job.result.clone(),
            error: job.error.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Broadcasts job progress events for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new job progress broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::job::{JobId, JobPatch};

    #[test]
    fn test_broadcaster_creation() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let _rx = broadcaster.subscribe();
        assert_eq!(broadcaster.receiver_count(), 1);
    }

    #[test]
    fn test_send_without_receivers_is_silent() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let job = Job::new(JobId::from("job-0"), "a.zip");
        broadcaster.send(JobProgressEvent::from_job(&job));
    }

    #[test]
    fn test_broadcaster_send_receive() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        let mut job = Job::new(JobId::from("job-1"), "session.zip");
        job.start();
        job.apply(JobPatch::progress(15.0).with_total_items(3));

        broadcaster.send(JobProgressEvent::from_job(&job));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.job_id, "job-1");
        assert_eq!(received.label, "session.zip");
        assert_eq!(received.state, JobState::Processing);
        assert_eq!(received.progress, 15);
        assert_eq!(received.total_items, 3);
        assert!(!received.is_terminal());
    }

    #[test]
    fn test_completion_event_carries_result() {
        let mut job = Job::new(JobId::from("job-2"), "session.zip");
        job.start();
        job.finish(JobResult::new("/uploads/jobs/s/s.docx", "Scenario fully transcribed"));

        let event = JobProgressEvent::from_job(&job);
        assert!(event.is_terminal());
        assert_eq!(event.phase, JobPhase::Completed);
        assert_eq!(event.result.unwrap().artifact, "/uploads/jobs/s/s.docx");
        assert!(event.error.is_none());
    }

    #[test]
    fn test_failure_event_serialization() {
        let mut job = Job::new(JobId::from("job-3"), "session.zip");
        job.start();
        job.fail("scenario.xml not found");

        let json = serde_json::to_value(JobProgressEvent::from_job(&job)).unwrap();
        assert_eq!(json["jobId"], "job-3");
        assert_eq!(json["state"], "failed");
        assert_eq!(json["error"], "scenario.xml not found");
        assert!(json.get("result").is_none());
    }
}
