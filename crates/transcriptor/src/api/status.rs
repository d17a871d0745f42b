use serde::{Deserialize, Serialize};

use crate::worker::job::{Job, JobPhase, JobResult, JobState};

/// Client-facing projection of a job.
///
/// `error` is always present (`null` unless failed); `result` only appears
/// once the job finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub id: String,
    pub state: JobState,
    pub phase: JobPhase,
    pub progress: u8,
    pub items_done: usize,
    pub total_items: usize,
    pub message: String,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

impl From<&Job> for StatusResponse {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            state: job.state,
            phase: job.phase,
            progress: job.progress,
            items_done: job.items_done,
            total_items: job.total_items,
            message: job.message.clone(),
            error: job.error.clone(),
            result: job.result.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::job::JobId;

    #[test]
    fn test_queued_projection() {
        let job = Job::new(JobId::from("abc"), "session.zip");
        let json = serde_json::to_value(StatusResponse::from(&job)).unwrap();

        assert_eq!(json["state"], "queued");
        assert_eq!(json["progress"], 0);
        assert_eq!(json["itemsDone"], 0);
        assert_eq!(json["totalItems"], 0);
        assert!(json["error"].is_null());
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_finished_projection_has_result() {
        let mut job = Job::new(JobId::from("abc"), "session.zip");
        job.start();
        job.finish(JobResult::new("/uploads/jobs/a-1/a.docx", "done"));
        let json = serde_json::to_value(StatusResponse::from(&job)).unwrap();

        assert_eq!(json["state"], "finished");
        assert_eq!(json["progress"], 100);
        assert_eq!(json["result"]["artifact"], "/uploads/jobs/a-1/a.docx");
    }
}
