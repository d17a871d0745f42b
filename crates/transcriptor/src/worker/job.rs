use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque job handle handed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle state. `Finished` and `Failed` are absorbing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Finished,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::Processing)
                | (JobState::Processing, JobState::Finished)
                | (JobState::Processing, JobState::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Queued => write!(f, "queued"),
            JobState::Processing => write!(f, "processing"),
            JobState::Finished => write!(f, "finished"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Finer-grained activity marker published alongside numeric progress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    Extracting,
    Resolving,
    Transcribing,
    Assembling,
    Finalizing,
    Completed,
    Failed,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::Queued => write!(f, "Queued"),
            JobPhase::Extracting => write!(f, "Extracting archive"),
            JobPhase::Resolving => write!(f, "Resolving scenario"),
            JobPhase::Transcribing => write!(f, "Transcribing"),
            JobPhase::Assembling => write!(f, "Assembling report"),
            JobPhase::Finalizing => write!(f, "Finalizing"),
            JobPhase::Completed => write!(f, "Completed"),
            JobPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Output of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    /// Externally addressable path of the report.
    pub artifact: String,
    pub message: String,
}

impl JobResult {
    pub fn new(artifact: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
            message: message.into(),
        }
    }
}

/// Partial update published by a running job. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub progress: Option<f64>,
    pub items_done: Option<usize>,
    pub total_items: Option<usize>,
    pub phase: Option<JobPhase>,
    pub message: Option<String>,
}

impl JobPatch {
    pub fn progress(value: f64) -> Self {
        Self {
            progress: Some(value),
            ..Self::default()
        }
    }

    pub fn phase(phase: JobPhase, message: impl Into<String>) -> Self {
        Self {
            phase: Some(phase),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, value: f64) -> Self {
        self.progress = Some(value);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_items(mut self, done: usize, total: usize) -> Self {
        self.items_done = Some(done);
        self.total_items = Some(total);
        self
    }

    pub fn with_total_items(mut self, total: usize) -> Self {
        self.total_items = Some(total);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Snapshot of one job. The queue owns the live record and only hands out
/// clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    /// Display name of the submitted archive.
    pub label: String,
    pub state: JobState,
    pub phase: JobPhase,
    pub progress: u8,
    pub items_done: usize,
    pub total_items: usize,
    pub message: String,
    pub result: Option<JobResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, label: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            label: label.into(),
            state: JobState::Queued,
            phase: JobPhase::Queued,
            progress: 0,
            items_done: 0,
            total_items: 0,
            message: "Job queued for processing".to_string(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Queued -> Processing. Returns false if the job was not queued.
    pub fn start(&mut self) -> bool {
        if !self.state.can_transition_to(JobState::Processing) {
            return false;
        }
        self.state = JobState::Processing;
        self.message = "Job started".to_string();
        self.touch();
        true
    }

    /// Merges a patch into a processing job. Returns whether anything changed.
    ///
    /// Progress is clamped to `0..=100`, rounded, and never lowered.
    /// `items_done` never exceeds `total_items`.
    pub fn apply(&mut self, patch: JobPatch) -> bool {
        if self.state != JobState::Processing || patch.is_empty() {
            return false;
        }

        if let Some(progress) = patch.progress {
            let next = clamp_progress(progress);
            if next > self.progress {
                self.progress = next;
            }
        }
        if let Some(total) = patch.total_items {
            self.total_items = total;
        }
        if let Some(done) = patch.items_done {
            self.items_done = done;
        }
        self.items_done = self.items_done.min(self.total_items);
        if let Some(phase) = patch.phase {
            self.phase = phase;
        }
        if let Some(message) = patch.message {
            self.message = message;
        }

        self.touch();
        true
    }

    /// Processing -> Finished.
    pub fn finish(&mut self, result: JobResult) -> bool {
        if !self.state.can_transition_to(JobState::Finished) {
            return false;
        }
        self.state = JobState::Finished;
        self.phase = JobPhase::Completed;
        self.progress = 100;
        self.message = result.message.clone();
        self.result = Some(result);
        self.touch();
        true
    }

    /// Processing -> Failed.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if !self.state.can_transition_to(JobState::Failed) {
            return false;
        }
        self.state = JobState::Failed;
        self.phase = JobPhase::Failed;
        self.message = "Processing failed".to_string();
        self.error = Some(error.into());
        self.touch();
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn clamp_progress(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}
