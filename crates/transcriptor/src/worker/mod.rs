pub mod job;
pub mod queue;

pub use job::{Job, JobId, JobPatch, JobPhase, JobResult, JobState};
pub use queue::{JobOutcome, JobQueue, JobTask, JobUpdater};
