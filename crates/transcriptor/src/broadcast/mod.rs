//! Broadcasting of job progress for anything that wants to follow jobs live
//! instead of polling.

pub mod job_progress;

pub use job_progress::{JobProgressBroadcaster, JobProgressEvent};
