//! The transcription pipeline: archive in, DOCX report out.

pub mod config;
pub mod context;
pub mod error;
pub mod item;
pub mod progress;
pub mod runner;

pub use config::{PipelineConfig, COMPLETION_MESSAGE};
pub use context::PipelineContext;
pub use error::{PipelineError, PipelineWarning};
pub use item::{ItemOutcome, ItemProcessor};
pub use progress::{item_progress, NoopProgress, ProgressReporter, RecordingProgress};
pub use runner::Pipeline;
