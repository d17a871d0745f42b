pub mod api;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod storage;
pub mod worker;

pub use api::{ApiResponse, StatusResponse, TranscriptionService};
pub use broadcast::{JobProgressBroadcaster, JobProgressEvent};
pub use config::{load_config, load_default_config, Config};
pub use error::{
    ArchiveError, AssemblyError, ConfigError, DescriptorError, EngineError, QueueError, Result,
    StorageError, TranscriptorError,
};
pub use pipeline::{Pipeline, PipelineConfig, PipelineContext, PipelineError};
pub use storage::HistoryEntry;
pub use worker::{Job, JobId, JobPatch, JobPhase, JobQueue, JobResult, JobState};
