use std::path::PathBuf;

use thiserror::Error;

use crate::error::{ArchiveError, AssemblyError, DescriptorError, StorageError};

/// Fatal pipeline failures. The `Display` text becomes the job's error.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to prepare job workspace: {0}")]
    Workspace(#[source] StorageError),

    #[error("Failed to extract archive: {0}")]
    Extraction(#[from] ArchiveError),

    #[error("scenario.xml not found in archive")]
    ScenarioNotFound,

    #[error("Failed to read scenario descriptor: {0}")]
    Scenario(#[source] DescriptorError),

    #[error("Scenario descriptor '{}' does not reference an item index", .path.display())]
    IndexReferenceMissing { path: PathBuf },

    #[error("Item index not found: {}", .path.display())]
    IndexNotFound { path: PathBuf },

    #[error("Failed to read item index: {0}")]
    Index(#[source] DescriptorError),

    #[error("Item index '{}' lists no items", .path.display())]
    EmptyIndex { path: PathBuf },

    #[error("Failed to write report: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Background {task} task failed: {error}")]
    BackgroundTask { task: &'static str, error: String },
}

/// Recoverable problems; recorded and logged, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    ItemSkipped { item: usize },
    DescriptorUnreadable { item: usize, error: String },
    AudioMissing { item: usize },
    AudioOutsideWorkDir { item: usize, reference: PathBuf },
    NormalizationFailed { item: usize, error: String },
    TranscriptionFailed { item: usize, error: String },
    TranscriptUnusable { item: usize },
    AssemblyFallback { error: String },
    CleanupFailed { path: PathBuf, error: String },
}

impl PipelineWarning {
    pub fn item(&self) -> Option<usize> {
        match self {
            PipelineWarning::ItemSkipped { item }
            | PipelineWarning::DescriptorUnreadable { item, .. }
            | PipelineWarning::AudioMissing { item }
            | PipelineWarning::AudioOutsideWorkDir { item, .. }
            | PipelineWarning::NormalizationFailed { item, .. }
            | PipelineWarning::TranscriptionFailed { item, .. }
            | PipelineWarning::TranscriptUnusable { item } => Some(*item),
            PipelineWarning::AssemblyFallback { .. } | PipelineWarning::CleanupFailed { .. } => {
                None
            }
        }
    }
}
