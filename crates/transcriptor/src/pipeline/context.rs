use std::path::{Path, PathBuf};

use crate::processor::report::{AssembledReport, ReportSection};
use crate::storage::JobWorkspace;

use super::error::PipelineWarning;

pub struct PipelineContext {
    // Input
    pub archive: PathBuf,
    /// File name the archive was submitted under; names the job directory
    /// and the report.
    pub source_name: String,

    // Set once the job directory exists
    pub workspace: Option<JobWorkspace>,

    // Resolution results
    pub scenario_path: Option<PathBuf>,
    pub index_path: Option<PathBuf>,
    pub total_items: usize,

    // Per-item loop
    pub items_done: usize,
    pub transcriptions_run: usize,
    pub sections: Vec<ReportSection>,

    // Assembly result
    pub report: Option<AssembledReport>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        let archive = archive.into();
        let source_name = file_name(&archive);
        Self {
            archive,
            source_name,
            workspace: None,
            scenario_path: None,
            index_path: None,
            total_items: 0,
            items_done: 0,
            transcriptions_run: 0,
            sections: Vec::new(),
            report: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
