pub mod archive;
pub mod command;
pub mod descriptor;
pub mod docx;
pub mod normalizer;
pub mod report;
pub mod scenario;
pub mod transcriber;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{AssemblyError, EngineError};

pub use archive::{extract_archive, ExtractionSummary};
pub use command::{run_command, CommandOutput, CommandSpec};
pub use descriptor::{Descriptor, Element};
pub use docx::{read_docx_text, DocxAssembler};
pub use normalizer::{normalized_path, FfmpegNormalizer};
pub use report::{ReportSection, ENGINE_FAILURE_SENTINEL, MISSING_AUDIO_SENTINEL};
pub use scenario::ItemInfo;
pub use transcriber::{transcript_path, WhisperTranscriber};

/// Converts an audio file into the canonical waveform the transcriber expects.
#[async_trait]
pub trait AudioNormalizer: Send + Sync {
    /// Returns the path of the normalized file.
    async fn normalize(&self, source: &Path) -> Result<PathBuf, EngineError>;
}

/// Speech-to-text engine writing `<audio stem>.txt` into an output directory.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Returns the path of the transcript it wrote.
    async fn transcribe(&self, audio: &Path, output_dir: &Path) -> Result<PathBuf, EngineError>;
}

/// Serializes report sections into one artifact.
#[async_trait]
pub trait DocumentAssembler: Send + Sync {
    async fn assemble(&self, sections: &[ReportSection], output: &Path) -> Result<(), AssemblyError>;

    /// Minimal one-paragraph document used when `assemble` fails.
    async fn assemble_fallback(&self, message: &str, output: &Path) -> Result<(), AssemblyError>;
}
