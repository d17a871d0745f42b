//! In-process stand-ins for the external engines.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use transcriptor::error::{AssemblyError, EngineError};
use transcriptor::processor::report::ReportSection;
use transcriptor::processor::{
    normalized_path, transcript_path, AudioNormalizer, DocumentAssembler, DocxAssembler,
    TranscriptionEngine,
};

/// Copies the source to `<stem>.san.wav`, or fails for every call.
#[derive(Default)]
pub struct FakeNormalizer {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioNormalizer for FakeNormalizer {
    async fn normalize(&self, source: &Path) -> Result<PathBuf, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EngineError::NonZeroExit {
                program: "ffmpeg".to_string(),
                code: 1,
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        let output = normalized_path(source);
        tokio::fs::copy(source, &output)
            .await
            .map_err(|e| EngineError::Wait {
                program: "ffmpeg".to_string(),
                source: e,
            })?;
        Ok(output)
    }
}

/// Writes `<stem>.txt` with a deterministic two-line transcript. Audio whose
/// file name contains one of the failing markers exits non-zero instead.
#[derive(Default)]
pub struct FakeTranscriber {
    calls: AtomicUsize,
    failing: HashSet<String>,
}

impl FakeTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(markers: &[&str]) -> Self {
        Self {
            failing: markers.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Transcript text produced for `call{n}.wav`.
    pub fn expected_text(n: usize) -> String {
        format!("QSL unit {} copied\nen route to grid 7", n)
    }
}

#[async_trait]
impl TranscriptionEngine for FakeTranscriber {
    async fn transcribe(&self, audio: &Path, output_dir: &Path) -> Result<PathBuf, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.failing.iter().any(|marker| name.contains(marker.as_str())) {
            return Err(EngineError::NonZeroExit {
                program: "whisper".to_string(),
                code: 1,
                stderr: "RuntimeError: CUDA out of memory".to_string(),
            });
        }

        let n: usize = name
            .trim_start_matches("call")
            .split('.')
            .next()
            .and_then(|digits| digits.parse().ok())
            .unwrap_or(0);
        let output = transcript_path(audio, output_dir);
        tokio::fs::write(&output, format!("  {}  \n", Self::expected_text(n)))
            .await
            .map_err(|e| EngineError::Wait {
                program: "whisper".to_string(),
                source: e,
            })?;
        Ok(output)
    }
}

/// Fails full assembly, delegates the fallback to the real writer.
#[derive(Default)]
pub struct FailingAssembler {
    inner: DocxAssembler,
    fail_fallback: bool,
}

impl FailingAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fallback fails as well.
    pub fn always() -> Self {
        Self {
            fail_fallback: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl DocumentAssembler for FailingAssembler {
    async fn assemble(&self, _sections: &[ReportSection], _output: &Path) -> Result<(), AssemblyError> {
        Err(AssemblyError::WritePart {
            part: "word/document.xml".to_string(),
            message: "simulated failure".to_string(),
        })
    }

    async fn assemble_fallback(&self, message: &str, output: &Path) -> Result<(), AssemblyError> {
        if self.fail_fallback {
            return Err(AssemblyError::Finish {
                path: output.to_path_buf(),
                message: "simulated failure".to_string(),
            });
        }
        self.inner.assemble_fallback(message, output).await
    }
}
