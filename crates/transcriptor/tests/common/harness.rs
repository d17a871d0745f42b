//! Test harness for isolated pipeline and queue runs.
//!
//! Each `TestHarness` owns a temporary data directory and a pair of fake
//! engines whose call counters tests can inspect.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use transcriptor::config::Config;
use transcriptor::pipeline::{Pipeline, PipelineConfig};
use transcriptor::processor::{DocumentAssembler, DocxAssembler};
use transcriptor::worker::JobQueue;
use transcriptor::TranscriptionService;

use super::builders::ScenarioBuilder;
use super::fakes::{FakeNormalizer, FakeTranscriber};

pub struct TestHarness {
    temp_dir: TempDir,
    /// Root of everything the engine writes.
    pub data_dir: PathBuf,
    /// Where test archives are created before submission.
    pub input_dir: PathBuf,
    pub normalizer: Arc<FakeNormalizer>,
    pub transcriber: Arc<FakeTranscriber>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_engines(FakeNormalizer::new(), FakeTranscriber::new())
    }

    pub fn with_engines(normalizer: FakeNormalizer, transcriber: FakeTranscriber) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let data_dir = temp_dir.path().join("data");
        let input_dir = temp_dir.path().join("input");
        std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");

        Self {
            temp_dir,
            data_dir,
            input_dir,
            normalizer: Arc::new(normalizer),
            transcriber: Arc::new(transcriber),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> Config {
        Config {
            data_directory: self.data_dir.clone(),
            ..Config::default()
        }
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.config().jobs_directory()
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline_with_assembler(Arc::new(DocxAssembler::new()))
    }

    pub fn pipeline_with_assembler(&self, assembler: Arc<dyn DocumentAssembler>) -> Pipeline {
        Pipeline::new(
            Arc::new(PipelineConfig::from_config(&self.config())),
            self.normalizer.clone(),
            self.transcriber.clone(),
            assembler,
        )
    }

    pub fn service(&self) -> TranscriptionService {
        TranscriptionService::with_pipeline(self.config(), self.pipeline(), JobQueue::new())
    }

    /// Writes `builder` as `<input_dir>/<name>`.
    pub fn write_archive(&self, name: &str, builder: &ScenarioBuilder) -> PathBuf {
        builder.write_zip(&self.input_dir.join(name))
    }

    /// Job directories currently under the jobs root.
    pub fn job_dirs(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(self.jobs_dir()) else {
            return Vec::new();
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
