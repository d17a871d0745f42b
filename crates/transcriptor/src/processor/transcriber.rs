use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, info_span, Instrument};

use crate::config::TranscriberConfig;
use crate::error::EngineError;
use crate::processor::command::{run_command, CommandSpec};
use crate::processor::TranscriptionEngine;
use crate::sanitize;

/// Path of the transcript the engine writes for `audio` into `output_dir`.
pub fn transcript_path(audio: &Path, output_dir: &Path) -> PathBuf {
    let stem = audio
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    output_dir.join(format!("{}.txt", stem))
}

/// Runs the whisper command-line transcriber.
pub struct WhisperTranscriber {
    config: TranscriberConfig,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    pub fn command(&self, audio: &Path, output_dir: &Path) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.config.binary)
            .arg(audio)
            .args(["--model", self.config.model.as_str()])
            .args(["--language", self.config.language.as_str()])
            .args(["--fp16", if self.config.fp16 { "True" } else { "False" }])
            .arg("--output_dir")
            .arg(output_dir)
            .args(["--output_format", "txt"]);

        if let Some(model_dir) = &self.config.model_directory {
            spec = spec.arg("--model_dir").arg(model_dir);
        }
        if let Some(prompt) = self.config.prompt() {
            spec = spec.args(["--initial_prompt", prompt]);
        }

        spec.timeout(self.config.timeout())
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path, output_dir: &Path) -> Result<PathBuf, EngineError> {
        let spec = self.command(audio, output_dir);
        let program = spec.display_name();
        let expected = transcript_path(audio, output_dir);

        let span = info_span!(
            "transcribe",
            file = %sanitize::redact_path(audio),
            model = %self.config.model,
        );
        async {
            let result = run_command(&spec).await?.into_result(&program)?;
            info!(duration_ms = result.duration.as_millis() as u64, "Transcription finished");

            if tokio::fs::metadata(&expected).await.is_err() {
                return Err(EngineError::MissingOutput { path: expected });
            }
            Ok(expected)
        }
        .instrument(span)
        .await
    }
}
