use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Vocabulary hint handed to the transcriber: police radio traffic with Q-codes.
pub const DEFAULT_INITIAL_PROMPT: &str = "Audio de comunicaciones de radio policiales. \
Usar abreviaturas y codigo Q. Abreviaturas/siglas\
Codigo Q frecuente: QSL, QRV, QTH, QRM, QRX, QRT, QRP, QRO, QSY, QSA, QSB, QTC, QTR.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub transcriber: TranscriberConfig,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            public_prefix: default_public_prefix(),
            normalizer: NormalizerConfig::default(),
            transcriber: TranscriberConfig::default(),
            history_limit: default_history_limit(),
        }
    }
}

impl Config {
    /// Directory holding staged uploads.
    pub fn inbox_directory(&self) -> PathBuf {
        self.data_directory.join("inbox")
    }

    /// Directory holding one subdirectory per job.
    pub fn jobs_directory(&self) -> PathBuf {
        self.data_directory.join("jobs")
    }
}

fn default_data_directory() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_prefix() -> String {
    "/uploads".to_string()
}

fn default_history_limit() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default = "default_ffmpeg_binary")]
    pub binary: PathBuf,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    /// Zero disables the limit.
    #[serde(default = "default_normalizer_timeout")]
    pub timeout_secs: u64,
}

impl NormalizerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            binary: default_ffmpeg_binary(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            timeout_secs: default_normalizer_timeout(),
        }
    }
}

fn default_ffmpeg_binary() -> PathBuf {
    if cfg!(target_os = "linux") {
        PathBuf::from("/usr/bin/ffmpeg")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/opt/homebrew/bin/ffmpeg")
    } else if cfg!(windows) {
        PathBuf::from("ffmpeg.exe")
    } else {
        PathBuf::from("ffmpeg")
    }
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_channels() -> u16 {
    1
}

fn default_normalizer_timeout() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    #[serde(default = "default_whisper_binary")]
    pub binary: PathBuf,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub fp16: bool,
    #[serde(default)]
    pub model_directory: Option<PathBuf>,
    #[serde(default = "default_initial_prompt")]
    pub initial_prompt: String,
    #[serde(default = "default_true")]
    pub use_initial_prompt: bool,
    /// Zero disables the limit.
    #[serde(default = "default_transcriber_timeout")]
    pub timeout_secs: u64,
}

impl TranscriberConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Prompt to pass, if hints are enabled and non-empty.
    pub fn prompt(&self) -> Option<&str> {
        let prompt = self.initial_prompt.trim();
        (self.use_initial_prompt && !prompt.is_empty()).then_some(prompt)
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary: default_whisper_binary(),
            model: default_model(),
            language: default_language(),
            fp16: false,
            model_directory: None,
            initial_prompt: default_initial_prompt(),
            use_initial_prompt: true,
            timeout_secs: default_transcriber_timeout(),
        }
    }
}

fn default_whisper_binary() -> PathBuf {
    if cfg!(target_os = "linux") {
        PathBuf::from("/usr/local/bin/whisper")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/opt/homebrew/bin/whisper")
    } else if cfg!(windows) {
        PathBuf::from("whisper.exe")
    } else {
        PathBuf::from("whisper")
    }
}

fn default_model() -> String {
    "large-v3".to_string()
}

fn default_language() -> String {
    "Spanish".to_string()
}

fn default_initial_prompt() -> String {
    DEFAULT_INITIAL_PROMPT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_transcriber_timeout() -> u64 {
    7_200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.data_directory, PathBuf::from("uploads"));
        assert_eq!(config.public_prefix, "/uploads");
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.normalizer.sample_rate, 16_000);
        assert_eq!(config.normalizer.channels, 1);
        assert_eq!(config.transcriber.model, "large-v3");
        assert_eq!(config.transcriber.language, "Spanish");
        assert!(!config.transcriber.fp16);
        assert!(config.transcriber.use_initial_prompt);
    }

    #[test]
    fn test_timeout_zero_disables() {
        let mut normalizer = NormalizerConfig::default();
        normalizer.timeout_secs = 0;
        assert!(normalizer.timeout().is_none());

        normalizer.timeout_secs = 30;
        assert_eq!(normalizer.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_prompt_respects_toggle() {
        let mut transcriber = TranscriberConfig::default();
        assert!(transcriber.prompt().unwrap().contains("QSL"));

        transcriber.use_initial_prompt = false;
        assert!(transcriber.prompt().is_none());

        transcriber.use_initial_prompt = true;
        transcriber.initial_prompt = "   ".to_string();
        assert!(transcriber.prompt().is_none());
    }

    #[test]
    fn test_job_layout_directories() {
        let config = Config {
            data_directory: PathBuf::from("/srv/data"),
            ..Config::default()
        };
        assert_eq!(config.inbox_directory(), PathBuf::from("/srv/data/inbox"));
        assert_eq!(config.jobs_directory(), PathBuf::from("/srv/data/jobs"));
    }
}
