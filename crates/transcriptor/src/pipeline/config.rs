use std::path::PathBuf;

use crate::config::{Config, NormalizerConfig, TranscriberConfig};

/// Message attached to every finished job.
pub const COMPLETION_MESSAGE: &str = "Scenario fully transcribed";

pub struct PipelineConfig {
    pub jobs_directory: PathBuf,
    pub public_prefix: String,
    pub normalizer: NormalizerConfig,
    pub transcriber: TranscriberConfig,
    pub completion_message: String,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jobs_directory: config.jobs_directory(),
            public_prefix: config.public_prefix.clone(),
            normalizer: config.normalizer.clone(),
            transcriber: config.transcriber.clone(),
            completion_message: COMPLETION_MESSAGE.to_string(),
        }
    }
}
