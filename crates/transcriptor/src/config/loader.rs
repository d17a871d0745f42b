use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub const ENV_FFMPEG_BIN: &str = "FFMPEG_BIN";
pub const ENV_WHISPER_BIN: &str = "WHISPER_BIN";
pub const ENV_WHISPER_MODEL: &str = "WHISPER_MODEL";
pub const ENV_WHISPER_LANG: &str = "WHISPER_LANG";
pub const ENV_WHISPER_MODEL_DIR: &str = "WHISPER_MODEL_DIR";
pub const ENV_WHISPER_USE_PROMPT: &str = "WHISPER_USE_PROMPT";
pub const ENV_DATA_DIR: &str = "TRANSCRIPTOR_DATA_DIR";

/// Reads a JSON config file, applies environment overrides and validates it.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = serde_json::from_str(content)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Built-in defaults plus environment overrides, for running without a file.
pub fn load_default_config() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Applies overrides from `lookup`. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(value) = get(ENV_FFMPEG_BIN) {
        debug!(var = ENV_FFMPEG_BIN, "Overriding normalizer binary from environment");
        config.normalizer.binary = PathBuf::from(value);
    }
    if let Some(value) = get(ENV_WHISPER_BIN) {
        debug!(var = ENV_WHISPER_BIN, "Overriding transcriber binary from environment");
        config.transcriber.binary = PathBuf::from(value);
    }
    if let Some(value) = get(ENV_WHISPER_MODEL) {
        config.transcriber.model = value;
    }
    if let Some(value) = get(ENV_WHISPER_LANG) {
        config.transcriber.language = value;
    }
    if let Some(value) = get(ENV_WHISPER_MODEL_DIR) {
        config.transcriber.model_directory = Some(PathBuf::from(value));
    }
    if let Some(value) = get(ENV_WHISPER_USE_PROMPT) {
        config.transcriber.use_initial_prompt = parse_flag(ENV_WHISPER_USE_PROMPT, &value)?;
    }
    if let Some(value) = get(ENV_DATA_DIR) {
        config.data_directory = PathBuf::from(value);
    }

    Ok(())
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.normalizer.binary.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "normalizer.binary must not be empty".to_string(),
        });
    }
    if config.transcriber.binary.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "transcriber.binary must not be empty".to_string(),
        });
    }
    if config.transcriber.model.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "transcriber.model must not be empty".to_string(),
        });
    }
    if config.transcriber.language.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "transcriber.language must not be empty".to_string(),
        });
    }
    if config.normalizer.sample_rate == 0 {
        return Err(ConfigError::Validation {
            message: "normalizer.sample_rate must be greater than 0".to_string(),
        });
    }
    if config.normalizer.channels == 0 {
        return Err(ConfigError::Validation {
            message: "normalizer.channels must be greater than 0".to_string(),
        });
    }
    if !config.public_prefix.starts_with('/') {
        return Err(ConfigError::Validation {
            message: format!(
                "public_prefix must start with '/', got '{}'",
                config.public_prefix
            ),
        });
    }

    Ok(())
}
