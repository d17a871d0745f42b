use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidEnv { name: String, value: String },
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to open archive '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid archive '{path}': {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("Failed to extract '{entry}': {message}")]
    Extract { entry: String, message: String },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extraction task aborted: {0}")]
    Join(String),
}

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Failed to read descriptor '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed descriptor '{path}': {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Descriptor '{path}' has no root element")]
    Empty { path: PathBuf },
}

/// Failures of an external engine invocation (normalizer or transcriber).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed with exit code {code}: {stderr}")]
    NonZeroExit {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("{program} timed out after {}s", .after.as_secs())]
    TimedOut { program: String, after: Duration },

    #[error("Failed waiting for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Expected output '{path}' was not produced")]
    MissingOutput { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Failed to create document '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write document part '{part}': {message}")]
    WritePart { part: String, message: String },

    #[error("Failed to finish document '{path}': {message}")]
    Finish { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list '{path}': {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported archive '{0}': only .zip files are accepted")]
    UnsupportedArchive(PathBuf),

    #[error("Archive not found: {0}")]
    ArchiveNotFound(PathBuf),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {id} failed: {error}")]
    JobFailed { id: String, error: String },

    #[error("Job queue closed before job {0} finished")]
    Closed(String),
}

pub type Result<T> = std::result::Result<T, TranscriptorError>;
