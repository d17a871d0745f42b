use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info_span, Instrument};

use crate::config::NormalizerConfig;
use crate::error::EngineError;
use crate::processor::command::{run_command, CommandSpec};
use crate::processor::AudioNormalizer;
use crate::sanitize;

/// Suffix inserted before the extension of normalized audio.
pub const NORMALIZED_MARKER: &str = "san";

/// `<dir>/<stem>.san.wav` for a source `<dir>/<stem>.<ext>`.
pub fn normalized_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    source.with_file_name(format!("{}.{}.wav", stem, NORMALIZED_MARKER))
}

/// Normalizes audio with an ffmpeg binary: mono, fixed rate, 16-bit PCM,
/// metadata and non-audio streams dropped.
pub struct FfmpegNormalizer {
    config: NormalizerConfig,
}

impl FfmpegNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn command(&self, source: &Path, output: &Path) -> CommandSpec {
        CommandSpec::new(&self.config.binary)
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"])
            .arg(source)
            .args(["-vn", "-sn", "-dn", "-map_metadata", "-1", "-ac"])
            .arg(self.config.channels.to_string())
            .arg("-ar")
            .arg(self.config.sample_rate.to_string())
            .args(["-c:a", "pcm_s16le"])
            .arg(output)
            .timeout(self.config.timeout())
    }
}

#[async_trait]
impl AudioNormalizer for FfmpegNormalizer {
    async fn normalize(&self, source: &Path) -> Result<PathBuf, EngineError> {
        let output = normalized_path(source);
        let spec = self.command(source, &output);
        let program = spec.display_name();

        let span = info_span!("normalize", file = %sanitize::redact_path(source));
        async {
            let result = run_command(&spec).await?;
            let result = result.into_result(&program)?;
            debug!(duration_ms = result.duration.as_millis() as u64, "Audio normalized");

            if tokio::fs::metadata(&output).await.is_err() {
                return Err(EngineError::MissingOutput { path: output });
            }
            Ok(output)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_path() {
        assert_eq!(
            normalized_path(Path::new("/work/Item1/call 01.WAV")),
            PathBuf::from("/work/Item1/call 01.san.wav")
        );
        assert_eq!(
            normalized_path(Path::new("/work/Item1/call.mp3")),
            PathBuf::from("/work/Item1/call.san.wav")
        );
    }

    #[test]
    fn test_command_arguments() {
        let normalizer = FfmpegNormalizer::new(NormalizerConfig {
            binary: PathBuf::from("/usr/bin/ffmpeg"),
            sample_rate: 16_000,
            channels: 1,
            timeout_secs: 60,
        });
        let spec = normalizer.command(Path::new("in.wav"), Path::new("in.san.wav"));

        assert_eq!(
            spec.command_line(),
            "/usr/bin/ffmpeg -hide_banner -nostdin -loglevel error -y -i in.wav \
             -vn -sn -dn -map_metadata -1 -ac 1 -ar 16000 -c:a pcm_s16le in.san.wav"
        );
        assert_eq!(spec.timeout, Some(std::time::Duration::from_secs(60)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_normalize_failure_is_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("call.wav");
        std::fs::write(&source, b"RIFF").unwrap();

        let normalizer = FfmpegNormalizer::new(NormalizerConfig {
            binary: PathBuf::from("/bin/false"),
            ..NormalizerConfig::default()
        });
        let result = normalizer.normalize(&source).await;
        assert!(matches!(result, Err(EngineError::NonZeroExit { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_normalize_requires_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("call.wav");
        std::fs::write(&source, b"RIFF").unwrap();

        // `true` exits 0 without writing anything.
        let normalizer = FfmpegNormalizer::new(NormalizerConfig {
            binary: PathBuf::from("/bin/true"),
            ..NormalizerConfig::default()
        });
        let result = normalizer.normalize(&source).await;
        assert!(matches!(result, Err(EngineError::MissingOutput { .. })));
    }
}
