//! Processing of a single recorded item: normalize, transcribe, read back.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::processor::descriptor::Descriptor;
use crate::processor::report::{
    or_placeholder, ReportSection, ENGINE_FAILURE_SENTINEL, MISSING_AUDIO_SENTINEL,
};
use crate::processor::scenario::{contained_path, item_label, ItemInfo};
use crate::processor::transcriber::transcript_path;
use crate::processor::{AudioNormalizer, TranscriptionEngine};
use crate::sanitize;
use crate::storage::remove_file_if_exists;

use super::error::PipelineWarning;

/// Result of one attempted item.
#[derive(Debug)]
pub struct ItemOutcome {
    pub section: ReportSection,
    /// Whether the transcription engine was invoked.
    pub transcribed: bool,
    pub warnings: Vec<PipelineWarning>,
}

/// Where an item's audio reference points.
enum AudioLookup {
    Found(PathBuf),
    Missing,
    OutsideWorkDir(PathBuf),
}

pub struct ItemProcessor<'a> {
    normalizer: &'a dyn AudioNormalizer,
    transcriber: &'a dyn TranscriptionEngine,
    /// Every file an item reads or writes lives under this directory.
    work_dir: &'a Path,
}

impl<'a> ItemProcessor<'a> {
    pub fn new(
        normalizer: &'a dyn AudioNormalizer,
        transcriber: &'a dyn TranscriptionEngine,
        work_dir: &'a Path,
    ) -> Self {
        Self {
            normalizer,
            transcriber,
            work_dir,
        }
    }

    /// Produces the section for item `ordinal` described by `descriptor_path`.
    /// Never fails: every problem ends up as a sentinel plus a warning.
    pub async fn process(&self, ordinal: usize, descriptor_path: &Path) -> ItemOutcome {
        let started = Instant::now();
        let mut warnings = Vec::new();

        let info = match Descriptor::read(descriptor_path).await {
            Ok(descriptor) => ItemInfo::from_descriptor(&descriptor),
            Err(e) => {
                warn!(item = ordinal, error = %e, "Item descriptor unreadable");
                warnings.push(PipelineWarning::DescriptorUnreadable {
                    item: ordinal,
                    error: e.to_string(),
                });
                ItemInfo::default()
            }
        };

        let output_dir = descriptor_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let (transcript, transcribed) = match self.locate_audio(info.audio_path.as_deref()).await {
            AudioLookup::Found(source) => {
                self.transcribe_audio(ordinal, &source, &output_dir, &mut warnings)
                    .await
            }
            AudioLookup::Missing => {
                warn!(item = ordinal, "Audio file not found");
                warnings.push(PipelineWarning::AudioMissing { item: ordinal });
                (MISSING_AUDIO_SENTINEL.to_string(), false)
            }
            AudioLookup::OutsideWorkDir(reference) => {
                warn!(
                    item = ordinal,
                    reference = %sanitize::redact_path(&reference),
                    "Audio reference leaves the working directory, ignoring it"
                );
                warnings.push(PipelineWarning::AudioOutsideWorkDir {
                    item: ordinal,
                    reference,
                });
                (MISSING_AUDIO_SENTINEL.to_string(), false)
            }
        };

        info!(
            item = ordinal,
            transcribed,
            transcript_bytes = transcript.len(),
            transcript_lines = transcript.lines().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Item processed"
        );

        ItemOutcome {
            section: ReportSection {
                label: item_label(ordinal),
                start: or_placeholder(info.start_time.as_deref()),
                end: or_placeholder(info.field("Stop_Time")),
                alias: or_placeholder(info.field("IndividualAlias")),
                unit_id: or_placeholder(info.field("UnitID")),
                transcript,
            },
            transcribed,
            warnings,
        }
    }

    async fn locate_audio(&self, reference: Option<&Path>) -> AudioLookup {
        let Some(reference) = reference else {
            return AudioLookup::Missing;
        };
        let Some(resolved) = contained_path(self.work_dir, reference) else {
            return AudioLookup::OutsideWorkDir(reference.to_path_buf());
        };
        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_file() => AudioLookup::Found(resolved),
            _ => AudioLookup::Missing,
        }
    }

    async fn transcribe_audio(
        &self,
        ordinal: usize,
        source: &Path,
        output_dir: &Path,
        warnings: &mut Vec<PipelineWarning>,
    ) -> (String, bool) {
        let normalize_started = Instant::now();
        let audio = match self.normalizer.normalize(source).await {
            Ok(normalized) => {
                debug!(
                    item = ordinal,
                    elapsed_ms = normalize_started.elapsed().as_millis() as u64,
                    "Audio normalized"
                );
                normalized
            }
            Err(e) => {
                warn!(item = ordinal, error = %e, "Normalization failed, using original audio");
                warnings.push(PipelineWarning::NormalizationFailed {
                    item: ordinal,
                    error: e.to_string(),
                });
                source.to_path_buf()
            }
        };

        // A transcript derived from the normalized name wins over one derived
        // from the original name.
        let mut candidates = vec![transcript_path(&audio, output_dir)];
        let original = transcript_path(source, output_dir);
        if !candidates.contains(&original) {
            candidates.push(original);
        }

        let mut transcribed = false;
        if first_existing(&candidates).await.is_some() {
            debug!(item = ordinal, "Transcript already present, skipping engine");
        } else {
            transcribed = true;
            let transcribe_started = Instant::now();
            match self.transcriber.transcribe(&audio, output_dir).await {
                Ok(written) => {
                    debug!(
                        item = ordinal,
                        elapsed_ms = transcribe_started.elapsed().as_millis() as u64,
                        "Audio transcribed"
                    );
                    if !candidates.contains(&written) {
                        candidates.insert(0, written);
                    }
                }
                Err(e) => {
                    warn!(item = ordinal, error = %e, "Transcription failed");
                    warnings.push(PipelineWarning::TranscriptionFailed {
                        item: ordinal,
                        error: e.to_string(),
                    });
                    if let Err(write_err) =
                        tokio::fs::write(&candidates[0], ENGINE_FAILURE_SENTINEL).await
                    {
                        warn!(
                            path = %sanitize::redact_path(&candidates[0]),
                            error = %write_err,
                            "Could not record transcription failure"
                        );
                    }
                }
            }
        }

        if audio.as_path() != source {
            if let Err(e) = remove_file_if_exists(&audio).await {
                warnings.push(PipelineWarning::CleanupFailed {
                    path: audio.clone(),
                    error: e.to_string(),
                });
            }
        }

        let transcript = match read_transcript(&candidates).await {
            Some(text) => text,
            None => {
                warnings.push(PipelineWarning::TranscriptUnusable { item: ordinal });
                ENGINE_FAILURE_SENTINEL.to_string()
            }
        };
        (transcript, transcribed)
    }
}

async fn first_existing(candidates: &[PathBuf]) -> Option<&PathBuf> {
    for candidate in candidates {
        if tokio::fs::metadata(candidate)
            .await
            .is_ok_and(|meta| meta.is_file())
        {
            return Some(candidate);
        }
    }
    None
}

/// Trimmed content of the first existing candidate; `None` when nothing
/// usable is there.
async fn read_transcript(candidates: &[PathBuf]) -> Option<String> {
    let path = first_existing(candidates).await?;
    let bytes = tokio::fs::read(path).await.ok()?;
    let text = String::from_utf8_lossy(&bytes).trim().to_string();
    (!text.is_empty()).then_some(text)
}
