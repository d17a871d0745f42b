use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, info_span, warn, Instrument};

use crate::processor::archive::extract_archive;
use crate::processor::descriptor::Descriptor;
use crate::processor::docx::DocxAssembler;
use crate::processor::normalizer::FfmpegNormalizer;
use crate::processor::report::{AssembledReport, FALLBACK_MESSAGE};
use crate::processor::scenario::{self, find_scenario, locate_item_descriptor};
use crate::processor::transcriber::WhisperTranscriber;
use crate::processor::{AudioNormalizer, DocumentAssembler, TranscriptionEngine};
use crate::sanitize;
use crate::storage::{remove_file_if_exists, JobWorkspace};
use crate::worker::job::{JobPatch, JobPhase, JobResult};

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::{PipelineError, PipelineWarning};
use super::item::ItemProcessor;
use super::progress::{
    item_progress, ProgressReporter, PROGRESS_ASSEMBLING, PROGRESS_EXTRACTED,
    PROGRESS_FINALIZED, PROGRESS_ITEMS_START, PROGRESS_STARTED,
};

/// Runs one archive through extraction, transcription and report assembly.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    normalizer: Arc<dyn AudioNormalizer>,
    transcriber: Arc<dyn TranscriptionEngine>,
    assembler: Arc<dyn DocumentAssembler>,
}

impl Pipeline {
    /// Pipeline backed by ffmpeg, whisper and the DOCX writer.
    pub fn from_config(config: Arc<PipelineConfig>) -> Self {
        let normalizer = Arc::new(FfmpegNormalizer::new(config.normalizer.clone()));
        let transcriber = Arc::new(WhisperTranscriber::new(config.transcriber.clone()));
        Self {
            config,
            normalizer,
            transcriber,
            assembler: Arc::new(DocxAssembler::new()),
        }
    }

    /// Builds a pipeline around specific engines, e.g. fakes in tests.
    pub fn new(
        config: Arc<PipelineConfig>,
        normalizer: Arc<dyn AudioNormalizer>,
        transcriber: Arc<dyn TranscriptionEngine>,
        assembler: Arc<dyn DocumentAssembler>,
    ) -> Self {
        Self {
            config,
            normalizer,
            transcriber,
            assembler,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes `archive` end to end, naming the report after the archive.
    ///
    /// On success the archive and the extracted tree are deleted and the
    /// report's public path is returned. On a fatal error both are left in
    /// place for inspection. The context is returned either way.
    pub async fn run(
        &self,
        archive: &Path,
        progress: &dyn ProgressReporter,
    ) -> (Result<JobResult, PipelineError>, PipelineContext) {
        self.run_context(PipelineContext::new(archive), progress).await
    }

    /// Like [`Pipeline::run`] for a staged copy of an upload: the job
    /// directory and report are named after `source_name` instead.
    pub async fn run_as(
        &self,
        archive: &Path,
        source_name: &str,
        progress: &dyn ProgressReporter,
    ) -> (Result<JobResult, PipelineError>, PipelineContext) {
        let ctx = PipelineContext::new(archive).with_source_name(source_name);
        self.run_context(ctx, progress).await
    }

    async fn run_context(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (Result<JobResult, PipelineError>, PipelineContext) {
        let started = Instant::now();
        let span = info_span!(
            "pipeline",
            archive = %sanitize::redact_path(&ctx.archive),
            source = %ctx.source_name
        );

        let result = self
            .run_steps(&mut ctx, progress)
            .instrument(span.clone())
            .await;

        span.in_scope(|| match &result {
            Ok(job_result) => info!(
                artifact = %job_result.artifact,
                items = ctx.items_done,
                transcribed = ctx.transcriptions_run,
                warnings = ctx.warnings.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Pipeline finished"
            ),
            Err(e) => error!(
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Pipeline failed"
            ),
        });
        (result, ctx)
    }

    async fn run_steps(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<JobResult, PipelineError> {
        progress.report(
            JobPatch::phase(JobPhase::Extracting, "Extracting archive")
                .with_progress(PROGRESS_STARTED),
        );
        let workspace = self.step_extract(ctx).instrument(info_span!("extract")).await?;
        progress.report(JobPatch::progress(PROGRESS_EXTRACTED));

        self.process_work_dir(ctx, workspace.work_dir(), progress).await?;

        progress.report(
            JobPatch::phase(JobPhase::Assembling, "Assembling report")
                .with_progress(PROGRESS_ASSEMBLING),
        );
        let report = self
            .step_assemble(ctx, &workspace)
            .instrument(info_span!("assemble"))
            .await?;
        ctx.report = Some(report);

        progress.report(JobPatch::phase(JobPhase::Finalizing, "Cleaning up"));
        self.step_cleanup(ctx, &workspace)
            .instrument(info_span!("cleanup"))
            .await;
        progress.report(JobPatch::progress(PROGRESS_FINALIZED));

        Ok(JobResult::new(
            workspace.public_path(&self.config.public_prefix),
            self.config.completion_message.clone(),
        ))
    }

    /// Resolves the scenario in an extracted tree and transcribes every
    /// item into `ctx.sections`.
    ///
    /// Safe to call again on the same tree: items whose transcript already
    /// exists are not sent to the engine a second time.
    pub async fn process_work_dir(
        &self,
        ctx: &mut PipelineContext,
        work_dir: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        progress.report(JobPatch::phase(JobPhase::Resolving, "Reading scenario"));
        let index = self
            .step_resolve(ctx, work_dir)
            .instrument(info_span!("resolve"))
            .await?;

        let total = ctx.total_items;
        progress.report(
            JobPatch::phase(JobPhase::Transcribing, format!("Transcribing {} items", total))
                .with_progress(PROGRESS_ITEMS_START)
                .with_items(0, total),
        );

        self.step_items(ctx, work_dir, index.directory(), progress)
            .instrument(info_span!("items", total))
            .await
    }

    async fn step_extract(&self, ctx: &mut PipelineContext) -> Result<JobWorkspace, PipelineError> {
        let workspace = JobWorkspace::create(&self.config.jobs_directory, Path::new(&ctx.source_name))
            .await
            .map_err(PipelineError::Workspace)?;
        ctx.workspace = Some(workspace.clone());

        let summary = extract_archive(&ctx.archive, workspace.work_dir()).await?;
        info!(
            job_dir = %workspace.dir_name(),
            files = summary.files,
            skipped = summary.skipped,
            "Archive extracted"
        );
        Ok(workspace)
    }

    async fn step_resolve(
        &self,
        ctx: &mut PipelineContext,
        work_dir: &Path,
    ) -> Result<Descriptor, PipelineError> {
        let root = work_dir.to_path_buf();
        let scenario_path = run_blocking("scenario search", move || find_scenario(&root))
            .await?
            .ok_or(PipelineError::ScenarioNotFound)?;
        ctx.scenario_path = Some(scenario_path.clone());

        let scenario_descriptor = Descriptor::read(&scenario_path)
            .await
            .map_err(PipelineError::Scenario)?;
        let index_path = scenario::index_path(&scenario_descriptor).ok_or_else(|| {
            PipelineError::IndexReferenceMissing {
                path: scenario_path.clone(),
            }
        })?;
        ctx.index_path = Some(index_path.clone());

        let Some(index_path) = scenario::contained_path(work_dir, &index_path) else {
            return Err(PipelineError::IndexNotFound { path: index_path });
        };
        let is_file = tokio::fs::metadata(&index_path)
            .await
            .is_ok_and(|meta| meta.is_file());
        if !is_file {
            return Err(PipelineError::IndexNotFound { path: index_path });
        }

        let index = Descriptor::read(&index_path)
            .await
            .map_err(PipelineError::Index)?;
        let total = scenario::item_count(&index);
        if total == 0 {
            return Err(PipelineError::EmptyIndex { path: index_path });
        }
        ctx.total_items = total;

        info!(
            scenario = %sanitize::redact_path(&scenario_path),
            index = %sanitize::redact_path(&index_path),
            total,
            "Scenario resolved"
        );
        Ok(index)
    }

    async fn step_items(
        &self,
        ctx: &mut PipelineContext,
        work_dir: &Path,
        index_dir: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let processor = ItemProcessor::new(
            self.normalizer.as_ref(),
            self.transcriber.as_ref(),
            work_dir,
        );
        let total = ctx.total_items;

        for ordinal in 1..=total {
            let dir = index_dir.to_path_buf();
            let located = run_blocking("item lookup", move || {
                locate_item_descriptor(&dir, ordinal)
            })
            .await?;
            let Some(descriptor_path) = located else {
                warn!(item = ordinal, "No descriptor for item, skipping");
                ctx.warnings
                    .push(PipelineWarning::ItemSkipped { item: ordinal });
                continue;
            };

            let outcome = processor.process(ordinal, &descriptor_path).await;
            if outcome.transcribed {
                ctx.transcriptions_run += 1;
            }
            ctx.warnings.extend(outcome.warnings);
            ctx.sections.push(outcome.section);
            ctx.items_done += 1;

            let done = ctx.items_done;
            progress.report(
                JobPatch::progress(item_progress(done, total))
                    .with_items(done, total)
                    .with_message(format!("Transcribed item {} of {}", ordinal, total)),
            );
        }
        Ok(())
    }

    async fn step_assemble(
        &self,
        ctx: &mut PipelineContext,
        workspace: &JobWorkspace,
    ) -> Result<AssembledReport, PipelineError> {
        let output = workspace.artifact_path();

        match self.assembler.assemble(&ctx.sections, &output).await {
            Ok(()) => {
                info!(sections = ctx.sections.len(), "Report written");
                Ok(AssembledReport {
                    path: output,
                    sections: ctx.sections.len(),
                    fallback: false,
                })
            }
            Err(e) => {
                warn!(error = %e, "Report assembly failed, writing fallback document");
                ctx.warnings.push(PipelineWarning::AssemblyFallback {
                    error: e.to_string(),
                });
                self.assembler
                    .assemble_fallback(FALLBACK_MESSAGE, &output)
                    .await?;
                Ok(AssembledReport {
                    path: output,
                    sections: 0,
                    fallback: true,
                })
            }
        }
    }

    async fn step_cleanup(&self, ctx: &mut PipelineContext, workspace: &JobWorkspace) {
        if let Err(e) = remove_file_if_exists(&ctx.archive).await {
            warn!(error = %e, "Could not delete archive");
            ctx.warnings.push(PipelineWarning::CleanupFailed {
                path: ctx.archive.clone(),
                error: e.to_string(),
            });
        }
        if let Err(e) = workspace.remove_work_dir().await {
            warn!(error = %e, "Could not delete working directory");
            ctx.warnings.push(PipelineWarning::CleanupFailed {
                path: workspace.work_dir().to_path_buf(),
                error: e.to_string(),
            });
        }
    }
}

/// Runs blocking file-system work off the async worker.
async fn run_blocking<T, F>(task: &'static str, f: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PipelineError::BackgroundTask {
            task,
            error: e.to_string(),
        })
}
