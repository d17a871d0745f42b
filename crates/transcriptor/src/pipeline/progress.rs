use std::sync::Mutex;

use crate::worker::job::JobPatch;
use crate::worker::queue::JobUpdater;

/// Progress checkpoints. Setup covers 0..20, items 20..80, the rest 80..100.
pub const PROGRESS_STARTED: f64 = 5.0;
pub const PROGRESS_EXTRACTED: f64 = 15.0;
pub const PROGRESS_ITEMS_START: f64 = 20.0;
pub const PROGRESS_ITEMS_END: f64 = 80.0;
pub const PROGRESS_ASSEMBLING: f64 = 90.0;
pub const PROGRESS_FINALIZED: f64 = 99.0;

/// Linear position inside the item band after `done` of `total` items.
pub fn item_progress(done: usize, total: usize) -> f64 {
    if total == 0 {
        return PROGRESS_ITEMS_END;
    }
    let fraction = done.min(total) as f64 / total as f64;
    (PROGRESS_ITEMS_START + (PROGRESS_ITEMS_END - PROGRESS_ITEMS_START) * fraction).floor()
}

/// Sink for progress patches published while the pipeline runs.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, patch: JobPatch);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _patch: JobPatch) {}
}

impl ProgressReporter for JobUpdater {
    fn report(&self, patch: JobPatch) {
        self.update(patch);
    }
}

/// Keeps every patch; lets tests assert on what a run published.
#[derive(Default)]
pub struct RecordingProgress {
    patches: Mutex<Vec<JobPatch>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patches(&self) -> Vec<JobPatch> {
        self.patches
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Every progress value reported, in order.
    pub fn progress_values(&self) -> Vec<f64> {
        self.patches().iter().filter_map(|p| p.progress).collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, patch: JobPatch) {
        if let Ok(mut guard) = self.patches.lock() {
            guard.push(patch);
        }
    }
}
