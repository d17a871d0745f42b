use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use transcriptor::worker::JobState;
use transcriptor::{ApiResponse, JobId, StatusResponse, TranscriptionService};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Synchronous mode: one archive, progress logged, final status printed.
pub async fn run_archive(service: &TranscriptionService, archive: &Path) -> Result<()> {
    let mut events = service.queue().subscribe();
    let id = service
        .submit_archive(archive)
        .await
        .with_context(|| format!("Failed to submit {}", archive.display()))?;

    let follower = {
        let id = id.to_string();
        tokio::spawn(async move {
            let mut last = None;
            while let Ok(event) = events.recv().await {
                if event.job_id != id {
                    continue;
                }
                if last != Some(event.progress) {
                    info!(
                        progress = event.progress,
                        items_done = event.items_done,
                        total_items = event.total_items,
                        "{}",
                        event.message
                    );
                    last = Some(event.progress);
                }
                if event.is_terminal() {
                    break;
                }
            }
        })
    };

    let job = service.queue().wait_for(&id).await?;
    follower.abort();

    let status = StatusResponse::from(&job);
    match job.state {
        JobState::Finished => print_json(&ApiResponse::ok(status)),
        _ => {
            let error = job.error.clone().unwrap_or_else(|| "unknown error".to_string());
            print_json(&ApiResponse::<StatusResponse>::err(error.clone()))?;
            bail!("Job {} failed: {}", id, error)
        }
    }
}

/// Asynchronous mode: queue everything, then poll status projections and
/// print each change until every job is terminal.
pub async fn submit_archives(
    service: &TranscriptionService,
    archives: &[PathBuf],
    poll: Duration,
) -> Result<()> {
    let mut ids: Vec<JobId> = Vec::with_capacity(archives.len());
    for archive in archives {
        let id = service
            .submit_archive(archive)
            .await
            .with_context(|| format!("Failed to submit {}", archive.display()))?;
        print_json(&serde_json::json!({
            "jobId": id.as_str(),
            "archive": archive.display().to_string(),
        }))?;
        ids.push(id);
    }

    let mut seen: HashMap<JobId, StatusResponse> = HashMap::new();
    let mut interval = tokio::time::interval(poll);
    loop {
        interval.tick().await;

        let mut pending = 0;
        for id in &ids {
            let status = service.status(id)?;
            if !status.state.is_terminal() {
                pending += 1;
            }
            if seen.get(id) != Some(&status) {
                print_json(&status)?;
                seen.insert(id.clone(), status);
            }
        }
        if pending == 0 {
            break;
        }
    }

    let failed = seen
        .values()
        .filter(|s| s.state == JobState::Failed)
        .count();
    if failed > 0 {
        bail!("{} of {} jobs failed", failed, ids.len());
    }
    Ok(())
}

pub async fn print_history(service: &TranscriptionService, limit: Option<usize>) -> Result<()> {
    let entries = service.history(limit).await?;
    print_json(&ApiResponse::ok(entries))
}

pub fn print_config(service: &TranscriptionService) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(service.config())?);
    Ok(())
}
