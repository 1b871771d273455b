//! Per-job lifecycle driver: submit, register with the aggregator, poll
//! to completion, and report terminal/batch progress.

use std::sync::Arc;
use std::time::Duration;

use fleet_aggregator::{Aggregator, PromptMapEntry};
use fleet_core::{ClientEvent, Job, LatestResult, OutputArtifact, WorkerNode};
use fleet_worker_client::WorkerApi;
use tokio::time::Instant;

use crate::batch_tracker::BatchTracker;
use crate::error::LifecycleError;

pub struct DriverConfig {
    pub poll_interval: Duration,
    pub deadline: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            deadline: Duration::from_secs(300),
        }
    }
}

/// Batch membership context for a job driven as part of a larger batch.
pub struct BatchContext {
    pub tracker: Arc<BatchTracker>,
    pub total: u32,
}

/// Drives one job from `queued` through submission and polling to a
/// terminal state, running the increment/decrement-load and
/// register/unregister bracket described by the state machine. Returns
/// the job with its final status recorded.
pub async fn drive_job(
    mut job: Job,
    graph: serde_json::Value,
    worker: Arc<WorkerNode>,
    client: Arc<dyn WorkerApi>,
    aggregator: Arc<Aggregator>,
    batch: Option<BatchContext>,
    config: &DriverConfig,
) -> Job {
    worker.increment_load();
    tracing::debug!(job_id = %job.id, worker = %worker.id(), "job queued");

    run(&mut job, &graph, &worker, client.as_ref(), aggregator.as_ref(), config).await;

    publish_terminal(&job, &aggregator).await;
    if let Some(ctx) = &batch {
        publish_batch_progress(&job, ctx, &aggregator).await;
    }

    if let Some(worker_job_id) = job.worker_job_id.clone() {
        aggregator.unregister(&worker_job_id).await;
    }
    worker.decrement_load();

    job
}

async fn run(
    job: &mut Job,
    graph: &serde_json::Value,
    worker: &WorkerNode,
    client: &dyn WorkerApi,
    aggregator: &Aggregator,
    config: &DriverConfig,
) {
    let worker_job_id = match client.submit(graph).await {
        Ok(id) => id,
        Err(e) => {
            job.mark_error(format!("submit failed: {e}"));
            return;
        }
    };

    aggregator
        .register(
            worker_job_id.clone(),
            PromptMapEntry {
                session_id: job.session_id.clone(),
                generation_id: job.id,
                worker_id: worker.id().to_string(),
            },
        )
        .await;

    job.mark_running(worker_job_id.clone());

    let deadline = Instant::now() + config.deadline;
    loop {
        if Instant::now() >= deadline {
            job.mark_error(LifecycleError::Timeout.to_string());
            return;
        }

        tokio::time::sleep(config.poll_interval).await;

        match client.history(&worker_job_id).await {
            Ok(Some(history)) => {
                let artifacts: Vec<OutputArtifact> = history
                    .all_images()
                    .into_iter()
                    .map(|img| OutputArtifact {
                        filename: img.filename.clone(),
                        subfolder: img.subfolder.clone(),
                        kind: img.kind.clone(),
                    })
                    .collect();

                if artifacts.is_empty() {
                    job.mark_error(LifecycleError::NoOutput.to_string());
                } else {
                    // Fetches bytes for persistence; failures downgrade the
                    // job to error rather than reporting a false success.
                    if let Err(e) = client.outputs(&history).await {
                        job.mark_error(format!("output fetch failed: {e}"));
                    } else {
                        job.mark_complete(artifacts);
                    }
                }
                return;
            }
            Ok(None) => continue,
            Err(e) => {
                job.mark_error(e.to_string());
                return;
            }
        }
    }
}

async fn publish_terminal(job: &Job, aggregator: &Aggregator) {
    let event = if job.status == fleet_core::JobStatus::Complete {
        ClientEvent::GenerationComplete {
            generation_id: job.id,
            outputs: job.outputs.clone(),
        }
    } else {
        ClientEvent::Error {
            generation_id: job.id,
            message: job
                .error_message
                .clone()
                .unwrap_or_else(|| "job failed".to_string()),
        }
    };
    aggregator.publish(&job.session_id, event).await;
}

async fn publish_batch_progress(job: &Job, ctx: &BatchContext, aggregator: &Aggregator) {
    let Some(batch_id) = job.batch_id else {
        return;
    };
    let completed = ctx.tracker.record_completion(batch_id);

    aggregator
        .publish(
            &job.session_id,
            ClientEvent::BatchProgress {
                generation_id: job.id,
                batch_id,
                completed,
                total: ctx.total,
                latest_result: job.batch_index.map(|index| LatestResult {
                    generation_id: job.id,
                    index,
                }),
            },
        )
        .await;

    if completed >= ctx.total {
        ctx.tracker.forget(batch_id);
        aggregator
            .publish(
                &job.session_id,
                ClientEvent::BatchComplete {
                    generation_id: job.id,
                    batch_id,
                    total: ctx.total,
                },
            )
            .await;
    }
}
