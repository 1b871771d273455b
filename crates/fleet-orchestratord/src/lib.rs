//! Process wiring for the GPU fleet dispatch and progress-aggregation
//! engine: loads the fleet topology and job-graph templates, and exposes
//! the single entry point (`Orchestrator::submit_single` /
//! `submit_batch`) that chains the task router, template engine, and
//! lifecycle driver together the way a REST handler would (that REST
//! surface itself is out of scope — see spec.md §1).

pub mod config;
pub mod error;

use std::collections::HashMap;
use std::sync::Arc;

use fleet_aggregator::{spawn_subscriber, Aggregator, EventConnector, SubscriberHandle, TungsteniteConnector};
use fleet_core::{BatchDescriptor, Capability, Job, TaskType};
use fleet_lifecycle::{drive_job, BatchContext, BatchTracker, DriverConfig};
use fleet_registry::{spawn_probe_loop, ProbeHandle, WorkerRegistry};
use fleet_router::{route, route_batch};
use fleet_templates::{BuildParams, TemplateEngine};
use fleet_worker_client::{HttpWorkerClient, WorkerApi};

pub use config::RuntimeConfig;
pub use error::OrchestratorError;

/// Owns the long-lived, process-wide pieces (B, C, F) and the per-worker
/// HTTP clients (A); the router (D) and lifecycle driver (E) are called
/// per request rather than held as state.
pub struct Orchestrator {
    registry: Arc<WorkerRegistry>,
    templates: Arc<TemplateEngine>,
    aggregator: Arc<Aggregator>,
    clients: HashMap<String, Arc<dyn WorkerApi>>,
    driver_config: DriverConfig,
}

impl Orchestrator {
    pub fn bootstrap(config: &RuntimeConfig) -> Result<Self, OrchestratorError> {
        let registry = Arc::new(WorkerRegistry::load_from_file(&config.fleet_config_path)?);
        let templates = Arc::new(TemplateEngine::load_from_dir(&config.templates_dir)?);
        let aggregator = Arc::new(Aggregator::new());

        let clients = registry
            .all()
            .iter()
            .map(|w| {
                let client: Arc<dyn WorkerApi> = Arc::new(HttpWorkerClient::new(w.base_url()));
                (w.id().to_string(), client)
            })
            .collect();

        Ok(Self {
            registry,
            templates,
            aggregator,
            clients,
            driver_config: DriverConfig::default(),
        })
    }

    /// Spawns the registry's cancellation-safe health-probe loop at the
    /// configured interval.
    pub fn spawn_health_probe(&self, interval: std::time::Duration) -> ProbeHandle {
        spawn_probe_loop(self.registry.clone(), self.clients.clone(), interval)
    }

    /// Spawns one reconnecting event-stream subscriber per worker.
    pub fn spawn_event_subscribers(&self) -> Vec<SubscriberHandle> {
        let connector: Arc<dyn EventConnector> = Arc::new(TungsteniteConnector);
        self.registry
            .all()
            .iter()
            .map(|w| {
                spawn_subscriber(
                    w.id().to_string(),
                    w.ws_url(),
                    connector.clone(),
                    self.aggregator.clone(),
                )
            })
            .collect()
    }

    fn client_for(&self, worker_id: &str) -> Result<Arc<dyn WorkerApi>, OrchestratorError> {
        self.clients
            .get(worker_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::NoClientForWorker(worker_id.to_string()))
    }

    /// Routes, builds, and drives a single job to completion: D -> C -> E,
    /// registering with F along the way. Mirrors the control flow spec.md
    /// §2 describes for one request.
    pub async fn submit_single(
        &self,
        session_id: impl Into<String>,
        task: TaskType,
        params: BuildParams,
        preferred: Option<&str>,
        family: Option<Capability>,
    ) -> Result<Job, OrchestratorError> {
        let session_id = session_id.into();
        let worker = route(&self.registry, task, preferred, family)?;

        let is_seed_image = params.source_image_filename.is_some();
        let has_adapters = !params.loras.is_empty();
        let template_name = self
            .templates
            .select(&params.model_family, is_seed_image, has_adapters)?;
        let graph = self.templates.build(&template_name, &params, &worker)?;

        let job = Job::new(
            session_id,
            task,
            params.model_family.clone(),
            params_snapshot(&params),
            params.seed,
            worker.id(),
        );
        let client = self.client_for(worker.id())?;

        Ok(drive_job(
            job,
            serde_json::Value::Object(graph),
            worker,
            client,
            self.aggregator.clone(),
            None,
            &self.driver_config,
        )
        .await)
    }

    /// Routes a batch across the capable fleet (D's weighted distribution),
    /// then drives every job concurrently, sharing one `BatchTracker` so
    /// completion counting stays monotone across the whole batch.
    pub async fn submit_batch(
        &self,
        session_id: impl Into<String>,
        task: TaskType,
        count: u32,
        params: BuildParams,
        family: Option<Capability>,
    ) -> Result<Vec<Job>, OrchestratorError> {
        let session_id = session_id.into();
        let allocation = route_batch(&self.registry, task, count, family)?;
        let assignments = allocation
            .iter()
            .map(|(w, n)| (w.id().to_string(), *n))
            .collect();

        // Checkpoint resolution depends on params, not on the assigned
        // worker, so every assignment tallies under the same key here.
        let checkpoint = self.templates.resolve_checkpoint(&params);
        let mut checkpoint_distribution = HashMap::new();
        for (_, n) in &allocation {
            *checkpoint_distribution.entry(checkpoint.clone()).or_insert(0) += n;
        }

        let batch = BatchDescriptor::new(session_id.clone(), count, assignments, checkpoint_distribution);
        let tracker = Arc::new(BatchTracker::new());

        let is_seed_image = params.source_image_filename.is_some();
        let has_adapters = !params.loras.is_empty();
        let template_name = self
            .templates
            .select(&params.model_family, is_seed_image, has_adapters)?;

        let mut futures = Vec::with_capacity(count as usize);
        let mut next_index = 0u32;

        for (worker, n) in allocation {
            let client = self.client_for(worker.id())?;
            let graph = self.templates.build(&template_name, &params, &worker)?;

            for _ in 0..n {
                let mut job = Job::new(
                    session_id.clone(),
                    task,
                    params.model_family.clone(),
                    params_snapshot(&params),
                    params.seed,
                    worker.id(),
                );
                job.batch_id = Some(batch.id);
                job.batch_index = Some(next_index);
                next_index += 1;

                futures.push(drive_job(
                    job,
                    serde_json::Value::Object(graph.clone()),
                    worker.clone(),
                    client.clone(),
                    self.aggregator.clone(),
                    Some(BatchContext {
                        tracker: tracker.clone(),
                        total: batch.count,
                    }),
                    &self.driver_config,
                ));
            }
        }

        Ok(futures_util::future::join_all(futures).await)
    }

    pub async fn shutdown(self, probe: ProbeHandle, subscribers: Vec<SubscriberHandle>) {
        probe.stop().await;
        for subscriber in subscribers {
            subscriber.stop().await;
        }
    }
}

/// The requested parameters snapshot a `Job` carries for the (excluded)
/// persistence layer to echo back later.
fn params_snapshot(params: &BuildParams) -> serde_json::Value {
    serde_json::json!({
        "prompt": params.prompt,
        "negative_prompt": params.negative_prompt,
        "checkpoint": params.checkpoint,
        "width": params.width,
        "height": params.height,
        "steps": params.steps,
        "cfg_scale": params.cfg_scale,
        "sampler": params.sampler,
        "scheduler": params.scheduler,
        "denoise_strength": params.denoise_strength,
        "seed": params.seed,
        "loras": params.loras,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_surfaces_registry_error_for_missing_config() {
        let config = RuntimeConfig {
            fleet_config_path: "/nonexistent/fleet.yaml".into(),
            templates_dir: "/nonexistent/templates".into(),
            probe_interval: std::time::Duration::from_secs(10),
        };
        let result = Orchestrator::bootstrap(&config);
        assert!(matches!(result, Err(OrchestratorError::Registry(_))));
    }
}
