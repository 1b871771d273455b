//! PromptMap and SessionSink: correlates worker-assigned job identifiers
//! with client sessions, and fans out client events to subscribed
//! endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use fleet_core::ClientEvent;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::endpoint::ClientEndpoint;
use crate::event::WorkerEvent;

/// One live mapping from a worker's job identifier back to the owning
/// client session and generation.
#[derive(Debug, Clone)]
pub struct PromptMapEntry {
    pub session_id: String,
    pub generation_id: Uuid,
    pub worker_id: String,
}

#[derive(Default)]
pub struct Aggregator {
    prompt_map: RwLock<HashMap<String, PromptMapEntry>>,
    sinks: RwLock<HashMap<String, Vec<Arc<dyn ClientEndpoint>>>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `(worker_job_id -> session, generation, worker)`. Called
    /// by the lifecycle driver immediately after a successful submit.
    pub async fn register(&self, worker_job_id: String, entry: PromptMapEntry) {
        self.prompt_map.write().await.insert(worker_job_id, entry);
    }

    /// Removes the mapping. Called by the lifecycle driver in its
    /// terminal cleanup path, regardless of how the job ended.
    pub async fn unregister(&self, worker_job_id: &str) {
        self.prompt_map.write().await.remove(worker_job_id);
    }

    pub async fn subscribe(&self, session_id: String, endpoint: Arc<dyn ClientEndpoint>) {
        self.sinks.write().await.entry(session_id).or_default().push(endpoint);
    }

    /// Removes `endpoint` from `session_id`'s subscriber list by pointer
    /// identity; emptying the list removes the session entry entirely.
    pub async fn unsubscribe(&self, session_id: &str, endpoint: &Arc<dyn ClientEndpoint>) {
        let mut sinks = self.sinks.write().await;
        if let Some(list) = sinks.get_mut(session_id) {
            list.retain(|e| !Arc::ptr_eq(e, endpoint));
            if list.is_empty() {
                sinks.remove(session_id);
            }
        }
    }

    /// Publishes a client event the lifecycle driver constructs directly
    /// (terminal events, batch progress/completion).
    pub async fn publish(&self, session_id: &str, event: ClientEvent) {
        self.send_to_session(session_id, event).await;
    }

    /// Maps one worker event to a client event and dispatches it,
    /// resolving the owning job by `prompt_id` when present, else by the
    /// "active job on this worker" fallback. Produces no client event for
    /// an unresolvable job (invariant 5).
    pub async fn dispatch_worker_event(&self, worker_id: &str, event: WorkerEvent) {
        let (client_event, session_id) = match event {
            WorkerEvent::Progress { value, max, prompt_id } => {
                let Some(entry) = self.resolve(worker_id, prompt_id.as_deref()).await else {
                    return;
                };
                let percent = if max == 0 { 0 } else { (value * 100) / max };
                (
                    ClientEvent::GenerationProgress {
                        generation_id: entry.generation_id,
                        step: value,
                        total_steps: max,
                        percent,
                    },
                    entry.session_id,
                )
            }
            WorkerEvent::Executed { prompt_id, node, has_images } => {
                if !has_images {
                    return;
                }
                let Some(entry) = self.resolve(worker_id, Some(&prompt_id)).await else {
                    return;
                };
                (
                    ClientEvent::GenerationNodeComplete {
                        generation_id: entry.generation_id,
                        node_id: node,
                        has_images,
                    },
                    entry.session_id,
                )
            }
            WorkerEvent::ExecutionComplete { prompt_id } => {
                let Some(entry) = self.resolve(worker_id, Some(&prompt_id)).await else {
                    return;
                };
                (
                    ClientEvent::GenerationCompleteSignal {
                        generation_id: entry.generation_id,
                    },
                    entry.session_id,
                )
            }
            WorkerEvent::ExecutionError { prompt_id, exception_message } => {
                let Some(entry) = self.resolve(worker_id, Some(&prompt_id)).await else {
                    return;
                };
                (
                    ClientEvent::Error {
                        generation_id: entry.generation_id,
                        message: exception_message,
                    },
                    entry.session_id,
                )
            }
        };

        self.send_to_session(&session_id, client_event).await;
    }

    /// Resolves a job by explicit prompt id, falling back to "any
    /// registered prompt on this worker" when the event carries none.
    /// Approximate by design — see the design notes on multi-job workers.
    async fn resolve(&self, worker_id: &str, prompt_id: Option<&str>) -> Option<PromptMapEntry> {
        let map = self.prompt_map.read().await;
        if let Some(id) = prompt_id {
            return map.get(id).cloned();
        }
        map.values().find(|e| e.worker_id == worker_id).cloned()
    }

    async fn send_to_session(&self, session_id: &str, event: ClientEvent) {
        let endpoints = {
            let sinks = self.sinks.read().await;
            match sinks.get(session_id) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        let mut dead = Vec::new();
        for endpoint in &endpoints {
            if !endpoint.send(&event).await {
                dead.push(Arc::clone(endpoint));
            }
        }

        if dead.is_empty() {
            return;
        }
        let mut sinks = self.sinks.write().await;
        if let Some(list) = sinks.get_mut(session_id) {
            list.retain(|e| !dead.iter().any(|d| Arc::ptr_eq(d, e)));
            if list.is_empty() {
                sinks.remove(session_id);
            }
        }
    }
}
