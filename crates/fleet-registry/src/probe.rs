//! Health probe loop: every `interval`, probe each worker concurrently
//! with a small capability/stats fetch and a queue-depth fetch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fleet_worker_client::WorkerApi;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::registry::WorkerRegistry;

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(10);

/// A cancellation-safe background health-probe loop. Dropping without
/// calling `stop` leaks the task; `stop` cancels it and awaits termination.
pub struct ProbeHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ProbeHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

pub fn spawn_probe_loop(
    registry: Arc<WorkerRegistry>,
    clients: HashMap<String, Arc<dyn WorkerApi>>,
    interval: Duration,
) -> ProbeHandle {
    let (tx, mut rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() || *rx.borrow() {
                        return;
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    probe_once(&registry, &clients).await;
                }
            }
        }
    });

    ProbeHandle { shutdown: tx, join }
}

async fn probe_once(registry: &WorkerRegistry, clients: &HashMap<String, Arc<dyn WorkerApi>>) {
    let tasks = registry.all().into_iter().map(|node| {
        let client = clients.get(node.id()).cloned();
        async move {
            let Some(client) = client else {
                tracing::warn!(worker_id = node.id(), "no client configured for worker");
                return;
            };

            let start = Instant::now();
            let stats = client.stats_ok().await;
            if let Err(e) = stats {
                tracing::warn!(worker_id = node.id(), error = %e, "health probe failed");
                node.record_probe_failure();
                return;
            }

            match client.queue_status().await {
                Ok(status) => {
                    let latency_ms = start.elapsed().as_millis() as u64;
                    node.record_probe_success(latency_ms, status.depth());
                }
                Err(e) => {
                    tracing::warn!(worker_id = node.id(), error = %e, "queue-depth probe failed");
                    node.record_probe_failure();
                }
            }
        }
    });

    futures_util::future::join_all(tasks).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use fleet_core::{Tier, WorkerSpec};
    use fleet_worker_client::{HistoryEntry, QueueStatus, WorkerClientError};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubClient {
        healthy: AtomicBool,
    }

    #[async_trait]
    impl WorkerApi for StubClient {
        async fn submit(&self, _graph: &serde_json::Value) -> Result<String, WorkerClientError> {
            unimplemented!()
        }
        async fn history(&self, _id: &str) -> Result<Option<HistoryEntry>, WorkerClientError> {
            unimplemented!()
        }
        async fn outputs(&self, _h: &HistoryEntry) -> Result<Vec<(String, Bytes)>, WorkerClientError> {
            unimplemented!()
        }
        async fn fetch(&self, _f: &str, _s: &str, _k: &str) -> Result<Bytes, WorkerClientError> {
            unimplemented!()
        }
        async fn upload(&self, _b: Vec<u8>, _f: &str) -> Result<String, WorkerClientError> {
            unimplemented!()
        }
        async fn queue_status(&self) -> Result<QueueStatus, WorkerClientError> {
            Ok(QueueStatus {
                queue_running: vec![serde_json::json!({})],
                queue_pending: vec![],
            })
        }
        async fn stats_ok(&self) -> Result<(), WorkerClientError> {
            if self.healthy.load(Ordering::Acquire) {
                Ok(())
            } else {
                Err(WorkerClientError::WorkerUnavailable("down".into()))
            }
        }
    }

    #[tokio::test]
    async fn probe_once_marks_healthy_and_records_queue_depth() {
        let registry = Arc::new(WorkerRegistry::from_specs(vec![WorkerSpec {
            id: "a".into(),
            name: "a".into(),
            capabilities: HashSet::new(),
            tier: Tier::Draft,
            vram_gb: 8,
            host: "h".into(),
            port: 1,
            max_resolution: 512,
            max_batch: 4,
        }]));

        let mut clients: HashMap<String, Arc<dyn WorkerApi>> = HashMap::new();
        clients.insert(
            "a".into(),
            Arc::new(StubClient {
                healthy: AtomicBool::new(true),
            }),
        );

        probe_once(&registry, &clients).await;

        let node = registry.get("a").unwrap();
        assert!(node.healthy());
        assert_eq!(node.queue_length(), 1);
    }

    #[tokio::test]
    async fn probe_once_marks_unhealthy_on_failure() {
        let registry = Arc::new(WorkerRegistry::from_specs(vec![WorkerSpec {
            id: "a".into(),
            name: "a".into(),
            capabilities: HashSet::new(),
            tier: Tier::Draft,
            vram_gb: 8,
            host: "h".into(),
            port: 1,
            max_resolution: 512,
            max_batch: 4,
        }]));
        registry.get("a").unwrap().set_healthy(true);

        let mut clients: HashMap<String, Arc<dyn WorkerApi>> = HashMap::new();
        clients.insert(
            "a".into(),
            Arc::new(StubClient {
                healthy: AtomicBool::new(false),
            }),
        );

        probe_once(&registry, &clients).await;
        assert!(!registry.get("a").unwrap().healthy());
    }
}
