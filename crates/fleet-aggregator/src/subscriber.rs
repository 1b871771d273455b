//! Per-worker event-stream subscriber with exponential-backoff reconnect.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_tungstenite::tungstenite::Message;

use crate::aggregator::Aggregator;
use crate::event::{decode_frame, WorkerEvent};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// A decoded stream of worker events. `next_event` returns `None` when the
/// underlying connection has closed, signalling the caller to reconnect.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Option<WorkerEvent>;
}

/// Opens a fresh connection to a worker's event-stream endpoint.
#[async_trait]
pub trait EventConnector: Send + Sync {
    async fn connect(&self, url: &str) -> anyhow::Result<Box<dyn EventSource>>;
}

pub struct TungsteniteConnector;

#[async_trait]
impl EventConnector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> anyhow::Result<Box<dyn EventSource>> {
        let (stream, _) = tokio_tungstenite::connect_async(url).await?;
        Ok(Box::new(TungsteniteSource { stream }))
    }
}

struct TungsteniteSource {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl EventSource for TungsteniteSource {
    async fn next_event(&mut self) -> Option<WorkerEvent> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if let Some(event) = decode_frame(&text) {
                        return Some(event);
                    }
                    // Unrecognized/undecodable frame: keep reading.
                }
                Some(Ok(Message::Binary(_))) => {
                    // Image previews — ignored.
                }
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "worker event stream read error");
                    return None;
                }
            }
        }
    }
}

pub struct SubscriberHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SubscriberHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

pub fn spawn_subscriber(
    worker_id: String,
    ws_url: String,
    connector: Arc<dyn EventConnector>,
    aggregator: Arc<Aggregator>,
) -> SubscriberHandle {
    let (tx, rx) = watch::channel(false);
    let join = tokio::spawn(run(worker_id, ws_url, connector, aggregator, rx));
    SubscriberHandle { shutdown: tx, join }
}

async fn run(
    worker_id: String,
    ws_url: String,
    connector: Arc<dyn EventConnector>,
    aggregator: Arc<Aggregator>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        if *shutdown.borrow() {
            return;
        }

        match connector.connect(&ws_url).await {
            Ok(mut source) => {
                backoff = INITIAL_BACKOFF;
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                return;
                            }
                        }
                        event = source.next_event() => {
                            match event {
                                Some(ev) => aggregator.dispatch_worker_event(&worker_id, ev).await,
                                None => {
                                    tracing::debug!(worker_id = %worker_id, "event stream disconnected, reconnecting");
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                tracing::debug!(worker_id = %worker_id, error = %e, "event stream connect failed");
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            return;
                        }
                    }
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::PromptMapEntry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex as AsyncMutex;
    use uuid::Uuid;

    struct ScriptedSource {
        events: std::collections::VecDeque<WorkerEvent>,
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn next_event(&mut self) -> Option<WorkerEvent> {
            self.events.pop_front()
        }
    }

    struct ScriptedConnector {
        attempts: AtomicUsize,
        scripts: AsyncMutex<Vec<Result<Vec<WorkerEvent>, ()>>>,
    }

    #[async_trait]
    impl EventConnector for ScriptedConnector {
        async fn connect(&self, _url: &str) -> anyhow::Result<Box<dyn EventSource>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let mut scripts = self.scripts.lock().await;
            if scripts.is_empty() {
                return Err(anyhow::anyhow!("no more scripted connections"));
            }
            match scripts.remove(0) {
                Ok(events) => Ok(Box::new(ScriptedSource {
                    events: events.into(),
                })),
                Err(()) => Err(anyhow::anyhow!("scripted connect failure")),
            }
        }
    }

    #[tokio::test]
    async fn reconnects_after_disconnect_and_keeps_dispatching() {
        let aggregator = Arc::new(Aggregator::new());
        aggregator
            .register(
                "p1".to_string(),
                PromptMapEntry {
                    session_id: "s1".to_string(),
                    generation_id: Uuid::new_v4(),
                    worker_id: "w1".to_string(),
                },
            )
            .await;

        let connector = Arc::new(ScriptedConnector {
            attempts: AtomicUsize::new(0),
            scripts: AsyncMutex::new(vec![
                Ok(vec![WorkerEvent::ExecutionComplete {
                    prompt_id: "p1".to_string(),
                }]),
                Ok(vec![]),
            ]),
        });

        let handle = spawn_subscriber(
            "w1".to_string(),
            "ws://example/ws".to_string(),
            connector.clone() as Arc<dyn EventConnector>,
            aggregator,
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop().await;

        assert!(connector.attempts.load(Ordering::SeqCst) >= 1);
    }
}
