//! A client endpoint subscribed to a session's event stream.

use async_trait::async_trait;
use fleet_core::ClientEvent;

/// One client-facing sink (a websocket connection, an SSE stream, …).
/// Returns `false` when the send failed and the endpoint should be
/// pruned from its session's subscriber list.
#[async_trait]
pub trait ClientEndpoint: Send + Sync {
    async fn send(&self, event: &ClientEvent) -> bool;
}
