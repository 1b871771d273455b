//! Progress aggregator: one long-running subscriber per worker's
//! event-stream connection, fanning decoded events out to the client
//! sessions subscribed to the owning job.

mod aggregator;
mod endpoint;
mod event;
mod subscriber;

pub use aggregator::{Aggregator, PromptMapEntry};
pub use endpoint::ClientEndpoint;
pub use event::{decode_frame, WorkerEvent};
pub use subscriber::{spawn_subscriber, EventConnector, EventSource, SubscriberHandle, TungsteniteConnector};
