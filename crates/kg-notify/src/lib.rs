//! Event notification for kirkagram.
//!
//! After a mutation is persisted the service layer hands a `{topic, payload}`
//! pair to an [`EventNotifier`]. Delivery is at-least-once from the
//! publisher's point of view: nothing here retries, queues or deduplicates,
//! and a failure is reported exactly once to the caller.

pub mod error;
pub mod kafka;
pub mod log;
pub mod memory;

pub use error::{NotifyError, NotifyResult};
pub use kafka::KafkaNotifier;
pub use log::LogNotifier;
pub use memory::InMemoryNotifier;

use async_trait::async_trait;
use kg_types::Topic;

/// Publisher of action events.
///
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    /// Publish `payload` on `topic`. Returns once the publish attempt has
    /// completed or failed.
    async fn publish(&self, topic: Topic, payload: &[u8]) -> NotifyResult<()>;
}
