use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use kg_types::Topic;

use crate::error::NotifyResult;
use crate::EventNotifier;

/// Notifier that only records each event as a structured `tracing` line.
///
/// Useful for local runs without a broker. The offset is a per-process
/// sequence number standing in for a broker-assigned offset.
#[derive(Debug, Default)]
pub struct LogNotifier {
    offset: AtomicU64,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events published so far.
    pub fn published(&self) -> u64 {
        self.offset.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventNotifier for LogNotifier {
    async fn publish(&self, topic: Topic, payload: &[u8]) -> NotifyResult<()> {
        let offset = self.offset.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            topic = %topic,
            offset,
            bytes = payload.len(),
            payload = %String::from_utf8_lossy(payload),
            "message sent"
        );
        Ok(())
    }
}
