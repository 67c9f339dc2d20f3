//! Recording notifier for tests and embedding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use kg_types::{Event, Topic};

use crate::error::{NotifyError, NotifyResult};
use crate::EventNotifier;

const CHANNEL_CAPACITY: usize = 256;

/// Keeps every published [`Event`] in order and fans it out to subscribers.
///
/// [`InMemoryNotifier::set_failing`] makes subsequent publishes fail with
/// [`NotifyError::Unavailable`] without recording anything, which lets tests
/// exercise the write-succeeded-but-notify-failed path.
#[derive(Debug)]
pub struct InMemoryNotifier {
    events: Mutex<Vec<Event>>,
    failing: AtomicBool,
    tx: broadcast::Sender<Event>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            events: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            tx,
        }
    }

    /// A notifier that rejects every publish.
    pub fn failing() -> Self {
        let notifier = Self::new();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Receive events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Snapshot of every recorded event, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn events_for(&self, topic: Topic) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.topic == topic)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventNotifier for InMemoryNotifier {
    async fn publish(&self, topic: Topic, payload: &[u8]) -> NotifyResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Unavailable("broker offline".into()));
        }
        let event = Event::new(topic, payload.to_vec());
        self.events
            .lock()
            .map_err(|e| NotifyError::Unavailable(format!("lock poisoned: {e}")))?
            .push(event.clone());
        // No subscribers is not an error.
        let _ = self.tx.send(event);
        Ok(())
    }
}
