use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What a repeated Follow or Like of an existing edge does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail with a conflict error.
    #[default]
    Reject,
    /// Succeed without touching the edge or publishing an event.
    Idempotent,
}

/// What a failed or timed-out publish does to an already persisted write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyFailurePolicy {
    /// Log at `warn` and report success.
    #[default]
    Log,
    /// Surface [`ServiceError::Notify`](crate::ServiceError::Notify).
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub duplicate_policy: DuplicatePolicy,
    pub notify_failure: NotifyFailurePolicy,
    pub store_timeout_ms: u64,
    pub publish_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::default(),
            notify_failure: NotifyFailurePolicy::default(),
            store_timeout_ms: 5_000,
            publish_timeout_ms: 2_000,
        }
    }
}

impl ServiceConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}
