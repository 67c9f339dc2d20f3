//! The two side effects every mutation performs: a bounded store call and a
//! bounded publish.

use std::future::Future;
use std::sync::Arc;

use kg_notify::EventNotifier;
use kg_store::StoreResult;
use kg_types::{Event, Topic};
use serde::Serialize;

use crate::config::{DuplicatePolicy, NotifyFailurePolicy, ServiceConfig};
use crate::error::{ErrorKind, ServiceError, ServiceResult};

#[derive(Clone)]
pub struct Effects {
    notifier: Arc<dyn EventNotifier>,
    config: ServiceConfig,
}

impl Effects {
    pub fn new(notifier: Arc<dyn EventNotifier>, config: ServiceConfig) -> Self {
        Self { notifier, config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// `true` when repeat Follow/Like should succeed silently.
    pub fn idempotent(&self) -> bool {
        self.config.duplicate_policy == DuplicatePolicy::Idempotent
    }

    /// Resolve a conflict from a repeated edge insert.
    ///
    /// Under [`DuplicatePolicy::Idempotent`] a conflict becomes a silent
    /// success; every other error passes through.
    pub fn absorb_duplicate(&self, op: &'static str, err: ServiceError) -> ServiceResult<()> {
        if self.idempotent() && err.kind() == ErrorKind::Conflict {
            tracing::debug!(op, error = %err, "repeat edge treated as no-op");
            return Ok(());
        }
        Err(err)
    }

    /// Run a store call under the configured timeout.
    ///
    /// The inner store result is returned untouched so the caller can
    /// classify it; only an elapsed timeout becomes a [`ServiceError`].
    pub async fn store<T, F>(&self, op: &'static str, fut: F) -> ServiceResult<StoreResult<T>>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let after = self.config.store_timeout();
        match tokio::time::timeout(after, fut).await {
            Ok(result) => Ok(result),
            Err(_) => {
                tracing::error!(op, ?after, "store call timed out");
                Err(ServiceError::Timeout { op, after })
            }
        }
    }

    /// Publish `payload` as JSON on `topic`.
    ///
    /// Called only after the write has been persisted. Under
    /// [`NotifyFailurePolicy::Log`] a failure is logged and swallowed.
    pub async fn notify<T: Serialize>(
        &self,
        op: &'static str,
        topic: Topic,
        payload: &T,
    ) -> ServiceResult<()> {
        let event = Event::json(topic, payload)
            .map_err(|e| ServiceError::unexpected(op, format!("encode {topic} event: {e}")))?;
        let after = self.config.publish_timeout();
        let publish = self.notifier.publish(event.topic, &event.payload);
        let reason = match tokio::time::timeout(after, publish).await {
            Ok(Ok(())) => {
                tracing::debug!(op, %topic, bytes = event.payload.len(), "event published");
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {after:?}"),
        };
        match self.config.notify_failure {
            NotifyFailurePolicy::Log => {
                tracing::warn!(op, %topic, %reason, "event not published; write kept");
                Ok(())
            }
            NotifyFailurePolicy::Fail => {
                tracing::error!(op, %topic, %reason, "event not published; write kept");
                Err(ServiceError::Notify { topic, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use kg_notify::{InMemoryNotifier, NotifyResult};
    use kg_store::StoreError;
    use kg_types::{FollowRequest, UserId};

    use super::*;

    struct StalledNotifier;

    #[async_trait]
    impl EventNotifier for StalledNotifier {
        async fn publish(&self, _topic: Topic, _payload: &[u8]) -> NotifyResult<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn config(notify_failure: NotifyFailurePolicy) -> ServiceConfig {
        ServiceConfig {
            notify_failure,
            store_timeout_ms: 20,
            publish_timeout_ms: 20,
            ..ServiceConfig::default()
        }
    }

    #[tokio::test]
    async fn publishes_json_payload() {
        let notifier = Arc::new(InMemoryNotifier::new());
        let effects = Effects::new(notifier.clone(), ServiceConfig::default());
        let req = FollowRequest::new(UserId(1), UserId(2));
        effects.notify("op", Topic::Follow, &req).await.unwrap();

        let events = notifier.events_for(Topic::Follow);
        assert_eq!(events.len(), 1);
        let decoded: FollowRequest = events[0].decode().unwrap();
        assert_eq!(decoded, req);
    }

    #[tokio::test]
    async fn publish_failure_logged_by_default() {
        let effects = Effects::new(
            Arc::new(InMemoryNotifier::failing()),
            config(NotifyFailurePolicy::Log),
        );
        assert!(effects.notify("op", Topic::Like, &1u8).await.is_ok());
    }

    #[tokio::test]
    async fn publish_failure_surfaces_when_fatal() {
        let effects = Effects::new(
            Arc::new(InMemoryNotifier::failing()),
            config(NotifyFailurePolicy::Fail),
        );
        let err = effects.notify("op", Topic::Like, &1u8).await.unwrap_err();
        assert!(matches!(err, ServiceError::Notify { topic: Topic::Like, .. }));
    }

    #[tokio::test]
    async fn publish_timeout_is_a_notify_failure() {
        let effects = Effects::new(Arc::new(StalledNotifier), config(NotifyFailurePolicy::Fail));
        let err = effects.notify("op", Topic::Post, &1u8).await.unwrap_err();
        match err {
            ServiceError::Notify { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("expected notify error, got {other:?}"),
        }

        let lenient = Effects::new(Arc::new(StalledNotifier), config(NotifyFailurePolicy::Log));
        assert!(lenient.notify("op", Topic::Post, &1u8).await.is_ok());
    }

    #[tokio::test]
    async fn store_timeout() {
        let effects = Effects::new(
            Arc::new(InMemoryNotifier::new()),
            config(NotifyFailurePolicy::Log),
        );
        let err = effects
            .store("op", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, StoreError>(1u64)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Timeout { op: "op", .. }));

        let inner = effects
            .store("op", async { Err::<u64, _>(StoreError::Backend("x".into())) })
            .await
            .unwrap();
        assert!(inner.is_err());
    }
}
