use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use kg_types::Topic;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;

use crate::error::{NotifyError, NotifyResult};
use crate::EventNotifier;

/// Notifier backed by a Kafka producer.
///
/// Each publish waits for the broker's delivery report, so a successful
/// return means the event has been written to a partition.
pub struct KafkaNotifier {
    producer: FutureProducer,
    brokers: String,
    delivery_timeout: Duration,
}

impl KafkaNotifier {
    /// Create a producer for `brokers` (comma separated `host:port` list).
    ///
    /// No connection is made here; broker failures surface on publish.
    pub fn connect(brokers: &str, delivery_timeout: Duration) -> NotifyResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", delivery_timeout.as_millis().to_string())
            .create()
            .map_err(|e| NotifyError::Unavailable(e.to_string()))?;

        tracing::info!(brokers, "kafka producer created");
        Ok(Self {
            producer,
            brokers: brokers.to_owned(),
            delivery_timeout,
        })
    }

    pub fn brokers(&self) -> &str {
        &self.brokers
    }
}

impl fmt::Debug for KafkaNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaNotifier")
            .field("brokers", &self.brokers)
            .field("delivery_timeout", &self.delivery_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventNotifier for KafkaNotifier {
    async fn publish(&self, topic: Topic, payload: &[u8]) -> NotifyResult<()> {
        let record: FutureRecord<'_, (), [u8]> = FutureRecord::to(topic.as_str()).payload(payload);
        match self
            .producer
            .send(record, Timeout::After(self.delivery_timeout))
            .await
        {
            Ok((partition, offset)) => {
                tracing::info!(
                    topic = %topic,
                    partition,
                    offset,
                    bytes = payload.len(),
                    "message sent"
                );
                Ok(())
            }
            Err((err, _)) => Err(classify(topic, &err)),
        }
    }
}

/// Map a delivery failure onto the notifier error taxonomy.
///
/// Errors the broker raises against this particular message are `Rejected`;
/// transport and queueing failures are `Unavailable`.
pub(crate) fn classify(topic: Topic, err: &KafkaError) -> NotifyError {
    match err {
        KafkaError::MessageProduction(code) if is_rejection(*code) => NotifyError::Rejected {
            topic,
            reason: code.to_string(),
        },
        other => NotifyError::Unavailable(other.to_string()),
    }
}

fn is_rejection(code: RDKafkaErrorCode) -> bool {
    matches!(
        code,
        RDKafkaErrorCode::MessageSizeTooLarge
            | RDKafkaErrorCode::InvalidMessage
            | RDKafkaErrorCode::UnknownTopic
            | RDKafkaErrorCode::UnknownTopicOrPartition
            | RDKafkaErrorCode::TopicAuthorizationFailed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_errors_are_rejections() {
        let err = KafkaError::MessageProduction(RDKafkaErrorCode::MessageSizeTooLarge);
        match classify(Topic::Post, &err) {
            NotifyError::Rejected { topic, .. } => assert_eq!(topic, Topic::Post),
            other => panic!("expected rejection, got {other:?}"),
        }

        let err = KafkaError::MessageProduction(RDKafkaErrorCode::TopicAuthorizationFailed);
        assert!(matches!(
            classify(Topic::Like, &err),
            NotifyError::Rejected { topic: Topic::Like, .. }
        ));
    }

    #[test]
    fn transport_errors_are_unavailable() {
        for code in [
            RDKafkaErrorCode::MessageTimedOut,
            RDKafkaErrorCode::AllBrokersDown,
            RDKafkaErrorCode::QueueFull,
        ] {
            let err = KafkaError::MessageProduction(code);
            assert!(matches!(
                classify(Topic::Follow, &err),
                NotifyError::Unavailable(_)
            ));
        }
        assert!(matches!(
            classify(Topic::Follow, &KafkaError::Canceled),
            NotifyError::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn unreachable_broker_reports_unavailable() {
        let notifier = KafkaNotifier::connect("127.0.0.1:9", Duration::from_millis(200)).unwrap();
        assert_eq!(notifier.brokers(), "127.0.0.1:9");

        let err = notifier.publish(Topic::Like, b"{}").await.unwrap_err();
        assert!(matches!(err, NotifyError::Unavailable(_)), "{err:?}");
    }
}
