use kg_types::Topic;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The broker or transport could not be reached.
    #[error("notifier unavailable: {0}")]
    Unavailable(String),

    /// The broker refused the message.
    #[error("publish to {topic} rejected: {reason}")]
    Rejected { topic: Topic, reason: String },
}

pub type NotifyResult<T> = Result<T, NotifyError>;
