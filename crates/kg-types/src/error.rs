use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("invalid photo key: {0}")]
    InvalidPhotoKey(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
