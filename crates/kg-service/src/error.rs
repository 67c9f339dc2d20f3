use std::time::Duration;

use kg_store::StoreError;
use kg_types::Topic;
use thiserror::Error;

/// Coarse classification of a [`ServiceError`].
///
/// The HTTP layer maps these to status codes without looking any deeper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected before any store access; the caller must fix the request.
    Validation,
    /// The store already holds the edge or unique value.
    Conflict,
    /// A referenced user, post, edge or photo is absent.
    NotFound,
    /// The write succeeded but the event could not be published.
    Notify,
    /// Unclassified store or infrastructure failure.
    Internal,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("user cannot follow themselves")]
    SelfFollow,

    #[error("user cannot unfollow themselves")]
    SelfUnfollow,

    #[error("invalid email")]
    InvalidEmail,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("user already followed")]
    AlreadyFollowed,

    #[error("post already liked")]
    PostAlreadyLiked,

    #[error("user with this email already exists")]
    EmailAlreadyRegistered,

    #[error("user with this username already exists")]
    UsernameAlreadyRegistered,

    #[error("user not found")]
    UserNotFound,

    #[error("post not found")]
    PostNotFound,

    #[error("follow not found")]
    FollowNotFound,

    #[error("like not found")]
    LikeNotFound,

    #[error("photo not found")]
    PhotoNotFound,

    #[error("publish to {topic} failed: {reason}")]
    Notify { topic: Topic, reason: String },

    #[error("{op}: {source}")]
    Internal {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{op}: timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("{op}: {message}")]
    Unexpected { op: &'static str, message: String },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SelfFollow | Self::SelfUnfollow | Self::InvalidEmail | Self::InvalidInput(_) => {
                ErrorKind::Validation
            }
            Self::AlreadyFollowed
            | Self::PostAlreadyLiked
            | Self::EmailAlreadyRegistered
            | Self::UsernameAlreadyRegistered => ErrorKind::Conflict,
            Self::UserNotFound
            | Self::PostNotFound
            | Self::FollowNotFound
            | Self::LikeNotFound
            | Self::PhotoNotFound => ErrorKind::NotFound,
            Self::Notify { .. } => ErrorKind::Notify,
            Self::Internal { .. } | Self::Timeout { .. } | Self::Unexpected { .. } => {
                ErrorKind::Internal
            }
        }
    }

    pub(crate) fn unexpected(op: &'static str, message: impl Into<String>) -> Self {
        Self::Unexpected {
            op,
            message: message.into(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
