//! Translation of store outcomes into domain errors.
//!
//! Three tiers, applied to every store write:
//!
//! 1. a known unique (or check) constraint becomes a specific domain error;
//! 2. a known foreign-key constraint becomes a not-found error for the
//!    referenced entity;
//! 3. anything else is wrapped with the operation name as
//!    [`ServiceError::Internal`] and logged.
//!
//! Rules match on the structured constraint identifier only.

use kg_store::{schema, ConstraintKind, StoreError};

use crate::error::ServiceError;

/// Maps a violated constraint to a domain error, or `None` if the rule does
/// not recognise it.
pub type Rule = fn(ConstraintKind, &str) -> Option<ServiceError>;

pub fn translate(op: &'static str, err: StoreError, rule: Rule) -> ServiceError {
    if let Some((kind, name)) = err.violated_constraint() {
        if let Some(domain) = rule(kind, name) {
            tracing::debug!(op, constraint = name, error = %domain, "store conflict classified");
            return domain;
        }
    }
    tracing::error!(op, error = %err, "unclassified store failure");
    ServiceError::Internal { op, source: err }
}

pub fn follow(kind: ConstraintKind, name: &str) -> Option<ServiceError> {
    match (kind, name) {
        (ConstraintKind::Unique, schema::FOLLOW_PAIR_KEY) => Some(ServiceError::AlreadyFollowed),
        (ConstraintKind::ForeignKey, schema::FOLLOW_FOLLOWER_FKEY | schema::FOLLOW_FOLLOWING_FKEY) => {
            Some(ServiceError::UserNotFound)
        }
        (ConstraintKind::Check, schema::FOLLOW_NO_SELF_CHECK) => Some(ServiceError::SelfFollow),
        _ => None,
    }
}

pub fn like(kind: ConstraintKind, name: &str) -> Option<ServiceError> {
    match (kind, name) {
        (ConstraintKind::Unique, schema::LIKE_USER_POST_KEY) => Some(ServiceError::PostAlreadyLiked),
        (ConstraintKind::ForeignKey, schema::LIKE_USER_FKEY) => Some(ServiceError::UserNotFound),
        (ConstraintKind::ForeignKey, schema::LIKE_POST_FKEY) => Some(ServiceError::PostNotFound),
        _ => None,
    }
}

pub fn user(kind: ConstraintKind, name: &str) -> Option<ServiceError> {
    match (kind, name) {
        (ConstraintKind::Unique, schema::USER_EMAIL_KEY) => {
            Some(ServiceError::EmailAlreadyRegistered)
        }
        (ConstraintKind::Unique, schema::USER_USERNAME_KEY) => {
            Some(ServiceError::UsernameAlreadyRegistered)
        }
        _ => None,
    }
}

pub fn post(kind: ConstraintKind, name: &str) -> Option<ServiceError> {
    match (kind, name) {
        (ConstraintKind::ForeignKey, schema::POST_USER_FKEY) => Some(ServiceError::UserNotFound),
        _ => None,
    }
}

/// Rule for operations that expect no constraint violations at all.
pub fn none(_: ConstraintKind, _: &str) -> Option<ServiceError> {
    None
}
