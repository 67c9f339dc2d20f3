//! Domain services for kirkagram.
//!
//! Every mutating operation follows the same path:
//!
//! 1. Validate the request without touching storage (e.g. no self-follow).
//! 2. Attempt the write. There is no existence pre-check: the store's
//!    uniqueness constraints decide races, and the outcome is classified.
//! 3. Translate the store outcome into a [`ServiceError`] exactly once
//!    (constraint conflict, missing reference, or unclassified).
//! 4. On success, publish the request as an event on the operation's topic.
//!    The write is never rolled back if publishing fails.
//!
//! Reads never publish events.

pub mod config;
pub mod conflict;
pub mod content;
pub mod effects;
pub mod engagement;
pub mod error;
mod password;
pub mod photo;
pub mod relationship;
pub mod user;

#[cfg(test)]
mod testing;

pub use config::{DuplicatePolicy, NotifyFailurePolicy, ServiceConfig};
pub use content::ContentService;
pub use effects::Effects;
pub use engagement::EngagementService;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use photo::PhotoService;
pub use relationship::RelationshipService;
pub use user::UserService;

use std::sync::Arc;

use kg_notify::EventNotifier;
use kg_store::{PhotoStore, RelationalStore};

/// Every service wired to one relational backend, one photo backend and one
/// notifier.
#[derive(Clone)]
pub struct Services {
    pub relationships: RelationshipService,
    pub engagement: EngagementService,
    pub content: ContentService,
    pub users: UserService,
    pub photos: PhotoService,
}

impl Services {
    pub fn new<S>(
        store: Arc<S>,
        photos: Arc<dyn PhotoStore>,
        notifier: Arc<dyn EventNotifier>,
        config: ServiceConfig,
    ) -> Self
    where
        S: RelationalStore + 'static,
    {
        let effects = Effects::new(notifier, config);
        Self {
            relationships: RelationshipService::new(store.clone(), store.clone(), effects.clone()),
            engagement: EngagementService::new(store.clone(), effects.clone()),
            content: ContentService::new(store.clone(), photos.clone(), effects.clone()),
            users: UserService::new(store.clone(), effects.clone()),
            photos: PhotoService::new(store, photos, effects),
        }
    }
}
