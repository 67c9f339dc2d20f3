//! Fixtures shared by the service tests.

use std::sync::Arc;

use kg_notify::InMemoryNotifier;
use kg_store::{InMemoryPhotoStore, InMemoryStore, PostStore, UserStore};
use kg_types::{NewPost, NewUser, PostId, UserId};

use crate::{ServiceConfig, Services};

pub(crate) struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub photos: Arc<InMemoryPhotoStore>,
    pub notifier: Arc<InMemoryNotifier>,
    pub services: Services,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        Self::build(config, InMemoryNotifier::new())
    }

    pub fn build(config: ServiceConfig, notifier: InMemoryNotifier) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let photos = Arc::new(InMemoryPhotoStore::new());
        let notifier = Arc::new(notifier);
        let services = Services::new(store.clone(), photos.clone(), notifier.clone(), config);
        Self {
            store,
            photos,
            notifier,
            services,
        }
    }

    /// Insert a user directly, bypassing registration.
    pub async fn user(&self, name: &str) -> UserId {
        self.store
            .insert_user(&NewUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                password_hash: "hash".into(),
            })
            .await
            .unwrap()
    }

    /// Insert a post directly; no event is published.
    pub async fn post(&self, user: UserId) -> PostId {
        self.store
            .insert_post(&NewPost {
                user_id: user,
                caption: "caption".into(),
                image_url: "api/photo/0000000000000000".into(),
            })
            .await
            .unwrap()
    }
}
