use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use kg_store::{PhotoStore, UserStore};
use kg_types::{PhotoKey, UserId};

use crate::conflict;
use crate::effects::Effects;
use crate::error::{ServiceError, ServiceResult};

/// Profile pictures and raw photo access.
#[derive(Clone)]
pub struct PhotoService {
    users: Arc<dyn UserStore>,
    photos: Arc<dyn PhotoStore>,
    effects: Effects,
}

impl PhotoService {
    pub fn new(users: Arc<dyn UserStore>, photos: Arc<dyn PhotoStore>, effects: Effects) -> Self {
        Self {
            users,
            photos,
            effects,
        }
    }

    /// Store `data` and make it `user`'s profile picture.
    pub async fn upload_profile_pic(
        &self,
        user: UserId,
        filename: &str,
        data: Bytes,
    ) -> ServiceResult<PhotoKey> {
        const OP: &str = "service.photo.profile_pic";
        if filename.is_empty() || data.is_empty() {
            return Err(ServiceError::InvalidInput("photo is required".into()));
        }

        let key = PhotoKey::derive(filename, &data, Utc::now());
        self.effects
            .store(OP, self.photos.put(&key, data))
            .await?
            .map_err(|e| conflict::translate(OP, e, conflict::none))?;

        match self.effects.store(OP, self.users.set_profile_pic(user, &key.url())).await? {
            Ok(0) => Err(ServiceError::UserNotFound),
            Ok(_) => {
                tracing::info!(user = %user, photo = %key, "profile picture updated");
                Ok(key)
            }
            Err(e) => Err(conflict::translate(OP, e, conflict::none)),
        }
    }

    pub async fn get(&self, key: &PhotoKey) -> ServiceResult<Bytes> {
        const OP: &str = "service.photo.get";
        match self.effects.store(OP, self.photos.get(key)).await? {
            Ok(Some(data)) => Ok(data),
            Ok(None) => Err(ServiceError::PhotoNotFound),
            Err(e) => Err(conflict::translate(OP, e, conflict::none)),
        }
    }
}
