use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use kg_store::{PhotoStore, PostStore};
use kg_types::{NewPost, PhotoKey, Post, PostId, Topic, UserId};

use crate::conflict;
use crate::effects::Effects;
use crate::error::{ServiceError, ServiceResult};

/// Photo posts.
#[derive(Clone)]
pub struct ContentService {
    posts: Arc<dyn PostStore>,
    photos: Arc<dyn PhotoStore>,
    effects: Effects,
}

impl ContentService {
    pub fn new(posts: Arc<dyn PostStore>, photos: Arc<dyn PhotoStore>, effects: Effects) -> Self {
        Self {
            posts,
            photos,
            effects,
        }
    }

    /// Store the photo, then the post row pointing at it, then publish a
    /// `post` event carrying the inserted metadata.
    ///
    /// A photo uploaded for a post whose insert fails stays in the photo
    /// store unreferenced.
    pub async fn create_post(
        &self,
        user: UserId,
        caption: &str,
        filename: &str,
        data: Bytes,
    ) -> ServiceResult<PostId> {
        const OP: &str = "service.post.create";
        if filename.is_empty() {
            return Err(ServiceError::InvalidInput("photo filename is required".into()));
        }
        if data.is_empty() {
            return Err(ServiceError::InvalidInput("photo is empty".into()));
        }

        let key = PhotoKey::derive(filename, &data, Utc::now());
        self.effects
            .store(OP, self.photos.put(&key, data))
            .await?
            .map_err(|e| conflict::translate(OP, e, conflict::none))?;

        let post = NewPost {
            user_id: user,
            caption: caption.to_string(),
            image_url: key.url(),
        };
        let id = self
            .effects
            .store(OP, self.posts.insert_post(&post))
            .await?
            .map_err(|e| conflict::translate(OP, e, conflict::post))?;

        tracing::info!(post = %id, user = %user, photo = %key, "post created");
        self.effects.notify(OP, Topic::Post, &post).await?;
        Ok(id)
    }

    pub async fn get_post(&self, id: PostId) -> ServiceResult<Post> {
        const OP: &str = "service.post.get";
        match self.effects.store(OP, self.posts.get_post(id)).await? {
            Ok(Some(post)) => Ok(post),
            Ok(None) => Err(ServiceError::PostNotFound),
            Err(e) => Err(conflict::translate(OP, e, conflict::none)),
        }
    }

    pub async fn list_posts(&self) -> ServiceResult<Vec<Post>> {
        const OP: &str = "service.post.list";
        self.effects
            .store(OP, self.posts.list_posts())
            .await?
            .map_err(|e| conflict::translate(OP, e, conflict::none))
    }

    pub async fn list_user_posts(&self, user: UserId) -> ServiceResult<Vec<Post>> {
        const OP: &str = "service.post.list_by_user";
        self.effects
            .store(OP, self.posts.list_posts_by_user(user))
            .await?
            .map_err(|e| conflict::translate(OP, e, conflict::none))
    }

    /// Delete a post and its likes. The photo object is kept.
    pub async fn delete_post(&self, id: PostId) -> ServiceResult<()> {
        const OP: &str = "service.post.delete";
        match self.effects.store(OP, self.posts.delete_post(id)).await? {
            Ok(0) => Err(ServiceError::PostNotFound),
            Ok(_) => {
                tracing::info!(post = %id, "post deleted");
                Ok(())
            }
            Err(e) => Err(conflict::translate(OP, e, conflict::none)),
        }
    }
}
