//! In-memory relational store for tests and ephemeral deployments.
//!
//! [`InMemoryStore`] keeps every table behind one `RwLock`. Each write checks
//! its constraints and applies the change under the same write guard, so the
//! store is the single arbiter when callers race on the same key: exactly one
//! insert of a pair succeeds and the rest observe a unique violation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use kg_types::{
    FollowRequest, FollowerSummary, LikeRequest, NewPost, NewUser, Post, PostId, UpdateUser, User,
    UserId,
};

use crate::error::{ConstraintKind, StoreError, StoreResult};
use crate::schema;
use crate::traits::{FollowStore, LikeStore, PostStore, UserStore};

#[derive(Debug, Default)]
struct Tables {
    last_user_id: i64,
    last_post_id: i64,
    users: BTreeMap<UserId, User>,
    posts: BTreeMap<PostId, Post>,
    likes: BTreeSet<(UserId, PostId)>,
    follows: BTreeSet<(UserId, UserId)>,
}

impl Tables {
    fn check_user_unique(&self, skip: Option<UserId>, username: &str, email: &str) -> StoreResult<()> {
        for user in self.users.values().filter(|u| Some(u.id) != skip) {
            if user.email == email {
                return Err(StoreError::constraint(ConstraintKind::Unique, schema::USER_EMAIL_KEY));
            }
            if user.username == username {
                return Err(StoreError::constraint(
                    ConstraintKind::Unique,
                    schema::USER_USERNAME_KEY,
                ));
            }
        }
        Ok(())
    }

    fn require_user(&self, id: UserId, fkey: &str) -> StoreResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::constraint(ConstraintKind::ForeignKey, fkey))
        }
    }

    fn summaries(&self, ids: impl Iterator<Item = UserId>) -> Vec<FollowerSummary> {
        let mut out: Vec<FollowerSummary> = ids
            .filter_map(|id| self.users.get(&id))
            .map(|u| FollowerSummary {
                username: u.username.clone(),
                profile_pic: u.profile_pic.clone().unwrap_or_default(),
            })
            .collect();
        out.sort_by(|a, b| a.username.cmp(&b.username));
        out
    }

    fn delete_post_cascade(&mut self, id: PostId) -> bool {
        self.likes.retain(|(_, post)| *post != id);
        self.posts.remove(&id).is_some()
    }
}

/// In-memory implementation of every relational port.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn user_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.users.len())
    }

    /// Number of stored follow edges.
    pub fn follow_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.follows.len())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &NewUser) -> StoreResult<UserId> {
        let mut t = self.write()?;
        t.check_user_unique(None, &user.username, &user.email)?;
        t.last_user_id += 1;
        let id = UserId(t.last_user_id);
        t.users.insert(
            id,
            User {
                id,
                username: user.username.clone(),
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
                bio: String::new(),
                profile_pic: None,
            },
        );
        Ok(id)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn update_user(&self, update: &UpdateUser) -> StoreResult<u64> {
        let mut t = self.write()?;
        let Some(current) = t.users.get(&update.id).cloned() else {
            return Ok(0);
        };
        let username = update.username.clone().unwrap_or(current.username);
        let email = update.email.clone().unwrap_or(current.email);
        t.check_user_unique(Some(update.id), &username, &email)?;

        if let Some(user) = t.users.get_mut(&update.id) {
            user.username = username;
            user.email = email;
            if let Some(bio) = &update.bio {
                user.bio = bio.clone();
            }
        }
        Ok(1)
    }

    async fn set_profile_pic(&self, id: UserId, url: &str) -> StoreResult<u64> {
        let mut t = self.write()?;
        match t.users.get_mut(&id) {
            Some(user) => {
                user.profile_pic = Some(url.to_string());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<u64> {
        let mut t = self.write()?;
        if t.users.remove(&id).is_none() {
            return Ok(0);
        }
        t.follows.retain(|(a, b)| *a != id && *b != id);
        t.likes.retain(|(user, _)| *user != id);
        let owned: Vec<PostId> = t
            .posts
            .values()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        for post in owned {
            t.delete_post_cascade(post);
        }
        Ok(1)
    }

    async fn followers_of(&self, id: UserId) -> StoreResult<Option<Vec<FollowerSummary>>> {
        let t = self.read()?;
        if !t.users.contains_key(&id) {
            return Ok(None);
        }
        let ids = t
            .follows
            .iter()
            .filter(|(_, following)| *following == id)
            .map(|(follower, _)| *follower);
        Ok(Some(t.summaries(ids)))
    }

    async fn following_of(&self, id: UserId) -> StoreResult<Option<Vec<FollowerSummary>>> {
        let t = self.read()?;
        if !t.users.contains_key(&id) {
            return Ok(None);
        }
        let ids = t
            .follows
            .range((id, UserId(i64::MIN))..=(id, UserId(i64::MAX)))
            .map(|(_, following)| *following);
        Ok(Some(t.summaries(ids)))
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn insert_post(&self, post: &NewPost) -> StoreResult<PostId> {
        let mut t = self.write()?;
        t.require_user(post.user_id, schema::POST_USER_FKEY)?;
        t.last_post_id += 1;
        let id = PostId(t.last_post_id);
        let now = Utc::now();
        t.posts.insert(
            id,
            Post {
                id,
                user_id: post.user_id,
                image_url: post.image_url.clone(),
                caption: post.caption.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn get_post(&self, id: PostId) -> StoreResult<Option<Post>> {
        Ok(self.read()?.posts.get(&id).cloned())
    }

    async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        Ok(self.read()?.posts.values().cloned().collect())
    }

    async fn list_posts_by_user(&self, user: UserId) -> StoreResult<Vec<Post>> {
        Ok(self
            .read()?
            .posts
            .values()
            .filter(|p| p.user_id == user)
            .cloned()
            .collect())
    }

    async fn delete_post(&self, id: PostId) -> StoreResult<u64> {
        let mut t = self.write()?;
        Ok(u64::from(t.delete_post_cascade(id)))
    }
}

#[async_trait]
impl LikeStore for InMemoryStore {
    async fn insert_like(&self, like: &LikeRequest) -> StoreResult<u64> {
        let mut t = self.write()?;
        t.require_user(like.user_id, schema::LIKE_USER_FKEY)?;
        if !t.posts.contains_key(&like.post_id) {
            return Err(StoreError::constraint(
                ConstraintKind::ForeignKey,
                schema::LIKE_POST_FKEY,
            ));
        }
        if !t.likes.insert((like.user_id, like.post_id)) {
            return Err(StoreError::constraint(
                ConstraintKind::Unique,
                schema::LIKE_USER_POST_KEY,
            ));
        }
        Ok(1)
    }

    async fn delete_like(&self, like: &LikeRequest) -> StoreResult<u64> {
        let mut t = self.write()?;
        Ok(u64::from(t.likes.remove(&(like.user_id, like.post_id))))
    }

    async fn count_likes(&self, post: PostId) -> StoreResult<u64> {
        let t = self.read()?;
        Ok(t.likes.iter().filter(|(_, p)| *p == post).count() as u64)
    }
}

#[async_trait]
impl FollowStore for InMemoryStore {
    async fn insert_follow(&self, follow: &FollowRequest) -> StoreResult<u64> {
        let mut t = self.write()?;
        t.require_user(follow.follower_id, schema::FOLLOW_FOLLOWER_FKEY)?;
        t.require_user(follow.following_id, schema::FOLLOW_FOLLOWING_FKEY)?;
        if follow.is_self_reference() {
            return Err(StoreError::constraint(
                ConstraintKind::Check,
                schema::FOLLOW_NO_SELF_CHECK,
            ));
        }
        if !t.follows.insert((follow.follower_id, follow.following_id)) {
            return Err(StoreError::constraint(
                ConstraintKind::Unique,
                schema::FOLLOW_PAIR_KEY,
            ));
        }
        Ok(1)
    }

    async fn delete_follow(&self, follow: &FollowRequest) -> StoreResult<u64> {
        let mut t = self.write()?;
        Ok(u64::from(
            t.follows.remove(&(follow.follower_id, follow.following_id)),
        ))
    }
}
