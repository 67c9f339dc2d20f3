use async_trait::async_trait;
use bytes::Bytes;

use kg_types::{
    FollowRequest, FollowerSummary, LikeRequest, NewPost, NewUser, PhotoKey, Post, PostId,
    UpdateUser, User, UserId,
};

use crate::error::StoreResult;

/// Rows of the `user` relation.
///
/// Unique `email` and `username`; deleting a user cascades to the posts,
/// likes and follow edges that reference it.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user and return its new id.
    async fn insert_user(&self, user: &NewUser) -> StoreResult<UserId>;

    /// Returns `Ok(None)` if no such user exists.
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Apply the present fields of `update`. Returns affected rows.
    async fn update_user(&self, update: &UpdateUser) -> StoreResult<u64>;

    /// Point the user's profile picture at `url`. Returns affected rows.
    async fn set_profile_pic(&self, id: UserId, url: &str) -> StoreResult<u64>;

    /// Returns affected rows.
    async fn delete_user(&self, id: UserId) -> StoreResult<u64>;

    /// Users following `id`, or `Ok(None)` if `id` does not exist.
    async fn followers_of(&self, id: UserId) -> StoreResult<Option<Vec<FollowerSummary>>>;

    /// Users `id` follows, or `Ok(None)` if `id` does not exist.
    async fn following_of(&self, id: UserId) -> StoreResult<Option<Vec<FollowerSummary>>>;
}

/// Rows of the `post` relation.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, post: &NewPost) -> StoreResult<PostId>;
    async fn get_post(&self, id: PostId) -> StoreResult<Option<Post>>;
    async fn list_posts(&self) -> StoreResult<Vec<Post>>;
    async fn list_posts_by_user(&self, user: UserId) -> StoreResult<Vec<Post>>;
    async fn delete_post(&self, id: PostId) -> StoreResult<u64>;
}

/// `(user_id, post_id)` edges, unique per pair.
#[async_trait]
pub trait LikeStore: Send + Sync {
    /// Insert the edge. Returns affected rows; a duplicate pair is reported
    /// as a unique-constraint error, not as zero rows.
    async fn insert_like(&self, like: &LikeRequest) -> StoreResult<u64>;

    /// Returns affected rows (zero when the edge did not exist).
    async fn delete_like(&self, like: &LikeRequest) -> StoreResult<u64>;

    async fn count_likes(&self, post: PostId) -> StoreResult<u64>;
}

/// Ordered `(follower_id, following_id)` edges, unique per pair.
#[async_trait]
pub trait FollowStore: Send + Sync {
    async fn insert_follow(&self, follow: &FollowRequest) -> StoreResult<u64>;

    /// Returns affected rows (zero when the edge did not exist).
    async fn delete_follow(&self, follow: &FollowRequest) -> StoreResult<u64>;
}

/// A single backend serving every relational port.
pub trait RelationalStore: UserStore + PostStore + LikeStore + FollowStore {}

impl<T: UserStore + PostStore + LikeStore + FollowStore> RelationalStore for T {}

/// Key/value storage for photo bytes.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Store `data` under `key`, replacing any previous object.
    async fn put(&self, key: &PhotoKey, data: Bytes) -> StoreResult<()>;

    /// Returns `Ok(None)` for "no such key".
    async fn get(&self, key: &PhotoKey) -> StoreResult<Option<Bytes>>;
}
