//! PostgreSQL backend.
//!
//! Constraint violations are recognised by SQLSTATE class plus the
//! constraint name the server attaches to the error, never by message text.

use async_trait::async_trait;
use deadpool_postgres::{Config, Object, Pool, PoolConfig, Runtime};
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use kg_types::{
    FollowRequest, FollowerSummary, LikeRequest, NewPost, NewUser, Post, PostId, UpdateUser, User,
    UserId,
};

use crate::error::{ConstraintKind, StoreError, StoreResult};
use crate::schema::SCHEMA;
use crate::traits::{FollowStore, LikeStore, PostStore, UserStore};

/// Map a driver error onto [`StoreError`] using its structured fields.
pub fn classify(err: tokio_postgres::Error) -> StoreError {
    if let Some(db) = err.as_db_error() {
        let code = db.code();
        let kind = if code == &SqlState::UNIQUE_VIOLATION {
            Some(ConstraintKind::Unique)
        } else if code == &SqlState::FOREIGN_KEY_VIOLATION {
            Some(ConstraintKind::ForeignKey)
        } else if code == &SqlState::CHECK_VIOLATION {
            Some(ConstraintKind::Check)
        } else {
            None
        };
        if let (Some(kind), Some(name)) = (kind, db.constraint()) {
            return StoreError::constraint(kind, name);
        }
    }
    StoreError::Backend(err.to_string())
}

/// Relational store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Build a pool for `url`. Connections are opened lazily.
    pub fn connect(url: &str, max_connections: usize) -> StoreResult<Self> {
        let mut cfg = Config::new();
        cfg.url = Some(url.to_string());
        cfg.pool = Some(PoolConfig::new(max_connections));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Apply [`SCHEMA`]. Safe to run repeatedly.
    pub async fn migrate(&self) -> StoreResult<()> {
        let client = self.client().await?;
        client.batch_execute(SCHEMA).await.map_err(classify)?;
        tracing::info!("database schema applied");
        Ok(())
    }

    async fn client(&self) -> StoreResult<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }

    async fn user_exists(client: &Object, id: UserId) -> StoreResult<bool> {
        let row = client
            .query_one(
                r#"SELECT EXISTS (SELECT 1 FROM "user" WHERE id = $1)"#,
                &[&id.get()],
            )
            .await
            .map_err(classify)?;
        Ok(row.get(0))
    }
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PgStore")
            .field("pool_size", &status.size)
            .field("pool_available", &status.available)
            .finish()
    }
}

fn user_from_row(row: &Row) -> User {
    User {
        id: UserId(row.get("id")),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password"),
        bio: row.get("bio"),
        profile_pic: row.get("profile_pic"),
    }
}

fn post_from_row(row: &Row) -> Post {
    Post {
        id: PostId(row.get("id")),
        user_id: UserId(row.get("user_id")),
        image_url: row.get("image_url"),
        caption: row.get("caption"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn summary_from_row(row: &Row) -> FollowerSummary {
    let pic: Option<String> = row.get("profile_pic");
    FollowerSummary {
        username: row.get("username"),
        profile_pic: pic.unwrap_or_default(),
    }
}

const POST_COLUMNS: &str = "id, user_id, image_url, caption, created_at, updated_at";

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &NewUser) -> StoreResult<UserId> {
        let client = self.client().await?;
        let row = client
            .query_one(
                r#"INSERT INTO "user" (username, email, password) VALUES ($1, $2, $3) RETURNING id"#,
                &[&user.username, &user.email, &user.password_hash],
            )
            .await
            .map_err(classify)?;
        Ok(UserId(row.get(0)))
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                r#"SELECT id, username, email, password, bio, profile_pic FROM "user" WHERE id = $1"#,
                &[&id.get()],
            )
            .await
            .map_err(classify)?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_user(&self, update: &UpdateUser) -> StoreResult<u64> {
        let client = self.client().await?;
        client
            .execute(
                r#"UPDATE "user"
                   SET username = COALESCE($1, username),
                       email    = COALESCE($2, email),
                       bio      = COALESCE($3, bio)
                   WHERE id = $4"#,
                &[
                    &update.username.as_deref(),
                    &update.email.as_deref(),
                    &update.bio.as_deref(),
                    &update.id.get(),
                ],
            )
            .await
            .map_err(classify)
    }

    async fn set_profile_pic(&self, id: UserId, url: &str) -> StoreResult<u64> {
        let client = self.client().await?;
        client
            .execute(
                r#"UPDATE "user" SET profile_pic = $1 WHERE id = $2"#,
                &[&url, &id.get()],
            )
            .await
            .map_err(classify)
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<u64> {
        let client = self.client().await?;
        client
            .execute(r#"DELETE FROM "user" WHERE id = $1"#, &[&id.get()])
            .await
            .map_err(classify)
    }

    async fn followers_of(&self, id: UserId) -> StoreResult<Option<Vec<FollowerSummary>>> {
        let client = self.client().await?;
        if !Self::user_exists(&client, id).await? {
            return Ok(None);
        }
        let rows = client
            .query(
                r#"SELECT u.username, u.profile_pic
                   FROM "follow" f JOIN "user" u ON u.id = f.follower_id
                   WHERE f.following_id = $1
                   ORDER BY u.username"#,
                &[&id.get()],
            )
            .await
            .map_err(classify)?;
        Ok(Some(rows.iter().map(summary_from_row).collect()))
    }

    async fn following_of(&self, id: UserId) -> StoreResult<Option<Vec<FollowerSummary>>> {
        let client = self.client().await?;
        if !Self::user_exists(&client, id).await? {
            return Ok(None);
        }
        let rows = client
            .query(
                r#"SELECT u.username, u.profile_pic
                   FROM "follow" f JOIN "user" u ON u.id = f.following_id
                   WHERE f.follower_id = $1
                   ORDER BY u.username"#,
                &[&id.get()],
            )
            .await
            .map_err(classify)?;
        Ok(Some(rows.iter().map(summary_from_row).collect()))
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn insert_post(&self, post: &NewPost) -> StoreResult<PostId> {
        let client = self.client().await?;
        let row = client
            .query_one(
                r#"INSERT INTO "post" (user_id, image_url, caption) VALUES ($1, $2, $3) RETURNING id"#,
                &[&post.user_id.get(), &post.image_url, &post.caption],
            )
            .await
            .map_err(classify)?;
        Ok(PostId(row.get(0)))
    }

    async fn get_post(&self, id: PostId) -> StoreResult<Option<Post>> {
        let client = self.client().await?;
        let sql = format!(r#"SELECT {POST_COLUMNS} FROM "post" WHERE id = $1"#);
        let row = client
            .query_opt(sql.as_str(), &[&id.get()])
            .await
            .map_err(classify)?;
        Ok(row.as_ref().map(post_from_row))
    }

    async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        let client = self.client().await?;
        let sql = format!(r#"SELECT {POST_COLUMNS} FROM "post" ORDER BY id"#);
        let rows = client.query(sql.as_str(), &[]).await.map_err(classify)?;
        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn list_posts_by_user(&self, user: UserId) -> StoreResult<Vec<Post>> {
        let client = self.client().await?;
        let sql = format!(r#"SELECT {POST_COLUMNS} FROM "post" WHERE user_id = $1 ORDER BY id"#);
        let rows = client
            .query(sql.as_str(), &[&user.get()])
            .await
            .map_err(classify)?;
        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn delete_post(&self, id: PostId) -> StoreResult<u64> {
        let client = self.client().await?;
        client
            .execute(r#"DELETE FROM "post" WHERE id = $1"#, &[&id.get()])
            .await
            .map_err(classify)
    }
}

#[async_trait]
impl LikeStore for PgStore {
    async fn insert_like(&self, like: &LikeRequest) -> StoreResult<u64> {
        let client = self.client().await?;
        client
            .execute(
                r#"INSERT INTO "like" (user_id, post_id) VALUES ($1, $2)"#,
                &[&like.user_id.get(), &like.post_id.get()],
            )
            .await
            .map_err(classify)
    }

    async fn delete_like(&self, like: &LikeRequest) -> StoreResult<u64> {
        let client = self.client().await?;
        client
            .execute(
                r#"DELETE FROM "like" WHERE user_id = $1 AND post_id = $2"#,
                &[&like.user_id.get(), &like.post_id.get()],
            )
            .await
            .map_err(classify)
    }

    async fn count_likes(&self, post: PostId) -> StoreResult<u64> {
        let client = self.client().await?;
        let row = client
            .query_one(
                r#"SELECT COUNT(*) FROM "like" WHERE post_id = $1"#,
                &[&post.get()],
            )
            .await
            .map_err(classify)?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl FollowStore for PgStore {
    async fn insert_follow(&self, follow: &FollowRequest) -> StoreResult<u64> {
        let client = self.client().await?;
        client
            .execute(
                r#"INSERT INTO "follow" (follower_id, following_id) VALUES ($1, $2)"#,
                &[&follow.follower_id.get(), &follow.following_id.get()],
            )
            .await
            .map_err(classify)
    }

    async fn delete_follow(&self, follow: &FollowRequest) -> StoreResult<u64> {
        let client = self.client().await?;
        client
            .execute(
                r#"DELETE FROM "follow" WHERE follower_id = $1 AND following_id = $2"#,
                &[&follow.follower_id.get(), &follow.following_id.get()],
            )
            .await
            .map_err(classify)
    }
}
