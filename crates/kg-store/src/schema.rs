//! Relational schema and the constraint identifiers it declares.
//!
//! The names below are the contract between backends and the service layer's
//! conflict translation. The in-memory backend reports exactly these names so
//! that both backends classify identically.

pub const USER_EMAIL_KEY: &str = "user_email_key";
pub const USER_USERNAME_KEY: &str = "user_username_key";

pub const POST_USER_FKEY: &str = "post_user_id_fkey";

pub const LIKE_USER_POST_KEY: &str = "like_user_id_post_id_key";
pub const LIKE_USER_FKEY: &str = "like_user_id_fkey";
pub const LIKE_POST_FKEY: &str = "like_post_id_fkey";

pub const FOLLOW_PAIR_KEY: &str = "follow_follower_id_following_id_key";
pub const FOLLOW_FOLLOWER_FKEY: &str = "follow_follower_id_fkey";
pub const FOLLOW_FOLLOWING_FKEY: &str = "follow_following_id_fkey";
pub const FOLLOW_NO_SELF_CHECK: &str = "follow_no_self_check";

/// DDL applied by `kirkagram migrate`. Idempotent.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "user" (
    id          BIGSERIAL PRIMARY KEY,
    username    TEXT NOT NULL CONSTRAINT user_username_key UNIQUE,
    email       TEXT NOT NULL CONSTRAINT user_email_key UNIQUE,
    password    TEXT NOT NULL,
    bio         TEXT NOT NULL DEFAULT '',
    profile_pic TEXT
);

CREATE TABLE IF NOT EXISTS "post" (
    id         BIGSERIAL PRIMARY KEY,
    user_id    BIGINT NOT NULL
               CONSTRAINT post_user_id_fkey REFERENCES "user" (id) ON DELETE CASCADE,
    image_url  TEXT NOT NULL,
    caption    TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS "like" (
    id         BIGSERIAL PRIMARY KEY,
    user_id    BIGINT NOT NULL
               CONSTRAINT like_user_id_fkey REFERENCES "user" (id) ON DELETE CASCADE,
    post_id    BIGINT NOT NULL
               CONSTRAINT like_post_id_fkey REFERENCES "post" (id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT like_user_id_post_id_key UNIQUE (user_id, post_id)
);

CREATE TABLE IF NOT EXISTS "follow" (
    follower_id  BIGINT NOT NULL
                 CONSTRAINT follow_follower_id_fkey REFERENCES "user" (id) ON DELETE CASCADE,
    following_id BIGINT NOT NULL
                 CONSTRAINT follow_following_id_fkey REFERENCES "user" (id) ON DELETE CASCADE,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT follow_follower_id_following_id_key UNIQUE (follower_id, following_id),
    CONSTRAINT follow_no_self_check CHECK (follower_id <> following_id)
);
"#;
