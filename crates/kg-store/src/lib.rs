//! Storage ports and backends for kirkagram.
//!
//! The relational side is split into one port per entity ([`UserStore`],
//! [`PostStore`], [`LikeStore`], [`FollowStore`]); photo bytes live behind
//! [`PhotoStore`]. Services only ever talk to these traits.
//!
//! # Conflict signalling
//!
//! Backends report uniqueness, foreign-key and check violations as
//! [`StoreError::Constraint`], carrying the constraint identifier from
//! [`schema`]. Mutations return affected-row counts; reads return `Option`
//! for "no such row". Nothing above this crate inspects message text.
//!
//! # Backends
//!
//! - [`InMemoryStore`] -- lock-guarded tables enforcing the same constraints
//!   as the SQL schema; the default for tests and `storage = "memory"`
//! - [`PgStore`] -- PostgreSQL through a `deadpool-postgres` pool
//! - [`InMemoryPhotoStore`], [`FsPhotoStore`] -- photo objects

pub mod error;
pub mod memory;
pub mod photos;
pub mod postgres;
pub mod schema;
pub mod traits;

pub use error::{ConstraintKind, StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use photos::{FsPhotoStore, InMemoryPhotoStore};
pub use postgres::PgStore;
pub use traits::{FollowStore, LikeStore, PhotoStore, PostStore, RelationalStore, UserStore};
