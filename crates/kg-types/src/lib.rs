//! Foundation types for kirkagram.
//!
//! Every other kirkagram crate depends on `kg-types`. It carries no I/O:
//! just identifiers, entity models, request payloads and the action events
//! published after a successful mutation.
//!
//! # Key Types
//!
//! - [`UserId`], [`PostId`] -- integer primary keys of the relational store
//! - [`FollowRequest`], [`LikeRequest`] -- edge requests, also used as event payloads
//! - [`Topic`], [`Event`] -- fire-and-forget action notifications
//! - [`PhotoKey`] -- derived object-store key for uploaded images

pub mod error;
pub mod event;
pub mod ids;
pub mod models;
pub mod photo;

pub use error::TypeError;
pub use event::{Event, Topic};
pub use ids::{PostId, UserId};
pub use models::{
    is_valid_email, FollowRequest, FollowerSummary, LikeCount, LikeRequest, NewPost, NewUser,
    Post, RegisterUser, UpdateUser, User, UserProfile,
};
pub use photo::{PhotoKey, PHOTO_KEY_BYTES, PHOTO_URL_PREFIX};
