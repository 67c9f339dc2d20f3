use std::sync::Arc;

use kg_store::{FollowStore, UserStore};
use kg_types::{FollowRequest, FollowerSummary, Topic, UserId};

use crate::conflict;
use crate::effects::Effects;
use crate::error::{ServiceError, ServiceResult};

/// Follow and unfollow edges between users.
#[derive(Clone)]
pub struct RelationshipService {
    follows: Arc<dyn FollowStore>,
    users: Arc<dyn UserStore>,
    effects: Effects,
}

impl RelationshipService {
    pub fn new(follows: Arc<dyn FollowStore>, users: Arc<dyn UserStore>, effects: Effects) -> Self {
        Self {
            follows,
            users,
            effects,
        }
    }

    /// Create the edge `follower -> following` and publish a `follow` event.
    ///
    /// Self-follows are rejected before the store is touched. A repeat
    /// follow is [`ServiceError::AlreadyFollowed`] unless the duplicate
    /// policy is idempotent, in which case it succeeds without an event.
    pub async fn follow(&self, req: FollowRequest) -> ServiceResult<()> {
        const OP: &str = "service.follow.follow";
        if req.is_self_reference() {
            return Err(ServiceError::SelfFollow);
        }

        let written = match self.effects.store(OP, self.follows.insert_follow(&req)).await? {
            Ok(0) => Err(ServiceError::AlreadyFollowed),
            Ok(_) => Ok(()),
            Err(e) => Err(conflict::translate(OP, e, conflict::follow)),
        };
        if let Err(err) = written {
            return self.effects.absorb_duplicate(OP, err);
        }

        tracing::info!(
            follower = %req.follower_id,
            following = %req.following_id,
            "user followed"
        );
        self.effects.notify(OP, Topic::Follow, &req).await
    }

    /// Remove the edge `follower -> following` and publish an `unfollow` event.
    pub async fn unfollow(&self, req: FollowRequest) -> ServiceResult<()> {
        const OP: &str = "service.follow.unfollow";
        if req.is_self_reference() {
            return Err(ServiceError::SelfUnfollow);
        }

        match self.effects.store(OP, self.follows.delete_follow(&req)).await? {
            Ok(0) => return Err(ServiceError::FollowNotFound),
            Ok(_) => {}
            Err(e) => return Err(conflict::translate(OP, e, conflict::none)),
        }

        tracing::info!(
            follower = %req.follower_id,
            following = %req.following_id,
            "user unfollowed"
        );
        self.effects.notify(OP, Topic::Unfollow, &req).await
    }

    /// Users following `user`.
    pub async fn followers(&self, user: UserId) -> ServiceResult<Vec<FollowerSummary>> {
        const OP: &str = "service.follow.followers";
        match self.effects.store(OP, self.users.followers_of(user)).await? {
            Ok(Some(list)) => Ok(list),
            Ok(None) => Err(ServiceError::UserNotFound),
            Err(e) => Err(conflict::translate(OP, e, conflict::none)),
        }
    }

    /// Users that `user` follows.
    pub async fn following(&self, user: UserId) -> ServiceResult<Vec<FollowerSummary>> {
        const OP: &str = "service.follow.following";
        match self.effects.store(OP, self.users.following_of(user)).await? {
            Ok(Some(list)) => Ok(list),
            Ok(None) => Err(ServiceError::UserNotFound),
            Err(e) => Err(conflict::translate(OP, e, conflict::none)),
        }
    }
}
