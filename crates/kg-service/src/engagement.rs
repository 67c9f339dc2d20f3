use std::sync::Arc;

use kg_store::LikeStore;
use kg_types::{LikeCount, LikeRequest, PostId, Topic};

use crate::conflict;
use crate::effects::Effects;
use crate::error::{ServiceError, ServiceResult};

/// Likes on posts.
#[derive(Clone)]
pub struct EngagementService {
    likes: Arc<dyn LikeStore>,
    effects: Effects,
}

impl EngagementService {
    pub fn new(likes: Arc<dyn LikeStore>, effects: Effects) -> Self {
        Self { likes, effects }
    }

    /// Record that `user` likes `post` and publish a `like` event.
    ///
    /// Users may like their own posts. The insert is always attempted; the
    /// store's unique key decides concurrent duplicates.
    pub async fn like(&self, req: LikeRequest) -> ServiceResult<()> {
        const OP: &str = "service.like.like";
        let written = match self.effects.store(OP, self.likes.insert_like(&req)).await? {
            // Zero rows with no constraint error still means the edge exists.
            Ok(0) => Err(ServiceError::PostAlreadyLiked),
            Ok(_) => Ok(()),
            Err(e) => Err(conflict::translate(OP, e, conflict::like)),
        };
        if let Err(err) = written {
            return self.effects.absorb_duplicate(OP, err);
        }

        tracing::info!(user = %req.user_id, post = %req.post_id, "post liked");
        self.effects.notify(OP, Topic::Like, &req).await
    }

    /// Remove a like and publish an `unlike` event.
    pub async fn unlike(&self, req: LikeRequest) -> ServiceResult<()> {
        const OP: &str = "service.like.unlike";
        match self.effects.store(OP, self.likes.delete_like(&req)).await? {
            Ok(0) => return Err(ServiceError::LikeNotFound),
            Ok(_) => {}
            Err(e) => return Err(conflict::translate(OP, e, conflict::none)),
        }

        tracing::info!(user = %req.user_id, post = %req.post_id, "post unliked");
        self.effects.notify(OP, Topic::Unlike, &req).await
    }

    pub async fn like_count(&self, post: PostId) -> ServiceResult<LikeCount> {
        const OP: &str = "service.like.count";
        let count = self
            .effects
            .store(OP, self.likes.count_likes(post))
            .await?
            .map_err(|e| conflict::translate(OP, e, conflict::none))?;
        Ok(LikeCount {
            post_id: post,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use kg_store::StoreResult;
    use kg_types::UserId;

    use super::*;
    use crate::testing::Fixture;
    use crate::{DuplicatePolicy, ErrorKind, ServiceConfig};

    /// Reports zero affected rows on insert without raising a constraint.
    struct SilentLikes {
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl LikeStore for SilentLikes {
        async fn insert_like(&self, _: &LikeRequest) -> StoreResult<u64> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }

        async fn delete_like(&self, _: &LikeRequest) -> StoreResult<u64> {
            Ok(0)
        }

        async fn count_likes(&self, _: PostId) -> StoreResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn like_then_duplicate() {
        let fx = Fixture::new();
        let u = fx.user("alice").await;
        let p = fx.post(u).await;
        let svc = &fx.services.engagement;

        svc.like(LikeRequest::new(u, p)).await.unwrap();
        let err = svc.like(LikeRequest::new(u, p)).await.unwrap_err();

        assert!(matches!(err, ServiceError::PostAlreadyLiked));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(svc.like_count(p).await.unwrap().count, 1);
        assert_eq!(fx.notifier.events_for(Topic::Like).len(), 1);
    }

    #[tokio::test]
    async fn zero_rows_is_already_liked() {
        let fx = Fixture::new();
        let likes = Arc::new(SilentLikes {
            inserts: AtomicUsize::new(0),
        });
        let svc = EngagementService::new(
            likes.clone(),
            Effects::new(fx.notifier.clone(), ServiceConfig::default()),
        );

        let err = svc
            .like(LikeRequest::new(UserId(1), PostId(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PostAlreadyLiked));
        assert_eq!(likes.inserts.load(Ordering::SeqCst), 1);
        assert!(fx.notifier.is_empty());
    }

    #[tokio::test]
    async fn idempotent_like() {
        let fx = Fixture::with_config(ServiceConfig {
            duplicate_policy: DuplicatePolicy::Idempotent,
            ..ServiceConfig::default()
        });
        let u = fx.user("alice").await;
        let p = fx.post(u).await;
        let svc = &fx.services.engagement;

        svc.like(LikeRequest::new(u, p)).await.unwrap();
        svc.like(LikeRequest::new(u, p)).await.unwrap();

        assert_eq!(svc.like_count(p).await.unwrap().count, 1);
        assert_eq!(fx.notifier.len(), 1);
    }

    #[tokio::test]
    async fn idempotent_policy_keeps_not_found() {
        let fx = Fixture::with_config(ServiceConfig {
            duplicate_policy: DuplicatePolicy::Idempotent,
            ..ServiceConfig::default()
        });
        let u = fx.user("alice").await;

        let err = fx
            .services
            .engagement
            .like(LikeRequest::new(u, PostId(404)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PostNotFound));
    }

    #[tokio::test]
    async fn like_missing_references() {
        let fx = Fixture::new();
        let u = fx.user("alice").await;
        let p = fx.post(u).await;
        let svc = &fx.services.engagement;

        assert!(matches!(
            svc.like(LikeRequest::new(UserId(77), p)).await,
            Err(ServiceError::UserNotFound)
        ));
        assert!(matches!(
            svc.like(LikeRequest::new(u, PostId(77))).await,
            Err(ServiceError::PostNotFound)
        ));
        assert!(fx.notifier.is_empty());
    }

    #[tokio::test]
    async fn like_own_post() {
        let fx = Fixture::new();
        let u = fx.user("alice").await;
        let p = fx.post(u).await;

        fx.services
            .engagement
            .like(LikeRequest::new(u, p))
            .await
            .unwrap();
        let event = &fx.notifier.events()[0];
        assert_eq!(event.topic, Topic::Like);
        assert_eq!(event.decode::<LikeRequest>().unwrap(), LikeRequest::new(u, p));
    }

    #[tokio::test]
    async fn like_unlike_round_trip() {
        let fx = Fixture::new();
        let u = fx.user("alice").await;
        let p = fx.post(u).await;
        let svc = &fx.services.engagement;

        svc.like(LikeRequest::new(u, p)).await.unwrap();
        svc.unlike(LikeRequest::new(u, p)).await.unwrap();

        assert_eq!(svc.like_count(p).await.unwrap(), LikeCount { post_id: p, count: 0 });
        let topics: Vec<Topic> = fx.notifier.events().iter().map(|e| e.topic).collect();
        assert_eq!(topics, [Topic::Like, Topic::Unlike]);
    }

    #[tokio::test]
    async fn unlike_without_like() {
        let fx = Fixture::new();
        let u = fx.user("alice").await;
        let p = fx.post(u).await;

        let err = fx
            .services
            .engagement
            .unlike(LikeRequest::new(u, p))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::LikeNotFound));
        assert!(fx.notifier.is_empty());
    }

    #[tokio::test]
    async fn count_publishes_nothing() {
        let fx = Fixture::new();
        let svc = &fx.services.engagement;
        assert_eq!(svc.like_count(PostId(9)).await.unwrap().count, 0);
        assert!(fx.notifier.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_likes_single_winner() {
        const N: usize = 32;
        let fx = Fixture::new();
        let u = fx.user("alice").await;
        let p = fx.post(u).await;

        let handles: Vec<_> = (0..N)
            .map(|_| {
                let svc = fx.services.engagement.clone();
                tokio::spawn(async move { svc.like(LikeRequest::new(u, p)).await })
            })
            .collect();
        let mut results = Vec::with_capacity(N);
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(ServiceError::PostAlreadyLiked)))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(conflicts, N - 1);
        assert_eq!(fx.services.engagement.like_count(p).await.unwrap().count, 1);
        assert_eq!(fx.notifier.len(), 1);
    }
}
