use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::{BoxError, Router};
use kg_service::ServiceError;
use tower::timeout::error::Elapsed;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::HttpConfig;
use crate::error::ApiError;
use crate::handler;
use crate::state::AppState;

/// Build the axum router with all kirkagram endpoints.
pub fn build_router(state: AppState, http: &HttpConfig) -> Router {
    let api = Router::new()
        .route("/follow", post(handler::follow_handler))
        .route("/unfollow", delete(handler::unfollow_handler))
        .route(
            "/like",
            post(handler::like_handler).delete(handler::unlike_handler),
        )
        .route("/like/:post_id", get(handler::like_count_handler))
        .route(
            "/user",
            post(handler::register_handler).put(handler::update_user_handler),
        )
        .route(
            "/user/:id",
            get(handler::get_user_handler).delete(handler::delete_user_handler),
        )
        .route("/user/:id/followers", get(handler::followers_handler))
        .route("/user/:id/following", get(handler::following_handler))
        .route("/user/:id/posts", get(handler::user_posts_handler))
        .route(
            "/post",
            post(handler::create_post_handler).get(handler::list_posts_handler),
        )
        .route(
            "/post/:id",
            get(handler::get_post_handler).delete(handler::delete_post_handler),
        )
        .route("/photo", post(handler::upload_photo_handler))
        .route("/photo/:key", get(handler::get_photo_handler));

    let router = Router::new()
        .route("/health", get(handler::health_handler))
        .route("/info", get(handler::info_handler))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(http.body_limit));
    let router = with_request_timeout(router, http.request_timeout())
        .layer(TraceLayer::new_for_http());

    let router = if http.permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };
    router.with_state(state)
}

/// Abort requests that run longer than `after`, answering with the usual
/// JSON error body.
fn with_request_timeout<S>(router: Router<S>, after: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                timeout_error(err, after)
            }))
            .timeout(after),
    )
}

fn timeout_error(err: BoxError, after: Duration) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::warn!(timeout_ms = after.as_millis() as u64, "request timed out");
        ApiError::Timeout(after)
    } else {
        ApiError::Service(ServiceError::Unexpected {
            op: "http.request",
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::util::ServiceExt;

    use super::*;

    fn slow_router(after: Duration) -> Router {
        let slow = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "done"
            }),
        );
        with_request_timeout(slow.route("/fast", get(|| async { "ok" })), after)
    }

    async fn send(router: Router, uri: &str) -> (StatusCode, bytes::Bytes) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        (status, to_bytes(response.into_body(), usize::MAX).await.unwrap())
    }

    #[tokio::test]
    async fn timeout_returns_json_error() {
        let (status, body) = send(slow_router(Duration::from_millis(20)), "/slow").await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "REQUEST_TIMEOUT");
        assert_eq!(json["message"], "request timed out after 20ms");
    }

    #[tokio::test]
    async fn fast_request_unaffected() {
        let (status, body) = send(slow_router(Duration::from_secs(1)), "/fast").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"ok");
    }

    #[test]
    fn other_layer_errors_are_internal() {
        let err = timeout_error("boom".into(), Duration::from_secs(1));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
