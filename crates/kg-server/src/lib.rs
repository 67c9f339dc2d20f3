//! HTTP server for kirkagram.
//!
//! Exposes the domain services as a JSON API under `/api`, plus `/health`
//! and `/info`. Handlers only decode requests, call one service operation
//! and map its outcome; every status code for a failure comes from
//! [`ApiError`].

pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod router;
pub mod server;
pub mod state;

pub use config::{
    HttpConfig, LogConfig, LogEnv, NotifyConfig, PhotoConfig, ServerConfig, StorageConfig,
};
pub use error::{ApiError, ServerError, ServerResult};
pub use server::{migrate, KgServer};
pub use state::AppState;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use kg_notify::InMemoryNotifier;
    use kg_service::{ServiceConfig, Services};
    use kg_store::{InMemoryPhotoStore, InMemoryStore, PostStore, UserStore};
    use kg_types::{FollowRequest, NewPost, NewUser, PostId, Topic, UserId};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use super::*;

    struct TestApp {
        router: Router,
        store: Arc<InMemoryStore>,
        notifier: Arc<InMemoryNotifier>,
    }

    impl TestApp {
        fn new() -> Self {
            let store = Arc::new(InMemoryStore::new());
            let notifier = Arc::new(InMemoryNotifier::new());
            let services = Services::new(
                store.clone(),
                Arc::new(InMemoryPhotoStore::new()),
                notifier.clone(),
                ServiceConfig::default(),
            );
            let router = router::build_router(AppState::new(services), &HttpConfig::default());
            Self {
                router,
                store,
                notifier,
            }
        }

        async fn user(&self, name: &str) -> UserId {
            self.store
                .insert_user(&NewUser {
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    password_hash: "hash".into(),
                })
                .await
                .unwrap()
        }

        async fn post(&self, user: UserId) -> PostId {
            self.store
                .insert_post(&NewPost {
                    user_id: user,
                    caption: "c".into(),
                    image_url: "api/photo/0011223344556677".into(),
                })
                .await
                .unwrap()
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, body.to_vec())
        }

        async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            let (status, bytes) = self.send(request).await;
            (status, parse(&bytes))
        }

        async fn get(&self, uri: &str) -> (StatusCode, Value) {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let (status, bytes) = self.send(request).await;
            (status, parse(&bytes))
        }
    }

    fn parse(bytes: &[u8]) -> Value {
        if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(bytes).unwrap_or(Value::Null)
        }
    }

    const BOUNDARY: &str = "kirkagram-test-boundary";

    fn multipart(uri: &str, fields: &[(&str, &str)], photo: Option<(&str, &[u8])>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, data)) = photo {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    // ----------------------------------------------------------------
    // Meta
    // ----------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint() {
        let app = TestApp::new();
        let (status, body) = app.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn info_endpoint() {
        let app = TestApp::new();
        let (status, body) = app.get("/info").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "kirkagram");
        assert_eq!(body["topics"][0], "follow");
    }

    // ----------------------------------------------------------------
    // Follows
    // ----------------------------------------------------------------

    #[tokio::test]
    async fn follow_scenario() {
        let app = TestApp::new();
        let (a, b) = (app.user("alice").await, app.user("bob").await);
        let edge = json!({"follower_id": a.get(), "following_id": b.get()});

        let (status, body) = app.json(Method::POST, "/api/follow", edge.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"status": 201}));
        let events = app.notifier.events_for(Topic::Follow);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].decode::<FollowRequest>().unwrap(),
            FollowRequest::new(a, b)
        );

        let (status, body) = app.json(Method::POST, "/api/follow", edge.clone()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "ALREADY_EXISTS");

        let self_follow = json!({"follower_id": a.get(), "following_id": a.get()});
        let (status, body) = app.json(Method::POST, "/api/follow", self_follow).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(app.notifier.len(), 1);

        let (status, _) = app.json(Method::DELETE, "/api/unfollow", edge.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = app.json(Method::DELETE, "/api/unfollow", edge).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn follow_decode_errors() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/follow")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, bytes) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(parse(&bytes)["code"], "BAD_REQUEST");

        let (status, _) = app
            .json(Method::POST, "/api/follow", json!({"follower_id": "x"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn follow_unknown_user() {
        let app = TestApp::new();
        let a = app.user("alice").await;
        let (status, _) = app
            .json(
                Method::POST,
                "/api/follow",
                json!({"follower_id": a.get(), "following_id": 404}),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn followers_lists() {
        let app = TestApp::new();
        let (a, b) = (app.user("alice").await, app.user("bob").await);
        app.json(
            Method::POST,
            "/api/follow",
            json!({"follower_id": a.get(), "following_id": b.get()}),
        )
        .await;

        let (status, body) = app.get(&format!("/api/user/{b}/followers")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"username": "alice", "profile_pic": ""}]));
        let (_, body) = app.get(&format!("/api/user/{b}/following")).await;
        assert_eq!(body, json!([]));
    }

    // ----------------------------------------------------------------
    // Likes
    // ----------------------------------------------------------------

    #[tokio::test]
    async fn like_unlike_count() {
        let app = TestApp::new();
        let u = app.user("alice").await;
        let p = app.post(u).await;
        let like = json!({"user_id": u.get(), "post_id": p.get()});

        let (status, _) = app.json(Method::POST, "/api/like", like.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = app.json(Method::POST, "/api/like", like.clone()).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = app.get(&format!("/api/like/{p}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"post_id": p.get(), "count": 1}));

        let (status, body) = app.json(Method::DELETE, "/api/like", like.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": 200}));
        let (_, body) = app.get(&format!("/api/like/{p}")).await;
        assert_eq!(body["count"], 0);

        let (status, _) = app.json(Method::DELETE, "/api/like", like).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let topics: Vec<Topic> = app.notifier.events().iter().map(|e| e.topic).collect();
        assert_eq!(topics, [Topic::Like, Topic::Unlike]);
    }

    #[tokio::test]
    async fn like_count_bad_id() {
        let app = TestApp::new();
        let (status, body) = app.get("/api/like/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    // ----------------------------------------------------------------
    // Users
    // ----------------------------------------------------------------

    #[tokio::test]
    async fn user_lifecycle() {
        let app = TestApp::new();
        let register = json!({"username": "alice", "email": "alice@example.com", "password": "pw"});

        let (status, body) = app.json(Method::POST, "/api/user", register.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();

        let (status, _) = app.json(Method::POST, "/api/user", register).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .json(Method::PUT, "/api/user", json!({"id": id, "bio": "hi"}))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.get(&format!("/api/user/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bio"], "hi");
        assert!(body.get("password_hash").is_none());

        let request = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/user/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.get(&format!("/api/user/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn register_invalid_email() {
        let app = TestApp::new();
        let (status, body) = app
            .json(
                Method::POST,
                "/api/user",
                json!({"username": "a", "email": "nope", "password": "pw"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "invalid email");
    }

    // ----------------------------------------------------------------
    // Posts and photos
    // ----------------------------------------------------------------

    #[tokio::test]
    async fn post_upload_and_fetch_photo() {
        let app = TestApp::new();
        let u = app.user("alice").await;
        let user_id = u.to_string();

        let request = multipart(
            "/api/post",
            &[("user_id", user_id.as_str()), ("caption", "beach")],
            Some(("beach.jpg", b"jpeg-bytes")),
        );
        let (status, bytes) = app.send(request).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = parse(&bytes)["id"].as_i64().unwrap();

        let (status, post) = app.get(&format!("/api/post/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(post["caption"], "beach");
        let url = post["image_url"].as_str().unwrap().to_string();
        assert!(url.starts_with("api/photo/"));

        let request = Request::builder()
            .uri(format!("/{url}"))
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"jpeg-bytes");

        let (_, list) = app.get(&format!("/api/user/{u}/posts")).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(app.notifier.events_for(Topic::Post).len(), 1);
    }

    #[tokio::test]
    async fn post_requires_photo_and_numeric_user() {
        let app = TestApp::new();
        let request = multipart("/api/post", &[("user_id", "1")], None);
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = multipart(
            "/api/post",
            &[("user_id", "one")],
            Some(("a.jpg", b"x")),
        );
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_picture_upload() {
        let app = TestApp::new();
        let u = app.user("alice").await;
        let user_id = u.to_string();

        let request = multipart("/api/photo", &[("id", user_id.as_str())], Some(("me.png", b"png")));
        let (status, bytes) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        let key = parse(&bytes)["filename"].as_str().unwrap().to_string();
        assert_eq!(key.len(), 16);

        let (_, profile) = app.get(&format!("/api/user/{u}")).await;
        assert_eq!(profile["profile_pic"], format!("api/photo/{key}"));
    }

    #[tokio::test]
    async fn photo_lookup_errors() {
        let app = TestApp::new();
        let (status, body) = app.get("/api/photo/0123456789abcdef").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "photo not found");

        let (status, _) = app.get("/api/photo/..%2Fetc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_missing_post() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/api/post/77")
            .body(Body::empty())
            .unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
