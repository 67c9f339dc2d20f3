use std::collections::HashMap;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use bytes::Bytes;
use serde_json::{json, Value};

use kg_types::{
    FollowRequest, FollowerSummary, LikeCount, LikeRequest, PhotoKey, Post, PostId, RegisterUser,
    Topic, UpdateUser, UserId, UserProfile,
};

use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

type Acknowledged = (StatusCode, Json<Value>);

fn acknowledged(status: StatusCode) -> Acknowledged {
    (status, Json(json!({ "status": status.as_u16() })))
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler() -> Json<Value> {
    let topics: Vec<&str> = Topic::ALL.iter().map(Topic::as_str).collect();
    Json(json!({
        "name": "kirkagram",
        "version": env!("CARGO_PKG_VERSION"),
        "topics": topics,
    }))
}

// ----------------------------------------------------------------
// Follows
// ----------------------------------------------------------------

pub async fn follow_handler(
    State(state): State<AppState>,
    body: Result<Json<FollowRequest>, JsonRejection>,
) -> ApiResult<Acknowledged> {
    let Json(req) = body?;
    state.services.relationships.follow(req).await?;
    Ok(acknowledged(StatusCode::CREATED))
}

pub async fn unfollow_handler(
    State(state): State<AppState>,
    body: Result<Json<FollowRequest>, JsonRejection>,
) -> ApiResult<Acknowledged> {
    let Json(req) = body?;
    state.services.relationships.unfollow(req).await?;
    Ok(acknowledged(StatusCode::CREATED))
}

pub async fn followers_handler(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Json<Vec<FollowerSummary>>> {
    let Path(id) = id?;
    Ok(Json(state.services.relationships.followers(id).await?))
}

pub async fn following_handler(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Json<Vec<FollowerSummary>>> {
    let Path(id) = id?;
    Ok(Json(state.services.relationships.following(id).await?))
}

// ----------------------------------------------------------------
// Likes
// ----------------------------------------------------------------

pub async fn like_handler(
    State(state): State<AppState>,
    body: Result<Json<LikeRequest>, JsonRejection>,
) -> ApiResult<Acknowledged> {
    let Json(req) = body?;
    state.services.engagement.like(req).await?;
    Ok(acknowledged(StatusCode::CREATED))
}

pub async fn unlike_handler(
    State(state): State<AppState>,
    body: Result<Json<LikeRequest>, JsonRejection>,
) -> ApiResult<Acknowledged> {
    let Json(req) = body?;
    state.services.engagement.unlike(req).await?;
    Ok(acknowledged(StatusCode::OK))
}

pub async fn like_count_handler(
    State(state): State<AppState>,
    post_id: Result<Path<PostId>, PathRejection>,
) -> ApiResult<Json<LikeCount>> {
    let Path(post_id) = post_id?;
    Ok(Json(state.services.engagement.like_count(post_id).await?))
}

// ----------------------------------------------------------------
// Users
// ----------------------------------------------------------------

pub async fn register_handler(
    State(state): State<AppState>,
    body: Result<Json<RegisterUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(req) = body?;
    let id = state.services.users.register(req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Json<UserProfile>> {
    let Path(id) = id?;
    Ok(Json(state.services.users.get(id).await?))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    body: Result<Json<UpdateUser>, JsonRejection>,
) -> ApiResult<Acknowledged> {
    let Json(update) = body?;
    state.services.users.update(update).await?;
    Ok(acknowledged(StatusCode::OK))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Acknowledged> {
    let Path(id) = id?;
    state.services.users.delete(id).await?;
    Ok(acknowledged(StatusCode::OK))
}

pub async fn user_posts_handler(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Json<Vec<Post>>> {
    let Path(id) = id?;
    Ok(Json(state.services.content.list_user_posts(id).await?))
}

// ----------------------------------------------------------------
// Posts and photos
// ----------------------------------------------------------------

/// Multipart form with an optional `photo` file part and plain text fields.
#[derive(Default)]
struct UploadForm {
    photo: Option<(String, Bytes)>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(multipart: Result<Multipart, MultipartRejection>) -> ApiResult<Self> {
        let mut multipart = multipart?;
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "photo" {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                form.photo = Some((filename, data));
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    fn take_photo(&mut self) -> ApiResult<(String, Bytes)> {
        self.photo
            .take()
            .ok_or_else(|| ApiError::bad_request("missing photo part"))
    }

    fn user_id(&self, field: &str) -> ApiResult<UserId> {
        let raw = self.fields.get(field).map(String::as_str).unwrap_or_default();
        raw.parse()
            .map_err(|e| ApiError::bad_request(format!("{field}: {e}")))
    }

    fn text(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or_default()
    }
}

pub async fn create_post_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut form = UploadForm::read(multipart).await?;
    let user = form.user_id("user_id")?;
    let (filename, data) = form.take_photo()?;
    let id = state
        .services
        .content
        .create_post(user, form.text("caption"), &filename, data)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn list_posts_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<Post>>> {
    Ok(Json(state.services.content.list_posts().await?))
}

pub async fn get_post_handler(
    State(state): State<AppState>,
    id: Result<Path<PostId>, PathRejection>,
) -> ApiResult<Json<Post>> {
    let Path(id) = id?;
    Ok(Json(state.services.content.get_post(id).await?))
}

pub async fn delete_post_handler(
    State(state): State<AppState>,
    id: Result<Path<PostId>, PathRejection>,
) -> ApiResult<Acknowledged> {
    let Path(id) = id?;
    state.services.content.delete_post(id).await?;
    Ok(acknowledged(StatusCode::OK))
}

/// Profile picture upload: multipart `photo` and the owner's `id`.
pub async fn upload_photo_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Value>> {
    let mut form = UploadForm::read(multipart).await?;
    let user = form.user_id("id")?;
    let (filename, data) = form.take_photo()?;
    let key = state
        .services
        .photos
        .upload_profile_pic(user, &filename, data)
        .await?;
    Ok(Json(json!({ "filename": key })))
}

pub async fn get_photo_handler(
    State(state): State<AppState>,
    key: Result<Path<PhotoKey>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(key) = key?;
    let data = state.services.photos.get(&key).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data))
}
