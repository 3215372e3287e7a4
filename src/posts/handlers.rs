use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::{
    dto::{CreatePostRequest, Pagination, Post, MAX_CONTENT_CHARS},
    repo,
};
use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

pub fn posts_routes() -> Router<AppState> {
    Router::new().route("/api/posts", get(list_posts).post(create_post))
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let (limit, offset) = p.clamped();
    let posts = repo::list_recent(&state.db, limit, offset).await?;
    Ok(Json(posts))
}

#[instrument(skip(state, payload))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let Json(payload) = payload?;
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("content must not be empty"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::BadRequest("content must be at most 280 characters"));
    }

    let post = repo::insert(&state.db, user_id, content, OffsetDateTime::now_utc()).await?;
    info!(user_id, post_id = post.id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}
