//! Post handlers

use super::{MessageResponse, PageQuery};
use crate::api::rest::extract::{ApiJson, ApiQuery, CurrentUser};
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::storage::PostStorage;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use florafind_types::validation::{validate_post_content, validate_post_title};
use florafind_types::{Post, PostId, User};
use serde::Deserialize;

const POSTS_DEFAULT_LIMIT: usize = 100;

fn default_published() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default = "default_published")]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
}

fn parse_post_id(id: &str) -> ApiResult<PostId> {
    id.parse()
        .map_err(|_| ApiError::NotFound("Post not found".to_string()))
}

/// Posts owned by someone else are reported as missing
async fn owned_post(state: &AppState, user: &User, id: &str) -> ApiResult<Post> {
    let post_id = parse_post_id(id)?;
    match state.storage.get_post(&post_id).await? {
        Some(post) if post.user_id == user.id => Ok(post),
        _ => Err(ApiError::NotFound("Post not found".to_string())),
    }
}

/// Create a post
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    validate_post_title(&request.title)?;
    validate_post_content(&request.content)?;

    let post = Post::new(user.id, request.title, request.content, request.published);
    state.storage.insert_post(post.clone()).await?;

    tracing::info!(post_id = %post.id, user_id = %user.id, "Created post");

    Ok((StatusCode::CREATED, Json(post)))
}

/// List posts, newest first
pub async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<Post>>> {
    let posts = state
        .storage
        .list_posts(query.page(POSTS_DEFAULT_LIMIT))
        .await?;
    Ok(Json(posts))
}

/// Get a post
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Post>> {
    let post_id = parse_post_id(&id)?;
    let post = state
        .storage
        .get_post(&post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    Ok(Json(post))
}

/// Partially update a post
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdatePostRequest>,
) -> ApiResult<Json<Post>> {
    let mut post = owned_post(&state, &user, &id).await?;

    if let Some(title) = request.title {
        validate_post_title(&title)?;
        post.title = title;
    }
    if let Some(content) = request.content {
        validate_post_content(&content)?;
        post.content = content;
    }
    if let Some(published) = request.published {
        post.published = published;
    }
    post.updated_at = Utc::now();

    state.storage.update_post(post.clone()).await?;

    Ok(Json(post))
}

/// Delete a post
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let post = owned_post(&state, &user, &id).await?;
    state.storage.delete_post(&post.id).await?;

    tracing::info!(post_id = %post.id, "Deleted post");

    Ok(Json(MessageResponse::new("Post deleted successfully")))
}
