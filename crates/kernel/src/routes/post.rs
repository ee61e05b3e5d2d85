//! Post API routes.
//!
//! Listing and detail are public. Writes need a bearer token, and only the
//! author may edit, delete, or restore a post.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{AuditEntry, AuditSubject, CreatePost, Post, PostSummary, UpdatePost};
use crate::pagination::{Page, PageParams};
use crate::permissions::{can_modify_post, ensure};
use crate::routes::helpers::{
    DataResponse, JsonBody, MessageResponse, QueryParams, created, data, message,
};
use crate::services::PostDetail;
use crate::state::AppState;

/// Create the post router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/trashed", get(trashed_posts))
        .route(
            "/api/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/api/posts/{id}/restore", post(restore_post))
}

/// GET /api/posts
async fn list_posts(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PageParams>,
) -> AppResult<Json<Page<PostSummary>>> {
    Ok(Json(state.posts().list(&params).await?))
}

/// GET /api/posts/{id}
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DataResponse<PostDetail>>> {
    Ok(data(state.posts().detail(id).await?))
}

/// GET /api/posts/trashed
async fn trashed_posts(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(params): QueryParams<PageParams>,
) -> AppResult<Json<Page<PostSummary>>> {
    Ok(Json(state.posts().trashed(user.id, &params).await?))
}

/// POST /api/posts
async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(input): JsonBody<CreatePost>,
) -> AppResult<(StatusCode, Json<DataResponse<Post>>)> {
    let post = state.posts().create(user.id, input).await?;

    state
        .audit()
        .record(AuditEntry::created(
            AuditSubject::Post(post.id),
            &post,
            Some(user.id),
        ))
        .await;

    Ok(created(post))
}

/// PUT /api/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
    JsonBody(input): JsonBody<UpdatePost>,
) -> AppResult<Json<DataResponse<Post>>> {
    let post = state.posts().find(id).await?;
    ensure(can_modify_post(user.id, &post))?;

    let change = state.posts().update(post, input).await?;

    state
        .audit()
        .record(AuditEntry::updated(
            AuditSubject::Post(id),
            &change,
            Some(user.id),
        ))
        .await;

    Ok(data(change.after))
}

/// DELETE /api/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> AppResult<Json<MessageResponse>> {
    let post = state.posts().find(id).await?;
    ensure(can_modify_post(user.id, &post))?;

    let post = state.posts().delete(post).await?;

    state
        .audit()
        .record(AuditEntry::deleted(
            AuditSubject::Post(id),
            &post,
            Some(user.id),
        ))
        .await;

    Ok(message("post deleted"))
}

/// POST /api/posts/{id}/restore
async fn restore_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> AppResult<Json<DataResponse<Post>>> {
    let post = state.posts().find_trashed(id).await?;
    ensure(can_modify_post(user.id, &post))?;

    let change = state.posts().restore(post).await?;

    state
        .audit()
        .record(AuditEntry::restored(
            AuditSubject::Post(id),
            &change,
            Some(user.id),
        ))
        .await;

    Ok(data(change.after))
}
