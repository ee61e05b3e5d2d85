//! Comment routes.
//!
//! Comments hang off posts. Reading a post's comments is public; writing
//! needs a bearer token, and only the author may modify a comment.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{AuditEntry, AuditSubject, Comment, CommentInput, CommentView};
use crate::pagination::{Page, PageParams};
use crate::permissions::{can_modify_comment, ensure};
use crate::routes::helpers::{
    DataResponse, JsonBody, MessageResponse, QueryParams, created, data, message,
};
use crate::state::AppState;

/// Create the comment router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/posts/{id}/comments",
            get(list_post_comments).post(create_comment),
        )
        .route("/api/comments/trashed", get(trashed_comments))
        .route(
            "/api/comments/{id}",
            put(update_comment).delete(delete_comment),
        )
        .route("/api/comments/{id}/restore", post(restore_comment))
}

// =============================================================================
// Public API Routes
// =============================================================================

/// List comments on a post, oldest first.
///
/// GET /api/posts/{id}/comments
async fn list_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    QueryParams(params): QueryParams<PageParams>,
) -> AppResult<Json<Page<CommentView>>> {
    Ok(Json(state.comments().list_for_post(post_id, &params).await?))
}

// =============================================================================
// Authenticated Routes
// =============================================================================

/// POST /api/posts/{id}/comments
async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    user: CurrentUser,
    JsonBody(input): JsonBody<CommentInput>,
) -> AppResult<(StatusCode, Json<DataResponse<Comment>>)> {
    let comment = state
        .comments()
        .create(post_id, user.id, &input.content)
        .await?;

    state
        .audit()
        .record(AuditEntry::created(
            AuditSubject::Comment(comment.id),
            &comment,
            Some(user.id),
        ))
        .await;

    Ok(created(comment))
}

/// GET /api/comments/trashed
async fn trashed_comments(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(params): QueryParams<PageParams>,
) -> AppResult<Json<Page<CommentView>>> {
    Ok(Json(state.comments().trashed(user.id, &params).await?))
}

/// PUT /api/comments/{id}
async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
    JsonBody(input): JsonBody<CommentInput>,
) -> AppResult<Json<DataResponse<Comment>>> {
    let comment = state.comments().find(id).await?;
    ensure(can_modify_comment(user.id, &comment))?;

    let change = state.comments().update(comment, &input.content).await?;

    state
        .audit()
        .record(AuditEntry::updated(
            AuditSubject::Comment(id),
            &change,
            Some(user.id),
        ))
        .await;

    Ok(data(change.after))
}

/// DELETE /api/comments/{id}
async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> AppResult<Json<MessageResponse>> {
    let comment = state.comments().find(id).await?;
    ensure(can_modify_comment(user.id, &comment))?;

    let comment = state.comments().delete(comment).await?;

    state
        .audit()
        .record(AuditEntry::deleted(
            AuditSubject::Comment(id),
            &comment,
            Some(user.id),
        ))
        .await;

    Ok(message("comment deleted"))
}

/// POST /api/comments/{id}/restore
async fn restore_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> AppResult<Json<DataResponse<Comment>>> {
    let comment = state.comments().find_trashed(id).await?;
    ensure(can_modify_comment(user.id, &comment))?;

    let change = state.comments().restore(comment).await?;

    state
        .audit()
        .record(AuditEntry::restored(
            AuditSubject::Comment(id),
            &change,
            Some(user.id),
        ))
        .await;

    Ok(data(change.after))
}
