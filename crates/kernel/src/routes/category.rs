//! Category API routes.
//!
//! Reads are public. Writes accept an optional bearer token; when present
//! the caller is recorded as the audit actor.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;

use crate::category::TreeNode;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::{
    AuditEntry, AuditSubject, Category, CreateCategory, PostSummary, UpdateCategory,
};
use crate::pagination::{Page, PageParams};
use crate::routes::helpers::{DataResponse, JsonBody, QueryParams, ScopeParams, created, data};
use crate::state::AppState;

/// Create the category router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/tree", get(category_tree))
        .route("/api/categories/trashed", get(trashed_categories))
        .route(
            "/api/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/api/categories/{id}/ancestors", get(category_ancestors))
        .route("/api/categories/{id}/restore", post(restore_category))
        .route("/api/categories/{id}/posts", get(category_posts))
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
struct DeleteCategoryResponse {
    message: &'static str,
    /// Children that became roots.
    promoted: Vec<i64>,
}

// =============================================================================
// Reads
// =============================================================================

/// GET /api/categories
async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Category>>>> {
    Ok(data(state.categories().list_all().await?))
}

/// GET /api/categories/tree
async fn category_tree(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<TreeNode>>>> {
    Ok(data(state.categories().tree().await?))
}

/// GET /api/categories/trashed
async fn trashed_categories(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Category>>>> {
    Ok(data(state.categories().trashed().await?))
}

/// GET /api/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DataResponse<Category>>> {
    let category = state
        .categories()
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("category"))?;

    Ok(data(category))
}

/// GET /api/categories/{id}/ancestors
async fn category_ancestors(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DataResponse<Vec<Category>>>> {
    Ok(data(state.categories().ancestors(id).await?))
}

/// GET /api/categories/{id}/posts
///
/// Covers the category's whole subtree unless `direct_only` is set. A
/// missing category yields an empty page.
async fn category_posts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    QueryParams(params): QueryParams<PageParams>,
    QueryParams(scope): QueryParams<ScopeParams>,
) -> AppResult<Json<Page<PostSummary>>> {
    let page = state
        .posts()
        .by_category(id, scope.direct_only(), &params)
        .await?;

    Ok(Json(page))
}

// =============================================================================
// Writes
// =============================================================================

/// POST /api/categories
async fn create_category(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    JsonBody(input): JsonBody<CreateCategory>,
) -> AppResult<(StatusCode, Json<DataResponse<Category>>)> {
    let category = state.categories().create(input).await?;

    state
        .audit()
        .record(AuditEntry::created(
            AuditSubject::Category(category.id),
            &category,
            user.map(|u| u.id),
        ))
        .await;

    Ok(created(category))
}

/// PUT /api/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: Option<CurrentUser>,
    JsonBody(input): JsonBody<UpdateCategory>,
) -> AppResult<Json<DataResponse<Category>>> {
    let change = state.categories().update(id, input).await?;

    state
        .audit()
        .record(AuditEntry::updated(
            AuditSubject::Category(id),
            &change,
            user.map(|u| u.id),
        ))
        .await;

    Ok(data(change.after))
}

/// DELETE /api/categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: Option<CurrentUser>,
) -> AppResult<Json<DeleteCategoryResponse>> {
    let deletion = state.categories().delete(id).await?;

    state
        .audit()
        .record(AuditEntry::deleted(
            AuditSubject::Category(id),
            &deletion.change.before,
            user.map(|u| u.id),
        ))
        .await;

    Ok(Json(DeleteCategoryResponse {
        message: "category deleted",
        promoted: deletion.promoted,
    }))
}

/// POST /api/categories/{id}/restore
async fn restore_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: Option<CurrentUser>,
) -> AppResult<Json<DataResponse<Category>>> {
    let change = state.categories().restore(id).await?;

    state
        .audit()
        .record(AuditEntry::restored(
            AuditSubject::Category(id),
            &change,
            user.map(|u| u.id),
        ))
        .await;

    Ok(data(change.after))
}
