//! Audit trail routes.
//!
//! All endpoints require a bearer token and page newest first.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::{Audit, AuditFilter, SubjectType};
use crate::pagination::{Page, PageParams};
use crate::routes::helpers::{DataResponse, QueryParams, data};
use crate::state::AppState;

/// Create the audit router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/audits", get(list_audits))
        .route("/api/audits/{id}", get(get_audit))
        .route("/api/audits/subject/{subject_type}", get(audits_for_type))
        .route(
            "/api/audits/subject/{subject_type}/{subject_id}",
            get(audits_for_subject),
        )
        .route("/api/audits/actor/{user_id}", get(audits_for_actor))
}

fn parse_subject_type(raw: &str) -> AppResult<SubjectType> {
    raw.parse().map_err(AppError::BadRequest)
}

/// GET /api/audits
async fn list_audits(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(params): QueryParams<PageParams>,
) -> AppResult<Json<Page<Audit>>> {
    Ok(Json(state.audit().list(AuditFilter::default(), &params).await?))
}

/// GET /api/audits/{id}
async fn get_audit(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DataResponse<Audit>>> {
    Ok(data(state.audit().find(id).await?))
}

/// GET /api/audits/subject/{subject_type}
async fn audits_for_type(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(subject_type): Path<String>,
    QueryParams(params): QueryParams<PageParams>,
) -> AppResult<Json<Page<Audit>>> {
    let filter = AuditFilter {
        subject_type: Some(parse_subject_type(&subject_type)?),
        ..AuditFilter::default()
    };

    Ok(Json(state.audit().list(filter, &params).await?))
}

/// GET /api/audits/subject/{subject_type}/{subject_id}
async fn audits_for_subject(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((subject_type, subject_id)): Path<(String, i64)>,
    QueryParams(params): QueryParams<PageParams>,
) -> AppResult<Json<Page<Audit>>> {
    let filter = AuditFilter {
        subject_type: Some(parse_subject_type(&subject_type)?),
        subject_id: Some(subject_id),
        ..AuditFilter::default()
    };

    Ok(Json(state.audit().list(filter, &params).await?))
}

/// GET /api/audits/actor/{user_id}
async fn audits_for_actor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<i64>,
    QueryParams(params): QueryParams<PageParams>,
) -> AppResult<Json<Page<Audit>>> {
    let filter = AuditFilter {
        actor_id: Some(user_id),
        ..AuditFilter::default()
    };

    Ok(Json(state.audit().list(filter, &params).await?))
}
