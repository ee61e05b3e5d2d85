//! Authentication routes (register, login, logout, me).

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{LoginRequest, RegisterUser, User};
use crate::routes::helpers::{DataResponse, JsonBody, MessageResponse, created, data, message};
use crate::services::auth::IssuedToken;
use crate::state::AppState;

/// Registration response.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub token: String,
}

/// Create an account.
///
/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterUser>,
) -> AppResult<(StatusCode, Json<DataResponse<RegisterResponse>>)> {
    let (user, token) = state.auth().register(input).await?;

    Ok(created(RegisterResponse {
        user,
        token: token.token,
    }))
}

/// Exchange credentials for a bearer token.
///
/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginRequest>,
) -> AppResult<Json<DataResponse<IssuedToken>>> {
    let (_, token) = state.auth().login(input).await?;
    Ok(data(token))
}

/// Revoke the presented token.
///
/// POST /api/auth/logout
async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<MessageResponse>> {
    state.auth().logout(&user.jti, user.exp).await?;
    Ok(message("logged out"))
}

/// The authenticated account.
///
/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<DataResponse<User>>> {
    Ok(data(state.auth().current_user(user.id).await?))
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}
