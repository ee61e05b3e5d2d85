//! Bearer token authentication middleware.
//!
//! Checks `Authorization: Bearer <token>` headers, verifies the JWT,
//! checks the revocation table, and sets the user context.

use axum::{
    body::Body,
    extract::{FromRequestParts, OptionalFromRequestParts, State},
    http::{Request, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Middleware to authenticate Bearer JWT tokens.
///
/// If a valid Bearer token is present, sets [`CurrentUser`] in request
/// extensions. If no token is present, passes through without modification.
/// If an invalid or revoked token is present, returns 401.
pub async fn authenticate_bearer_token(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let Some(auth_header) = auth_header else {
        return next.run(request).await;
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return next.run(request).await;
    };

    let claims = match state.auth().verify_token(token.trim()) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "invalid bearer token");
            return invalid_token("invalid token");
        }
    };

    match state.auth().is_revoked(&claims.jti).await {
        Ok(true) => {
            debug!(jti = %claims.jti, "bearer token revoked");
            return invalid_token("token has been revoked");
        }
        Ok(false) => {}
        Err(e) => {
            warn!(error = ?e, "failed to check token revocation; denying request");
            return AppError::Internal(e).into_response();
        }
    }

    let Ok(id) = claims.sub.parse::<i64>() else {
        debug!(sub = %claims.sub, "invalid user ID in token");
        return invalid_token("invalid token subject");
    };

    request.extensions_mut().insert(CurrentUser {
        id,
        jti: claims.jti,
        exp: claims.exp,
    });

    next.run(request).await
}

fn invalid_token(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [("WWW-Authenticate", "Bearer error=\"invalid_token\"")],
        axum::Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// The authenticated caller, taken from a verified bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    /// Token id, used to revoke the token on logout.
    pub jti: String,
    /// Token expiry (Unix timestamp).
    pub exp: i64,
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}
