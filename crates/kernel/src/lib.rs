//! Quill Kernel Library
//!
//! The blogging backend's HTTP API, category hierarchy, and core services.
//! The main entry point for running the server is the `quill` binary; the
//! library exists so integration tests can drive the same router.

pub mod category;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Build the API router with authentication applied.
///
/// Transport layers (tracing, CORS) are added by the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router())
        .merge(routes::category::router())
        .merge(routes::post::router())
        .merge(routes::comment::router())
        .merge(routes::audit::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate_bearer_token,
        ))
        .with_state(state)
}
