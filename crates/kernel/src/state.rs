//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;

use crate::category::CategoryStore;
use crate::config::Config;
use crate::db;
use crate::services::{AuditService, AuthService, CommentService, PostService};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// SQLite connection pool.
    db: SqlitePool,

    /// Category hierarchy; owns the structural write lock.
    categories: Arc<CategoryStore>,

    posts: PostService,

    comments: CommentService,

    /// Registration, login, and token verification.
    auth: AuthService,

    audit: AuditService,
}

impl AppState {
    /// Connect to the database, apply migrations, and build the services.
    pub async fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        info!("Database migrations applied");

        Self::with_pool(db, config)
    }

    /// Build the services around an existing, migrated pool.
    pub fn with_pool(db: SqlitePool, config: &Config) -> Result<Self> {
        let categories = CategoryStore::new(db.clone());
        let posts = PostService::new(db.clone(), categories.clone());
        let comments = CommentService::new(db.clone());
        let auth =
            AuthService::new(db.clone(), config).context("failed to initialize auth service")?;
        let audit = AuditService::new(db.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db,
                categories,
                posts,
                comments,
                auth,
                audit,
            }),
        })
    }

    /// Get the database pool.
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the category store.
    pub fn categories(&self) -> &Arc<CategoryStore> {
        &self.inner.categories
    }

    /// Get the post service.
    pub fn posts(&self) -> &PostService {
        &self.inner.posts
    }

    /// Get the comment service.
    pub fn comments(&self) -> &CommentService {
        &self.inner.comments
    }

    /// Get the auth service.
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get the audit service.
    pub fn audit(&self) -> &AuditService {
        &self.inner.audit
    }

    /// Check if the database is healthy.
    pub async fn db_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}
