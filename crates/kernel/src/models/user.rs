//! User model and CRUD operations.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqliteExecutor;

/// User record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for registering a new user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl User {
    /// Find a user by ID.
    pub async fn find_by_id<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
            .context("failed to fetch user by id")?;

        Ok(user)
    }

    /// Find a user by email address.
    pub async fn find_by_email<'e>(
        db: impl SqliteExecutor<'e>,
        email: &str,
    ) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(db)
            .await
            .context("failed to fetch user by email")?;

        Ok(user)
    }

    /// Insert a user with an already hashed password.
    pub async fn insert<'e>(
        db: impl SqliteExecutor<'e>,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Self> {
        let now = crate::db::now();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await
        .context("failed to create user")?;

        Ok(user)
    }
}
