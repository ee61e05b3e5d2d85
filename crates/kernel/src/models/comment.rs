//! Comment model and CRUD operations.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::pagination::{Page, PageParams};

/// Comment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    /// Author; the only user allowed to modify the comment.
    pub user_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

/// Comment as shown to clients, with the author's name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    pub user_id: i64,
    pub user_name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

/// Input for creating or editing a comment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentInput {
    #[serde(default)]
    pub content: String,
}

const VIEW_SELECT: &str = r#"
    SELECT m.id, m.content, m.post_id, m.user_id, u.name AS user_name,
           m.created_at, m.updated_at, m.deleted_at
    FROM comments m
    LEFT JOIN users u ON u.id = m.user_id
"#;

impl Comment {
    /// Find a live comment by ID.
    pub async fn find_live<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Self>> {
        let comment = sqlx::query_as::<_, Self>(
            "SELECT * FROM comments WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("failed to fetch comment")?;

        Ok(comment)
    }

    /// Find a soft-deleted comment by ID.
    pub async fn find_trashed<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Self>> {
        let comment = sqlx::query_as::<_, Self>(
            "SELECT * FROM comments WHERE id = ? AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("failed to fetch trashed comment")?;

        Ok(comment)
    }

    /// Every live comment on a post, oldest first.
    pub async fn all_for_post<'e>(
        db: impl SqliteExecutor<'e>,
        post_id: i64,
    ) -> Result<Vec<CommentView>> {
        let comments = sqlx::query_as::<_, CommentView>(&format!(
            "{VIEW_SELECT} WHERE m.post_id = ? AND m.deleted_at IS NULL ORDER BY m.created_at, m.id"
        ))
        .bind(post_id)
        .fetch_all(db)
        .await
        .context("failed to list comments")?;

        Ok(comments)
    }

    /// Page through live comments on a post, oldest first.
    pub async fn list_for_post(
        pool: &SqlitePool,
        post_id: i64,
        params: &PageParams,
    ) -> Result<Page<CommentView>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE post_id = ? AND deleted_at IS NULL",
        )
        .bind(post_id)
        .fetch_one(pool)
        .await
        .context("failed to count comments")?;

        let rows = sqlx::query_as::<_, CommentView>(&format!(
            "{VIEW_SELECT} WHERE m.post_id = ? AND m.deleted_at IS NULL ORDER BY m.created_at, m.id LIMIT ? OFFSET ?"
        ))
        .bind(post_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("failed to list comments")?;

        Ok(Page::new(rows, total, params))
    }

    /// Page through a user's soft-deleted comments, most recently deleted first.
    pub async fn list_trashed_for_user(
        pool: &SqlitePool,
        user_id: i64,
        params: &PageParams,
    ) -> Result<Page<CommentView>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE user_id = ? AND deleted_at IS NOT NULL",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("failed to count trashed comments")?;

        let rows = sqlx::query_as::<_, CommentView>(&format!(
            "{VIEW_SELECT} WHERE m.user_id = ? AND m.deleted_at IS NOT NULL ORDER BY m.deleted_at DESC, m.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("failed to list trashed comments")?;

        Ok(Page::new(rows, total, params))
    }

    /// Insert a comment.
    pub async fn insert<'e>(
        db: impl SqliteExecutor<'e>,
        post_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Self> {
        let now = crate::db::now();

        let comment = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO comments (content, post_id, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(content)
        .bind(post_id)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await
        .context("failed to create comment")?;

        Ok(comment)
    }

    /// Replace the content of a comment.
    pub async fn write<'e>(db: impl SqliteExecutor<'e>, id: i64, content: &str) -> Result<Self> {
        let now = crate::db::now();

        let comment = sqlx::query_as::<_, Self>(
            "UPDATE comments SET content = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(content)
        .bind(now)
        .bind(id)
        .fetch_one(db)
        .await
        .context("failed to update comment")?;

        Ok(comment)
    }

    /// Set or clear the deletion marker.
    pub async fn set_deleted<'e>(
        db: impl SqliteExecutor<'e>,
        id: i64,
        deleted: bool,
    ) -> Result<Self> {
        let now = crate::db::now();

        let comment = sqlx::query_as::<_, Self>(
            "UPDATE comments SET deleted_at = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(deleted.then_some(now))
        .bind(now)
        .bind(id)
        .fetch_one(db)
        .await
        .context("failed to change comment deletion state")?;

        Ok(comment)
    }
}
