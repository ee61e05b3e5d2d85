//! Post model and the category-scoped listing query.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

use crate::pagination::{Page, PageParams};

/// Post record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category_id: i64,
    /// Author; the only user allowed to modify the post.
    pub user_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

/// Post row as listed, with author, category, and live comment count.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub user_id: i64,
    pub user_name: Option<String>,
    pub comments_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

/// Input for creating a post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub category_id: Option<i64>,
}

/// Input for updating a post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i64>,
}

const SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.category_id, c.name AS category_name,
           p.user_id, u.name AS user_name,
           (SELECT COUNT(*) FROM comments m
            WHERE m.post_id = p.id AND m.deleted_at IS NULL) AS comments_count,
           p.created_at, p.updated_at, p.deleted_at
    FROM posts p
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN users u ON u.id = p.user_id
"#;

impl Post {
    /// Find a live post by ID.
    pub async fn find_live<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Self>> {
        let post =
            sqlx::query_as::<_, Self>("SELECT * FROM posts WHERE id = ? AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(db)
                .await
                .context("failed to fetch post")?;

        Ok(post)
    }

    /// Find a soft-deleted post by ID.
    pub async fn find_trashed<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Self>> {
        let post = sqlx::query_as::<_, Self>(
            "SELECT * FROM posts WHERE id = ? AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("failed to fetch trashed post")?;

        Ok(post)
    }

    /// Listing row for a single live post.
    pub async fn summary<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<PostSummary>> {
        let post = sqlx::query_as::<_, PostSummary>(&format!(
            "{SUMMARY_SELECT} WHERE p.id = ? AND p.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("failed to fetch post summary")?;

        Ok(post)
    }

    /// Page through all live posts, newest first.
    pub async fn list(pool: &SqlitePool, params: &PageParams) -> Result<Page<PostSummary>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE deleted_at IS NULL")
            .fetch_one(pool)
            .await
            .context("failed to count posts")?;

        let rows = sqlx::query_as::<_, PostSummary>(&format!(
            "{SUMMARY_SELECT} WHERE p.deleted_at IS NULL ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("failed to list posts")?;

        Ok(Page::new(rows, total, params))
    }

    /// Page through live posts filed under any of `category_ids`, newest first.
    ///
    /// An empty id set gives an empty page without touching the database.
    pub async fn list_by_category_ids(
        pool: &SqlitePool,
        category_ids: &BTreeSet<i64>,
        params: &PageParams,
    ) -> Result<Page<PostSummary>> {
        if category_ids.is_empty() {
            return Ok(Page::empty(params));
        }

        let mut count: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) FROM posts p WHERE p.deleted_at IS NULL AND p.category_id IN (",
        );
        push_ids(&mut count, category_ids);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(pool)
            .await
            .context("failed to count posts by category")?;

        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SUMMARY_SELECT);
        query.push(" WHERE p.deleted_at IS NULL AND p.category_id IN (");
        push_ids(&mut query, category_ids);
        query
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows = query
            .build_query_as::<PostSummary>()
            .fetch_all(pool)
            .await
            .context("failed to list posts by category")?;

        Ok(Page::new(rows, total, params))
    }

    /// Page through a user's soft-deleted posts, most recently deleted first.
    pub async fn list_trashed_for_user(
        pool: &SqlitePool,
        user_id: i64,
        params: &PageParams,
    ) -> Result<Page<PostSummary>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE user_id = ? AND deleted_at IS NOT NULL",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("failed to count trashed posts")?;

        let rows = sqlx::query_as::<_, PostSummary>(&format!(
            "{SUMMARY_SELECT} WHERE p.user_id = ? AND p.deleted_at IS NOT NULL ORDER BY p.deleted_at DESC, p.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("failed to list trashed posts")?;

        Ok(Page::new(rows, total, params))
    }

    /// Insert a post.
    pub async fn insert<'e>(
        db: impl SqliteExecutor<'e>,
        user_id: i64,
        category_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Self> {
        let now = crate::db::now();

        let post = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO posts (title, content, category_id, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(category_id)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await
        .context("failed to create post")?;

        Ok(post)
    }

    /// Overwrite the editable fields of a post.
    pub async fn write<'e>(
        db: impl SqliteExecutor<'e>,
        id: i64,
        title: &str,
        content: &str,
        category_id: i64,
    ) -> Result<Self> {
        let now = crate::db::now();

        let post = sqlx::query_as::<_, Self>(
            r#"
            UPDATE posts
            SET title = ?, content = ?, category_id = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(category_id)
        .bind(now)
        .bind(id)
        .fetch_one(db)
        .await
        .context("failed to update post")?;

        Ok(post)
    }

    /// Set or clear the deletion marker.
    pub async fn set_deleted<'e>(
        db: impl SqliteExecutor<'e>,
        id: i64,
        deleted: bool,
    ) -> Result<Self> {
        let now = crate::db::now();

        let post = sqlx::query_as::<_, Self>(
            "UPDATE posts SET deleted_at = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(deleted.then_some(now))
        .bind(now)
        .bind(id)
        .fetch_one(db)
        .await
        .context("failed to change post deletion state")?;

        Ok(post)
    }
}

fn push_ids(builder: &mut QueryBuilder<'_, Sqlite>, ids: &BTreeSet<i64>) {
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}
