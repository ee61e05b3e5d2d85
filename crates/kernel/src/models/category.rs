//! Category rows and their row-level queries.
//!
//! Categories form a single-parent forest. Each row stores its ancestor chain
//! as a materialized path so descendant lookups are a single range scan:
//!
//! - a root has path `/`
//! - a child of `1 -> 4` has path `/1/4/`
//! - a node's *lineage* (`path` + own id + `/`) prefixes the path of every
//!   one of its descendants
//!
//! Only [`crate::category::CategoryStore`] writes these rows; the functions
//! here do no validation of their own.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use crate::category::path;

/// A category row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,

    /// Unique among live categories.
    pub name: String,

    /// `None` for roots.
    pub parent_id: Option<i64>,

    /// Materialized ancestor chain, root first.
    pub path: String,

    /// Unix timestamp when created.
    pub created_at: i64,

    /// Unix timestamp when last changed.
    pub updated_at: i64,

    /// Unix timestamp of soft deletion.
    pub deleted_at: Option<i64>,
}

/// Input for creating a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCategory {
    #[serde(default)]
    pub name: String,
    pub parent_id: Option<i64>,
}

/// Input for updating a category.
///
/// `parent_id` is tri-state: absent leaves the parent alone, `null` makes
/// the category a root, a value moves it under that parent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<i64>>,
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

const COLUMNS: &str = "id, name, parent_id, path, created_at, updated_at, deleted_at";

impl Category {
    /// Path prefix shared by every descendant of this category.
    pub fn lineage(&self) -> String {
        path::lineage(&self.path, self.id)
    }

    /// Number of ancestors; roots are at depth 0.
    pub fn depth(&self) -> usize {
        path::depth(&self.path)
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Whether `self` sits somewhere below `other`.
    pub fn is_descendant_of(&self, other: &Category) -> bool {
        self.path.starts_with(&other.lineage())
    }

    /// Find a live category by ID.
    pub async fn find_live<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Self>> {
        let category = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM categories WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("failed to fetch category")?;

        Ok(category)
    }

    /// Find a category by ID whether or not it is soft-deleted.
    pub async fn find_any<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Self>> {
        let category =
            sqlx::query_as::<_, Self>(&format!("SELECT {COLUMNS} FROM categories WHERE id = ?"))
                .bind(id)
                .fetch_optional(db)
                .await
                .context("failed to fetch category")?;

        Ok(category)
    }

    /// Fetch several categories by ID, live or not, in no particular order.
    pub async fn find_many<'e>(
        db: impl SqliteExecutor<'e>,
        ids: &BTreeSet<i64>,
    ) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM categories WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let categories = query
            .build_query_as::<Self>()
            .fetch_all(db)
            .await
            .context("failed to fetch categories")?;

        Ok(categories)
    }

    /// List live categories ordered by name.
    pub async fn list_live<'e>(db: impl SqliteExecutor<'e>) -> Result<Vec<Self>> {
        let categories = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM categories WHERE deleted_at IS NULL ORDER BY name, id"
        ))
        .fetch_all(db)
        .await
        .context("failed to list categories")?;

        Ok(categories)
    }

    /// List soft-deleted categories, most recently deleted first.
    pub async fn list_trashed<'e>(db: impl SqliteExecutor<'e>) -> Result<Vec<Self>> {
        let categories = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM categories WHERE deleted_at IS NOT NULL ORDER BY deleted_at DESC, id DESC"
        ))
        .fetch_all(db)
        .await
        .context("failed to list trashed categories")?;

        Ok(categories)
    }

    /// Live categories below the given lineage, ordered by path.
    pub async fn live_within<'e>(db: impl SqliteExecutor<'e>, lineage: &str) -> Result<Vec<Self>> {
        let (low, high) = path::descendant_range(lineage);
        let categories = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM categories WHERE path >= ? AND path < ? AND deleted_at IS NULL ORDER BY path, id"
        ))
        .bind(low)
        .bind(high)
        .fetch_all(db)
        .await
        .context("failed to fetch descendant categories")?;

        Ok(categories)
    }

    /// Direct children, including soft-deleted ones.
    pub async fn children_of<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Vec<Self>> {
        let categories = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM categories WHERE parent_id = ? ORDER BY id"
        ))
        .bind(id)
        .fetch_all(db)
        .await
        .context("failed to fetch child categories")?;

        Ok(categories)
    }

    /// Depth of the deepest row (live or not) below the given lineage.
    pub async fn deepest_within<'e>(
        db: impl SqliteExecutor<'e>,
        lineage: &str,
    ) -> Result<Option<usize>> {
        let (low, high) = path::descendant_range(lineage);
        let slashes: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(length(path) - length(replace(path, '/', '')))
            FROM categories
            WHERE path >= ? AND path < ?
            "#,
        )
        .bind(low)
        .bind(high)
        .fetch_one(db)
        .await
        .context("failed to measure category subtree")?;

        // A path with n ancestors contains n + 1 slashes.
        Ok(slashes.map(|n| usize::try_from(n - 1).unwrap_or(0)))
    }

    /// Whether a live category other than `except` already uses `name`.
    pub async fn live_name_taken<'e>(
        db: impl SqliteExecutor<'e>,
        name: &str,
        except: Option<i64>,
    ) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM categories
                WHERE name = ? AND deleted_at IS NULL AND id IS NOT ?
            )
            "#,
        )
        .bind(name)
        .bind(except)
        .fetch_one(db)
        .await
        .context("failed to check category name")?;

        Ok(taken)
    }

    /// Insert a new row.
    pub async fn insert<'e>(
        db: impl SqliteExecutor<'e>,
        name: &str,
        parent_id: Option<i64>,
        path: &str,
        now: i64,
    ) -> Result<Self> {
        let category = sqlx::query_as::<_, Self>(&format!(
            r#"
            INSERT INTO categories (name, parent_id, path, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(name)
        .bind(parent_id)
        .bind(path)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await
        .context("failed to insert category")?;

        Ok(category)
    }

    /// Overwrite name, parent and path of one row.
    pub async fn write<'e>(
        db: impl SqliteExecutor<'e>,
        id: i64,
        name: &str,
        parent_id: Option<i64>,
        path: &str,
        now: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE categories
            SET name = ?, parent_id = ?, path = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(parent_id)
        .bind(path)
        .bind(now)
        .bind(id)
        .execute(db)
        .await
        .context("failed to update category")?;

        Ok(())
    }

    /// Move one row without touching its name.
    pub async fn set_parent<'e>(
        db: impl SqliteExecutor<'e>,
        id: i64,
        parent_id: Option<i64>,
        path: &str,
        now: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE categories SET parent_id = ?, path = ?, updated_at = ? WHERE id = ?")
            .bind(parent_id)
            .bind(path)
            .bind(now)
            .bind(id)
            .execute(db)
            .await
            .context("failed to move category")?;

        Ok(())
    }

    /// Rewrite the path prefix of every row below `old_lineage`.
    ///
    /// Returns the number of rows rewritten.
    pub async fn rebase<'e>(
        db: impl SqliteExecutor<'e>,
        old_lineage: &str,
        new_lineage: &str,
    ) -> Result<u64> {
        let (low, high) = path::descendant_range(old_lineage);
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET path = ? || substr(path, ?)
            WHERE path >= ? AND path < ?
            "#,
        )
        .bind(new_lineage)
        .bind(i64::try_from(old_lineage.len() + 1).unwrap_or(i64::MAX))
        .bind(low)
        .bind(high)
        .execute(db)
        .await
        .context("failed to rewrite descendant paths")?;

        Ok(result.rows_affected())
    }

    /// Mark a row deleted.
    pub async fn soft_delete<'e>(db: impl SqliteExecutor<'e>, id: i64, now: i64) -> Result<()> {
        sqlx::query("UPDATE categories SET deleted_at = ?, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(db)
            .await
            .context("failed to delete category")?;

        Ok(())
    }

    /// Clear the deletion marker of a row.
    pub async fn undelete<'e>(db: impl SqliteExecutor<'e>, id: i64, now: i64) -> Result<()> {
        sqlx::query("UPDATE categories SET deleted_at = NULL, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(db)
            .await
            .context("failed to restore category")?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn category(id: i64, parent_id: Option<i64>, path: &str) -> Category {
        Category {
            id,
            name: format!("c{id}"),
            parent_id,
            path: path.to_string(),
            created_at: 1000,
            updated_at: 1000,
            deleted_at: None,
        }
    }

    #[test]
    fn lineage_and_depth() {
        let root = category(1, None, "/");
        assert_eq!(root.lineage(), "/1/");
        assert_eq!(root.depth(), 0);

        let leaf = category(9, Some(4), "/1/4/");
        assert_eq!(leaf.lineage(), "/1/4/9/");
        assert_eq!(leaf.depth(), 2);
    }

    #[test]
    fn descendant_check_uses_lineage_not_digits() {
        let one = category(1, None, "/");
        let under_one = category(5, Some(1), "/1/");
        let under_ten = category(6, Some(10), "/10/");

        assert!(under_one.is_descendant_of(&one));
        assert!(!under_ten.is_descendant_of(&one));
        assert!(!one.is_descendant_of(&one));
    }

    #[test]
    fn update_distinguishes_absent_and_null_parent() {
        let absent: UpdateCategory = serde_json::from_str(r#"{"name":"Rust"}"#).unwrap();
        assert_eq!(absent.parent_id, None);

        let null: UpdateCategory = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(null.parent_id, Some(None));

        let set: UpdateCategory = serde_json::from_str(r#"{"parent_id":7}"#).unwrap();
        assert_eq!(set.parent_id, Some(Some(7)));
    }

    #[test]
    fn create_defaults_missing_name_to_empty() {
        let input: CreateCategory = serde_json::from_str(r#"{"parent_id":3}"#).unwrap();
        assert_eq!(input.name, "");
        assert_eq!(input.parent_id, Some(3));
    }
}
