//! Category store.
//!
//! Owns every write to `categories`, including the materialized `path`
//! column. Structural writes hold `write_lock` for their whole
//! validate-then-write sequence and run in one transaction, so readers see
//! either the old forest or the new one.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Context;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::category::descendants;
use crate::category::path::{self, MAX_DEPTH, ROOT};
use crate::category::tree::{self, TreeNode};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{Category, Change, CreateCategory, UpdateCategory};

/// Longest accepted category name, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Outcome of a soft delete.
#[derive(Debug, Clone)]
pub struct Deletion {
    pub change: Change<Category>,

    /// Live children that became roots.
    pub promoted: Vec<i64>,
}

/// Service for the category hierarchy.
pub struct CategoryStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl CategoryStore {
    /// Create a new CategoryStore.
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Arc::new(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Get a live category.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Category>> {
        Ok(Category::find_live(&self.pool, id).await?)
    }

    /// All live categories ordered by name.
    pub async fn list_all(&self) -> AppResult<Vec<Category>> {
        Ok(Category::list_live(&self.pool).await?)
    }

    /// Soft-deleted categories, most recently deleted first.
    pub async fn trashed(&self) -> AppResult<Vec<Category>> {
        Ok(Category::list_trashed(&self.pool).await?)
    }

    /// The live forest, siblings ordered by name.
    pub async fn tree(&self) -> AppResult<Vec<TreeNode>> {
        let categories = self.list_all().await?;
        Ok(tree::build_tree(&categories))
    }

    /// Ancestors of a live category, root first.
    pub async fn ancestors(&self, id: i64) -> AppResult<Vec<Category>> {
        let category = self
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("category"))?;

        let Some(chain) = path::ancestor_ids(&category.path) else {
            return Err(AppError::CorruptHierarchy(format!(
                "category {id} has malformed path {:?}",
                category.path
            )));
        };

        let mut rows = Category::find_many(&self.pool, &chain.iter().copied().collect()).await?;
        rows.sort_by_key(|row| chain.iter().position(|a| *a == row.id));

        if rows.len() != chain.len() {
            return Err(AppError::CorruptHierarchy(format!(
                "category {id} lists ancestors that do not exist"
            )));
        }

        Ok(rows)
    }

    /// Ids of `category` and every live category below it.
    pub async fn descendant_ids(&self, category: &Category) -> AppResult<BTreeSet<i64>> {
        let rows = Category::live_within(&self.pool, &category.lineage()).await?;
        let ids = descendants::from_path_rows(category, &rows)?;
        debug!(category_id = category.id, count = ids.len(), "resolved descendants");
        Ok(ids)
    }

    /// Category ids a post listing for `id` should cover.
    ///
    /// A missing or deleted category yields an empty set rather than an error.
    pub async fn scope_ids(&self, id: i64, direct_only: bool) -> AppResult<BTreeSet<i64>> {
        let Some(category) = self.find_by_id(id).await? else {
            return Ok(BTreeSet::new());
        };

        if direct_only {
            Ok(BTreeSet::from([category.id]))
        } else {
            self.descendant_ids(&category).await
        }
    }

    // -------------------------------------------------------------------------
    // Structural writes
    // -------------------------------------------------------------------------

    /// Create a root or child category.
    pub async fn create(&self, input: CreateCategory) -> AppResult<Category> {
        let name = validate_name(&input.name)?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start transaction")?;

        if Category::live_name_taken(&mut *tx, &name, None).await? {
            return Err(name_taken(&name));
        }

        let path = match input.parent_id {
            Some(parent_id) => {
                let parent = Category::find_live(&mut *tx, parent_id)
                    .await?
                    .ok_or_else(|| missing_parent(parent_id))?;
                if parent.depth() + 1 > MAX_DEPTH {
                    return Err(too_deep());
                }
                parent.lineage()
            }
            None => ROOT.to_string(),
        };

        let category = Category::insert(&mut *tx, &name, input.parent_id, &path, db::now()).await?;
        tx.commit().await.context("failed to commit transaction")?;

        info!(
            category_id = category.id,
            parent_id = ?category.parent_id,
            "category created"
        );
        Ok(category)
    }

    /// Rename and/or move a live category.
    ///
    /// Moving rewrites the path of the category and of every row below it
    /// within the same transaction.
    pub async fn update(&self, id: i64, input: UpdateCategory) -> AppResult<Change<Category>> {
        let new_name = input.name.as_deref().map(validate_name).transpose()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start transaction")?;

        let before = Category::find_live(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("category"))?;

        let name = match new_name {
            Some(name) if name != before.name => {
                if Category::live_name_taken(&mut *tx, &name, Some(id)).await? {
                    return Err(name_taken(&name));
                }
                name
            }
            _ => before.name.clone(),
        };

        let (parent_id, path) = match input.parent_id {
            None => (before.parent_id, before.path.clone()),
            Some(None) => (None, ROOT.to_string()),
            Some(Some(parent_id)) => {
                if parent_id == id {
                    return Err(AppError::Cycle(format!(
                        "category {id} cannot be its own parent"
                    )));
                }
                let parent = Category::find_live(&mut *tx, parent_id)
                    .await?
                    .ok_or_else(|| missing_parent(parent_id))?;
                if parent.is_descendant_of(&before) {
                    return Err(AppError::Cycle(format!(
                        "category {parent_id} is a descendant of category {id}"
                    )));
                }
                (Some(parent_id), parent.lineage())
            }
        };

        let moved = path != before.path;
        if moved {
            let deepest = Category::deepest_within(&mut *tx, &before.lineage())
                .await?
                .unwrap_or(before.depth());
            let subtree_height = deepest.saturating_sub(before.depth());
            if path::depth(&path) + subtree_height > MAX_DEPTH {
                return Err(too_deep());
            }
        }

        let now = db::now();
        Category::write(&mut *tx, id, &name, parent_id, &path, now).await?;
        if moved {
            let rewritten =
                Category::rebase(&mut *tx, &before.lineage(), &path::lineage(&path, id)).await?;
            debug!(category_id = id, rewritten, "descendant paths rewritten");
        }

        let after = Category::find_any(&mut *tx, id)
            .await?
            .context("category vanished during update")?;
        tx.commit().await.context("failed to commit transaction")?;

        info!(
            category_id = id,
            moved,
            parent_id = ?after.parent_id,
            "category updated"
        );
        Ok(Change { before, after })
    }

    /// Soft-delete a live category.
    ///
    /// Live direct children are promoted to roots and their subtrees
    /// re-rooted. Nothing below the deleted category is deleted with it.
    pub async fn delete(&self, id: i64) -> AppResult<Deletion> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start transaction")?;

        let before = Category::find_live(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("category"))?;

        let now = db::now();
        Category::soft_delete(&mut *tx, id, now).await?;

        // Trashed children keep their parent link and stay under this row's
        // lineage, so a later restore can put them back in place.
        let mut promoted = Vec::new();
        for child in Category::children_of(&mut *tx, id).await? {
            if !child.is_live() {
                continue;
            }
            Category::set_parent(&mut *tx, child.id, None, ROOT, now).await?;
            Category::rebase(&mut *tx, &child.lineage(), &path::lineage(ROOT, child.id)).await?;
            promoted.push(child.id);
        }

        let after = Category::find_any(&mut *tx, id)
            .await?
            .context("category vanished during delete")?;
        tx.commit().await.context("failed to commit transaction")?;

        info!(category_id = id, promoted = ?promoted, "category deleted");
        Ok(Deletion {
            change: Change { before, after },
            promoted,
        })
    }

    /// Bring a soft-deleted category back.
    ///
    /// It returns under its former parent when that parent is still live, and
    /// as a root otherwise. Fails if a live category has taken its name.
    pub async fn restore(&self, id: i64) -> AppResult<Change<Category>> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start transaction")?;

        let before = Category::find_any(&mut *tx, id)
            .await?
            .filter(|c| !c.is_live())
            .ok_or(AppError::NotFound("deleted category"))?;

        if Category::live_name_taken(&mut *tx, &before.name, None).await? {
            return Err(name_taken(&before.name));
        }

        let parent = match before.parent_id {
            Some(parent_id) => Category::find_live(&mut *tx, parent_id).await?,
            None => None,
        };
        let (parent_id, path) = match parent {
            Some(parent) => (Some(parent.id), parent.lineage()),
            None => (None, ROOT.to_string()),
        };

        let moved = path != before.path;
        if moved {
            let deepest = Category::deepest_within(&mut *tx, &before.lineage())
                .await?
                .unwrap_or(before.depth());
            if path::depth(&path) + deepest.saturating_sub(before.depth()) > MAX_DEPTH {
                return Err(too_deep());
            }
        }

        let now = db::now();
        if moved || parent_id != before.parent_id {
            Category::set_parent(&mut *tx, id, parent_id, &path, now).await?;
            Category::rebase(&mut *tx, &before.lineage(), &path::lineage(&path, id)).await?;
        }
        Category::undelete(&mut *tx, id, now).await?;

        let after = Category::find_any(&mut *tx, id)
            .await?
            .context("category vanished during restore")?;
        tx.commit().await.context("failed to commit transaction")?;

        info!(category_id = id, parent_id = ?after.parent_id, "category restored");
        Ok(Change { before, after })
    }
}

impl std::fmt::Debug for CategoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryStore").finish()
    }
}

/// Trim and check a category name.
pub fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("the name field is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "the name may not be greater than {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn name_taken(name: &str) -> AppError {
    AppError::Validation(format!("the name '{name}' has already been taken"))
}

fn missing_parent(parent_id: i64) -> AppError {
    AppError::Validation(format!("parent category {parent_id} does not exist"))
}

fn too_deep() -> AppError {
    AppError::Validation(format!(
        "categories may not be nested more than {MAX_DEPTH} levels deep"
    ))
}
