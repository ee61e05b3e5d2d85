//! Post service.
//!
//! Ownership checks happen in the HTTP layer before these methods run;
//! everything here assumes the caller may modify the post it passes in.

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::category::CategoryStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    Category, Change, Comment, CommentView, CreatePost, Post, PostSummary, UpdatePost,
};
use crate::pagination::{Page, PageParams};

/// Longest accepted post title, in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// A post with its live comments.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostSummary,
    pub comments: Vec<CommentView>,
}

/// Service for posts.
#[derive(Clone)]
pub struct PostService {
    pool: SqlitePool,
    categories: Arc<CategoryStore>,
}

impl PostService {
    pub fn new(pool: SqlitePool, categories: Arc<CategoryStore>) -> Self {
        Self { pool, categories }
    }

    /// Page through all live posts, newest first.
    pub async fn list(&self, params: &PageParams) -> AppResult<Page<PostSummary>> {
        Ok(Post::list(&self.pool, params).await?)
    }

    /// Page through posts filed under a category.
    ///
    /// With `direct_only` unset the category's whole subtree is covered. A
    /// missing category gives an empty page.
    pub async fn by_category(
        &self,
        category_id: i64,
        direct_only: bool,
        params: &PageParams,
    ) -> AppResult<Page<PostSummary>> {
        let ids = self.categories.scope_ids(category_id, direct_only).await?;
        Ok(Post::list_by_category_ids(&self.pool, &ids, params).await?)
    }

    /// A live post with its comments, oldest first.
    pub async fn detail(&self, id: i64) -> AppResult<PostDetail> {
        let post = Post::summary(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("post"))?;
        let comments = Comment::all_for_post(&self.pool, id).await?;

        Ok(PostDetail { post, comments })
    }

    /// Get a live post.
    pub async fn find(&self, id: i64) -> AppResult<Post> {
        Post::find_live(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("post"))
    }

    /// Get a soft-deleted post.
    pub async fn find_trashed(&self, id: i64) -> AppResult<Post> {
        Post::find_trashed(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("post"))
    }

    /// A user's deleted posts, most recently deleted first.
    pub async fn trashed(&self, user_id: i64, params: &PageParams) -> AppResult<Page<PostSummary>> {
        Ok(Post::list_trashed_for_user(&self.pool, user_id, params).await?)
    }

    /// Publish a post in a live category.
    pub async fn create(&self, user_id: i64, input: CreatePost) -> AppResult<Post> {
        let title = validate_title(&input.title)?;
        validate_content(&input.content)?;
        let category_id = input
            .category_id
            .ok_or_else(|| AppError::Validation("the category id field is required".to_string()))?;
        self.require_live_category(category_id).await?;

        let post = Post::insert(&self.pool, user_id, category_id, &title, &input.content).await?;

        info!(post_id = post.id, user_id, category_id, "post created");
        Ok(post)
    }

    /// Apply a partial edit to a live post.
    pub async fn update(&self, before: Post, input: UpdatePost) -> AppResult<Change<Post>> {
        let title = match input.title.as_deref() {
            Some(title) => validate_title(title)?,
            None => before.title.clone(),
        };
        let content = match input.content {
            Some(content) => {
                validate_content(&content)?;
                content
            }
            None => before.content.clone(),
        };
        let category_id = match input.category_id {
            Some(id) if id != before.category_id => {
                self.require_live_category(id).await?;
                id
            }
            _ => before.category_id,
        };

        let after = Post::write(&self.pool, before.id, &title, &content, category_id).await?;

        info!(post_id = after.id, "post updated");
        Ok(Change { before, after })
    }

    /// Move a live post to the trash.
    pub async fn delete(&self, post: Post) -> AppResult<Post> {
        Post::set_deleted(&self.pool, post.id, true).await?;
        info!(post_id = post.id, "post deleted");
        Ok(post)
    }

    /// Bring a trashed post back.
    pub async fn restore(&self, before: Post) -> AppResult<Change<Post>> {
        let after = Post::set_deleted(&self.pool, before.id, false).await?;
        info!(post_id = after.id, "post restored");
        Ok(Change { before, after })
    }

    async fn require_live_category(&self, id: i64) -> AppResult<()> {
        match Category::find_live(&self.pool, id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::Validation(
                "the selected category id is invalid".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for PostService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostService").finish()
    }
}

fn validate_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("the title field is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "the title may not be greater than {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("the content field is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn title_is_trimmed_and_bounded() {
        assert_eq!(validate_title("  Hello  ").unwrap(), "Hello");
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(matches!(
            validate_title(&"x".repeat(MAX_TITLE_LEN + 1)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn blank_content_rejected() {
        assert!(validate_content("body").is_ok());
        assert!(validate_content(" \n ").is_err());
    }
}
