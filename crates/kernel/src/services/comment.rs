//! Comment service.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{Change, Comment, CommentView, Post};
use crate::pagination::{Page, PageParams};

/// Longest accepted comment, in characters.
pub const MAX_CONTENT_LEN: usize = 1000;

/// Service for comments.
#[derive(Clone)]
pub struct CommentService {
    pool: SqlitePool,
}

impl CommentService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Page through a live post's comments, oldest first.
    pub async fn list_for_post(
        &self,
        post_id: i64,
        params: &PageParams,
    ) -> AppResult<Page<CommentView>> {
        if Post::find_live(&self.pool, post_id).await?.is_none() {
            return Err(AppError::NotFound("post"));
        }
        Ok(Comment::list_for_post(&self.pool, post_id, params).await?)
    }

    /// Get a live comment.
    pub async fn find(&self, id: i64) -> AppResult<Comment> {
        Comment::find_live(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("comment"))
    }

    /// Get a soft-deleted comment.
    pub async fn find_trashed(&self, id: i64) -> AppResult<Comment> {
        Comment::find_trashed(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("comment"))
    }

    /// A user's deleted comments, most recently deleted first.
    pub async fn trashed(&self, user_id: i64, params: &PageParams) -> AppResult<Page<CommentView>> {
        Ok(Comment::list_trashed_for_user(&self.pool, user_id, params).await?)
    }

    /// Comment on a live post.
    pub async fn create(&self, post_id: i64, user_id: i64, content: &str) -> AppResult<Comment> {
        let content = validate_content(content)?;
        if Post::find_live(&self.pool, post_id).await?.is_none() {
            return Err(AppError::NotFound("post"));
        }

        let comment = Comment::insert(&self.pool, post_id, user_id, &content).await?;

        info!(comment_id = comment.id, post_id, user_id, "comment created");
        Ok(comment)
    }

    /// Replace a live comment's text.
    pub async fn update(&self, before: Comment, content: &str) -> AppResult<Change<Comment>> {
        let content = validate_content(content)?;
        let after = Comment::write(&self.pool, before.id, &content).await?;

        info!(comment_id = after.id, "comment updated");
        Ok(Change { before, after })
    }

    /// Move a live comment to the trash.
    pub async fn delete(&self, comment: Comment) -> AppResult<Comment> {
        Comment::set_deleted(&self.pool, comment.id, true).await?;
        info!(comment_id = comment.id, "comment deleted");
        Ok(comment)
    }

    /// Bring a trashed comment back.
    pub async fn restore(&self, before: Comment) -> AppResult<Change<Comment>> {
        let after = Comment::set_deleted(&self.pool, before.id, false).await?;
        info!(comment_id = after.id, "comment restored");
        Ok(Change { before, after })
    }
}

impl std::fmt::Debug for CommentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentService").finish()
    }
}

fn validate_content(content: &str) -> AppResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("the content field is required".to_string()));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(AppError::Validation(format!(
            "the content may not be greater than {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(content.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn content_bounds() {
        assert_eq!(validate_content(" nice post ").unwrap(), "nice post");
        assert!(validate_content("").is_err());
        assert!(validate_content(&"é".repeat(MAX_CONTENT_LEN)).is_ok());
        assert!(validate_content(&"a".repeat(MAX_CONTENT_LEN + 1)).is_err());
    }
}
