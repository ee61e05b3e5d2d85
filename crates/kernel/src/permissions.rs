//! Ownership checks for post and comment mutations.

use crate::error::{AppError, AppResult};
use crate::models::{Comment, Post};

/// Only the author may edit, delete, or restore a post.
pub fn can_modify_post(user_id: i64, post: &Post) -> bool {
    post.user_id == user_id
}

/// Only the author may edit, delete, or restore a comment.
pub fn can_modify_comment(user_id: i64, comment: &Comment) -> bool {
    comment.user_id == user_id
}

/// Turn a failed check into `403 Forbidden`.
pub fn ensure(allowed: bool) -> AppResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn post(user_id: i64) -> Post {
        Post {
            id: 1,
            title: "t".into(),
            content: "c".into(),
            category_id: 1,
            user_id,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        }
    }

    fn comment(user_id: i64) -> Comment {
        Comment {
            id: 1,
            content: "c".into(),
            post_id: 1,
            user_id,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        }
    }

    #[test]
    fn owner_may_modify() {
        assert!(can_modify_post(7, &post(7)));
        assert!(can_modify_comment(7, &comment(7)));
    }

    #[test]
    fn others_are_forbidden() {
        assert!(!can_modify_post(8, &post(7)));
        assert!(!can_modify_comment(8, &comment(7)));
        assert!(matches!(
            ensure(can_modify_post(8, &post(7))),
            Err(AppError::Forbidden)
        ));
        assert!(ensure(true).is_ok());
    }
}
