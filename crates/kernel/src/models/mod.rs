//! Database models.

pub mod audit;
pub mod category;
pub mod comment;
pub mod post;
pub mod user;

pub use audit::{Audit, AuditEntry, AuditEvent, AuditFilter, AuditSubject, SubjectType};
pub use category::{Category, CreateCategory, UpdateCategory};
pub use comment::{Comment, CommentInput, CommentView};
pub use post::{CreatePost, Post, PostSummary, UpdatePost};
pub use user::{LoginRequest, RegisterUser, User};

/// Row snapshots taken around a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<T> {
    pub before: T,
    pub after: T,
}
