//! Kernel services.
//!
//! Services sit between the HTTP handlers and the models. They validate
//! input, enforce existence rules, and log what they change.

pub mod audit;
pub mod auth;
pub mod comment;
pub mod post;

pub use audit::AuditService;
pub use auth::AuthService;
pub use comment::CommentService;
pub use post::{PostDetail, PostService};
