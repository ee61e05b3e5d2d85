//! HTTP route handlers.

pub mod audit;
pub mod auth;
pub mod category;
pub mod comment;
pub mod health;
pub mod helpers;
pub mod post;
