//! Hierarchical categories.
//!
//! - [`path`]: materialized path encoding
//! - [`tree`]: pure forest builder
//! - [`descendants`]: descendant-set resolution and its consistency checks
//! - [`store`]: the only writer of category rows

pub mod descendants;
pub mod path;
pub mod store;
pub mod tree;

pub use store::{CategoryStore, Deletion};
pub use tree::{TreeNode, build_tree};
