//! Command line interface.
//!
//! `serve` is the default. `seed` loads a small demo data set into the
//! configured database without starting the server.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::models::{CreateCategory, CreatePost, RegisterUser, User};
use crate::state::AppState;

/// Quill blogging backend.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server.
    Serve,
    /// Insert demo users, categories, and posts.
    Seed,
}

/// Demo account created by [`cmd_seed`].
pub const SEED_EMAIL: &str = "demo@example.com";
const SEED_PASSWORD: &str = "demo-password";

/// Category chain created by [`cmd_seed`], root first.
pub const SEED_CATEGORIES: [&str; 3] = ["Technology", "Mobile", "Android"];

/// Seed the demo data set.
///
/// Does nothing if the root demo category already exists, so it is safe to
/// run more than once.
pub async fn cmd_seed(state: &AppState) -> Result<()> {
    let existing = state.categories().list_all().await?;
    if existing.iter().any(|c| c.name == SEED_CATEGORIES[0]) {
        info!("demo data already present; skipping seed");
        return Ok(());
    }

    let user = match User::find_by_email(state.db(), SEED_EMAIL).await? {
        Some(user) => user,
        None => {
            let (user, _) = state
                .auth()
                .register(RegisterUser {
                    name: "Demo Author".to_string(),
                    email: SEED_EMAIL.to_string(),
                    password: SEED_PASSWORD.to_string(),
                })
                .await
                .context("failed to create demo user")?;
            user
        }
    };

    let mut parent_id = None;
    for name in SEED_CATEGORIES {
        let category = state
            .categories()
            .create(CreateCategory {
                name: name.to_string(),
                parent_id,
            })
            .await
            .with_context(|| format!("failed to create category '{name}'"))?;

        state
            .posts()
            .create(
                user.id,
                CreatePost {
                    title: format!("Welcome to {name}"),
                    content: format!("The first post filed under {name}."),
                    category_id: Some(category.id),
                },
            )
            .await
            .with_context(|| format!("failed to create post in '{name}'"))?;

        parent_id = Some(category.id);
    }

    info!(user_id = user.id, "demo data seeded");
    println!("Seeded demo data. Log in as {SEED_EMAIL} / {SEED_PASSWORD}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::parse_from(["quill"]);
        assert_eq!(cli.command, None);

        let cli = Cli::parse_from(["quill", "seed"]);
        assert_eq!(cli.command, Some(Command::Seed));
    }
}
