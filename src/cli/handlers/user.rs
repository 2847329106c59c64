//! User and API token handlers

use crate::cli::output::print_info;
use crate::cli::output::print_success;
use crate::cli::output::print_user;
use crate::cli::output::print_warning;
use crate::database::Database;
use crate::errors::RagChatError;
use crate::AppConfig;
use crate::Result;

/// Create a user and show its token once; only the hash is stored
pub async fn handle_user_create(config: &AppConfig, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RagChatError::validation("user name is required"));
    }

    let database = Database::from_config(config).await?;
    database.verify_schema_or_error().await?;

    let (user, token) = database.create_user(name).await?;

    print_success("User created");
    print_user(&user);
    println!();
    println!("  API token: {token}");
    println!();
    print_warning("The token is not stored and cannot be shown again.");
    print_info("Use it as `Authorization: Bearer <token>` or set RAGCHAT_TOKEN for `ragchat ask`.");

    Ok(())
}

pub async fn handle_user_list(config: &AppConfig) -> Result<()> {
    let database = Database::from_config(config).await?;
    let users = database.list_users().await?;

    println!("Found {} users:", users.len());
    for user in &users {
        println!(
            "  - {} | {} | {}",
            user.id,
            user.name,
            user.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
