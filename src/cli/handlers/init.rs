//! Database initialization handler

use crate::cli::output::print_info;
use crate::cli::output::print_success;
use crate::cli::output::print_warning;
use crate::database::Database;
use crate::AppConfig;
use crate::Result;

/// Create the schema and indexes; safe to run repeatedly
pub async fn handle_init_command(config: &AppConfig, vector_index_lists: Option<usize>) -> Result<()> {
    print_info("🗄️  Initializing ragchat database...");

    let database = Database::from_config(config).await?;

    if database.is_schema_initialized().await? {
        print_info("Schema already present; ensuring all tables and indexes exist");
    }

    if let Err(e) = database.init_schema().await {
        if e.to_string().contains("vector") || e.to_string().contains("extension") {
            print_warning(&format!("Could not enable pgvector extension: {e}"));
            print_warning("Run this as a superuser on the database server:");
            println!("  psql -d <database> -c 'CREATE EXTENSION IF NOT EXISTS vector;'");
            println!();
            println!("Then run: ragchat init");
        }
        return Err(e);
    }
    print_success(&format!(
        "Tables created (embedding dimension {})",
        config.embedding_dimension()
    ));

    if let Some(lists) = vector_index_lists {
        print_info(&format!("📊 Building vector index with {lists} lists..."));
        database.create_vector_index(lists).await?;
        print_success("Vector index created");
    } else {
        print_info("Skipping vector index; add one with --vector-index-lists once data is loaded");
    }

    println!();
    print_success("🎉 Database initialization complete!");
    print_info("Next: create a user with `ragchat user create <name>`");

    Ok(())
}
