//! CLI output formatting utilities
//!
//! This module provides consistent output formatting for the `ragchat` CLI

use crate::models::Document;
use crate::models::DocumentStats;
use crate::models::Source;
use crate::models::User;
use crate::AppConfig;

/// Cut to `max_chars` characters with a `...` suffix
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", &s[..byte]),
        None => s.to_string(),
    }
}

/// Print document list
pub fn print_document_list(documents: &[Document]) {
    println!("Found {} documents:", documents.len());
    for document in documents {
        println!(
            "  - {} | {} | {} bytes | {} chunks | {}",
            document.id,
            truncate_str(&document.title, 40),
            document.size,
            document.chunk_count,
            document.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

pub fn print_document_stats(stats: &DocumentStats) {
    println!("📊 Document statistics:");
    println!("  Documents: {}", stats.total_documents);
    println!("  Chunks: {}", stats.total_chunks);
    println!(
        "  Embedded chunks: {} ({:.1}%)",
        stats.embedded_chunks,
        if stats.total_chunks > 0 {
            stats.embedded_chunks as f64 * 100.0 / stats.total_chunks as f64
        } else {
            0.0
        }
    );
    println!("  Total size: {} bytes", stats.total_bytes);
}

/// Print the citations of an answer
pub fn print_sources(sources: &[Source]) {
    if sources.is_empty() {
        println!("📚 No sources above the similarity threshold");
        return;
    }

    println!("📚 Sources ({}):", sources.len());
    for (idx, source) in sources.iter().enumerate() {
        println!(
            "  [{}] {} (similarity {:.2})",
            idx + 1,
            source.document_title,
            source.similarity
        );
        println!("      {}", truncate_str(&source.content.replace('\n', " "), 100));
    }
}

pub fn print_user(user: &User) {
    println!("  ID: {}", user.id);
    println!("  Name: {}", user.name);
    println!("  Created: {}", user.created_at.format("%Y-%m-%d %H:%M:%S"));
}

/// Print configuration with secrets masked
pub fn print_config(config: &AppConfig) {
    println!("📋 ragchat Configuration:");
    println!();

    println!("🗄️  Database:");
    println!("  URL: {}", mask_database_url(config.database_url()));
    println!("  Max connections: {}", config.max_connections());
    println!("  Min connections: {}", config.min_connections());
    println!("  Connection timeout: {}s", config.connection_timeout());
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  Backtrace: {}", config.logging.backtrace);
    println!();

    println!("🧠 Embeddings:");
    println!("  Provider: {}", config.embeddings.provider);
    println!("  Endpoint: {}", config.embeddings.endpoint);
    println!("  Model: {}", config.embedding_model());
    println!("  Dimension: {}", config.embedding_dimension());
    println!();

    println!("🤖 LLM:");
    println!("  Endpoint: {}", config.llm_endpoint());
    println!("  Model: {}", config.llm_model());
    println!("  Key: {}", mask_secret(&config.llm.api_key));
    println!("  Temperature: {}", config.llm.temperature);
    println!("  Max tokens: {}", config.llm.max_tokens);
    println!();

    println!("💬 Chat:");
    println!("  Default topK: {}", config.chat.default_top_k);
    println!("  Default threshold: {}", config.chat.default_threshold);
    println!("  History limit: {}", config.chat.history_limit);
    println!("  Max context chars: {}", config.chat.max_context_chars);
    println!();

    println!("📄 Documents:");
    println!("  Max chunk tokens: {}", config.documents.max_chunk_tokens);
    println!("  Max upload size: {} bytes", config.documents.max_upload_bytes);
    println!();

    println!("🌐 Server:");
    println!("  Address: {}:{}", config.server.host, config.server.port);
    println!("  CORS: {}", config.server.enable_cors);
    println!("  Environment: {}", config.server.environment);
}

/// Replace the password in a connection URL, keeping host and database name
fn mask_database_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("****")).is_err() {
                return "***masked***".to_string();
            }
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "***invalid***".to_string(),
    }
}

/// Keep only the first four characters of a secret
fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else {
        let prefix: String = secret.chars().take(4).collect();
        format!("{prefix}****")
    }
}

/// Print colored output functions
pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}
