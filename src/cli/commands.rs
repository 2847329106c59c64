//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(about = "Chat with your documents: ingestion, retrieval and streamed answers")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize database schema and indexes
    Init {
        /// Also build the IVFFlat vector index with this many lists
        #[arg(long)]
        vector_index_lists: Option<usize>,
    },
    /// Start the API server
    Serve {
        /// Host to bind to (default: from config)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (default: from config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable CORS (default: from config)
        #[arg(long)]
        cors: bool,
    },
    /// User and API token management
    #[command(subcommand)]
    User(UserCommands),
    /// Ingest a text file as a document
    Ingest {
        /// Path to a UTF-8 text file
        path: PathBuf,
        /// Owner of the document
        #[arg(long)]
        user: Uuid,
        /// Document title (default: file name without extension)
        #[arg(short, long)]
        title: Option<String>,
        /// Store chunks without embeddings; run `ragchat embed` later
        #[arg(long)]
        skip_embeddings: bool,
    },
    /// Document commands
    #[command(subcommand)]
    Docs(DocsCommands),
    /// Compute embeddings for chunks stored without one
    Embed {
        /// Only process this user's documents
        #[arg(long)]
        user: Option<Uuid>,
    },
    /// Ask a question against a running server and stream the answer
    Ask {
        /// The question to ask
        question: String,
        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,
        /// API token (default: RAGCHAT_TOKEN environment variable)
        #[arg(long, env = "RAGCHAT_TOKEN")]
        token: String,
        /// Continue an existing conversation instead of creating one
        #[arg(long)]
        conversation: Option<Uuid>,
        /// Show the sources the answer is based on
        #[arg(short, long)]
        sources: bool,
    },
    /// Show current configuration
    Config,
}

impl Commands {
    /// Whether the command reads the server configuration; `ask` only talks HTTP
    #[must_use]
    pub const fn needs_config(&self) -> bool {
        !matches!(self, Self::Ask { .. })
    }
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user and print its API token
    Create {
        /// Display name
        name: String,
    },
    /// List users
    List,
}

#[derive(Subcommand)]
pub enum DocsCommands {
    /// List a user's documents
    List {
        #[arg(long)]
        user: Uuid,
    },
    /// Delete a document and its chunks
    Delete {
        /// Document ID
        id: Uuid,
        #[arg(long)]
        user: Uuid,
    },
    /// Show document statistics
    Stats {
        #[arg(long)]
        user: Uuid,
    },
}
