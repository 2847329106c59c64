//! CLI command handlers, organized by domain:
//! - init: schema and vector index setup
//! - user: user accounts and API tokens
//! - documents: ingestion, listing, deletion, stats and embedding backfill
//! - ask: streamed questions against a running server
//! - serve: API server
//! - info: configuration display

pub mod ask;
pub mod documents;
pub mod info;
pub mod init;
pub mod serve;
pub mod user;

pub use ask::*;
pub use documents::*;
pub use info::*;
pub use init::*;
pub use serve::*;
pub use user::*;
