//! HTTP API: document management and chat over REST, answers streamed via SSE

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use server::build_app;
pub use server::serve_api;
