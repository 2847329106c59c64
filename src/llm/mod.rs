//! Chat completion client for OpenAI-compatible APIs
//!
//! - `complete` returns the whole answer
//! - `complete_stream` relays `choices[0].delta.content` deltas as they arrive

pub mod client;
pub mod prompts;
pub mod streaming;

pub use client::LlmService;
pub use prompts::ChatPrompts;
pub use prompts::PromptTemplate;
pub use streaming::StreamingResponse;

use serde::Deserialize;
use serde::Serialize;

use crate::models::MessageRole;

/// One message in a chat completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role: role.as_str().to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Per-request overrides; `None` falls back to the configured value
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}
