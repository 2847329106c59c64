//! Server-Sent Events framing and client-side reassembly
//!
//! Every chat event travels as a single `data: <json>\n\n` frame whose JSON
//! payload carries a `type` tag. [`SseDecoder`] turns an arbitrary byte
//! stream back into frame payloads; [`StreamAssembler`] folds decoded events
//! into the pending assistant message.

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::models::Source;
use crate::RagChatError;
use crate::Result;

/// Event relayed to chat clients while an answer is streamed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatEvent {
    /// Incremental answer text
    Content { content: String },
    /// Chunks the answer is grounded on
    Sources { sources: Vec<Source> },
    /// Upstream finished; carries the persisted assistant message id
    Done {
        #[serde(
            rename = "messageId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        message_id: Option<Uuid>,
    },
    /// Upstream failed; no assistant message was stored
    Error { error: String },
}

impl ChatEvent {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content {
            content: text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Whether no further events follow this one
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Frame one event as `data: <json>\n\n`
pub fn encode_event(event: &ChatEvent) -> Result<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(event)?))
}

/// Incremental SSE frame decoder
///
/// Bytes may be pushed in pieces of any size, including splits inside a
/// UTF-8 sequence or between the two newlines of a frame terminator.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return the `data` payloads of every completed frame
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        // CR is only ever part of a CRLF line ending in practice
        self.buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));

        let mut payloads = Vec::new();
        while let Some(end) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(payload) = parse_frame(&frame[..end]) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing frame that was not followed by a blank line
    pub fn finish(&mut self) -> Option<String> {
        let frame = std::mem::take(&mut self.buffer);
        parse_frame(&frame)
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Join the `data:` lines of one frame; comments and other fields are ignored
fn parse_frame(frame: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(frame);
    let mut data_lines = Vec::new();

    for line in text.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        } else if line == "data" {
            data_lines.push("");
        }
    }

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

/// Client-side streaming state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
    Done,
    Failed,
}

/// Reassembles a streamed answer from decoded chat events
#[derive(Debug, Default)]
pub struct StreamAssembler {
    state: StreamState,
    text: String,
    sources: Vec<Source>,
    message_id: Option<Uuid>,
    error: Option<String>,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the request as sent; clears any previous result
    pub fn start(&mut self) {
        *self = Self {
            state: StreamState::Streaming,
            ..Self::default()
        };
    }

    /// Parse and apply one SSE payload
    pub fn apply_payload(&mut self, payload: &str) -> Result<Option<String>> {
        let event: ChatEvent = serde_json::from_str(payload)?;
        self.apply(event)
    }

    /// Apply one event, returning newly appended text if any
    ///
    /// Events after `done` or `error` are rejected.
    pub fn apply(&mut self, event: ChatEvent) -> Result<Option<String>> {
        match self.state {
            StreamState::Done | StreamState::Failed => {
                return Err(RagChatError::Custom(
                    "received event after the stream finished".to_string(),
                ));
            }
            StreamState::Idle => self.state = StreamState::Streaming,
            StreamState::Streaming => {}
        }

        match event {
            ChatEvent::Content { content } => {
                self.text.push_str(&content);
                Ok(Some(content))
            }
            ChatEvent::Sources { sources } => {
                self.sources = sources;
                Ok(None)
            }
            ChatEvent::Done { message_id } => {
                self.message_id = message_id;
                self.state = StreamState::Done;
                Ok(None)
            }
            ChatEvent::Error { error } => {
                self.text.clear();
                self.error = Some(error);
                self.state = StreamState::Failed;
                Ok(None)
            }
        }
    }

    /// Close the stream when the transport ends; a missing `done` is a failure
    pub fn finish(&mut self) {
        if self.state == StreamState::Streaming || self.state == StreamState::Idle {
            self.text.clear();
            self.error = Some("stream ended before completion".to_string());
            self.state = StreamState::Failed;
        }
    }

    pub const fn state(&self) -> StreamState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub const fn message_id(&self) -> Option<Uuid> {
        self.message_id
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
