use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use tracing::warn;

use super::ChatMessage;
use super::CompletionParams;
use super::StreamingResponse;
use crate::config::AppConfig;
use crate::config::LlmConfig;
use crate::errors::RagChatError;
use crate::errors::Result;
use crate::sse::SseDecoder;

const STREAM_DONE: &str = "[DONE]";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// What one upstream SSE payload means for the relay
#[derive(Debug, PartialEq)]
enum StreamFrame {
    Delta(String),
    Skip,
    Done,
}

fn parse_stream_payload(payload: &str) -> Result<StreamFrame> {
    let payload = payload.trim();
    if payload == STREAM_DONE {
        return Ok(StreamFrame::Done);
    }
    if payload.is_empty() {
        return Ok(StreamFrame::Skip);
    }

    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| RagChatError::LlmError(format!("Malformed stream chunk: {e}")))?;

    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(RagChatError::LlmError(format!("Upstream error: {message}")));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty())
        .map_or(StreamFrame::Skip, StreamFrame::Delta))
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmService {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Self::from_config(&config.llm)
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        // No overall timeout: a streamed answer may legitimately run for minutes
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RagChatError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
        stream: bool,
    ) -> reqwest::RequestBuilder {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            stream,
            temperature: params.temperature.unwrap_or(self.temperature),
            max_tokens: params.max_tokens.unwrap_or(self.max_tokens),
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        builder
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
        stream: bool,
    ) -> Result<reqwest::Response> {
        debug!(
            "Calling chat completions: model={}, messages={}, stream={}",
            self.model,
            messages.len(),
            stream
        );

        let response = self
            .request(messages, params, stream)
            .send()
            .await
            .map_err(|e| RagChatError::LlmError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Chat completion failed ({}): {}", status, error_text);
            return Err(RagChatError::LlmError(format!(
                "Upstream returned {status}: {error_text}"
            )));
        }

        Ok(response)
    }

    /// Request a whole completion
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String> {
        let response = self.send(messages, params, false).await?;

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RagChatError::LlmError(format!("Failed to parse response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagChatError::LlmError("No completion in response".to_string()))
    }

    /// Request a streamed completion
    ///
    /// Connection and status errors surface here; failures after the first
    /// byte arrive as the stream's final `Err` item. Dropping the returned
    /// stream stops the relay task at its next send.
    pub async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<StreamingResponse> {
        let response = self.send(messages, params, true).await?;
        let (tx, rx) = mpsc::channel::<Result<String>>(32);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx
                            .send(Err(RagChatError::LlmError(format!("Stream interrupted: {e}"))))
                            .await;
                        return;
                    }
                };

                for payload in decoder.push(&chunk) {
                    match parse_stream_payload(&payload) {
                        Ok(StreamFrame::Delta(text)) => {
                            if tx.send(Ok(text)).await.is_err() {
                                debug!("Stream receiver dropped, stopping relay");
                                return;
                            }
                        }
                        Ok(StreamFrame::Skip) => {}
                        Ok(StreamFrame::Done) => return,
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            // Some servers close without `[DONE]`; flush whatever is buffered
            if let Some(payload) = decoder.finish() {
                match parse_stream_payload(&payload) {
                    Ok(StreamFrame::Delta(text)) => {
                        let _ = tx.send(Ok(text)).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                    }
                }
            }
        });

        Ok(StreamingResponse::new(Box::pin(ReceiverStream::new(rx))))
    }
}

impl std::fmt::Debug for LlmService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmService")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
