//! Ask command handler: streams an answer from a running server

use std::io::Write;
use std::io::{
    self,
};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::api::types::ApiResponse;
use crate::api::types::CreateConversationRequest;
use crate::api::types::SendMessageRequest;
use crate::cli::output::print_info;
use crate::cli::output::print_sources;
use crate::errors::RagChatError;
use crate::models::Conversation;
use crate::sse::ChatEvent;
use crate::sse::SseDecoder;
use crate::sse::StreamAssembler;
use crate::sse::StreamState;
use crate::Result;

/// Simple spinner shown until the first token arrives
struct Spinner {
    message: String,
    running: Arc<AtomicBool>,
}

impl Spinner {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn start(&self) {
        let message = self.message.clone();
        let running = self.running.clone();
        running.store(true, Ordering::Relaxed);

        std::thread::spawn(move || {
            let frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
            let mut idx = 0;

            while running.load(Ordering::Relaxed) {
                print!("\r   {} {}...", frames[idx], message);
                io::stdout().flush().ok();
                idx = (idx + 1) % frames.len();
                std::thread::sleep(Duration::from_millis(80));
            }

            print!("\r{}\r", " ".repeat(80));
            io::stdout().flush().ok();
        });
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(100));
        }
    }
}

/// Early returns must not leave the spinner painting over the error
impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Options for `ragchat ask`
#[derive(Debug, Clone)]
pub struct AskOptions {
    pub server: String,
    pub token: String,
    pub conversation: Option<Uuid>,
    pub show_sources: bool,
}

/// Unwrap the API envelope, turning `success: false` into an error
async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|_| {
        RagChatError::HttpError(format!("Server returned {status}: {body}"))
    })?;

    match (envelope.success, envelope.data) {
        (true, Some(data)) => Ok(data),
        _ => Err(error_from_envelope(
            status,
            envelope.error.as_deref(),
            envelope.code.as_deref(),
        )),
    }
}

fn error_from_envelope(
    status: reqwest::StatusCode,
    message: Option<&str>,
    code: Option<&str>,
) -> RagChatError {
    let message = message.unwrap_or("request failed").to_string();
    match status.as_u16() {
        401 => RagChatError::Unauthorized,
        404 => RagChatError::NotFound(message),
        400 | 413 | 415 | 422 => RagChatError::Validation(message),
        _ => RagChatError::HttpError(match code {
            Some(code) => format!("{status} ({code}): {message}"),
            None => format!("{status}: {message}"),
        }),
    }
}

fn api_url(server: &str, path: &str) -> String {
    format!("{}/api{}", server.trim_end_matches('/'), path)
}

async fn create_conversation(
    client: &reqwest::Client,
    options: &AskOptions,
) -> Result<Conversation> {
    let response = client
        .post(api_url(&options.server, "/chat/conversations"))
        .bearer_auth(&options.token)
        .json(&CreateConversationRequest::default())
        .send()
        .await?;
    read_envelope(response).await
}

/// Print content deltas as they arrive until a terminal event or end of body
async fn print_stream(response: reqwest::Response, spinner: &Spinner) -> Result<StreamAssembler> {
    let mut assembler = StreamAssembler::new();
    let mut decoder = SseDecoder::new();
    assembler.start();

    let mut body = response.bytes_stream();
    let mut stdout = io::stdout();

    'read: while let Some(chunk) = body.next().await {
        for payload in decoder.push(&chunk?) {
            let event: ChatEvent = serde_json::from_str(&payload)?;
            let terminal = event.is_terminal();
            if let Some(delta) = assembler.apply(event)? {
                spinner.stop();
                print!("{delta}");
                stdout.flush().ok();
            }
            if terminal {
                break 'read;
            }
        }
    }
    if assembler.state() == StreamState::Streaming {
        if let Some(payload) = decoder.finish() {
            assembler.apply_payload(&payload)?;
        }
    }
    assembler.finish();
    Ok(assembler)
}

/// Ask a question against a running server and print the streamed answer
pub async fn handle_ask(question: &str, options: AskOptions) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        return Err(RagChatError::validation("question must not be empty"));
    }
    if options.token.trim().is_empty() {
        return Err(RagChatError::validation(
            "an API token is required (--token or RAGCHAT_TOKEN)",
        ));
    }

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let conversation_id = match options.conversation {
        Some(id) => id,
        None => create_conversation(&client, &options).await?.id,
    };

    let spinner = Spinner::new("Thinking");
    spinner.start();

    let response = client
        .post(api_url(
            &options.server,
            &format!("/chat/conversations/{conversation_id}/messages/stream"),
        ))
        .bearer_auth(&options.token)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .json(&SendMessageRequest {
            content: question.to_string(),
        })
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            spinner.stop();
            return Err(e.into());
        }
    };

    if !response.status().is_success() {
        spinner.stop();
        return Err(read_envelope::<serde_json::Value>(response)
            .await
            .err()
            .unwrap_or_else(|| RagChatError::HttpError("unexpected response".to_string())));
    }

    let outcome = print_stream(response, &spinner).await;
    spinner.stop();
    let assembler = outcome?;
    println!();

    if assembler.state() == StreamState::Failed {
        return Err(RagChatError::LlmError(
            assembler.error().unwrap_or("stream failed").to_string(),
        ));
    }

    if options.show_sources {
        println!();
        print_sources(assembler.sources());
    }

    println!();
    print_info(&format!("Conversation: {conversation_id}"));
    if let Some(message_id) = assembler.message_id() {
        print_info(&format!("Message: {message_id}"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_joins_paths() {
        assert_eq!(
            api_url("http://localhost:3000/", "/chat/quick"),
            "http://localhost:3000/api/chat/quick"
        );
        assert_eq!(
            api_url("http://localhost:3000", "/health"),
            "http://localhost:3000/api/health"
        );
    }

    #[test]
    fn test_spinner_stops_when_dropped() {
        let spinner = Spinner::new("Thinking");
        spinner.start();
        let running = Arc::clone(&spinner.running);
        assert!(running.load(Ordering::Relaxed));

        drop(spinner);
        assert!(!running.load(Ordering::Relaxed));
    }

    async fn serve_body(body: &'static str) -> reqwest::Response {
        let app = axum::Router::new().route("/stream", axum::routing::get(move || async move { body }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        reqwest::get(format!("http://{addr}/stream")).await.unwrap()
    }

    #[tokio::test]
    async fn test_print_stream_rejects_malformed_frame() {
        let spinner = Spinner::new("Thinking");
        let outcome = print_stream(serve_body("data: {not json\n\n").await, &spinner).await;
        assert!(matches!(outcome, Err(RagChatError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_print_stream_stops_at_terminal_event() {
        let spinner = Spinner::new("Thinking");
        let assembler = print_stream(
            serve_body(concat!(
                "data: {\"type\":\"sources\",\"sources\":[]}\n\n",
                "data: {\"type\":\"error\",\"error\":\"model overloaded\"}\n\n",
                "data: {\"type\":\"content\",\"content\":\"late\"}\n\n",
            ))
            .await,
            &spinner,
        )
        .await
        .unwrap();
        assert_eq!(assembler.state(), StreamState::Failed);
        assert_eq!(assembler.error(), Some("model overloaded"));
        assert_eq!(assembler.text(), "");
    }

    #[test]
    fn test_error_from_envelope_maps_status() {
        assert!(matches!(
            error_from_envelope(reqwest::StatusCode::UNAUTHORIZED, Some("Unauthorized"), None),
            RagChatError::Unauthorized
        ));
        assert!(matches!(
            error_from_envelope(reqwest::StatusCode::NOT_FOUND, Some("Conversation"), None),
            RagChatError::NotFound(_)
        ));
        let err = error_from_envelope(
            reqwest::StatusCode::BAD_GATEWAY,
            Some("upstream down"),
            Some("llm_error"),
        );
        assert!(err.to_string().contains("llm_error"));
    }
}
