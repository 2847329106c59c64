//! Completion and embedding clients against a local fake upstream

use std::net::SocketAddr;

use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use axum::Json;
use axum::Router;
use futures::StreamExt;
use ragchat::config::LlmConfig;
use ragchat::embeddings::EmbeddingConfig;
use ragchat::embeddings::EmbeddingProvider;
use ragchat::embeddings::EmbeddingService;
use ragchat::llm::ChatMessage;
use ragchat::llm::CompletionParams;
use ragchat::llm::LlmService;
use ragchat::RagChatError;
use serde_json::json;
use serde_json::Value;

const DIMENSION: usize = 4;

async fn chat_completions(Json(body): Json<Value>) -> Response {
    let model = body["model"].as_str().unwrap_or_default();
    let stream = body["stream"].as_bool().unwrap_or(false);

    match (model, stream) {
        ("overloaded", _) => (StatusCode::SERVICE_UNAVAILABLE, "try again later").into_response(),
        ("mid-stream-error", true) => (
            [(header::CONTENT_TYPE, "text/event-stream")],
            concat!(
                "data: {\"choices\":[{\"delta\":{\"content\":\"Par\"}}]}\n\n",
                "data: {\"error\":{\"message\":\"context length exceeded\"}}\n\n",
            ),
        )
            .into_response(),
        (_, true) => (
            [(header::CONTENT_TYPE, "text/event-stream")],
            concat!(
                ": keep-alive\n\n",
                "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"Vacation \"}}]}\r\n\r\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"is 25 days [1].\"}}]}\n\n",
                "data: [DONE]\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
            ),
        )
            .into_response(),
        (_, false) => {
            let question = body["messages"]
                .as_array()
                .and_then(|messages| messages.last())
                .and_then(|message| message["content"].as_str())
                .unwrap_or_default()
                .to_string();
            Json(json!({
                "choices": [{"message": {"role": "assistant", "content": format!("echo: {question}")}}]
            }))
            .into_response()
        }
    }
}

/// Returns embeddings in reverse order with their `index` set
async fn embeddings(Json(body): Json<Value>) -> Response {
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(index, input)| {
            let len = input.as_str().map_or(0, str::len) as f32;
            json!({"index": index, "embedding": [len, 0.0, 0.0, 1.0]})
        })
        .collect();
    Json(json!({ "data": data })).into_response()
}

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/embeddings", post(embeddings));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn llm(addr: SocketAddr, model: &str) -> LlmService {
    LlmService::from_config(&LlmConfig {
        endpoint: format!("http://{addr}/v1/"),
        api_key: String::new(),
        model: model.to_string(),
        temperature: 0.2,
        max_tokens: 64,
    })
    .unwrap()
}

fn messages() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("Answer from the context."),
        ChatMessage::user("How many vacation days?"),
    ]
}

#[tokio::test]
async fn test_complete_returns_whole_answer() {
    let addr = spawn_upstream().await;
    let answer = llm(addr, "test-model")
        .complete(&messages(), CompletionParams::default())
        .await
        .unwrap();
    assert_eq!(answer, "echo: How many vacation days?");
}

#[tokio::test]
async fn test_complete_stream_relays_deltas_until_done() {
    let addr = spawn_upstream().await;
    let response = llm(addr, "test-model")
        .complete_stream(&messages(), CompletionParams::default())
        .await
        .unwrap();

    let deltas: Vec<String> = response
        .into_stream()
        .map(|item| item.unwrap())
        .collect()
        .await;
    assert_eq!(deltas, vec!["Vacation ", "is 25 days [1]."]);
}

#[tokio::test]
async fn test_complete_stream_surfaces_mid_stream_error() {
    let addr = spawn_upstream().await;
    let response = llm(addr, "mid-stream-error")
        .complete_stream(&messages(), CompletionParams::default())
        .await
        .unwrap();

    let mut stream = response.into_stream();
    assert_eq!(stream.next().await.unwrap().unwrap(), "Par");
    assert!(matches!(
        stream.next().await,
        Some(Err(RagChatError::LlmError(_)))
    ));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_error_status_fails_before_streaming() {
    let addr = spawn_upstream().await;
    let service = llm(addr, "overloaded");

    let err = service
        .complete_stream(&messages(), CompletionParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RagChatError::LlmError(ref msg) if msg.contains("503")));

    let err = service
        .complete(&messages(), CompletionParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_embedding_batch_keeps_input_order() {
    let addr = spawn_upstream().await;
    let service = EmbeddingService::from_config(EmbeddingConfig {
        provider: EmbeddingProvider::OpenAI,
        model: "test-embedding".to_string(),
        dimension: DIMENSION,
        endpoint: format!("http://{addr}/v1"),
        api_key: None,
    })
    .unwrap();

    let embeddings = service.generate_batch(&["a", "bbb", "cc"]).await.unwrap();
    let lengths: Vec<f32> = embeddings.iter().map(|e| e[0]).collect();
    assert_eq!(lengths, vec![1.0, 3.0, 2.0]);

    let single = service.generate("hello").await.unwrap();
    assert_eq!(single.len(), DIMENSION);
}

#[tokio::test]
async fn test_embedding_dimension_mismatch_is_rejected() {
    let addr = spawn_upstream().await;
    let service = EmbeddingService::from_config(EmbeddingConfig {
        provider: EmbeddingProvider::OpenAI,
        model: "test-embedding".to_string(),
        dimension: 8,
        endpoint: format!("http://{addr}/v1"),
        api_key: None,
    })
    .unwrap();

    let err = service.generate("hello").await.unwrap_err();
    assert!(matches!(err, RagChatError::EmbeddingError(_)));
}
