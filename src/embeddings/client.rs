//! HTTP clients for the hosted embedding providers

use std::str::FromStr;
use std::time::Duration;

use futures::stream;
use futures::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::EmbeddingConfig;
use crate::errors::RagChatError;
use crate::errors::Result;

/// Upper bound on parallel single-text requests for providers without a batch endpoint
const FAN_OUT: usize = 8;

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// `OpenAI` embeddings API or any compatible endpoint
    OpenAI,
    /// Ollama local embeddings
    Ollama,
}

impl FromStr for EmbeddingProvider {
    type Err = RagChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            other => Err(RagChatError::ConfigError(format!(
                "Unknown embedding provider: {other}"
            ))),
        }
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    data: Vec<IndexedEmbedding>,
}

#[derive(Deserialize)]
struct IndexedEmbedding {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

/// Thin transport over one provider's embedding endpoint
pub struct EmbeddingClient {
    http: Client,
    provider: EmbeddingProvider,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl EmbeddingClient {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            provider: config.provider,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        })
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self.provider {
            EmbeddingProvider::Ollama => self.embed_ollama(text).await,
            EmbeddingProvider::OpenAI => self
                .embed_openai(&[text])
                .await?
                .pop()
                .ok_or_else(|| RagChatError::EmbeddingError("Empty embedding response".into())),
        }
    }

    /// Embed several texts; the result lines up with `texts`
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        match self.provider {
            EmbeddingProvider::OpenAI => self.embed_openai(texts).await,
            EmbeddingProvider::Ollama => {
                let owned: Vec<String> = texts.iter().map(|text| (*text).to_string()).collect();
                stream::iter(owned)
                    .map(|text| async move { self.embed_ollama(&text).await })
                    .buffered(FAN_OUT)
                    .collect::<Vec<_>>()
                    .await
                    .into_iter()
                    .collect()
            }
        }
    }

    async fn embed_openai(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        debug!("Embedding {} texts with {}", texts.len(), self.model);

        let body = BatchEmbedRequest {
            model: &self.model,
            input: texts,
        };
        let mut response: BatchEmbedResponse = self.post_json("embeddings", &body).await?;

        if response.data.len() != texts.len() {
            return Err(RagChatError::EmbeddingError(format!(
                "Asked for {} embeddings, provider returned {}",
                texts.len(),
                response.data.len()
            )));
        }

        // Providers may answer out of order; `index` is authoritative when present
        response
            .data
            .sort_by_key(|item| item.index.unwrap_or(usize::MAX));
        Ok(response.data.into_iter().map(|item| item.embedding).collect())
    }

    async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>> {
        let body = OllamaEmbedRequest {
            model: &self.model,
            prompt: text,
        };
        let response: OllamaEmbedResponse = self.post_json("api/embeddings", &body).await?;
        Ok(response.embedding)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);
        let mut request = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RagChatError::EmbeddingError(format!(
                "{url} answered {status}: {detail}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RagChatError::EmbeddingError(format!("Malformed embedding response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: EmbeddingProvider, endpoint: &str, api_key: Option<&str>) -> EmbeddingConfig {
        EmbeddingConfig {
            provider,
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            endpoint: endpoint.to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(
            "openai".parse::<EmbeddingProvider>().unwrap(),
            EmbeddingProvider::OpenAI
        );
        assert_eq!(
            "Ollama".parse::<EmbeddingProvider>().unwrap(),
            EmbeddingProvider::Ollama
        );
        assert!("cohere".parse::<EmbeddingProvider>().is_err());
    }

    #[test]
    fn test_client_normalizes_endpoint_and_key() {
        let client = EmbeddingClient::from_config(&config(
            EmbeddingProvider::Ollama,
            "http://localhost:11434//",
            Some(""),
        ))
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert!(client.api_key.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let client = EmbeddingClient::from_config(&config(
            EmbeddingProvider::OpenAI,
            "http://127.0.0.1:1",
            None,
        ))
        .unwrap();
        assert!(client.embed("policy handbook").await.is_err());
    }
}
