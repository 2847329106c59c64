//! Complete RAG pipeline: Retrieve -> Assemble -> Generate

use std::sync::Arc;

use tracing::debug;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::Database;
use crate::embeddings::EmbeddingService;
use crate::errors::Result;
use crate::llm::ChatMessage;
use crate::llm::ChatPrompts;
use crate::llm::CompletionParams;
use crate::llm::LlmService;
use crate::llm::StreamingResponse;
use crate::models::Message;
use crate::models::MessageRole;
use crate::models::Source;
use crate::rag::ContextAssembler;
use crate::rag::RetrievalOptions;
use crate::rag::Retriever;

/// Complete RAG service
pub struct RagService {
    retriever: Retriever,
    context_assembler: ContextAssembler,
    llm_service: LlmService,
    system_prompt: String,
}

impl RagService {
    /// Create a new RAG service on top of an existing database handle
    ///
    /// # Errors
    /// - Embedding service configuration errors (unknown provider)
    /// - HTTP client construction errors
    pub fn new(config: &AppConfig, database: Arc<Database>) -> Result<Self> {
        let embedding_service = Arc::new(EmbeddingService::new(config)?);
        let llm_service = LlmService::new(config)?;
        Ok(Self::from_services(
            database,
            embedding_service,
            llm_service,
            config,
        ))
    }

    /// Create from existing services
    #[must_use]
    pub fn from_services(
        database: Arc<Database>,
        embedding_service: Arc<EmbeddingService>,
        llm_service: LlmService,
        config: &AppConfig,
    ) -> Self {
        Self {
            retriever: Retriever::new(database, embedding_service),
            context_assembler: ContextAssembler::new(config.chat.max_context_chars),
            llm_service,
            system_prompt: config.chat.system_prompt.clone(),
        }
    }

    /// Build the completion request: system prompt with context, prior turns, question
    ///
    /// System messages stored in history are not replayed.
    #[must_use]
    pub fn build_messages(
        system_prompt: &str,
        context: Option<&str>,
        history: &[Message],
        question: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(ChatPrompts::system_message(
            system_prompt,
            context,
        )));

        messages.extend(
            history
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| ChatMessage::new(m.role, m.content.clone())),
        );

        messages.push(ChatMessage::user(question));
        messages
    }

    /// Retrieve and assemble; returns the completion messages and their sources
    async fn prepare(
        &self,
        user_id: Uuid,
        question: &str,
        history: &[Message],
        options: &RetrievalOptions,
    ) -> Result<(Vec<ChatMessage>, Vec<Source>)> {
        debug!("Step 1: Retrieving chunks");
        let chunks = self.retriever.retrieve(user_id, question, options).await?;

        debug!("Step 2: Assembling context from {} chunks", chunks.len());
        let context = self.context_assembler.assemble(&chunks);
        let sources = self.context_assembler.sources(&chunks);

        let context = (!context.is_empty()).then_some(context.as_str());
        let messages = Self::build_messages(&self.system_prompt, context, history, question);

        Ok((messages, sources))
    }

    /// Answer a question in one completion call
    ///
    /// # Errors
    /// - Embedding errors for the question
    /// - Database query errors
    /// - LLM generation errors (API failures, rate limits, invalid responses)
    pub async fn answer(
        &self,
        user_id: Uuid,
        question: &str,
        history: &[Message],
        options: &RetrievalOptions,
    ) -> Result<RagResponse> {
        info!("Processing RAG question ({} history messages)", history.len());

        let (messages, sources) = self.prepare(user_id, question, history, options).await?;

        debug!("Step 3: Generating answer");
        let answer = self
            .llm_service
            .complete(&messages, CompletionParams::default())
            .await?;

        info!("RAG answer completed with {} sources", sources.len());
        Ok(RagResponse { answer, sources })
    }

    /// Answer a question as a stream of text deltas
    ///
    /// Retrieval and the upstream connection happen before this returns, so
    /// their errors surface here rather than inside the stream.
    pub async fn answer_stream(
        &self,
        user_id: Uuid,
        question: &str,
        history: &[Message],
        options: &RetrievalOptions,
    ) -> Result<RagStream> {
        info!("Processing streamed RAG question");

        let (messages, sources) = self.prepare(user_id, question, history, options).await?;
        let stream = self
            .llm_service
            .complete_stream(&messages, CompletionParams::default())
            .await?;

        Ok(RagStream { sources, stream })
    }
}

/// RAG response
#[derive(Debug, Clone)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Streamed RAG answer; sources are known before the first delta
#[derive(Debug)]
pub struct RagStream {
    pub sources: Vec<Source>,
    pub stream: StreamingResponse,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn message(role: MessageRole, content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::nil(),
            role,
            content: content.to_string(),
            sources: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_messages_order() {
        let history = vec![
            message(MessageRole::User, "Hi"),
            message(MessageRole::Assistant, "Hello!"),
        ];
        let messages = RagService::build_messages(
            "Be helpful.",
            Some("[1] Handbook\nVacation is 25 days."),
            &history,
            "How many vacation days?",
        );

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("[1] Handbook"));
        assert_eq!(messages[1], ChatMessage::user("Hi"));
        assert_eq!(messages[2], ChatMessage::assistant("Hello!"));
        assert_eq!(messages[3], ChatMessage::user("How many vacation days?"));
    }

    #[test]
    fn test_build_messages_without_context() {
        let messages = RagService::build_messages("Be helpful.", None, &[], "Anything?");
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("No relevant context was found"));
    }

    #[test]
    fn test_build_messages_skips_stored_system_messages() {
        let history = vec![message(MessageRole::System, "old prompt")];
        let messages = RagService::build_messages("Be helpful.", None, &history, "Q");
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.content != "old prompt"));
    }
}
