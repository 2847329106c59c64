//! Conversations and message exchange
//!
//! A user message is stored before the answer is requested. The assistant
//! reply is stored only once the completion finished successfully, together
//! with the sources it was grounded on.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::Database;
use crate::errors::RagChatError;
use crate::errors::Result;
use crate::models::Conversation;
use crate::models::ConversationSettings;
use crate::models::ConversationSettingsPatch;
use crate::models::ConversationSummary;
use crate::models::ConversationWithMessages;
use crate::models::Message;
use crate::models::MessageRole;
use crate::rag::RagResponse;
use crate::rag::RagService;
use crate::rag::RetrievalOptions;
use crate::sse::ChatEvent;

/// Maximum characters of the first message used as a conversation title
pub const TITLE_MAX_CHARS: usize = 50;

pub type ChatEventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// Both messages of one completed exchange
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub user_message: Message,
    pub assistant_message: Message,
}

/// Conversation title from the first user message
///
/// Whitespace is collapsed and long text is cut at `TITLE_MAX_CHARS` chars
/// with a trailing ellipsis.
#[must_use]
pub fn title_from_message(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > TITLE_MAX_CHARS {
        let truncated: String = collapsed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", truncated.trim_end())
    } else {
        collapsed
    }
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(RagChatError::validation("message content is required"));
    }
    Ok(())
}

pub struct ChatService {
    database: Arc<Database>,
    rag: Arc<RagService>,
    history_limit: usize,
    default_settings: ConversationSettings,
}

impl ChatService {
    pub fn new(config: &AppConfig, database: Arc<Database>, rag: Arc<RagService>) -> Self {
        Self {
            database,
            rag,
            history_limit: config.chat.history_limit,
            default_settings: config.default_conversation_settings(),
        }
    }

    pub async fn create_conversation(
        &self,
        user_id: Uuid,
        title: Option<String>,
        settings: Option<ConversationSettings>,
    ) -> Result<Conversation> {
        let settings = settings.unwrap_or_else(|| self.default_settings.clone());
        settings.validate()?;

        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let conversation = self
            .database
            .create_conversation(user_id, title.as_deref(), &settings)
            .await?;

        info!("Created conversation {} for user {}", conversation.id, user_id);
        Ok(conversation)
    }

    pub async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>> {
        self.database.list_conversations(user_id).await
    }

    async fn get_conversation(&self, user_id: Uuid, id: Uuid) -> Result<Conversation> {
        self.database
            .get_conversation(user_id, id)
            .await?
            .ok_or_else(|| RagChatError::not_found(format!("Conversation {id}")))
    }

    pub async fn get_conversation_with_messages(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<ConversationWithMessages> {
        let conversation = self.get_conversation(user_id, id).await?;
        let messages = self.database.list_messages(id).await?;
        Ok(ConversationWithMessages {
            conversation,
            messages,
        })
    }

    /// Delete a conversation and, by cascade, its messages
    pub async fn delete_conversation(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        if self.database.delete_conversation(user_id, id).await? {
            info!("Deleted conversation {}", id);
            Ok(())
        } else {
            Err(RagChatError::not_found(format!("Conversation {id}")))
        }
    }

    /// Merge a partial settings update into the stored settings
    pub async fn update_settings(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &ConversationSettingsPatch,
    ) -> Result<Conversation> {
        let conversation = self.get_conversation(user_id, id).await?;
        let settings = conversation.settings.0.merged(patch);
        settings.validate()?;

        self.database
            .update_conversation_settings(user_id, id, &settings)
            .await?
            .ok_or_else(|| RagChatError::not_found(format!("Conversation {id}")))
    }

    /// Load history, store the user message and name the conversation if needed
    ///
    /// History is read before the new message is stored, so it holds only
    /// prior turns.
    async fn prepare_turn(
        &self,
        user_id: Uuid,
        id: Uuid,
        content: &str,
    ) -> Result<(Conversation, Vec<Message>, Message)> {
        validate_content(content)?;
        let conversation = self.get_conversation(user_id, id).await?;

        let history = self
            .database
            .recent_messages(id, self.history_limit)
            .await?;

        let user_message = self
            .database
            .insert_message(id, MessageRole::User, content, None)
            .await?;

        if conversation.title.is_none() {
            self.database
                .set_conversation_title_if_missing(id, &title_from_message(content))
                .await?;
        }
        self.database.touch_conversation(id).await?;

        Ok((conversation, history, user_message))
    }

    /// Send a message and wait for the whole answer
    ///
    /// If the completion fails the user message stays stored and no
    /// assistant message is written.
    pub async fn send_message(
        &self,
        user_id: Uuid,
        id: Uuid,
        content: &str,
    ) -> Result<SendMessageResponse> {
        let (conversation, history, user_message) =
            self.prepare_turn(user_id, id, content).await?;

        let options = RetrievalOptions::from(&conversation.settings.0);
        let response = self
            .rag
            .answer(user_id, content, &history, &options)
            .await?;

        let assistant_message = self
            .database
            .insert_message(
                id,
                MessageRole::Assistant,
                &response.answer,
                Some(response.sources.as_slice()),
            )
            .await?;
        self.database.touch_conversation(id).await?;

        Ok(SendMessageResponse {
            user_message,
            assistant_message,
        })
    }

    /// Send a message and stream the answer as chat events
    ///
    /// Validation and ownership errors are returned directly. Everything after
    /// the user message is stored is reported in-stream: `sources`, then
    /// `content` deltas, then `done` with the stored assistant message id, or
    /// a single `error`. Dropping the stream cancels the answer and nothing is
    /// stored for the assistant.
    pub async fn stream_message(
        &self,
        user_id: Uuid,
        id: Uuid,
        content: &str,
    ) -> Result<ChatEventStream> {
        let (conversation, history, _user_message) =
            self.prepare_turn(user_id, id, content).await?;

        let options = RetrievalOptions::from(&conversation.settings.0);
        let (tx, rx) = mpsc::channel::<ChatEvent>(32);

        let database = Arc::clone(&self.database);
        let rag = Arc::clone(&self.rag);
        let question = content.to_string();

        tokio::spawn(async move {
            let rag_stream = match rag
                .answer_stream(user_id, &question, &history, &options)
                .await
            {
                Ok(rag_stream) => rag_stream,
                Err(e) => {
                    warn!("Streaming answer failed before start: {}", e);
                    let _ = tx.send(ChatEvent::error(e.to_string())).await;
                    return;
                }
            };

            let sources = rag_stream.sources;
            if tx
                .send(ChatEvent::Sources {
                    sources: sources.clone(),
                })
                .await
                .is_err()
            {
                return;
            }

            let mut deltas = rag_stream.stream.into_stream();
            let mut answer = String::new();

            while let Some(delta) = deltas.next().await {
                match delta {
                    Ok(text) => {
                        answer.push_str(&text);
                        if tx.send(ChatEvent::content(text)).await.is_err() {
                            debug!("Client disconnected, discarding answer for {}", id);
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Streaming answer interrupted: {}", e);
                        let _ = tx.send(ChatEvent::error(e.to_string())).await;
                        return;
                    }
                }
            }

            let stored = database
                .insert_message(id, MessageRole::Assistant, &answer, Some(sources.as_slice()))
                .await;

            match stored {
                Ok(message) => {
                    if let Err(e) = database.touch_conversation(id).await {
                        warn!("Failed to update conversation {}: {}", id, e);
                    }
                    let _ = tx
                        .send(ChatEvent::Done {
                            message_id: Some(message.id),
                        })
                        .await;
                }
                Err(e) => {
                    warn!("Failed to store streamed answer: {}", e);
                    let _ = tx.send(ChatEvent::error(e.to_string())).await;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    /// Answer a one-off question without storing anything
    pub async fn quick_chat(
        &self,
        user_id: Uuid,
        question: &str,
        settings: Option<ConversationSettings>,
    ) -> Result<RagResponse> {
        validate_content(question)?;
        let settings = settings.unwrap_or_else(|| self.default_settings.clone());
        settings.validate()?;

        self.rag
            .answer(user_id, question, &[], &RetrievalOptions::from(&settings))
            .await
    }
}
