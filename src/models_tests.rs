//! Unit tests for data models
//!
//! Tests validation, serialization, and model behavior.

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    use crate::models::*;

    // ====== Conversation Settings Tests ======

    #[test]
    fn test_settings_defaults() {
        let settings = ConversationSettings::default();
        assert_eq!(settings.top_k, 5);
        assert!((settings.threshold - 0.7).abs() < f32::EPSILON);
        assert!(settings.document_ids.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_missing_fields_use_defaults() {
        let settings: ConversationSettings = serde_json::from_str(r#"{"topK": 3}"#).unwrap();
        assert_eq!(settings.top_k, 3);
        assert!((settings.threshold - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_settings_validation_bounds() {
        let mut settings = ConversationSettings {
            top_k: 0,
            ..ConversationSettings::default()
        };
        assert!(settings.validate().is_err());

        settings.top_k = MAX_TOP_K + 1;
        assert!(settings.validate().is_err());

        settings.top_k = MAX_TOP_K;
        assert!(settings.validate().is_ok());

        settings.threshold = 1.5;
        assert!(settings.validate().is_err());

        settings.threshold = 0.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_patch_absent_vs_null() {
        let doc = Uuid::new_v4();
        let current = ConversationSettings {
            document_ids: Some(vec![doc]),
            ..ConversationSettings::default()
        };

        let absent: ConversationSettingsPatch = serde_json::from_str(r#"{"topK": 8}"#).unwrap();
        let merged = current.merged(&absent);
        assert_eq!(merged.top_k, 8);
        assert_eq!(merged.document_ids, Some(vec![doc]));

        let cleared: ConversationSettingsPatch =
            serde_json::from_str(r#"{"documentIds": null}"#).unwrap();
        let merged = current.merged(&cleared);
        assert_eq!(merged.top_k, current.top_k);
        assert!(merged.document_ids.is_none());
    }

    // ====== Message Role Tests ======

    #[test]
    fn test_message_role_strings() {
        assert_eq!(MessageRole::User.to_string(), "user");
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
        assert_eq!(
            MessageRole::try_from("system".to_string()).unwrap(),
            MessageRole::System
        );
        assert!(MessageRole::try_from("tool".to_string()).is_err());
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            r#""assistant""#
        );
    }

    // ====== Serialization Tests ======

    #[test]
    fn test_message_serializes_camel_case_with_sources() {
        let message = Message {
            id: Uuid::nil(),
            conversation_id: Uuid::nil(),
            role: MessageRole::Assistant,
            content: "25 days [1]".to_string(),
            sources: Some(Json(vec![Source {
                chunk_id: Uuid::nil(),
                document_id: Uuid::nil(),
                document_title: "Handbook".to_string(),
                content: "Vacation is 25 days.".to_string(),
                similarity: 0.9,
            }])),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json.get("conversationId").is_some());
        assert_eq!(json["sources"][0]["documentTitle"], "Handbook");
    }

    #[test]
    fn test_source_from_chunk_match() {
        let chunk = ChunkMatch {
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            document_title: "Guide".to_string(),
            content: "text".to_string(),
            similarity: 0.8125,
        };
        let source = Source::from(&chunk);
        assert_eq!(source.chunk_id, chunk.chunk_id);
        assert_eq!(source.document_title, "Guide");
        assert!((source.similarity - 0.8125).abs() < f32::EPSILON);
    }

    #[test]
    fn test_conversation_with_messages_flattens() {
        let conversation = Conversation {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            title: Some("Vacation".to_string()),
            settings: Json(ConversationSettings::default()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(ConversationWithMessages {
            conversation,
            messages: vec![],
        })
        .unwrap();

        assert_eq!(json["title"], "Vacation");
        assert_eq!(json["settings"]["topK"], 5);
        assert!(json["messages"].as_array().unwrap().is_empty());
    }
}
