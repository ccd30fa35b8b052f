//! Unit tests for message and insight payloads.

use super::*;

#[cfg(test)]
mod message_payload_tests {
    use super::*;

    #[test]
    fn empty_object_is_a_valid_alert() {
        let payload = MessagePayload::parse(MessageType::Alert, "{}").expect("valid");
        assert_eq!(payload, MessagePayload::Alert(AlertData::default()));
    }

    #[test]
    fn empty_data_is_rejected() {
        let err = MessagePayload::parse(MessageType::Alert, "  ").expect_err("should fail");
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn capture_requires_content_and_project() {
        let err = MessagePayload::parse(MessageType::Capture, r#"{"project":"demo"}"#)
            .expect_err("should fail");
        assert!(err.is_validation());
        assert!(err.to_string().contains("invalid capture payload"));
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = MessagePayload::parse(MessageType::ProjectActivity, "{not json").expect_err("should fail");
        assert!(err.is_validation());
    }

    #[test]
    fn flashcard_request_defaults_difficulty() {
        let payload =
            MessagePayload::parse(MessageType::FlashcardRequest, r#"{"project":"demo"}"#).expect("valid");
        let MessagePayload::FlashcardRequest(data) = payload else {
            panic!("expected flashcard request");
        };
        assert_eq!(data.difficulty, 1);
        assert!(data.source_capture_ids.is_empty());
    }

    #[test]
    fn to_json_omits_absent_optionals() {
        let payload = MessagePayload::ContextUpdate(ContextUpdateData {
            project: "demo".to_string(),
            context_data: "ctx".to_string(),
            session_info: "info".to_string(),
            keywords: "kw".to_string(),
            git_branch: None,
            git_commit: None,
        });
        let json = payload.to_json().expect("serialize");
        assert!(!json.contains("git_branch"));
        assert_eq!(payload.message_type(), MessageType::ContextUpdate);
        assert_eq!(
            MessagePayload::parse(MessageType::ContextUpdate, &json).expect("valid"),
            payload
        );
    }

    #[test]
    fn insight_notice_requires_known_insight_type() {
        let err = MessagePayload::parse(
            MessageType::Insight,
            r#"{"insight_type":"horoscope","summary":"x"}"#,
        )
        .expect_err("should fail");
        assert!(err.is_validation());
    }
}

#[cfg(test)]
mod insight_payload_tests {
    use super::*;

    #[test]
    fn parses_project_connection() {
        let payload = InsightPayload::parse(
            InsightType::ProjectConnection,
            r#"{"related_projects":["a","b"],"reason":"shared deps"}"#,
        )
        .expect("valid");
        assert_eq!(payload.insight_type(), InsightType::ProjectConnection);
    }

    #[test]
    fn rejects_wrong_shape() {
        let err =
            InsightPayload::parse(InsightType::StudyRecommendation, r#"{"summary":"x"}"#).expect_err("should fail");
        assert!(err.to_string().contains("invalid study_recommendation payload"));
    }
}
