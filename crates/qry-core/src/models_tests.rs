//! Unit tests for domain models.

use super::*;

#[cfg(test)]
mod tool_name_tests {
    use super::*;

    #[test]
    fn parses_every_known_tool() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().expect("parse"), *tool);
        }
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(ToolName::QryAi.to_string(), "qryai");
        assert_eq!(ToolName::Wherewasi.to_string(), "wherewasi");
    }

    #[test]
    fn rejects_unknown_tool() {
        let err = "slack".parse::<ToolName>().expect_err("should fail");
        assert!(err.is_validation());
        let msg = err.to_string();
        assert!(msg.contains("unknown tool name: slack"));
        assert!(msg.contains("uroboro"));
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("Wherewasi".parse::<ToolName>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ToolName::QryAi).expect("serialize");
        assert_eq!(json, "\"qryai\"");
    }
}

#[cfg(test)]
mod message_type_tests {
    use super::*;

    #[test]
    fn vocabulary_has_eight_types() {
        assert_eq!(MessageType::ALL.len(), 8);
    }

    #[test]
    fn parses_snake_case_names() {
        assert_eq!(
            "context_update".parse::<MessageType>().expect("parse"),
            MessageType::ContextUpdate
        );
        assert_eq!(
            "pomodoro_complete".parse::<MessageType>().expect("parse"),
            MessageType::PomodoroComplete
        );
    }

    #[test]
    fn rejects_unknown_type() {
        let err = "shout".parse::<MessageType>().expect_err("should fail");
        assert!(err.to_string().contains("unknown message type: shout"));
    }
}

#[cfg(test)]
mod insight_type_tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for kind in InsightType::ALL {
            assert_eq!(kind.to_string().parse::<InsightType>().expect("parse"), *kind);
        }
    }

    #[test]
    fn rejects_unknown_type() {
        assert!("vibes".parse::<InsightType>().expect_err("should fail").is_validation());
    }
}

#[cfg(test)]
mod tool_message_tests {
    use super::*;
    use crate::payload::MessagePayload;

    fn message(message_type: &str, data: &str) -> ToolMessage {
        ToolMessage {
            id: 1,
            from_tool: "uroboro".to_string(),
            to_tool: "wherewasi".to_string(),
            message_type: message_type.to_string(),
            data: data.to_string(),
            processed: false,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    #[test]
    fn payload_decodes_by_type_tag() {
        let msg = message("alert", r#"{"message":"disk almost full"}"#);
        let MessagePayload::Alert(alert) = msg.payload().expect("payload") else {
            panic!("expected alert payload");
        };
        assert_eq!(alert.message.as_deref(), Some("disk almost full"));
    }

    #[test]
    fn payload_with_unknown_type_is_rejected() {
        let msg = message("telepathy", "{}");
        assert!(msg.payload().expect_err("should fail").is_validation());
    }
}
