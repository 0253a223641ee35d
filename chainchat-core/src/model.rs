use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// JSON body posted to `/chat`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Running,
    Complete,
}

/// One pipeline-stage notification. The same `step` key normally arrives
/// twice, first `running` then `complete`; the latest event per key is the
/// authoritative one.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StepEvent {
    pub step: String,
    pub status: StepStatus,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QualityMetadata {
    pub relevance: f64,
    pub faithfulness: f64,
    pub passed: bool,
}

// The service treats quality as advisory and omits it for trivial intents.
impl Default for QualityMetadata {
    fn default() -> Self {
        Self {
            relevance: 0.0,
            faithfulness: 0.0,
            passed: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Source {
    #[serde(default)]
    pub title: String,
    pub url: String,
}

/// The single terminal answer for one request. Only `reply` is mandatory
/// on the wire; the service fills the rest with defaults for intents that
/// skip parts of the pipeline.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatResponse {
    pub reply: String,
    /// Opaque id, echoed back when submitting feedback.
    #[serde(default)]
    pub response_id: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub quality: QualityMetadata,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Positive,
    Negative,
}

/// JSON body posted to `/feedback`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FeedbackRequest {
    pub response_id: String,
    pub kind: FeedbackKind,
}

/// Answer from the `/health` probe. Extra fields the service adds are ignored.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_event_decodes_wire_shape() {
        let json = r#"{"step":"intent","status":"running","label":"Classifying"}"#;
        let ev: StepEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.step, "intent");
        assert_eq!(ev.status, StepStatus::Running);
        assert_eq!(ev.label, "Classifying");
        assert!(ev.detail.is_none());
    }

    #[test]
    fn step_event_keeps_detail_map() {
        let json = r#"{"step":"retrieval","status":"complete","label":"Found docs","detail":{"count":3}}"#;
        let ev: StepEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.status, StepStatus::Complete);
        let detail = ev.detail.unwrap();
        assert_eq!(detail.get("count"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn step_event_rejects_unknown_status() {
        let json = r#"{"step":"intent","status":"paused","label":"x"}"#;
        assert!(serde_json::from_str::<StepEvent>(json).is_err());
    }

    #[test]
    fn chat_response_decodes_full_wire_shape() {
        let json = r#"{"reply":"Hi","response_id":"r1","intent":"greeting","entities":[],
            "quality":{"relevance":0.9,"faithfulness":0.9,"passed":true},
            "sources":[{"title":"Docs","url":"https://example.com/docs"}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.reply, "Hi");
        assert_eq!(resp.response_id, "r1");
        assert_eq!(resp.intent, "greeting");
        assert_eq!(resp.quality.relevance, 0.9);
        assert!(resp.quality.passed);
        assert_eq!(resp.sources[0].title, "Docs");
    }

    #[test]
    fn chat_response_defaults_everything_but_reply() {
        let resp: ChatResponse = serde_json::from_str(r#"{"reply":"Hi"}"#).unwrap();
        assert_eq!(resp.response_id, "");
        assert_eq!(resp.intent, "");
        assert!(resp.entities.is_empty());
        assert!(resp.sources.is_empty());
        assert_eq!(resp.quality.relevance, 0.0);
        assert!(resp.quality.passed);

        assert!(serde_json::from_str::<ChatResponse>("{}").is_err());
    }

    #[test]
    fn chat_request_serializes_snake_case_fields() {
        let req = ChatRequest {
            message: "hello".into(),
            session_id: "s-1".into(),
            conversation_history: vec![ChatMessage {
                role: Role::Assistant,
                content: "hi".into(),
            }],
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"session_id\":\"s-1\""));
        assert!(json.contains("\"conversation_history\""));
        assert!(json.contains("\"role\":\"assistant\""));
    }

    #[test]
    fn feedback_kind_serializes_lowercase() {
        let fb = FeedbackRequest {
            response_id: "r1".into(),
            kind: FeedbackKind::Positive,
        };
        let json = serde_json::to_string(&fb).unwrap();
        assert!(json.contains("\"kind\":\"positive\""));
    }

    #[test]
    fn health_ignores_extra_fields() {
        let h: HealthStatus =
            serde_json::from_str(r#"{"status":"ok","pipeline_ready":true}"#).unwrap();
        assert_eq!(h.status, "ok");
    }
}
