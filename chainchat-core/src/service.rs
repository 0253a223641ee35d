use async_trait::async_trait;

use crate::error::CoreResult;
use crate::model::{ChatRequest, ChatResponse, QualityMetadata, StepEvent, StepStatus};

/// Seam between the presentation layer and whatever produces answers.
///
/// The observer plus the returned response are the whole surface a
/// front end depends on: `on_step` fires once per progress event, in
/// arrival order, never concurrently with itself.
#[async_trait]
pub trait ChatService: Send + Sync {
    fn name(&self) -> &str;

    async fn send_message(
        &self,
        req: ChatRequest,
        on_step: &mut (dyn FnMut(StepEvent) + Send),
    ) -> CoreResult<ChatResponse>;
}

#[async_trait]
impl ChatService for crate::client::ChatClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn send_message(
        &self,
        req: ChatRequest,
        on_step: &mut (dyn FnMut(StepEvent) + Send),
    ) -> CoreResult<ChatResponse> {
        crate::client::ChatClient::send_message(self, req, |ev| on_step(ev)).await
    }
}

/// A canned responder that never touches the network.
/// Useful for tests or offline smoke runs.
pub struct NullChat;

const NULL_STEPS: &[(&str, &str)] = &[
    ("intent", "Classifying intent"),
    ("generate", "Writing answer"),
];

#[async_trait]
impl ChatService for NullChat {
    fn name(&self) -> &str {
        "null"
    }

    async fn send_message(
        &self,
        req: ChatRequest,
        on_step: &mut (dyn FnMut(StepEvent) + Send),
    ) -> CoreResult<ChatResponse> {
        for (step, label) in NULL_STEPS {
            for status in [StepStatus::Running, StepStatus::Complete] {
                on_step(StepEvent {
                    step: (*step).to_string(),
                    status,
                    label: (*label).to_string(),
                    detail: None,
                });
            }
        }
        Ok(ChatResponse {
            reply: format!("[null service] you said: {}", req.message),
            response_id: "null-0".into(),
            intent: "general".into(),
            entities: vec![],
            quality: QualityMetadata::default(),
            sources: vec![],
        })
    }
}
