use std::time::Duration;

use futures_util::TryStreamExt;

use crate::config::{Config, HttpCfg, StreamCfg};
use crate::dispatch::collect_response;
use crate::error::{ChainChatError, CoreResult};
use crate::frame::FrameStream;
use crate::model::{ChatRequest, ChatResponse, FeedbackRequest, HealthStatus, StepEvent};
use crate::normalizer::normalize_request;

/// Thin wrapper around reqwest::Client with defaults and helpers.
///
/// One call to [`ChatClient::send_message`] owns one request/response
/// cycle end to end; the response reader is dropped (and the connection
/// released) when the call returns, errors or is cancelled.
#[derive(Debug, Clone)]
pub struct ChatClient {
    inner: reqwest::Client,
    base: String,
    user_agent: String,
    max_frame_bytes: usize,
}

impl ChatClient {
    pub fn new(base: impl Into<String>) -> CoreResult<Self> {
        Self::with_config(base, &HttpCfg::default(), &StreamCfg::default())
    }

    pub fn with_config(
        base: impl Into<String>,
        http: &HttpCfg,
        stream: &StreamCfg,
    ) -> CoreResult<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(http.connect_timeout_ms))
            .timeout(Duration::from_millis(http.request_timeout_ms));
        if let Some(cap) = http.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(cap);
        }
        let inner = builder
            .build()
            .map_err(|e| ChainChatError::Other(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self {
            inner,
            base: base.into().trim_end_matches('/').to_string(),
            user_agent: "chainchat/0.1".to_string(),
            max_frame_bytes: stream.max_frame_bytes,
        })
    }

    pub fn from_config(cfg: &Config) -> CoreResult<Self> {
        Self::with_config(cfg.endpoint.base_url.clone(), &cfg.http, &cfg.stream)
    }

    /// Sends one message and drives the response stream to completion.
    ///
    /// `on_step` fires once per `step` frame, in arrival order, before the
    /// next frame is read. Returns the final answer, or the first terminal
    /// error; nothing is retried here.
    pub async fn send_message<F>(&self, req: ChatRequest, mut on_step: F) -> CoreResult<ChatResponse>
    where
        F: FnMut(StepEvent),
    {
        let req = normalize_request(req);
        if req.message.is_empty() {
            return Err(ChainChatError::Validation("message must not be empty".into()));
        }

        let url = format!("{}/chat", self.base);
        let resp = self
            .inner
            .post(&url)
            .json(&req)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| ChainChatError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChainChatError::Status {
                status: status.as_u16(),
                message: truncate(&body, 300),
            });
        }
        tracing::debug!(session = %req.session_id, "chat stream opened");

        let bytes = resp
            .bytes_stream()
            .map_err(|e| ChainChatError::Transport(e.to_string()));
        let frames =
            FrameStream::new(Box::pin(bytes)).with_max_frame_bytes(self.max_frame_bytes);
        collect_response(frames, &mut on_step).await
    }

    /// Records thumbs-up / thumbs-down feedback against a response id.
    pub async fn send_feedback(&self, feedback: &FeedbackRequest) -> CoreResult<()> {
        let url = format!("{}/feedback", self.base);
        let resp = self
            .inner
            .post(&url)
            .json(feedback)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| ChainChatError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChainChatError::Status {
                status: status.as_u16(),
                message: truncate(&body, 300),
            });
        }
        Ok(())
    }

    /// Asks the service whether it is up and ready.
    pub async fn health(&self) -> CoreResult<HealthStatus> {
        let url = format!("{}/health", self.base);
        let resp = self
            .inner
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| ChainChatError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChainChatError::Status {
                status: status.as_u16(),
                message: truncate(&body, 300),
            });
        }
        resp.json::<HealthStatus>()
            .await
            .map_err(|e| ChainChatError::Other(anyhow::anyhow!("health decode error: {e}")))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut t = s[..end].to_string();
    t.push_str("...");
    t
}
