//! Routes reassembled frames to their consumers.
//!
//! Contract:
//! - `step` payloads reach the observer synchronously, in arrival order,
//!   before the next frame is read.
//! - Exactly one result is returned per call, or the call fails; a second
//!   `result` frame overwrites the first (last-wins, logged).
//! - A payload that does not decode aborts the remaining stream; an
//!   unrecognized frame label does not.

use futures_util::StreamExt;
use serde::de::DeserializeOwned;

use crate::error::{ChainChatError, CoreResult};
use crate::frame::Frame;
use crate::model::{ChatResponse, StepEvent};

/// Frame label for pipeline progress notifications.
pub const STEP_EVENT: &str = "step";
/// Frame label carrying the terminal structured answer.
pub const RESULT_EVENT: &str = "result";

/// Drains `frames`, forwarding each decoded step to `on_step` and
/// capturing the result frame. Fails with [`ChainChatError::Incomplete`]
/// when the stream ends without one.
pub async fn collect_response<S, F>(mut frames: S, on_step: &mut F) -> CoreResult<ChatResponse>
where
    S: futures_util::Stream<Item = CoreResult<Frame>> + Unpin,
    F: FnMut(StepEvent) + ?Sized,
{
    let mut result: Option<ChatResponse> = None;
    while let Some(frame) = frames.next().await {
        let frame = frame?;
        match frame.event.as_str() {
            STEP_EVENT => on_step(decode_payload::<StepEvent>(&frame)?),
            RESULT_EVENT => {
                if result.is_some() {
                    tracing::warn!("duplicate result frame, keeping the newer one");
                }
                result = Some(decode_payload(&frame)?);
            }
            other => tracing::debug!(event = other, "skipping unrecognized frame"),
        }
    }
    result.ok_or(ChainChatError::Incomplete)
}

fn decode_payload<T: DeserializeOwned>(frame: &Frame) -> CoreResult<T> {
    serde_json::from_str(&frame.data).map_err(|e| ChainChatError::Decode {
        event: frame.event.clone(),
        source: e,
    })
}
