//! Events emitted while a pipeline runs

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

/// Channel the orchestrator publishes events on
pub type EventSender = mpsc::UnboundedSender<PipelineEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<PipelineEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted {
        stage: String,
        index: usize,
    },
    /// One model round-trip. `text` is `None` for tool-call-only turns.
    ModelResponse {
        stage: String,
        text: Option<String>,
    },
    ToolCall {
        stage: String,
        tool: String,
        arguments: Value,
    },
    ToolResult {
        stage: String,
        tool: String,
        success: bool,
        result: Value,
    },
    StageCompleted {
        stage: String,
        output_key: Option<String>,
    },
}

impl PipelineEvent {
    pub fn stage(&self) -> &str {
        match self {
            PipelineEvent::StageStarted { stage, .. }
            | PipelineEvent::ModelResponse { stage, .. }
            | PipelineEvent::ToolCall { stage, .. }
            | PipelineEvent::ToolResult { stage, .. }
            | PipelineEvent::StageCompleted { stage, .. } => stage,
        }
    }

    /// Model text carried by this event, blank text included. `None` for
    /// tool-call-only turns and every other event kind.
    pub fn text(&self) -> Option<&str> {
        match self {
            PipelineEvent::ModelResponse {
                text: Some(text), ..
            } => Some(text),
            _ => None,
        }
    }
}

/// Send without caring whether anyone is listening
pub(crate) fn emit(sender: Option<&EventSender>, event: PipelineEvent) {
    if let Some(tx) = sender {
        let _ = tx.send(event);
    }
}
