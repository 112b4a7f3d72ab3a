//! Mock implementations for testing
//!
//! A scripted [`MockLlmProvider`] and an in-memory [`MemorySink`] so the
//! whole pipeline can run without network access.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
    ToolCall,
};
use crate::tools::LineSink;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One scripted provider turn
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Tool calls with optional accompanying text
    ToolCalls {
        text: Option<String>,
        calls: Vec<ToolCall>,
    },
    Failure(LlmError),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    /// A single tool call with no accompanying text
    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        MockReply::ToolCalls {
            text: None,
            calls: vec![ToolCall::new("call_0", name, arguments)],
        }
    }

    pub fn http_status(status: u16) -> Self {
        MockReply::Failure(LlmError::HttpStatus {
            status,
            message: format!("mock status {status}"),
        })
    }
}

/// Mock LLM provider replaying a script. Replies cycle when the script runs
/// out.
#[derive(Debug, Clone)]
pub struct MockLlmProvider {
    pub replies: Vec<MockReply>,
    pub current_response: Arc<Mutex<usize>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    pub should_fail: bool,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self::from_replies(responses.into_iter().map(MockReply::Text).collect())
    }

    pub fn from_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            current_response: Arc::new(Mutex::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Self::from_replies(vec![])
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Provider scripted with a full, valid run of the weekly workflow
    pub fn demo() -> Self {
        Self::from_replies(crate::testing::demo::demo_replies())
    }

    /// Requests received so far
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        *self.current_response.lock().await
    }

    fn response(content: Option<String>, tool_calls: Option<Vec<ToolCall>>) -> CompletionResponse {
        CompletionResponse {
            content,
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: FinishReason::Stop,
            tool_calls,
            metadata: HashMap::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        self.requests.lock().await.push(request);

        let mut current = self.current_response.lock().await;
        let index = *current % self.replies.len().max(1);
        *current += 1;

        match self.replies.get(index) {
            None => Ok(Self::response(Some("Mock response".to_string()), None)),
            Some(MockReply::Text(text)) => Ok(Self::response(Some(text.clone()), None)),
            Some(MockReply::ToolCalls { text, calls }) => {
                Ok(Self::response(text.clone(), Some(calls.clone())))
            }
            Some(MockReply::Failure(error)) => Err(error.clone()),
        }
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::RequestFailed(
                "Mock health check failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Line sink that keeps everything in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<std::sync::Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
