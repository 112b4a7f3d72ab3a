//! Top-level error type
//!
//! Each layer has its own `thiserror` enum; [`EccError`] gathers them for the
//! binary and for callers that drive the whole workflow.

use crate::agent::output::OutputError;
use crate::agent::stage::StageError;
use crate::config::ConfigError;
use crate::goals::GoalError;
use crate::llm::LlmError;
use crate::pipeline::PipelineError;
use crate::tools::ToolError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const MAX_USER_MESSAGE_LEN: usize = 500;
const TRUNCATE_SUFFIX: &str = "...[truncated]";

#[derive(Debug, Error)]
pub enum EccError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Goal registry error: {0}")]
    Goals(#[from] GoalError),

    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Input error: {0}")]
    Input(#[from] std::io::Error),
}

impl EccError {
    /// Error text safe to show on a terminal
    pub fn user_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

pub type EccResult<T> = Result<T, EccError>;

static SECRET_PAIR: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").ok());

static SECRET_PATH: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+").ok()
});

/// Redact secret-looking pairs and credential paths, cap the length
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = message.to_string();

    if let Some(re) = SECRET_PAIR.as_ref() {
        sanitized = re.replace_all(&sanitized, "${1}=***").to_string();
    }
    if let Some(re) = SECRET_PATH.as_ref() {
        sanitized = re.replace_all(&sanitized, "/***REDACTED***/").to_string();
    }

    if sanitized.len() > MAX_USER_MESSAGE_LEN {
        let budget = MAX_USER_MESSAGE_LEN - TRUNCATE_SUFFIX.len();
        let cut = sanitized
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= budget)
            .last()
            .unwrap_or(0);
        sanitized = format!("{}{}", &sanitized[..cut], TRUNCATE_SUFFIX);
    }

    sanitized
}
