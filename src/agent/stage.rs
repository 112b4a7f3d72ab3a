//! Single pipeline stage: one model persona with a fixed instruction, an
//! optional tool set, declared input keys and an output contract.

use crate::agent::output::{missing_briefing_sections, OutputContract, OutputError, StageValue};
use crate::llm::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider, Message, RetryPolicy, ToolCall,
};
use crate::pipeline::events::{emit, EventSender, PipelineEvent};
use crate::stage_span;
use crate::tool_span;
use crate::tools::{ToolDescription, ToolSystem};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

/// Declarative description of a stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    pub name: String,
    pub description: String,
    pub instruction: String,
    /// Tool names this stage may call
    pub tools: Vec<String>,
    /// Session keys this stage reads, rendered into its prompt
    pub input_keys: Vec<String>,
    /// Session key the validated output is stored under
    pub output_key: Option<String>,
    pub contract: OutputContract,
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("Stage '{stage}' inference failed: {source}")]
    Llm {
        stage: String,
        #[source]
        source: LlmError,
    },
    #[error("Stage '{stage}' produced invalid output: {source}")]
    Output {
        stage: String,
        #[source]
        source: OutputError,
    },
    #[error("Stage '{stage}' exceeded {max} tool iterations")]
    ToolLoopExceeded { stage: String, max: usize },
    #[error("Stage '{stage}' needs session key '{key}' which is not present")]
    MissingInput { stage: String, key: String },
}

/// Runtime stage bound to a provider
pub struct Stage {
    spec: StageSpec,
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    retry: RetryPolicy,
    max_tool_iterations: usize,
}

pub(crate) struct StageSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub retry: RetryPolicy,
    pub max_tool_iterations: usize,
}

impl Stage {
    pub(crate) fn new(
        spec: StageSpec,
        provider: Arc<dyn LlmProvider>,
        settings: StageSettings,
    ) -> Self {
        Self {
            spec,
            provider,
            model: settings.model,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            retry: settings.retry,
            max_tool_iterations: settings.max_tool_iterations,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &StageSpec {
        &self.spec
    }

    pub fn output_key(&self) -> Option<&str> {
        self.spec.output_key.as_deref()
    }

    /// Run the stage against the current session state
    pub async fn run(
        &self,
        user_message: &str,
        state: &BTreeMap<String, StageValue>,
        tools: &ToolSystem,
        events: Option<&EventSender>,
    ) -> Result<StageValue, StageError> {
        let span = stage_span!(
            stage = %self.spec.name,
            output_key = self.spec.output_key.as_deref().unwrap_or("-"),
            model = %self.model
        );

        async {
            let mut messages = vec![
                Message::system(self.system_prompt()),
                Message::user(self.user_prompt(user_message, state)?),
            ];
            let tool_descriptions = self.tool_descriptions(tools);
            // Text sent alongside tool calls, newest last
            let mut earlier_texts: Vec<String> = Vec::new();

            let mut iteration = 0;
            loop {
                iteration += 1;
                if iteration > self.max_tool_iterations {
                    return Err(StageError::ToolLoopExceeded {
                        stage: self.spec.name.clone(),
                        max: self.max_tool_iterations,
                    });
                }

                let request = self.build_request(messages.clone(), &tool_descriptions);
                let response = self.complete(request).await?;

                emit(
                    events,
                    PipelineEvent::ModelResponse {
                        stage: self.spec.name.clone(),
                        text: response.content.clone(),
                    },
                );

                if let Some(calls) = response.tool_calls.as_ref().filter(|c| !c.is_empty()) {
                    debug!(
                        iteration = iteration,
                        tool_count = calls.len(),
                        "Processing tool calls"
                    );
                    if let Some(text) = response.content.as_ref().filter(|t| !t.trim().is_empty()) {
                        earlier_texts.push(text.clone());
                    }
                    Self::add_assistant_turn(&mut messages, &response);
                    let results = self.execute_tool_calls(calls, tools, events).await;
                    Self::add_tool_results(&mut messages, &results);
                    continue;
                }

                let text = response.content.unwrap_or_default();
                let value = self.parse_output(&text, &earlier_texts)?;

                if self.spec.contract == OutputContract::Briefing && !text.trim().is_empty() {
                    for section in missing_briefing_sections(&text) {
                        warn!(section = section, "Briefing is missing a section");
                    }
                }

                info!(iterations = iteration, "Stage completed");
                return Ok(value);
            }
        }
        .instrument(span)
        .await
    }

    /// Parse the final reply. A structured stage that answered before its
    /// last tool call may end with a bare acknowledgement, so earlier replies
    /// are tried newest first when the final one has no valid payload.
    fn parse_output(&self, text: &str, earlier_texts: &[String]) -> Result<StageValue, StageError> {
        let contract = self.spec.contract;
        match contract.parse(text) {
            Ok(value) => Ok(value),
            Err(source) => {
                if contract.is_structured() {
                    if let Some(value) = earlier_texts
                        .iter()
                        .rev()
                        .find_map(|earlier| contract.parse(earlier).ok())
                    {
                        debug!("Using structured output sent before the final tool call");
                        return Ok(value);
                    }
                }
                warn!(error = %source, "Stage output rejected");
                Err(StageError::Output {
                    stage: self.spec.name.clone(),
                    source,
                })
            }
        }
    }

    fn system_prompt(&self) -> String {
        let today = chrono::Local::now().format("%A, %Y-%m-%d");
        format!("{}\n\nToday is {today}.", self.spec.instruction)
    }

    /// Original user text followed by every declared input as a labelled
    /// JSON block
    fn user_prompt(
        &self,
        user_message: &str,
        state: &BTreeMap<String, StageValue>,
    ) -> Result<String, StageError> {
        let mut prompt = user_message.to_string();

        for key in &self.spec.input_keys {
            let value = state.get(key).ok_or_else(|| StageError::MissingInput {
                stage: self.spec.name.clone(),
                key: key.clone(),
            })?;
            let rendered = match value {
                StageValue::Briefing(text) => text.clone(),
                other => serde_json::to_string_pretty(&other.to_json())
                    .unwrap_or_else(|_| other.to_json().to_string()),
            };
            prompt.push_str(&format!("\n\n{key}:\n```json\n{rendered}\n```"));
        }

        Ok(prompt)
    }

    fn tool_descriptions(&self, tools: &ToolSystem) -> Vec<ToolDescription> {
        self.spec
            .tools
            .iter()
            .filter_map(|name| tools.describe_tool(name))
            .collect()
    }

    fn build_request(
        &self,
        messages: Vec<Message>,
        tool_descriptions: &[ToolDescription],
    ) -> CompletionRequest {
        let mut metadata = HashMap::new();
        metadata.insert("stage".to_string(), self.spec.name.clone());

        CompletionRequest {
            messages,
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tools: (!tool_descriptions.is_empty()).then(|| tool_descriptions.to_vec()),
            metadata,
        }
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, StageError> {
        let provider = &self.provider;
        self.retry
            .run(&self.spec.name, |attempt| {
                let request = request.clone();
                debug!(attempt = attempt, provider = provider.name(), "Inference call");
                async move { provider.complete(request).await }
            })
            .await
            .map_err(|source| StageError::Llm {
                stage: self.spec.name.clone(),
                source,
            })
    }

    async fn execute_tool_calls(
        &self,
        calls: &[ToolCall],
        tools: &ToolSystem,
        events: Option<&EventSender>,
    ) -> Vec<String> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.execute_single_tool_call(call, tools, events).await);
        }
        results
    }

    async fn execute_single_tool_call(
        &self,
        call: &ToolCall,
        tools: &ToolSystem,
        events: Option<&EventSender>,
    ) -> String {
        let span = tool_span!(tool = %call.name, call_id = %call.id);

        async {
            emit(
                events,
                PipelineEvent::ToolCall {
                    stage: self.spec.name.clone(),
                    tool: call.name.clone(),
                    arguments: call.arguments.clone(),
                },
            );

            let outcome = if let Some(e) = &call.argument_error {
                Err(format!("arguments are not valid JSON: {e}"))
            } else if self.spec.tools.iter().any(|t| t == &call.name) {
                tools
                    .execute_tool(&call.name, &call.arguments)
                    .await
                    .map_err(|e| e.to_string())
            } else {
                Err(format!("tool '{}' is not available to this stage", call.name))
            };

            let (success, result, line) = match outcome {
                Ok(result) => {
                    debug!("Tool succeeded");
                    let line = format!("Tool {} returned: {}", call.name, result);
                    (true, result, line)
                }
                Err(e) => {
                    warn!(error = %e, "Tool failed");
                    let line = format!("Tool {} failed: {}", call.name, e);
                    (false, json!({ "error": e }), line)
                }
            };

            emit(
                events,
                PipelineEvent::ToolResult {
                    stage: self.spec.name.clone(),
                    tool: call.name.clone(),
                    success,
                    result,
                },
            );
            line
        }
        .instrument(span)
        .await
    }

    /// Keep the turn structure intact when the model only called tools
    fn add_assistant_turn(messages: &mut Vec<Message>, response: &CompletionResponse) {
        let content = match &response.content {
            Some(text) if !text.trim().is_empty() => text.clone(),
            _ => {
                let calls: Vec<String> = response
                    .tool_calls
                    .iter()
                    .flatten()
                    .map(|c| format!("{}({})", c.name, c.arguments))
                    .collect();
                format!("Calling tools: {}", calls.join(", "))
            }
        };
        messages.push(Message::assistant(content));
    }

    fn add_tool_results(messages: &mut Vec<Message>, results: &[String]) {
        if !results.is_empty() {
            messages.push(Message::user(format!(
                "Tool results:\n{}",
                results.join("\n")
            )));
        }
    }
}
