//! Tool system for pipeline stages
//!
//! Tools are described by explicit descriptors carrying both an input and an
//! output JSON schema. The [`ToolSystem`] validates parameters before a call
//! and the result after it, so a stage never sees a malformed tool payload.

use crate::config::ToolConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub mod builtin;

pub use builtin::{LineSink, StdoutSink};

/// Tool interface
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the call contract: name, description, input and output schema
    fn describe(&self) -> ToolDescription;

    /// Receives the tool's `config` table from the `[tools]` section.
    /// Called once at startup.
    async fn initialize(&mut self, config: Option<&Value>) -> Result<(), ToolError>;

    /// Receives parameters already validated against `describe().parameters`
    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError>;

    async fn shutdown(&mut self) -> Result<(), ToolError> {
        Ok(())
    }
}

/// Tool descriptor handed to the model and used for validation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    /// Input JSON schema
    pub parameters: Value,
    /// Output JSON schema
    pub output: Value,
}

/// Registry and executor for tools
pub struct ToolSystem {
    tools: HashMap<String, Box<dyn Tool>>,
    sink: Arc<dyn LineSink>,
}

impl ToolSystem {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(StdoutSink))
    }

    /// Tool system whose builtins write operator lines to `sink`
    pub fn with_sink(sink: Arc<dyn LineSink>) -> Self {
        Self {
            tools: HashMap::new(),
            sink,
        }
    }

    /// Create and initialize every tool named in the `[tools]` section
    pub async fn initialize(
        &mut self,
        tool_configs: &HashMap<String, ToolConfig>,
    ) -> Result<(), ToolError> {
        for (tool_name, tool_config) in tool_configs {
            let mut tool = self.create_tool(tool_name, tool_config)?;

            let config = match tool_config {
                ToolConfig::Simple(_) => None,
                ToolConfig::Complex { config, .. } => Some(
                    serde_json::to_value(config)
                        .map_err(|e| ToolError::InitializationError(e.to_string()))?,
                ),
            };

            tool.initialize(config.as_ref()).await?;
            info!(tool = %tool_name, "Tool registered");
            self.tools.insert(tool_name.clone(), tool);
        }

        Ok(())
    }

    /// Register an already-initialized tool under its described name
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.describe().name;
        debug!(tool = %name, "Tool registered");
        self.tools.insert(name, tool);
    }

    fn create_tool(&self, tool_name: &str, config: &ToolConfig) -> Result<Box<dyn Tool>, ToolError> {
        let impl_name = match config {
            ToolConfig::Simple(impl_name) => impl_name,
            ToolConfig::Complex { implementation, .. } => implementation,
        };

        match impl_name.as_str() {
            "builtin" => self.create_builtin_tool(tool_name),
            _ => Err(ToolError::UnknownImplementation(impl_name.clone())),
        }
    }

    fn create_builtin_tool(&self, tool_name: &str) -> Result<Box<dyn Tool>, ToolError> {
        match tool_name {
            builtin::OPEN_LOOPS_TOOL => Ok(Box::new(builtin::OpenLoopsTool::new())),
            builtin::ACTION_ITEMS_TOOL => Ok(Box::new(builtin::ActionItemsTool::new(
                self.sink.clone(),
            ))),
            builtin::WEB_SEARCH_TOOL => Ok(Box::new(builtin::WebSearchTool::new())),
            _ => Err(ToolError::UnknownTool(tool_name.to_string())),
        }
    }

    pub fn has_tool(&self, tool_name: &str) -> bool {
        self.tools.contains_key(tool_name)
    }

    pub fn describe_tool(&self, tool_name: &str) -> Option<ToolDescription> {
        self.tools.get(tool_name).map(|tool| tool.describe())
    }

    /// Execute a tool with input and output validation
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;
        let description = tool.describe();

        validate_against(&description.parameters, parameters)
            .map_err(ToolError::ValidationError)?;

        let result = tool.execute(parameters).await?;

        validate_against(&description.output, &result).map_err(ToolError::InvalidOutput)?;
        Ok(result)
    }

    /// Sorted list of registered tool names
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn shutdown(&mut self) -> Result<(), ToolError> {
        for tool in self.tools.values_mut() {
            tool.shutdown().await?;
        }
        Ok(())
    }
}

impl Default for ToolSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate `instance` against `schema`, joining every violation
pub(crate) fn validate_against(schema: &Value, instance: &Value) -> Result<(), String> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| format!("Schema compilation error: {e}"))?;

    validator.validate(instance).map_err(|errors| {
        errors
            .map(|e| format!("At '{}': {}", e.instance_path, e))
            .collect::<Vec<_>>()
            .join("; ")
    })
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Unknown tool implementation: {0}")]
    UnknownImplementation(String),
    #[error("Tool initialization failed: {0}")]
    InitializationError(String),
    #[error("Parameter validation failed: {0}")]
    ValidationError(String),
    #[error("Tool returned a result outside its output schema: {0}")]
    InvalidOutput(String),
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
    #[error("Tool shutdown failed: {0}")]
    ShutdownError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool {
        output_schema: Value,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn describe(&self) -> ToolDescription {
            ToolDescription {
                name: "echo".to_string(),
                description: "Echo the message back".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {"message": {"type": "string"}},
                    "required": ["message"]
                }),
                output: self.output_schema.clone(),
            }
        }

        async fn initialize(&mut self, _config: Option<&Value>) -> Result<(), ToolError> {
            Ok(())
        }

        async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
            Ok(json!({"echo": parameters["message"]}))
        }
    }

    #[tokio::test]
    async fn test_tool_system_creation() {
        let tool_system = ToolSystem::new();
        assert!(tool_system.list_tools().is_empty());
    }

    #[tokio::test]
    async fn test_default_builtins_initialize() {
        let mut tool_system = ToolSystem::new();
        let mut tool_configs = HashMap::new();
        tool_configs.insert(
            "get_open_loops".to_string(),
            ToolConfig::Simple("builtin".to_string()),
        );
        tool_configs.insert(
            "log_action_items".to_string(),
            ToolConfig::Simple("builtin".to_string()),
        );
        tool_configs.insert(
            "web_search".to_string(),
            ToolConfig::Simple("builtin".to_string()),
        );

        tool_system.initialize(&tool_configs).await.unwrap();
        assert_eq!(
            tool_system.list_tools(),
            vec![
                "get_open_loops".to_string(),
                "log_action_items".to_string(),
                "web_search".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_implementation() {
        let mut tool_system = ToolSystem::new();
        let mut tool_configs = HashMap::new();
        tool_configs.insert(
            "get_open_loops".to_string(),
            ToolConfig::Simple("remote".to_string()),
        );

        let result = tool_system.initialize(&tool_configs).await;
        assert!(matches!(result, Err(ToolError::UnknownImplementation(_))));
    }

    #[tokio::test]
    async fn test_unknown_builtin_tool() {
        let mut tool_system = ToolSystem::new();
        let mut tool_configs = HashMap::new();
        tool_configs.insert(
            "google_search".to_string(),
            ToolConfig::Simple("builtin".to_string()),
        );

        let result = tool_system.initialize(&tool_configs).await;
        assert!(matches!(result, Err(ToolError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn test_execute_validates_parameters() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(Box::new(EchoTool {
            output_schema: json!({"type": "object"}),
        }));

        let ok = tool_system
            .execute_tool("echo", &json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(ok, json!({"echo": "hi"}));

        let err = tool_system
            .execute_tool("echo", &json!({"message": 42}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_execute_validates_output() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(Box::new(EchoTool {
            output_schema: json!({
                "type": "object",
                "required": ["status"]
            }),
        }));

        let err = tool_system
            .execute_tool("echo", &json!({"message": "hi"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_tool_execution_unknown_tool() {
        let tool_system = ToolSystem::new();
        let result = tool_system.execute_tool("unknown", &json!({})).await;
        assert!(matches!(result, Err(ToolError::UnknownTool(_))));
    }
}
