//! `get_open_loops`: current open commitments
//!
//! Returns a fixed list unless the tool config supplies `open_loops = [...]`.
//! Either way the call contract stays `{status, open_loops}`.

use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const OPEN_LOOPS_TOOL: &str = "get_open_loops";

/// One open commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLoop {
    pub id: String,
    pub description: String,
    pub area: String,
    pub deadline: String,
}

impl OpenLoop {
    fn new(id: &str, description: &str, area: &str, deadline: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            area: area.to_string(),
            deadline: deadline.to_string(),
        }
    }
}

fn default_open_loops() -> Vec<OpenLoop> {
    vec![
        OpenLoop::new(
            "OL-001",
            "Finalize ECC capstone repo + Kaggle writeup",
            "ECC Product",
            "this_week",
        ),
        OpenLoop::new(
            "OL-002",
            "Design 3-tier AI consulting offer with pricing",
            "Consulting Business",
            "this_month",
        ),
        OpenLoop::new(
            "OL-003",
            "Stabilize daily deep work + training block",
            "Discipline / Personal OS",
            "this_week",
        ),
    ]
}

pub struct OpenLoopsTool {
    open_loops: Vec<OpenLoop>,
}

impl Default for OpenLoopsTool {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenLoopsTool {
    pub fn new() -> Self {
        Self {
            open_loops: default_open_loops(),
        }
    }

    pub fn open_loops(&self) -> &[OpenLoop] {
        &self.open_loops
    }

    /// Format the tool response (pure function)
    fn format_response(open_loops: &[OpenLoop]) -> Result<Value, ToolError> {
        let loops =
            serde_json::to_value(open_loops).map_err(|e| ToolError::ExecutionError(e.to_string()))?;
        Ok(json!({
            "status": "success",
            "open_loops": loops
        }))
    }
}

#[async_trait]
impl Tool for OpenLoopsTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: OPEN_LOOPS_TOOL.to_string(),
            description: "Return the user's current open loops: commitments already made \
                          and not yet closed, each with an id, description, area and deadline."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
            output: json!({
                "type": "object",
                "properties": {
                    "status": {"const": "success"},
                    "open_loops": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": {"type": "string"},
                                "description": {"type": "string"},
                                "area": {"type": "string"},
                                "deadline": {"type": "string"}
                            },
                            "required": ["id", "description", "area", "deadline"]
                        }
                    }
                },
                "required": ["status", "open_loops"]
            }),
        }
    }

    async fn initialize(&mut self, config: Option<&Value>) -> Result<(), ToolError> {
        if let Some(loops) = config.and_then(|c| c.get("open_loops")) {
            self.open_loops = serde_json::from_value(loops.clone()).map_err(|e| {
                ToolError::InitializationError(format!("invalid open_loops table: {e}"))
            })?;
        }
        Ok(())
    }

    async fn execute(&self, _parameters: &Value) -> Result<Value, ToolError> {
        Self::format_response(&self.open_loops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_fixed_records() {
        let tool = OpenLoopsTool::new();
        let result = tool.execute(&json!({})).await.unwrap();

        assert_eq!(result["status"], "success");
        let loops = result["open_loops"].as_array().unwrap();
        assert_eq!(loops.len(), 3);
        assert_eq!(loops[0]["id"], "OL-001");
        assert_eq!(loops[1]["deadline"], "this_month");
        assert_eq!(loops[2]["area"], "Discipline / Personal OS");
    }

    #[tokio::test]
    async fn test_is_deterministic() {
        let tool = OpenLoopsTool::new();
        let first = tool.execute(&json!({})).await.unwrap();
        let second = tool.execute(&json!({})).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_config_replaces_records() {
        let mut tool = OpenLoopsTool::new();
        let config = json!({
            "open_loops": [
                {"id": "X-1", "description": "Ship it", "area": "ECC Product", "deadline": "today"}
            ]
        });
        tool.initialize(Some(&config)).await.unwrap();

        let result = tool.execute(&json!({})).await.unwrap();
        assert_eq!(result["open_loops"].as_array().unwrap().len(), 1);
        assert_eq!(result["open_loops"][0]["id"], "X-1");
    }

    #[tokio::test]
    async fn test_config_rejects_malformed_records() {
        let mut tool = OpenLoopsTool::new();
        let config = json!({"open_loops": [{"id": "X-1"}]});
        assert!(matches!(
            tool.initialize(Some(&config)).await,
            Err(ToolError::InitializationError(_))
        ));
    }

    #[test]
    fn test_output_matches_declared_schema() {
        let tool = OpenLoopsTool::new();
        let response = OpenLoopsTool::format_response(tool.open_loops()).unwrap();
        let validator = jsonschema::validator_for(&tool.describe().output).unwrap();
        assert!(validator.is_valid(&response));
    }
}
