//! `log_action_items`: record prioritized tasks for the operator
//!
//! Every item field is optional. Missing values render as placeholders so a
//! sloppy model payload is still logged and counted.

use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub const ACTION_ITEMS_TOOL: &str = "log_action_items";

const OPENING_BANNER: &str = "=== [ECC LOG] Action items recorded ===";
const CLOSING_BANNER_WIDTH: usize = 39;
const MISSING: &str = "?";
const UNTITLED: &str = "(untitled)";

/// Destination for operator-visible output lines
pub trait LineSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Writes lines to standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_line(&self, line: &str) {
        println!("{line}");
    }
}

pub struct ActionItemsTool {
    sink: Arc<dyn LineSink>,
}

impl ActionItemsTool {
    pub fn new(sink: Arc<dyn LineSink>) -> Self {
        Self { sink }
    }

    /// Render one item as a log line (pure function)
    pub fn format_item(item: &Value) -> String {
        format!(
            "- [{}] {} (day={}, area={})",
            field_or(item, "priority", MISSING),
            field_or(item, "title", UNTITLED),
            field_or(item, "day", MISSING),
            field_or(item, "area", MISSING),
        )
    }

    /// All lines for a batch, banners included (pure function)
    pub fn format_lines(items: &[Value]) -> Vec<String> {
        let mut lines = Vec::with_capacity(items.len() + 2);
        lines.push(OPENING_BANNER.to_string());
        lines.extend(items.iter().map(Self::format_item));
        lines.push("=".repeat(CLOSING_BANNER_WIDTH));
        lines
    }
}

/// String fields print bare, other JSON values print as JSON, absent or null
/// fields print the placeholder.
fn field_or(item: &Value, key: &str, placeholder: &str) -> String {
    match item.get(key) {
        None | Some(Value::Null) => placeholder.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => placeholder.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl Tool for ActionItemsTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: ACTION_ITEMS_TOOL.to_string(),
            description: "Record prioritized action items in the operator log. \
                          Each item may carry title, priority, day and area."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "action_items": {
                        "type": "array",
                        "description": "Items with optional title, priority, day and area. \
                                        Any field may be missing or malformed.",
                        "items": {}
                    }
                },
                "required": ["action_items"]
            }),
            output: json!({
                "type": "object",
                "properties": {
                    "status": {"const": "success"},
                    "logged_count": {"type": "integer", "minimum": 0}
                },
                "required": ["status", "logged_count"]
            }),
        }
    }

    async fn initialize(&mut self, _config: Option<&Value>) -> Result<(), ToolError> {
        Ok(())
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let items = parameters["action_items"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default();

        for line in Self::format_lines(items) {
            self.sink.write_line(&line);
        }
        info!(logged_count = items.len(), "Action items recorded");

        Ok(json!({
            "status": "success",
            "logged_count": items.len()
        }))
    }
}
