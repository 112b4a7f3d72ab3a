//! `web_search`: look up current facts through the Serper search API
//!
//! Knowledge capture and planning may call it to check things the notes
//! mention (a client, a deadline, a competition). Without an API key the
//! tool still registers; calls then fail and the failure is reported back
//! to the model like any other tool error.

use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub const WEB_SEARCH_TOOL: &str = "web_search";

const DEFAULT_API_KEY_ENV: &str = "SERPER_API_KEY";
const DEFAULT_BASE_URL: &str = "https://google.serper.dev";
const DEFAULT_MAX_RESULTS: usize = 10;
const DEFAULT_NUM_RESULTS: usize = 5;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct WebSearchTool {
    client: Option<reqwest::Client>,
    api_key_env: String,
    api_key: Option<String>,
    base_url: String,
    max_results: usize,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self {
            client: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build search payload (pure function)
    fn build_search_payload(query: &str, num_results: usize, max_results: usize) -> Value {
        json!({
            "q": query,
            "num": num_results.min(max_results),
        })
    }

    /// Keep organic hits that carry both a title and a link (pure function)
    fn parse_search_response(search_result: &Value, num_results: usize) -> Vec<Value> {
        search_result
            .get("organic")
            .and_then(Value::as_array)
            .map(|organic| {
                organic
                    .iter()
                    .filter_map(|hit| {
                        let title = hit.get("title").and_then(Value::as_str)?;
                        let link = hit.get("link").and_then(Value::as_str)?;
                        let snippet = hit.get("snippet").and_then(Value::as_str).unwrap_or("");
                        Some(json!({"title": title, "url": link, "snippet": snippet}))
                    })
                    .take(num_results)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn num_results(parameters: &Value) -> usize {
        parameters
            .get("num_results")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_NUM_RESULTS)
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: WEB_SEARCH_TOOL.to_string(),
            description: "Search the web for current information about people, companies, \
                          deadlines or events mentioned in the notes."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "num_results": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 20,
                        "description": "How many results to return (default 5)"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
            output: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "results": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": {"type": "string"},
                                "url": {"type": "string"},
                                "snippet": {"type": "string"}
                            },
                            "required": ["title", "url", "snippet"]
                        }
                    }
                },
                "required": ["query", "results"]
            }),
        }
    }

    /// Accepts `api_key_env`, `base_url` and `max_results`
    async fn initialize(&mut self, config: Option<&Value>) -> Result<(), ToolError> {
        if let Some(config) = config {
            if let Some(env) = config.get("api_key_env").and_then(Value::as_str) {
                self.api_key_env = env.to_string();
            }
            if let Some(url) = config.get("base_url").and_then(Value::as_str) {
                self.base_url = url.trim_end_matches('/').to_string();
            }
            if let Some(max) = config.get("max_results").and_then(Value::as_u64) {
                self.max_results = (max as usize).max(1);
            }
        }

        self.api_key = std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if self.api_key.is_none() {
            warn!(
                env = %self.api_key_env,
                "Search API key not set, web_search calls will fail"
            );
        }

        self.client = Some(
            reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .map_err(|e| ToolError::InitializationError(e.to_string()))?,
        );

        Ok(())
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ToolError::ExecutionError("Tool not initialized".to_string()))?;
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ToolError::ExecutionError(format!(
                "web search is not configured: {} is not set",
                self.api_key_env
            ))
        })?;

        let query = parameters["query"]
            .as_str()
            .ok_or_else(|| ToolError::ExecutionError("Query parameter is required".to_string()))?;
        let num_results = Self::num_results(parameters).min(self.max_results);
        let payload = Self::build_search_payload(query, num_results, self.max_results);

        debug!(query = %query, num_results = num_results, "Web search");

        let response = client
            .post(format!("{}/search", self.base_url))
            .header("X-API-KEY", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ToolError::ExecutionError(format!(
                "Search API error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let search_result: Value = response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Failed to parse response: {e}")))?;

        Ok(json!({
            "query": query,
            "results": Self::parse_search_response(&search_result, num_results)
        }))
    }

    async fn shutdown(&mut self) -> Result<(), ToolError> {
        self.client = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_respects_max_results() {
        let payload = WebSearchTool::build_search_payload("kaggle capstone", 15, 10);
        assert_eq!(payload["q"], "kaggle capstone");
        assert_eq!(payload["num"], 10);
    }

    #[test]
    fn test_parse_skips_hits_without_link() {
        let response = json!({
            "organic": [
                {"title": "Capstone rules", "link": "https://example.com/rules", "snippet": "Due Friday"},
                {"title": "No link"},
                {"title": "Leaderboard", "link": "https://example.com/lb"}
            ]
        });

        let results = WebSearchTool::parse_search_response(&response, 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["url"], "https://example.com/rules");
        assert_eq!(results[1]["snippet"], "");

        assert!(WebSearchTool::parse_search_response(&json!({}), 5).is_empty());
        assert_eq!(WebSearchTool::parse_search_response(&response, 1).len(), 1);
    }

    #[test]
    fn test_num_results_default() {
        assert_eq!(WebSearchTool::num_results(&json!({"query": "x"})), 5);
        assert_eq!(WebSearchTool::num_results(&json!({"num_results": 7})), 7);
    }

    #[tokio::test]
    async fn test_missing_key_fails_at_call_time() {
        let mut tool = WebSearchTool::new();
        tool.initialize(Some(&json!({"api_key_env": "ECC_TEST_SEARCH_KEY_NEVER_SET"})))
            .await
            .unwrap();

        let err = tool.execute(&json!({"query": "anything"})).await.unwrap_err();
        assert!(err.to_string().contains("ECC_TEST_SEARCH_KEY_NEVER_SET"));
    }
}
