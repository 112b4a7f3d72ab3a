//! Tool system integration tests
//!
//! Registration from config, schema validation around execution, and the
//! observable behavior of the builtins.

use ecc_pipeline::config::{EccConfig, ToolConfig};
use ecc_pipeline::testing::MemorySink;
use ecc_pipeline::tools::{ToolError, ToolSystem};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn system_with(configs: HashMap<String, ToolConfig>) -> (ToolSystem, MemorySink) {
    let sink = MemorySink::new();
    let mut system = ToolSystem::with_sink(Arc::new(sink.clone()));
    system.initialize(&configs).await.unwrap();
    (system, sink)
}

async fn default_system() -> (ToolSystem, MemorySink) {
    system_with(EccConfig::default().tools).await
}

#[tokio::test]
async fn test_default_config_registers_all_builtins() {
    let (system, _sink) = default_system().await;
    assert_eq!(
        system.list_tools(),
        vec![
            "get_open_loops".to_string(),
            "log_action_items".to_string(),
            "web_search".to_string()
        ]
    );
}

#[tokio::test]
async fn test_open_loops_returns_fixed_records() {
    let (system, _sink) = default_system().await;

    let result = system
        .execute_tool("get_open_loops", &json!({}))
        .await
        .unwrap();

    assert_eq!(result["status"], "success");
    let ids: Vec<&str> = result["open_loops"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["OL-001", "OL-002", "OL-003"]);
}

#[tokio::test]
async fn test_open_loops_config_replaces_list() {
    let mut configs = HashMap::new();
    configs.insert(
        "get_open_loops".to_string(),
        ToolConfig::Complex {
            implementation: "builtin".to_string(),
            config: HashMap::from([(
                "open_loops".to_string(),
                json!([{
                    "id": "OL-100",
                    "description": "Renew domain",
                    "area": "Admin",
                    "deadline": "today"
                }]),
            )]),
        },
    );
    let (system, _sink) = system_with(configs).await;

    let result = system
        .execute_tool("get_open_loops", &json!({}))
        .await
        .unwrap();

    let loops = result["open_loops"].as_array().unwrap();
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0]["id"], "OL-100");
}

#[tokio::test]
async fn test_log_action_items_with_empty_list() {
    let (system, sink) = default_system().await;

    let result = system
        .execute_tool("log_action_items", &json!({"action_items": []}))
        .await
        .unwrap();

    assert_eq!(result, json!({"status": "success", "logged_count": 0}));
    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "=== [ECC LOG] Action items recorded ===");
    assert_eq!(lines[1], "=".repeat(39));
}

#[tokio::test]
async fn test_log_action_items_tolerates_missing_fields() {
    let (system, sink) = default_system().await;

    let result = system
        .execute_tool(
            "log_action_items",
            &json!({"action_items": [
                {"title": "Ship repo", "priority": "P1", "day": "monday", "area": "ECC"},
                {"priority": "P2"},
                {}
            ]}),
        )
        .await
        .unwrap();

    assert_eq!(result["logged_count"], 3);
    let lines = sink.lines();
    assert_eq!(lines[1], "- [P1] Ship repo (day=monday, area=ECC)");
    assert_eq!(lines[2], "- [P2] (untitled) (day=?, area=?)");
    assert_eq!(lines[3], "- [?] (untitled) (day=?, area=?)");
}

#[tokio::test]
async fn test_log_action_items_tolerates_malformed_fields() {
    let (system, sink) = default_system().await;

    let result = system
        .execute_tool(
            "log_action_items",
            &json!({"action_items": [
                {"title": "Gym", "priority": null, "day": "monday"},
                {"title": "Pricing", "priority": 1, "day": null, "area": false},
                "call the client",
                null
            ]}),
        )
        .await
        .unwrap();

    assert_eq!(result, json!({"status": "success", "logged_count": 4}));
    let lines = sink.lines();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[1], "- [?] Gym (day=monday, area=?)");
    assert_eq!(lines[2], "- [1] Pricing (day=?, area=false)");
    assert_eq!(lines[3], "- [?] (untitled) (day=?, area=?)");
    assert_eq!(lines[4], "- [?] (untitled) (day=?, area=?)");
}

#[tokio::test]
async fn test_parameters_are_validated_before_execution() {
    let (system, sink) = default_system().await;

    let err = system
        .execute_tool("log_action_items", &json!({"action_items": "not a list"}))
        .await
        .unwrap_err();

    assert!(matches!(err, ToolError::ValidationError(_)));
    assert!(sink.lines().is_empty());
}

#[tokio::test]
async fn test_unknown_tool_and_implementation() {
    let (system, _sink) = default_system().await;
    assert!(matches!(
        system.execute_tool("google_search", &json!({})).await,
        Err(ToolError::UnknownTool(_))
    ));

    let mut system = ToolSystem::with_sink(Arc::new(MemorySink::new()));
    let configs = HashMap::from([(
        "get_open_loops".to_string(),
        ToolConfig::Simple("remote".to_string()),
    )]);
    assert!(matches!(
        system.initialize(&configs).await,
        Err(ToolError::UnknownImplementation(_))
    ));
}

#[tokio::test]
async fn test_descriptions_carry_both_schemas() {
    let (system, _sink) = default_system().await;

    for name in system.list_tools() {
        let description = system.describe_tool(&name).unwrap();
        assert_eq!(description.name, name);
        assert_eq!(description.parameters["type"], "object");
        assert_eq!(description.output["type"], "object");
    }
}

fn search_config(base_url: &str, api_key_env: &str) -> HashMap<String, ToolConfig> {
    HashMap::from([(
        "web_search".to_string(),
        ToolConfig::Complex {
            implementation: "builtin".to_string(),
            config: HashMap::from([
                ("base_url".to_string(), json!(base_url)),
                ("api_key_env".to_string(), json!(api_key_env)),
            ]),
        },
    )])
}

#[tokio::test]
async fn test_web_search_returns_organic_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("X-API-KEY", "search-test-key"))
        .and(body_partial_json(json!({"q": "kaggle capstone deadline", "num": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic": [
                {"title": "Capstone", "link": "https://example.com/capstone", "snippet": "Due Friday"},
                {"title": "Forum", "link": "https://example.com/forum"},
                {"title": "Extra", "link": "https://example.com/extra"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    std::env::set_var("ECC_TEST_SEARCH_KEY_PRESENT", "search-test-key");
    let (system, _sink) =
        system_with(search_config(&server.uri(), "ECC_TEST_SEARCH_KEY_PRESENT")).await;

    let result = system
        .execute_tool(
            "web_search",
            &json!({"query": "kaggle capstone deadline", "num_results": 2}),
        )
        .await
        .unwrap();

    assert_eq!(result["query"], "kaggle capstone deadline");
    let results = result["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["url"], "https://example.com/capstone");
    assert_eq!(results[1]["snippet"], "");
}

#[tokio::test]
async fn test_web_search_without_key_registers_but_fails_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (system, _sink) =
        system_with(search_config(&server.uri(), "ECC_TEST_SEARCH_KEY_ABSENT")).await;
    assert!(system.has_tool("web_search"));

    let err = system
        .execute_tool("web_search", &json!({"query": "anything"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::ExecutionError(ref msg) if msg.contains("ECC_TEST_SEARCH_KEY_ABSENT")));
}

#[tokio::test]
async fn test_web_search_requires_query() {
    let (system, _sink) = default_system().await;
    let err = system
        .execute_tool("web_search", &json!({"num_results": 3}))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::ValidationError(_)));
}
