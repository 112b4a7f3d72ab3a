//! Test helpers and utilities for integration tests

use ecc_pipeline::agent::AgentFactory;
use ecc_pipeline::config::EccConfig;
use ecc_pipeline::goals::GoalRegistry;
use ecc_pipeline::llm::{LlmProvider, RetryPolicy};
use ecc_pipeline::pipeline::{InMemorySessionStore, PipelineRunner, SequentialPipeline};
use ecc_pipeline::testing::{MemorySink, MockLlmProvider};
use ecc_pipeline::tools::ToolSystem;
use std::sync::Arc;

/// Tool system with the default builtins writing into a memory sink
#[allow(dead_code)]
pub async fn test_tools() -> (Arc<ToolSystem>, MemorySink) {
    let sink = MemorySink::new();
    let mut tools = ToolSystem::with_sink(Arc::new(sink.clone()));
    tools
        .initialize(&EccConfig::default().tools)
        .await
        .expect("builtin tools initialize");
    (Arc::new(tools), sink)
}

/// Factory over `provider` that retries without sleeping
#[allow(dead_code)]
pub fn test_factory(provider: Arc<dyn LlmProvider>) -> AgentFactory {
    AgentFactory::new(provider, "test-model")
        .with_retry_policy(RetryPolicy::default().without_delay())
}

/// The weekly workflow over `provider`
#[allow(dead_code)]
pub async fn ecc_pipeline_with(
    provider: Arc<dyn LlmProvider>,
) -> (SequentialPipeline, MemorySink) {
    let (tools, sink) = test_tools().await;
    let pipeline = SequentialPipeline::ecc(&test_factory(provider), GoalRegistry::builtin(), tools)
        .expect("ecc wiring is valid");
    (pipeline, sink)
}

/// Runner over the scripted demo provider
#[allow(dead_code)]
pub async fn demo_runner() -> (PipelineRunner, MockLlmProvider, MemorySink) {
    let provider = MockLlmProvider::demo();
    let (pipeline, sink) = ecc_pipeline_with(Arc::new(provider.clone())).await;
    let runner = PipelineRunner::new(pipeline, InMemorySessionStore::new(), "ecc", "test-user");
    (runner, provider, sink)
}
