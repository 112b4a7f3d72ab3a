//! ECC - Executive Command Center
//!
//! A four-stage LLM pipeline that turns a founder's raw weekly notes into a
//! prioritized plan and a short executive briefing.
//!
//! # Overview
//!
//! The stages run strictly in order and share one session:
//! - Knowledge capture: goals, decisions, action items and risks as JSON
//! - Strategic planner: a one-week plan aligned with long-term goals
//! - Priority: P1/P2/P3 tasks with time estimates, logged through a tool
//! - Accountability: a Markdown briefing
//!
//! Each structured stage output is checked against a JSON schema before the
//! next stage may read it.
//!
//! # Quick Start
//!
//! ```rust
//! use ecc_pipeline::agent::AgentFactory;
//! use ecc_pipeline::config::EccConfig;
//! use ecc_pipeline::goals::GoalRegistry;
//! use ecc_pipeline::pipeline::{InMemorySessionStore, PipelineRunner, SequentialPipeline};
//! use ecc_pipeline::testing::{MemorySink, MockLlmProvider};
//! use ecc_pipeline::tools::ToolSystem;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let config = EccConfig::default();
//! let mut tools = ToolSystem::with_sink(Arc::new(MemorySink::new()));
//! tools.initialize(&config.tools).await?;
//!
//! // Scripted provider, no network needed
//! let factory = AgentFactory::new(Arc::new(MockLlmProvider::demo()), "mock-model");
//! let pipeline = SequentialPipeline::ecc(&factory, GoalRegistry::builtin(), Arc::new(tools))?;
//! let runner = PipelineRunner::new(pipeline, InMemorySessionStore::new(), "ecc", "founder");
//!
//! let briefing = runner.run_once("This week I must ship the capstone.").await?;
//! assert!(briefing.contains("## Week Theme"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod goals;
pub mod llm;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod testing;
pub mod tools;

pub use agent::{AgentFactory, OutputContract, StageValue};
pub use config::{EccConfig, ToolConfig};
pub use error::{EccError, EccResult};
pub use goals::{GoalId, GoalRegistry};
pub use pipeline::{InMemorySessionStore, PipelineRunner, SequentialPipeline};
pub use tools::{Tool, ToolDescription, ToolError, ToolSystem};
