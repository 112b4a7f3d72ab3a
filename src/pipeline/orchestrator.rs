//! Sequential orchestrator
//!
//! Runs stages strictly in order. A stage's validated output is written to
//! the session before the next stage starts, and the first failing stage
//! stops the run. The wiring (output keys, input keys, tools) is checked
//! once at construction instead of being discovered mid-run.

use crate::agent::ecc::{ecc_stage_specs, PIPELINE_NAME};
use crate::agent::output::StageValue;
use crate::agent::{AgentFactory, Stage, StageError};
use crate::goals::GoalRegistry;
use crate::pipeline::events::{emit, EventSender, PipelineEvent};
use crate::pipeline::session::{PipelineState, Session, StageTrace};
use crate::pipeline_span;
use crate::tools::ToolSystem;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, Instrument};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline '{0}' has no stages")]
    NoStages(String),
    #[error("Output key '{key}' of stage '{stage}' is already produced by an earlier stage")]
    DuplicateOutputKey { stage: String, key: String },
    #[error("Stage '{stage}' reads '{key}' which no earlier stage produces")]
    UnresolvedInputKey { stage: String, key: String },
    #[error("Stage '{stage}' uses tool '{tool}' which is not registered")]
    UnknownTool { stage: String, tool: String },
    #[error("Session is {0}, expected pending")]
    SessionNotPending(PipelineState),
    #[error("Stage {index} ('{stage}') failed: {source}")]
    StageFailed {
        index: usize,
        stage: String,
        #[source]
        source: StageError,
    },
}

pub struct SequentialPipeline {
    name: String,
    stages: Vec<Stage>,
    tools: Arc<ToolSystem>,
}

impl std::fmt::Debug for SequentialPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialPipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl SequentialPipeline {
    /// Build a pipeline, rejecting wiring that could not run to completion
    pub fn new(
        name: impl Into<String>,
        stages: Vec<Stage>,
        tools: Arc<ToolSystem>,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        Self::validate_wiring(&name, &stages, &tools)?;
        Ok(Self {
            name,
            stages,
            tools,
        })
    }

    /// The four-stage weekly workflow
    pub fn ecc(
        factory: &AgentFactory,
        goals: &GoalRegistry,
        tools: Arc<ToolSystem>,
    ) -> Result<Self, PipelineError> {
        let stages = ecc_stage_specs(goals)
            .into_iter()
            .map(|spec| factory.create_stage(spec))
            .collect();
        Self::new(PIPELINE_NAME, stages, tools)
    }

    fn validate_wiring(
        name: &str,
        stages: &[Stage],
        tools: &ToolSystem,
    ) -> Result<(), PipelineError> {
        if stages.is_empty() {
            return Err(PipelineError::NoStages(name.to_string()));
        }

        let mut produced: HashSet<&str> = HashSet::new();
        for stage in stages {
            let spec = stage.spec();

            for key in &spec.input_keys {
                if !produced.contains(key.as_str()) {
                    return Err(PipelineError::UnresolvedInputKey {
                        stage: spec.name.clone(),
                        key: key.clone(),
                    });
                }
            }

            for tool in &spec.tools {
                if !tools.has_tool(tool) {
                    return Err(PipelineError::UnknownTool {
                        stage: spec.name.clone(),
                        tool: tool.clone(),
                    });
                }
            }

            if let Some(key) = spec.output_key.as_deref() {
                if !produced.insert(key) {
                    return Err(PipelineError::DuplicateOutputKey {
                        stage: spec.name.clone(),
                        key: key.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order against `session`. Returns the last stage's
    /// value. On failure the session keeps the outputs of the stages that
    /// completed and its state records the failing index.
    pub async fn run(
        &self,
        session: &mut Session,
        message: &str,
        events: Option<&EventSender>,
    ) -> Result<StageValue, PipelineError> {
        if session.state != PipelineState::Pending {
            return Err(PipelineError::SessionNotPending(session.state.clone()));
        }

        let span = pipeline_span!(
            pipeline = %self.name,
            session_id = %session.id,
            user_id = %session.user_id
        );

        async {
            info!(stages = self.stages.len(), "Pipeline started");
            let mut last_value = None;

            for (index, stage) in self.stages.iter().enumerate() {
                Self::transition(session, PipelineState::Running { stage_index: index });
                session.trace.push(StageTrace {
                    stage: stage.name().to_string(),
                    keys_at_start: session.keys(),
                    output_key: stage.output_key().map(str::to_string),
                });
                emit(
                    events,
                    PipelineEvent::StageStarted {
                        stage: stage.name().to_string(),
                        index,
                    },
                );

                let value = match stage
                    .run(message, &session.keyed_outputs, &self.tools, events)
                    .await
                {
                    Ok(value) => value,
                    Err(source) => {
                        error!(stage = stage.name(), index = index, error = %source, "Stage failed");
                        Self::transition(
                            session,
                            PipelineState::Failed {
                                stage_index: index,
                                error: source.to_string(),
                            },
                        );
                        return Err(PipelineError::StageFailed {
                            index,
                            stage: stage.name().to_string(),
                            source,
                        });
                    }
                };

                if let Some(key) = stage.output_key() {
                    session.keyed_outputs.insert(key.to_string(), value.clone());
                }
                emit(
                    events,
                    PipelineEvent::StageCompleted {
                        stage: stage.name().to_string(),
                        output_key: stage.output_key().map(str::to_string),
                    },
                );
                last_value = Some(value);
            }

            Self::transition(session, PipelineState::Complete);
            info!("Pipeline complete");
            // validate_wiring guarantees at least one stage
            last_value.ok_or_else(|| PipelineError::NoStages(self.name.clone()))
        }
        .instrument(span)
        .await
    }

    fn transition(session: &mut Session, next: PipelineState) {
        info!(from = %session.state, to = %next, "Pipeline state transition");
        session.state = next;
    }
}
