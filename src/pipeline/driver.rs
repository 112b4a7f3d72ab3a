//! One-shot driver: create a session, run the pipeline, keep the last text

use crate::pipeline::events::{event_channel, PipelineEvent};
use crate::pipeline::orchestrator::{PipelineError, SequentialPipeline};
use crate::pipeline::session::{InMemorySessionStore, Session};
use tracing::debug;
use uuid::Uuid;

/// Result of a single run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub session_id: Uuid,
    /// Trimmed text of the last model response that carried content,
    /// empty if none did
    pub final_text: String,
}

pub struct PipelineRunner {
    pipeline: SequentialPipeline,
    store: InMemorySessionStore,
    app_name: String,
    user_id: String,
}

impl PipelineRunner {
    pub fn new(
        pipeline: SequentialPipeline,
        store: InMemorySessionStore,
        app_name: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            store,
            app_name: app_name.into(),
            user_id: user_id.into(),
        }
    }

    pub fn pipeline(&self) -> &SequentialPipeline {
        &self.pipeline
    }

    pub fn store(&self) -> &InMemorySessionStore {
        &self.store
    }

    /// Run the pipeline once and return the final response text
    pub async fn run_once(&self, message: &str) -> Result<String, PipelineError> {
        self.run_once_detailed(message)
            .await
            .map(|outcome| outcome.final_text)
    }

    /// Like [`run_once`](Self::run_once) but also reports the session id.
    /// The session is stored whether the run succeeds or fails.
    pub async fn run_once_detailed(&self, message: &str) -> Result<RunOutcome, PipelineError> {
        let mut session = self.store.create(&self.app_name, &self.user_id).await;
        let session_id = session.id;
        let (tx, mut rx) = event_channel();

        let run = async {
            let result = self.pipeline.run(&mut session, message, Some(&tx)).await;
            drop(tx);
            result
        };

        let drain = async {
            let mut final_text = String::new();
            while let Some(event) = rx.recv().await {
                log_event(&event);
                if let Some(text) = event.text() {
                    final_text = text.trim().to_string();
                }
            }
            final_text
        };

        let (result, final_text) = tokio::join!(run, drain);
        self.store.save(session).await;
        result?;

        Ok(RunOutcome {
            session_id,
            final_text,
        })
    }

    /// Fetch a stored session
    pub async fn session(&self, id: Uuid) -> Option<Session> {
        self.store.get(id).await
    }
}

fn log_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::StageStarted { stage, index } => {
            debug!(stage = %stage, index = index, "Stage started")
        }
        PipelineEvent::ModelResponse { stage, text } => debug!(
            stage = %stage,
            chars = text.as_ref().map(String::len).unwrap_or(0),
            "Model response"
        ),
        PipelineEvent::ToolCall { stage, tool, .. } => {
            debug!(stage = %stage, tool = %tool, "Tool call")
        }
        PipelineEvent::ToolResult {
            stage,
            tool,
            success,
            ..
        } => debug!(stage = %stage, tool = %tool, success = success, "Tool result"),
        PipelineEvent::StageCompleted { stage, output_key } => debug!(
            stage = %stage,
            output_key = output_key.as_deref().unwrap_or("-"),
            "Stage completed"
        ),
    }
}
