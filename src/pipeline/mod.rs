//! Sequential pipeline runtime
//!
//! Sessions hold the keyed stage outputs, the orchestrator walks stages in
//! order, and the driver runs a pipeline once while draining its events.

pub mod driver;
pub mod events;
pub mod orchestrator;
pub mod session;

pub use driver::{PipelineRunner, RunOutcome};
pub use events::{event_channel, EventReceiver, EventSender, PipelineEvent};
pub use orchestrator::{PipelineError, SequentialPipeline};
pub use session::{InMemorySessionStore, PipelineState, Session, StageTrace};
