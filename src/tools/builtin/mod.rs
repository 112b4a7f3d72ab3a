//! Builtin tools available to pipeline stages
//!
//! Each tool lives in its own module with pure formatting helpers kept apart
//! from the side-effecting call.

pub mod action_items;
pub mod open_loops;
pub mod web_search;

pub use action_items::{ActionItemsTool, LineSink, StdoutSink, ACTION_ITEMS_TOOL};
pub use open_loops::{OpenLoop, OpenLoopsTool, OPEN_LOOPS_TOOL};
pub use web_search::{WebSearchTool, WEB_SEARCH_TOOL};
