//! Observability for the ECC pipeline
//!
//! Structured logging via `tracing`, with span macros for pipeline runs,
//! stages and tool calls.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};

// Span macros for structured logging
pub use crate::{pipeline_span, stage_span, tool_span};
