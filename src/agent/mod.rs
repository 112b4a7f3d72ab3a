//! Pipeline stages
//!
//! A stage is one model persona with a fixed instruction, an optional tool
//! set and an output contract. The factory binds stages to the shared
//! provider; `ecc` defines the four stages of the weekly workflow.

pub mod ecc;
pub mod factory;
pub mod output;
pub mod stage;

pub use factory::{build_provider, AgentFactory};
pub use output::{extract_json, OutputContract, OutputError, StageValue};
pub use stage::{Stage, StageError, StageSpec};
