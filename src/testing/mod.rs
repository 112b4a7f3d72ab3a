//! Testing utilities and mock implementations
//!
//! Lets the pipeline run end to end without network access. The `mock`
//! provider selectable from config is built from these pieces.

pub mod demo;
pub mod mocks;

pub use mocks::*;
