//! LLM provider implementations
//!
//! Concrete implementations of the LlmProvider trait for the supported
//! inference services.

pub mod gemini;
pub mod openai;

pub use gemini::*;
pub use openai::*;
