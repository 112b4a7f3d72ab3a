//! LLM provider abstraction layer
//!
//! A provider-agnostic interface for inference calls, the concrete HTTP
//! providers, and the retry policy every stage shares.

pub mod provider;
pub mod providers;
pub mod retry;

pub use provider::*;
pub use providers::*;
pub use retry::RetryPolicy;
