//! Single-provider LLM capability.
//!
//! One OpenAI-compatible chat endpoint, configured per run. There is no
//! provider fallback anywhere: a failed call is reported verbatim and the
//! caller degrades to heuristics.

mod capability;
mod client;
mod error;
pub mod prompts;

pub use capability::{LlmCapability, LlmLead};
pub use client::OpenAiCompatClient;
pub use error::LlmError;
