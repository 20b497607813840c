//! LLM-backed development recommendations.
//!
//! This module builds the recommendation prompt from a computed report and
//! calls an Ollama-compatible chat endpoint.

pub mod client;
pub mod prompt;

pub use client::{LlmConfig, RecommendationClient};
pub use prompt::RecommendationInput;
