//! AI-written explanations
//!
//! Optional LLM backend for explaining issues. Supports DeepSeek (default),
//! OpenAI and a local Ollama server, all over the chat-completions protocol.
//!
//! # Environment Variables
//!
//! - `DEEPSEEK_API_KEY`: key for the DeepSeek backend
//! - `OPENAI_API_KEY`: key for the OpenAI backend

mod client;
mod prompts;

#[cfg(test)]
pub(crate) use client::test_support;
pub use client::{AiClient, AiConfig, LlmBackend, Message, Role};
pub use prompts::{explanation_prompt, parse_sections, AiExplanation, SYSTEM_PROMPT};

use thiserror::Error;

/// Errors that can occur in the AI module
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Missing API key: set {env_var} or [ai].api_key")]
    MissingApiKey { env_var: String },

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

pub type AiResult<T> = Result<T, AiError>;
