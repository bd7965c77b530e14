//! Language model collaborators.
//!
//! The registry only needs one capability from a model: turn a prompt into
//! text. [`OpenAiChat`] talks to any OpenAI-compatible chat endpoint,
//! [`ScriptedModel`] replays canned answers for tests and demos.

mod openai;
mod scripted;

pub use openai::OpenAiChat;
pub use scripted::ScriptedModel;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::models::LlmResponse;

/// A model that answers a single prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<LlmResponse, LlmError>;
}
