//! Chat-completion provider abstraction for evolve.
//!
//! The site editor needs a single non-streaming call: send a system prompt
//! plus user messages and get the assistant's text back. [`LanguageModel`]
//! is that seam; [`groq::GroqProvider`] talks to Groq's OpenAI-compatible
//! API and [`test::ScriptedModel`] replays canned answers in tests.

pub mod error;
pub mod groq;
pub mod message;

pub use error::{ProviderError, ProviderResult};
pub use message::{Message, Role};

use async_trait::async_trait;
use std::sync::Arc;

/// Options for text generation.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0-1.0).
    pub temperature: Option<f32>,
}

/// A chat-completion model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send the conversation and return the assistant's reply text.
    async fn complete(
        &self,
        messages: Vec<Message>,
        options: GenerateOptions,
    ) -> ProviderResult<String>;

    /// Model identifier sent to the provider.
    fn model_id(&self) -> &str;

    /// Provider identifier (e.g. "groq").
    fn provider_id(&self) -> &str;
}

/// A boxed language model for dynamic dispatch.
pub type BoxedLanguageModel = Arc<dyn LanguageModel>;
