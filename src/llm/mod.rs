//! AI provider integration

pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod prompts;
pub mod provider;
pub mod retry;

pub use prompts::{PromptParams, PromptTemplates};
pub use provider::{create_provider, create_provider_with_fallback, generate, TailoringProvider};
pub use retry::RetryPolicy;
