//! Provider abstraction: one trait, one implementation per AI backend

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{Result, ResumeTailorError};
use crate::llm::gemini::GeminiProvider;
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAiProvider;
use crate::llm::prompts::{PromptParams, PromptTemplates};
use crate::llm::retry::{with_retry, RetryPolicy};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// A text-completion backend that can rewrite a resume.
///
/// Implementations own their request formatting and response parsing and
/// all return plain text.
#[async_trait]
pub trait TailoringProvider: Send + Sync {
    /// Short identifier, e.g. "ollama"
    fn name(&self) -> &str;

    /// Model the provider sends requests to
    fn model(&self) -> &str;

    /// One-line description shown to the operator
    fn describe(&self) -> String;

    /// Probe the backend before starting the watch loop
    async fn check_available(&self) -> Result<()> {
        Ok(())
    }

    /// Send one completion request
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String>;
}

/// Produce tailored resume text for one job description / resume pair.
pub async fn generate(
    provider: &dyn TailoringProvider,
    templates: &PromptTemplates,
    job_description: &str,
    resume_text: &str,
    retry: &RetryPolicy,
) -> Result<String> {
    if templates.system.trim().is_empty() {
        return Err(ResumeTailorError::InvalidInput("System prompt is empty".to_string()));
    }
    if job_description.trim().is_empty() {
        return Err(ResumeTailorError::InvalidInput(
            "Job description contains no text".to_string(),
        ));
    }
    if resume_text.trim().is_empty() {
        return Err(ResumeTailorError::InvalidInput("Resume contains no text".to_string()));
    }

    let user_message = templates.render_user_message(&PromptParams {
        job_content: job_description.to_string(),
        resume_content: resume_text.to_string(),
    });

    info!("Requesting tailored resume from {} ({})", provider.name(), provider.model());

    let text = with_retry(retry, |attempt| {
        debug!("{} request attempt {}", provider.name(), attempt);
        provider.complete(&templates.system, &user_message)
    })
    .await?;

    let text = strip_code_fence(&text);
    if text.trim().is_empty() {
        return Err(ResumeTailorError::empty_response(provider.name()));
    }

    Ok(text)
}

/// Select the backend named by the configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn TailoringProvider>> {
    match config.kind {
        ProviderKind::Ollama => Ok(Box::new(OllamaProvider::new(config)?)),
        ProviderKind::OpenAi => Ok(Box::new(OpenAiProvider::new(config)?)),
        ProviderKind::Gemini => Ok(Box::new(GeminiProvider::new(config)?)),
    }
}

/// Like [`create_provider`], but falls back to the local backend when a
/// hosted provider has no credential configured.
pub fn create_provider_with_fallback(
    config: &ProviderConfig,
    local: &ProviderConfig,
) -> Result<Box<dyn TailoringProvider>> {
    if config.kind.is_hosted() && config.api_key.is_none() {
        warn!(
            "No API key configured for {}. Switching to {}",
            config.kind, local.kind
        );
        return create_provider(local);
    }
    create_provider(config)
}

pub(crate) fn http_client(provider: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ResumeTailorError::provider_unavailable(provider, format!("Failed to build HTTP client: {}", e), false))
}

pub(crate) fn require_api_key(config: &ProviderConfig) -> Result<String> {
    config.api_key.clone().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
        ResumeTailorError::Configuration(format!(
            "No API key configured for {}. Set {}_API_KEY in your environment or .env file",
            config.kind,
            config.kind.id().to_uppercase()
        ))
    })
}

pub(crate) fn map_send_error(provider: &str, err: reqwest::Error) -> ResumeTailorError {
    let retryable = err.is_timeout() || err.is_connect() || err.is_request();
    ResumeTailorError::provider_unavailable(provider, format!("Request failed: {}", err), retryable)
}

/// Turn a non-success HTTP status into `ProviderUnavailable`.
pub(crate) async fn ensure_success(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
    let message = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("authentication failed (HTTP {}): {}", status.as_u16(), truncate(&body, 300))
        }
        _ => format!("HTTP {}: {}", status.as_u16(), truncate(&body, 300)),
    };

    Err(ResumeTailorError::provider_unavailable(provider, message, retryable))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

/// Some models wrap their answer in a Markdown fence despite instructions.
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(body) = rest.strip_suffix("```") {
            let body = match body.find('\n') {
                Some(newline) if !body[..newline].contains(' ') => &body[newline + 1..],
                _ => body,
            };
            return body.trim_matches('\n').to_string();
        }
    }
    trimmed.to_string()
}
