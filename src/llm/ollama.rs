//! Local model backend served by Ollama

use crate::config::ProviderConfig;
use crate::error::{Result, ResumeTailorError};
use crate::llm::provider::{ensure_success, http_client, map_send_error, TailoringProvider};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const NAME: &str = "ollama";
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const PULL_TIMEOUT: Duration = Duration::from_secs(600);

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    auto_pull: bool,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

impl OllamaProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(NAME, config.timeout)?,
            base_url: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.generation.temperature,
            max_tokens: config.generation.max_tokens,
            auto_pull: config.auto_pull,
        })
    }

    /// Names of locally installed models, without their `:tag` suffix
    pub async fn installed_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                ResumeTailorError::provider_unavailable(
                    NAME,
                    format!("Ollama is not running at {} ({}). Start it with `ollama serve`", self.base_url, e),
                    true,
                )
            })?;
        let response = ensure_success(NAME, response).await?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ResumeTailorError::provider_unavailable(NAME, format!("Invalid /api/tags response: {}", e), false))?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| m.name.split(':').next().unwrap_or_default().to_string())
            .collect())
    }

    async fn pull_model(&self) -> Result<()> {
        info!("Downloading {} model (this may take a few minutes)...", self.model);

        let response = self
            .client
            .post(format!("{}/api/pull", self.base_url))
            .timeout(PULL_TIMEOUT)
            .json(&PullRequest {
                name: &self.model,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| map_send_error(NAME, e))?;
        ensure_success(NAME, response).await?;

        info!("{} model ready", self.model);
        Ok(())
    }

    fn model_matches(&self, installed: &[String]) -> bool {
        let wanted = self.model.split(':').next().unwrap_or_default();
        installed.iter().any(|name| name == wanted)
    }
}

#[async_trait]
impl TailoringProvider for OllamaProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn describe(&self) -> String {
        format!("Using Ollama ({}) at {} - Free & Local", self.model, self.base_url)
    }

    async fn check_available(&self) -> Result<()> {
        let installed = self.installed_models().await?;
        if self.model_matches(&installed) {
            return Ok(());
        }

        if self.auto_pull {
            self.pull_model().await
        } else {
            Err(ResumeTailorError::provider_unavailable(
                NAME,
                format!("Model {} is not installed. Run `ollama pull {}`", self.model, self.model),
                false,
            ))
        }
    }

    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(NAME, e))?;
        let response = ensure_success(NAME, response).await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|_| ResumeTailorError::empty_response(NAME))?;

        chat.message
            .map(|m| m.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ResumeTailorError::empty_response(NAME))
    }
}
