//! OpenAI chat completions backend

use crate::config::ProviderConfig;
use crate::error::{Result, ResumeTailorError};
use crate::llm::provider::{ensure_success, http_client, map_send_error, require_api_key, TailoringProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const NAME: &str = "openai";

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(NAME, config.timeout)?,
            base_url: config.endpoint.clone(),
            api_key: require_api_key(config)?,
            model: config.model.clone(),
            temperature: config.generation.temperature,
            max_tokens: config.generation.max_tokens,
        })
    }
}

#[async_trait]
impl TailoringProvider for OpenAiProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn describe(&self) -> String {
        format!("Using OpenAI ({}) - API", self.model)
    }

    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(NAME, e))?;
        let response = ensure_success(NAME, response).await?;

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|_| ResumeTailorError::empty_response(NAME))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ResumeTailorError::empty_response(NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ProviderKind};
    use mockito::Matcher;
    use serde_json::json;

    fn provider_for(url: &str) -> OpenAiProvider {
        let mut config = Config::default();
        config.provider.openai.base_url = url.to_string();
        config.provider.openai.api_key = Some("sk-test".to_string());
        OpenAiProvider::new(&config.provider_config(ProviderKind::OpenAi).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_completion_roundtrip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o",
                "max_tokens": 4000,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "user"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"JOHN DOE\nEngineer"}}]}"#)
            .create_async()
            .await;

        let text = provider_for(&server.url()).complete("sys", "user").await.unwrap();
        assert_eq!(text, "JOHN DOE\nEngineer");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
            .create_async()
            .await;

        let err = provider_for(&server.url()).complete("sys", "user").await.unwrap_err();
        assert!(matches!(err, ResumeTailorError::ProviderUnavailable { retryable: false, .. }));
        assert!(err.to_string().contains("authentication failed"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .create_async()
            .await;

        let err = provider_for(&server.url()).complete("sys", "user").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_null_content_is_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
            .create_async()
            .await;

        let err = provider_for(&server.url()).complete("sys", "user").await.unwrap_err();
        assert!(matches!(err, ResumeTailorError::ProviderEmptyResponse { .. }));
    }
}
