//! Google Gemini `generateContent` backend

use crate::config::ProviderConfig;
use crate::error::{Result, ResumeTailorError};
use crate::llm::provider::{ensure_success, http_client, map_send_error, require_api_key, TailoringProvider};
use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const NAME: &str = "gemini";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    safety_threshold: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting<'a> {
    category: &'a str,
    threshold: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(NAME, config.timeout)?,
            base_url: config.endpoint.clone(),
            api_key: require_api_key(config)?,
            model: config.model.clone(),
            temperature: config.generation.temperature,
            max_tokens: config.generation.max_tokens,
            safety_threshold: config.generation.safety_threshold.clone(),
        })
    }

    fn safety_settings(&self) -> Vec<SafetySetting<'_>> {
        match self.safety_threshold.as_deref() {
            Some(threshold) => HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting { category, threshold })
                .collect(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl TailoringProvider for GeminiProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn describe(&self) -> String {
        format!("Using Google Gemini ({}) - API", self.model)
    }

    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system_prompt }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: user_message }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
            safety_settings: self.safety_settings(),
        };

        let response = self
            .client
            .post(format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(NAME, e))?;
        let response = ensure_success(NAME, response).await?;

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|_| ResumeTailorError::empty_response(NAME))?;

        if let Some(reason) = generated.prompt_feedback.and_then(|f| f.block_reason) {
            warn!("Gemini blocked the prompt: {}", reason);
            return Err(ResumeTailorError::empty_response(NAME));
        }

        let candidate = generated
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ResumeTailorError::empty_response(NAME))?;

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            if let Some(reason) = candidate.finish_reason {
                warn!("Gemini finished without text: {}", reason);
            }
            return Err(ResumeTailorError::empty_response(NAME));
        }

        Ok(text)
    }
}
