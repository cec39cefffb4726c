//! Configuration management for the resume tailor

use crate::error::{Result, ResumeTailorError};
use crate::llm::prompts::{DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_TEMPLATE};
use crate::llm::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub watch: WatchConfig,
    pub provider: ProviderSettings,
    pub prompts: PromptConfig,
    pub reconstruction: ReconstructionConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    pub folder: PathBuf,
    pub poll_interval_ms: u64,
    /// Consecutive identical observations required before a pair is read.
    pub stable_polls: u32,
    pub job_description_stem: String,
    pub resume_stem: String,
    pub output_filename: String,
    pub error_filename: String,
    pub write_error_document: bool,
    pub archive_inputs: bool,
    pub archive_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub active: ProviderKind,
    pub fallback_to_local: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub ollama: OllamaSettings,
    pub openai: HostedSettings,
    pub gemini: GeminiSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaSettings {
    pub model: String,
    pub url: String,
    pub auto_pull: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedSettings {
    pub model: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiSettings {
    pub model: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub safety_threshold: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    pub system: String,
    pub user_template: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    /// Allowed relative drift between tailored line count and original
    /// text paragraph count before the structural tier gives up.
    pub paragraph_tolerance: f32,
    /// Normalized Levenshtein similarity at which two headings are
    /// considered the same section.
    pub heading_similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub color_output: bool,
    pub show_spinner: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Gemini, ProviderKind::OpenAi, ProviderKind::Ollama];

    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    pub fn is_hosted(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = ResumeTailorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" | "local" => Ok(ProviderKind::Ollama),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(ResumeTailorError::Configuration(format!(
                "Unknown AI provider: {}. Supported: gemini, openai, ollama",
                other
            ))),
        }
    }
}

/// Resolved provider settings for the active backend. Built once at
/// startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub generation: GenerationParams,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub auto_pull: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub safety_threshold: Option<String>,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            paragraph_tolerance: 0.5,
            heading_similarity: 0.8,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch: WatchConfig {
                folder: PathBuf::from("./TailorResumeInbox"),
                poll_interval_ms: 1000,
                stable_polls: 2,
                job_description_stem: "JD".to_string(),
                resume_stem: "CurrentResume".to_string(),
                output_filename: "TailoredResume.docx".to_string(),
                error_filename: "Error.docx".to_string(),
                write_error_document: false,
                archive_inputs: false,
                archive_dir: "processed".to_string(),
            },
            provider: ProviderSettings {
                active: ProviderKind::Gemini,
                fallback_to_local: true,
                temperature: 0.7,
                max_tokens: 4000,
                timeout_secs: 300,
                max_attempts: 3,
                retry_delay_ms: 2000,
                ollama: OllamaSettings {
                    model: "llama3.1".to_string(),
                    url: "http://localhost:11434".to_string(),
                    auto_pull: true,
                },
                openai: HostedSettings {
                    model: "gpt-4o".to_string(),
                    base_url: "https://api.openai.com/v1".to_string(),
                    api_key: None,
                },
                gemini: GeminiSettings {
                    model: "gemini-1.5-flash".to_string(),
                    base_url: "https://generativelanguage.googleapis.com".to_string(),
                    api_key: None,
                    safety_threshold: "BLOCK_ONLY_HIGH".to_string(),
                },
            },
            prompts: PromptConfig {
                system: DEFAULT_SYSTEM_PROMPT.to_string(),
                user_template: DEFAULT_USER_TEMPLATE.to_string(),
            },
            reconstruction: ReconstructionConfig::default(),
            output: OutputConfig {
                color_output: true,
                show_spinner: true,
            },
        }
    }
}

impl Config {
    /// Load from the given path, or the default location. A missing file
    /// is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ResumeTailorError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("resume-tailor")
            .join("config.toml")
    }

    /// Apply `.env` and process environment overrides.
    pub fn apply_process_env(&mut self) -> Result<()> {
        dotenvy::dotenv().ok();
        self.apply_env(|key| std::env::var(key).ok())
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(folder) = get("WATCH_FOLDER") {
            self.watch.folder = PathBuf::from(folder);
        }
        if let Some(provider) = get("AI_PROVIDER") {
            self.provider.active = provider.parse()?;
        }
        if let Some(prompt) = get("SYSTEM_PROMPT") {
            self.prompts.system = prompt;
        }
        if let Some(url) = get("OLLAMA_URL") {
            self.provider.ollama.url = url;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.provider.ollama.model = model;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.provider.openai.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.provider.openai.model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.provider.openai.base_url = url;
        }
        if let Some(key) = get("GEMINI_API_KEY") {
            self.provider.gemini.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.provider.gemini.model = model;
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            self.provider.gemini.base_url = url;
        }
        if let Some(temperature) = get("AI_TEMPERATURE") {
            self.provider.temperature = parse_value("AI_TEMPERATURE", &temperature)?;
        }
        if let Some(max_tokens) = get("AI_MAX_TOKENS") {
            self.provider.max_tokens = parse_value("AI_MAX_TOKENS", &max_tokens)?;
        }

        Ok(())
    }

    /// Set a single dotted key, as used by `config set`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "watch.folder" => self.watch.folder = PathBuf::from(value),
            "watch.poll_interval_ms" => self.watch.poll_interval_ms = parse_value(key, value)?,
            "watch.stable_polls" => self.watch.stable_polls = parse_value(key, value)?,
            "watch.output_filename" => self.watch.output_filename = value.to_string(),
            "watch.write_error_document" => self.watch.write_error_document = parse_value(key, value)?,
            "watch.archive_inputs" => self.watch.archive_inputs = parse_value(key, value)?,
            "provider.active" => self.provider.active = value.parse()?,
            "provider.fallback_to_local" => self.provider.fallback_to_local = parse_value(key, value)?,
            "provider.temperature" => self.provider.temperature = parse_value(key, value)?,
            "provider.max_tokens" => self.provider.max_tokens = parse_value(key, value)?,
            "provider.timeout_secs" => self.provider.timeout_secs = parse_value(key, value)?,
            "provider.max_attempts" => self.provider.max_attempts = parse_value(key, value)?,
            "provider.ollama.model" => self.provider.ollama.model = value.to_string(),
            "provider.ollama.url" => self.provider.ollama.url = value.to_string(),
            "provider.openai.model" => self.provider.openai.model = value.to_string(),
            "provider.gemini.model" => self.provider.gemini.model = value.to_string(),
            "provider.gemini.safety_threshold" => self.provider.gemini.safety_threshold = value.to_string(),
            "reconstruction.paragraph_tolerance" => {
                self.reconstruction.paragraph_tolerance = parse_value(key, value)?
            }
            "output.color_output" => self.output.color_output = parse_value(key, value)?,
            "output.show_spinner" => self.output.show_spinner = parse_value(key, value)?,
            _ => {
                return Err(ResumeTailorError::Configuration(format!(
                    "Unknown configuration key: {}",
                    key
                )))
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.watch.poll_interval_ms == 0 {
            return Err(ResumeTailorError::Configuration(
                "watch.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ResumeTailorError::Configuration(format!(
                "provider.temperature must be between 0.0 and 2.0, got {}",
                self.provider.temperature
            )));
        }
        if self.provider.max_attempts == 0 {
            return Err(ResumeTailorError::Configuration(
                "provider.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.prompts.system.trim().is_empty() {
            return Err(ResumeTailorError::Configuration("System prompt is empty".to_string()));
        }
        Ok(())
    }

    /// Resolve settings for one backend.
    pub fn provider_config(&self, kind: ProviderKind) -> Result<ProviderConfig> {
        let settings = &self.provider;
        let (model, endpoint, api_key, safety_threshold) = match kind {
            ProviderKind::Ollama => (
                settings.ollama.model.clone(),
                settings.ollama.url.clone(),
                None,
                None,
            ),
            ProviderKind::OpenAi => (
                settings.openai.model.clone(),
                settings.openai.base_url.clone(),
                settings.openai.api_key.clone(),
                None,
            ),
            ProviderKind::Gemini => (
                settings.gemini.model.clone(),
                settings.gemini.base_url.clone(),
                settings.gemini.api_key.clone(),
                Some(settings.gemini.safety_threshold.clone()),
            ),
        };

        if model.trim().is_empty() {
            return Err(ResumeTailorError::Configuration(format!(
                "No model configured for provider {}",
                kind
            )));
        }

        Ok(ProviderConfig {
            kind,
            model,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            generation: GenerationParams {
                temperature: settings.temperature,
                max_tokens: settings.max_tokens,
                safety_threshold,
            },
            timeout: Duration::from_secs(settings.timeout_secs),
            retry: RetryPolicy {
                max_attempts: settings.max_attempts,
                initial_delay: Duration::from_millis(settings.retry_delay_ms),
                ..RetryPolicy::default()
            },
            auto_pull: settings.ollama.auto_pull,
        })
    }

    pub fn active_provider_config(&self) -> Result<ProviderConfig> {
        self.provider_config(self.provider.active)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch.poll_interval_ms)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ResumeTailorError::Configuration(format!("Invalid value for {}: {}", key, value)))
}
