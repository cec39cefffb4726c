//! One tailoring run: read inputs, call the provider, reconstruct, write

use crate::config::{Config, ProviderKind};
use crate::error::Result;
use crate::input::InputManager;
use crate::llm::{create_provider, create_provider_with_fallback, generate, PromptTemplates, RetryPolicy, TailoringProvider};
use crate::output::{save_document, Console};
use crate::processing::validator::validate;
use crate::processing::{FormattingReport, Tier, TieredReconstructor};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub tier: Tier,
    pub output: PathBuf,
    pub resume_words: usize,
    pub tailored_words: usize,
    /// Reasons the higher tiers were skipped
    pub fallbacks: Vec<String>,
    /// `None` when the produced document could not be re-read for scoring
    pub formatting: Option<FormattingReport>,
    pub elapsed: Duration,
}

pub struct Pipeline {
    provider: Box<dyn TailoringProvider>,
    templates: PromptTemplates,
    retry: RetryPolicy,
    reconstructor: TieredReconstructor,
    inputs: InputManager,
}

impl Pipeline {
    pub fn new(
        provider: Box<dyn TailoringProvider>,
        templates: PromptTemplates,
        retry: RetryPolicy,
        reconstructor: TieredReconstructor,
    ) -> Self {
        Self {
            provider,
            templates,
            retry,
            reconstructor,
            inputs: InputManager::new(),
        }
    }

    /// Build the pipeline for the configured active provider.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider_config = config.active_provider_config()?;
        let provider = if config.provider.fallback_to_local {
            let local = config.provider_config(ProviderKind::Ollama)?;
            create_provider_with_fallback(&provider_config, &local)?
        } else {
            create_provider(&provider_config)?
        };

        Ok(Self::new(
            provider,
            PromptTemplates::new(config.prompts.system.clone(), config.prompts.user_template.clone()),
            provider_config.retry,
            TieredReconstructor::new(config.reconstruction.clone()),
        ))
    }

    pub fn provider(&self) -> &dyn TailoringProvider {
        self.provider.as_ref()
    }

    /// Tailor `resume` to `job_description` and write the result to
    /// `output`. On error nothing is written.
    pub async fn run_files(
        &self,
        job_description: &Path,
        resume: &Path,
        output: &Path,
        console: &Console,
    ) -> Result<RunReport> {
        let started = Instant::now();

        console.step("Reading job description...");
        let job_text = self.inputs.read_job_description(job_description).await?;

        console.step("Reading current resume...");
        let resume = self.inputs.read_resume(resume).await?;
        let resume_words = resume.word_count();
        console.info(&format!("Original resume has {} words", resume_words));

        let spinner = console.spinner(&format!(
            "Tailoring resume with {} (this may take a minute)...",
            self.provider.describe()
        ));
        let tailored = match generate(
            self.provider.as_ref(),
            &self.templates,
            &job_text,
            &resume.text,
            &self.retry,
        )
        .await
        {
            Ok(text) => {
                spinner.finish_with_success("Tailored text received");
                text
            }
            Err(e) => {
                spinner.finish_with_error("Provider call failed");
                return Err(e);
            }
        };
        let tailored_words = tailored.split_whitespace().count();
        console.info(&format!("AI generated {} words", tailored_words));

        console.step("Creating formatted resume with preserved styling...");
        let outcome = self
            .reconstructor
            .reconstruct(&resume.bytes, &resume.fingerprint, &tailored)?;

        let formatting = match validate(&outcome.bytes, &resume.fingerprint) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Could not score formatting of the output: {}", e);
                None
            }
        };

        save_document(&outcome.bytes, output)?;
        info!("Wrote {} using {}", output.display(), outcome.tier);

        Ok(RunReport {
            tier: outcome.tier,
            output: output.to_path_buf(),
            resume_words,
            tailored_words,
            fallbacks: outcome.fallbacks,
            formatting,
            elapsed: started.elapsed(),
        })
    }
}
