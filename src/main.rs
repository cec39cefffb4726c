//! Resume tailor: watches a folder and tailors resumes with an AI provider

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use resume_tailor::cli::{self, Cli, Commands, ConfigAction, ProviderAction};
use resume_tailor::config::{Config, ProviderKind};
use resume_tailor::input::{FileType, InputManager, JOB_DESCRIPTION_EXTENSIONS};
use resume_tailor::output::Console;
use resume_tailor::processing::extract;
use resume_tailor::watch::{FolderWatcher, Pipeline};
use std::path::{Path, PathBuf};
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run_command(cli).await {
        error!("Command failed: {:#}", e);
        process::exit(1);
    }
}

async fn run_command(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let file_config = Config::load(Some(&config_path))
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    // Environment overrides apply to the running process only; commands
    // that persist settings start from `file_config`.
    let mut config = file_config.clone();
    config
        .apply_process_env()
        .context("Invalid environment override")?;
    config.validate()?;

    if !config.output.color_output {
        colored::control::set_override(false);
    }
    let console = Console::new(&config.output);

    match cli.command.unwrap_or(Commands::Watch { folder: None }) {
        Commands::Watch { folder } => {
            if let Some(folder) = folder {
                config.watch.folder = folder;
            }
            watch(config, console).await
        }
        Commands::Tailor { job, resume, output } => tailor(&config, &console, &job, &resume, output).await,
        Commands::Extract { file, json } => extract_document(&file, json).await,
        Commands::Provider { action } => provider_command(action, config, file_config, &config_path, &console).await,
        Commands::Config { action } => config_command(action, &config, file_config, &config_path, &console),
    }
}

async fn watch(config: Config, console: Console) -> Result<()> {
    console.header("Resume Tailor - Automated Resume Tailoring");

    let pipeline = Pipeline::from_config(&config).context("Failed to set up the AI provider")?;
    console.info(&format!("AI provider: {}", pipeline.provider().describe()));

    if let Err(e) = pipeline.provider().check_available().await {
        console.failure(&format!("{} is not available: {}", pipeline.provider().name(), e));
        if pipeline.provider().name() == ProviderKind::Ollama.id() {
            console.hint("Please install and start Ollama:");
            println!("1. Download from: https://ollama.ai");
            println!("2. Install and run: ollama serve");
            println!("3. Then restart resume-tailor");
        }
        return Err(e.into());
    }

    let mut watcher = FolderWatcher::new(&config.watch, config.poll_interval(), pipeline, console);
    watcher.run().await?;
    info!("Watcher stopped");
    Ok(())
}

async fn tailor(config: &Config, console: &Console, job: &Path, resume: &Path, output: Option<PathBuf>) -> Result<()> {
    cli::validate_file_extension(job, &JOB_DESCRIPTION_EXTENSIONS)
        .map_err(|e| anyhow::anyhow!("Job description file: {}", e))?;
    cli::validate_file_extension(resume, &["docx"]).map_err(|e| anyhow::anyhow!("Resume file: {}", e))?;

    let output = output.unwrap_or_else(|| {
        resume
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&config.watch.output_filename)
    });

    let pipeline = Pipeline::from_config(config).context("Failed to set up the AI provider")?;
    console.info(&format!("AI provider: {}", pipeline.provider().describe()));

    match pipeline.run_files(job, resume, &output, console).await {
        Ok(report) => {
            console.run_summary(&report);
            Ok(())
        }
        Err(e) => {
            console.failure(&format!("Error processing files: {}", e));
            Err(e.into())
        }
    }
}

async fn extract_document(file: &Path, json: bool) -> Result<()> {
    if FileType::from_path(file).is_resume_format() {
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let (text, fingerprint) = extract(&bytes)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&fingerprint)?);
            return Ok(());
        }

        println!("{}", text);
        println!();
        println!("Paragraphs: {} ({} with text)", fingerprint.len(), fingerprint.text_paragraph_count());
        println!("Runs: {}", fingerprint.run_count());
        let page = fingerprint.page();
        if let (Some(width), Some(height)) = (&page.width, &page.height) {
            println!("Page: {} x {} twips", width, height);
        }
        println!(
            "Styles part: {}, numbering part: {}",
            if fingerprint.styles_part().is_some() { "yes" } else { "no" },
            if fingerprint.numbering_part().is_some() { "yes" } else { "no" }
        );
        return Ok(());
    }

    if json {
        bail!("--json is only available for .docx documents");
    }
    let text = InputManager::new().read_job_description(file).await?;
    println!("{}", text);
    Ok(())
}

async fn provider_command(
    action: ProviderAction,
    config: Config,
    mut file_config: Config,
    config_path: &Path,
    console: &Console,
) -> Result<()> {
    match action {
        ProviderAction::List => {
            console.info("Available AI providers:");
            for kind in ProviderKind::ALL {
                let provider = config.provider_config(kind)?;
                let marker = if kind == config.provider.active { "*" } else { " " };
                let credential = if !kind.is_hosted() {
                    "local".to_string()
                } else {
                    match &provider.api_key {
                        Some(key) => format!("API key {}", cli::mask_secret(key)),
                        None => "no API key".to_string(),
                    }
                };
                println!(
                    "{} {:<7} model {:<20} {} ({})",
                    marker,
                    kind.id(),
                    provider.model,
                    provider.endpoint,
                    credential
                );
            }
        }

        ProviderAction::Check => {
            let pipeline = Pipeline::from_config(&config)?;
            let provider = pipeline.provider();
            let spinner = console.spinner(&format!("Checking {}...", provider.describe()));
            match provider.check_available().await {
                Ok(()) => spinner.finish_with_success(&format!("{} is available", provider.name())),
                Err(e) => {
                    spinner.finish_with_error(&format!("{} is not available", provider.name()));
                    return Err(e.into());
                }
            }
        }

        ProviderAction::Switch { name } => {
            let kind: ProviderKind = name.parse()?;
            file_config.provider.active = kind;
            file_config.save_to(config_path)?;
            console.success(&format!("Active provider set to {}", kind));
            console.hint("Restart resume-tailor for the change to take effect");
            if kind.is_hosted() && config.provider_config(kind)?.api_key.is_none() {
                console.hint(&format!(
                    "No API key found; set {}_API_KEY in your environment or .env file",
                    kind.id().to_uppercase()
                ));
            }
        }
    }

    Ok(())
}

fn config_command(
    action: Option<ConfigAction>,
    config: &Config,
    mut file_config: Config,
    config_path: &Path,
    console: &Console,
) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let mut shown = config.clone();
            for key in [&mut shown.provider.openai.api_key, &mut shown.provider.gemini.api_key] {
                if let Some(secret) = key.as_mut() {
                    *secret = cli::mask_secret(secret);
                }
            }
            console.info(&format!("Configuration ({})", config_path.display()));
            println!("{}", toml::to_string_pretty(&shown)?);
        }

        Some(ConfigAction::Path) => println!("{}", config_path.display()),

        Some(ConfigAction::Reset) => {
            Config::default().save_to(config_path)?;
            console.success("Configuration reset to defaults");
        }

        Some(ConfigAction::Set { key, value }) => {
            file_config.set_value(&key, &value)?;
            file_config.validate()?;
            file_config.save_to(config_path)?;
            console.success(&format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}
