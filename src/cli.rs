//! CLI interface for the resume tailor

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "resume-tailor")]
#[command(about = "Folder-watching resume tailoring that preserves Word formatting")]
#[command(
    long_about = "Watches a folder for a job description and CurrentResume.docx, asks an AI provider to tailor the resume, and writes TailoredResume.docx with the original formatting kept as closely as possible"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch a folder and tailor resumes as inputs arrive (default)
    Watch {
        /// Folder to watch, overriding the configuration
        #[arg(short, long)]
        folder: Option<PathBuf>,
    },

    /// Tailor one resume and exit
    Tailor {
        /// Job description (DOCX, TXT, MD, PDF)
        #[arg(short, long)]
        job: PathBuf,

        /// Resume (DOCX)
        #[arg(short, long)]
        resume: PathBuf,

        /// Output path; defaults to TailoredResume.docx next to the resume
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the text and formatting summary of a document
    Extract {
        /// Document to read
        file: PathBuf,

        /// Print the full formatting fingerprint as JSON
        #[arg(long)]
        json: bool,
    },

    /// AI provider commands
    Provider {
        #[command(subcommand)]
        action: ProviderAction,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ProviderAction {
    /// List providers and their configuration status
    List,

    /// Check that the active provider is reachable
    Check,

    /// Make another provider active (takes effect on restart)
    Switch {
        /// Provider name: ollama, openai or gemini
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Reset configuration to defaults
    Reset,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "watch.stable_polls")
        key: String,

        /// Configuration value
        value: String,
    },
}

/// Validate file extension
pub fn validate_file_extension(path: &std::path::Path, allowed_extensions: &[&str]) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            if allowed_extensions.contains(&ext.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "Unsupported file extension: .{}. Allowed: {}",
                    ext,
                    allowed_extensions.join(", ")
                ))
            }
        }
        None => Err("File has no extension".to_string()),
    }
}

/// Hide all but the last four characters of a credential.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::Path;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_watch_is_optional_default() {
        let cli = Cli::try_parse_from(["resume-tailor", "--verbose"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.verbose);
    }

    #[test]
    fn test_tailor_arguments() {
        let cli = Cli::try_parse_from([
            "resume-tailor",
            "tailor",
            "--job",
            "JD.pdf",
            "--resume",
            "CurrentResume.docx",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Tailor { job, resume, output }) => {
                assert_eq!(job, PathBuf::from("JD.pdf"));
                assert_eq!(resume, PathBuf::from("CurrentResume.docx"));
                assert!(output.is_none());
            }
            _ => panic!("expected tailor command"),
        }
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension(Path::new("a.DOCX"), &["docx"]).is_ok());
        assert!(validate_file_extension(Path::new("a.doc"), &["docx"]).is_err());
        assert!(validate_file_extension(Path::new("resume"), &["docx"]).is_err());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("sk-abcdef123456"), "****3456");
        assert_eq!(mask_secret("abc"), "****");
    }
}
