//! Operator-facing console output: status lines, run summaries and a
//! spinner for the provider call

use crate::config::OutputConfig;
use crate::watch::RunReport;
use colored::{Color, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct Console {
    use_colors: bool,
    show_spinner: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self {
            use_colors: true,
            show_spinner: true,
        }
    }
}

impl Console {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            use_colors: config.color_output,
            show_spinner: config.show_spinner,
        }
    }

    /// No colours and no spinner, for tests and piped output.
    pub fn plain() -> Self {
        Self {
            use_colors: false,
            show_spinner: false,
        }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn header(&self, title: &str) {
        let rule = "=".repeat(60);
        if self.use_colors {
            println!("{}", rule.magenta());
            println!("{}", title.magenta().bold());
            println!("{}", rule.magenta());
        } else {
            println!("{}\n{}\n{}", rule, title, rule);
        }
    }

    pub fn step(&self, message: &str) {
        println!("{}", self.colorize(message, Color::Blue));
    }

    pub fn info(&self, message: &str) {
        println!("{}", self.colorize(message, Color::Cyan));
    }

    pub fn hint(&self, message: &str) {
        println!("{}", self.colorize(message, Color::Yellow));
    }

    pub fn success(&self, message: &str) {
        println!("{}", self.colorize(message, Color::Green));
    }

    pub fn failure(&self, message: &str) {
        eprintln!("{}", self.colorize(message, Color::Red));
    }

    pub fn watch_instructions(&self, folder: &Path, job_stem: &str, resume_stem: &str, output: &str) {
        self.info("Instructions:");
        println!("1. Save your job description as '{}.docx' (or .txt, .md, .pdf)", job_stem);
        println!("2. Save your current resume as '{}.docx'", resume_stem);
        println!("3. Drop both files into: {}", folder.display());
        println!("4. Wait for '{}' to appear", output);
        println!("5. To process again: remove and re-add at least one input file");
        self.info("Press Ctrl+C to stop watching...");
    }

    pub fn run_summary(&self, report: &RunReport) {
        for line in self.format_run_summary(report) {
            println!("{}", line);
        }
    }

    pub fn format_run_summary(&self, report: &RunReport) -> Vec<String> {
        let mut lines = vec![
            self.colorize(
                &format!("SUCCESS! Tailored resume created: {}", report.output.display()),
                Color::Green,
            ),
            format!(
                "Reconstruction: {} [{} fidelity]",
                report.tier,
                report.tier.fidelity()
            ),
            format!(
                "Words: {} original, {} tailored",
                report.resume_words, report.tailored_words
            ),
        ];

        for reason in &report.fallbacks {
            lines.push(self.colorize(&format!("  skipped higher tier: {}", reason), Color::Yellow));
        }

        if let Some(formatting) = &report.formatting {
            lines.push(format!(
                "Formatting preserved: {:.0}% ({}/{} paragraphs, {})",
                formatting.overall_score * 100.0,
                formatting.paragraphs_preserved,
                formatting.paragraphs_compared,
                formatting.rating()
            ));
        }

        lines.push(format!("Completed in {:.1}s", report.elapsed.as_secs_f64()));
        lines
    }

    /// Spinner shown while a long call runs; hidden when disabled.
    pub fn spinner(&self, message: &str) -> Spinner {
        Spinner::new(message, self.show_spinner)
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    fn new(message: &str, visible: bool) -> Self {
        let pb = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        pb.set_message(message.to_string());
        if visible {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        Self { pb }
    }

    pub fn finish_with_success(&self, message: &str) {
        self.pb.finish_with_message(format!("✓ {}", message));
    }

    pub fn finish_with_error(&self, message: &str) {
        self.pb.abandon_with_message(format!("✗ {}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{FormattingReport, Tier};
    use std::path::PathBuf;

    fn report() -> RunReport {
        RunReport {
            tier: Tier::Guided,
            output: PathBuf::from("inbox/TailoredResume.docx"),
            resume_words: 420,
            tailored_words: 398,
            fallbacks: vec!["line count 12 differs from 30 slots".to_string()],
            formatting: Some(FormattingReport {
                overall_score: 0.75,
                paragraphs_compared: 12,
                paragraphs_preserved: 9,
                issues: Vec::new(),
                recommendations: Vec::new(),
            }),
            elapsed: Duration::from_millis(2500),
        }
    }

    #[test]
    fn test_run_summary_lines() {
        let lines = Console::plain().format_run_summary(&report());

        assert_eq!(lines[0], "SUCCESS! Tailored resume created: inbox/TailoredResume.docx");
        assert_eq!(lines[1], "Reconstruction: tier 2 (fingerprint-guided) [medium fidelity]");
        assert_eq!(lines[2], "Words: 420 original, 398 tailored");
        assert!(lines[3].contains("line count 12"));
        assert_eq!(lines[4], "Formatting preserved: 75% (9/12 paragraphs, good)");
        assert_eq!(lines[5], "Completed in 2.5s");
    }

    #[test]
    fn test_hidden_spinner_finishes() {
        let spinner = Console::plain().spinner("Tailoring");
        spinner.finish_with_success("done");
    }
}
