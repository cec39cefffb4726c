//! Polling folder watcher
//!
//! The watcher is a two-state machine. While `Idle` it polls the folder on
//! a fixed interval; once both inputs are present and their signature has
//! held for `stable_polls` consecutive polls it switches to `Processing`,
//! runs the pipeline inline and returns to `Idle`. Ticks that elapse during
//! a run are skipped.

use crate::config::WatchConfig;
use crate::error::Result;
use crate::output::{build_error_document, save_document, Console};
use crate::watch::inbox::{Inbox, PairSignature};
use crate::watch::pipeline::{Pipeline, RunReport};
use chrono::Local;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Processing,
}

/// What a single poll did.
#[derive(Debug)]
pub enum PollOutcome {
    /// One or both inputs are missing
    Waiting,
    /// Inputs present but still changing
    Settling { observed: u32, required: u32 },
    /// This exact pair was already handled
    AlreadyProcessed,
    Processed(RunReport),
    Failed(String),
}

pub struct FolderWatcher {
    inbox: Inbox,
    pipeline: Pipeline,
    console: Console,
    poll_interval: Duration,
    stable_polls: u32,
    write_error_document: bool,
    archive_inputs: bool,
    state: WatchState,
    pending: Option<(PairSignature, u32)>,
    processed: HashSet<PairSignature>,
}

impl FolderWatcher {
    pub fn new(config: &WatchConfig, poll_interval: Duration, pipeline: Pipeline, console: Console) -> Self {
        Self {
            inbox: Inbox::new(config),
            pipeline,
            console,
            poll_interval,
            stable_polls: config.stable_polls.max(1),
            write_error_document: config.write_error_document,
            archive_inputs: config.archive_inputs,
            state: WatchState::Idle,
            pending: None,
            processed: HashSet::new(),
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Poll until Ctrl-C.
    pub async fn run(&mut self) -> Result<()> {
        self.inbox.ensure_exists()?;
        info!(
            "Watching {} every {}ms",
            self.inbox.folder().display(),
            self.poll_interval.as_millis()
        );
        self.console.watch_instructions(
            self.inbox.folder(),
            self.inbox.job_stem(),
            self.inbox.resume_stem(),
            self.inbox.output_filename(),
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Interrupt received, stopping watcher");
                    self.console.hint("Stopping watcher...");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.poll().await {
                        warn!("Poll of {} failed: {}", self.inbox.folder().display(), e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Inspect the folder once and process the inputs if they are ready.
    pub async fn poll(&mut self) -> Result<PollOutcome> {
        let Some(pair) = self.inbox.locate_pair() else {
            self.pending = None;
            if !self.processed.is_empty() {
                self.processed.clear();
                self.console.hint("Input removed - ready for new files");
            }
            return Ok(PollOutcome::Waiting);
        };

        // A file can vanish between lookup and stat.
        let signature = match self.inbox.signature(&pair) {
            Ok(signature) => signature,
            Err(e) => {
                debug!("Inputs changed while polling: {}", e);
                self.pending = None;
                return Ok(PollOutcome::Waiting);
            }
        };

        if self.processed.contains(&signature) {
            return Ok(PollOutcome::AlreadyProcessed);
        }

        let observed = match &self.pending {
            Some((pending, count)) if *pending == signature => count + 1,
            _ => 1,
        };
        if observed < self.stable_polls {
            debug!("Inputs seen {}/{} times unchanged", observed, self.stable_polls);
            self.pending = Some((signature, observed));
            return Ok(PollOutcome::Settling {
                observed,
                required: self.stable_polls,
            });
        }

        self.pending = None;
        self.processed.insert(signature);
        self.state = WatchState::Processing;
        self.console.success("Both files detected! Starting resume tailoring...");

        let result = self
            .pipeline
            .run_files(&pair.job_description, &pair.resume, &self.inbox.output_path(), &self.console)
            .await;
        self.state = WatchState::Idle;

        let outcome = match result {
            Ok(report) => {
                self.console.run_summary(&report);
                if self.archive_inputs {
                    let destination = self.inbox.archive(&pair, Local::now())?;
                    self.console.info(&format!("Inputs moved to {}", destination.display()));
                }
                PollOutcome::Processed(report)
            }
            Err(e) => {
                error!("Processing failed: {}", e);
                self.console.failure(&format!("Error processing files: {}", e));
                if self.write_error_document {
                    self.save_error_document(&e.to_string());
                }
                PollOutcome::Failed(e.to_string())
            }
        };

        self.console
            .hint("Ready for next files (remove and re-add an input to process again)...");
        Ok(outcome)
    }

    fn save_error_document(&self, message: &str) {
        let path = self.inbox.error_path();
        let written = build_error_document(message, self.inbox.job_stem(), self.inbox.resume_stem())
            .and_then(|bytes| save_document(&bytes, &path));
        match written {
            Ok(()) => self
                .console
                .hint(&format!("Error details saved to: {}", path.display())),
            Err(e) => warn!("Could not write {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ResumeTailorError;
    use crate::llm::{PromptTemplates, RetryPolicy, TailoringProvider};
    use crate::processing::docx::package::{DocxPackage, DOCUMENT_PART};
    use crate::processing::TieredReconstructor;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct StubProvider {
        reply: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TailoringProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        fn describe(&self) -> String {
            "stub".to_string()
        }

        async fn complete(&self, _system: &str, _user: &str) -> crate::error::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .ok_or_else(|| ResumeTailorError::provider_unavailable("stub", "connection refused", false))
        }
    }

    fn resume_docx() -> Vec<u8> {
        let document = concat!(
            "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>",
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Jane Doe</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Engineer with Go experience</w:t></w:r></w:p>",
            "</w:body></w:document>"
        );
        DocxPackage::from_parts(vec![(DOCUMENT_PART.to_string(), document.as_bytes().to_vec())])
            .to_bytes()
            .unwrap()
    }

    fn watcher(dir: &Path, reply: Option<&str>, configure: impl FnOnce(&mut WatchConfig)) -> (FolderWatcher, Arc<AtomicUsize>) {
        let mut config = Config::default().watch;
        config.folder = dir.to_path_buf();
        configure(&mut config);

        let calls = Arc::new(AtomicUsize::new(0));
        let provider = StubProvider {
            reply: reply.map(str::to_string),
            calls: calls.clone(),
        };
        let pipeline = Pipeline::new(
            Box::new(provider),
            PromptTemplates::default(),
            RetryPolicy::single_attempt(),
            TieredReconstructor::default(),
        );
        (
            FolderWatcher::new(&config, Duration::from_millis(10), pipeline, Console::plain()),
            calls,
        )
    }

    fn drop_inputs(dir: &Path) {
        std::fs::write(dir.join("JD.txt"), "Looking for a Rust engineer").unwrap();
        std::fs::write(dir.join("CurrentResume.docx"), resume_docx()).unwrap();
    }

    #[tokio::test]
    async fn test_debounce_then_process_once() {
        let dir = TempDir::new().unwrap();
        let (mut watcher, calls) = watcher(dir.path(), Some("Jane Doe\nRust engineer"), |_| {});

        assert!(matches!(watcher.poll().await.unwrap(), PollOutcome::Waiting));

        drop_inputs(dir.path());
        assert!(matches!(
            watcher.poll().await.unwrap(),
            PollOutcome::Settling { observed: 1, required: 2 }
        ));

        let PollOutcome::Processed(report) = watcher.poll().await.unwrap() else {
            panic!("expected a processed run");
        };
        assert_eq!(report.output, dir.path().join("TailoredResume.docx"));
        assert!(report.output.is_file());
        assert_eq!(watcher.state(), WatchState::Idle);

        assert!(matches!(watcher.poll().await.unwrap(), PollOutcome::AlreadyProcessed));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_removing_input_allows_reprocessing() {
        let dir = TempDir::new().unwrap();
        let (mut watcher, calls) = watcher(dir.path(), Some("Jane Doe\nRust engineer"), |c| c.stable_polls = 1);

        drop_inputs(dir.path());
        assert!(matches!(watcher.poll().await.unwrap(), PollOutcome::Processed(_)));

        std::fs::remove_file(dir.path().join("JD.txt")).unwrap();
        assert!(matches!(watcher.poll().await.unwrap(), PollOutcome::Waiting));

        std::fs::write(dir.path().join("JD.txt"), "Looking for a Rust engineer").unwrap();
        assert!(matches!(watcher.poll().await.unwrap(), PollOutcome::Processed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_run_is_not_retried_and_writes_no_output() {
        let dir = TempDir::new().unwrap();
        let (mut watcher, calls) = watcher(dir.path(), None, |c| {
            c.stable_polls = 1;
            c.write_error_document = true;
        });

        drop_inputs(dir.path());
        assert!(matches!(watcher.poll().await.unwrap(), PollOutcome::Failed(_)));
        assert!(matches!(watcher.poll().await.unwrap(), PollOutcome::AlreadyProcessed));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(!dir.path().join("TailoredResume.docx").exists());
        assert!(dir.path().join("Error.docx").is_file());
        assert!(dir.path().join("JD.txt").is_file());
        assert!(dir.path().join("CurrentResume.docx").is_file());
    }

    #[tokio::test]
    async fn test_archive_after_success() {
        let dir = TempDir::new().unwrap();
        let (mut watcher, _) = watcher(dir.path(), Some("Jane Doe\nRust engineer"), |c| {
            c.stable_polls = 1;
            c.archive_inputs = true;
        });

        drop_inputs(dir.path());
        assert!(matches!(watcher.poll().await.unwrap(), PollOutcome::Processed(_)));
        assert!(!dir.path().join("JD.txt").exists());
        assert!(dir.path().join("processed").is_dir());
        assert!(matches!(watcher.poll().await.unwrap(), PollOutcome::Waiting));
    }
}
