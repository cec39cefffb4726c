//! The watched folder: input lookup, change signatures and archiving

use crate::config::WatchConfig;
use crate::error::Result;
use crate::input::JOB_DESCRIPTION_EXTENSIONS;
use chrono::{DateTime, Local};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The two input files of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPair {
    pub job_description: PathBuf,
    pub resume: PathBuf,
}

/// Size and modification time of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileSignature {
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl FileSignature {
    pub fn of(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            size: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

/// Identity of an input pair at one point in time. Any rewrite of either
/// file, or a switch to another job description format, changes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairSignature {
    pub job_description: PathBuf,
    pub job_file: FileSignature,
    pub resume_file: FileSignature,
}

#[derive(Debug, Clone)]
pub struct Inbox {
    folder: PathBuf,
    job_stem: String,
    resume_stem: String,
    output_filename: String,
    error_filename: String,
    archive_dir: String,
}

impl Inbox {
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            folder: config.folder.clone(),
            job_stem: config.job_description_stem.clone(),
            resume_stem: config.resume_stem.clone(),
            output_filename: config.output_filename.clone(),
            error_filename: config.error_filename.clone(),
            archive_dir: config.archive_dir.clone(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn job_stem(&self) -> &str {
        &self.job_stem
    }

    pub fn resume_stem(&self) -> &str {
        &self.resume_stem
    }

    pub fn output_filename(&self) -> &str {
        &self.output_filename
    }

    pub fn ensure_exists(&self) -> Result<()> {
        if !self.folder.is_dir() {
            info!("Creating watch folder {}", self.folder.display());
            std::fs::create_dir_all(&self.folder)?;
        }
        Ok(())
    }

    /// First `JD.<ext>` present, in `docx`, `txt`, `md`, `pdf` order.
    pub fn locate_job_description(&self) -> Option<PathBuf> {
        JOB_DESCRIPTION_EXTENSIONS
            .iter()
            .map(|ext| self.folder.join(format!("{}.{}", self.job_stem, ext)))
            .find(|path| path.is_file())
    }

    pub fn locate_resume(&self) -> Option<PathBuf> {
        let path = self.folder.join(format!("{}.docx", self.resume_stem));
        path.is_file().then_some(path)
    }

    pub fn locate_pair(&self) -> Option<InputPair> {
        Some(InputPair {
            job_description: self.locate_job_description()?,
            resume: self.locate_resume()?,
        })
    }

    pub fn signature(&self, pair: &InputPair) -> Result<PairSignature> {
        Ok(PairSignature {
            job_description: pair.job_description.clone(),
            job_file: FileSignature::of(&pair.job_description)?,
            resume_file: FileSignature::of(&pair.resume)?,
        })
    }

    pub fn output_path(&self) -> PathBuf {
        self.folder.join(&self.output_filename)
    }

    pub fn error_path(&self) -> PathBuf {
        self.folder.join(&self.error_filename)
    }

    /// Move both inputs to `<folder>/<archive_dir>/<timestamp>/`.
    pub fn archive(&self, pair: &InputPair, at: DateTime<Local>) -> Result<PathBuf> {
        let destination = self
            .folder
            .join(&self.archive_dir)
            .join(at.format("%Y%m%d-%H%M%S").to_string());
        std::fs::create_dir_all(&destination)?;

        for source in [&pair.job_description, &pair.resume] {
            if let Some(name) = source.file_name() {
                let target = destination.join(name);
                debug!("Archiving {} to {}", source.display(), target.display());
                std::fs::rename(source, &target)?;
            }
        }

        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn inbox(dir: &TempDir) -> Inbox {
        let mut config = Config::default().watch;
        config.folder = dir.path().to_path_buf();
        Inbox::new(&config)
    }

    #[test]
    fn test_locate_pair_needs_both_inputs() {
        let dir = TempDir::new().unwrap();
        let inbox = inbox(&dir);
        assert!(inbox.locate_pair().is_none());

        std::fs::write(dir.path().join("CurrentResume.docx"), b"resume").unwrap();
        assert!(inbox.locate_pair().is_none());

        std::fs::write(dir.path().join("JD.md"), b"# Role").unwrap();
        let pair = inbox.locate_pair().unwrap();
        assert_eq!(pair.job_description, dir.path().join("JD.md"));
        assert_eq!(pair.resume, dir.path().join("CurrentResume.docx"));
    }

    #[test]
    fn test_job_description_extension_order() {
        let dir = TempDir::new().unwrap();
        let inbox = inbox(&dir);
        std::fs::write(dir.path().join("JD.pdf"), b"pdf").unwrap();
        std::fs::write(dir.path().join("JD.txt"), b"text").unwrap();
        assert_eq!(inbox.locate_job_description(), Some(dir.path().join("JD.txt")));
    }

    #[test]
    fn test_signature_tracks_content_changes() {
        let dir = TempDir::new().unwrap();
        let inbox = inbox(&dir);
        std::fs::write(dir.path().join("JD.txt"), b"Rust").unwrap();
        std::fs::write(dir.path().join("CurrentResume.docx"), b"resume").unwrap();
        let pair = inbox.locate_pair().unwrap();

        let first = inbox.signature(&pair).unwrap();
        assert_eq!(first, inbox.signature(&pair).unwrap());

        std::fs::write(dir.path().join("JD.txt"), b"Rust and Go").unwrap();
        assert_ne!(first, inbox.signature(&pair).unwrap());
    }

    #[test]
    fn test_archive_moves_inputs() {
        let dir = TempDir::new().unwrap();
        let inbox = inbox(&dir);
        std::fs::write(dir.path().join("JD.txt"), b"Rust").unwrap();
        std::fs::write(dir.path().join("CurrentResume.docx"), b"resume").unwrap();
        let pair = inbox.locate_pair().unwrap();

        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let destination = inbox.archive(&pair, at).unwrap();

        assert_eq!(destination, dir.path().join("processed").join("20240309-140500"));
        assert!(destination.join("JD.txt").is_file());
        assert!(destination.join("CurrentResume.docx").is_file());
        assert!(inbox.locate_pair().is_none());
    }
}
