//! Input manager: routes the job description and resume to their readers

use crate::error::{Result, ResumeTailorError};
use crate::input::file_detector::FileType;
use crate::input::text_extractor::{DocxExtractor, MarkdownExtractor, PdfExtractor, PlainTextExtractor, TextExtractor};
use crate::processing::{extract, FormattingFingerprint};
use log::info;
use std::path::Path;

/// The resume as read from disk: original bytes, visible text and the
/// formatting fingerprint.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub bytes: Vec<u8>,
    pub text: String,
    pub fingerprint: FormattingFingerprint,
}

impl ResumeDocument {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InputManager;

impl InputManager {
    pub fn new() -> Self {
        Self
    }

    /// Read the job description text from a `.docx`, `.txt`, `.md` or `.pdf`.
    pub async fn read_job_description(&self, path: &Path) -> Result<String> {
        Self::ensure_exists(path)?;

        let text = match FileType::from_path(path) {
            FileType::Docx => {
                info!("Extracting job description from Word document: {}", path.display());
                DocxExtractor.extract(path).await?
            }
            FileType::Pdf => {
                info!("Extracting job description from PDF: {}", path.display());
                PdfExtractor.extract(path).await?
            }
            FileType::Text => {
                info!("Reading job description text file: {}", path.display());
                PlainTextExtractor.extract(path).await?
            }
            FileType::Markdown => {
                info!("Processing job description markdown: {}", path.display());
                MarkdownExtractor.extract(path).await?
            }
            FileType::Unknown => {
                return Err(ResumeTailorError::UnsupportedFormat(format!(
                    "Unsupported job description type: {}",
                    path.display()
                )));
            }
        };

        if text.trim().is_empty() {
            return Err(ResumeTailorError::UnreadableDocument(format!(
                "{} contains no text",
                path.display()
            )));
        }
        Ok(text)
    }

    /// Read the resume package together with its fingerprint.
    pub async fn read_resume(&self, path: &Path) -> Result<ResumeDocument> {
        Self::ensure_exists(path)?;

        if !FileType::from_path(path).is_resume_format() {
            return Err(ResumeTailorError::UnsupportedFormat(format!(
                "Resume must be a .docx document: {}",
                path.display()
            )));
        }

        info!("Reading resume: {}", path.display());
        let bytes = tokio::fs::read(path).await?;
        let (text, fingerprint) = extract(&bytes).map_err(|e| match e {
            ResumeTailorError::UnreadableDocument(reason) => {
                ResumeTailorError::UnreadableDocument(format!("{}: {}", path.display(), reason))
            }
            other => ResumeTailorError::UnreadableDocument(format!("{}: {}", path.display(), other)),
        })?;

        if text.trim().is_empty() {
            return Err(ResumeTailorError::UnreadableDocument(format!(
                "{} contains no text",
                path.display()
            )));
        }

        Ok(ResumeDocument {
            bytes,
            text,
            fingerprint,
        })
    }

    fn ensure_exists(path: &Path) -> Result<()> {
        if path.is_file() {
            Ok(())
        } else {
            Err(ResumeTailorError::InvalidInput(format!(
                "File does not exist: {}",
                path.display()
            )))
        }
    }
}
