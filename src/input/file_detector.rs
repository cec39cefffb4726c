//! File type detection

use std::path::Path;

/// Extensions accepted for the job description, in lookup order.
pub const JOB_DESCRIPTION_EXTENSIONS: [&str; 4] = ["docx", "txt", "md", "pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Docx,
    Pdf,
    Text,
    Markdown,
    Unknown,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "docx" => FileType::Docx,
            "pdf" => FileType::Pdf,
            "txt" => FileType::Text,
            "md" | "markdown" => FileType::Markdown,
            _ => FileType::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(FileType::Unknown)
    }

    /// Only word-processing documents carry the formatting a resume needs.
    pub fn is_resume_format(&self) -> bool {
        matches!(self, FileType::Docx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(FileType::from_extension("DOCX"), FileType::Docx);
        assert_eq!(FileType::from_extension("markdown"), FileType::Markdown);
        assert_eq!(FileType::from_extension("doc"), FileType::Unknown);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(FileType::from_path(Path::new("inbox/JD.pdf")), FileType::Pdf);
        assert_eq!(FileType::from_path(Path::new("README")), FileType::Unknown);
        assert!(FileType::from_path(Path::new("CurrentResume.docx")).is_resume_format());
        assert!(!FileType::Text.is_resume_format());
    }
}
