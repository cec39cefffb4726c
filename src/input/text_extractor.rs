//! Plain-text extraction for job description and resume files

use crate::error::{Result, ResumeTailorError};
use once_cell::sync::Lazy;
use pulldown_cmark::{html, Parser};
use regex::Regex;
use std::path::Path;
use tokio::fs;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("Invalid HTML tag regex"));

pub trait TextExtractor {
    fn extract(&self, path: &Path) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path).await?;
        crate::processing::extract_text(&bytes).map_err(|e| match e {
            ResumeTailorError::UnreadableDocument(reason) => {
                ResumeTailorError::UnreadableDocument(format!("{}: {}", path.display(), reason))
            }
            other => ResumeTailorError::UnreadableDocument(format!("{}: {}", path.display(), other)),
        })
    }
}

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path).await?;

        let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
            ResumeTailorError::UnreadableDocument(format!(
                "Failed to extract text from PDF '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(text)
    }
}

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path).await?;
        String::from_utf8(bytes).map_err(|_| {
            ResumeTailorError::UnreadableDocument(format!("{} is not valid UTF-8 text", path.display()))
        })
    }
}

pub struct MarkdownExtractor;

impl TextExtractor for MarkdownExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let markdown_content = PlainTextExtractor.extract(path).await?;

        let parser = Parser::new(&markdown_content);
        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);

        Ok(html_to_text(&html_output))
    }
}

fn html_to_text(html: &str) -> String {
    let text = html
        .replace("<br />", "\n")
        .replace("</li>", "\n")
        .replace("</p>", "\n\n")
        .replace("&nbsp;", " ");

    let clean_text = HTML_TAG.replace_all(&text, "");
    let clean_text = clean_text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    clean_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, content: &[u8]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_html_to_text() {
        let text = html_to_text("<h1>Senior Engineer</h1>\n<ul>\n<li>Rust &amp; Go</li>\n<li>Kubernetes</li>\n</ul>\n");
        assert_eq!(text, "Senior Engineer\nRust & Go\nKubernetes");
    }

    #[tokio::test]
    async fn test_markdown_extraction() {
        let file = temp_file(".md", b"# Backend Engineer\n\nWe need **Rust** experience.\n\n- APIs\n- Postgres\n");
        let text = MarkdownExtractor.extract(file.path()).await.unwrap();
        assert_eq!(text, "Backend Engineer\nWe need Rust experience.\nAPIs\nPostgres");
    }

    #[tokio::test]
    async fn test_plain_text_rejects_binary() {
        let file = temp_file(".txt", &[0xff, 0xfe, 0x00, 0x81]);
        let err = PlainTextExtractor.extract(file.path()).await.unwrap_err();
        assert!(matches!(err, ResumeTailorError::UnreadableDocument(_)));
    }

    #[tokio::test]
    async fn test_corrupt_docx_is_unreadable() {
        let file = temp_file(".docx", b"PK not really a zip");
        let err = DocxExtractor.extract(file.path()).await.unwrap_err();
        assert!(matches!(err, ResumeTailorError::UnreadableDocument(_)));
    }
}
