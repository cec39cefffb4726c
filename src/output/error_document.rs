//! `Error.docx`: a short Word document explaining why a run failed

use crate::error::Result;
use crate::processing::docx::DocumentBuilder;
use crate::processing::fingerprint::{PageLayout, ParagraphStyle, RunStyle};

const TITLE: &str = "Resume Tailoring Error";
const APOLOGY: &str = "We apologize, but there was an error processing your resume:";
const FOOTER: &str = "If the problem persists, please check the console for detailed error messages.";

/// Build the error document for a failed run. `job_stem` and `resume_stem`
/// are the configured input names.
pub fn build_error_document(message: &str, job_stem: &str, resume_stem: &str) -> Result<Vec<u8>> {
    let checklist = [
        format!(
            "Both {}.<docx|txt|md|pdf> and {}.docx are valid, readable documents",
            job_stem, resume_stem
        ),
        "The files contain readable text content".to_string(),
        "Your internet connection and API key (if using OpenAI or Gemini)".to_string(),
        "Ollama is running (if using the local provider)".to_string(),
        "Try again in a few moments".to_string(),
    ];

    let mut builder = DocumentBuilder::new();
    let body = ParagraphStyle::default();
    let blank: &[(RunStyle, String)] = &[];

    let title_style = ParagraphStyle {
        alignment: Some("center".to_string()),
        ..ParagraphStyle::default()
    };
    let title_run = RunStyle {
        bold: true,
        size_half_points: Some(32),
        ..RunStyle::default()
    };
    builder.push_paragraph(&title_style, &[(title_run, TITLE.to_string())])?;
    builder.push_paragraph(&body, blank)?;

    let bold = RunStyle {
        bold: true,
        ..RunStyle::default()
    };
    builder.push_paragraph(&body, &[(bold, APOLOGY.to_string())])?;
    builder.push_paragraph(&body, blank)?;
    builder.push_paragraph(&body, &[(RunStyle::default(), message.to_string())])?;
    builder.push_paragraph(&body, blank)?;
    builder.push_paragraph(&body, &[(RunStyle::default(), "Please check:".to_string())])?;

    for item in checklist {
        builder.push_paragraph(&body, &[(RunStyle::default(), format!("• {}", item))])?;
    }

    builder.push_paragraph(&body, blank)?;
    let italic = RunStyle {
        italic: true,
        ..RunStyle::default()
    };
    builder.push_paragraph(&body, &[(italic, FOOTER.to_string())])?;

    builder.finish(&PageLayout::default(), None, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::extract;

    #[test]
    fn test_error_document_content() {
        let bytes = build_error_document("openai provider unavailable: HTTP 503", "JD", "CurrentResume").unwrap();
        let (text, fingerprint) = extract(&bytes).unwrap();

        assert!(text.starts_with("Resume Tailoring Error\n"));
        assert!(text.contains("openai provider unavailable: HTTP 503"));
        assert!(text.contains("• Both JD.<docx|txt|md|pdf> and CurrentResume.docx"));

        let paragraphs = fingerprint.paragraphs();
        assert_eq!(paragraphs[0].style.alignment.as_deref(), Some("center"));
        assert!(paragraphs[2].runs[0].style.bold);
        assert!(paragraphs.last().unwrap().runs[0].style.italic);
    }
}
