//! Shared fixtures: small `.docx` packages and a scripted provider

#![allow(dead_code)]

use async_trait::async_trait;
use resume_tailor::error::{Result, ResumeTailorError};
use resume_tailor::llm::{PromptTemplates, RetryPolicy, TailoringProvider};
use resume_tailor::processing::docx::package::{DocxPackage, DOCUMENT_PART, STYLES_PART};
use resume_tailor::processing::TieredReconstructor;
use resume_tailor::watch::Pipeline;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub const STYLES_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">",
    "<w:style w:type=\"paragraph\" w:styleId=\"Heading1\"><w:name w:val=\"heading 1\"/></w:style>",
    "</w:styles>"
);

/// A resume with a centred bold name, a bordered section heading, a
/// subheading and two bullet paragraphs.
pub const RESUME_BODY: &str = concat!(
    "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr>",
    "<w:r><w:rPr><w:rFonts w:ascii=\"Georgia\" w:hAnsi=\"Georgia\"/><w:b/><w:sz w:val=\"36\"/></w:rPr><w:t>JANE DOE</w:t></w:r></w:p>",
    "<w:p><w:pPr><w:pStyle w:val=\"Heading1\"/><w:keepNext/>",
    "<w:pBdr><w:bottom w:val=\"single\" w:sz=\"6\" w:space=\"1\" w:color=\"auto\"/></w:pBdr>",
    "<w:spacing w:before=\"240\" w:after=\"60\"/></w:pPr>",
    "<w:r><w:rPr><w:b/></w:rPr><w:t>EXPERIENCE</w:t></w:r></w:p>",
    "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Engineer</w:t></w:r><w:r><w:t xml:space=\"preserve\"> | Acme Corp</w:t></w:r></w:p>",
    "<w:p><w:pPr><w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"1\"/></w:numPr><w:ind w:left=\"720\" w:hanging=\"360\"/></w:pPr>",
    "<w:r><w:t>Built billing services in Java</w:t></w:r></w:p>",
    "<w:p><w:pPr><w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"1\"/></w:numPr><w:ind w:left=\"720\" w:hanging=\"360\"/></w:pPr>",
    "<w:r><w:t>Ran the on-call rotation</w:t></w:r></w:p>",
    "<w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/>",
    "<w:pgMar w:top=\"1080\" w:right=\"1080\" w:bottom=\"1080\" w:left=\"1080\"/></w:sectPr>"
);

pub fn docx(body: &str) -> Vec<u8> {
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><w:document xmlns:w=\"{}\"><w:body>{}</w:body></w:document>",
        W_NS, body
    );
    DocxPackage::from_parts(vec![
        (DOCUMENT_PART.to_string(), document.into_bytes()),
        (STYLES_PART.to_string(), STYLES_XML.as_bytes().to_vec()),
    ])
    .to_bytes()
    .expect("fixture package")
}

pub fn resume_docx() -> Vec<u8> {
    docx(RESUME_BODY)
}

/// Provider that returns a fixed reply, or fails as unavailable.
pub struct ScriptedProvider {
    reply: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn replying(reply: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                reply: Some(reply.to_string()),
                calls: calls.clone(),
            },
            calls,
        )
    }

    pub fn unavailable() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                reply: None,
                calls: calls.clone(),
            },
            calls,
        )
    }

    pub fn call_count(calls: &Arc<AtomicUsize>) -> usize {
        calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TailoringProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    fn describe(&self) -> String {
        "scripted provider".to_string()
    }

    async fn complete(&self, _system_prompt: &str, _user_message: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| ResumeTailorError::provider_unavailable("scripted", "connection refused", true))
    }
}

pub fn pipeline(provider: ScriptedProvider) -> Pipeline {
    Pipeline::new(
        Box::new(provider),
        PromptTemplates::default(),
        RetryPolicy::single_attempt(),
        TieredReconstructor::default(),
    )
}
