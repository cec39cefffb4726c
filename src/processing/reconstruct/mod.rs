//! Three-tier reconstruction of the tailored resume document

pub mod guided;
pub mod plain;
pub mod structural;

use crate::config::ReconstructionConfig;
use crate::error::{Result, ResumeTailorError};
use crate::processing::fingerprint::FormattingFingerprint;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    /// Original package rewritten in place
    Structural,
    /// Fresh package styled from the fingerprint
    Guided,
    /// Fresh package with fixed styling
    Plain,
}

impl Tier {
    pub fn number(&self) -> u8 {
        match self {
            Tier::Structural => 1,
            Tier::Guided => 2,
            Tier::Plain => 3,
        }
    }

    pub fn fidelity(&self) -> &'static str {
        match self {
            Tier::Structural => "high",
            Tier::Guided => "medium",
            Tier::Plain => "low",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Structural => "structural",
            Tier::Guided => "fingerprint-guided",
            Tier::Plain => "plain",
        };
        write!(f, "tier {} ({})", self.number(), name)
    }
}

#[derive(Debug, Clone)]
pub struct ReconstructionOutcome {
    pub tier: Tier,
    pub bytes: Vec<u8>,
    /// Why each higher tier was skipped, in order
    pub fallbacks: Vec<String>,
}

/// Tries the structural, guided and plain tiers in that order and returns
/// the first document produced.
#[derive(Debug, Clone, Default)]
pub struct TieredReconstructor {
    config: ReconstructionConfig,
}

impl TieredReconstructor {
    pub fn new(config: ReconstructionConfig) -> Self {
        Self { config }
    }

    pub fn reconstruct(
        &self,
        original: &[u8],
        fingerprint: &FormattingFingerprint,
        tailored_text: &str,
    ) -> Result<ReconstructionOutcome> {
        let mut fallbacks = Vec::new();

        match structural::reconstruct(original, fingerprint, tailored_text, &self.config) {
            Ok(bytes) => return Ok(Self::outcome(Tier::Structural, bytes, fallbacks)),
            Err(ResumeTailorError::StructuralMismatch(reason)) => {
                info!("Structural reconstruction not possible: {}", reason);
                fallbacks.push(reason);
            }
            Err(other) => return Err(other),
        }

        match guided::reconstruct(fingerprint, tailored_text) {
            Ok(bytes) => return Ok(Self::outcome(Tier::Guided, bytes, fallbacks)),
            Err(ResumeTailorError::EmptyFingerprint(reason)) => {
                info!("Fingerprint-guided reconstruction not possible: {}", reason);
                fallbacks.push(reason);
            }
            Err(other) => return Err(other),
        }

        let bytes = plain::reconstruct(tailored_text)?;
        Ok(Self::outcome(Tier::Plain, bytes, fallbacks))
    }

    fn outcome(tier: Tier, bytes: Vec<u8>, fallbacks: Vec<String>) -> ReconstructionOutcome {
        debug!("Reconstructed with {} ({} bytes)", tier, bytes.len());
        ReconstructionOutcome { tier, bytes, fallbacks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::docx::package::{DocxPackage, DOCUMENT_PART};
    use crate::processing::extractor::extract;
    use crate::processing::fingerprint::PageLayout;

    fn docx(body: &str) -> Vec<u8> {
        let document = format!(
            "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        DocxPackage::from_parts(vec![(DOCUMENT_PART.to_string(), document.into_bytes())])
            .to_bytes()
            .unwrap()
    }

    fn sample() -> (Vec<u8>, FormattingFingerprint) {
        let original = docx(concat!(
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>JANE DOE</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>EXPERIENCE</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Built services in Go</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Ran the on-call rotation</w:t></w:r></w:p>",
        ));
        let (_, fingerprint) = extract(&original).unwrap();
        (original, fingerprint)
    }

    #[test]
    fn test_structural_tier_first() {
        let (original, fingerprint) = sample();
        let outcome = TieredReconstructor::default()
            .reconstruct(&original, &fingerprint, "JANE DOE\nEXPERIENCE\nBuilt services in Rust\nLed on-call")
            .unwrap();
        assert_eq!(outcome.tier, Tier::Structural);
        assert!(outcome.fallbacks.is_empty());
    }

    #[test]
    fn test_guided_tier_after_mismatch() {
        let (original, fingerprint) = sample();
        let outcome = TieredReconstructor::default()
            .reconstruct(&original, &fingerprint, "Software Engineer, 5 years Python and Go")
            .unwrap();
        assert_eq!(outcome.tier, Tier::Guided);
        assert_eq!(outcome.fallbacks.len(), 1);

        let (text, rebuilt) = extract(&outcome.bytes).unwrap();
        assert_eq!(text, "Software Engineer, 5 years Python and Go");
        assert!(rebuilt.paragraphs()[0].runs[0].style.bold);
    }

    #[test]
    fn test_plain_tier_after_empty_fingerprint() {
        let fingerprint = FormattingFingerprint::new(Vec::new(), PageLayout::default(), None, None);
        let outcome = TieredReconstructor::default()
            .reconstruct(b"not a docx", &fingerprint, "EXPERIENCE\nBuilt things")
            .unwrap();
        assert_eq!(outcome.tier, Tier::Plain);
        assert_eq!(outcome.fallbacks.len(), 2);
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(Tier::Guided.to_string(), "tier 2 (fingerprint-guided)");
        assert_eq!(Tier::Plain.number(), 3);
    }
}
