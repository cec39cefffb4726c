//! Formatting preservation scoring
//!
//! The produced document is extracted again and its text paragraphs are
//! compared pairwise, in order, with the text paragraphs of the source
//! fingerprint. Each pair is scored on paragraph properties, run formatting,
//! layout (spacing and indentation) and borders; a pair counts as preserved
//! at 0.95 or above.

use crate::error::Result;
use crate::processing::extractor::extract;
use crate::processing::fingerprint::{FormattingFingerprint, ParagraphFingerprint, RunStyle};
use log::debug;
use serde::{Deserialize, Serialize};

const PRESERVED_THRESHOLD: f32 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattingReport {
    /// Share of compared paragraphs that kept their formatting, 0.0 to 1.0
    pub overall_score: f32,
    pub paragraphs_compared: usize,
    pub paragraphs_preserved: usize,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl FormattingReport {
    pub fn rating(&self) -> &'static str {
        match self.overall_score {
            s if s >= 0.9 => "excellent",
            s if s >= 0.7 => "good",
            s if s >= 0.4 => "fair",
            _ => "poor",
        }
    }
}

/// Score `output` against the fingerprint of the source document.
pub fn validate(output: &[u8], source: &FormattingFingerprint) -> Result<FormattingReport> {
    let (_, produced) = extract(output)?;
    Ok(compare(source, &produced))
}

pub fn compare(source: &FormattingFingerprint, produced: &FormattingFingerprint) -> FormattingReport {
    let originals = source.paragraphs().iter().filter(|p| p.has_text());
    let outputs = produced.paragraphs().iter().filter(|p| p.has_text());

    let mut compared = 0;
    let mut preserved = 0;
    let mut issues = Vec::new();

    for (position, (original, output)) in originals.zip(outputs).enumerate() {
        let mut paragraph_issues = Vec::new();
        let checks = [
            check_properties(original, output, &mut paragraph_issues),
            check_runs(original, output, &mut paragraph_issues),
            check_layout(original, output, &mut paragraph_issues),
            check_borders(original, output, &mut paragraph_issues),
        ];
        let score = checks.iter().sum::<f32>() / checks.len() as f32;

        compared += 1;
        if score >= PRESERVED_THRESHOLD {
            preserved += 1;
        } else {
            issues.extend(
                paragraph_issues
                    .into_iter()
                    .map(|issue| format!("paragraph {}: {}", position + 1, issue)),
            );
        }
    }

    let overall_score = if compared > 0 {
        preserved as f32 / compared as f32
    } else {
        0.0
    };
    debug!(
        "Formatting preserved in {}/{} paragraphs ({:.1}%)",
        preserved,
        compared,
        overall_score * 100.0
    );

    let recommendations = recommendations(&issues);
    FormattingReport {
        overall_score,
        paragraphs_compared: compared,
        paragraphs_preserved: preserved,
        issues,
        recommendations,
    }
}

fn check_properties(original: &ParagraphFingerprint, output: &ParagraphFingerprint, issues: &mut Vec<String>) -> f32 {
    let (a, b) = (&original.style, &output.style);
    let mut score = 1.0f32;
    if a.style_id != b.style_id {
        score -= 0.3;
        issues.push("paragraph style changed".to_string());
    }
    if a.alignment != b.alignment {
        score -= 0.2;
        issues.push("alignment changed".to_string());
    }
    if a.numbering != b.numbering {
        score -= 0.3;
        issues.push("numbering changed".to_string());
    }
    if a.keep_next != b.keep_next {
        score -= 0.2;
        issues.push("keep-with-next changed".to_string());
    }
    score.max(0.0)
}

fn compare_run(a: &RunStyle, b: &RunStyle) -> (f32, Vec<&'static str>) {
    let mut score = 1.0f32;
    let mut differences = Vec::new();
    if a.bold != b.bold {
        score -= 0.3;
        differences.push("bold");
    }
    if a.italic != b.italic {
        score -= 0.3;
        differences.push("italic");
    }
    if a.font != b.font {
        score -= 0.2;
        differences.push("font");
    }
    if a.size_half_points != b.size_half_points {
        score -= 0.2;
        differences.push("font size");
    }
    if a.underline != b.underline || a.color != b.color || a.caps != b.caps {
        score -= 0.1;
        differences.push("run decoration");
    }
    (score.max(0.0), differences)
}

fn check_runs(original: &ParagraphFingerprint, output: &ParagraphFingerprint, issues: &mut Vec<String>) -> f32 {
    let text_runs = |p: &ParagraphFingerprint| -> Vec<RunStyle> {
        p.runs
            .iter()
            .filter(|r| !r.text.trim().is_empty())
            .map(|r| r.style.clone())
            .collect()
    };
    let (a, b) = (text_runs(original), text_runs(output));

    let mut score = 1.0f32;
    for (run_a, run_b) in a.iter().zip(b.iter()) {
        let (run_score, differences) = compare_run(run_a, run_b);
        score *= run_score;
        for difference in differences {
            issues.push(format!("{} differs", difference));
        }
    }
    score
}

fn check_layout(original: &ParagraphFingerprint, output: &ParagraphFingerprint, issues: &mut Vec<String>) -> f32 {
    let mut score = 1.0f32;
    if original.style.spacing != output.style.spacing {
        score -= 0.5;
        issues.push("spacing changed".to_string());
    }
    if original.style.indentation != output.style.indentation {
        score -= 0.5;
        issues.push("indentation changed".to_string());
    }
    score.max(0.0)
}

fn check_borders(original: &ParagraphFingerprint, output: &ParagraphFingerprint, issues: &mut Vec<String>) -> f32 {
    if original.style.borders == output.style.borders {
        1.0
    } else {
        issues.push("borders changed".to_string());
        0.5
    }
}

fn recommendations(issues: &[String]) -> Vec<String> {
    const HINTS: [(&str, &str); 7] = [
        ("alignment", "Keep the original paragraph alignment"),
        ("indentation", "Copy indentation values exactly from the original"),
        ("spacing", "Match line and paragraph spacing of the original"),
        ("borders", "Preserve paragraph borders and horizontal rules"),
        ("bold", "Apply bold formatting consistently"),
        ("italic", "Preserve italic formatting"),
        ("numbering", "Preserve original numbering and bullets"),
    ];

    let mut found: Vec<String> = HINTS
        .iter()
        .filter(|(pattern, _)| issues.iter().any(|issue| issue.contains(pattern)))
        .map(|(_, hint)| hint.to_string())
        .collect();
    if found.is_empty() {
        found.push("Formatting appears to be well preserved".to_string());
    }
    found
}
