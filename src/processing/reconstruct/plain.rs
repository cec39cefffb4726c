//! Fixed-style fallback document

use crate::error::Result;
use crate::processing::classify::{strip_bullet, LineKind};
use crate::processing::docx::DocumentBuilder;
use crate::processing::fingerprint::{Border, Indentation, PageLayout, ParagraphStyle, RunStyle, Spacing};

const FONT: &str = "Calibri";
const BODY_SIZE: u32 = 22;
const SUBHEADING_SIZE: u32 = 24;
const HEADING_SIZE: u32 = 28;

fn spacing(before: &str, after: &str) -> Option<Spacing> {
    Some(Spacing {
        before: Some(before.to_string()),
        after: Some(after.to_string()),
        ..Spacing::default()
    })
}

fn run_style(size: u32, bold: bool) -> RunStyle {
    RunStyle {
        font: Some(FONT.to_string()),
        size_half_points: Some(size),
        bold,
        ..RunStyle::default()
    }
}

/// Paragraph and run styling for one line kind.
pub fn style_for(kind: LineKind) -> (ParagraphStyle, RunStyle) {
    match kind {
        LineKind::SectionHeading => (
            ParagraphStyle {
                spacing: spacing("240", "60"),
                borders: vec![Border {
                    side: "bottom".to_string(),
                    val: "single".to_string(),
                    size: Some("6".to_string()),
                    space: Some("1".to_string()),
                    color: Some("auto".to_string()),
                }],
                keep_next: true,
                ..ParagraphStyle::default()
            },
            run_style(HEADING_SIZE, true),
        ),
        LineKind::Subheading => (
            ParagraphStyle {
                spacing: spacing("120", "40"),
                keep_next: true,
                ..ParagraphStyle::default()
            },
            run_style(SUBHEADING_SIZE, true),
        ),
        LineKind::Bullet => (
            ParagraphStyle {
                spacing: spacing("0", "40"),
                indentation: Some(Indentation {
                    left: Some("360".to_string()),
                    hanging: Some("360".to_string()),
                    ..Indentation::default()
                }),
                ..ParagraphStyle::default()
            },
            run_style(BODY_SIZE, false),
        ),
        LineKind::Body | LineKind::Blank => (
            ParagraphStyle {
                spacing: spacing("0", "80"),
                ..ParagraphStyle::default()
            },
            run_style(BODY_SIZE, false),
        ),
    }
}

/// Build a document from `text` with fixed styling. Blank lines are dropped.
pub fn reconstruct(text: &str) -> Result<Vec<u8>> {
    let mut builder = DocumentBuilder::new();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let kind = LineKind::of_line(line);
        let (paragraph, run) = style_for(kind);
        let content = match kind {
            LineKind::Bullet => format!("•\t{}", strip_bullet(line)),
            _ => line.to_string(),
        };
        builder.push_paragraph(&paragraph, &[(run, content)])?;
    }

    builder.finish(&PageLayout::default(), None, None)
}
