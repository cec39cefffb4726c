//! Fresh document styled paragraph by paragraph from the fingerprint

use crate::error::{Result, ResumeTailorError};
use crate::processing::alignment::distribute_text;
use crate::processing::docx::DocumentBuilder;
use crate::processing::fingerprint::{FormattingFingerprint, ParagraphFingerprint, RunStyle};

/// Build a new package where line `k` of `text` takes the paragraph and run
/// styles of fingerprint paragraph `k`. Lines past the end reuse the last
/// paragraph that has text. Identical inputs give identical bytes.
pub fn reconstruct(fingerprint: &FormattingFingerprint, text: &str) -> Result<Vec<u8>> {
    if fingerprint.is_empty() {
        return Err(ResumeTailorError::EmptyFingerprint("document has no paragraphs".to_string()));
    }
    let Some(last_text) = fingerprint.paragraphs().iter().rev().find(|p| p.has_text()) else {
        return Err(ResumeTailorError::EmptyFingerprint(
            "no paragraph in the document carries text".to_string(),
        ));
    };

    build(fingerprint, last_text, text).map_err(|e| match e {
        ResumeTailorError::EmptyFingerprint(reason) => ResumeTailorError::EmptyFingerprint(reason),
        other => ResumeTailorError::EmptyFingerprint(other.to_string()),
    })
}

fn build(fingerprint: &FormattingFingerprint, last_text: &ParagraphFingerprint, text: &str) -> Result<Vec<u8>> {
    let mut builder = DocumentBuilder::new();

    for (k, line) in text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let source = fingerprint.paragraphs().get(k).unwrap_or(last_text);
        builder.push_paragraph(&source.style, &styled_runs(source, line))?;
    }

    builder.finish(fingerprint.page(), fingerprint.styles_part(), fingerprint.numbering_part())
}

/// Spread `line` over the source paragraph's text runs, keeping each run's
/// style.
fn styled_runs(source: &ParagraphFingerprint, line: &str) -> Vec<(RunStyle, String)> {
    if line.is_empty() {
        return Vec::new();
    }

    let text_runs: Vec<_> = source
        .runs
        .iter()
        .filter(|run| run.has_text_element || !run.text.is_empty())
        .collect();

    if text_runs.is_empty() {
        let style = source
            .runs
            .first()
            .map(|run| run.style.clone())
            .or_else(|| source.style.mark_run.clone())
            .unwrap_or_default();
        return vec![(style, line.to_string())];
    }

    let originals: Vec<&str> = text_runs.iter().map(|run| run.text.as_str()).collect();
    text_runs
        .iter()
        .zip(distribute_text(&originals, line))
        .filter(|(_, piece)| !piece.is_empty())
        .map(|(run, piece)| (run.style.clone(), piece))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::extractor::extract;
    use crate::processing::fingerprint::{PageLayout, ParagraphStyle, RunFingerprint};

    fn paragraph(index: usize, text: &str, style_id: Option<&str>, bold: bool) -> ParagraphFingerprint {
        ParagraphFingerprint {
            index,
            text: text.to_string(),
            style: ParagraphStyle {
                style_id: style_id.map(str::to_string),
                ..ParagraphStyle::default()
            },
            runs: vec![RunFingerprint {
                text: text.to_string(),
                style: RunStyle {
                    bold,
                    ..RunStyle::default()
                },
                has_text_element: !text.is_empty(),
            }],
            nested: false,
            contains_drawing: false,
            has_section_break: false,
            horizontal_rule: false,
        }
    }

    fn fingerprint() -> FormattingFingerprint {
        FormattingFingerprint::new(
            vec![
                paragraph(0, "JANE DOE", Some("Title"), true),
                paragraph(1, "", None, false),
                paragraph(2, "Engineer", Some("ListParagraph"), false),
            ],
            PageLayout {
                width: Some("11906".to_string()),
                height: Some("16838".to_string()),
                ..PageLayout::default()
            },
            None,
            None,
        )
    }

    #[test]
    fn test_lines_take_paragraph_styles() {
        let bytes = reconstruct(&fingerprint(), "JOHN ROE\n\nStaff Engineer\nRust, Go").unwrap();
        let (text, rebuilt) = extract(&bytes).unwrap();

        assert_eq!(text, "JOHN ROE\n\nStaff Engineer\nRust, Go");
        let ids: Vec<Option<&str>> = rebuilt
            .paragraphs()
            .iter()
            .map(|p| p.style.style_id.as_deref())
            .collect();
        assert_eq!(ids, vec![Some("Title"), None, Some("ListParagraph"), Some("ListParagraph")]);
        assert!(rebuilt.paragraphs()[0].runs[0].style.bold);
        assert_eq!(rebuilt.page().width.as_deref(), Some("11906"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let a = reconstruct(&fingerprint(), "JOHN ROE\nEngineer").unwrap();
        let b = reconstruct(&fingerprint(), "JOHN ROE\nEngineer").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_fingerprint() {
        let empty = FormattingFingerprint::new(Vec::new(), PageLayout::default(), None, None);
        assert!(matches!(
            reconstruct(&empty, "text"),
            Err(ResumeTailorError::EmptyFingerprint(_))
        ));

        let blank = FormattingFingerprint::new(
            vec![paragraph(0, "", None, false)],
            PageLayout::default(),
            None,
            None,
        );
        assert!(matches!(
            reconstruct(&blank, "text"),
            Err(ResumeTailorError::EmptyFingerprint(_))
        ));
    }
}
