//! Formatting fingerprint captured from a Word document
//!
//! A fingerprint is an ordered list of paragraph descriptors, each carrying
//! the paragraph's direct formatting and the formatting of each of its
//! runs. It is built once by the extractor and only read afterwards.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStyle {
    pub font: Option<String>,
    /// Size in half-points, as stored in `w:sz`
    pub size_half_points: Option<u32>,
    pub bold: bool,
    pub italic: bool,
    pub underline: Option<String>,
    pub caps: bool,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spacing {
    pub before: Option<String>,
    pub after: Option<String>,
    pub line: Option<String>,
    pub line_rule: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indentation {
    pub left: Option<String>,
    pub right: Option<String>,
    pub first_line: Option<String>,
    pub hanging: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Border {
    /// `top`, `bottom`, `left`, `right`, `between` or `bar`
    pub side: String,
    pub val: String,
    pub size: Option<String>,
    pub space: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Numbering {
    pub num_id: String,
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphStyle {
    pub style_id: Option<String>,
    pub alignment: Option<String>,
    pub spacing: Option<Spacing>,
    pub indentation: Option<Indentation>,
    pub borders: Vec<Border>,
    pub numbering: Option<Numbering>,
    pub keep_next: bool,
    /// Paragraph-mark run properties (`w:pPr/w:rPr`)
    pub mark_run: Option<RunStyle>,
}

impl ParagraphStyle {
    pub fn has_bottom_border(&self) -> bool {
        self.borders.iter().any(|b| b.side == "bottom" && b.val != "none" && b.val != "nil")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub text: String,
    pub style: RunStyle,
    /// Whether the run holds at least one `w:t`
    pub has_text_element: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphFingerprint {
    pub index: usize,
    pub text: String,
    pub style: ParagraphStyle,
    pub runs: Vec<RunFingerprint>,
    /// Nested inside another paragraph (text boxes)
    pub nested: bool,
    pub contains_drawing: bool,
    /// Carries a `w:sectPr`, so removing it would drop a section break
    pub has_section_break: bool,
    /// Empty paragraph whose only purpose is a rule line
    pub horizontal_rule: bool,
}

impl ParagraphFingerprint {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Safe to duplicate when surplus tailored lines need a home.
    pub fn is_cloneable(&self) -> bool {
        !self.nested && !self.contains_drawing && !self.has_section_break
    }

    pub fn run_styles(&self) -> impl Iterator<Item = &RunStyle> {
        self.runs.iter().map(|r| &r.style)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLayout {
    pub width: Option<String>,
    pub height: Option<String>,
    pub orientation: Option<String>,
    pub margin_top: Option<String>,
    pub margin_right: Option<String>,
    pub margin_bottom: Option<String>,
    pub margin_left: Option<String>,
}

impl PageLayout {
    pub fn is_empty(&self) -> bool {
        *self == PageLayout::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingFingerprint {
    paragraphs: Vec<ParagraphFingerprint>,
    page: PageLayout,
    #[serde(skip)]
    styles_part: Option<String>,
    #[serde(skip)]
    numbering_part: Option<String>,
}

impl FormattingFingerprint {
    pub(crate) fn new(
        paragraphs: Vec<ParagraphFingerprint>,
        page: PageLayout,
        styles_part: Option<String>,
        numbering_part: Option<String>,
    ) -> Self {
        Self {
            paragraphs,
            page,
            styles_part,
            numbering_part,
        }
    }

    pub fn paragraphs(&self) -> &[ParagraphFingerprint] {
        &self.paragraphs
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn page(&self) -> &PageLayout {
        &self.page
    }

    /// Raw `word/styles.xml` of the source document
    pub fn styles_part(&self) -> Option<&str> {
        self.styles_part.as_deref()
    }

    /// Raw `word/numbering.xml` of the source document
    pub fn numbering_part(&self) -> Option<&str> {
        self.numbering_part.as_deref()
    }

    pub fn text_paragraph_count(&self) -> usize {
        self.paragraphs.iter().filter(|p| p.has_text()).count()
    }

    /// Per-paragraph style sequence, in document order
    pub fn style_sequence(&self) -> Vec<&ParagraphStyle> {
        self.paragraphs.iter().map(|p| &p.style).collect()
    }

    pub fn run_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.runs.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(index: usize, text: &str) -> ParagraphFingerprint {
        ParagraphFingerprint {
            index,
            text: text.to_string(),
            style: ParagraphStyle::default(),
            runs: vec![RunFingerprint {
                text: text.to_string(),
                style: RunStyle::default(),
                has_text_element: true,
            }],
            nested: false,
            contains_drawing: false,
            has_section_break: false,
            horizontal_rule: false,
        }
    }

    #[test]
    fn test_counts() {
        let fingerprint = FormattingFingerprint::new(
            vec![paragraph(0, "JOHN DOE"), paragraph(1, "  "), paragraph(2, "Engineer")],
            PageLayout::default(),
            None,
            None,
        );

        assert_eq!(fingerprint.len(), 3);
        assert_eq!(fingerprint.text_paragraph_count(), 2);
        assert_eq!(fingerprint.run_count(), 3);
        assert_eq!(fingerprint.style_sequence().len(), 3);
    }

    #[test]
    fn test_bottom_border_detection() {
        let mut style = ParagraphStyle::default();
        assert!(!style.has_bottom_border());

        style.borders.push(Border {
            side: "bottom".to_string(),
            val: "single".to_string(),
            size: Some("6".to_string()),
            space: Some("1".to_string()),
            color: Some("auto".to_string()),
        });
        assert!(style.has_bottom_border());
    }

    #[test]
    fn test_cloneable() {
        let mut p = paragraph(0, "text");
        assert!(p.is_cloneable());
        p.has_section_break = true;
        assert!(!p.is_cloneable());
    }
}
