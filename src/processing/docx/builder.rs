//! WordprocessingML writer for freshly built documents

use crate::error::Result;
use crate::processing::docx::package::{DocxPackage, DOCUMENT_PART, NUMBERING_PART, STYLES_PART};
use crate::processing::fingerprint::{PageLayout, ParagraphStyle, RunStyle};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

const CONTENT_TYPES_HEAD: &str = concat!(
    "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
    "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
    "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
    "<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>",
    "<Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>",
);

const NUMBERING_CONTENT_TYPE: &str = "<Override PartName=\"/word/numbering.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml\"/>";

const PACKAGE_RELS: &str = concat!(
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>",
    "</Relationships>",
);

const DOCUMENT_RELS_HEAD: &str = concat!(
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>",
);

const NUMBERING_REL: &str = "<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering\" Target=\"numbering.xml\"/>";

/// Calibri 11pt body text
pub const DEFAULT_STYLES: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    "<w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">",
    "<w:docDefaults><w:rPrDefault><w:rPr>",
    "<w:rFonts w:ascii=\"Calibri\" w:hAnsi=\"Calibri\" w:eastAsia=\"Calibri\" w:cs=\"Calibri\"/>",
    "<w:sz w:val=\"22\"/><w:szCs w:val=\"22\"/>",
    "</w:rPr></w:rPrDefault>",
    "<w:pPrDefault><w:pPr><w:spacing w:after=\"120\" w:line=\"259\" w:lineRule=\"auto\"/></w:pPr></w:pPrDefault>",
    "</w:docDefaults>",
    "<w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\"><w:name w:val=\"Normal\"/><w:qFormat/></w:style>",
    "</w:styles>",
);

/// Builds `word/document.xml` paragraph by paragraph and wraps it into a
/// minimal package.
pub struct DocumentBuilder {
    writer: Writer<Vec<u8>>,
    paragraphs: usize,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            paragraphs: 0,
        }
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs
    }

    pub fn push_paragraph(&mut self, style: &ParagraphStyle, runs: &[(RunStyle, String)]) -> Result<()> {
        write_paragraph(&mut self.writer, style, runs)?;
        self.paragraphs += 1;
        Ok(())
    }

    /// Finish the document and package it. `styles` and `numbering` are the
    /// raw parts to carry over; without `styles` the default Calibri sheet
    /// is used.
    pub fn finish(self, page: &PageLayout, styles: Option<&str>, numbering: Option<&str>) -> Result<Vec<u8>> {
        let mut writer = self.writer;
        write_section_properties(&mut writer, page)?;
        let body = String::from_utf8_lossy(&writer.into_inner()).into_owned();

        let document = format!(
            "{}<w:document xmlns:w=\"{}\" xmlns:r=\"{}\"><w:body>{}</w:body></w:document>",
            XML_DECLARATION, W_NS, R_NS, body
        );

        let mut content_types = format!("{}{}", XML_DECLARATION, CONTENT_TYPES_HEAD);
        let mut document_rels = format!("{}{}", XML_DECLARATION, DOCUMENT_RELS_HEAD);
        if numbering.is_some() {
            content_types.push_str(NUMBERING_CONTENT_TYPE);
            document_rels.push_str(NUMBERING_REL);
        }
        content_types.push_str("</Types>");
        document_rels.push_str("</Relationships>");

        let mut parts = vec![
            ("[Content_Types].xml".to_string(), content_types.into_bytes()),
            ("_rels/.rels".to_string(), format!("{}{}", XML_DECLARATION, PACKAGE_RELS).into_bytes()),
            ("word/_rels/document.xml.rels".to_string(), document_rels.into_bytes()),
            (DOCUMENT_PART.to_string(), document.into_bytes()),
            (
                STYLES_PART.to_string(),
                styles.unwrap_or(DEFAULT_STYLES).as_bytes().to_vec(),
            ),
        ];
        if let Some(numbering) = numbering {
            parts.push((NUMBERING_PART.to_string(), numbering.as_bytes().to_vec()));
        }

        DocxPackage::from_parts(parts).to_bytes()
    }
}

pub(crate) fn empty_element(writer: &mut Writer<Vec<u8>>, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(name);
    for attribute in attributes {
        element.push_attribute(*attribute);
    }
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn start(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn optional_attributes<'a>(pairs: &[(&'a str, &'a Option<String>)]) -> Vec<(&'a str, &'a str)> {
    pairs
        .iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (*key, v)))
        .collect()
}

pub fn write_paragraph(writer: &mut Writer<Vec<u8>>, style: &ParagraphStyle, runs: &[(RunStyle, String)]) -> Result<()> {
    start(writer, "w:p")?;
    write_paragraph_properties(writer, style)?;
    for (run_style, text) in runs {
        write_run(writer, run_style, text)?;
    }
    end(writer, "w:p")
}

pub fn write_paragraph_properties(writer: &mut Writer<Vec<u8>>, style: &ParagraphStyle) -> Result<()> {
    if *style == ParagraphStyle::default() {
        return Ok(());
    }

    start(writer, "w:pPr")?;
    if let Some(style_id) = &style.style_id {
        empty_element(writer, "w:pStyle", &[("w:val", style_id)])?;
    }
    if style.keep_next {
        empty_element(writer, "w:keepNext", &[])?;
    }
    if let Some(numbering) = &style.numbering {
        start(writer, "w:numPr")?;
        empty_element(writer, "w:ilvl", &[("w:val", &numbering.level)])?;
        empty_element(writer, "w:numId", &[("w:val", &numbering.num_id)])?;
        end(writer, "w:numPr")?;
    }
    if !style.borders.is_empty() {
        start(writer, "w:pBdr")?;
        // Schema order: top, left, bottom, right, between, bar
        for side in ["top", "left", "bottom", "right", "between", "bar"] {
            for border in style.borders.iter().filter(|b| b.side == side) {
                let name = format!("w:{}", border.side);
                let mut attributes = vec![("w:val", border.val.as_str())];
                attributes.extend(optional_attributes(&[
                    ("w:sz", &border.size),
                    ("w:space", &border.space),
                    ("w:color", &border.color),
                ]));
                empty_element(writer, &name, &attributes)?;
            }
        }
        end(writer, "w:pBdr")?;
    }
    if let Some(spacing) = &style.spacing {
        let attributes = optional_attributes(&[
            ("w:before", &spacing.before),
            ("w:after", &spacing.after),
            ("w:line", &spacing.line),
            ("w:lineRule", &spacing.line_rule),
        ]);
        empty_element(writer, "w:spacing", &attributes)?;
    }
    if let Some(indentation) = &style.indentation {
        let attributes = optional_attributes(&[
            ("w:left", &indentation.left),
            ("w:right", &indentation.right),
            ("w:firstLine", &indentation.first_line),
            ("w:hanging", &indentation.hanging),
        ]);
        empty_element(writer, "w:ind", &attributes)?;
    }
    if let Some(alignment) = &style.alignment {
        empty_element(writer, "w:jc", &[("w:val", alignment)])?;
    }
    if let Some(mark) = &style.mark_run {
        write_run_properties(writer, mark)?;
    }
    end(writer, "w:pPr")
}

pub fn write_run_properties(writer: &mut Writer<Vec<u8>>, style: &RunStyle) -> Result<()> {
    if *style == RunStyle::default() {
        return Ok(());
    }

    start(writer, "w:rPr")?;
    if let Some(font) = &style.font {
        empty_element(
            writer,
            "w:rFonts",
            &[("w:ascii", font), ("w:hAnsi", font), ("w:cs", font)],
        )?;
    }
    if style.bold {
        empty_element(writer, "w:b", &[])?;
    }
    if style.italic {
        empty_element(writer, "w:i", &[])?;
    }
    if style.caps {
        empty_element(writer, "w:caps", &[])?;
    }
    if let Some(color) = &style.color {
        empty_element(writer, "w:color", &[("w:val", color)])?;
    }
    if let Some(size) = style.size_half_points {
        let size = size.to_string();
        empty_element(writer, "w:sz", &[("w:val", &size)])?;
        empty_element(writer, "w:szCs", &[("w:val", &size)])?;
    }
    if let Some(underline) = &style.underline {
        empty_element(writer, "w:u", &[("w:val", underline)])?;
    }
    end(writer, "w:rPr")
}

pub fn write_run(writer: &mut Writer<Vec<u8>>, style: &RunStyle, text: &str) -> Result<()> {
    start(writer, "w:r")?;
    write_run_properties(writer, style)?;
    write_text_elements(writer, text)?;
    end(writer, "w:r")
}

/// Drop characters that XML 1.0 does not allow in text.
pub fn xml_safe(text: &str) -> Cow<'_, str> {
    let allowed = |c: char| !c.is_control() || matches!(c, '\t' | '\n' | '\r');
    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| allowed(c)).collect())
    }
}

/// Emit `text` as `w:t` elements, with tabs as `w:tab`.
pub fn write_text_elements(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    let text = xml_safe(text);
    for (i, piece) in text.split('\t').enumerate() {
        if i > 0 {
            empty_element(writer, "w:tab", &[])?;
        }
        if piece.is_empty() && i > 0 {
            continue;
        }
        let mut element = BytesStart::new("w:t");
        element.push_attribute(("xml:space", "preserve"));
        writer.write_event(Event::Start(element))?;
        writer.write_event(Event::Text(BytesText::new(piece)))?;
        end(writer, "w:t")?;
    }
    Ok(())
}

fn write_section_properties(writer: &mut Writer<Vec<u8>>, page: &PageLayout) -> Result<()> {
    let letter = PageLayout {
        width: Some("12240".to_string()),
        height: Some("15840".to_string()),
        orientation: None,
        margin_top: Some("1440".to_string()),
        margin_right: Some("1440".to_string()),
        margin_bottom: Some("1440".to_string()),
        margin_left: Some("1440".to_string()),
    };
    let page = if page.is_empty() { &letter } else { page };

    start(writer, "w:sectPr")?;
    let size = optional_attributes(&[
        ("w:w", &page.width),
        ("w:h", &page.height),
        ("w:orient", &page.orientation),
    ]);
    if !size.is_empty() {
        empty_element(writer, "w:pgSz", &size)?;
    }
    let margins = optional_attributes(&[
        ("w:top", &page.margin_top),
        ("w:right", &page.margin_right),
        ("w:bottom", &page.margin_bottom),
        ("w:left", &page.margin_left),
    ]);
    if !margins.is_empty() {
        empty_element(writer, "w:pgMar", &margins)?;
    }
    end(writer, "w:sectPr")
}
