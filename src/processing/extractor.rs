//! Text and formatting extraction from `.docx` packages

use crate::error::{Result, ResumeTailorError};
use crate::processing::docx::package::{DocxPackage, NUMBERING_PART, STYLES_PART};
use crate::processing::fingerprint::{
    Border, FormattingFingerprint, Indentation, Numbering, PageLayout, ParagraphFingerprint, ParagraphStyle,
    RunFingerprint, RunStyle, Spacing,
};
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Alternate-content fallbacks duplicate the text of their `mc:Choice`
/// sibling, so their paragraphs are not enumerated.
pub(crate) const FALLBACK_ELEMENT: &[u8] = b"mc:Fallback";

/// Extract the visible text and the formatting fingerprint of a `.docx`.
///
/// Paragraphs are taken in the order their start tags appear, so a text box
/// paragraph comes after the paragraph that anchors it.
pub fn extract(bytes: &[u8]) -> Result<(String, FormattingFingerprint)> {
    let package = DocxPackage::from_bytes(bytes)?;
    let document = package.document_xml()?;

    let (paragraphs, page) = parse_document(document)?;
    let text = paragraphs
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    debug!(
        "Extracted {} paragraphs ({} with text), {} characters",
        paragraphs.len(),
        paragraphs.iter().filter(|p| p.has_text()).count(),
        text.len()
    );

    let styles = package.part_str(STYLES_PART)?.map(str::to_string);
    let numbering = package.part_str(NUMBERING_PART)?.map(str::to_string);

    Ok((text, FormattingFingerprint::new(paragraphs, page, styles, numbering)))
}

/// Extract only the plain text of a `.docx`.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    extract(bytes).map(|(text, _)| text)
}

struct OpenRun {
    text: String,
    style: RunStyle,
    has_text_element: bool,
}

struct OpenParagraph {
    index: usize,
    text: String,
    style: ParagraphStyle,
    runs: Vec<RunFingerprint>,
    run: Option<OpenRun>,
    nested: bool,
    contains_drawing: bool,
    has_section_break: bool,
}

impl OpenParagraph {
    fn finish(mut self) -> ParagraphFingerprint {
        self.close_run();
        if self
            .style
            .numbering
            .as_ref()
            .is_some_and(|n| n.num_id.is_empty())
        {
            self.style.numbering = None;
        }
        if self.style.mark_run.as_ref() == Some(&RunStyle::default()) {
            self.style.mark_run = None;
        }
        let horizontal_rule = self.text.trim().is_empty() && self.style.has_bottom_border();
        ParagraphFingerprint {
            index: self.index,
            text: self.text,
            style: self.style,
            runs: self.runs,
            nested: self.nested,
            contains_drawing: self.contains_drawing,
            has_section_break: self.has_section_break,
            horizontal_rule,
        }
    }

    fn close_run(&mut self) {
        if let Some(run) = self.run.take() {
            self.runs.push(RunFingerprint {
                text: run.text,
                style: run.style,
                has_text_element: run.has_text_element,
            });
        }
    }

    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }
}

#[derive(Default)]
struct ExtractState {
    path: Vec<Vec<u8>>,
    open: Vec<OpenParagraph>,
    done: Vec<ParagraphFingerprint>,
    page: PageLayout,
    next_index: usize,
    fallback_depth: usize,
}

impl ExtractState {
    fn parent(&self) -> &[u8] {
        self.path.last().map(Vec::as_slice).unwrap_or(b"")
    }

    fn grandparent(&self) -> &[u8] {
        match self.path.len() {
            n if n >= 2 => self.path[n - 2].as_slice(),
            _ => &[],
        }
    }

    fn open_element(&mut self, e: &BytesStart) {
        let name = e.name();
        let name = name.as_ref();

        if self.fallback_depth > 0 {
            return;
        }

        match name {
            b"w:p" => {
                let nested = !self.open.is_empty();
                self.open.push(OpenParagraph {
                    index: self.next_index,
                    text: String::new(),
                    style: ParagraphStyle::default(),
                    runs: Vec::new(),
                    run: None,
                    nested,
                    contains_drawing: false,
                    has_section_break: false,
                });
                self.next_index += 1;
                return;
            }
            b"w:r" => {
                if let Some(paragraph) = self.open.last_mut() {
                    paragraph.close_run();
                    paragraph.run = Some(OpenRun {
                        text: String::new(),
                        style: RunStyle::default(),
                        has_text_element: false,
                    });
                }
                return;
            }
            _ => {}
        }

        let parent = self.parent().to_vec();
        let grandparent = self.grandparent().to_vec();

        if parent == b"w:sectPr" && grandparent == b"w:body" {
            read_page_layout(name, e, &mut self.page);
            return;
        }

        let Some(paragraph) = self.open.last_mut() else {
            return;
        };

        match (name, parent.as_slice()) {
            (b"w:t", b"w:r") => {
                if let Some(run) = paragraph.run.as_mut() {
                    run.has_text_element = true;
                }
            }
            (b"w:tab", b"w:r") => paragraph.push_text("\t"),
            (b"w:br", b"w:r") | (b"w:cr", b"w:r") => paragraph.push_text(" "),
            (b"w:drawing", _) | (b"w:pict", _) | (b"w:object", _) => paragraph.contains_drawing = true,
            (b"w:sectPr", b"w:pPr") => paragraph.has_section_break = true,
            (_, b"w:rPr") if grandparent == b"w:r" => {
                if let Some(run) = paragraph.run.as_mut() {
                    read_run_property(name, e, &mut run.style);
                }
            }
            (_, b"w:rPr") if grandparent == b"w:pPr" => {
                let mark = paragraph.style.mark_run.get_or_insert_with(RunStyle::default);
                read_run_property(name, e, mark);
            }
            (_, b"w:pPr") if grandparent == b"w:p" => read_paragraph_property(name, e, &mut paragraph.style),
            (_, b"w:numPr") if grandparent == b"w:pPr" => {
                let numbering = paragraph.style.numbering.get_or_insert_with(|| Numbering {
                    num_id: String::new(),
                    level: "0".to_string(),
                });
                match name {
                    b"w:ilvl" => {
                        if let Some(level) = attribute(e, "w:val") {
                            numbering.level = level;
                        }
                    }
                    b"w:numId" => {
                        if let Some(num_id) = attribute(e, "w:val") {
                            numbering.num_id = num_id;
                        }
                    }
                    _ => {}
                }
            }
            (_, b"w:pBdr") if grandparent == b"w:pPr" => {
                let side = String::from_utf8_lossy(name.strip_prefix(b"w:").unwrap_or(name)).into_owned();
                paragraph.style.borders.push(Border {
                    side,
                    val: attribute(e, "w:val").unwrap_or_else(|| "single".to_string()),
                    size: attribute(e, "w:sz"),
                    space: attribute(e, "w:space"),
                    color: attribute(e, "w:color"),
                });
            }
            _ => {}
        }
    }

    fn close_element(&mut self, name: &[u8]) {
        if self.fallback_depth > 0 {
            return;
        }
        match name {
            b"w:p" => {
                if let Some(paragraph) = self.open.pop() {
                    self.done.push(paragraph.finish());
                }
            }
            b"w:r" => {
                if let Some(paragraph) = self.open.last_mut() {
                    paragraph.close_run();
                }
            }
            _ => {}
        }
    }
}

fn parse_document(xml: &str) -> Result<(Vec<ParagraphFingerprint>, PageLayout)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut state = ExtractState::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                state.open_element(&e);
                if e.name().as_ref() == FALLBACK_ELEMENT {
                    state.fallback_depth += 1;
                }
                state.path.push(e.name().as_ref().to_vec());
            }
            Ok(Event::Empty(e)) => {
                state.open_element(&e);
                state.close_element(e.name().as_ref());
            }
            Ok(Event::End(e)) => {
                state.path.pop();
                state.close_element(e.name().as_ref());
                if e.name().as_ref() == FALLBACK_ELEMENT {
                    state.fallback_depth = state.fallback_depth.saturating_sub(1);
                }
            }
            Ok(Event::Text(t)) => {
                if state.fallback_depth == 0 && state.parent() == b"w:t" {
                    let text = t
                        .unescape()
                        .map_err(|e| ResumeTailorError::UnreadableDocument(format!("malformed text: {}", e)))?;
                    if let Some(paragraph) = state.open.last_mut() {
                        paragraph.push_text(&text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ResumeTailorError::UnreadableDocument(format!(
                    "malformed document.xml at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if !state.open.is_empty() {
        return Err(ResumeTailorError::UnreadableDocument(
            "document.xml ends inside a paragraph".to_string(),
        ));
    }

    let mut paragraphs = state.done;
    paragraphs.sort_by_key(|p| p.index);
    Ok((paragraphs, state.page))
}

pub(crate) fn attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// `<w:b/>` is on, `<w:b w:val="0"/>` is off.
fn toggle(e: &BytesStart) -> bool {
    !matches!(attribute(e, "w:val").as_deref(), Some("0") | Some("false") | Some("off"))
}

fn read_run_property(name: &[u8], e: &BytesStart, style: &mut RunStyle) {
    match name {
        b"w:rFonts" => {
            if let Some(font) = attribute(e, "w:ascii")
                .or_else(|| attribute(e, "w:hAnsi"))
                .or_else(|| attribute(e, "w:cs"))
            {
                style.font = Some(font);
            }
        }
        b"w:b" => style.bold = toggle(e),
        b"w:i" => style.italic = toggle(e),
        b"w:caps" => style.caps = toggle(e),
        b"w:u" => {
            style.underline = attribute(e, "w:val").filter(|v| v != "none");
        }
        b"w:color" => style.color = attribute(e, "w:val"),
        b"w:sz" => style.size_half_points = attribute(e, "w:val").and_then(|v| v.parse().ok()),
        _ => {}
    }
}

fn read_paragraph_property(name: &[u8], e: &BytesStart, style: &mut ParagraphStyle) {
    match name {
        b"w:pStyle" => style.style_id = attribute(e, "w:val"),
        b"w:jc" => style.alignment = attribute(e, "w:val"),
        b"w:keepNext" => style.keep_next = toggle(e),
        b"w:spacing" => {
            style.spacing = Some(Spacing {
                before: attribute(e, "w:before"),
                after: attribute(e, "w:after"),
                line: attribute(e, "w:line"),
                line_rule: attribute(e, "w:lineRule"),
            })
        }
        b"w:ind" => {
            style.indentation = Some(Indentation {
                left: attribute(e, "w:left").or_else(|| attribute(e, "w:start")),
                right: attribute(e, "w:right").or_else(|| attribute(e, "w:end")),
                first_line: attribute(e, "w:firstLine"),
                hanging: attribute(e, "w:hanging"),
            })
        }
        _ => {}
    }
}

fn read_page_layout(name: &[u8], e: &BytesStart, page: &mut PageLayout) {
    match name {
        b"w:pgSz" => {
            page.width = attribute(e, "w:w");
            page.height = attribute(e, "w:h");
            page.orientation = attribute(e, "w:orient");
        }
        b"w:pgMar" => {
            page.margin_top = attribute(e, "w:top");
            page.margin_right = attribute(e, "w:right");
            page.margin_bottom = attribute(e, "w:bottom");
            page.margin_left = attribute(e, "w:left");
        }
        _ => {}
    }
}
