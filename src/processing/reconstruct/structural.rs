//! In-place rewrite of the source package
//!
//! `word/document.xml` is replayed event by event. Paragraph and run
//! properties pass through untouched; only the text children of runs
//! (`w:t`, `w:tab`, `w:cr`, plain `w:br`) are replaced. Spare paragraphs are
//! dropped when they sit directly in the body, and blanked otherwise.
//! Every other part of the package is copied byte for byte.

use crate::config::ReconstructionConfig;
use crate::error::{Result, ResumeTailorError};
use crate::processing::alignment::{align, distribute_text, tailored_lines, Alignment, Insertion};
use crate::processing::classify::strip_bullet;
use crate::processing::docx::builder::xml_safe;
use crate::processing::docx::package::{DocxPackage, DOCUMENT_PART};
use crate::processing::extractor::{attribute, FALLBACK_ELEMENT};
use crate::processing::fingerprint::{FormattingFingerprint, ParagraphFingerprint};
use log::debug;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Elements that must not be duplicated when a paragraph is cloned
const UNIQUE_MARKERS: [&[u8]; 4] = [
    b"w:bookmarkStart",
    b"w:bookmarkEnd",
    b"w:commentRangeStart",
    b"w:commentRangeEnd",
];

const UNIQUE_ID_ATTRIBUTES: [&[u8]; 2] = [b"w14:paraId", b"w14:textId"];

/// Rebuild `original` with `text` poured into its paragraphs.
///
/// Every failure is reported as `StructuralMismatch` so the caller can fall
/// through to the next tier.
pub fn reconstruct(
    original: &[u8],
    fingerprint: &FormattingFingerprint,
    text: &str,
    config: &ReconstructionConfig,
) -> Result<Vec<u8>> {
    rebuild(original, fingerprint, text, config).map_err(|e| match e {
        ResumeTailorError::StructuralMismatch(reason) => ResumeTailorError::StructuralMismatch(reason),
        other => ResumeTailorError::StructuralMismatch(other.to_string()),
    })
}

fn rebuild(
    original: &[u8],
    fingerprint: &FormattingFingerprint,
    text: &str,
    config: &ReconstructionConfig,
) -> Result<Vec<u8>> {
    let lines = tailored_lines(text);
    let alignment = align(fingerprint.paragraphs(), &lines, config)?;

    let mut package = DocxPackage::from_bytes(original)?;
    let events = parse_events(package.document_xml()?)?;
    let spans = paragraph_spans(&events);

    if spans.len() != fingerprint.len() {
        return Err(ResumeTailorError::StructuralMismatch(format!(
            "document has {} paragraphs but fingerprint has {}",
            spans.len(),
            fingerprint.len()
        )));
    }

    let plan = plan_rewrite(fingerprint.paragraphs(), &spans, &alignment)?;
    debug!(
        "Structural plan: {} filled, {} spare, {} inserted, {} anchors",
        alignment.filled(),
        alignment.spare(),
        alignment.inserted(),
        alignment.anchors
    );

    let document = render(&events, &spans, &plan)?;
    package.set_part(DOCUMENT_PART, document);
    package.to_bytes()
}

fn parse_events(xml: &str) -> Result<Vec<Event<'static>>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut events = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            event => events.push(event.into_owned()),
        }
    }
    Ok(events)
}

fn is_element(event: &Event, name: &[u8]) -> bool {
    match event {
        Event::Start(e) | Event::Empty(e) => e.name().as_ref() == name,
        Event::End(e) => e.name().as_ref() == name,
        _ => false,
    }
}

#[derive(Debug, Clone)]
struct Span {
    start: usize,
    end: usize,
    /// Number of paragraphs nested inside this one
    nested: usize,
    /// Direct child of `w:body` and not the last block before the section
    /// properties
    removable: bool,
}

/// Event ranges of paragraphs, indexed like the fingerprint.
fn paragraph_spans(events: &[Event<'static>]) -> Vec<Span> {
    let mut spans: Vec<Option<Span>> = Vec::new();
    let mut open: Vec<(usize, bool)> = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut fallback_depth = 0usize;

    for (i, event) in events.iter().enumerate() {
        match event {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if fallback_depth == 0 && name == b"w:p" {
                    for &(index, _) in &open {
                        if let Some(Some(span)) = spans.get_mut(index) {
                            span.nested += 1;
                        }
                    }
                    let in_body = path.last().is_some_and(|p| p == b"w:body");
                    open.push((spans.len(), in_body));
                    spans.push(Some(Span {
                        start: i,
                        end: i,
                        nested: 0,
                        removable: false,
                    }));
                }
                if name == FALLBACK_ELEMENT {
                    fallback_depth += 1;
                }
                path.push(name);
            }
            Event::Empty(e) if fallback_depth == 0 && e.name().as_ref() == b"w:p" => {
                for &(index, _) in &open {
                    if let Some(Some(span)) = spans.get_mut(index) {
                        span.nested += 1;
                    }
                }
                let in_body = path.last().is_some_and(|p| p == b"w:body");
                spans.push(Some(Span {
                    start: i,
                    end: i,
                    nested: 0,
                    removable: in_body && !closes_body(events, i),
                }));
            }
            Event::End(e) => {
                path.pop();
                let name = e.name();
                if name.as_ref() == FALLBACK_ELEMENT {
                    fallback_depth = fallback_depth.saturating_sub(1);
                } else if fallback_depth == 0 && name.as_ref() == b"w:p" {
                    if let Some((index, in_body)) = open.pop() {
                        if let Some(Some(span)) = spans.get_mut(index) {
                            span.end = i;
                            span.removable = in_body && !closes_body(events, i);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    spans.into_iter().flatten().collect()
}

/// Whether the block ending at `end` is followed only by the body's section
/// properties or the end of the body.
fn closes_body(events: &[Event<'static>], end: usize) -> bool {
    events[end + 1..]
        .iter()
        .find(|e| matches!(e, Event::Start(_) | Event::Empty(_) | Event::End(_)))
        .map_or(true, |e| is_element(e, b"w:sectPr") || is_element(e, b"w:body"))
}

/// New text per run; `None` leaves the run alone.
type RunTexts = Vec<Option<String>>;

#[derive(Debug, Clone)]
enum Action {
    Keep,
    Rewrite(RunTexts),
    Remove,
}

#[derive(Debug, Clone)]
struct ClonedParagraph {
    template: usize,
    runs: RunTexts,
}

struct Plan {
    actions: Vec<Action>,
    before: Vec<Vec<ClonedParagraph>>,
    after: Vec<Vec<ClonedParagraph>>,
}

fn plan_rewrite(paragraphs: &[ParagraphFingerprint], spans: &[Span], alignment: &Alignment) -> Result<Plan> {
    let count = paragraphs.len();
    let mut plan = Plan {
        actions: vec![Action::Keep; count],
        before: vec![Vec::new(); count],
        after: vec![Vec::new(); count],
    };

    let clones = |insertions: &[Insertion]| -> Result<Vec<ClonedParagraph>> {
        insertions
            .iter()
            .map(|insertion| -> Result<ClonedParagraph> {
                let template = &paragraphs[insertion.template];
                Ok(ClonedParagraph {
                    template: insertion.template,
                    runs: assign_runs(template, &insertion.line)?,
                })
            })
            .collect()
    };

    for slot in &alignment.slots {
        let paragraph = &paragraphs[slot.paragraph];
        plan.actions[slot.paragraph] = match &slot.line {
            Some(line) => Action::Rewrite(assign_runs(paragraph, line)?),
            None if spans[slot.paragraph].removable && paragraph.is_cloneable() => Action::Remove,
            None => Action::Rewrite(assign_runs(paragraph, "")?),
        };
        plan.before[slot.paragraph] = clones(&slot.before)?;
        plan.after[slot.paragraph] = clones(&slot.after)?;
    }

    // Keep at least one paragraph in the body
    if plan.actions.iter().all(|a| matches!(a, Action::Remove)) {
        return Err(ResumeTailorError::StructuralMismatch(
            "alignment would remove every paragraph".to_string(),
        ));
    }

    Ok(plan)
}

/// Distribute `line` over the text-bearing runs of `paragraph`.
fn assign_runs(paragraph: &ParagraphFingerprint, line: &str) -> Result<RunTexts> {
    let line = if paragraph.style.numbering.is_some() {
        strip_bullet(line)
    } else {
        line
    };

    let text_runs: Vec<usize> = paragraph
        .runs
        .iter()
        .enumerate()
        .filter(|(_, run)| run.has_text_element || !run.text.is_empty())
        .map(|(i, _)| i)
        .collect();

    if text_runs.is_empty() {
        return Err(ResumeTailorError::StructuralMismatch(format!(
            "paragraph {} has no text runs",
            paragraph.index
        )));
    }

    let originals: Vec<&str> = text_runs.iter().map(|&i| paragraph.runs[i].text.as_str()).collect();
    let pieces = distribute_text(&originals, line);

    let mut runs = vec![None; paragraph.runs.len()];
    for (&run, piece) in text_runs.iter().zip(pieces) {
        runs[run] = Some(piece);
    }
    Ok(runs)
}

fn render(events: &[Event<'static>], spans: &[Span], plan: &Plan) -> Result<Vec<u8>> {
    let mut out: Vec<Event<'static>> = Vec::with_capacity(events.len());
    let mut stack: Vec<(usize, ParagraphRewriter)> = Vec::new();
    let mut next_index = 0usize;
    let mut fallback_depth = 0usize;
    let mut i = 0usize;

    while i < events.len() {
        let event = &events[i];

        if fallback_depth > 0 {
            if is_element(event, FALLBACK_ELEMENT) {
                match event {
                    Event::Start(_) => fallback_depth += 1,
                    Event::End(_) => fallback_depth -= 1,
                    _ => {}
                }
            }
            out.push(event.clone());
            i += 1;
            continue;
        }

        match event {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"w:p" => {
                let index = next_index;
                next_index += 1;
                let is_empty = matches!(event, Event::Empty(_));

                emit_clones(events, spans, &plan.before[index], &mut out);
                match &plan.actions[index] {
                    Action::Remove => {
                        next_index += spans[index].nested;
                        i = spans[index].end + 1;
                        emit_clones(events, spans, &plan.after[index], &mut out);
                        continue;
                    }
                    action => {
                        out.push(event.clone());
                        if is_empty {
                            emit_clones(events, spans, &plan.after[index], &mut out);
                        } else {
                            let runs = match action {
                                Action::Rewrite(runs) => Some(runs.clone()),
                                _ => None,
                            };
                            stack.push((index, ParagraphRewriter::new(runs, false)));
                        }
                    }
                }
            }
            Event::End(e) if e.name().as_ref() == b"w:p" => {
                out.push(event.clone());
                if let Some((index, _)) = stack.pop() {
                    emit_clones(events, spans, &plan.after[index], &mut out);
                }
            }
            _ => {
                if is_element(event, FALLBACK_ELEMENT) && matches!(event, Event::Start(_)) {
                    fallback_depth += 1;
                    out.push(event.clone());
                } else if let Some((_, rewriter)) = stack.last_mut() {
                    rewriter.feed(event, &mut out);
                } else {
                    out.push(event.clone());
                }
            }
        }
        i += 1;
    }

    let mut writer = Writer::new(Vec::with_capacity(events.len() * 16));
    for event in out {
        writer.write_event(event)?;
    }
    Ok(writer.into_inner())
}

fn emit_clones(events: &[Event<'static>], spans: &[Span], clones: &[ClonedParagraph], out: &mut Vec<Event<'static>>) {
    for clone in clones {
        let span = &spans[clone.template];
        let start = match &events[span.start] {
            Event::Start(e) => Event::Start(without_unique_ids(e)),
            other => other.clone(),
        };
        out.push(start);
        let mut rewriter = ParagraphRewriter::new(Some(clone.runs.clone()), true);
        for event in &events[span.start + 1..span.end] {
            rewriter.feed(event, out);
        }
        if span.end > span.start {
            out.push(events[span.end].clone());
        }
    }
}

fn without_unique_ids(e: &BytesStart<'static>) -> BytesStart<'static> {
    let mut start = BytesStart::new("w:p");
    for attribute in e.attributes().flatten() {
        if !UNIQUE_ID_ATTRIBUTES.contains(&attribute.key.as_ref()) {
            start.push_attribute(attribute);
        }
    }
    start
}

struct ActiveRun {
    text: Option<String>,
    depth: usize,
    emitted: bool,
}

/// Rewrites the runs of a single paragraph. Events of nested paragraphs are
/// never fed here.
struct ParagraphRewriter {
    runs: Option<RunTexts>,
    next_run: usize,
    depth: usize,
    run: Option<ActiveRun>,
    skip_until: Option<usize>,
    cloning: bool,
}

impl ParagraphRewriter {
    fn new(runs: Option<RunTexts>, cloning: bool) -> Self {
        Self {
            runs,
            next_run: 0,
            depth: 0,
            run: None,
            skip_until: None,
            cloning,
        }
    }

    fn take_run_text(&mut self) -> Option<String> {
        let index = self.next_run;
        self.next_run += 1;
        self.runs
            .as_ref()
            .and_then(|runs| runs.get(index).cloned().flatten())
    }

    /// Text children of the active run that get replaced.
    fn is_replaced_child(&self, e: &BytesStart) -> bool {
        let Some(run) = &self.run else {
            return false;
        };
        if run.text.is_none() || self.depth != run.depth {
            return false;
        }
        match e.name().as_ref() {
            b"w:t" | b"w:tab" | b"w:cr" => true,
            b"w:br" => !matches!(attribute(e, "w:type").as_deref(), Some("page") | Some("column")),
            _ => false,
        }
    }

    fn feed(&mut self, event: &Event<'static>, out: &mut Vec<Event<'static>>) {
        if let Some(level) = self.skip_until {
            match event {
                Event::Start(_) => self.depth += 1,
                Event::End(_) => {
                    self.depth -= 1;
                    if self.depth == level {
                        self.skip_until = None;
                    }
                }
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(e) if e.name().as_ref() == b"w:r" && self.run.is_none() => {
                let text = self.take_run_text();
                self.depth += 1;
                self.run = Some(ActiveRun {
                    text,
                    depth: self.depth,
                    emitted: false,
                });
                out.push(event.clone());
            }
            Event::Empty(e) if e.name().as_ref() == b"w:r" && self.run.is_none() => {
                self.next_run += 1;
                out.push(event.clone());
            }
            Event::End(e)
                if e.name().as_ref() == b"w:r" && self.run.as_ref().is_some_and(|r| r.depth == self.depth) =>
            {
                if let Some(ActiveRun {
                    text: Some(text),
                    emitted: false,
                    ..
                }) = self.run.take()
                {
                    push_text_events(&text, out);
                }
                self.depth -= 1;
                out.push(event.clone());
            }
            Event::Start(e) | Event::Empty(e) if self.is_replaced_child(e) => {
                if let Some(run) = self.run.as_mut() {
                    if !run.emitted {
                        if let Some(text) = &run.text {
                            push_text_events(text, out);
                        }
                        run.emitted = true;
                    }
                }
                if matches!(event, Event::Start(_)) {
                    self.skip_until = Some(self.depth);
                    self.depth += 1;
                }
            }
            Event::Empty(e) if self.cloning && UNIQUE_MARKERS.contains(&e.name().as_ref()) => {}
            Event::Start(_) => {
                self.depth += 1;
                out.push(event.clone());
            }
            Event::End(_) => {
                self.depth = self.depth.saturating_sub(1);
                out.push(event.clone());
            }
            _ => out.push(event.clone()),
        }
    }
}

fn push_text_events(text: &str, out: &mut Vec<Event<'static>>) {
    let text = xml_safe(text);
    for (i, piece) in text.split('\t').enumerate() {
        if i > 0 {
            out.push(Event::Empty(BytesStart::new("w:tab")));
            if piece.is_empty() {
                continue;
            }
        }
        let mut start = BytesStart::new("w:t");
        start.push_attribute(("xml:space", "preserve"));
        out.push(Event::Start(start));
        out.push(Event::Text(BytesText::new(piece).into_owned()));
        out.push(Event::End(BytesEnd::new("w:t")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::extractor::extract;

    const HEAD: &str = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
        "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" ",
        "xmlns:w14=\"http://schemas.microsoft.com/office/word/2010/wordml\"><w:body>"
    );

    fn docx(body: &str) -> Vec<u8> {
        DocxPackage::from_parts(vec![
            ("[Content_Types].xml".to_string(), b"<Types/>".to_vec()),
            (DOCUMENT_PART.to_string(), format!("{}{}</w:body></w:document>", HEAD, body).into_bytes()),
            ("word/media/logo.png".to_string(), vec![0x89, 0x50, 0x4e, 0x47]),
        ])
        .to_bytes()
        .unwrap()
    }

    fn resume_body() -> String {
        concat!(
            "<w:p w14:paraId=\"1A\"><w:pPr><w:jc w:val=\"center\"/></w:pPr>",
            "<w:r><w:rPr><w:b/><w:sz w:val=\"32\"/></w:rPr><w:t>JANE DOE</w:t></w:r></w:p>",
            "<w:p><w:pPr><w:pBdr><w:bottom w:val=\"single\" w:sz=\"6\"/></w:pBdr></w:pPr>",
            "<w:r><w:rPr><w:b/></w:rPr><w:t>EXPERIENCE</w:t></w:r></w:p>",
            "<w:p w14:paraId=\"2B\"><w:pPr><w:pStyle w:val=\"ListBullet\"/></w:pPr>",
            "<w:bookmarkStart w:id=\"0\" w:name=\"b\"/><w:r><w:t>Built services</w:t></w:r><w:bookmarkEnd w:id=\"0\"/></w:p>",
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">Skills: </w:t></w:r>",
            "<w:r><w:t>Rust, Python</w:t></w:r></w:p>",
            "<w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/></w:sectPr>",
        )
        .to_string()
    }

    fn run(text: &str) -> (Vec<u8>, FormattingFingerprint, Result<Vec<u8>>) {
        let original = docx(&resume_body());
        let (_, fingerprint) = extract(&original).unwrap();
        let result = reconstruct(&original, &fingerprint, text, &ReconstructionConfig::default());
        (original, fingerprint, result)
    }

    #[test]
    fn test_one_to_one_keeps_properties() {
        let (_, fingerprint, result) = run("JANE DOE\nEXPERIENCE\nBuilt Go services\nSkills: Rust, Go");
        let output = result.unwrap();
        let (text, rebuilt) = extract(&output).unwrap();

        assert_eq!(text, "JANE DOE\nEXPERIENCE\nBuilt Go services\nSkills: Rust, Go");
        assert_eq!(rebuilt.style_sequence(), fingerprint.style_sequence());
        let skills = &rebuilt.paragraphs()[3];
        assert_eq!(skills.runs[0].text, "Skills: ");
        assert!(skills.runs[0].style.bold);
        assert_eq!(skills.runs[1].text, "Rust, Go");
    }

    #[test]
    fn test_other_parts_copied_verbatim() {
        let (original, _, result) = run("JANE DOE\nEXPERIENCE\nBuilt Go services\nSkills: Rust");
        let before = DocxPackage::from_bytes(&original).unwrap();
        let after = DocxPackage::from_bytes(&result.unwrap()).unwrap();
        assert_eq!(after.part("word/media/logo.png"), before.part("word/media/logo.png"));
        assert_eq!(after.part_names().collect::<Vec<_>>(), before.part_names().collect::<Vec<_>>());
    }

    #[test]
    fn test_surplus_lines_clone_templates() {
        let (_, _, result) = run(
            "JANE DOE\nEXPERIENCE\nBuilt Go services\nMentored two engineers\nSkills: Rust\nLed hiring",
        );
        let output = result.unwrap();
        let (text, rebuilt) = extract(&output).unwrap();

        assert_eq!(rebuilt.len(), 6);
        assert_eq!(rebuilt.paragraphs()[3].text, "Mentored two engineers");
        assert_eq!(rebuilt.paragraphs()[3].style.style_id.as_deref(), Some("ListBullet"));
        assert!(text.ends_with("Led hiring"));

        let document = DocxPackage::from_bytes(&output).unwrap().document_xml().unwrap().to_string();
        assert_eq!(document.matches("w14:paraId=\"2B\"").count(), 1);
        assert_eq!(document.matches("w:bookmarkStart").count(), 1);
    }

    #[test]
    fn test_trailing_spare_paragraph_blanked() {
        let (_, _, result) = run("JANE DOE\nEXPERIENCE\nSkills: Rust");
        let (_, rebuilt) = extract(&result.unwrap()).unwrap();
        assert_eq!(rebuilt.len(), 4);
        assert_eq!(rebuilt.paragraphs()[2].text, "Skills: Rust");
        assert_eq!(rebuilt.paragraphs()[3].text, "");
    }

    #[test]
    fn test_spare_body_paragraph_removed() {
        let body = concat!(
            "<w:p><w:r><w:t>JANE DOE</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>EXPERIENCE</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Built services</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Ran on-call</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>EDUCATION</w:t></w:r></w:p>",
        );
        let original = docx(body);
        let (_, fingerprint) = extract(&original).unwrap();
        let output = reconstruct(
            &original,
            &fingerprint,
            "JANE DOE\nEXPERIENCE\nBuilt Go services\nEDUCATION",
            &ReconstructionConfig::default(),
        )
        .unwrap();

        let (text, rebuilt) = extract(&output).unwrap();
        assert_eq!(rebuilt.len(), 4);
        assert_eq!(text, "JANE DOE\nEXPERIENCE\nBuilt Go services\nEDUCATION");
    }

    #[test]
    fn test_mismatch_beyond_tolerance() {
        let (_, _, result) = run(&(0..12).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n"));
        assert!(matches!(result, Err(ResumeTailorError::StructuralMismatch(_))));
    }

    #[test]
    fn test_corrupt_original_is_mismatch() {
        let (_, fingerprint) = extract(&docx(&resume_body())).unwrap();
        let result = reconstruct(
            b"garbage",
            &fingerprint,
            "JANE DOE\nEXPERIENCE\nBuilt\nSkills: x",
            &ReconstructionConfig::default(),
        );
        assert!(matches!(result, Err(ResumeTailorError::StructuralMismatch(_))));
    }

    #[test]
    fn test_table_cell_paragraph_blanked_not_removed() {
        let body = concat!(
            "<w:p><w:r><w:t>HEADER</w:t></w:r></w:p>",
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell one</w:t></w:r></w:p></w:tc>",
            "<w:tc><w:p><w:r><w:t>cell two</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
            "<w:p><w:r><w:t>footer line</w:t></w:r></w:p>",
        );
        let original = docx(body);
        let (_, fingerprint) = extract(&original).unwrap();
        let output = reconstruct(&original, &fingerprint, "HEADER\nnew cell", &ReconstructionConfig::default()).unwrap();
        let (_, rebuilt) = extract(&output).unwrap();
        assert_eq!(rebuilt.len(), 4);
        assert_eq!(rebuilt.paragraphs()[1].text, "new cell");
        assert_eq!(rebuilt.paragraphs()[2].text, "");
    }
}
