//! Line-to-paragraph alignment for in-place reconstruction
//!
//! Tailored lines are mapped onto the source paragraphs that carry text
//! ("slots"). Section headings present on both sides are matched first by a
//! longest common subsequence and pin the alignment; the lines between two
//! anchors are spread proportionally over the slots between them. Spare slots
//! are reported without a line and surplus lines become insertions that
//! clone the nearest paragraph of the same kind.

use crate::config::ReconstructionConfig;
use crate::error::{Result, ResumeTailorError};
use crate::processing::classify::{normalize_heading, LineKind};
use crate::processing::fingerprint::ParagraphFingerprint;
use log::debug;
use strsim::normalized_levenshtein;

#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    /// Fingerprint index of the paragraph to clone
    pub template: usize,
    pub line: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotAssignment {
    /// Fingerprint index of the slot paragraph
    pub paragraph: usize,
    /// `None` when the slot is spare
    pub line: Option<String>,
    pub before: Vec<Insertion>,
    pub after: Vec<Insertion>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Alignment {
    pub slots: Vec<SlotAssignment>,
    pub anchors: usize,
}

impl Alignment {
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.line.is_some()).count()
    }

    pub fn spare(&self) -> usize {
        self.slots.len() - self.filled()
    }

    pub fn inserted(&self) -> usize {
        self.slots.iter().map(|s| s.before.len() + s.after.len()).sum()
    }
}

/// Non-blank tailored lines, trimmed and stripped of Markdown decoration.
pub fn tailored_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Drop Markdown heading hashes and bold markers that models tend to add.
pub fn clean_line(line: &str) -> String {
    let trimmed = line.trim();
    let without_hashes = match trimmed.trim_start_matches('#') {
        rest if rest.len() < trimmed.len() && (rest.is_empty() || rest.starts_with(' ')) => rest.trim_start(),
        _ => trimmed,
    };
    without_hashes.replace("**", "").trim().to_string()
}

pub fn headings_match(a: &str, b: &str, threshold: f64) -> bool {
    let a = normalize_heading(a);
    let b = normalize_heading(b);
    !a.is_empty() && (a == b || normalized_levenshtein(&a, &b) >= threshold)
}

pub fn align(
    paragraphs: &[ParagraphFingerprint],
    lines: &[String],
    config: &ReconstructionConfig,
) -> Result<Alignment> {
    let slots: Vec<&ParagraphFingerprint> = paragraphs.iter().filter(|p| p.has_text()).collect();

    if lines.is_empty() {
        return Err(ResumeTailorError::StructuralMismatch("tailored text has no lines".to_string()));
    }
    if slots.is_empty() {
        return Err(ResumeTailorError::StructuralMismatch("document has no text paragraphs".to_string()));
    }

    let difference = lines.len().abs_diff(slots.len()) as f32;
    let allowed = config.paragraph_tolerance * slots.len() as f32;
    if difference > allowed {
        return Err(ResumeTailorError::StructuralMismatch(format!(
            "{} tailored lines against {} paragraphs exceeds tolerance {}",
            lines.len(),
            slots.len(),
            config.paragraph_tolerance
        )));
    }

    let slot_kinds: Vec<LineKind> = slots.iter().map(|p| LineKind::of_paragraph(p)).collect();
    let anchors = match_headings(&slots, &slot_kinds, lines, config.heading_similarity);
    debug!(
        "Aligning {} lines onto {} slots with {} heading anchors",
        lines.len(),
        slots.len(),
        anchors.len()
    );

    let mut assignments: Vec<SlotAssignment> = slots
        .iter()
        .map(|p| SlotAssignment {
            paragraph: p.index,
            line: None,
            before: Vec::new(),
            after: Vec::new(),
        })
        .collect();

    // Segment boundaries: a virtual anchor before the start and after the end
    let mut bounds: Vec<(isize, isize)> = vec![(-1, -1)];
    bounds.extend(anchors.iter().map(|&(s, l)| (s as isize, l as isize)));
    bounds.push((slots.len() as isize, lines.len() as isize));

    for &(slot, line) in &anchors {
        assignments[slot].line = Some(lines[line].clone());
    }

    for window in bounds.windows(2) {
        let (slot_lo, line_lo) = ((window[0].0 + 1) as usize, (window[0].1 + 1) as usize);
        let (slot_hi, line_hi) = (window[1].0 as usize, window[1].1 as usize);
        let segment_lines = &lines[line_lo..line_hi];
        let slot_count = slot_hi - slot_lo;

        if segment_lines.is_empty() {
            continue;
        }

        if slot_count == 0 {
            // Attach to the neighbouring anchor
            let (host, before) = if slot_lo > 0 { (slot_lo - 1, false) } else { (slot_hi, true) };
            for line in segment_lines {
                let insertion = Insertion {
                    template: pick_template(&slots, &slot_kinds, host, line)?,
                    line: line.clone(),
                };
                if before {
                    assignments[host].before.push(insertion);
                } else {
                    assignments[host].after.push(insertion);
                }
            }
            continue;
        }

        let line_count = segment_lines.len();
        if line_count <= slot_count {
            for (j, line) in segment_lines.iter().enumerate() {
                let slot = slot_lo + j * slot_count / line_count;
                assignments[slot].line = Some(line.clone());
            }
        } else {
            for i in 0..slot_count {
                let start = i * line_count / slot_count;
                let end = (i + 1) * line_count / slot_count;
                let slot = slot_lo + i;
                assignments[slot].line = Some(segment_lines[start].clone());
                for line in &segment_lines[start + 1..end] {
                    let template = pick_template(&slots, &slot_kinds, slot, line)?;
                    assignments[slot].after.push(Insertion {
                        template,
                        line: line.clone(),
                    });
                }
            }
        }
    }

    Ok(Alignment {
        slots: assignments,
        anchors: anchors.len(),
    })
}

/// Longest common subsequence of headings, as `(slot, line)` position pairs.
fn match_headings(
    slots: &[&ParagraphFingerprint],
    slot_kinds: &[LineKind],
    lines: &[String],
    threshold: f64,
) -> Vec<(usize, usize)> {
    let slot_headings: Vec<usize> = (0..slots.len())
        .filter(|&i| slot_kinds[i] == LineKind::SectionHeading)
        .collect();
    let line_headings: Vec<usize> = (0..lines.len())
        .filter(|&i| LineKind::of_line(&lines[i]) == LineKind::SectionHeading)
        .collect();

    let (n, m) = (slot_headings.len(), line_headings.len());
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if headings_match(&slots[slot_headings[i]].text, &lines[line_headings[j]], threshold) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut pairs = Vec::with_capacity(table[0][0]);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if headings_match(&slots[slot_headings[i]].text, &lines[line_headings[j]], threshold)
            && table[i][j] == table[i + 1][j + 1] + 1
        {
            pairs.push((slot_headings[i], line_headings[j]));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

/// Nearest cloneable slot, preferring one of the same kind as `line`.
fn pick_template(
    slots: &[&ParagraphFingerprint],
    slot_kinds: &[LineKind],
    near: usize,
    line: &str,
) -> Result<usize> {
    let kind = LineKind::of_line(line);
    (0..slots.len())
        .filter(|&i| slots[i].is_cloneable())
        .min_by_key(|&i| (slot_kinds[i] != kind, i.abs_diff(near), i))
        .map(|i| slots[i].index)
        .ok_or_else(|| ResumeTailorError::StructuralMismatch("no paragraph can be cloned".to_string()))
}

/// Split `text` across runs whose original contents are `originals`.
///
/// Leading runs whose original text is still an exact prefix of the new text
/// keep it verbatim, so labels such as `Skills:` stay in their bold run. The
/// remaining words go to the remaining runs in proportion to their original
/// lengths. The pieces always concatenate back to `text`.
pub fn distribute_text(originals: &[&str], text: &str) -> Vec<String> {
    let mut pieces = vec![String::new(); originals.len()];
    if originals.is_empty() {
        return pieces;
    }

    let mut rest = text;
    let mut first_free = 0;
    while first_free + 1 < originals.len() {
        let original = originals[first_free];
        if original.trim().is_empty() || !rest.starts_with(original) {
            break;
        }
        pieces[first_free] = original.to_string();
        rest = &rest[original.len()..];
        first_free += 1;
    }

    let tokens = tokenize(rest);
    let targets = &originals[first_free..];
    let lengths: Vec<usize> = targets.iter().map(|t| t.chars().count()).collect();
    let total: usize = lengths.iter().sum();

    if total == 0 {
        pieces[first_free].push_str(rest);
        return pieces;
    }

    let mut cumulative = 0;
    let mut taken = 0;
    for (offset, length) in lengths.iter().enumerate() {
        cumulative += length;
        let boundary = if offset + 1 == lengths.len() {
            tokens.len()
        } else {
            (tokens.len() * cumulative + total / 2) / total
        };
        let boundary = boundary.max(taken);
        pieces[first_free + offset] = tokens[taken..boundary].concat();
        taken = boundary;
    }
    pieces
}

/// Words with their trailing whitespace; leading whitespace sticks to the
/// first token.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut seen_word = false;
    let mut in_space = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            in_space = seen_word;
        } else {
            if in_space {
                tokens.push(&text[start..i]);
                start = i;
                in_space = false;
            }
            seen_word = true;
        }
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}
