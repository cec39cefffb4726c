//! Resume line classification heuristics

use crate::processing::fingerprint::ParagraphFingerprint;
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// Headings longer than this are treated as body text.
const MAX_HEADING_CHARS: usize = 50;
const MAX_HEADING_WORDS: usize = 5;
const MAX_SUBHEADING_CHARS: usize = 100;
/// Words allowed after a section keyword, as in `Skills & Tools`
const MAX_HEADING_TAIL_WORDS: usize = 2;

const SECTION_KEYWORDS: &[&str] = &[
    "professional summary",
    "summary",
    "objective",
    "profile",
    "about me",
    "work experience",
    "professional experience",
    "experience",
    "employment history",
    "employment",
    "education",
    "technical skills",
    "skills",
    "core competencies",
    "expertise",
    "certifications",
    "certificates",
    "licenses",
    "awards",
    "projects",
    "achievements",
    "publications",
    "volunteer",
    "languages",
    "interests",
    "references",
];

const BULLET_MARKERS: &[char] = &['•', '-', '*', '▪', '◦', '·', '‣', '–'];

static SECTION_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(SECTION_KEYWORDS)
        .expect("Invalid section keyword automaton")
});

static SUBHEADING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S.*\s(\||–|—|-|@|at)\s+\S.*$").expect("Invalid subheading regex"));

/// Coarse role of a resume line, used to pick formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Blank,
    SectionHeading,
    /// `Title | Company`, `Company - Title`, `Title at Company`
    Subheading,
    Bullet,
    Body,
}

impl LineKind {
    pub fn of_line(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            LineKind::Blank
        } else if is_bullet(trimmed) {
            LineKind::Bullet
        } else if is_section_heading(trimmed) {
            LineKind::SectionHeading
        } else if is_subheading(trimmed) {
            LineKind::Subheading
        } else {
            LineKind::Body
        }
    }

    /// Paragraph styling wins over text shape when it is explicit.
    pub fn of_paragraph(paragraph: &ParagraphFingerprint) -> Self {
        if !paragraph.has_text() {
            return LineKind::Blank;
        }
        if paragraph.style.numbering.is_some() {
            return LineKind::Bullet;
        }
        if paragraph
            .style
            .style_id
            .as_deref()
            .is_some_and(|id| id.to_ascii_lowercase().starts_with("heading"))
            && paragraph.text.trim().chars().count() < MAX_HEADING_CHARS
        {
            return LineKind::SectionHeading;
        }
        Self::of_line(&paragraph.text)
    }
}

pub fn is_bullet(line: &str) -> bool {
    line.trim_start().starts_with(BULLET_MARKERS)
}

/// Text of a bullet line without its marker.
pub fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix(BULLET_MARKERS) {
        Some(rest) => rest.trim_start(),
        None => trimmed,
    }
}

/// ALL-CAPS lines and lines that start with a known section name count as
/// headings when they are short.
pub fn is_section_heading(line: &str) -> bool {
    let trimmed = line.trim().trim_end_matches(':').trim();
    if trimmed.is_empty() || trimmed.chars().count() >= MAX_HEADING_CHARS {
        return false;
    }
    if trimmed.split_whitespace().count() > MAX_HEADING_WORDS {
        return false;
    }

    // `Skills: Rust, Go` is a labelled body line
    if trimmed.contains(':') {
        return false;
    }

    let mut letters = trimmed.chars().filter(|c| c.is_alphabetic()).peekable();
    if letters.peek().is_some() && letters.all(|c| c.is_uppercase()) {
        return true;
    }

    SECTION_MATCHER
        .find(trimmed)
        .is_some_and(|m| m.start() == 0 && trimmed[m.end()..].split_whitespace().count() <= MAX_HEADING_TAIL_WORDS)
}

pub fn is_subheading(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.chars().count() < MAX_SUBHEADING_CHARS
        && SUBHEADING_PATTERN.is_match(trimmed)
}

/// Comparison key for headings: lowercase words without punctuation.
pub fn normalize_heading(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
