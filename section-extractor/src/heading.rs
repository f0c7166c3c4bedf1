//! Line scanning and heading heuristics shared by the matcher, the resolver
//! and the fallback windowing.

use regex::Regex;
use std::sync::LazyLock;

static NUMBERING_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:poglavlje|glava|deo|dio|chapter|part|section)\s+)?(?:\d+(?:\.\d+)*\.?|[IVXLC]+\.)(?:\s*[-–—:)]\s*|\s+)",
    )
    .expect("valid numbering regex")
});

static DOT_LEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\.\s?){3,}|…|\s{2,}\d{1,4}\s*$").expect("valid dot leader regex"));

/// Title with any leading numbering ("1.1.", "IV.", "Poglavlje 3:") removed.
/// Returns the trimmed input when stripping would leave nothing.
pub fn strip_numbering(title: &str) -> &str {
    let trimmed = title.trim();
    match NUMBERING_PREFIX.find(trimmed) {
        Some(m) if m.end() < trimmed.len() => trimmed[m.end()..].trim_start(),
        _ => trimmed,
    }
}

/// True when `title` starts with a numbering prefix.
pub fn has_numbering(title: &str) -> bool {
    strip_numbering(title).len() < title.trim().len()
}

/// De-numbered title without separator artifacts and with single spaces.
pub fn clean_title(title: &str) -> String {
    let stripped = strip_numbering(title)
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '.' | '-' | ':' | '–' | '—' | '…'));
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case- and punctuation-insensitive comparison key.
pub fn title_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.chars().flat_map(char::to_uppercase) {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Words longer than two characters, used by the word-sequence strategy.
pub fn significant_words(title: &str) -> Vec<&str> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .collect()
}

/// Heuristic: short, capitalized, not ending like a sentence.
pub fn is_header_like(line: &str) -> bool {
    let line = line.trim();
    let chars = line.chars().count();
    if !(3..=90).contains(&chars) {
        return false;
    }
    if line.split_whitespace().count() > 12 {
        return false;
    }
    if line.ends_with(['.', ',', ';', '!', '?']) || looks_like_toc_line(line) {
        return false;
    }
    let Some(first) = line.chars().find(|c| c.is_alphanumeric()) else {
        return false;
    };
    if !(first.is_uppercase() || first.is_ascii_digit()) {
        return false;
    }
    line.chars().any(char::is_alphabetic)
}

/// A TOC listing line: dot leaders or a trailing page number after a wide gap.
pub fn looks_like_toc_line(line: &str) -> bool {
    DOT_LEADER.is_match(line.trim_start())
}

/// Start of the line containing `pos`.
pub fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// End of the line containing `pos` (index of its `\n`, or the text length).
pub fn line_end(text: &str, pos: usize) -> usize {
    text[pos..].find('\n').map(|i| pos + i).unwrap_or(text.len())
}

/// First line start at or after `pos`.
pub fn next_line_start(text: &str, pos: usize) -> usize {
    if pos == 0 || text.as_bytes().get(pos - 1) == Some(&b'\n') {
        pos
    } else {
        (line_end(text, pos) + 1).min(text.len())
    }
}

/// Smallest char boundary >= `pos` (clamped to the text length).
pub fn ceil_char_boundary(text: &str, pos: usize) -> usize {
    let mut p = pos.min(text.len());
    while p < text.len() && !text.is_char_boundary(p) {
        p += 1;
    }
    p
}

/// Largest char boundary <= `pos`.
pub fn floor_char_boundary(text: &str, pos: usize) -> usize {
    let mut p = pos.min(text.len());
    while p > 0 && !text.is_char_boundary(p) {
        p -= 1;
    }
    p
}

/// Shrink `start..end` so it excludes surrounding whitespace.
pub fn trim_span(text: &str, start: usize, end: usize) -> (usize, usize) {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    if lead == slice.len() {
        return (start, start);
    }
    (start + lead, end - trail)
}
