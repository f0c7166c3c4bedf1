//! Locate a TOC title in raw document text.
//!
//! Strategies run in a fixed order and the first one that yields a
//! candidate wins:
//! 1. exact structural (title alone on its line, optional numbering)
//! 2. normalized case (line key equals title key)
//! 3. word sequence (consecutive significant words in a header context)
//! 4. stripped prefix (exact structural on the de-numbered title)
//! 5. partial scored (confidence-weighted, accepted above a threshold)
//!
//! Every candidate starts at or after `search_from`, which keeps successive
//! TOC entries monotone in the document.

use crate::heading::{
    ceil_char_boundary, clean_title, has_numbering, is_header_like, line_end, line_start, looks_like_toc_line,
    next_line_start, significant_words, strip_numbering, title_key,
};
use crate::params::StructureParams;
use regex::Regex;
use section_model::{LocatedTitle, MatchStrategy, RawDocumentText};
use std::sync::LazyLock;

static LINE_NUMBERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s\d.)]*$").expect("valid line numbering regex"));

/// Upper bound on regex hits inspected per pattern in the fuzzy strategies.
const MAX_HITS_PER_PATTERN: usize = 256;
/// Leading numbering allowed before a word-sequence hit on its line.
const MAX_PREFIX_BYTES: usize = 12;

/// A matched region in the text, `start..end` on char boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

impl Candidate {
    fn into_located(self, text: &str, strategy: MatchStrategy) -> LocatedTitle {
        LocatedTitle::found(self.start, &text[self.start..self.end], strategy, self.confidence)
    }
}

#[derive(Debug, Clone)]
pub struct TitleMatcher {
    confidence_threshold: f32,
    max_word_gap: usize,
}

impl Default for TitleMatcher {
    fn default() -> Self {
        Self::new(&StructureParams::default())
    }
}

impl TitleMatcher {
    pub fn new(params: &StructureParams) -> Self {
        Self {
            confidence_threshold: params.fuzzy_match_confidence_threshold,
            max_word_gap: params.max_word_gap,
        }
    }

    /// Find the first occurrence of `title` at or after `search_from`.
    ///
    /// Never fails: an unmatched title yields `found == false`.
    pub fn locate(&self, doc: &RawDocumentText, title: &str, search_from: usize) -> LocatedTitle {
        let text = doc.text();
        let title = title.trim();
        if title.is_empty() || search_from >= text.len() {
            return LocatedTitle::not_found();
        }
        let from = ceil_char_boundary(text, search_from);

        if let Some(c) = exact_structural(text, title, from) {
            return c.into_located(text, MatchStrategy::ExactStructural);
        }
        if let Some(c) = normalized_case(text, title, from) {
            return c.into_located(text, MatchStrategy::NormalizedCase);
        }
        let seq = word_sequence(text, title, from, self.max_word_gap);
        if let Some(first) = seq.first() {
            warn_if_ambiguous(title, &seq, MatchStrategy::WordSequence);
            return first.into_located(text, MatchStrategy::WordSequence);
        }
        if let Some(c) = stripped_prefix(text, title, from) {
            return c.into_located(text, MatchStrategy::StrippedPrefix);
        }
        let accepted: Vec<Candidate> = partial_scored(text, title, from)
            .into_iter()
            .filter(|c| c.confidence >= self.confidence_threshold)
            .collect();
        if let Some(first) = accepted.first() {
            warn_if_ambiguous(title, &accepted, MatchStrategy::PartialScored);
            return first.into_located(text, MatchStrategy::PartialScored);
        }
        tracing::debug!(title = %title, search_from = from, "title not located");
        LocatedTitle::not_found()
    }
}

/// The earliest candidate wins; near-equal competitors are only logged.
fn warn_if_ambiguous(title: &str, candidates: &[Candidate], strategy: MatchStrategy) {
    let Some(first) = candidates.first() else { return };
    let rivals = candidates
        .iter()
        .skip(1)
        .filter(|c| c.start != first.start && (c.confidence - first.confidence).abs() < 0.1)
        .count();
    if rivals > 0 {
        tracing::warn!(
            title = %title,
            strategy = strategy.as_str(),
            position = first.start,
            rivals,
            "ambiguous title match, using earliest"
        );
    }
}

fn words_pattern(words: &[&str], sep: &str) -> Option<String> {
    if words.is_empty() {
        return None;
    }
    Some(words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join(sep))
}

/// Title occupies its own line, optionally preceded by numbering.
pub fn exact_structural(text: &str, title: &str, from: usize) -> Option<Candidate> {
    let words: Vec<&str> = title.split_whitespace().collect();
    let body = words_pattern(&words, r"[ \t]+")?;
    let pattern = format!(r"(?im)^[ \t]*(?P<h>(?:\d+(?:\.\d+)*\.?[ \t]+)?{body})[ \t]*$");
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures_at(text, from)?;
    let h = caps.name("h")?;
    Some(Candidate { start: h.start(), end: h.end(), confidence: 1.0 })
}

/// A whole line whose normalized key equals the title's key.
///
/// A numbered title is compared with its numbering intact; the de-numbered
/// retry belongs to [`stripped_prefix`]. An unnumbered title ignores any
/// numbering on the line.
pub fn normalized_case(text: &str, title: &str, from: usize) -> Option<Candidate> {
    let key = title_key(title);
    if key.is_empty() {
        return None;
    }
    let numbered = has_numbering(title);
    let max_line = title.len() * 2 + 24;
    let mut pos = next_line_start(text, from);
    while pos < text.len() {
        let end = line_end(text, pos);
        let line = &text[pos..end];
        let trimmed = line.trim();
        if !trimmed.is_empty() && trimmed.len() <= max_line {
            let matches = title_key(trimmed) == key || (!numbered && title_key(strip_numbering(trimmed)) == key);
            if matches {
                let start = pos + (line.len() - line.trim_start().len());
                return Some(Candidate { start, end: start + trimmed.len(), confidence: 0.95 });
            }
        }
        pos = end + 1;
    }
    None
}

/// Consecutive pairs of significant title words found close together,
/// accepted only in a header-like context. Returns validated candidates in
/// document order.
pub fn word_sequence(text: &str, title: &str, from: usize, max_gap: usize) -> Vec<Candidate> {
    let words = significant_words(strip_numbering(title));
    if words.len() < 2 {
        return Vec::new();
    }
    let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
    let title_words: Vec<String> = strip_numbering(title).split_whitespace().map(word_key).collect();
    let mut out: Vec<Candidate> = Vec::new();
    for pair in words.windows(2) {
        let pattern = format!(
            r"(?i)\b{}\b[\s\S]{{0,{}}}?\b{}\b",
            regex::escape(pair[0]),
            max_gap,
            regex::escape(pair[1])
        );
        let Ok(re) = Regex::new(&pattern) else { continue };
        let mut at = from;
        let mut hits = 0;
        while let Some(m) = re.find_at(text, at) {
            hits += 1;
            if let Some(c) = header_context(text, m.start(), m.end(), &title_words, from, &lowered) {
                if !out.iter().any(|o| o.start == c.start) {
                    out.push(c);
                }
                break;
            }
            if hits >= MAX_HITS_PER_PATTERN {
                break;
            }
            at = m.end().max(ceil_char_boundary(text, m.start() + 1));
        }
    }
    out.sort_by_key(|c| c.start);
    out
}

fn word_key(w: &str) -> String {
    w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

/// The hit must sit at the start of its line (numbering aside) and the rest
/// of the line may only hold further title words, unless a wide gap of three
/// spaces separates the hit from whatever follows.
fn header_context(
    text: &str,
    start: usize,
    end: usize,
    title_words: &[String],
    from: usize,
    words: &[String],
) -> Option<Candidate> {
    if text[start..end].contains("\n\n") {
        return None;
    }
    let ls = line_start(text, start);
    let prefix = &text[ls..start];
    if prefix.len() > MAX_PREFIX_BYTES || !LINE_NUMBERING.is_match(prefix) {
        return None;
    }
    let le = line_end(text, end);
    let tail = &text[end..le];
    let title_tail = tail.split_whitespace().all(|w| title_words.contains(&word_key(w)));
    if !title_tail && !tail.starts_with("   ") {
        return None;
    }
    let line = &text[ls..le];
    if looks_like_toc_line(line) {
        return None;
    }
    let c_end = if title_tail { ls + line.trim_end().len() } else { end };
    if !is_header_like(&text[ls..c_end]) {
        return None;
    }
    let content_start = ls + (prefix.len() - prefix.trim_start().len());
    let c_start = if content_start >= from { content_start } else { start };
    let lowered_line = text[c_start..c_end].to_lowercase();
    let present = words.iter().filter(|w| lowered_line.contains(w.as_str())).count();
    let confidence = (present as f32 / words.len() as f32).max(0.5) * 0.9;
    Some(Candidate { start: c_start, end: c_end.max(end), confidence })
}

/// Exact structural match of the title with its numbering removed.
pub fn stripped_prefix(text: &str, title: &str, from: usize) -> Option<Candidate> {
    if !has_numbering(title) {
        return None;
    }
    exact_structural(text, strip_numbering(title), from).map(|c| Candidate { confidence: 0.9, ..c })
}

/// Every occurrence of the cleaned title, scored by how header-like its
/// surroundings are. The caller applies the acceptance threshold.
pub fn partial_scored(text: &str, title: &str, from: usize) -> Vec<Candidate> {
    let cleaned = clean_title(title);
    if cleaned.chars().count() < 3 {
        return Vec::new();
    }
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let Some(body) = words_pattern(&words, r"\s+") else {
        return Vec::new();
    };
    let Ok(re) = Regex::new(&format!("(?i){body}")) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for m in re.find_iter(&text[from..]).take(MAX_HITS_PER_PATTERN) {
        let (start, end) = (from + m.start(), from + m.end());
        let ls = line_start(text, start);
        let le = line_end(text, end);
        let line = &text[ls..le];
        if looks_like_toc_line(line) {
            continue;
        }
        let trimmed = line.trim();
        let prefix = text[ls..start].trim();
        let mut score = 0.0f32;
        let isolated = trimmed.len() <= cleaned.len() + 15;
        if isolated {
            score += 0.35;
        }
        if mostly_uppercase(&text[start..end]) {
            score += 0.2;
        }
        let numbered = !prefix.is_empty() && LINE_NUMBERING.is_match(prefix);
        if numbered {
            score += 0.2;
        }
        if line.contains(cleaned.as_str()) {
            score += 0.25;
        }
        let content_start = ls + (line.len() - line.trim_start().len());
        let c_start = if numbered && content_start >= from { content_start } else { start };
        let c_end = if isolated { ls + line.trim_end().len() } else { end };
        out.push(Candidate { start: c_start, end: c_end.max(end), confidence: score.min(1.0) });
    }
    out
}

fn mostly_uppercase(s: &str) -> bool {
    let letters: Vec<char> = s.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return false;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    upper * 5 >= letters.len() * 4
}
