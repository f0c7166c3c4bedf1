//! Split oversized text into ordered, size-bounded parts.
//!
//! Cuts prefer paragraph breaks, then sentence ends, and only as a last
//! resort a hard split on a char boundary. Parts tile the input exactly:
//! concatenating their contents (labels stripped) gives back the input.

use regex::Regex;
use std::sync::LazyLock;

static PART_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\n]*, part \d+/\d+\]\n").expect("valid part label regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Granularity { Paragraph, Sentence }

/// Byte range of one part within the partitioned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpan { pub start: usize, pub end: usize, pub hard_split: bool }

impl PartSpan {
    pub fn len(&self) -> usize { self.end - self.start }
    pub fn is_empty(&self) -> bool { self.start == self.end }
}

/// One ordered part. `offset` is relative to the partitioned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub ordinal: u32,
    pub total: u32,
    pub offset: usize,
    pub content: String,
    /// Provenance label; `None` when the input needed no split.
    pub label: Option<String>,
    pub hard_split: bool,
}

impl Part {
    pub fn end(&self) -> usize {
        self.offset + self.content.len()
    }

    pub fn labeled(&self) -> String {
        match &self.label {
            Some(l) => format!("{l}{}", self.content),
            None => self.content.clone(),
        }
    }
}

/// `[Title, part n/total]` followed by a newline.
pub fn part_label(title: &str, ordinal: u32, total: u32) -> String {
    format!("[{}, part {}/{}]\n", title.trim(), ordinal, total)
}

/// Remove a leading part label, if present.
pub fn strip_part_label(s: &str) -> &str {
    match PART_LABEL.find(s) {
        Some(m) => &s[m.end()..],
        None => s,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ContentPartitioner {
    label_reserve: usize,
}

impl Default for ContentPartitioner {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ContentPartitioner {
    /// `label_reserve` bytes are kept free per part for its label; at most a
    /// quarter of the bound is ever reserved.
    pub fn new(label_reserve: usize) -> Self {
        Self { label_reserve }
    }

    fn budget(&self, max_chars: usize) -> usize {
        let reserve = self.label_reserve.min(max_chars / 4);
        max_chars.saturating_sub(reserve).max(1)
    }

    /// Labeled parts of `raw`. Input within `max_chars` comes back as a
    /// single unlabeled part.
    pub fn partition(&self, raw: &str, max_chars: usize, title: &str) -> Vec<Part> {
        if raw.len() <= max_chars {
            return vec![Part {
                ordinal: 1,
                total: 1,
                offset: 0,
                content: raw.to_string(),
                label: None,
                hard_split: false,
            }];
        }
        let spans = self.partition_spans(raw, max_chars);
        let total = spans.len() as u32;
        spans
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let ordinal = i as u32 + 1;
                Part {
                    ordinal,
                    total,
                    offset: s.start,
                    content: raw[s.start..s.end].to_string(),
                    label: Some(part_label(title, ordinal, total)),
                    hard_split: s.hard_split,
                }
            })
            .collect()
    }

    /// Unlabeled spans tiling `raw`, each within the label-adjusted budget.
    pub fn partition_spans(&self, raw: &str, max_chars: usize) -> Vec<PartSpan> {
        if raw.len() <= max_chars {
            return vec![PartSpan { start: 0, end: raw.len(), hard_split: false }];
        }
        let budget = self.budget(max_chars);
        let mut out = Vec::new();
        pack(raw, 0, raw.len(), budget, Granularity::Paragraph, &mut out);
        out
    }
}

/// Units ending after each "\n\n" run; the separator stays with the unit before it.
fn paragraph_units(text: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    let slice = &text[start..end];
    let mut units = Vec::new();
    let mut cursor = 0usize;
    for (i, _) in slice.match_indices("\n\n") {
        let cut = i + 2;
        if cut > cursor {
            units.push((start + cursor, start + cut));
            cursor = cut;
        }
    }
    if cursor < slice.len() {
        units.push((start + cursor, end));
    }
    units
}

/// Units ending after ". ", "! " or "? " (the following whitespace char included).
fn sentence_units(text: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    let slice = &text[start..end];
    let mut units = Vec::new();
    let mut cursor = 0usize;
    let mut chars = slice.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(j, next)) = chars.peek() {
            if next.is_whitespace() {
                let cut = j + next.len_utf8();
                units.push((start + cursor, start + cut));
                cursor = cut;
                chars.next();
            }
        }
    }
    if cursor < slice.len() {
        units.push((start + cursor, end));
    }
    units
}

fn pack(text: &str, start: usize, end: usize, budget: usize, level: Granularity, out: &mut Vec<PartSpan>) {
    let units = match level {
        Granularity::Paragraph => paragraph_units(text, start, end),
        Granularity::Sentence => sentence_units(text, start, end),
    };
    let mut current: Option<(usize, usize)> = None;
    for (us, ue) in units {
        if ue - us > budget {
            if let Some((cs, ce)) = current.take() {
                out.push(PartSpan { start: cs, end: ce, hard_split: false });
            }
            match level {
                Granularity::Paragraph => pack(text, us, ue, budget, Granularity::Sentence, out),
                Granularity::Sentence => hard_split(text, us, ue, budget, out),
            }
            continue;
        }
        current = match current {
            Some((cs, _)) if ue - cs <= budget => Some((cs, ue)),
            Some((cs, ce)) => {
                out.push(PartSpan { start: cs, end: ce, hard_split: false });
                Some((us, ue))
            }
            None => Some((us, ue)),
        };
    }
    if let Some((cs, ce)) = current {
        out.push(PartSpan { start: cs, end: ce, hard_split: false });
    }
}

fn hard_split(text: &str, start: usize, end: usize, budget: usize, out: &mut Vec<PartSpan>) {
    let mut pos = start;
    while pos < end {
        let mut cut = (pos + budget).min(end);
        while cut > pos && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == pos {
            // A single char wider than the budget still has to go somewhere.
            cut = pos + 1;
            while cut < end && !text.is_char_boundary(cut) {
                cut += 1;
            }
        }
        out.push(PartSpan { start: pos, end: cut, hard_split: true });
        pos = cut;
    }
}
