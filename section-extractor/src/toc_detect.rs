//! Heuristic TOC proposer that reads printed table-of-contents lines
//! ("1.1. Pojam ........ 15") from a document's front matter.

use crate::heading::floor_char_boundary;
use crate::params::StructureParams;
use regex::Regex;
use section_model::{RawDocumentText, SemanticType, TocEntry};
use std::sync::LazyLock;

static TOC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<num>\d+(?:\.\d+)*\.?)?\s*(?P<title>\S.*?)(?:\s*(?:\.\s*){2,}|\s*…+\s*|\s{2,})(?P<page>\d{1,4})\s*$",
    )
    .expect("valid toc line regex")
});

/// Fewer matching lines than this is noise, not a TOC.
const MIN_TOC_LINES: usize = 3;
/// Lower bound on the scanned prefix when there is no page index.
const MIN_SCAN_BYTES: usize = 4_000;

/// Parse one TOC listing line. `page_end` is set to `page_start`.
pub fn parse_toc_line(line: &str) -> Option<TocEntry> {
    let caps = TOC_LINE.captures(line)?;
    let title = caps.name("title")?.as_str().trim();
    if !title.chars().any(char::is_alphabetic) {
        return None;
    }
    let page: u32 = caps.name("page")?.as_str().parse().ok()?;
    if page == 0 {
        return None;
    }
    let (full_title, level) = match caps.name("num") {
        Some(num) => {
            let depth = num.as_str().trim_end_matches('.').split('.').count() as u32;
            (format!("{} {}", num.as_str(), title), depth.clamp(1, 4))
        }
        None => (title.to_string(), 1),
    };
    let mut entry = TocEntry::new(full_title, level, page, page);
    entry.semantic_type = Some(SemanticType::from_level(level));
    Some(entry)
}

#[derive(Debug, Clone)]
pub struct PatternTocDetector {
    scan_pages: u32,
}

impl Default for PatternTocDetector {
    fn default() -> Self {
        Self::new(&StructureParams::default())
    }
}

impl PatternTocDetector {
    pub fn new(params: &StructureParams) -> Self {
        Self { scan_pages: params.toc_scan_pages }
    }

    /// Entries in listing order; empty when the front matter has no
    /// recognizable TOC.
    pub fn detect(&self, doc: &RawDocumentText) -> Vec<TocEntry> {
        let text = doc.text();
        let region_end = if doc.has_page_index() {
            self.scan_pages.checked_add(1).and_then(|p| doc.page_offset(p)).unwrap_or(text.len())
        } else {
            (text.len() * 15 / 100).max(MIN_SCAN_BYTES).min(text.len())
        };
        let region = &text[..floor_char_boundary(text, region_end)];

        let mut entries: Vec<TocEntry> = Vec::new();
        for line in region.lines() {
            let Some(entry) = parse_toc_line(line) else { continue };
            // Printed page numbers only grow in a real TOC.
            if entries.last().is_some_and(|prev| entry.page_start < prev.page_start) {
                continue;
            }
            entries.push(entry);
        }
        if entries.len() < MIN_TOC_LINES {
            tracing::debug!(candidates = entries.len(), "no printed toc detected");
            return Vec::new();
        }

        let last_page = doc.page_count();
        let starts: Vec<u32> = entries.iter().map(|e| e.page_start).collect();
        for (i, e) in entries.iter_mut().enumerate() {
            e.page_end = match starts.get(i + 1) {
                Some(&next) => next.max(e.page_start),
                None => last_page.max(e.page_start),
            };
        }
        tracing::debug!(entries = entries.len(), "printed toc detected");
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbered_dot_leader_line() {
        let e = parse_toc_line("1.1. Pojam računarskog sistema ........ 15").unwrap();
        assert_eq!(e.title, "1.1. Pojam računarskog sistema");
        assert_eq!(e.level, 2);
        assert_eq!(e.page_start, 15);
        assert_eq!(e.semantic_type, Some(SemanticType::Section));
    }

    #[test]
    fn parses_unnumbered_line_with_wide_gap() {
        let e = parse_toc_line("PREDGOVOR     5").unwrap();
        assert_eq!(e.title, "PREDGOVOR");
        assert_eq!(e.level, 1);
        assert_eq!(e.page_start, 5);
    }

    #[test]
    fn rejects_prose_and_bare_numbers() {
        assert!(parse_toc_line("Ovo je recenica sa brojem 15").is_none());
        assert!(parse_toc_line("12 .... 13").is_none());
    }

    #[test]
    fn detects_toc_in_front_matter() {
        let pages = [
            "NASLOVNA STRANA",
            "SADRŽAJ\nPREDGOVOR ........ 3\n1. HARDVER ........ 4\n1.1. Procesor ........ 4\n2. SOFTVER ........ 6",
            "PREDGOVOR\nTekst.",
            "1. HARDVER\nTekst.",
            "1.1. Procesor",
            "2. SOFTVER\nTekst.",
            "Kraj.",
        ];
        let doc = RawDocumentText::from_pages(pages);
        let toc = PatternTocDetector::default().detect(&doc);
        let titles: Vec<_> = toc.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["PREDGOVOR", "1. HARDVER", "1.1. Procesor", "2. SOFTVER"]);
        assert_eq!(toc[0].page_end, 4);
        assert_eq!(toc[3].page_end, 7);
    }

    #[test]
    fn unbounded_scan_pages_reads_whole_text() {
        let params = StructureParams { toc_scan_pages: u32::MAX, ..StructureParams::default() };
        let doc = RawDocumentText::from_pages(["Uvod ........ 1\nMreže ........ 2\nKraj ........ 3", "Uvod", "Mreže"]);
        let toc = PatternTocDetector::new(&params).detect(&doc);
        assert_eq!(toc.len(), 3);
    }

    #[test]
    fn too_few_lines_is_not_a_toc() {
        let doc = RawDocumentText::from_text("Uvod ........ 3\nTekst bez sadrzaja.");
        assert!(PatternTocDetector::default().detect(&doc).is_empty());
    }
}
