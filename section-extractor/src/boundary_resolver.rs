//! Turn located titles into non-overlapping character spans.

use crate::heading::{ceil_char_boundary, floor_char_boundary, is_header_like, line_end, next_line_start};
use crate::params::StructureParams;
use regex::Regex;
use section_model::{LocatedTitle, RawDocumentText, TocEntry};
use serde::Serialize;
use std::sync::LazyLock;

/// Header lines that close the last section (back matter).
static TERMINATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:\d+(?:\.\d+)*\.?[ \t]+)?(?:kori[šs][ćc]ena[ \t]+)?(?:literatura|bibliografija|bibliography|references?|zaklju[čc]ak|conclusions?|indeks|index)[ \t]*:?[ \t]*$",
    )
    .expect("valid terminator regex")
});

/// Span of one TOC entry. `header_start..body_start` is the header line
/// (empty for estimated spans); the body runs to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSpan {
    pub header_start: usize,
    pub body_start: usize,
    pub end: usize,
    pub estimated: bool,
}

impl ResolvedSpan {
    pub fn body_len(&self) -> usize {
        self.end - self.body_start
    }
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    header_start: usize,
    body_start: usize,
    estimated_end: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct BoundaryResolver {
    header_snap_lines: usize,
}

impl Default for BoundaryResolver {
    fn default() -> Self {
        Self::new(&StructureParams::default())
    }
}

impl BoundaryResolver {
    pub fn new(params: &StructureParams) -> Self {
        Self { header_snap_lines: params.header_snap_lines }
    }

    /// Resolve one span per entry, in entry order.
    ///
    /// Located entries end where the next entry (located or estimated) begins;
    /// the last one ends at a back-matter header or the end of the text.
    /// Unlocated entries get a page-based estimate clamped between their
    /// neighbours, so spans never overlap and starts never decrease.
    pub fn resolve(&self, doc: &RawDocumentText, entries: &[(TocEntry, LocatedTitle)]) -> Vec<ResolvedSpan> {
        let text = doc.text();
        let len = text.len();
        let n = entries.len();

        let mut next_located = vec![None; n];
        let mut upcoming = None;
        for i in (0..n).rev() {
            next_located[i] = upcoming;
            if let Some(p) = located_position(&entries[i].1) {
                upcoming = Some(p);
            }
        }

        let total_pages = estimated_total_pages(doc, entries);
        let mut anchors: Vec<Anchor> = Vec::with_capacity(n);
        let mut floor = 0usize;
        for (i, (entry, located)) in entries.iter().enumerate() {
            match located_position(located) {
                Some(p) => {
                    let body = (p + located.matched_text.len()).min(len);
                    anchors.push(Anchor { header_start: p, body_start: body, estimated_end: None });
                    floor = body;
                }
                None => {
                    let ceiling = next_located[i].unwrap_or(len).max(floor);
                    let (est_start, est_end) = estimate_span(doc, entry, total_pages);
                    let snapped = self.snap_to_header(text, est_start.clamp(floor, ceiling), ceiling);
                    let start = snapped.clamp(floor, ceiling);
                    let end = est_end.clamp(start, ceiling);
                    tracing::debug!(
                        title = %entry.title,
                        estimated_start = est_start,
                        start,
                        end,
                        "title not located, using page estimate"
                    );
                    anchors.push(Anchor { header_start: start, body_start: start, estimated_end: Some(end) });
                    floor = start;
                }
            }
        }

        let mut spans = Vec::with_capacity(n);
        for i in 0..n {
            let a = anchors[i];
            let next = anchors.get(i + 1).map(|b| b.header_start);
            let end = match (a.estimated_end, next) {
                (None, Some(next)) => next,
                (None, None) => terminator_after(text, a.body_start).unwrap_or(len),
                (Some(est), Some(next)) => est.min(next),
                (Some(est), None) => est.min(terminator_after(text, a.body_start).unwrap_or(len)),
            };
            spans.push(ResolvedSpan {
                header_start: a.header_start,
                body_start: a.body_start,
                end: end.max(a.body_start),
                estimated: a.estimated_end.is_some(),
            });
        }
        spans
    }

    /// First header-like line within the snap window, else `start` itself.
    fn snap_to_header(&self, text: &str, start: usize, ceiling: usize) -> usize {
        let mut pos = next_line_start(text, start);
        for _ in 0..self.header_snap_lines {
            if pos >= ceiling || pos >= text.len() {
                break;
            }
            let end = line_end(text, pos);
            let line = &text[pos..end];
            if is_header_like(line) {
                return pos + (line.len() - line.trim_start().len());
            }
            pos = end + 1;
        }
        start
    }
}

fn located_position(located: &LocatedTitle) -> Option<usize> {
    if located.found {
        located.char_position
    } else {
        None
    }
}

/// Page count used for interpolation: the larger of what the page index and
/// the TOC claim.
fn estimated_total_pages(doc: &RawDocumentText, entries: &[(TocEntry, LocatedTitle)]) -> u32 {
    let toc_max = entries.iter().map(|(e, _)| e.page_end.max(e.page_start)).max().unwrap_or(0);
    doc.page_count().max(toc_max).max(1)
}

/// Offset range for an entry's pages: exact from the page index when it
/// knows the page, otherwise linear interpolation over the text length.
pub fn estimate_span(doc: &RawDocumentText, entry: &TocEntry, total_pages: u32) -> (usize, usize) {
    let text = doc.text();
    let len = text.len();
    let first = entry.page_start.max(1);
    let last = entry.page_end.max(first);
    if let Some(start) = doc.page_offset(first) {
        let end = last.checked_add(1).and_then(|p| doc.page_offset(p)).unwrap_or(len).max(start);
        return (start, end);
    }
    let per_page = (len / total_pages.max(1) as usize).max(1);
    let start = ((first - 1) as usize).saturating_mul(per_page).min(len);
    let end = (last as usize).saturating_mul(per_page).min(len);
    (floor_char_boundary(text, start), ceil_char_boundary(text, end.max(start)))
}

/// Start of the first back-matter header line at or after `from`.
pub fn terminator_after(text: &str, from: usize) -> Option<usize> {
    TERMINATOR.find_at(text, from).map(|m| {
        let s = m.as_str();
        m.start() + (s.len() - s.trim_start().len())
    })
}
