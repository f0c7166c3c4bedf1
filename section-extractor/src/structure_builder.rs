//! Orchestrates matching, boundary resolution and partitioning into the
//! final section list for one document.

use crate::boundary_resolver::{BoundaryResolver, ResolvedSpan};
use crate::content_partitioner::ContentPartitioner;
use crate::heading::{clean_title, is_header_like, trim_span};
use crate::params::StructureParams;
use crate::title_matcher::TitleMatcher;
use crate::toc::prepare_entries;
use section_model::{DocumentId, LocatedTitle, RawDocumentText, Section, SectionId, SemanticType, TocEntry};
use serde::Serialize;
use thiserror::Error;

/// Lines inspected for a fallback window title.
const FALLBACK_TITLE_LINES: usize = 12;

#[derive(Debug, Error)]
pub enum StructureError {
    #[error("section {section} span {start}..{end} is outside the document (len {len})")]
    OutOfBounds { section: String, start: usize, end: usize, len: usize },
    #[error("section {next} starts at {next_start} before {previous} ends at {previous_end}")]
    Overlap { previous: String, previous_end: usize, next: String, next_start: usize },
    #[error("section {section} content does not match the document text at {offset}")]
    ContentMismatch { section: String, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    Toc,
    ContentFallback,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Toc => "toc",
            BuildMode::ContentFallback => "content_fallback",
        }
    }
}

/// What happened to one (validated) TOC entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReport {
    pub entry: TocEntry,
    pub located: LocatedTitle,
    pub span: ResolvedSpan,
    /// Number of sections (parts) emitted for the entry; zero when dropped.
    pub emitted_parts: u32,
}

#[derive(Debug, Clone)]
pub struct DocumentStructure {
    pub doc_id: DocumentId,
    pub mode: BuildMode,
    pub sections: Vec<Section>,
    pub reports: Vec<EntryReport>,
    /// TOC entries rejected by validation.
    pub rejected_entries: usize,
}

impl DocumentStructure {
    pub fn located_count(&self) -> usize {
        self.reports.iter().filter(|r| r.located.found).count()
    }

    pub fn estimated_count(&self) -> usize {
        self.reports.iter().filter(|r| r.span.estimated).count()
    }
}

/// Tracks the parent chain of emitted main sections.
#[derive(Debug, Default)]
struct Outline {
    stack: Vec<OutlineFrame>,
    top_count: u32,
}

#[derive(Debug)]
struct OutlineFrame { level: u32, id: SectionId, path: String, children: u32 }

impl Outline {
    /// Register a main section; returns its parent and hierarchical path.
    fn enter(&mut self, level: u32, id: &SectionId) -> (Option<SectionId>, String) {
        while self.stack.last().is_some_and(|top| top.level >= level) {
            self.stack.pop();
        }
        let ordinal = match self.stack.last_mut() {
            Some(parent) => {
                parent.children += 1;
                parent.children
            }
            None => {
                self.top_count += 1;
                self.top_count
            }
        };
        let (parent, path) = match self.stack.last() {
            Some(p) => (Some(p.id.clone()), format!("{}.{}", p.path, ordinal)),
            None => (None, ordinal.to_string()),
        };
        self.stack.push(OutlineFrame { level, id: id.clone(), path: path.clone(), children: 0 });
        (parent, path)
    }
}

#[derive(Debug, Clone)]
pub struct StructureBuilder {
    params: StructureParams,
    matcher: TitleMatcher,
    resolver: BoundaryResolver,
    partitioner: ContentPartitioner,
}

impl Default for StructureBuilder {
    fn default() -> Self {
        Self::new(StructureParams::default())
    }
}

impl StructureBuilder {
    pub fn new(params: StructureParams) -> Self {
        Self {
            matcher: TitleMatcher::new(&params),
            resolver: BoundaryResolver::new(&params),
            partitioner: ContentPartitioner::new(params.part_label_reserve),
            params,
        }
    }

    pub fn params(&self) -> &StructureParams {
        &self.params
    }

    /// Turn a document and its proposed TOC into finalized sections.
    ///
    /// Falls back to content windows when no entry is valid or none can be
    /// located. Fails only when the produced sections break an offset
    /// invariant.
    pub fn build(
        &self,
        doc_id: &DocumentId,
        doc: &RawDocumentText,
        toc: &[TocEntry],
    ) -> Result<DocumentStructure, StructureError> {
        let prepared = prepare_entries(toc);
        let rejected = prepared.rejected.len();
        if prepared.entries.is_empty() {
            tracing::info!(doc_id = %doc_id.0, proposed = toc.len(), "no usable toc entries, using content windows");
            let mut out = self.build_content_fallback(doc_id, doc)?;
            out.rejected_entries = rejected;
            return Ok(out);
        }

        let located = self.locate_entries(doc, &prepared.entries);
        if !located.iter().any(|(_, l)| l.found) {
            tracing::warn!(doc_id = %doc_id.0, entries = located.len(), "no toc title located, using content windows");
            let mut out = self.build_content_fallback(doc_id, doc)?;
            out.rejected_entries = rejected;
            return Ok(out);
        }

        let spans = self.resolver.resolve(doc, &located);
        let mut sections = Vec::new();
        let mut reports = Vec::with_capacity(located.len());
        let mut outline = Outline::default();
        let mut index = 0usize;
        for ((entry, loc), span) in located.into_iter().zip(spans) {
            let emitted = self.emit_entry(doc_id, doc, &entry, &span, &mut index, &mut outline, &mut sections);
            reports.push(EntryReport { entry, located: loc, span, emitted_parts: emitted });
        }

        check_invariants(doc, &sections)?;
        tracing::info!(
            doc_id = %doc_id.0,
            sections = sections.len(),
            entries = reports.len(),
            rejected,
            "document structured from toc"
        );
        Ok(DocumentStructure { doc_id: doc_id.clone(), mode: BuildMode::Toc, sections, reports, rejected_entries: rejected })
    }

    /// Each search starts at the previous located entry's body start.
    fn locate_entries(&self, doc: &RawDocumentText, entries: &[TocEntry]) -> Vec<(TocEntry, LocatedTitle)> {
        let mut search_from = 0usize;
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let located = self.matcher.locate(doc, &entry.title, search_from);
            if let Some(end) = located.end_position().filter(|_| located.found) {
                tracing::debug!(
                    title = %entry.title,
                    strategy = located.strategy.map(|s| s.as_str()).unwrap_or("none"),
                    position = located.char_position.unwrap_or(0),
                    confidence = located.confidence,
                    "title located"
                );
                search_from = end;
            }
            out.push((entry.clone(), located));
        }
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_entry(
        &self,
        doc_id: &DocumentId,
        doc: &RawDocumentText,
        entry: &TocEntry,
        span: &ResolvedSpan,
        index: &mut usize,
        outline: &mut Outline,
        out: &mut Vec<Section>,
    ) -> u32 {
        let text = doc.text();
        let (cs, ce) = trim_span(text, span.body_start, span.end);
        let content = &text[cs..ce];
        if content.chars().count() < self.params.min_section_chars {
            tracing::debug!(title = %entry.title, len = content.len(), "section content below minimum, dropped");
            return 0;
        }

        let base_id = SectionId(format!("{}:s{:04}", doc_id.0, *index));
        *index += 1;
        let (parent, path) = outline.enter(entry.level, &base_id);
        let clean = clean_title(&entry.title);
        let semantic_type = entry.resolved_semantic_type();

        let parts = self.partitioner.partition(content, self.params.max_section_chars, &entry.title);
        if parts.len() > 1 {
            tracing::debug!(title = %entry.title, len = content.len(), parts = parts.len(), "oversized section partitioned");
        }
        let count = parts.len() as u32;
        for part in parts {
            let main = part.ordinal == 1;
            let offset = cs + part.offset;
            let char_start = if main { span.header_start } else { offset };
            // The last part owns the trailing whitespace up to the next header.
            let char_end = if part.ordinal == part.total { span.end } else { offset + part.content.len() };
            let (page_start, page_end) = page_range(doc, entry, char_start, char_end);
            out.push(Section {
                section_id: if main { base_id.clone() } else { SectionId(format!("{}:p{}", base_id.0, part.ordinal)) },
                doc_id: doc_id.clone(),
                base_section_id: base_id.clone(),
                title: entry.title.clone(),
                clean_title: clean.clone(),
                level: entry.level,
                parent_section_id: if main { parent.clone() } else { Some(base_id.clone()) },
                path: path.clone(),
                semantic_type,
                page_start,
                page_end,
                char_start,
                char_end,
                content_offset: offset,
                content: part.content,
                is_main_part: main,
                part_number: part.ordinal,
                total_parts: part.total,
                part_label: part.label,
                hard_split: part.hard_split,
                estimated: span.estimated,
            });
        }
        count
    }

    /// Fixed-size windows over the whole text, cut on paragraph and
    /// sentence boundaries, for documents without a usable TOC.
    pub fn build_content_fallback(
        &self,
        doc_id: &DocumentId,
        doc: &RawDocumentText,
    ) -> Result<DocumentStructure, StructureError> {
        let text = doc.text();
        let window = self.params.fallback_window_chars.clamp(1, self.params.max_section_chars.max(1));
        let mut windows: Vec<(usize, usize)> = ContentPartitioner::new(0)
            .partition_spans(text, window)
            .into_iter()
            .map(|s| trim_span(text, s.start, s.end))
            .filter(|(s, e)| e > s)
            .collect();

        if windows.len() >= 2 {
            let (ls, le) = windows[windows.len() - 1];
            let (ps, _) = windows[windows.len() - 2];
            if text[ls..le].chars().count() < self.params.min_section_chars
                && le - ps <= self.params.max_section_chars
            {
                windows.pop();
                let n = windows.len();
                windows[n - 1].1 = le;
            }
        }

        let mut sections = Vec::with_capacity(windows.len());
        for (i, (start, end)) in windows.into_iter().enumerate() {
            let content = &text[start..end];
            let title = window_title(content).unwrap_or_else(|| format!("Part {}", i + 1));
            let id = SectionId(format!("{}:s{:04}", doc_id.0, i));
            let page_start = doc.page_at(start);
            let page_end = doc.page_at(end.saturating_sub(1).max(start));
            sections.push(Section {
                section_id: id.clone(),
                doc_id: doc_id.clone(),
                base_section_id: id,
                clean_title: clean_title(&title),
                title,
                level: 1,
                parent_section_id: None,
                path: (i + 1).to_string(),
                semantic_type: SemanticType::Section,
                page_start,
                page_end,
                char_start: start,
                char_end: end,
                content_offset: start,
                content: content.to_string(),
                is_main_part: true,
                part_number: 1,
                total_parts: 1,
                part_label: None,
                hard_split: false,
                estimated: false,
            });
        }

        check_invariants(doc, &sections)?;
        tracing::info!(doc_id = %doc_id.0, sections = sections.len(), "document structured from content windows");
        Ok(DocumentStructure {
            doc_id: doc_id.clone(),
            mode: BuildMode::ContentFallback,
            sections,
            reports: Vec::new(),
            rejected_entries: 0,
        })
    }
}

/// First header-looking line near the top of a window.
fn window_title(content: &str) -> Option<String> {
    content
        .lines()
        .take(FALLBACK_TITLE_LINES)
        .map(str::trim)
        .find(|l| is_header_like(l))
        .map(str::to_string)
}

/// Pages from the page index when there is one, else the TOC's range.
fn page_range(doc: &RawDocumentText, entry: &TocEntry, start: usize, end: usize) -> (u32, u32) {
    if doc.has_page_index() {
        let first = doc.page_at(start);
        (first, doc.page_at(end.saturating_sub(1).max(start)).max(first))
    } else {
        (entry.page_start, entry.page_end.max(entry.page_start))
    }
}

/// Sections must be ordered, non-overlapping, in bounds, and carry content
/// equal to the document slice they claim.
pub fn check_invariants(doc: &RawDocumentText, sections: &[Section]) -> Result<(), StructureError> {
    let text = doc.text();
    let len = text.len();
    let mut previous: Option<&Section> = None;
    for s in sections {
        if s.char_end < s.char_start || s.char_end > len {
            return Err(StructureError::OutOfBounds {
                section: s.section_id.0.clone(),
                start: s.char_start,
                end: s.char_end,
                len,
            });
        }
        if let Some(p) = previous {
            if s.char_start < p.char_end {
                return Err(StructureError::Overlap {
                    previous: p.section_id.0.clone(),
                    previous_end: p.char_end,
                    next: s.section_id.0.clone(),
                    next_start: s.char_start,
                });
            }
        }
        let within = s.content_offset >= s.char_start && s.content_end() <= s.char_end;
        if !within || text.get(s.content_offset..s.content_end()) != Some(s.content.as_str()) {
            return Err(StructureError::ContentMismatch { section: s.section_id.0.clone(), offset: s.content_offset });
        }
        previous = Some(s);
    }
    Ok(())
}
