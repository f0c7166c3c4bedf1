//! Shared models used across crates

pub mod document;

pub use document::{normalize_whitespace, PageStart, RawDocumentText};

use serde::{Deserialize, Serialize};

/// Bumped when the persisted layout of `Section`/`Chunk` changes.
pub const SCHEMA_MAJOR: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub String);

/// Structural role of a TOC entry or section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Chapter,
    Section,
    Subsection,
    Paragraph,
}

impl SemanticType {
    /// Default role for an outline depth (1 = chapter).
    pub fn from_level(level: u32) -> Self {
        match level {
            0 | 1 => SemanticType::Chapter,
            2 => SemanticType::Section,
            3 => SemanticType::Subsection,
            _ => SemanticType::Paragraph,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Chapter => "chapter",
            SemanticType::Section => "section",
            SemanticType::Subsection => "subsection",
            SemanticType::Paragraph => "paragraph",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chapter" => Some(SemanticType::Chapter),
            "section" => Some(SemanticType::Section),
            "subsection" => Some(SemanticType::Subsection),
            "paragraph" => Some(SemanticType::Paragraph),
            _ => None,
        }
    }
}

/// A proposed section header, as delivered by a TOC proposer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocEntry {
    /// Title as it appears in the source (e.g. "1.1. Pojam").
    pub title: String,
    /// Outline depth; 1 is top level.
    pub level: u32,
    /// First page of the entry (1-based, inclusive).
    #[serde(alias = "page_start")]
    pub page_start: u32,
    /// Last page of the entry (inclusive). Zero means "unknown" and is repaired on validation.
    #[serde(default, alias = "page_end")]
    pub page_end: u32,
    #[serde(default, alias = "parent_entry_id", skip_serializing_if = "Option::is_none")]
    pub parent_entry_id: Option<String>,
    #[serde(default, alias = "semantic_type", skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<SemanticType>,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, level: u32, page_start: u32, page_end: u32) -> Self {
        Self {
            title: title.into(),
            level,
            page_start,
            page_end,
            parent_entry_id: None,
            semantic_type: None,
        }
    }

    /// Declared semantic type, or the level's default when the proposer left it out.
    pub fn resolved_semantic_type(&self) -> SemanticType {
        self.semantic_type.unwrap_or_else(|| SemanticType::from_level(self.level))
    }
}

/// Which title-matching strategy produced a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    ExactStructural,
    NormalizedCase,
    WordSequence,
    StrippedPrefix,
    PartialScored,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::ExactStructural => "exact_structural",
            MatchStrategy::NormalizedCase => "normalized_case",
            MatchStrategy::WordSequence => "word_sequence",
            MatchStrategy::StrippedPrefix => "stripped_prefix",
            MatchStrategy::PartialScored => "partial_scored",
        }
    }
}

/// Result of matching one TOC title against the document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocatedTitle {
    pub found: bool,
    /// Byte offset where the header starts; `None` when not found.
    pub char_position: Option<usize>,
    /// The literal substring that matched (empty when not found).
    pub matched_text: String,
    pub strategy: Option<MatchStrategy>,
    /// 0..=1; exact strategies report 1.0.
    pub confidence: f32,
}

impl LocatedTitle {
    pub fn not_found() -> Self {
        Self { found: false, char_position: None, matched_text: String::new(), strategy: None, confidence: 0.0 }
    }

    pub fn found(position: usize, matched_text: impl Into<String>, strategy: MatchStrategy, confidence: f32) -> Self {
        Self {
            found: true,
            char_position: Some(position),
            matched_text: matched_text.into(),
            strategy: Some(strategy),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Offset just past the matched header text.
    pub fn end_position(&self) -> Option<usize> {
        self.char_position.map(|p| p + self.matched_text.len())
    }
}

/// A finalized structural unit of a document.
///
/// Offsets are UTF-8 byte offsets into the document text. `char_start..char_end`
/// covers the header line (for located sections) plus the body; `content` is the
/// exact slice starting at `content_offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub section_id: SectionId,
    pub doc_id: DocumentId,
    /// Shared by all parts of one oversized section.
    pub base_section_id: SectionId,
    pub title: String,
    /// Title without leading numbering or separator artifacts.
    pub clean_title: String,
    pub level: u32,
    pub parent_section_id: Option<SectionId>,
    /// Outline path such as "1.2.3".
    pub path: String,
    pub semantic_type: SemanticType,
    pub page_start: u32,
    pub page_end: u32,
    pub char_start: usize,
    pub char_end: usize,
    pub content_offset: usize,
    pub content: String,
    pub is_main_part: bool,
    pub part_number: u32,
    pub total_parts: u32,
    /// Provenance label for continuation parts ("[Title, part 2/3]\n").
    pub part_label: Option<String>,
    /// Produced by the last-resort character split.
    pub hard_split: bool,
    /// Span came from page-position estimation instead of a title match.
    pub estimated: bool,
}

impl Section {
    /// Content prefixed with its part label, for display or storage fields that
    /// need provenance inline.
    pub fn labeled_content(&self) -> String {
        match &self.part_label {
            Some(label) => format!("{}{}", label, self.content),
            None => self.content.clone(),
        }
    }

    pub fn content_end(&self) -> usize {
        self.content_offset + self.content.len()
    }
}

/// A retrieval-sized slice of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub section_id: SectionId,
    /// Order within the section, 0-based.
    pub paragraph_index: u32,
    /// Absolute byte offsets into the document text.
    pub char_start: usize,
    pub char_end: usize,
    pub content: String,
    pub title: Option<String>,
    pub hard_split: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toc_entry_reads_camel_and_snake_case() {
        let camel: TocEntry = serde_json::from_str(
            r#"{"title":"1. HARDVER","level":1,"pageStart":15,"pageEnd":22,"semanticType":"chapter"}"#,
        )
        .unwrap();
        let snake: TocEntry =
            serde_json::from_str(r#"{"title":"1. HARDVER","level":1,"page_start":15,"page_end":22}"#).unwrap();
        assert_eq!(camel.page_start, 15);
        assert_eq!(snake.page_end, 22);
        assert_eq!(camel.semantic_type, Some(SemanticType::Chapter));
        assert_eq!(snake.resolved_semantic_type(), SemanticType::Chapter);
    }

    #[test]
    fn missing_page_end_defaults_to_zero() {
        let e: TocEntry = serde_json::from_str(r#"{"title":"Uvod","level":2,"pageStart":3}"#).unwrap();
        assert_eq!(e.page_end, 0);
        assert_eq!(e.resolved_semantic_type(), SemanticType::Section);
    }

    #[test]
    fn labeled_content_only_for_parts() {
        let mut s = Section {
            section_id: SectionId("d:s0000".into()),
            doc_id: DocumentId("d".into()),
            base_section_id: SectionId("d:s0000".into()),
            title: "Uvod".into(),
            clean_title: "Uvod".into(),
            level: 1,
            parent_section_id: None,
            path: "1".into(),
            semantic_type: SemanticType::Chapter,
            page_start: 1,
            page_end: 1,
            char_start: 0,
            char_end: 4,
            content_offset: 0,
            content: "body".into(),
            is_main_part: true,
            part_number: 1,
            total_parts: 1,
            part_label: None,
            hard_split: false,
            estimated: false,
        };
        assert_eq!(s.labeled_content(), "body");
        s.part_label = Some("[Uvod, part 2/2]\n".into());
        assert_eq!(s.labeled_content(), "[Uvod, part 2/2]\nbody");
        assert_eq!(s.content_end(), 4);
    }
}
