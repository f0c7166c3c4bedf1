//! TOC proposers: anything that can suggest section headers for a document.

use section_extractor::{parse_toc_response, PatternTocDetector, StructureParams, TocParseError};
use section_model::{RawDocumentText, TocEntry};

#[derive(Debug, thiserror::Error)]
pub enum ProposerError {
    #[error("unparseable toc response: {0}")]
    Parse(#[from] TocParseError),
    #[error("proposer unavailable: {0}")]
    Unavailable(String),
}

/// Source of proposed TOC entries. Proposals may be wrong or incomplete;
/// the structure builder validates and locates them.
pub trait TocProposer {
    fn name(&self) -> &str;
    fn propose(&self, doc: &RawDocumentText) -> Result<Vec<TocEntry>, ProposerError>;
}

/// Reads a printed table of contents from the front matter.
#[derive(Debug, Clone, Default)]
pub struct PatternTocProposer {
    detector: PatternTocDetector,
}

impl PatternTocProposer {
    pub fn new(params: &StructureParams) -> Self {
        Self { detector: PatternTocDetector::new(params) }
    }
}

impl TocProposer for PatternTocProposer {
    fn name(&self) -> &str {
        "pattern"
    }

    fn propose(&self, doc: &RawDocumentText) -> Result<Vec<TocEntry>, ProposerError> {
        Ok(self.detector.detect(doc))
    }
}

/// Fixed entries, e.g. loaded from a JSON file next to the document.
#[derive(Debug, Clone, Default)]
pub struct StaticTocProposer {
    entries: Vec<TocEntry>,
}

impl StaticTocProposer {
    pub fn new(entries: Vec<TocEntry>) -> Self {
        Self { entries }
    }

    /// Accepts the same shapes as a model response (fenced or bare JSON).
    pub fn from_json(raw: &str) -> Result<Self, ProposerError> {
        Ok(Self { entries: parse_toc_response(raw)? })
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }
}

impl TocProposer for StaticTocProposer {
    fn name(&self) -> &str {
        "static"
    }

    fn propose(&self, _doc: &RawDocumentText) -> Result<Vec<TocEntry>, ProposerError> {
        Ok(self.entries.clone())
    }
}

/// Wraps an external responder (typically a language model call) that
/// returns raw text containing a JSON TOC.
pub struct JsonTocProposer<F>
where
    F: Fn(&RawDocumentText) -> Result<String, ProposerError>,
{
    name: String,
    respond: F,
}

impl<F> JsonTocProposer<F>
where
    F: Fn(&RawDocumentText) -> Result<String, ProposerError>,
{
    pub fn new(name: impl Into<String>, respond: F) -> Self {
        Self { name: name.into(), respond }
    }
}

impl<F> TocProposer for JsonTocProposer<F>
where
    F: Fn(&RawDocumentText) -> Result<String, ProposerError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(&self, doc: &RawDocumentText) -> Result<Vec<TocEntry>, ProposerError> {
        let raw = (self.respond)(doc)?;
        let entries = parse_toc_response(&raw)?;
        tracing::debug!(proposer = %self.name, entries = entries.len(), "toc response parsed");
        Ok(entries)
    }
}
