//! Section-boundary extraction: match TOC titles in raw text, resolve
//! section spans, partition oversized content and chunk the result.

pub mod boundary_resolver;
pub mod content_partitioner;
pub mod heading;
pub mod params;
pub mod section_chunker;
pub mod structure_builder;
pub mod title_matcher;
pub mod toc;
pub mod toc_detect;
pub mod toc_json;

pub use boundary_resolver::{BoundaryResolver, ResolvedSpan};
pub use content_partitioner::{part_label, strip_part_label, ContentPartitioner, Part, PartSpan};
pub use params::{StructureParams, STRUCTURE_DEFAULTS};
pub use section_chunker::SectionChunker;
pub use structure_builder::{check_invariants, BuildMode, DocumentStructure, EntryReport, StructureBuilder, StructureError};
pub use title_matcher::TitleMatcher;
pub use toc::{prepare_entries, InvalidTocEntry, TocValidation};
pub use toc_detect::PatternTocDetector;
pub use toc_json::{parse_toc_response, TocParseError};

use section_model::{Chunk, DocumentId, RawDocumentText, TocEntry};

/// Build sections and chunk them with the same parameters.
pub fn structure_and_chunk(
    doc_id: &DocumentId,
    doc: &RawDocumentText,
    toc: &[TocEntry],
    params: &StructureParams,
) -> Result<(DocumentStructure, Vec<Chunk>), StructureError> {
    let structure = StructureBuilder::new(params.clone()).build(doc_id, doc, toc)?;
    let chunks = SectionChunker::new().chunk_all(&structure.sections, params.max_chunk_chars);
    Ok((structure, chunks))
}
