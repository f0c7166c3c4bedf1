pub mod sqlite_repo;

pub use sqlite_repo::{SqliteSectionRepo, StoreCounts};

use section_model::{Chunk, DocumentId, Section, SCHEMA_MAJOR};
use serde::{Deserialize, Serialize};

/// One row per structured document, written together with its sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub doc_id: DocumentId,
    pub schema_version: u16,
    pub title: Option<String>,
    /// Hex SHA-256 of the normalized document text.
    pub content_sha256: String,
    pub text_len: usize,
    pub page_count: u32,
    /// "toc" or "content_fallback".
    pub build_mode: String,
    pub section_count: usize,
    pub chunk_count: usize,
    /// RFC 3339 timestamp of the build.
    pub built_at: String,
}

impl DocumentRecord {
    pub fn new(doc_id: DocumentId, content_sha256: impl Into<String>, build_mode: impl Into<String>) -> Self {
        Self {
            doc_id,
            schema_version: SCHEMA_MAJOR,
            title: None,
            content_sha256: content_sha256.into(),
            text_len: 0,
            page_count: 0,
            build_mode: build_mode.into(),
            section_count: 0,
            chunk_count: 0,
            built_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Write side: a document's structure is always replaced as a whole.
pub trait SectionSink {
    /// Delete everything stored for `record.doc_id` and insert the new rows
    /// atomically. Rebuilding a document is idempotent.
    fn replace_document(&mut self, record: &DocumentRecord, sections: &[Section], chunks: &[Chunk]) -> Result<(), StoreError>;
}

/// Read side used by inspection tools and tests.
pub trait SectionStoreRead {
    fn get_document(&self, doc_id: &DocumentId) -> Result<Option<DocumentRecord>, StoreError>;
    fn list_sections(&self, doc_id: &DocumentId) -> Result<Vec<Section>, StoreError>;
    fn list_chunks(&self, doc_id: &DocumentId) -> Result<Vec<Chunk>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("row for document {found} passed while replacing {expected}")]
    DocumentMismatch { expected: String, found: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}
