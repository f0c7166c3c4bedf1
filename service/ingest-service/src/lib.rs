use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use section_extractor::{BuildMode, SectionChunker, StructureBuilder, StructureError, StructureParams};
use section_model::{DocumentId, RawDocumentText};
use section_store::{DocumentRecord, SectionSink, StoreError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod proposer;

pub use proposer::{JsonTocProposer, PatternTocProposer, ProposerError, StaticTocProposer, TocProposer};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("structure error: {0}")]
    Structure(#[from] StructureError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("canceled")]
    Canceled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    pub params: StructureParams,
    /// SQLite file for persisted sections; `None` keeps the store in memory.
    pub db_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Load a (possibly partial) JSON config; absent fields keep defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| ServiceError::Io(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| ServiceError::Config(format!("{}: {e}", path.as_ref().display())))
    }
}

/// Cooperative cancellation handle shared across long-running operations.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    pub fn new() -> Self { Self(Arc::new(AtomicBool::new(false))) }
    pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed); }
    pub fn is_canceled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

/// Progress events emitted while one document is ingested.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Start { doc_id: DocumentId, text_len: usize },
    TocProposed { entries: usize },
    Structured { sections: usize, mode: BuildMode },
    Chunked { chunks: usize },
    Committed { sections: usize, chunks: usize },
    Canceled,
}

/// Outcome of one successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub doc_id: DocumentId,
    pub mode: BuildMode,
    pub content_sha256: String,
    pub proposer: String,
    pub proposed_entries: usize,
    pub rejected_entries: usize,
    pub located_entries: usize,
    pub estimated_entries: usize,
    pub sections: usize,
    pub chunks: usize,
    /// Set when the proposer failed and the build fell back to content windows.
    pub toc_error: Option<String>,
}

#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<(DocumentId, Result<IngestReport, ServiceError>)>,
    /// True when the batch stopped early; unprocessed documents have no outcome.
    pub canceled: bool,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_ok()).count()
    }
}

/// Lowercase hex SHA-256 of the document text.
pub fn content_fingerprint(doc: &RawDocumentText) -> String {
    hex::encode(Sha256::digest(doc.text().as_bytes()))
}

/// Propose → structure → chunk → persist, one document at a time.
pub struct IngestService<S: SectionSink> {
    cfg: ServiceConfig,
    builder: StructureBuilder,
    chunker: SectionChunker,
    sink: S,
}

impl<S: SectionSink> IngestService<S> {
    pub fn new(cfg: ServiceConfig, sink: S) -> Self {
        let builder = StructureBuilder::new(cfg.params.clone());
        Self { cfg, builder, chunker: SectionChunker::new(), sink }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.cfg
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Structure one document and replace whatever was stored for it.
    ///
    /// A failing proposer is not fatal: the document is structured from
    /// content windows and the error is recorded in the report. Cancellation
    /// is checked before any work and again right before the store commit,
    /// so a canceled run never leaves a partial write.
    pub fn ingest_document(
        &mut self,
        doc_id: &DocumentId,
        doc: &RawDocumentText,
        proposer: &dyn TocProposer,
        cancel: Option<&CancelToken>,
        mut progress: Option<&mut dyn FnMut(ProgressEvent)>,
    ) -> Result<IngestReport, ServiceError> {
        if let Some(cb) = progress.as_deref_mut() { cb(ProgressEvent::Start { doc_id: doc_id.clone(), text_len: doc.len() }); }
        if cancel.is_some_and(CancelToken::is_canceled) {
            if let Some(cb) = progress.as_deref_mut() { cb(ProgressEvent::Canceled); }
            return Err(ServiceError::Canceled);
        }

        let (toc, toc_error) = match proposer.propose(doc) {
            Ok(entries) => (entries, None),
            Err(e) => {
                tracing::warn!(doc_id = %doc_id.0, proposer = proposer.name(), error = %e, "toc proposal failed, using content windows");
                (Vec::new(), Some(e.to_string()))
            }
        };
        if let Some(cb) = progress.as_deref_mut() { cb(ProgressEvent::TocProposed { entries: toc.len() }); }

        let structure = self.builder.build(doc_id, doc, &toc)?;
        if let Some(cb) = progress.as_deref_mut() {
            cb(ProgressEvent::Structured { sections: structure.sections.len(), mode: structure.mode });
        }

        let chunks = self.chunker.chunk_all(&structure.sections, self.cfg.params.max_chunk_chars);
        if let Some(cb) = progress.as_deref_mut() { cb(ProgressEvent::Chunked { chunks: chunks.len() }); }

        if cancel.is_some_and(CancelToken::is_canceled) {
            tracing::info!(doc_id = %doc_id.0, "ingestion canceled before commit");
            if let Some(cb) = progress.as_deref_mut() { cb(ProgressEvent::Canceled); }
            return Err(ServiceError::Canceled);
        }

        let sha = content_fingerprint(doc);
        let mut record = DocumentRecord::new(doc_id.clone(), sha.clone(), structure.mode.as_str());
        record.title = structure.sections.first().map(|s| s.clean_title.clone());
        record.text_len = doc.len();
        record.page_count = doc.page_count();
        record.section_count = structure.sections.len();
        record.chunk_count = chunks.len();
        self.sink.replace_document(&record, &structure.sections, &chunks)?;
        if let Some(cb) = progress.as_deref_mut() {
            cb(ProgressEvent::Committed { sections: structure.sections.len(), chunks: chunks.len() });
        }

        tracing::info!(
            doc_id = %doc_id.0,
            mode = structure.mode.as_str(),
            sections = structure.sections.len(),
            chunks = chunks.len(),
            "document ingested"
        );
        Ok(IngestReport {
            doc_id: doc_id.clone(),
            mode: structure.mode,
            content_sha256: sha,
            proposer: proposer.name().to_string(),
            proposed_entries: toc.len(),
            rejected_entries: structure.rejected_entries,
            located_entries: structure.located_count(),
            estimated_entries: structure.estimated_count(),
            sections: structure.sections.len(),
            chunks: chunks.len(),
            toc_error,
        })
    }

    /// Documents are processed in order; one failure does not stop the batch,
    /// cancellation does.
    pub fn ingest_batch<'a, I>(
        &mut self,
        docs: I,
        proposer: &dyn TocProposer,
        cancel: Option<&CancelToken>,
        mut progress: Option<&mut dyn FnMut(ProgressEvent)>,
    ) -> BatchReport
    where
        I: IntoIterator<Item = (&'a DocumentId, &'a RawDocumentText)>,
    {
        let mut outcomes = Vec::new();
        for (doc_id, doc) in docs {
            if cancel.is_some_and(CancelToken::is_canceled) {
                tracing::info!(processed = outcomes.len(), "batch canceled");
                if let Some(cb) = progress.as_deref_mut() { cb(ProgressEvent::Canceled); }
                return BatchReport { outcomes, canceled: true };
            }
            let reborrow = progress.as_mut().map(|cb| &mut **cb as &mut dyn FnMut(ProgressEvent));
            let result = self.ingest_document(doc_id, doc, proposer, cancel, reborrow);
            if let Err(e) = &result {
                tracing::warn!(doc_id = %doc_id.0, error = %e, "document failed");
            }
            let canceled = matches!(result, Err(ServiceError::Canceled));
            outcomes.push((doc_id.clone(), result));
            if canceled {
                return BatchReport { outcomes, canceled: true };
            }
        }
        BatchReport { outcomes, canceled: false }
    }
}
