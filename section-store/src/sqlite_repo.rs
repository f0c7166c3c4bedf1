use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use section_model::{Chunk, ChunkId, DocumentId, Section, SectionId, SemanticType};

use crate::{DocumentRecord, SectionSink, SectionStoreRead, StoreError};

#[derive(Debug, thiserror::Error)]
#[error("unknown semantic type {0:?}")]
struct UnknownSemanticType(String);

/// Row counts across all documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCounts {
    pub documents: i64,
    pub sections: i64,
    pub chunks: i64,
}

/// SQLite-backed section store.
pub struct SqliteSectionRepo {
    conn: Connection,
}

impl SqliteSectionRepo {
    /// Open an in-memory repository and initialize schema.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.init()?;
        Ok(repo)
    }

    /// Open a file-backed repository at `path` and initialize schema if absent.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.init()?;
        Ok(repo)
    }

    fn init(&self) -> rusqlite::Result<()> {
        // journal_mode returns a row, so it goes through pragma_update_and_check.
        self.conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        self.conn.pragma_update(None, "synchronous", "FULL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                doc_id TEXT PRIMARY KEY,
                schema_version INTEGER NOT NULL,
                title TEXT,
                content_sha256 TEXT NOT NULL,
                text_len INTEGER NOT NULL,
                page_count INTEGER NOT NULL,
                build_mode TEXT NOT NULL,
                section_count INTEGER NOT NULL,
                chunk_count INTEGER NOT NULL,
                built_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sections (
                rowid INTEGER PRIMARY KEY,
                section_id TEXT NOT NULL,
                doc_id TEXT NOT NULL REFERENCES documents(doc_id) ON DELETE CASCADE,
                ordinal INTEGER NOT NULL,
                base_section_id TEXT NOT NULL,
                title TEXT NOT NULL,
                clean_title TEXT NOT NULL,
                level INTEGER NOT NULL,
                parent_section_id TEXT,
                path TEXT NOT NULL,
                semantic_type TEXT NOT NULL,
                page_start INTEGER NOT NULL,
                page_end INTEGER NOT NULL,
                char_start INTEGER NOT NULL,
                char_end INTEGER NOT NULL,
                content_offset INTEGER NOT NULL,
                content TEXT NOT NULL,
                is_main_part INTEGER NOT NULL,
                part_number INTEGER NOT NULL,
                total_parts INTEGER NOT NULL,
                part_label TEXT,
                hard_split INTEGER NOT NULL,
                estimated INTEGER NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sections_section_id ON sections(section_id);
            CREATE INDEX IF NOT EXISTS idx_sections_doc_ordinal ON sections(doc_id, ordinal);

            CREATE TABLE IF NOT EXISTS chunks (
                rowid INTEGER PRIMARY KEY,
                chunk_id TEXT NOT NULL,
                section_id TEXT NOT NULL REFERENCES sections(section_id) ON DELETE CASCADE,
                doc_id TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                paragraph_index INTEGER NOT NULL,
                char_start INTEGER NOT NULL,
                char_end INTEGER NOT NULL,
                content TEXT NOT NULL,
                title TEXT,
                hard_split INTEGER NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_chunks_chunk_id ON chunks(chunk_id);
            CREATE INDEX IF NOT EXISTS idx_chunks_doc_ordinal ON chunks(doc_id, ordinal);
            "#,
        )?;
        Ok(())
    }

    /// Remove a document with its sections and chunks. Returns deleted document rows.
    pub fn delete_document(&mut self, doc_id: &DocumentId) -> Result<usize, StoreError> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM chunks WHERE doc_id = ?1", params![doc_id.0])?;
        tx.execute("DELETE FROM sections WHERE doc_id = ?1", params![doc_id.0])?;
        let n = tx.execute("DELETE FROM documents WHERE doc_id = ?1", params![doc_id.0])?;
        tx.commit()?;
        Ok(n)
    }

    /// Document records ordered by id.
    pub fn list_documents(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!("{DOCUMENT_SELECT} ORDER BY doc_id"))?;
        let rows = stmt.query_map([], document_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Return row counts for debugging.
    pub fn counts(&self) -> Result<StoreCounts, StoreError> {
        let count = |table: &str| -> rusqlite::Result<i64> {
            self.conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))
        };
        Ok(StoreCounts { documents: count("documents")?, sections: count("sections")?, chunks: count("chunks")? })
    }
}

const DOCUMENT_SELECT: &str = "SELECT doc_id, schema_version, title, content_sha256, text_len, page_count, build_mode, section_count, chunk_count, built_at FROM documents";

const SECTION_SELECT: &str = "SELECT section_id, doc_id, base_section_id, title, clean_title, level, parent_section_id, path, semantic_type, page_start, page_end, char_start, char_end, content_offset, content, is_main_part, part_number, total_parts, part_label, hard_split, estimated FROM sections";

const CHUNK_SELECT: &str =
    "SELECT chunk_id, section_id, paragraph_index, char_start, char_end, content, title, hard_split FROM chunks";

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    Ok(DocumentRecord {
        doc_id: DocumentId(row.get(0)?),
        schema_version: row.get::<_, i64>(1)? as u16,
        title: row.get(2)?,
        content_sha256: row.get(3)?,
        text_len: row.get::<_, i64>(4)? as usize,
        page_count: row.get::<_, i64>(5)? as u32,
        build_mode: row.get(6)?,
        section_count: row.get::<_, i64>(7)? as usize,
        chunk_count: row.get::<_, i64>(8)? as usize,
        built_at: row.get(9)?,
    })
}

fn section_from_row(row: &Row<'_>) -> rusqlite::Result<Section> {
    let semantic: String = row.get(8)?;
    let semantic_type = SemanticType::parse(&semantic).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(UnknownSemanticType(semantic.clone())))
    })?;
    Ok(Section {
        section_id: SectionId(row.get(0)?),
        doc_id: DocumentId(row.get(1)?),
        base_section_id: SectionId(row.get(2)?),
        title: row.get(3)?,
        clean_title: row.get(4)?,
        level: row.get::<_, i64>(5)? as u32,
        parent_section_id: row.get::<_, Option<String>>(6)?.map(SectionId),
        path: row.get(7)?,
        semantic_type,
        page_start: row.get::<_, i64>(9)? as u32,
        page_end: row.get::<_, i64>(10)? as u32,
        char_start: row.get::<_, i64>(11)? as usize,
        char_end: row.get::<_, i64>(12)? as usize,
        content_offset: row.get::<_, i64>(13)? as usize,
        content: row.get(14)?,
        is_main_part: row.get::<_, i64>(15)? != 0,
        part_number: row.get::<_, i64>(16)? as u32,
        total_parts: row.get::<_, i64>(17)? as u32,
        part_label: row.get(18)?,
        hard_split: row.get::<_, i64>(19)? != 0,
        estimated: row.get::<_, i64>(20)? != 0,
    })
}

fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    Ok(Chunk {
        chunk_id: ChunkId(row.get(0)?),
        section_id: SectionId(row.get(1)?),
        paragraph_index: row.get::<_, i64>(2)? as u32,
        char_start: row.get::<_, i64>(3)? as usize,
        char_end: row.get::<_, i64>(4)? as usize,
        content: row.get(5)?,
        title: row.get(6)?,
        hard_split: row.get::<_, i64>(7)? != 0,
    })
}

impl SectionSink for SqliteSectionRepo {
    fn replace_document(&mut self, record: &DocumentRecord, sections: &[Section], chunks: &[Chunk]) -> Result<(), StoreError> {
        let doc_id = &record.doc_id.0;
        if let Some(s) = sections.iter().find(|s| &s.doc_id.0 != doc_id) {
            return Err(StoreError::DocumentMismatch { expected: doc_id.clone(), found: s.doc_id.0.clone() });
        }

        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM chunks WHERE doc_id = ?1", params![doc_id])?;
        tx.execute("DELETE FROM sections WHERE doc_id = ?1", params![doc_id])?;
        tx.execute("DELETE FROM documents WHERE doc_id = ?1", params![doc_id])?;

        tx.execute(
            r#"
            INSERT INTO documents (
                doc_id, schema_version, title, content_sha256, text_len, page_count,
                build_mode, section_count, chunk_count, built_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                doc_id,
                record.schema_version as i64,
                record.title,
                record.content_sha256,
                record.text_len as i64,
                record.page_count as i64,
                record.build_mode,
                sections.len() as i64,
                chunks.len() as i64,
                record.built_at,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO sections (
                    section_id, doc_id, ordinal, base_section_id, title, clean_title, level,
                    parent_section_id, path, semantic_type, page_start, page_end, char_start,
                    char_end, content_offset, content, is_main_part, part_number, total_parts,
                    part_label, hard_split, estimated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)
                "#,
            )?;
            for (ordinal, s) in sections.iter().enumerate() {
                stmt.execute(params![
                    s.section_id.0,
                    doc_id,
                    ordinal as i64,
                    s.base_section_id.0,
                    s.title,
                    s.clean_title,
                    s.level as i64,
                    s.parent_section_id.as_ref().map(|p| p.0.as_str()),
                    s.path,
                    s.semantic_type.as_str(),
                    s.page_start as i64,
                    s.page_end as i64,
                    s.char_start as i64,
                    s.char_end as i64,
                    s.content_offset as i64,
                    s.content,
                    s.is_main_part as i64,
                    s.part_number as i64,
                    s.total_parts as i64,
                    s.part_label,
                    s.hard_split as i64,
                    s.estimated as i64,
                ])?;
            }

            let mut stmt = tx.prepare(
                r#"
                INSERT INTO chunks (
                    chunk_id, section_id, doc_id, ordinal, paragraph_index, char_start, char_end,
                    content, title, hard_split
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;
            for (ordinal, c) in chunks.iter().enumerate() {
                stmt.execute(params![
                    c.chunk_id.0,
                    c.section_id.0,
                    doc_id,
                    ordinal as i64,
                    c.paragraph_index as i64,
                    c.char_start as i64,
                    c.char_end as i64,
                    c.content,
                    c.title,
                    c.hard_split as i64,
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(doc_id = %doc_id, sections = sections.len(), chunks = chunks.len(), "document replaced");
        Ok(())
    }
}

impl SectionStoreRead for SqliteSectionRepo {
    fn get_document(&self, doc_id: &DocumentId) -> Result<Option<DocumentRecord>, StoreError> {
        let rec = self
            .conn
            .query_row(&format!("{DOCUMENT_SELECT} WHERE doc_id = ?1"), params![doc_id.0], document_from_row)
            .optional()?;
        Ok(rec)
    }

    fn list_sections(&self, doc_id: &DocumentId) -> Result<Vec<Section>, StoreError> {
        let mut stmt = self.conn.prepare(&format!("{SECTION_SELECT} WHERE doc_id = ?1 ORDER BY ordinal"))?;
        let rows = stmt.query_map(params![doc_id.0], section_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn list_chunks(&self, doc_id: &DocumentId) -> Result<Vec<Chunk>, StoreError> {
        let mut stmt = self.conn.prepare(&format!("{CHUNK_SELECT} WHERE doc_id = ?1 ORDER BY ordinal"))?;
        let rows = stmt.query_map(params![doc_id.0], chunk_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(doc: &str, idx: usize, content: &str, offset: usize) -> Section {
        let id = format!("{doc}:s{idx:04}");
        Section {
            section_id: SectionId(id.clone()),
            doc_id: DocumentId(doc.into()),
            base_section_id: SectionId(id),
            title: format!("Poglavlje {idx}"),
            clean_title: format!("Poglavlje {idx}"),
            level: 1,
            parent_section_id: None,
            path: (idx + 1).to_string(),
            semantic_type: SemanticType::Chapter,
            page_start: idx as u32 + 1,
            page_end: idx as u32 + 2,
            char_start: offset,
            char_end: offset + content.len(),
            content_offset: offset,
            content: content.into(),
            is_main_part: true,
            part_number: 1,
            total_parts: 1,
            part_label: None,
            hard_split: false,
            estimated: idx == 1,
        }
    }

    fn chunk_of(s: &Section) -> Chunk {
        Chunk {
            chunk_id: ChunkId(format!("{}#0", s.section_id.0)),
            section_id: s.section_id.clone(),
            paragraph_index: 0,
            char_start: s.content_offset,
            char_end: s.content_end(),
            content: s.content.clone(),
            title: Some(s.title.clone()),
            hard_split: false,
        }
    }

    #[test]
    fn replace_then_read_back() {
        let mut repo = SqliteSectionRepo::open_in_memory().unwrap();
        let doc = DocumentId("knjiga".into());
        let sections = vec![section("knjiga", 0, "Prvi deo teksta.", 0), section("knjiga", 1, "Drugi deo.", 20)];
        let chunks: Vec<Chunk> = sections.iter().map(chunk_of).collect();
        let record = DocumentRecord::new(doc.clone(), "abc", "toc");

        repo.replace_document(&record, &sections, &chunks).unwrap();

        let stored = repo.get_document(&doc).unwrap().unwrap();
        assert_eq!(stored.section_count, 2);
        assert_eq!(stored.chunk_count, 2);
        assert_eq!(repo.list_sections(&doc).unwrap(), sections);
        assert_eq!(repo.list_chunks(&doc).unwrap(), chunks);
        assert_eq!(repo.counts().unwrap(), StoreCounts { documents: 1, sections: 2, chunks: 2 });
    }

    #[test]
    fn replacing_twice_keeps_one_copy() {
        let mut repo = SqliteSectionRepo::open_in_memory().unwrap();
        let doc = DocumentId("d".into());
        let sections = vec![section("d", 0, "Tekst.", 0)];
        let chunks: Vec<Chunk> = sections.iter().map(chunk_of).collect();
        let record = DocumentRecord::new(doc.clone(), "abc", "toc");
        repo.replace_document(&record, &sections, &chunks).unwrap();
        repo.replace_document(&record, &sections, &chunks).unwrap();
        assert_eq!(repo.counts().unwrap(), StoreCounts { documents: 1, sections: 1, chunks: 1 });
    }

    #[test]
    fn foreign_section_is_rejected_before_writing() {
        let mut repo = SqliteSectionRepo::open_in_memory().unwrap();
        let record = DocumentRecord::new(DocumentId("a".into()), "abc", "toc");
        let err = repo.replace_document(&record, &[section("b", 0, "x", 0)], &[]).unwrap_err();
        assert!(matches!(err, StoreError::DocumentMismatch { .. }));
        assert_eq!(repo.counts().unwrap(), StoreCounts::default());
    }

    #[test]
    fn failed_replace_leaves_previous_build() {
        let mut repo = SqliteSectionRepo::open_in_memory().unwrap();
        let doc = DocumentId("d".into());
        let sections = vec![section("d", 0, "Stari tekst.", 0)];
        let chunks: Vec<Chunk> = sections.iter().map(chunk_of).collect();
        let record = DocumentRecord::new(doc.clone(), "old", "toc");
        repo.replace_document(&record, &sections, &chunks).unwrap();

        // Duplicate section ids violate the unique index mid-transaction.
        let dup = vec![section("d", 3, "Novo.", 0), section("d", 3, "Novo opet.", 10)];
        let new_record = DocumentRecord::new(doc.clone(), "new", "toc");
        assert!(repo.replace_document(&new_record, &dup, &[]).is_err());

        assert_eq!(repo.get_document(&doc).unwrap().unwrap().content_sha256, "old");
        assert_eq!(repo.list_sections(&doc).unwrap(), sections);
    }

    #[test]
    fn delete_removes_everything() {
        let mut repo = SqliteSectionRepo::open_in_memory().unwrap();
        let doc = DocumentId("d".into());
        let sections = vec![section("d", 0, "Tekst.", 0)];
        let chunks: Vec<Chunk> = sections.iter().map(chunk_of).collect();
        repo.replace_document(&DocumentRecord::new(doc.clone(), "abc", "toc"), &sections, &chunks).unwrap();
        assert_eq!(repo.delete_document(&doc).unwrap(), 1);
        assert!(repo.get_document(&doc).unwrap().is_none());
        assert_eq!(repo.counts().unwrap(), StoreCounts::default());
    }

    #[test]
    fn unknown_semantic_type_is_an_error() {
        let mut repo = SqliteSectionRepo::open_in_memory().unwrap();
        let doc = DocumentId("d".into());
        repo.replace_document(&DocumentRecord::new(doc.clone(), "abc", "toc"), &[section("d", 0, "T.", 0)], &[]).unwrap();
        repo.conn.execute("UPDATE sections SET semantic_type = 'appendix'", []).unwrap();
        assert!(repo.list_sections(&doc).is_err());
    }
}
