use section_extractor::{structure_and_chunk, StructureParams};
use section_model::{DocumentId, RawDocumentText, TocEntry};
use section_store::{DocumentRecord, SectionSink, SectionStoreRead, SqliteSectionRepo};

fn sample() -> (DocumentId, RawDocumentText, Vec<TocEntry>) {
    let body = "Racunarska mreza povezuje vise racunara. ".repeat(12);
    let text = format!("1. HARDVER\n\n{body}\n\n2. SOFTVER\n\n{body}\n\n2.1. Operativni sistemi\n\n{body}");
    let toc = vec![
        TocEntry::new("1. HARDVER", 1, 1, 2),
        TocEntry::new("2. SOFTVER", 1, 3, 5),
        TocEntry::new("2.1. Operativni sistemi", 2, 4, 5),
    ];
    (DocumentId("udzbenik".into()), RawDocumentText::from_text(text), toc)
}

#[test]
fn sections_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("sections.db");
    let (doc_id, doc, toc) = sample();
    let params = StructureParams { max_chunk_chars: 200, ..StructureParams::default() };
    let (structure, chunks) = structure_and_chunk(&doc_id, &doc, &toc, &params).unwrap();
    assert_eq!(structure.sections.len(), 3);

    {
        let mut repo = SqliteSectionRepo::open(&db).unwrap();
        let mut record = DocumentRecord::new(doc_id.clone(), "feedface", structure.mode.as_str());
        record.text_len = doc.len();
        repo.replace_document(&record, &structure.sections, &chunks).unwrap();
    }

    let repo = SqliteSectionRepo::open(&db).unwrap();
    let record = repo.get_document(&doc_id).unwrap().expect("document stored");
    assert_eq!(record.build_mode, "toc");
    assert_eq!(record.text_len, doc.len());
    let sections = repo.list_sections(&doc_id).unwrap();
    assert_eq!(sections, structure.sections);
    assert_eq!(sections[2].parent_section_id.as_ref(), Some(&sections[1].section_id));
    assert_eq!(repo.list_chunks(&doc_id).unwrap(), chunks);
}

#[test]
fn documents_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let mut repo = SqliteSectionRepo::open(dir.path().join("s.db")).unwrap();
    let (_, doc, toc) = sample();
    let params = StructureParams::default();
    for name in ["a", "b"] {
        let id = DocumentId(name.into());
        let (structure, chunks) = structure_and_chunk(&id, &doc, &toc, &params).unwrap();
        repo.replace_document(&DocumentRecord::new(id, "x", "toc"), &structure.sections, &chunks).unwrap();
    }
    repo.delete_document(&DocumentId("a".into())).unwrap();
    assert!(repo.list_sections(&DocumentId("a".into())).unwrap().is_empty());
    assert_eq!(repo.list_sections(&DocumentId("b".into())).unwrap().len(), 3);
    assert_eq!(repo.list_documents().unwrap().len(), 1);
}
