use ingest_service::{
    CancelToken, IngestService, PatternTocProposer, ProgressEvent, ProposerError, ServiceConfig, ServiceError,
    StaticTocProposer, TocProposer,
};
use section_extractor::BuildMode;
use section_model::{DocumentId, RawDocumentText, TocEntry};
use section_store::{SectionStoreRead, SqliteSectionRepo};

struct FailingProposer;

impl TocProposer for FailingProposer {
    fn name(&self) -> &str {
        "failing"
    }

    fn propose(&self, _doc: &RawDocumentText) -> Result<Vec<TocEntry>, ProposerError> {
        Err(ProposerError::Unavailable("model offline".into()))
    }
}

fn book() -> RawDocumentText {
    let body = "Racunar obradjuje podatke prema uputstvima programa. ".repeat(10);
    let toc_page = "SADRŽAJ\n\n1. HARDVER ........ 2\n2. SOFTVER ........ 3\n3. MREŽE ........ 4".to_string();
    RawDocumentText::from_pages([
        toc_page,
        format!("1. HARDVER\n\n{body}"),
        format!("2. SOFTVER\n\n{body}"),
        format!("3. MREŽE\n\n{body}"),
    ])
}

fn service() -> IngestService<SqliteSectionRepo> {
    IngestService::new(ServiceConfig::default(), SqliteSectionRepo::open_in_memory().unwrap())
}

#[test]
fn pattern_proposer_structures_and_persists() {
    let mut svc = service();
    let doc = book();
    let id = DocumentId("knjiga".into());
    let proposer = PatternTocProposer::new(&svc.config().params);
    let mut events = Vec::new();
    let mut record = |e: ProgressEvent| events.push(e);

    let report = svc.ingest_document(&id, &doc, &proposer, None, Some(&mut record)).unwrap();

    assert_eq!(report.mode, BuildMode::Toc);
    assert_eq!(report.proposed_entries, 3);
    assert_eq!(report.located_entries, 3);
    assert_eq!(report.sections, 3);
    assert!(report.toc_error.is_none());
    assert!(matches!(events.first(), Some(ProgressEvent::Start { .. })));
    assert_eq!(events.last(), Some(&ProgressEvent::Committed { sections: 3, chunks: report.chunks }));

    let stored = svc.sink().list_sections(&id).unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[1].clean_title, "SOFTVER");
    let meta = svc.sink().get_document(&id).unwrap().unwrap();
    assert_eq!(meta.content_sha256, report.content_sha256);
    assert_eq!(meta.page_count, 4);
}

#[test]
fn failing_proposer_falls_back_to_windows() {
    let mut svc = service();
    let id = DocumentId("d".into());
    let report = svc.ingest_document(&id, &book(), &FailingProposer, None, None).unwrap();
    assert_eq!(report.mode, BuildMode::ContentFallback);
    assert!(report.toc_error.as_deref().unwrap().contains("model offline"));
    assert!(report.sections >= 1);
    assert_eq!(svc.sink().get_document(&id).unwrap().unwrap().build_mode, "content_fallback");
}

#[test]
fn cancel_before_commit_writes_nothing() {
    let mut svc = service();
    let id = DocumentId("d".into());
    let token = CancelToken::new();
    let trigger = token.clone();
    let mut on_event = |e: ProgressEvent| {
        if matches!(e, ProgressEvent::Chunked { .. }) {
            trigger.cancel();
        }
    };
    let proposer = StaticTocProposer::new(vec![TocEntry::new("1. HARDVER", 1, 2, 2)]);

    let err = svc.ingest_document(&id, &book(), &proposer, Some(&token), Some(&mut on_event)).unwrap_err();

    assert!(matches!(err, ServiceError::Canceled));
    assert!(svc.sink().get_document(&id).unwrap().is_none());
    assert_eq!(svc.sink().counts().unwrap().sections, 0);
}

#[test]
fn batch_stops_on_cancel_and_keeps_finished_documents() {
    let mut svc = service();
    let docs: Vec<(DocumentId, RawDocumentText)> =
        ["a", "b", "c"].iter().map(|n| (DocumentId(n.to_string()), book())).collect();
    let token = CancelToken::new();
    let trigger = token.clone();
    let mut committed = 0;
    let mut on_event = |e: ProgressEvent| {
        if matches!(e, ProgressEvent::Committed { .. }) {
            committed += 1;
            if committed == 2 {
                trigger.cancel();
            }
        }
    };
    let proposer = PatternTocProposer::default();

    let report = svc.ingest_batch(docs.iter().map(|(i, d)| (i, d)), &proposer, Some(&token), Some(&mut on_event));

    assert!(report.canceled);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(svc.sink().list_documents().unwrap().len(), 2);
}

#[test]
fn reingesting_replaces_previous_rows() {
    let mut svc = service();
    let id = DocumentId("d".into());
    let doc = book();
    let proposer = PatternTocProposer::default();
    let first = svc.ingest_document(&id, &doc, &proposer, None, None).unwrap();
    let second = svc.ingest_document(&id, &doc, &proposer, None, None).unwrap();
    assert_eq!(first, second);
    let counts = svc.into_sink().counts().unwrap();
    assert_eq!(counts.documents, 1);
    assert_eq!(counts.sections, first.sections as i64);
    assert_eq!(counts.chunks, first.chunks as i64);
}
