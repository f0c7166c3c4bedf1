//! Structure a form-feed separated text file into a SQLite store.
//!
//! cargo run -p ingest-service --example ingest_text -- book.txt sections.db

use ingest_service::{IngestService, PatternTocProposer, ServiceConfig};
use section_model::{DocumentId, RawDocumentText};
use section_store::SqliteSectionRepo;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let input = args.next().ok_or("usage: ingest_text <text-file> [db-path]")?;
    let db = args.next().unwrap_or_else(|| "target/demo/sections.db".to_string());
    if let Some(dir) = std::path::Path::new(&db).parent() {
        std::fs::create_dir_all(dir)?;
    }

    let raw = std::fs::read_to_string(&input)?;
    let doc = RawDocumentText::from_pages(raw.split('\x0c'));
    let doc_id = DocumentId(
        std::path::Path::new(&input).file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or(input.clone()),
    );

    let cfg = ServiceConfig::default();
    let proposer = PatternTocProposer::new(&cfg.params);
    let mut svc = IngestService::new(cfg, SqliteSectionRepo::open(&db)?);
    let report = svc.ingest_document(&doc_id, &doc, &proposer, None, None)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
