use std::env;
use std::fs;
use std::path::Path;

use ingest_service::{IngestService, PatternTocProposer, ServiceConfig, StaticTocProposer, TocProposer};
use section_extractor::PatternTocDetector;
use section_model::{DocumentId, RawDocumentText, Section};
use section_store::{SectionStoreRead, SqliteSectionRepo};

fn print_usage() {
    eprintln!(
        "Usage:\n\
         structure-inspect build FILE [--toc TOC_JSON] [--config CFG_JSON] [--db DB_PATH] [--doc DOC] [--sections]\n\
         structure-inspect detect FILE\n\
         structure-inspect show DB_PATH --doc DOC [--chunks]\n\
         \n\
         Notes: FILE is plain text with pages separated by form feeds (\\x0c).\n\
         Without --toc the printed table of contents is detected from the front matter.\n\
         Without --db the result is kept in memory. Set RUST_LOG=debug for matcher details.\n"
    );
}

fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn load_document(path: &str) -> Result<RawDocumentText, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("read {path}: {e}"))?;
    Ok(RawDocumentText::from_pages(raw.split('\x0c')))
}

fn doc_id_for(path: &str, hint: Option<String>) -> DocumentId {
    let id = hint.unwrap_or_else(|| {
        Path::new(path).file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| path.to_string())
    });
    DocumentId(id)
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    let mut it = s.chars();
    let truncated: String = it.by_ref().take(max_chars).collect();
    if it.next().is_some() { format!("{}…", truncated) } else { truncated }
}

fn print_sections(sections: &[Section]) {
    for s in sections {
        let indent = "  ".repeat(s.level.saturating_sub(1) as usize);
        let part = if s.total_parts > 1 { format!(" [{}/{}]", s.part_number, s.total_parts) } else { String::new() };
        let flag = if s.estimated { " (estimated)" } else { "" };
        println!(
            "{:<8} {}{}{}{}  bytes {}..{}  pages {}-{}",
            s.path,
            indent,
            truncate_chars(&s.title, 60),
            part,
            flag,
            s.char_start,
            s.char_end,
            s.page_start,
            s.page_end
        );
    }
}

fn do_build(mut tail: Vec<String>) -> Result<(), String> {
    if tail.is_empty() || tail[0].starts_with('-') {
        return Err("build requires FILE".into());
    }
    let file = tail.remove(0);
    let rest = tail;

    let mut toc_path: Option<String> = None;
    let mut cfg_path: Option<String> = None;
    let mut db_path: Option<String> = None;
    let mut doc_hint: Option<String> = None;
    let mut show_sections = false;

    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--toc" => { if i+1<rest.len() { toc_path = Some(rest[i+1].clone()); i+=2; } else { return Err("--toc requires path".into()); } }
            "--config" => { if i+1<rest.len() { cfg_path = Some(rest[i+1].clone()); i+=2; } else { return Err("--config requires path".into()); } }
            "--db" => { if i+1<rest.len() { db_path = Some(rest[i+1].clone()); i+=2; } else { return Err("--db requires path".into()); } }
            "--doc" => { if i+1<rest.len() { doc_hint = Some(rest[i+1].clone()); i+=2; } else { return Err("--doc requires value".into()); } }
            "--sections" => { show_sections = true; i+=1; }
            other => return Err(format!("unknown option {other}")),
        }
    }

    let mut cfg = match &cfg_path {
        Some(p) => ServiceConfig::from_json_file(p).map_err(|e| e.to_string())?,
        None => ServiceConfig::default(),
    };
    if db_path.is_some() {
        cfg.db_path = db_path.map(Into::into);
    }

    let proposer: Box<dyn TocProposer> = match &toc_path {
        Some(p) => {
            let raw = fs::read_to_string(p).map_err(|e| format!("read {p}: {e}"))?;
            Box::new(StaticTocProposer::from_json(&raw).map_err(|e| e.to_string())?)
        }
        None => Box::new(PatternTocProposer::new(&cfg.params)),
    };

    let repo = match &cfg.db_path {
        Some(p) => {
            let p = p.to_string_lossy().into_owned();
            ensure_parent_dir(&p).map_err(|e| e.to_string())?;
            SqliteSectionRepo::open(&p).map_err(|e| e.to_string())?
        }
        None => SqliteSectionRepo::open_in_memory().map_err(|e| e.to_string())?,
    };

    let doc = load_document(&file)?;
    let doc_id = doc_id_for(&file, doc_hint);
    let mut svc = IngestService::new(cfg, repo);
    let report = svc.ingest_document(&doc_id, &doc, proposer.as_ref(), None, None).map_err(|e| e.to_string())?;

    println!("{}", serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?);
    if show_sections {
        let sections = svc.sink().list_sections(&doc_id).map_err(|e| e.to_string())?;
        print_sections(&sections);
    }
    Ok(())
}

fn do_detect(tail: Vec<String>) -> Result<(), String> {
    let file = tail.first().ok_or("detect requires FILE")?;
    let doc = load_document(file)?;
    let entries = PatternTocDetector::default().detect(&doc);
    if entries.is_empty() {
        eprintln!("no printed table of contents found");
    }
    println!("{}", serde_json::to_string_pretty(&entries).map_err(|e| e.to_string())?);
    Ok(())
}

fn do_show(mut tail: Vec<String>) -> Result<(), String> {
    if tail.is_empty() || tail[0].starts_with('-') {
        return Err("show requires DB_PATH".into());
    }
    let db_path = tail.remove(0);
    let rest = tail;
    let mut doc: Option<String> = None;
    let mut show_chunks = false;

    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--doc" => { if i+1<rest.len() { doc = Some(rest[i+1].clone()); i+=2; } else { return Err("--doc requires value".into()); } }
            "--chunks" => { show_chunks = true; i+=1; }
            other => return Err(format!("unknown option {other}")),
        }
    }
    let doc_id = DocumentId(doc.ok_or("show requires --doc")?);

    let repo = SqliteSectionRepo::open(&db_path).map_err(|e| e.to_string())?;
    let Some(record) = repo.get_document(&doc_id).map_err(|e| e.to_string())? else {
        return Err(format!("document {} not found in {db_path}", doc_id.0));
    };
    println!("{}", serde_json::to_string_pretty(&record).map_err(|e| e.to_string())?);
    print_sections(&repo.list_sections(&doc_id).map_err(|e| e.to_string())?);
    if show_chunks {
        for c in repo.list_chunks(&doc_id).map_err(|e| e.to_string())? {
            println!("{:<24} {}..{}  {}", c.chunk_id.0, c.char_start, c.char_end, truncate_chars(&c.content.replace('\n', " "), 80));
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { print_usage(); return; }
    let cmd = args.remove(0);
    let res = match cmd.as_str() {
        "build" => do_build(args),
        "detect" => do_detect(args),
        "show" => do_show(args),
        _ => { print_usage(); return; }
    };
    if let Err(err) = res {
        eprintln!("Error: {}", err);
        print_usage();
        std::process::exit(1);
    }
}
