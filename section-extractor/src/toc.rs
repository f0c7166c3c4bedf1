//! Validation and normalization of proposed TOC entries.

use section_model::TocEntry;
use thiserror::Error;

pub const MAX_LEVEL: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTocEntry {
    #[error("title is empty")]
    EmptyTitle,
    #[error("page start {0} is not a positive page number")]
    PageStart(u32),
    #[error("level {0} is outside 1..=4")]
    Level(u32),
}

/// Entries that survived validation plus the ones that did not.
#[derive(Debug, Clone, Default)]
pub struct TocValidation {
    pub entries: Vec<TocEntry>,
    pub rejected: Vec<(TocEntry, InvalidTocEntry)>,
}

pub fn check_entry(entry: &TocEntry) -> Result<(), InvalidTocEntry> {
    if entry.title.trim().is_empty() {
        return Err(InvalidTocEntry::EmptyTitle);
    }
    if entry.page_start < 1 {
        return Err(InvalidTocEntry::PageStart(entry.page_start));
    }
    if !(1..=MAX_LEVEL).contains(&entry.level) {
        return Err(InvalidTocEntry::Level(entry.level));
    }
    Ok(())
}

/// Drop invalid entries, trim titles and repair `page_end < page_start`.
pub fn validate_entries(entries: &[TocEntry]) -> TocValidation {
    let mut out = TocValidation::default();
    for entry in entries {
        match check_entry(entry) {
            Ok(()) => {
                let mut e = entry.clone();
                e.title = e.title.trim().to_string();
                if e.page_end < e.page_start {
                    e.page_end = e.page_start;
                }
                out.entries.push(e);
            }
            Err(reason) => {
                tracing::warn!(title = %entry.title, level = entry.level, page_start = entry.page_start, %reason, "dropping invalid toc entry");
                out.rejected.push((entry.clone(), reason));
            }
        }
    }
    out
}

/// Stable sort by starting page; equal pages keep proposer order.
pub fn sort_by_page(entries: &mut [TocEntry]) {
    entries.sort_by_key(|e| e.page_start);
}

/// A top-level entry's `page_end` becomes the next top-level entry's
/// `page_start` (the shared page is counted in both). The last top-level
/// entry keeps its own end.
pub fn normalize_page_ranges(entries: &mut [TocEntry]) {
    let tops: Vec<usize> = (0..entries.len()).filter(|&i| entries[i].level == 1).collect();
    for w in tops.windows(2) {
        let next_start = entries[w[1]].page_start;
        let e = &mut entries[w[0]];
        e.page_end = next_start.max(e.page_start);
    }
    for e in entries.iter_mut() {
        if e.page_end < e.page_start {
            e.page_end = e.page_start;
        }
    }
}

/// Validation, stable page sort and page-range normalization in one step.
pub fn prepare_entries(entries: &[TocEntry]) -> TocValidation {
    let mut v = validate_entries(entries);
    sort_by_page(&mut v.entries);
    normalize_page_ranges(&mut v.entries);
    v
}
