use serde::{Deserialize, Serialize};

/// First byte offset of a page within the concatenated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStart {
    pub page: u32,
    pub offset: usize,
}

/// Cleaned, concatenated text of one ingested document plus its page index.
///
/// Built once per ingestion run and passed by reference to every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocumentText {
    text: String,
    pages: Vec<PageStart>,
}

impl RawDocumentText {
    /// Wrap text that is already whitespace-normalized.
    ///
    /// Page entries are sorted by offset; entries past the end of the text or
    /// off a char boundary are dropped.
    pub fn new(text: impl Into<String>, mut pages: Vec<PageStart>) -> Self {
        let text = text.into();
        pages.retain(|p| p.offset <= text.len() && text.is_char_boundary(p.offset));
        pages.sort_by_key(|p| (p.offset, p.page));
        pages.dedup_by_key(|p| p.page);
        Self { text, pages }
    }

    /// Text without a page index (page lookups fall back to page 1).
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into(), pages: Vec::new() }
    }

    /// Normalize each page and join them with a paragraph break, recording
    /// where every page begins. Pages are numbered from 1.
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut text = String::new();
        let mut index = Vec::new();
        for (i, page) in pages.into_iter().enumerate() {
            let cleaned = normalize_whitespace(page.as_ref());
            if !text.is_empty() && !cleaned.is_empty() {
                text.push_str("\n\n");
            }
            index.push(PageStart { page: i as u32 + 1, offset: text.len() });
            text.push_str(&cleaned);
        }
        Self { text, pages: index }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn pages(&self) -> &[PageStart] {
        &self.pages
    }

    pub fn has_page_index(&self) -> bool {
        !self.pages.is_empty()
    }

    /// Highest page number known to the index (0 without an index).
    pub fn page_count(&self) -> u32 {
        self.pages.iter().map(|p| p.page).max().unwrap_or(0)
    }

    /// Page containing `offset`; 1 when there is no index.
    pub fn page_at(&self, offset: usize) -> u32 {
        if self.pages.is_empty() {
            return 1;
        }
        match self.pages.binary_search_by(|p| p.offset.cmp(&offset)) {
            Ok(mut i) => {
                // Empty pages share an offset with the next page; report the last one.
                while i + 1 < self.pages.len() && self.pages[i + 1].offset == offset {
                    i += 1;
                }
                self.pages[i].page
            }
            Err(0) => self.pages[0].page,
            Err(i) => self.pages[i - 1].page,
        }
    }

    /// Offset where `page` begins, when the index knows it.
    pub fn page_offset(&self, page: u32) -> Option<usize> {
        self.pages.iter().find(|p| p.page == page).map(|p| p.offset)
    }
}

/// Normalize extracted text: LF line endings, tabs as spaces, no control
/// characters, no trailing spaces, at most one blank line between paragraphs.
pub fn normalize_whitespace(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;
    for line in unified.split('\n') {
        let cleaned: String = line
            .chars()
            .map(|c| if c == '\t' { ' ' } else { c })
            .filter(|c| !c.is_control())
            .collect();
        let cleaned = cleaned.trim_end();
        if cleaned.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        out.push_str(cleaned);
        blank_run = 0;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_blank_runs_and_controls() {
        let raw = "PREDGOVOR  \r\n\r\n\r\n\r\nTekst\tovde\x0c\n\n\nKraj";
        assert_eq!(normalize_whitespace(raw), "PREDGOVOR\n\nTekst ovde\n\nKraj");
    }

    #[test]
    fn from_pages_records_offsets() {
        let doc = RawDocumentText::from_pages(["Prva strana", "", "Treca strana"]);
        assert_eq!(doc.text(), "Prva strana\n\nTreca strana");
        assert_eq!(doc.page_offset(1), Some(0));
        assert_eq!(doc.page_offset(3), Some(13));
        assert_eq!(doc.page_at(0), 1);
        assert_eq!(doc.page_at(10), 1);
        assert_eq!(doc.page_at(13), 3);
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn page_at_without_index_is_first_page() {
        let doc = RawDocumentText::from_text("abc");
        assert!(!doc.has_page_index());
        assert_eq!(doc.page_at(2), 1);
        assert_eq!(doc.page_count(), 0);
    }
}
