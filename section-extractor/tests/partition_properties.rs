use proptest::prelude::*;
use section_extractor::{strip_part_label, ContentPartitioner, SectionChunker, StructureBuilder, TitleMatcher};
use section_model::{DocumentId, RawDocumentText, Section, SectionId, SemanticType, TocEntry};

fn section_with(content: String) -> Section {
    Section {
        section_id: SectionId("p:s0000".into()),
        doc_id: DocumentId("p".into()),
        base_section_id: SectionId("p:s0000".into()),
        title: "Naslov".into(),
        clean_title: "Naslov".into(),
        level: 1,
        parent_section_id: None,
        path: "1".into(),
        semantic_type: SemanticType::Chapter,
        page_start: 1,
        page_end: 1,
        char_start: 0,
        char_end: content.len(),
        content_offset: 0,
        content,
        is_main_part: true,
        part_number: 1,
        total_parts: 1,
        part_label: None,
        hard_split: false,
        estimated: false,
    }
}

proptest! {
    #[test]
    fn partition_is_lossless(raw in "[a-zčćžš .!?\n]{0,600}", max in 1usize..300, reserve in 0usize..40) {
        let parts = ContentPartitioner::new(reserve).partition(&raw, max, "Naslov");
        let joined: String = parts.iter().map(|p| strip_part_label(&p.labeled()).to_string()).collect();
        prop_assert_eq!(joined, raw.clone());
        let mut expected_offset = 0;
        for p in &parts {
            prop_assert_eq!(p.offset, expected_offset);
            expected_offset = p.end();
            if parts.len() > 1 {
                prop_assert!(p.content.len() <= max.max(4));
            }
        }
    }

    #[test]
    fn chunks_reconstruct_section(raw in "[a-zA-Zđž .\n]{1,800}", max in 1usize..200) {
        let section = section_with(raw.clone());
        let chunks = SectionChunker::new().chunk(&section, max);
        let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        prop_assert_eq!(joined, raw);
        for (i, c) in chunks.iter().enumerate() {
            prop_assert_eq!(c.paragraph_index as usize, i);
        }
    }

    #[test]
    fn matcher_never_returns_earlier_positions(
        text in "[A-Za-z1. \n]{0,300}",
        title in "[A-Za-z]{1,6}( [A-Za-z]{1,6})?",
        from in 0usize..320,
    ) {
        let doc = RawDocumentText::from_text(text);
        let located = TitleMatcher::default().locate(&doc, &title, from);
        if let Some(p) = located.char_position {
            prop_assert!(p >= from);
            prop_assert!(located.found);
        }
    }

    #[test]
    fn built_sections_never_overlap(
        keep in proptest::collection::vec(any::<bool>(), 6),
        extra in proptest::collection::vec("[A-Z]{4,9}", 0..3),
    ) {
        let headers = ["UVOD", "HARDVER", "SOFTVER", "MREŽE", "INTERNET", "BEZBEDNOST"];
        let mut text = String::new();
        for (i, h) in headers.iter().enumerate() {
            if keep[i] {
                text.push_str(h);
                text.push_str("\n\n");
            }
            text.push_str(&"Recenica o temi poglavlja. ".repeat(6));
            text.push_str("\n\n");
        }
        let doc = RawDocumentText::from_text(text.trim_end().to_string());
        let mut toc: Vec<TocEntry> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| TocEntry::new(*h, 1, i as u32 + 1, i as u32 + 1))
            .collect();
        for (j, t) in extra.iter().enumerate() {
            toc.push(TocEntry::new(t.clone(), 2, j as u32 + 2, j as u32 + 2));
        }
        let out = StructureBuilder::default().build(&DocumentId("p".into()), &doc, &toc);
        prop_assert!(out.is_ok());
        let sections = out.unwrap().sections;
        for w in sections.windows(2) {
            prop_assert!(w[0].char_end <= w[1].char_start);
        }
        for s in &sections {
            prop_assert!(s.char_start <= s.char_end && s.char_end <= doc.len());
            prop_assert_eq!(&doc.text()[s.content_offset..s.content_end()], s.content.as_str());
        }
    }
}
