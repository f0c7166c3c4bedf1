use crate::content_partitioner::ContentPartitioner;
use section_model::{Chunk, ChunkId, Section};

/// Splits finalized sections into retrieval chunks. Chunks never carry part
/// labels, so the whole bound is available for content.
#[derive(Debug, Clone, Default)]
pub struct SectionChunker {
    partitioner: ContentPartitioner,
}

impl SectionChunker {
    pub fn new() -> Self {
        Self { partitioner: ContentPartitioner::new(0) }
    }

    /// Chunks in order; their contents concatenate to `section.content`.
    pub fn chunk(&self, section: &Section, max_chars: usize) -> Vec<Chunk> {
        let spans = self.partitioner.partition_spans(&section.content, max_chars.max(1));
        spans
            .into_iter()
            .enumerate()
            .map(|(i, s)| Chunk {
                chunk_id: ChunkId(format!("{}#{}", section.section_id.0, i)),
                section_id: section.section_id.clone(),
                paragraph_index: i as u32,
                char_start: section.content_offset + s.start,
                char_end: section.content_offset + s.end,
                content: section.content[s.start..s.end].to_string(),
                title: Some(section.title.clone()),
                hard_split: s.hard_split,
            })
            .collect()
    }

    pub fn chunk_all(&self, sections: &[Section], max_chars: usize) -> Vec<Chunk> {
        sections.iter().flat_map(|s| self.chunk(s, max_chars)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use section_model::{DocumentId, SectionId, SemanticType};

    fn section(content: &str, offset: usize) -> Section {
        Section {
            section_id: SectionId("doc:s0003".into()),
            doc_id: DocumentId("doc".into()),
            base_section_id: SectionId("doc:s0003".into()),
            title: "Mreže".into(),
            clean_title: "Mreže".into(),
            level: 1,
            parent_section_id: None,
            path: "4".into(),
            semantic_type: SemanticType::Chapter,
            page_start: 1,
            page_end: 1,
            char_start: offset,
            char_end: offset + content.len(),
            content_offset: offset,
            content: content.into(),
            is_main_part: true,
            part_number: 1,
            total_parts: 1,
            part_label: None,
            hard_split: false,
            estimated: false,
        }
    }

    #[test]
    fn short_section_is_one_chunk() {
        let s = section("kratko", 100);
        let chunks = SectionChunker::new().chunk(&s, 3000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, ChunkId("doc:s0003#0".into()));
        assert_eq!((chunks[0].char_start, chunks[0].char_end), (100, 106));
        assert_eq!(chunks[0].title.as_deref(), Some("Mreže"));
    }

    #[test]
    fn long_section_chunks_reconstruct_content() {
        let content = "Paket putuje kroz mrezu.\n\n".repeat(20);
        let s = section(&content, 40);
        let chunks = SectionChunker::new().chunk(&s, 100);
        assert!(chunks.len() > 1);
        let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(joined, content);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.paragraph_index, i as u32);
            assert!(c.content.len() <= 100);
            assert_eq!(c.char_end - c.char_start, c.content.len());
        }
        assert_eq!(chunks[0].char_start, 40);
        assert_eq!(chunks.last().unwrap().char_end, 40 + content.len());
    }
}
