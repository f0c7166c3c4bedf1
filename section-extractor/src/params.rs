use serde::{Deserialize, Serialize};

/// Default bounds and thresholds for the structuring pipeline.
#[derive(Debug, Clone, Copy)]
pub struct StructureDefaults {
    pub max_section_chars: usize,
    pub max_chunk_chars: usize,
    pub min_section_chars: usize,
    pub fuzzy_match_confidence_threshold: f32,
    pub fallback_window_chars: usize,
    pub part_label_reserve: usize,
    pub max_word_gap: usize,
    pub header_snap_lines: usize,
    pub toc_scan_pages: u32,
}

/// Shared defaults so the service, the CLI and tests stay in sync.
pub const STRUCTURE_DEFAULTS: StructureDefaults = StructureDefaults {
    max_section_chars: 9_000,
    max_chunk_chars: 3_000,
    min_section_chars: 50,
    fuzzy_match_confidence_threshold: 0.7,
    fallback_window_chars: 3_000,
    part_label_reserve: 96,
    max_word_gap: 40,
    header_snap_lines: 20,
    toc_scan_pages: 12,
};

/// Tunables for one structuring run. Sizes are UTF-8 byte counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StructureParams {
    /// Sections above this size are split into parts (storage field limit).
    pub max_section_chars: usize,
    /// Chunk bound for embedding input.
    pub max_chunk_chars: usize,
    /// Sections with less content than this are dropped.
    pub min_section_chars: usize,
    /// Minimum confidence for the partial-match strategy.
    pub fuzzy_match_confidence_threshold: f32,
    /// Window size when no usable TOC exists.
    pub fallback_window_chars: usize,
    /// Bytes kept free in each part for its provenance label.
    pub part_label_reserve: usize,
    /// Maximum gap between two title words in the word-sequence strategy.
    pub max_word_gap: usize,
    /// Lines scanned forward when snapping an estimated start to a header.
    pub header_snap_lines: usize,
    /// Front-matter pages scanned by the pattern TOC detector.
    pub toc_scan_pages: u32,
}

impl Default for StructureParams {
    fn default() -> Self {
        Self {
            max_section_chars: STRUCTURE_DEFAULTS.max_section_chars,
            max_chunk_chars: STRUCTURE_DEFAULTS.max_chunk_chars,
            min_section_chars: STRUCTURE_DEFAULTS.min_section_chars,
            fuzzy_match_confidence_threshold: STRUCTURE_DEFAULTS.fuzzy_match_confidence_threshold,
            fallback_window_chars: STRUCTURE_DEFAULTS.fallback_window_chars,
            part_label_reserve: STRUCTURE_DEFAULTS.part_label_reserve,
            max_word_gap: STRUCTURE_DEFAULTS.max_word_gap,
            header_snap_lines: STRUCTURE_DEFAULTS.header_snap_lines,
            toc_scan_pages: STRUCTURE_DEFAULTS.toc_scan_pages,
        }
    }
}

impl StructureParams {
    /// Parse a (possibly partial) JSON override; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let p = StructureParams::from_json_str(r#"{"maxSectionChars": 8000, "minSectionChars": 10}"#).unwrap();
        assert_eq!(p.max_section_chars, 8000);
        assert_eq!(p.min_section_chars, 10);
        assert_eq!(p.max_chunk_chars, STRUCTURE_DEFAULTS.max_chunk_chars);
        assert!((p.fuzzy_match_confidence_threshold - 0.7).abs() < f32::EPSILON);
    }
}
