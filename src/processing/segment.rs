//! Grouping of an ordered chunk sequence into logical sections.
//!
//! A heading different from the open section's label is an authoritative boundary. Every
//! section, headed or synthesized, is cut once it holds `max_chunks` chunks, which approximates
//! "every few pages" without a layout model and bounds a section opened by a running page
//! header. After a cut the next chunk opens a fresh section: under its own heading when it has
//! one, otherwise under a synthesized page-range label. A repeated label is kept as a separate
//! section, so the result is an ordered list rather than a map keyed by label.

use super::types::Chunk;

/// Ordered, non-empty run of chunks sharing a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Detected heading verbatim, or a synthesized page-range label.
    pub label: String,
    /// Chunks in document order.
    pub chunks: Vec<Chunk>,
}

/// Restore total document order under `(page, chunk_index)`.
pub fn sort_chunks(chunks: &mut [Chunk]) {
    chunks.sort_by_key(|chunk| (chunk.page, chunk.chunk_index));
}

/// Label used for a run of chunks without a heading, starting on `page`.
pub fn synthesized_label(page: u32) -> String {
    format!("Section (Pages {}-{})", page, page + 2)
}

struct OpenSection {
    label: String,
    chunks: Vec<Chunk>,
}

/// Partition sorted chunks into sections.
///
/// Concatenating the returned sections reproduces the input exactly; no section is empty.
pub fn segment(chunks: Vec<Chunk>, max_chunks: usize) -> Vec<Section> {
    let cap = max_chunks.max(1);
    let mut sections = Vec::new();
    let mut open: Option<OpenSection> = None;

    for chunk in chunks {
        let starts_new_heading = match (&chunk.heading, &open) {
            (Some(heading), Some(current)) => *heading != current.label,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if starts_new_heading {
            flush(&mut sections, open.take());
            let label = chunk.heading.clone().unwrap_or_default();
            open = Some(OpenSection {
                label,
                chunks: vec![chunk],
            });
            continue;
        }

        let current = open.get_or_insert_with(|| OpenSection {
            label: synthesized_label(chunk.page),
            chunks: Vec::new(),
        });
        current.chunks.push(chunk);

        if current.chunks.len() >= cap {
            flush(&mut sections, open.take());
        }
    }

    flush(&mut sections, open);
    sections
}

fn flush(sections: &mut Vec<Section>, open: Option<OpenSection>) {
    if let Some(section) = open
        && !section.chunks.is_empty()
    {
        sections.push(Section {
            label: section.label,
            chunks: section.chunks,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(page: u32, index: u32, heading: Option<&str>) -> Chunk {
        Chunk::new(
            format!("p{page}c{index}"),
            page,
            index,
            heading.map(str::to_string),
        )
    }

    fn flatten(sections: &[Section]) -> Vec<Chunk> {
        sections
            .iter()
            .flat_map(|section| section.chunks.iter().cloned())
            .collect()
    }

    #[test]
    fn unheaded_document_splits_at_cap() {
        let chunks: Vec<Chunk> = (1..=3)
            .flat_map(|page| (0..4).map(move |index| chunk(page, index, None)))
            .collect();
        let sections = segment(chunks.clone(), 10);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].label, "Section (Pages 1-3)");
        assert_eq!(sections[0].chunks.len(), 10);
        assert_eq!(sections[1].label, "Section (Pages 3-5)");
        assert_eq!(sections[1].chunks.len(), 2);
        assert_eq!(flatten(&sections), chunks);
    }

    #[test]
    fn headings_open_new_sections() {
        let chunks = vec![
            chunk(1, 0, Some("Intro")),
            chunk(1, 1, Some("Intro")),
            chunk(2, 0, None),
            chunk(3, 0, Some("Methods")),
            chunk(4, 0, Some("Intro")),
        ];
        let sections = segment(chunks.clone(), 10);
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();

        assert_eq!(labels, ["Intro", "Methods", "Intro"]);
        assert_eq!(sections[0].chunks.len(), 3);
        assert_eq!(flatten(&sections), chunks);
    }

    #[test]
    fn running_header_sections_split_at_cap() {
        let heading = "Lecture 5: Thermodynamics";
        let chunks: Vec<Chunk> = (1..=15).map(|page| chunk(page, 0, Some(heading))).collect();
        let sections = segment(chunks.clone(), 10);

        let sizes: Vec<usize> = sections.iter().map(|s| s.chunks.len()).collect();
        assert_eq!(sizes, [10, 5]);
        assert!(sections.iter().all(|s| s.label == heading));
        assert_eq!(sections[1].chunks[0].page, 11);
        assert_eq!(flatten(&sections), chunks);
    }

    #[test]
    fn headed_section_continued_without_headings_is_capped() {
        let mut chunks = vec![chunk(1, 0, Some("Intro"))];
        chunks.extend((0..12).map(|index| chunk(2, index, None)));
        let sections = segment(chunks.clone(), 10);

        let shape: Vec<(&str, usize)> = sections
            .iter()
            .map(|s| (s.label.as_str(), s.chunks.len()))
            .collect();
        assert_eq!(shape, [("Intro", 10), ("Section (Pages 2-4)", 3)]);
        assert_eq!(flatten(&sections), chunks);
    }

    #[test]
    fn cap_mid_page_keeps_repeated_label_as_new_section() {
        let chunks: Vec<Chunk> = (0..5).map(|index| chunk(7, index, None)).collect();
        let sections = segment(chunks.clone(), 2);
        assert_eq!(sections.len(), 3);
        assert!(sections.iter().all(|s| s.label == "Section (Pages 7-9)"));
        assert_eq!(flatten(&sections), chunks);
    }

    #[test]
    fn empty_input_yields_no_sections() {
        assert!(segment(Vec::new(), 10).is_empty());
    }

    #[test]
    fn segmentation_is_repeatable() {
        let mut chunks = vec![
            chunk(2, 1, None),
            chunk(1, 0, Some("Start")),
            chunk(2, 0, None),
            chunk(3, 0, Some("End")),
        ];
        sort_chunks(&mut chunks);
        let first = segment(chunks.clone(), 2);
        for _ in 0..5 {
            assert_eq!(segment(chunks.clone(), 2), first);
        }
        assert!(first.iter().all(|section| !section.chunks.is_empty()));
    }

    #[test]
    fn sort_restores_page_then_index_order() {
        let mut chunks = vec![chunk(2, 0, None), chunk(1, 1, None), chunk(1, 0, None)];
        sort_chunks(&mut chunks);
        let ids: Vec<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, ["page1_chunk0", "page1_chunk1", "page2_chunk0"]);
    }
}
