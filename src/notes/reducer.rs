//! Reduce step: merge section notes into the final document.

use std::collections::HashSet;
use std::sync::Arc;

use super::prompts::{SUMMARY_MAX_TOKENS, SUMMARY_SYSTEM_PROMPT, summary_prompt};
use super::types::{DocumentNotes, KeyTerm, SectionNote};
use crate::llm::{GenerationRequest, TextGenerator};
use crate::processing::{ResiliencePolicy, UnitKind};

/// Title used when the document has no detected heading.
pub const DEFAULT_TITLE: &str = "Lecture Notes";

const UNTITLED_SECTION: &str = "Section";
const SUMMARY_SAMPLE_HEADINGS: usize = 3;

/// Combines per-section notes, deduplicating key terms and adding a summary.
#[derive(Clone)]
pub struct NoteReducer {
    llm: Arc<dyn TextGenerator>,
    policy: ResiliencePolicy,
}

impl NoteReducer {
    /// Build a reducer that summarizes with `llm`.
    pub fn new(llm: Arc<dyn TextGenerator>, policy: ResiliencePolicy) -> Self {
        Self { llm, policy }
    }

    /// Assemble the final notes; an empty `fallback_title` becomes [`DEFAULT_TITLE`].
    pub async fn reduce(
        &self,
        section_notes: Vec<SectionNote>,
        fallback_title: &str,
    ) -> DocumentNotes {
        let title = match fallback_title.trim() {
            "" => DEFAULT_TITLE.to_string(),
            title => title.to_string(),
        };
        let key_terms = dedupe_key_terms(&section_notes);
        let summary = self.summarize(&section_notes).await;

        DocumentNotes {
            title,
            summary,
            key_terms,
            sections: section_notes,
        }
    }

    async fn summarize(&self, section_notes: &[SectionNote]) -> String {
        let headings = section_headings(section_notes);
        let prompt = summary_prompt(&headings);

        self.policy
            .execute(UnitKind::Summary, "summary", || {
                self.llm.generate(GenerationRequest::new(
                    SUMMARY_SYSTEM_PROMPT,
                    prompt.clone(),
                    SUMMARY_MAX_TOKENS,
                ))
            })
            .await
            .resolve(|_| fallback_summary(&headings))
            .map(|summary| summary.trim().to_string())
            .unwrap_or_else(|_| fallback_summary(&headings))
    }
}

/// Flatten key terms in section order, keeping the first definition of each term.
pub fn dedupe_key_terms(section_notes: &[SectionNote]) -> Vec<KeyTerm> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for key_term in section_notes.iter().flat_map(|note| &note.key_terms) {
        if seen.insert(key_term.term.as_str()) {
            unique.push(key_term.clone());
        }
    }
    unique
}

/// Deterministic summary used when the summary call fails.
pub fn fallback_summary(headings: &[&str]) -> String {
    let sample = headings
        .iter()
        .take(SUMMARY_SAMPLE_HEADINGS)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "This lecture covers {} main topics including {sample}.",
        headings.len()
    )
}

fn section_headings(section_notes: &[SectionNote]) -> Vec<&str> {
    section_notes
        .iter()
        .map(|note| match note.heading.trim() {
            "" => UNTITLED_SECTION,
            heading => heading,
        })
        .collect()
}
