//! Map step: one structured generation call per section.

use std::sync::Arc;

use super::prompts::{section_system_prompt, section_user_prompt};
use super::types::SectionNote;
use crate::config::NotesProfile;
use crate::llm::{TextGenerator, generate_structured};
use crate::processing::{Chunk, ResiliencePolicy, UnitKind, UnitOutcome};

/// Section note together with whether it is the degraded fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSection {
    /// Generated or fallback note.
    pub note: SectionNote,
    /// `true` when generation failed and the fallback was substituted.
    pub degraded: bool,
}

/// Produces a [`SectionNote`] for each section; never fails.
#[derive(Clone)]
pub struct NoteGenerator {
    llm: Arc<dyn TextGenerator>,
    profile: NotesProfile,
    policy: ResiliencePolicy,
}

impl NoteGenerator {
    /// Build a generator using one prompt profile for every section.
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        profile: NotesProfile,
        policy: ResiliencePolicy,
    ) -> Self {
        Self {
            llm,
            profile,
            policy,
        }
    }

    /// Generate notes for the section `label`, degrading to the fallback note on failure.
    pub async fn generate(&self, label: &str, chunks: &[Chunk]) -> GeneratedSection {
        let system = section_system_prompt(self.profile);
        let prompt = section_user_prompt(self.profile, label, &build_context(chunks));

        let outcome = self
            .policy
            .execute(UnitKind::Section, label, || {
                generate_structured::<SectionNote>(self.llm.as_ref(), &system, &prompt)
            })
            .await;
        let degraded = !matches!(outcome, UnitOutcome::Completed(_));
        let mut note = outcome
            .resolve(|_| SectionNote::fallback(label))
            .unwrap_or_else(|_| SectionNote::fallback(label));
        if note.heading.trim().is_empty() {
            note.heading = label.to_string();
        }
        GeneratedSection { note, degraded }
    }
}

/// Concatenate chunks as `[Page p]\ntext` blocks separated by blank lines.
pub fn build_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("[Page {}]\n{}", chunk.page, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
