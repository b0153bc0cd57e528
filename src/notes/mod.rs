//! Study notes data model and the map-reduce steps that produce it.
//!
//! [`NoteGenerator`] maps each section to a [`SectionNote`] through one structured generation
//! call, substituting a fallback note when the call fails. [`NoteReducer`] folds the section
//! notes into [`DocumentNotes`], keeping the first definition of every key term and asking the
//! model for a short executive summary.

mod generator;
mod prompts;
mod reducer;
mod types;

pub use generator::{GeneratedSection, NoteGenerator, build_context};
pub use prompts::{section_system_prompt, section_user_prompt, summary_prompt};
pub use reducer::{DEFAULT_TITLE, NoteReducer, dedupe_key_terms, fallback_summary};
pub use types::{DocumentNotes, FALLBACK_INTRODUCTION, Formula, KeyTerm, SectionNote, Subsection};
