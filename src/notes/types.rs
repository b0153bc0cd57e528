use serde::{Deserialize, Serialize};

/// Introduction used when a section could not be generated.
pub const FALLBACK_INTRODUCTION: &str = "Error processing section";

/// Structured notes for one section, as returned by the structured generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionNote {
    /// Section title.
    #[serde(default)]
    pub heading: String,
    /// One or two sentence overview.
    #[serde(default)]
    pub introduction: String,
    /// Subtopics in reading order.
    #[serde(default)]
    pub subsections: Vec<Subsection>,
    /// Terms defined in this section.
    #[serde(default, rename = "keyTerms")]
    pub key_terms: Vec<KeyTerm>,
}

impl SectionNote {
    /// Degraded note substituted when generation for `label` fails.
    pub fn fallback(label: &str) -> Self {
        Self {
            heading: label.to_string(),
            introduction: FALLBACK_INTRODUCTION.to_string(),
            subsections: Vec::new(),
            key_terms: Vec::new(),
        }
    }
}

/// One subtopic of a section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    /// Subtopic title.
    #[serde(default)]
    pub subheading: String,
    /// Key points, one or two sentences each.
    #[serde(default)]
    pub points: Vec<String>,
    /// Illustrative examples.
    #[serde(default)]
    pub examples: Vec<String>,
    /// Formulas with explanations.
    #[serde(default)]
    pub formulas: Vec<Formula>,
}

/// Formula and what it represents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    /// Mathematical expression.
    #[serde(default)]
    pub formula: String,
    /// Plain-language meaning.
    #[serde(default)]
    pub explanation: String,
}

/// Glossary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyTerm {
    /// The term.
    pub term: String,
    /// Its definition.
    #[serde(default)]
    pub definition: String,
}

impl KeyTerm {
    /// Build a key term.
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
        }
    }
}

/// Final notes artifact for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNotes {
    /// Document title.
    pub title: String,
    /// Two or three sentence executive summary.
    pub summary: String,
    /// Glossary, unique by term.
    #[serde(rename = "keyTerms")]
    pub key_terms: Vec<KeyTerm>,
    /// Per-section notes in document order.
    pub sections: Vec<SectionNote>,
}
