//! Prompt text for section generation and the executive summary.

use crate::config::NotesProfile;

const OUTPUT_SCHEMA: &str = r#"OUTPUT FORMAT: Return ONLY valid JSON (no markdown, no code blocks):
{
  "heading": "Section title",
  "introduction": "1-2 sentence overview of main concept",
  "subsections": [
    {
      "subheading": "Subtopic name",
      "points": [
        "Concise point (1-2 sentences)",
        "Another key insight"
      ],
      "examples": ["Only if needed for clarity"],
      "formulas": [
        {
          "formula": "Mathematical expression",
          "explanation": "What it represents"
        }
      ]
    }
  ],
  "keyTerms": [
    {"term": "Important term", "definition": "Clear, concise definition"}
  ]
}"#;

const CONCISE_POLICY: &str = "You are an expert educational content creator specializing in CONCISE, exam-ready study notes.

YOUR TASK: Transform lecture content into clear, well-structured notes that capture KEY concepts while maintaining brevity.

CORE PRINCIPLES:
1. PRIORITIZE clarity over completeness
2. Extract ESSENTIAL information, not every detail
3. Be CONCISE - quality over quantity
4. Make it EXAM-READY and scannable";

const CONCISE_RULES: &str = "CONCISENESS RULES:
- Each point: 1-2 clear sentences maximum
- Subsections: 3-5 key points (focus on essentials)
- Key terms: 5-8 MOST CRITICAL terms only
- Skip: Redundant info, obvious statements, tangential details
- Examples: Only when they clarify complex concepts

TONE: Clear, direct, student-friendly. Write like you're creating a premium study guide, not transcribing a textbook.";

const COMPREHENSIVE_POLICY: &str = "You are an expert educational content creator producing COMPREHENSIVE study notes.

YOUR TASK: Transform lecture content into well-structured notes that preserve nearly all of the substance of the source.

CORE PRINCIPLES:
1. PRESERVE every definition, argument, and worked example
2. Keep the author's ordering of ideas
3. Reorganize for readability without dropping detail
4. Make it EXAM-READY and complete";

const COMPREHENSIVE_RULES: &str = "COMPLETENESS RULES:
- Cover every concept the content introduces
- Subsections: as many points as the content supports
- Key terms: every term the content defines
- Formulas: include all equations with their meaning
- Examples: keep worked examples and their steps

TONE: Precise and thorough. Write like a careful student's complete lecture notes.";

/// System instruction for section generation under `profile`.
pub fn section_system_prompt(profile: NotesProfile) -> String {
    let (policy, rules) = match profile {
        NotesProfile::Concise => (CONCISE_POLICY, CONCISE_RULES),
        NotesProfile::Comprehensive => (COMPREHENSIVE_POLICY, COMPREHENSIVE_RULES),
    };
    format!("{policy}\n\n{OUTPUT_SCHEMA}\n\n{rules}")
}

/// User prompt carrying one section's context.
pub fn section_user_prompt(profile: NotesProfile, label: &str, context: &str) -> String {
    let reminders = match profile {
        NotesProfile::Concise => {
            "Remember:
- Extract KEY concepts only (not every detail)
- Keep points to 1-2 sentences each
- Limit to 5-8 most critical key terms
- Focus on exam-relevant information
- Return valid JSON only (no markdown, no code blocks)"
        }
        NotesProfile::Comprehensive => {
            "Remember:
- Preserve all concepts, definitions, and examples
- Keep the order in which ideas are introduced
- Include every defined term
- Return valid JSON only (no markdown, no code blocks)"
        }
    };
    let request = match profile {
        NotesProfile::Concise => "Generate CONCISE, exam-focused notes for this section.",
        NotesProfile::Comprehensive => "Generate COMPREHENSIVE notes for this section.",
    };
    format!("{request}\n\nSECTION: {label}\n\nCONTENT:\n{context}\n\n{reminders}")
}

/// System instruction for the executive summary.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a concise summarizer.";

/// Output budget for the executive summary.
pub const SUMMARY_MAX_TOKENS: u32 = 200;

/// User prompt asking for a short summary of the section headings.
pub fn summary_prompt(headings: &[&str]) -> String {
    format!(
        "Based on these section headings, write a 2-3 sentence executive summary of what this lecture covers:\n\n{}\n\nReturn ONLY the summary text (no JSON, no formatting).",
        headings.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_share_the_output_schema() {
        for profile in [NotesProfile::Concise, NotesProfile::Comprehensive] {
            let prompt = section_system_prompt(profile);
            assert!(prompt.contains("\"keyTerms\""));
            assert!(prompt.contains("\"subsections\""));
        }
        assert!(section_system_prompt(NotesProfile::Concise).contains("5-8 MOST CRITICAL"));
        assert!(!section_system_prompt(NotesProfile::Comprehensive).contains("5-8"));
    }

    #[test]
    fn user_prompt_embeds_label_and_context() {
        let prompt = section_user_prompt(NotesProfile::Concise, "Intro", "[Page 1]\nhello");
        assert!(prompt.contains("SECTION: Intro\n\nCONTENT:\n[Page 1]\nhello"));
    }

    #[test]
    fn summary_prompt_joins_headings() {
        let prompt = summary_prompt(&["A", "B"]);
        assert!(prompt.contains("\n\nA, B\n\n"));
    }
}
