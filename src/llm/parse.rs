const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Locate the JSON document inside a model completion.
///
/// Tries a ```` ```json ```` fence first, then a bare fence, then falls back to the trimmed
/// text. An unterminated fence yields everything after the opening marker.
pub fn extract_json_payload(text: &str) -> &str {
    let body = if let Some((_, rest)) = text.split_once(JSON_FENCE) {
        rest
    } else if let Some((_, rest)) = text.split_once(FENCE) {
        rest
    } else {
        return text.trim();
    };
    body.split_once(FENCE)
        .map_or(body, |(inside, _)| inside)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_json_fence() {
        let text = "```text\nignored\n```\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_payload(text), "{\"a\": 1}");
    }

    #[test]
    fn accepts_bare_fence() {
        let text = "Sure!\n```\n{\"a\": 2}\n```\nAnything else?";
        assert_eq!(extract_json_payload(text), "{\"a\": 2}");
    }

    #[test]
    fn falls_back_to_raw_text() {
        assert_eq!(extract_json_payload("  {\"a\": 3}\n"), "{\"a\": 3}");
    }

    #[test]
    fn tolerates_unterminated_fence() {
        assert_eq!(extract_json_payload("```json\n{\"a\": 4}"), "{\"a\": 4}");
    }
}
