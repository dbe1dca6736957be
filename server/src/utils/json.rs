//! JSON helpers for LLM output
//!
//! Chat models wrap JSON in markdown code fences more often than not, even
//! when told not to. Strip the wrapper before handing the payload to serde.

use serde::de::DeserializeOwned;

/// Strip a leading/trailing markdown code fence (```json ... ``` or ``` ... ```)
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop an optional language tag on the opening fence line
    let rest = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };

    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse LLM output as JSON after removing any code-fence wrapper
pub fn parse_llm_json<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fences(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_plain_text() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_json_fence() {
        let raw = "```json\n{\"emotion\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"emotion\": 1}");
    }

    #[test]
    fn test_strip_bare_fence() {
        let raw = "```\n[1, 2, 3]\n```";
        assert_eq!(strip_code_fences(raw), "[1, 2, 3]");
    }

    #[test]
    fn test_parse_fenced_object() {
        #[derive(serde::Deserialize)]
        struct Emotion {
            emotion: i64,
        }
        let parsed: Emotion = parse_llm_json("```json\n{\"emotion\": 4}\n```").unwrap();
        assert_eq!(parsed.emotion, 4);
    }

    #[test]
    fn test_parse_invalid_is_error() {
        let result: Result<Vec<String>, _> = parse_llm_json("definitely not json");
        assert!(result.is_err());
    }
}
