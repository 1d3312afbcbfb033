use serde::de::DeserializeOwned;

use crate::error::LlmError;

/// Strips a ```json ... ``` or ``` ... ``` fence if the response is wrapped in one,
/// the way providers sometimes format structured output even when asked not to.
fn extract_from_markdown(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
    }
    trimmed
}

/// Parses and validates a structured LLM response against `T`'s `Deserialize` impl.
/// Parse failures and schema-validation failures are distinct `LlmError` variants so
/// callers can tell "the model returned prose" from "the model returned malformed JSON".
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    let candidate = extract_from_markdown(raw);
    if !candidate.starts_with('{') && !candidate.starts_with('[') {
        return Err(LlmError::Validation(format!(
            "response is not a JSON object or array: {candidate}"
        )));
    }
    serde_json::from_str(candidate).map_err(LlmError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn parses_plain_json() {
        let parsed: Sample = parse_structured(r#"{"value": 3}"#).unwrap();
        assert_eq!(parsed, Sample { value: 3 });
    }

    #[test]
    fn strips_markdown_fence() {
        let parsed: Sample = parse_structured("```json\n{\"value\": 7}\n```").unwrap();
        assert_eq!(parsed, Sample { value: 7 });
    }

    #[test]
    fn rejects_prose_response() {
        let result: Result<Sample, _> = parse_structured("sure, here you go");
        assert!(result.is_err());
    }
}
