//! Pulls a fenced ```json block out of free-form LLM text and parses it.
//!
//! Every agent in this crate talks to the model in plain text and expects
//! structured output to come back as one fenced code block somewhere in
//! the reply, since none of them use native function calling.

use serde::de::DeserializeOwned;

/// Extracts the content of the first ` ```json ` fence, or (failing that)
/// the first balanced `{...}` span, so a model that forgets the fence
/// still has a chance of parsing.
pub fn extract(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let after = &text[start + "```json".len()..];
        if let Some(end) = after.find("```") {
            return Some(after[..end].trim());
        }
    }
    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        if let Some(end) = after.find("```") {
            let candidate = after[..end].trim();
            if candidate.starts_with('{') || candidate.starts_with('[') {
                return Some(candidate);
            }
        }
    }

    let start = text.find('{')?;
    let mut depth = 0i32;
    for (i, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts and parses a fenced JSON block into `T`.
pub fn extract_parsed<T: DeserializeOwned>(text: &str) -> Result<T, Error> {
    let json = extract(text).ok_or(Error::NoBlockFound)?;
    serde_json::from_str(json).map_err(Error::Parse)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no fenced json block found in response")]
    NoBlockFound,
    #[error("fenced json block did not parse: {0}")]
    Parse(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Decision {
        decision: String,
    }

    #[test]
    fn extracts_from_fenced_block() {
        let text = "Here is my answer:\n```json\n{\"decision\": \"chat\"}\n```\nThanks.";
        let decision: Decision = extract_parsed(text).unwrap();
        assert_eq!(decision, Decision { decision: "chat".to_string() });
    }

    #[test]
    fn falls_back_to_balanced_braces_without_a_fence() {
        let text = "sure: {\"decision\": \"clarify\"} ok?";
        let decision: Decision = extract_parsed(text).unwrap();
        assert_eq!(decision.decision, "clarify");
    }

    #[test]
    fn reports_missing_block() {
        let result: Result<Decision, Error> = extract_parsed("no json here");
        assert!(matches!(result, Err(Error::NoBlockFound)));
    }
}
