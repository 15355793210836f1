// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Infrastructure
//
// Adapters translating the `LLMProvider` port to vendor APIs, the alias
// registry, and helpers for reading JSON out of model replies.

pub mod openai;
pub mod ollama;
pub mod registry;

pub use registry::ProviderRegistry;

use serde::de::DeserializeOwned;

/// Strip a surrounding Markdown code fence (```` ``` ```` or ```` ```json ````)
/// from a model reply.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

/// Parse a JSON object from a model reply, tolerating code fences and prose
/// around the object.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let body = strip_code_fences(text);
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(e) => match (body.find('{'), body.rfind('}')) {
            (Some(start), Some(end)) if start < end => serde_json::from_str(&body[start..=end]),
            _ => Err(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Reply {
        related_to: bool,
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```unterminated"), "```unterminated");
    }

    #[test]
    fn test_parse_json_reply() {
        let reply: Reply = parse_json_reply("```json\n{\"related_to\": true}\n```").unwrap();
        assert!(reply.related_to);

        let reply: Reply = parse_json_reply("Sure! {\"related_to\": false} Hope that helps.").unwrap();
        assert!(!reply.related_to);

        assert!(parse_json_reply::<Reply>("no json here").is_err());
    }
}
