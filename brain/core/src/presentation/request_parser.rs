// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Request Parser
//!
//! Turns facade input into a typed [`QueryRequest`]. Three input forms are
//! accepted:
//!
//! 1. `brain=<name> query=<text>` pairs. Values may be single or double
//!    quoted; an unquoted `query=` value runs to the end of its line.
//! 2. Composite prompt lines:
//!
//!    ```text
//!    TargetBrain: docs
//!    PersonaID: senior_engineer
//!    ModeID: summarize
//!    Query: how do I configure the cache?
//!    ```
//!
//!    Labels may appear in any order. `Query:` also takes the unlabelled
//!    lines that follow it, up to the next label.
//! 3. A JSON object (or any key/value map) with the same keys.
//!
//! Recognised keys: `brain`, `query`, `persona_id`, `persona` (alias
//! `persona_str`), `mode_id`, `mode` (alias `mode_str`), `top_k`,
//! `min_score`. JSON input may also carry full `cognize` and `instruct`
//! objects. Unknown keys are ignored.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::application::query_service::QueryRequest;

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("Empty request")]
    Empty,

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("Malformed request near {0:?}: expected key=value")]
    Malformed(String),

    #[error("Invalid JSON request: {0}")]
    InvalidJson(String),

    #[error("Unterminated quote in value for '{0}'")]
    UnterminatedQuote(String),
}

/// Parse any supported input form.
pub fn parse_request(input: &str) -> Result<QueryRequest, RequestError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(RequestError::Empty);
    }

    if input.starts_with('{') {
        let value: Value = serde_json::from_str(input).map_err(|e| RequestError::InvalidJson(e.to_string()))?;
        match value {
            Value::Object(map) => parse_json_object(&map),
            _ => Err(RequestError::InvalidJson("expected an object".to_string())),
        }
    } else if is_composite(input) {
        parse_composite(input)
    } else {
        parse_key_values(input)
    }
}

/// Build a request from string pairs, e.g. tool-call arguments.
pub fn request_from_pairs<I, K, V>(pairs: I) -> Result<QueryRequest, RequestError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut builder = RequestBuilder::default();
    for (key, value) in pairs {
        builder.set(key.as_ref(), value.as_ref())?;
    }
    builder.finish()
}

pub fn parse_json_object(map: &Map<String, Value>) -> Result<QueryRequest, RequestError> {
    let mut builder = RequestBuilder::default();

    for (key, value) in map {
        match (key.as_str(), value) {
            (_, Value::Null) => {}
            ("cognize", v) => {
                builder.request.cognize = Some(serde_json::from_value(v.clone()).map_err(|e| {
                    RequestError::InvalidValue {
                        key: key.clone(),
                        value: e.to_string(),
                    }
                })?);
            }
            ("instruct", v) => {
                builder.request.instruct = Some(serde_json::from_value(v.clone()).map_err(|e| {
                    RequestError::InvalidValue {
                        key: key.clone(),
                        value: e.to_string(),
                    }
                })?);
            }
            (_, Value::String(s)) => builder.set(key, s)?,
            (_, v @ (Value::Number(_) | Value::Bool(_))) => builder.set(key, &v.to_string())?,
            (_, v) => {
                return Err(RequestError::InvalidValue {
                    key: key.clone(),
                    value: v.to_string(),
                })
            }
        }
    }

    builder.finish()
}

const COMPOSITE_LABELS: [&str; 6] = ["TargetBrain:", "PersonaID:", "Persona:", "ModeID:", "Mode:", "Query:"];

fn is_composite(input: &str) -> bool {
    input.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with("TargetBrain:") || line.starts_with("Query:")
    })
}

pub fn parse_composite(input: &str) -> Result<QueryRequest, RequestError> {
    let mut builder = RequestBuilder::default();
    let mut query: Option<Vec<&str>> = None;
    let mut in_query = false;

    for line in input.lines() {
        let trimmed = line.trim_start();
        let Some(label) = COMPOSITE_LABELS.iter().find(|l| trimmed.starts_with(**l)) else {
            if in_query {
                if let Some(parts) = query.as_mut() {
                    parts.push(line);
                }
            }
            continue;
        };
        let value = trimmed[label.len()..].trim();
        in_query = *label == "Query:";

        match *label {
            "Query:" => query = Some(vec![value]),
            "TargetBrain:" => builder.set("brain", value)?,
            "PersonaID:" => builder.set("persona_id", value)?,
            "Persona:" => builder.set("persona", value)?,
            "ModeID:" => builder.set("mode_id", value)?,
            "Mode:" => builder.set("mode", value)?,
            _ => {}
        }
    }

    if let Some(parts) = query {
        builder.set("query", parts.join("\n").trim())?;
    }
    builder.finish()
}

pub fn parse_key_values(input: &str) -> Result<QueryRequest, RequestError> {
    let mut builder = RequestBuilder::default();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            return Err(RequestError::Malformed(first_token(rest)));
        };
        let key = &rest[..eq];
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(RequestError::Malformed(first_token(rest)));
        }
        let after = &rest[eq + 1..];

        let (value, remainder) = match after.chars().next() {
            Some(quote @ ('"' | '\'')) => read_quoted(&after[1..], quote).ok_or_else(|| RequestError::UnterminatedQuote(key.to_string()))?,
            _ if key == "query" => {
                let end = after.find('\n').unwrap_or(after.len());
                (after[..end].trim().to_string(), &after[end..])
            }
            _ => {
                let end = after.find(char::is_whitespace).unwrap_or(after.len());
                (after[..end].to_string(), &after[end..])
            }
        };

        builder.set(key, &value)?;
        rest = remainder.trim_start();
    }

    builder.finish()
}

/// Read up to the closing `quote`, honouring backslash escapes.
fn read_quoted(text: &str, quote: char) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            value.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some((value, &text[i + c.len_utf8()..]));
        } else {
            value.push(c);
        }
    }
    None
}

fn first_token(text: &str) -> String {
    text.split_whitespace().next().unwrap_or_default().to_string()
}

#[derive(Default)]
struct RequestBuilder {
    request: QueryRequest,
    has_brain: bool,
    has_query: bool,
}

impl RequestBuilder {
    fn set(&mut self, key: &str, value: &str) -> Result<(), RequestError> {
        let text = || Some(value.to_string()).filter(|v| !v.trim().is_empty());

        match key {
            "brain" => {
                self.request.brain = value.trim().to_string();
                self.has_brain = !self.request.brain.is_empty();
            }
            "query" => {
                self.request.query = value.trim().to_string();
                self.has_query = !self.request.query.is_empty();
            }
            "persona_id" => self.request.persona_id = text(),
            "persona" | "persona_str" => self.request.persona = text(),
            "mode_id" => self.request.mode_id = text(),
            "mode" | "mode_str" => self.request.mode = text(),
            "top_k" => {
                self.request.top_k = Some(value.trim().parse().map_err(|_| invalid(key, value))?);
            }
            "min_score" => {
                let score: f64 = value.trim().parse().map_err(|_| invalid(key, value))?;
                if !(0.0..=1.0).contains(&score) {
                    return Err(invalid(key, value));
                }
                self.request.min_score = Some(score);
            }
            other => debug!("Ignoring unknown request key '{}'", other),
        }
        Ok(())
    }

    fn finish(self) -> Result<QueryRequest, RequestError> {
        if !self.has_brain {
            return Err(RequestError::MissingField("brain"));
        }
        if !self.has_query {
            return Err(RequestError::MissingField("query"));
        }
        Ok(self.request)
    }
}

fn invalid(key: &str, value: &str) -> RequestError {
    RequestError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
