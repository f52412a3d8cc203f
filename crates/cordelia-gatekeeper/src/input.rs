//! Structural checks on the incoming request body

use crate::GateError;
use serde_json::Value;

/// Bounds-checks the `{"prompt": ...}` payload
#[derive(Debug, Clone)]
pub struct InputValidator {
    max_length: usize,
}

impl InputValidator {
    /// Accept prompts of at most `max_length` characters
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Parse the body and check the prompt; returns it unchanged
    pub fn validate(&self, body: &[u8]) -> Result<String, GateError> {
        let prompt = parse_payload(body)?;
        self.check_prompt(prompt)
    }

    /// Empty and length checks on an already extracted prompt
    pub fn check_prompt(&self, prompt: Option<String>) -> Result<String, GateError> {
        let prompt = match prompt {
            Some(p) if !p.is_empty() => p,
            _ => return Err(GateError::EmptyPrompt),
        };

        let length = prompt.chars().count();
        if length > self.max_length {
            return Err(GateError::PromptTooLong {
                length,
                max: self.max_length,
            });
        }

        Ok(prompt)
    }
}

/// Extract `prompt` from a JSON object body
///
/// A missing or `null` prompt is `Ok(None)`; anything that is not an
/// object, or a prompt that is not a string, is `InvalidPayload`.
pub fn parse_payload(body: &[u8]) -> Result<Option<String>, GateError> {
    let json: Value = serde_json::from_slice(body)
        .map_err(|e| GateError::InvalidPayload(format!("Body must be JSON: {}", e)))?;

    let object = json
        .as_object()
        .ok_or_else(|| GateError::InvalidPayload("Body must be a JSON object".to_string()))?;

    match object.get("prompt") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(prompt)) => Ok(Some(prompt.clone())),
        Some(_) => Err(GateError::InvalidPayload(
            "'prompt' must be a string".to_string(),
        )),
    }
}
