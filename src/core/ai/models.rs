use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A plain chat message as clients send it in `conversationHistory`.
///
/// Clients replay whatever their chat UI stored, so a missing role counts as
/// the user and `content` may be a string, `null` or a list of content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMessage {
    #[serde(default = "default_role", deserialize_with = "role_or_user")]
    pub role: String,
    #[serde(default, deserialize_with = "flatten_content")]
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

fn role_or_user<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|role| !role.trim().is_empty())
        .unwrap_or_else(default_role))
}

/// Joins the text of `[{ "type": "text", "text": ... }]` parts; other part
/// kinds (images, tool calls) carry no text for the model.
fn flatten_content<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                _ => part.get("text").and_then(Value::as_str),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(Value::Object(part)) => part
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    })
}

impl AiMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    #[cfg(test)]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Upper bound on model turns in one tool-calling run.
    pub max_steps: usize,
}

/// A function the model may call. `parameters` is a JSON Schema object.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Value,
    /// Opaque provider token that must be echoed back with the call
    /// (Gemini thought signatures).
    pub signature: Option<String>,
}

/// Result of executing a `FunctionCall`, sent back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResult {
    pub name: String,
    pub response: Value,
}

/// One entry of the conversation the provider sees during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptItem {
    Message(AiMessage),
    /// A model turn that requested function calls (optionally with some text).
    ModelCalls {
        text: Option<String>,
        calls: Vec<FunctionCall>,
    },
    /// Results for the previous `ModelCalls`, in the same order.
    Results(Vec<FunctionResult>),
}

/// Everything a provider needs for one model turn.
#[derive(Debug, Clone, Copy)]
pub struct AiRequest<'a> {
    pub system_prompt: &'a str,
    pub transcript: &'a [TranscriptItem],
    pub functions: &'a [FunctionDef],
}

/// Response from an AI provider for a single turn.
#[derive(Debug, Clone, Default)]
pub struct AiProviderResponse {
    /// The main text content of the turn (may be empty when only calls were made).
    pub content: String,

    /// Optional thinking/reasoning summary from the model.
    pub thinking: Option<String>,

    /// Function calls requested in this turn.
    pub function_calls: Vec<FunctionCall>,

    pub finish_reason: Option<String>,
}

/// A tool result as recorded for post-processing (slide detection etc).
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResultRecord {
    pub tool_name: String,
    pub args: Value,
    pub result: Value,
}

#[derive(Debug, Clone, Default)]
pub struct StepRecord {
    pub tool_calls: Vec<FunctionCall>,
    pub tool_results: Vec<ToolResultRecord>,
}

/// Outcome of a complete tool-calling run.
#[derive(Debug, Clone, Default)]
pub struct AiRunResult {
    pub text: String,
    pub steps: Vec<StepRecord>,
}

impl AiRunResult {
    pub fn tool_call_count(&self) -> usize {
        self.steps.iter().map(|s| s.tool_calls.len()).sum()
    }

    /// All tool results across every step, oldest first.
    pub fn tool_results(&self) -> impl DoubleEndedIterator<Item = &ToolResultRecord> {
        self.steps.iter().flat_map(|s| s.tool_results.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_content_parts_are_flattened() {
        let msg: AiMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": [
                { "type": "text", "text": "first" },
                { "type": "image", "image": "data:..." },
                { "type": "text", "text": "second" }
            ]
        }))
        .unwrap();

        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "first\nsecond");
    }

    #[test]
    fn test_message_tolerates_missing_role_and_null_content() {
        let msg: AiMessage = serde_json::from_value(json!({ "content": null })).unwrap();
        assert_eq!(msg, AiMessage::user(""));

        let msg: AiMessage =
            serde_json::from_value(json!({ "role": null, "content": "hi" })).unwrap();
        assert_eq!(msg.role, "user");
    }
}
