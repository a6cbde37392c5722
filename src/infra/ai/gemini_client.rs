// =============================================================================
// GEMINI CLIENT - Google Generative Language API Integration
// =============================================================================
//
// Implements `AiProvider` against the Gemini `generateContent` endpoint
// (https://ai.google.dev/api/generate-content).
//
// **Wire format notes:**
// - Authentication: API key is passed as a query parameter (`?key=API_KEY`).
// - `systemInstruction` is a separate top-level field, not a message.
// - Roles are "user" and "model"; function results go back as "user" turns
//   holding `functionResponse` parts.
// - Gemini 2.5 attaches a `thoughtSignature` to function call parts. It must be
//   echoed back on the same part in the next request or multi-step runs lose
//   their reasoning context.
// - Function parameter schemas accept only an OpenAPI subset of JSON Schema,
//   so tool schemas from the aggregation service are sanitized first.
//
// **Structured output:** `generate_object` sets `responseMimeType` to
// `application/json` with a `responseSchema` and parses the returned text.

use crate::core::ai::{
    models::{
        AiConfig, AiProviderResponse, AiRequest, FunctionCall, FunctionDef, TranscriptItem,
    },
    AiError, AiProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================

/// A single part of content. Only one of the payload fields is set per part.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// Set on reasoning summaries; those parts are not part of the answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,

    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
struct Content {
    #[serde(skip_serializing_if = "String::is_empty")]
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct FunctionCallingConfig {
    /// "AUTO": the model decides whether to call functions.
    mode: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<GeminiToolConfig>,
}

// =============================================================================
// RESPONSE STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    /// Missing when generation stopped before producing anything (safety, recitation).
    #[serde(default)]
    content: Option<Content>,

    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

// =============================================================================
// SCHEMA SANITIZING
// =============================================================================

/// Keys Gemini's schema subset understands. Everything else is dropped.
const ALLOWED_SCHEMA_KEYS: &[&str] = &[
    "type",
    "format",
    "description",
    "nullable",
    "enum",
    "items",
    "properties",
    "required",
    "minimum",
    "maximum",
    "minItems",
    "maxItems",
    "anyOf",
    "title",
];

/// Rewrites a JSON Schema into the subset Gemini accepts.
///
/// - `"type": ["string", "null"]` becomes `"type": "string", "nullable": true`
/// - `const` becomes a single-value `enum`
/// - `enum` values are stringified (Gemini only takes string enums)
/// - `required` is limited to keys present in `properties`
/// - empty `properties` maps are removed
pub fn sanitize_schema(schema: &Value) -> Value {
    let obj = match schema.as_object() {
        Some(obj) => obj,
        None => return schema.clone(),
    };

    let mut out = Map::new();

    for (key, value) in obj {
        match key.as_str() {
            "type" => match value {
                Value::Array(types) => {
                    let non_null: Vec<&Value> =
                        types.iter().filter(|t| t.as_str() != Some("null")).collect();
                    if non_null.len() < types.len() {
                        out.insert("nullable".to_string(), Value::Bool(true));
                    }
                    if let Some(first) = non_null.first() {
                        out.insert("type".to_string(), (*first).clone());
                    }
                }
                other => {
                    out.insert("type".to_string(), other.clone());
                }
            },
            "const" => {
                out.insert("enum".to_string(), Value::Array(vec![stringify(value)]));
            }
            "enum" => {
                if let Some(values) = value.as_array() {
                    out.insert(
                        "enum".to_string(),
                        Value::Array(values.iter().filter(|v| !v.is_null()).map(stringify).collect()),
                    );
                }
            }
            "properties" => {
                if let Some(props) = value.as_object() {
                    if !props.is_empty() {
                        let cleaned: Map<String, Value> = props
                            .iter()
                            .map(|(name, prop)| (name.clone(), sanitize_schema(prop)))
                            .collect();
                        out.insert("properties".to_string(), Value::Object(cleaned));
                    }
                }
            }
            "items" => {
                out.insert("items".to_string(), sanitize_schema(value));
            }
            "anyOf" => {
                if let Some(variants) = value.as_array() {
                    out.insert(
                        "anyOf".to_string(),
                        Value::Array(variants.iter().map(sanitize_schema).collect()),
                    );
                }
            }
            k if ALLOWED_SCHEMA_KEYS.contains(&k) => {
                out.insert(key.clone(), value.clone());
            }
            _ => {}
        }
    }

    // `required` may only name declared properties.
    let declared: Vec<String> = out
        .get("properties")
        .and_then(Value::as_object)
        .map(|p| p.keys().cloned().collect())
        .unwrap_or_default();
    if let Some(Value::Array(required)) = out.get_mut("required") {
        required.retain(|r| r.as_str().map_or(false, |r| declared.iter().any(|d| d == r)));
        if required.is_empty() {
            out.remove("required");
        }
    }

    Value::Object(out)
}

fn stringify(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}

/// Strips a ```json fence some models wrap structured output in.
fn strip_json_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"));
    match without_open {
        Some(rest) => rest.trim_end().trim_end_matches("```").trim(),
        None => trimmed,
    }
}

// =============================================================================
// GEMINI CLIENT IMPLEMENTATION
// =============================================================================

pub struct GeminiClient {
    client: Client,
    api_key: String,
    /// e.g. `https://generativelanguage.googleapis.com/v1beta`
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn text_part(text: String) -> Part {
        Part {
            text: Some(text),
            ..Default::default()
        }
    }

    /// Gemini uses "model" instead of "assistant".
    fn convert_role(role: &str) -> String {
        match role {
            "assistant" | "model" => "model".to_string(),
            _ => "user".to_string(),
        }
    }

    /// Converts the run transcript into Gemini `contents`.
    fn build_contents(transcript: &[TranscriptItem]) -> Vec<Content> {
        transcript
            .iter()
            .map(|item| match item {
                TranscriptItem::Message(msg) => Content {
                    role: Self::convert_role(&msg.role),
                    parts: vec![Self::text_part(msg.content.clone())],
                },
                TranscriptItem::ModelCalls { text, calls } => {
                    let mut parts = Vec::with_capacity(calls.len() + 1);
                    if let Some(text) = text {
                        parts.push(Self::text_part(text.clone()));
                    }
                    parts.extend(calls.iter().map(|call| Part {
                        function_call: Some(GeminiFunctionCall {
                            name: call.name.clone(),
                            args: call.args.clone(),
                        }),
                        thought_signature: call.signature.clone(),
                        ..Default::default()
                    }));
                    Content {
                        role: "model".to_string(),
                        parts,
                    }
                }
                TranscriptItem::Results(results) => Content {
                    role: "user".to_string(),
                    parts: results
                        .iter()
                        .map(|result| Part {
                            function_response: Some(GeminiFunctionResponse {
                                name: result.name.clone(),
                                response: wrap_response(&result.response),
                            }),
                            ..Default::default()
                        })
                        .collect(),
                },
            })
            .collect()
    }

    fn convert_functions(functions: &[FunctionDef]) -> Vec<GeminiTool> {
        if functions.is_empty() {
            return Vec::new();
        }

        let declarations = functions
            .iter()
            .map(|f| {
                let parameters = sanitize_schema(&f.parameters);
                let has_properties = parameters
                    .get("properties")
                    .and_then(Value::as_object)
                    .map_or(false, |p| !p.is_empty());
                GeminiFunctionDeclaration {
                    name: f.name.clone(),
                    description: f.description.clone(),
                    // Gemini rejects OBJECT parameters without properties.
                    parameters: has_properties.then_some(parameters),
                }
            })
            .collect();

        vec![GeminiTool {
            function_declarations: declarations,
        }]
    }

    fn generation_config(config: &AiConfig) -> GenerationConfig {
        GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
            ..Default::default()
        }
    }

    fn parse_response(response: GenerateContentResponse) -> Result<AiProviderResponse, AiError> {
        if let Some(usage) = &response.usage_metadata {
            tracing::debug!(
                prompt_tokens = ?usage.prompt_token_count,
                output_tokens = ?usage.candidates_token_count,
                "Gemini usage"
            );
        }

        let candidate = match response.candidates.and_then(|c| c.into_iter().next()) {
            Some(c) => c,
            None => {
                let reason = response
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .unwrap_or_else(|| "no candidates".to_string());
                return Err(AiError::EmptyResponse(format!(
                    "No content in Gemini response ({})",
                    reason
                )));
            }
        };

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

        let mut content = Vec::new();
        let mut thinking = Vec::new();
        let mut function_calls = Vec::new();

        for part in parts {
            if let Some(fc) = part.function_call {
                function_calls.push(FunctionCall {
                    name: fc.name,
                    args: if fc.args.is_null() {
                        Value::Object(Map::new())
                    } else {
                        fc.args
                    },
                    signature: part.thought_signature,
                });
            } else if let Some(text) = part.text {
                if part.thought == Some(true) {
                    thinking.push(text);
                } else {
                    content.push(text);
                }
            }
        }

        Ok(AiProviderResponse {
            content: content.join(""),
            thinking: if thinking.is_empty() {
                None
            } else {
                Some(thinking.join("\n\n"))
            },
            function_calls,
            finish_reason: candidate.finish_reason,
        })
    }

    async fn send(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::MissingApiKey);
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AiError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.without_url().to_string()))
    }
}

/// `functionResponse.response` must be a JSON object.
fn wrap_response(value: &Value) -> Value {
    if value.is_object() {
        value.clone()
    } else {
        serde_json::json!({ "result": value })
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn chat_complete(
        &self,
        request: AiRequest<'_>,
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError> {
        let tools = Self::convert_functions(request.functions);
        let has_tools = !tools.is_empty();

        let body = GenerateContentRequest {
            contents: Self::build_contents(request.transcript),
            system_instruction: if request.system_prompt.is_empty() {
                None
            } else {
                Some(Content {
                    role: String::new(),
                    parts: vec![Self::text_part(request.system_prompt.to_string())],
                })
            },
            generation_config: Some(Self::generation_config(config)),
            tools: has_tools.then_some(tools),
            tool_config: has_tools.then(|| GeminiToolConfig {
                function_calling_config: FunctionCallingConfig {
                    mode: "AUTO".to_string(),
                },
            }),
        };

        tracing::debug!(
            "Gemini request to model {}: {} contents, {} functions",
            config.model,
            body.contents.len(),
            request.functions.len()
        );

        let response = self.send(&config.model, &body).await?;
        Self::parse_response(response)
    }

    async fn generate_object(
        &self,
        prompt: &str,
        schema: &Value,
        config: &AiConfig,
    ) -> Result<Value, AiError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Self::text_part(prompt.to_string())],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(sanitize_schema(schema)),
                ..Self::generation_config(config)
            }),
            tools: None,
            tool_config: None,
        };

        let response = self.send(&config.model, &body).await?;
        let parsed = Self::parse_response(response)?;

        if parsed.content.trim().is_empty() {
            return Err(AiError::EmptyResponse(format!(
                "No structured output (finish reason: {})",
                parsed.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        serde_json::from_str(strip_json_fence(&parsed.content))
            .map_err(|e| AiError::InvalidResponse(format!("Structured output is not JSON: {}", e)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::models::FunctionResult;
    use crate::core::ai::AiMessage;
    use serde_json::json;

    #[test]
    fn test_build_contents_maps_roles() {
        let transcript = vec![
            TranscriptItem::Message(AiMessage::user("Hello!")),
            TranscriptItem::Message(AiMessage::assistant("Hi there!")),
        ];

        let contents = GeminiClient::build_contents(&transcript);

        assert_eq!(contents[0].role, "user");
        assert_eq!(contents[1].role, "model");
        assert_eq!(contents[1].parts[0].text.as_deref(), Some("Hi there!"));
    }

    #[test]
    fn test_build_contents_echoes_calls_and_results() {
        let transcript = vec![
            TranscriptItem::ModelCalls {
                text: Some("Let me look".to_string()),
                calls: vec![FunctionCall {
                    name: "GOOGLESHEETS_BATCH_GET".to_string(),
                    args: json!({ "spreadsheet_id": "abc" }),
                    signature: Some("sig-1".to_string()),
                }],
            },
            TranscriptItem::Results(vec![FunctionResult {
                name: "GOOGLESHEETS_BATCH_GET".to_string(),
                response: json!([1, 2]),
            }]),
        ];

        let contents = GeminiClient::build_contents(&transcript);

        assert_eq!(contents[0].role, "model");
        assert_eq!(contents[0].parts.len(), 2);
        assert_eq!(contents[0].parts[1].thought_signature.as_deref(), Some("sig-1"));
        let response = contents[1].parts[0].function_response.as_ref().unwrap();
        assert_eq!(response.response, json!({ "result": [1, 2] }));

        let wire = serde_json::to_value(&contents[0]).unwrap();
        assert_eq!(wire["parts"][1]["thoughtSignature"], "sig-1");
        assert_eq!(wire["parts"][1]["functionCall"]["args"]["spreadsheet_id"], "abc");
    }

    #[test]
    fn test_sanitize_schema_rewrites_unsupported_keywords() {
        let schema = json!({
            "type": "object",
            "additionalProperties": false,
            "$schema": "http://json-schema.org/draft-07/schema#",
            "properties": {
                "title": { "type": ["string", "null"], "default": "x" },
                "mode": { "const": "fast" },
                "level": { "enum": [1, 2, null] },
                "tags": { "type": "array", "items": { "type": "string", "examples": ["a"] } }
            },
            "required": ["title", "ghost"]
        });

        let clean = sanitize_schema(&schema);

        assert!(clean.get("additionalProperties").is_none());
        assert!(clean.get("$schema").is_none());
        assert_eq!(clean["properties"]["title"], json!({ "type": "string", "nullable": true }));
        assert_eq!(clean["properties"]["mode"]["enum"], json!(["fast"]));
        assert_eq!(clean["properties"]["level"]["enum"], json!(["1", "2"]));
        assert!(clean["properties"]["tags"]["items"].get("examples").is_none());
        assert_eq!(clean["required"], json!(["title"]));
    }

    #[test]
    fn test_functions_without_properties_omit_parameters() {
        let functions = vec![
            FunctionDef {
                name: "NO_ARGS".to_string(),
                description: "takes nothing".to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
            FunctionDef {
                name: "WITH_ARGS".to_string(),
                description: "takes a url".to_string(),
                parameters: json!({ "type": "object", "properties": { "url": { "type": "string" } } }),
            },
        ];

        let tools = GeminiClient::convert_functions(&functions);

        assert_eq!(tools.len(), 1);
        assert!(tools[0].function_declarations[0].parameters.is_none());
        assert!(tools[0].function_declarations[1].parameters.is_some());
        assert!(GeminiClient::convert_functions(&[]).is_empty());
    }

    #[test]
    fn test_parse_response_splits_thoughts_text_and_calls() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "planning...", "thought": true },
                        { "text": "Here is " },
                        { "text": "the answer." },
                        { "functionCall": { "name": "COMPOSIO_SEARCH_WEB" }, "thoughtSignature": "s" }
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let parsed = GeminiClient::parse_response(response).unwrap();

        assert_eq!(parsed.content, "Here is the answer.");
        assert_eq!(parsed.thinking.as_deref(), Some("planning..."));
        assert_eq!(parsed.function_calls.len(), 1);
        assert_eq!(parsed.function_calls[0].args, json!({}));
        assert_eq!(parsed.function_calls[0].signature.as_deref(), Some("s"));
        assert_eq!(parsed.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_parse_response_reports_block_reason() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        let err = GeminiClient::parse_response(response).unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn test_generation_config_serialization() {
        let config = GenerationConfig {
            temperature: Some(0.7),
            max_output_tokens: Some(1000),
            response_mime_type: Some("application/json".to_string()),
            response_schema: None,
        };

        let json = serde_json::to_string(&config).unwrap();

        assert!(json.contains("\"maxOutputTokens\""));
        assert!(json.contains("\"responseMimeType\""));
        assert!(!json.contains("responseSchema"));
    }

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(strip_json_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_json_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let client = GeminiClient::new(
            String::new(),
            "https://generativelanguage.googleapis.com/v1beta",
            Duration::from_secs(1),
        )
        .unwrap();
        let config = AiConfig {
            model: "gemini-2.5-pro".to_string(),
            temperature: None,
            max_tokens: None,
            max_steps: 1,
        };

        let err = client
            .generate_object("x", &json!({ "type": "object" }), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::MissingApiKey));
    }
}
