use super::models::{
    AiConfig, AiMessage, AiProviderResponse, AiRequest, AiRunResult, FunctionDef, FunctionResult,
    StepRecord, ToolResultRecord, TranscriptItem,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Missing GOOGLE_GENERATIVE_AI_API_KEY")]
    MissingApiKey,

    #[error("AI API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("AI request failed: {0}")]
    Transport(String),

    #[error("Empty AI response: {0}")]
    EmptyResponse(String),

    #[error("Invalid AI response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            AiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401) || self.to_string().contains("401")
    }
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Runs a single model turn.
    ///
    /// Returns the turn's text plus any function calls the model wants made.
    /// Executing them is the caller's job (see `AiService::run_with_tools`).
    async fn chat_complete(
        &self,
        request: AiRequest<'_>,
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError>;

    /// Generates a JSON value conforming to `schema` (JSON Schema).
    async fn generate_object(
        &self,
        prompt: &str,
        schema: &Value,
        config: &AiConfig,
    ) -> Result<Value, AiError>;
}

// Lets services hold a shared trait object and still satisfy `P: AiProvider`.
#[async_trait]
impl AiProvider for Arc<dyn AiProvider> {
    async fn chat_complete(
        &self,
        request: AiRequest<'_>,
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError> {
        (**self).chat_complete(request, config).await
    }

    async fn generate_object(
        &self,
        prompt: &str,
        schema: &Value,
        config: &AiConfig,
    ) -> Result<Value, AiError> {
        (**self).generate_object(prompt, schema, config).await
    }
}

/// Executes function calls requested by the model.
#[async_trait]
pub trait FunctionCallHandler: Send + Sync {
    /// `Err` means the call could not be made at all; the message is
    /// reported back to the model instead of aborting the run.
    async fn handle_function_call(&self, name: &str, args: &Value) -> Result<Value, String>;
}

pub struct AiService<P: AiProvider> {
    provider: P,
    config: AiConfig,
}

impl<P: AiProvider> AiService<P> {
    pub fn new(provider: P, config: AiConfig) -> Self {
        Self { provider, config }
    }

    #[cfg(test)]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Multi-step tool-calling run.
    ///
    /// Each step is one model turn. If the turn requests function calls they are
    /// executed in order and their results appended to the transcript; the run
    /// ends at the first turn without calls or after `max_steps` turns. System
    /// messages inside `history` are dropped: the system prompt is passed once.
    pub async fn run_with_tools(
        &self,
        system_prompt: &str,
        history: &[AiMessage],
        functions: &[FunctionDef],
        handler: &dyn FunctionCallHandler,
    ) -> Result<AiRunResult, AiError> {
        let mut transcript: Vec<TranscriptItem> = history
            .iter()
            .filter(|m| m.role != "system")
            .cloned()
            .map(TranscriptItem::Message)
            .collect();

        let mut run = AiRunResult::default();

        for step in 1..=self.config.max_steps {
            let request = AiRequest {
                system_prompt,
                transcript: &transcript,
                functions,
            };
            let response = self.provider.chat_complete(request, &self.config).await?;

            tracing::debug!(
                step,
                calls = response.function_calls.len(),
                text_len = response.content.len(),
                finish_reason = ?response.finish_reason,
                "Model turn completed"
            );
            if let Some(thinking) = response.thinking.as_deref() {
                tracing::debug!(step, thinking_len = thinking.len(), "Model thoughts: {}", thinking);
            }

            run.text = response.content.clone();

            if response.function_calls.is_empty() {
                return Ok(run);
            }

            let mut step_record = StepRecord {
                tool_calls: response.function_calls.clone(),
                tool_results: Vec::with_capacity(response.function_calls.len()),
            };
            let mut results = Vec::with_capacity(response.function_calls.len());

            for call in &response.function_calls {
                let outcome = match handler.handle_function_call(&call.name, &call.args).await {
                    Ok(value) => value,
                    Err(message) => {
                        tracing::warn!(tool = %call.name, "Tool call failed: {}", message);
                        json!({ "data": null, "error": message, "successful": false })
                    }
                };

                step_record.tool_results.push(ToolResultRecord {
                    tool_name: call.name.clone(),
                    args: call.args.clone(),
                    result: outcome.clone(),
                });
                results.push(FunctionResult {
                    name: call.name.clone(),
                    response: outcome,
                });
            }

            run.steps.push(step_record);

            let text = if response.content.is_empty() {
                None
            } else {
                Some(response.content)
            };
            transcript.push(TranscriptItem::ModelCalls {
                text,
                calls: response.function_calls,
            });
            transcript.push(TranscriptItem::Results(results));
        }

        tracing::warn!(
            max_steps = self.config.max_steps,
            "Tool-calling run hit the step limit"
        );
        Ok(run)
    }

    pub async fn generate_object(&self, prompt: &str, schema: &Value) -> Result<Value, AiError> {
        self.provider
            .generate_object(prompt, schema, &self.config)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::models::FunctionCall;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted turns and records every transcript it was shown.
    struct ScriptedProvider {
        turns: Mutex<VecDeque<Result<AiProviderResponse, AiError>>>,
        seen: Mutex<Vec<Vec<TranscriptItem>>>,
    }

    impl ScriptedProvider {
        fn new(turns: Vec<Result<AiProviderResponse, AiError>>) -> Self {
            Self {
                turns: Mutex::new(turns.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AiProvider for ScriptedProvider {
        async fn chat_complete(
            &self,
            request: AiRequest<'_>,
            _config: &AiConfig,
        ) -> Result<AiProviderResponse, AiError> {
            self.seen.lock().unwrap().push(request.transcript.to_vec());
            self.turns
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(AiProviderResponse::default()))
        }

        async fn generate_object(
            &self,
            _prompt: &str,
            _schema: &Value,
            _config: &AiConfig,
        ) -> Result<Value, AiError> {
            Ok(json!({}))
        }
    }

    struct EchoHandler;

    #[async_trait]
    impl FunctionCallHandler for EchoHandler {
        async fn handle_function_call(&self, name: &str, args: &Value) -> Result<Value, String> {
            if name == "BROKEN" {
                return Err("tool exploded".to_string());
            }
            Ok(json!({ "data": args, "successful": true }))
        }
    }

    fn config(max_steps: usize) -> AiConfig {
        AiConfig {
            model: "test-model".to_string(),
            temperature: None,
            max_tokens: None,
            max_steps,
        }
    }

    fn calls(names: &[&str]) -> AiProviderResponse {
        AiProviderResponse {
            function_calls: names
                .iter()
                .map(|n| FunctionCall {
                    name: n.to_string(),
                    args: json!({ "n": n }),
                    signature: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn text(content: &str) -> AiProviderResponse {
        AiProviderResponse {
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_single_turn_without_tools() {
        let service = AiService::new(ScriptedProvider::new(vec![Ok(text("hello"))]), config(5));
        let history = vec![
            AiMessage {
                role: "system".to_string(),
                content: "ignored".to_string(),
            },
            AiMessage::user("hi"),
        ];

        let run = service
            .run_with_tools("system", &history, &[], &EchoHandler)
            .await
            .unwrap();

        assert_eq!(run.text, "hello");
        assert!(run.steps.is_empty());
        let seen = service.provider.seen.lock().unwrap();
        assert_eq!(seen[0], vec![TranscriptItem::Message(AiMessage::user("hi"))]);
    }

    #[tokio::test]
    async fn test_tool_results_are_fed_back() {
        let provider = ScriptedProvider::new(vec![
            Ok(calls(&["A", "B"])),
            Ok(calls(&["C"])),
            Ok(text("done")),
        ]);
        let service = AiService::new(provider, config(10));

        let run = service
            .run_with_tools("system", &[AiMessage::user("go")], &[], &EchoHandler)
            .await
            .unwrap();

        assert_eq!(run.text, "done");
        assert_eq!(run.steps.len(), 2);
        assert_eq!(run.tool_call_count(), 3);
        let names: Vec<&str> = run.tool_results().map(|r| r.tool_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        let seen = service.provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        // user message, calls, results, calls, results
        assert_eq!(seen[2].len(), 5);
        match &seen[1][2] {
            TranscriptItem::Results(results) => {
                assert_eq!(results.len(), 2);
                assert_eq!(results[1].name, "B");
                assert_eq!(results[1].response["data"]["n"], "B");
            }
            other => panic!("expected results, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_call_is_reported_to_model() {
        let provider = ScriptedProvider::new(vec![Ok(calls(&["BROKEN"])), Ok(text("sorry"))]);
        let service = AiService::new(provider, config(10));

        let run = service
            .run_with_tools("system", &[AiMessage::user("go")], &[], &EchoHandler)
            .await
            .unwrap();

        let result = run.tool_results().next().unwrap();
        assert_eq!(result.result["successful"], false);
        assert_eq!(result.result["error"], "tool exploded");
        assert_eq!(run.text, "sorry");
    }

    #[tokio::test]
    async fn test_step_limit_stops_the_loop() {
        let provider = ScriptedProvider::new(vec![
            Ok(calls(&["A"])),
            Ok(calls(&["A"])),
            Ok(calls(&["A"])),
        ]);
        let service = AiService::new(provider, config(2));

        let run = service
            .run_with_tools("system", &[AiMessage::user("loop")], &[], &EchoHandler)
            .await
            .unwrap();

        assert_eq!(run.steps.len(), 2);
        assert_eq!(service.provider.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = ScriptedProvider::new(vec![Err(AiError::Api {
            status: 401,
            message: "bad key".to_string(),
        })]);
        let service = AiService::new(provider, config(3));

        let err = service
            .run_with_tools("system", &[AiMessage::user("x")], &[], &EchoHandler)
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_unauthorized_detection_by_message() {
        let err = AiError::Transport("upstream returned 401 Unauthorized".to_string());
        assert!(err.is_unauthorized());
        assert!(!AiError::EmptyResponse("blocked".to_string()).is_unauthorized());
    }
}
