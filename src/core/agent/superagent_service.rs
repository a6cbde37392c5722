// The superagent: one chat turn against the model with the full tool catalog.
//
// Flow per request:
//   1. short-circuit with a canned reply when a sheet/doc was just connected
//   2. register local tools, assemble the hosted + local catalog
//   3. run the tool-calling loop
//   4. look for generated slides in the tool results
//
// Request validation (JSON shape, prompt, API keys) and user id resolution
// happen in the HTTP layer before we get here.

use crate::core::ai::models::AiRunResult;
use crate::core::ai::{AiError, AiMessage, AiProvider, AiService};
use crate::core::slides::SLIDE_GENERATOR_TOOL;
use crate::core::tools::{
    assemble_superagent_catalog, CatalogDispatcher, LocalTool, LocalToolRegistry, ToolProvider,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub const SHEET_CONNECTED_REPLY: &str = "📊 **Spreadsheet Connected!** I've successfully connected to your Google Sheet. What would you like to do with it? For example, you can ask me to:

- \"Summarize the key insights from this data\"
";

pub const DOC_CONNECTED_REPLY: &str = "📄 **Document Connected!** I've successfully connected to your Google Doc. What would you like to do with it? For example, you can ask me to:

- \"Summarize this document\"
- \"Extract the key action items\"
- \"Check for grammatical errors\"";

pub const AUTH_ERROR_REPLY: &str = "Authentication error: Please ensure your Composio API key is valid and your accounts are properly connected. Visit /signin to connect your Google accounts.";

pub const SYSTEM_PROMPT: &str = r#"You are Super Agent, a helpful and efficient AI assistant powered by Composio. Your main goal is to assist users by using a suite of powerful tools to accomplish tasks.

**Core Principles:**
1.  **Action-Oriented:** Your primary focus is on using tools to complete user requests. While you are conversational, always look for an opportunity to take action.
2.  **Tool-First Mentality:** When a user asks for something, first consider if a tool can help. For general questions or casual chat, respond conversationally.
3.  **Think Step-by-Step:** For complex tasks, you may need to use multiple tools in a sequence. For example, to answer a question about a file, you first need to read the file.

---

**Workflow for Connected Files (Google Sheets & Docs):**

This is a critical part of your function. Follow these rules precisely.

1.  **File is Primary Context:** When a Google Sheet or Doc is connected, it is the **most important** piece of information. Assume all user questions relate to the content of that file unless they state otherwise.

2.  **Generating Presentations from Files:**
    - **Step 1: Analyze the File.** Use your tools to read and understand the data within the connected file.
    - **Step 2: Outline the Slides.** In your response, provide a clear, slide-by-slide outline of the presentation. Detail the title and key points for each slide based on your analysis.
    - **Step 3: Use the Magic Word.** After creating the slide outline, you **MUST** end your *entire* message with the special command: **[SLIDES]**

3.  **Creating and Updating Google Slides Presentations:**
    - When users ask to create Google Slides, save to Google Drive, or create presentations in Google Drive, you MUST use the GOOGLESLIDES toolkit tools.
    - Available tools include: GOOGLESLIDES_CREATE_PRESENTATION, GOOGLESLIDES_INSERT_SLIDE, GOOGLESLIDES_INSERT_TEXT, GOOGLESLIDES_GET_PRESENTATION, GOOGLESLIDES_DELETE_SLIDE, GOOGLESLIDES_UPDATE_SLIDE, and other GOOGLESLIDES tools.
    - **Creating New Presentations:** If a user requests "create a presentation in Google Drive" or "save to Google Drive", you MUST:
      1. Use GOOGLESLIDES_CREATE_PRESENTATION to create a new presentation
      2. Add slides using GOOGLESLIDES_INSERT_SLIDE for each slide
      3. Add content using GOOGLESLIDES_INSERT_TEXT
      4. Provide the Google Slides URL (format: https://docs.google.com/presentation/d/{PRESENTATION_ID}/edit)
    - **Updating Existing Presentations:** If a user provides a Google Slides URL or asks to update an existing presentation:
      1. Extract the presentation ID from the URL (format: /presentation/d/{PRESENTATION_ID}/)
      2. Use GOOGLESLIDES_GET_PRESENTATION to get the current presentation
      3. Use GOOGLESLIDES_DELETE_SLIDE to remove old slides if needed
      4. Use GOOGLESLIDES_INSERT_SLIDE to add new slides
      5. Use GOOGLESLIDES_INSERT_TEXT or GOOGLESLIDES_UPDATE_SLIDE to update content
      6. Provide the updated Google Slides URL
    - After creating or updating slides, always provide the Google Slides URL so users can access and edit the presentation.

4.  **Reading Web Pages:**
    - Use WEB_BROWSER with action "html" or "scrape" (optionally with a CSS selector) to read a public web page.

---

Updating google docs means updating the markdown of the document/ deleting all content and adding new content.
"#;

#[derive(Debug, Error)]
pub enum SuperAgentError {
    #[error(transparent)]
    Ai(#[from] AiError),
}

impl SuperAgentError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SuperAgentError::Ai(e) => e.status(),
        }
    }
}

/// Body of `POST /api/superagent`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperAgentRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub selected_tool: Option<String>,
    #[serde(default)]
    pub conversation_history: Option<Vec<AiMessage>>,
    /// String or number; see `user_id_from_json`.
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub sheet_url: Option<String>,
    #[serde(default)]
    pub doc_url: Option<String>,
    #[serde(default)]
    pub slides_url: Option<String>,
    #[serde(default)]
    pub slides_id: Option<String>,
}

impl SuperAgentRequest {
    pub fn history(&self) -> &[AiMessage] {
        self.conversation_history.as_deref().unwrap_or(&[])
    }

    fn history_mentions(&self, marker: &str) -> bool {
        self.history().iter().any(|m| m.content.contains(marker))
    }

    /// The prompt as sent to the model, with the target presentation appended
    /// when the client is working on an existing deck.
    pub fn user_message(&self) -> String {
        let prompt = self.prompt.as_deref().unwrap_or_default();
        match (non_empty(&self.slides_url), non_empty(&self.slides_id)) {
            (Some(url), Some(id)) => format!(
                "{}\n\n[Google Slides URL: {} | Presentation ID: {}]",
                prompt, url, id
            ),
            _ => prompt.to_string(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperAgentReply {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slides: Option<Value>,
    pub has_slides: bool,
}

impl SuperAgentReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            slides: None,
            has_slides: false,
        }
    }
}

/// How a failed run is reported to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub status: u16,
    pub error: &'static str,
    pub details: String,
}

/// Maps a failure to the status and message shown to the client.
///
/// The checks run in order: authentication (status or "401" in the message),
/// then aggregation-service key problems, then missing Google configuration.
/// Anything else is a generic 500 whose details are only revealed in
/// development.
pub fn classify_failure(status: Option<u16>, message: &str, development: bool) -> FailureReport {
    if status == Some(401) || message.contains("401") {
        return FailureReport {
            status: 401,
            error: "Authentication failed. Please check your Composio API key and ensure your accounts are properly connected.",
            details: "Visit /signin to connect your Google accounts, or check your environment variables.".to_string(),
        };
    }
    if message.contains("API key") || message.contains("authentication") || message.contains("COMPOSIO") {
        return FailureReport {
            status: 500,
            error: "Composio API key error. Please verify your COMPOSIO_API_KEY environment variable is set correctly.",
            details: message.to_string(),
        };
    }
    if message.contains("GOOGLE") || message.contains("API_KEY") {
        return FailureReport {
            status: 500,
            error: "Missing required environment variables. Please check your server environment settings.",
            details: message.to_string(),
        };
    }
    FailureReport {
        status: 500,
        error: "Failed to process your request. Please try again.",
        details: if development {
            message.to_string()
        } else {
            "Check server logs for details".to_string()
        },
    }
}

/// Slides from the most recent successful slide-generation call, if any.
pub fn find_generated_slides(run: &AiRunResult) -> Option<Value> {
    run.tool_results()
        .rev()
        .filter(|r| r.tool_name == SLIDE_GENERATOR_TOOL)
        .filter(|r| r.result.get("successful").and_then(Value::as_bool) == Some(true))
        .find_map(|r| {
            r.result
                .pointer("/data/slides")
                .filter(|s| s.is_array())
                .cloned()
        })
}

pub struct SuperAgentService<P: AiProvider> {
    ai: Arc<AiService<P>>,
    tools: Arc<dyn ToolProvider>,
    registry: Arc<LocalToolRegistry>,
    local_tools: Vec<Arc<dyn LocalTool>>,
}

impl<P: AiProvider> SuperAgentService<P> {
    pub fn new(
        ai: Arc<AiService<P>>,
        tools: Arc<dyn ToolProvider>,
        registry: Arc<LocalToolRegistry>,
        local_tools: Vec<Arc<dyn LocalTool>>,
    ) -> Self {
        Self {
            ai,
            tools,
            registry,
            local_tools,
        }
    }

    /// Canned reply for a freshly connected sheet or doc, if one applies.
    pub fn connection_greeting(request: &SuperAgentRequest) -> Option<SuperAgentReply> {
        if non_empty(&request.sheet_url).is_some()
            && !request.history_mentions("Spreadsheet Connected")
        {
            return Some(SuperAgentReply::text(SHEET_CONNECTED_REPLY));
        }
        if non_empty(&request.doc_url).is_some() && !request.history_mentions("Document Connected")
        {
            return Some(SuperAgentReply::text(DOC_CONNECTED_REPLY));
        }
        None
    }

    fn register_local_tools(&self, request_id: &str) {
        for tool in &self.local_tools {
            let slug = tool.definition().slug;
            if self.registry.register(Arc::clone(tool)) {
                tracing::info!(request_id = %request_id, tool = %slug, "Registered local tool");
            }
        }
    }

    pub async fn handle(
        &self,
        request: &SuperAgentRequest,
        user_id: &str,
        request_id: &str,
    ) -> Result<SuperAgentReply, SuperAgentError> {
        tracing::info!(
            request_id = %request_id,
            user_id = %user_id,
            prompt_len = request.prompt.as_deref().map(str::len).unwrap_or(0),
            selected_tool = ?request.selected_tool,
            history_len = request.history().len(),
            sheet = request.sheet_url.is_some(),
            doc = request.doc_url.is_some(),
            slides_id = ?request.slides_id,
            "SuperAgent request"
        );

        if let Some(reply) = Self::connection_greeting(request) {
            tracing::info!(request_id = %request_id, "Returning connection greeting");
            return Ok(reply);
        }

        self.register_local_tools(request_id);

        let (catalog, breakdown) =
            assemble_superagent_catalog(self.tools.as_ref(), &self.registry, user_id, request_id)
                .await;
        tracing::debug!(request_id = %request_id, ?breakdown, "Tool breakdown");
        if catalog.is_empty() {
            tracing::warn!(request_id = %request_id, "No tools available, proceeding without tools");
        } else {
            let preview: Vec<&str> = catalog.names().into_iter().take(10).collect();
            tracing::info!(request_id = %request_id, count = catalog.len(), tools = ?preview, "Available tools");
        }

        let mut messages: Vec<AiMessage> = request.history().to_vec();
        messages.push(AiMessage::user(request.user_message()));

        let dispatcher = CatalogDispatcher {
            provider: Arc::clone(&self.tools),
            registry: &self.registry,
            catalog: &catalog,
            user_id,
        };

        let started = Instant::now();
        let run = match self
            .ai
            .run_with_tools(SYSTEM_PROMPT, &messages, &catalog.function_defs(), &dispatcher)
            .await
        {
            Ok(run) => run,
            Err(e) if e.is_unauthorized() => {
                tracing::error!(request_id = %request_id, "Authentication error from model run: {}", e);
                return Ok(SuperAgentReply::text(AUTH_ERROR_REPLY));
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, status = ?e.status(), "Model run failed: {}", e);
                return Err(e.into());
            }
        };

        tracing::info!(
            request_id = %request_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_len = run.text.len(),
            steps = run.steps.len(),
            tool_calls = run.tool_call_count(),
            "AI response generated"
        );

        match find_generated_slides(&run) {
            Some(slides) => {
                tracing::info!(
                    request_id = %request_id,
                    slide_count = slides.as_array().map(Vec::len).unwrap_or(0),
                    "Slide generation detected"
                );
                Ok(SuperAgentReply {
                    response: run.text,
                    slides: Some(slides),
                    has_slides: true,
                })
            }
            None => Ok(SuperAgentReply::text(run.text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::models::{
        AiProviderResponse, AiRequest, FunctionCall, StepRecord, ToolResultRecord, TranscriptItem,
    };
    use crate::core::ai::AiConfig;
    use crate::core::tools::{
        ConnectedAccount, ToolDefinition, ToolError, ToolExecution, ToolQuery,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedModel {
        turns: Mutex<VecDeque<Result<AiProviderResponse, AiError>>>,
        last_transcript: Mutex<Vec<TranscriptItem>>,
        function_names: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(turns: Vec<Result<AiProviderResponse, AiError>>) -> Self {
            Self {
                turns: Mutex::new(turns.into()),
                last_transcript: Mutex::new(Vec::new()),
                function_names: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AiProvider for ScriptedModel {
        async fn chat_complete(
            &self,
            request: AiRequest<'_>,
            _config: &AiConfig,
        ) -> Result<AiProviderResponse, AiError> {
            *self.last_transcript.lock().unwrap() = request.transcript.to_vec();
            *self.function_names.lock().unwrap() =
                request.functions.iter().map(|f| f.name.clone()).collect();
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

    struct SheetsOnly;

    #[async_trait]
    impl ToolProvider for SheetsOnly {
        async fn get_tools(
            &self,
            _user_id: &str,
            query: &ToolQuery,
        ) -> Result<Vec<ToolDefinition>, ToolError> {
            match query {
                ToolQuery::Toolkit { slug, .. } if slug == "GOOGLESHEETS" => Ok(vec![ToolDefinition {
                    slug: "GOOGLESHEETS_BATCH_GET".to_string(),
                    name: "Batch get".to_string(),
                    description: "Read ranges".to_string(),
                    toolkit: Some("GOOGLESHEETS".to_string()),
                    input_schema: json!({"type": "object"}),
                }]),
                _ => Err(ToolError::Api {
                    status: 404,
                    message: "not found".to_string(),
                }),
            }
        }

        async fn execute_tool(
            &self,
            _user_id: &str,
            _slug: &str,
            _arguments: &Value,
        ) -> Result<ToolExecution, ToolError> {
            Ok(ToolExecution::success(json!({ "values": [[1, 2]] })))
        }

        async fn list_connected_accounts(
            &self,
            _user_ids: &[String],
            _toolkit_slugs: &[String],
        ) -> Result<Vec<ConnectedAccount>, ToolError> {
            Ok(Vec::new())
        }
    }

    /// Stands in for the slide generator: same slug, canned deck.
    struct FakeSlides;

    #[async_trait]
    impl LocalTool for FakeSlides {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                slug: SLIDE_GENERATOR_TOOL.to_string(),
                name: "Slides".to_string(),
                description: "Make slides".to_string(),
                toolkit: Some(SLIDE_GENERATOR_TOOL.to_string()),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, _args: &Value) -> ToolExecution {
            ToolExecution::success(json!({ "slides": [{ "title": "Intro", "type": "title" }] }))
        }
    }

    fn service(model: ScriptedModel) -> SuperAgentService<ScriptedModel> {
        let config = AiConfig {
            model: "test".to_string(),
            temperature: None,
            max_tokens: None,
            max_steps: 5,
        };
        SuperAgentService::new(
            Arc::new(AiService::new(model, config)),
            Arc::new(SheetsOnly),
            Arc::new(LocalToolRegistry::new()),
            vec![Arc::new(FakeSlides)],
        )
    }

    fn request(prompt: &str) -> SuperAgentRequest {
        SuperAgentRequest {
            prompt: Some(prompt.to_string()),
            ..Default::default()
        }
    }

    fn text(content: &str) -> AiProviderResponse {
        AiProviderResponse {
            content: content.to_string(),
            ..Default::default()
        }
    }

    fn call(name: &str) -> AiProviderResponse {
        AiProviderResponse {
            function_calls: vec![FunctionCall {
                name: name.to_string(),
                args: json!({}),
                signature: None,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sheet_greeting_skips_the_model() {
        let svc = service(ScriptedModel::new(vec![Ok(text("should not be used"))]));
        let req = SuperAgentRequest {
            sheet_url: Some("https://docs.google.com/spreadsheets/d/x".to_string()),
            ..request("hi")
        };

        let reply = svc.handle(&req, "123", "req").await.unwrap();

        assert_eq!(reply.response, SHEET_CONNECTED_REPLY);
        assert!(!reply.has_slides);
        assert_eq!(svc.ai.provider().turns.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_greeting_not_repeated_once_in_history() {
        let svc = service(ScriptedModel::new(vec![Ok(text("Here is the summary"))]));
        let req = SuperAgentRequest {
            sheet_url: Some("https://docs.google.com/spreadsheets/d/x".to_string()),
            doc_url: Some("https://docs.google.com/document/d/y".to_string()),
            conversation_history: Some(vec![AiMessage::assistant(SHEET_CONNECTED_REPLY)]),
            ..request("summarize")
        };

        let reply = svc.handle(&req, "123", "req").await.unwrap();
        assert_eq!(reply.response, DOC_CONNECTED_REPLY);

        let req = SuperAgentRequest {
            conversation_history: Some(vec![
                AiMessage::assistant(SHEET_CONNECTED_REPLY),
                AiMessage::assistant(DOC_CONNECTED_REPLY),
            ]),
            ..req
        };
        let reply = svc.handle(&req, "123", "req").await.unwrap();
        assert_eq!(reply.response, "Here is the summary");
    }

    #[tokio::test]
    async fn test_catalog_includes_hosted_and_local_tools_and_slides_context() {
        let svc = service(ScriptedModel::new(vec![Ok(text("done"))]));
        let req = SuperAgentRequest {
            slides_url: Some("https://docs.google.com/presentation/d/p1/edit".to_string()),
            slides_id: Some("p1".to_string()),
            ..request("update my deck")
        };

        svc.handle(&req, "123", "req").await.unwrap();

        let names = svc.ai.provider().function_names.lock().unwrap().clone();
        assert_eq!(names, vec!["GOOGLESHEETS_BATCH_GET", SLIDE_GENERATOR_TOOL]);

        let transcript = svc.ai.provider().last_transcript.lock().unwrap().clone();
        assert_eq!(
            transcript.last(),
            Some(&TranscriptItem::Message(AiMessage::user(
                "update my deck\n\n[Google Slides URL: https://docs.google.com/presentation/d/p1/edit | Presentation ID: p1]"
            )))
        );
    }

    #[tokio::test]
    async fn test_generated_slides_are_returned() {
        let svc = service(ScriptedModel::new(vec![
            Ok(call(SLIDE_GENERATOR_TOOL)),
            Ok(text("Your deck is ready [SLIDES]")),
        ]));

        let reply = svc.handle(&request("make slides"), "123", "req").await.unwrap();

        assert!(reply.has_slides);
        assert_eq!(reply.response, "Your deck is ready [SLIDES]");
        assert_eq!(reply.slides.unwrap()[0]["title"], "Intro");
    }

    #[tokio::test]
    async fn test_hosted_tool_run_without_slides() {
        let svc = service(ScriptedModel::new(vec![
            Ok(call("GOOGLESHEETS_BATCH_GET")),
            Ok(text("Totals are 3")),
        ]));

        let reply = svc.handle(&request("sum it"), "123", "req").await.unwrap();

        assert!(!reply.has_slides);
        assert!(reply.slides.is_none());
        assert_eq!(reply.response, "Totals are 3");
    }

    #[tokio::test]
    async fn test_unauthorized_model_error_becomes_text_reply() {
        let svc = service(ScriptedModel::new(vec![Err(AiError::Api {
            status: 401,
            message: "invalid key".to_string(),
        })]));

        let reply = svc.handle(&request("hi"), "123", "req").await.unwrap();

        assert_eq!(reply, SuperAgentReply::text(AUTH_ERROR_REPLY));
    }

    #[tokio::test]
    async fn test_other_model_errors_propagate() {
        let svc = service(ScriptedModel::new(vec![Err(AiError::Api {
            status: 500,
            message: "internal".to_string(),
        })]));

        let err = svc.handle(&request("hi"), "123", "req").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_find_generated_slides_prefers_latest_success() {
        let record = |successful: bool, title: &str| ToolResultRecord {
            tool_name: SLIDE_GENERATOR_TOOL.to_string(),
            args: json!({}),
            result: json!({ "successful": successful, "data": { "slides": [{ "title": title }] } }),
        };
        let run = AiRunResult {
            text: String::new(),
            steps: vec![
                StepRecord {
                    tool_calls: vec![],
                    tool_results: vec![record(true, "first")],
                },
                StepRecord {
                    tool_calls: vec![],
                    tool_results: vec![record(true, "second"), record(false, "failed")],
                },
            ],
        };

        assert_eq!(find_generated_slides(&run).unwrap()[0]["title"], "second");
        assert!(find_generated_slides(&AiRunResult::default()).is_none());
    }

    #[test]
    fn test_classify_failure_order() {
        assert_eq!(classify_failure(Some(401), "x", false).status, 401);
        assert_eq!(classify_failure(None, "upstream said 401", false).status, 401);

        let key = classify_failure(None, "Invalid API key provided", false);
        assert!(key.error.starts_with("Composio API key error"));
        assert_eq!(key.details, "Invalid API key provided");

        let env = classify_failure(None, "GOOGLE quota", false);
        assert!(env.error.starts_with("Missing required environment variables"));

        let generic = classify_failure(Some(500), "boom", false);
        assert_eq!(generic.error, "Failed to process your request. Please try again.");
        assert_eq!(generic.details, "Check server logs for details");
        assert_eq!(classify_failure(None, "boom", true).details, "boom");
    }

    #[test]
    fn test_request_parses_client_payload() {
        let req: SuperAgentRequest = serde_json::from_value(json!({
            "prompt": "hello",
            "selectedTool": "sheets",
            "userId": 1234567890,
            "conversationHistory": [{ "role": "user", "content": "earlier" }]
        }))
        .unwrap();

        assert_eq!(req.history().len(), 1);
        assert_eq!(req.user_message(), "hello");
        assert!(SuperAgentRequest::default().history().is_empty());
    }

    #[test]
    fn test_request_accepts_structured_history_entries() {
        let req: SuperAgentRequest = serde_json::from_str(
            r#"{"prompt":"go","conversationHistory":[
                {"role":"assistant","content":[{"type":"text","text":"x"}]},
                {"content":"no role"},
                {"role":"user","content":null}
            ]}"#,
        )
        .unwrap();

        let history = req.history();
        assert_eq!(history[0].content, "x");
        assert_eq!(history[1].role, "user");
        assert!(history[2].content.is_empty());
    }
}
