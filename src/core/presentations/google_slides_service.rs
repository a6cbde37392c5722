// Export of generated slides to a real Google Slides presentation.
//
// The aggregation service exposes a handful of Slides tools whose names vary
// between toolkit versions, so the create tool is discovered rather than
// hard-coded. A markdown-capable create tool builds the whole deck in one
// call; otherwise an empty presentation is created and, when the tool came
// from the toolkit listing, one slide plus its title is inserted per input
// slide.

use crate::core::slides::{slides_to_markdown, Slide, SlideKind};
use crate::core::tools::{ToolDefinition, ToolError, ToolProvider, ToolQuery};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

const SLIDES_TOOLKIT: &str = "GOOGLESLIDES";
const MARKDOWN_CREATE_TOOL: &str = "GOOGLESLIDES_CREATE_SLIDES_MARKDOWN";
const KNOWN_CREATE_TOOLS: [&str; 3] = [
    "GOOGLESLIDES_PRESENTATIONS_CREATE",
    MARKDOWN_CREATE_TOOL,
    "GOOGLESLIDES_CREATE_PRESENTATION",
];
const INSERT_SLIDE_TOOL: &str = "GOOGLESLIDES_INSERT_SLIDE";
const INSERT_TEXT_TOOL: &str = "GOOGLESLIDES_INSERT_TEXT";
const DEFAULT_TITLE: &str = "AI Generated Presentation";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Slides are required to create Google Slides presentation.")]
    NoSlides,

    /// The user has no usable Google connection. `has_connected_account` is
    /// known only when the failure happened while listing tools.
    #[error("Google account not connected: {details}")]
    NotConnected {
        details: String,
        has_connected_account: Option<bool>,
    },

    #[error("Failed to access Google Slides tools: {details}")]
    ToolsUnavailable {
        details: String,
        has_connected_account: bool,
    },

    #[error("No Google Slides creation tool available")]
    CreateToolMissing { available_tools: Vec<String> },

    #[error("Failed to get presentation ID from creation result")]
    MissingPresentationId,

    #[error("Presentation creation failed: {0}")]
    CreateFailed(String),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl ExportError {
    pub fn status(&self) -> u16 {
        match self {
            ExportError::NoSlides => 400,
            ExportError::NotConnected { .. } => 401,
            _ => 500,
        }
    }
}

/// Body of `POST /api/create-google-slides`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(default)]
    pub slides: Option<Vec<Slide>>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub user_id: Option<Value>,
    /// Accepted for compatibility; Google applies its own theme.
    #[serde(default)]
    pub style: Option<String>,
}

impl ExportRequest {
    pub fn has_slides(&self) -> bool {
        self.slides.as_ref().map_or(false, |s| !s.is_empty())
    }

    fn title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_TITLE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub presentation_id: String,
    pub slides_url: String,
    pub message: String,
}

pub fn slides_url(presentation_id: &str) -> String {
    format!("https://docs.google.com/presentation/d/{}/edit", presentation_id)
}

/// Picks the tool used to create the presentation.
///
/// Slug matches win over name matches: a known slug or a slug mentioning
/// "create"/"markdown" first, then a name mentioning "create"/"presentation".
pub fn select_create_tool(tools: &[ToolDefinition]) -> Option<&ToolDefinition> {
    tools
        .iter()
        .find(|t| {
            let slug = t.slug.to_lowercase();
            KNOWN_CREATE_TOOLS.contains(&t.slug.as_str())
                || slug.contains("create")
                || slug.contains("markdown")
        })
        .or_else(|| {
            tools.iter().find(|t| {
                let name = t.name.to_lowercase();
                name.contains("create") || name.contains("presentation")
            })
        })
}

/// Finds the presentation id in a create-tool result.
pub fn extract_presentation_id(data: &Value) -> Option<String> {
    const KEYS: [&str; 3] = ["presentationId", "presentation_id", "id"];

    let scopes = [Some(data), data.get("response_data")];
    for scope in scopes.into_iter().flatten() {
        for key in KEYS {
            if let Some(Value::String(id)) = scope.get(key) {
                if !id.is_empty() {
                    return Some(id.clone());
                }
            }
        }
    }
    None
}

pub struct GoogleSlidesService {
    tools: Arc<dyn ToolProvider>,
}

impl GoogleSlidesService {
    pub fn new(tools: Arc<dyn ToolProvider>) -> Self {
        Self { tools }
    }

    async fn has_connected_account(&self, user_id: &str, request_id: &str) -> bool {
        match self
            .tools
            .list_connected_accounts(&[user_id.to_string()], &[SLIDES_TOOLKIT.to_string()])
            .await
        {
            Ok(accounts) => {
                tracing::info!(request_id = %request_id, count = accounts.len(), "Connected Google Slides accounts");
                !accounts.is_empty()
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, "Could not check connected accounts: {}", e);
                false
            }
        }
    }

    /// Looks up each known create tool individually.
    async fn fetch_known_create_tool(
        &self,
        user_id: &str,
        request_id: &str,
    ) -> Option<ToolDefinition> {
        for slug in KNOWN_CREATE_TOOLS {
            match self.tools.get_tools(user_id, &ToolQuery::tools(&[slug])).await {
                Ok(mut found) if !found.is_empty() => {
                    tracing::info!(request_id = %request_id, tool = slug, "Found create tool by direct lookup");
                    return Some(found.remove(0));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(request_id = %request_id, tool = slug, "Tool not available: {}", e);
                }
            }
        }
        None
    }

    async fn insert_slides(
        &self,
        user_id: &str,
        presentation_id: &str,
        slides: &[Slide],
        request_id: &str,
    ) {
        let tools = match self
            .tools
            .get_tools(
                user_id,
                &ToolQuery::tools(&[INSERT_SLIDE_TOOL, INSERT_TEXT_TOOL]),
            )
            .await
        {
            Ok(tools) => tools,
            Err(e) => {
                tracing::warn!(request_id = %request_id, "Could not fetch slide insert tools: {}", e);
                return;
            }
        };

        let insert_slide = tools.iter().find(|t| t.slug.contains("INSERT_SLIDE"));
        let insert_text = tools.iter().find(|t| t.slug.contains("INSERT_TEXT"));
        let insert_slide = match insert_slide {
            Some(tool) => tool,
            None => {
                tracing::warn!(request_id = %request_id, "No insert-slide tool available");
                return;
            }
        };

        for (index, slide) in slides.iter().enumerate() {
            let layout = if slide.kind == SlideKind::Title {
                "TITLE"
            } else {
                "BLANK"
            };
            let args = json!({
                "presentationId": presentation_id,
                "insertionIndex": index,
                "slideLayoutReference": { "predefinedLayout": layout },
            });
            if let Err(e) = self.execute(user_id, &insert_slide.slug, &args).await {
                tracing::warn!(request_id = %request_id, slide = index + 1, "Failed to add slide: {}", e);
                continue;
            }

            if let Some(text_tool) = insert_text.filter(|_| !slide.title.is_empty()) {
                let args = json!({
                    "presentationId": presentation_id,
                    "pageObjectId": "current",
                    "text": slide.title,
                    "insertionIndex": 0,
                });
                if let Err(e) = self.execute(user_id, &text_tool.slug, &args).await {
                    tracing::warn!(request_id = %request_id, slide = index + 1, "Failed to add slide title: {}", e);
                }
            }
        }
    }

    /// Executes a hosted tool, treating `successful: false` as an error.
    async fn execute(&self, user_id: &str, slug: &str, args: &Value) -> Result<Value, ExportError> {
        let execution = self.tools.execute_tool(user_id, slug, args).await.map_err(|e| {
            if e.mentions_no_connected_accounts() {
                ExportError::NotConnected {
                    details: e.to_string(),
                    has_connected_account: None,
                }
            } else {
                ExportError::Tool(e)
            }
        })?;

        if execution.successful {
            return Ok(execution.data);
        }
        let message = execution
            .error
            .unwrap_or_else(|| "Tool reported failure".to_string());
        if message.contains("No connected accounts") {
            return Err(ExportError::NotConnected {
                details: message,
                has_connected_account: None,
            });
        }
        Err(ExportError::CreateFailed(message))
    }

    pub async fn create(
        &self,
        request: &ExportRequest,
        user_id: &str,
        request_id: &str,
    ) -> Result<ExportOutcome, ExportError> {
        let slides = match request.slides.as_deref() {
            Some(slides) if !slides.is_empty() => slides,
            _ => return Err(ExportError::NoSlides),
        };
        tracing::info!(
            request_id = %request_id,
            user_id = %user_id,
            slide_count = slides.len(),
            title = ?request.title,
            style = ?request.style,
            "Creating Google Slides"
        );

        let has_connected_account = self.has_connected_account(user_id, request_id).await;

        let toolkit = self
            .tools
            .get_tools(user_id, &ToolQuery::toolkit(SLIDES_TOOLKIT))
            .await
            .map_err(|e| {
                tracing::error!(request_id = %request_id, status = ?e.status(), "Failed to get GOOGLESLIDES tools: {}", e);
                if e.is_auth_failure() || !has_connected_account {
                    ExportError::NotConnected {
                        details: e.to_string(),
                        has_connected_account: Some(has_connected_account),
                    }
                } else {
                    ExportError::ToolsUnavailable {
                        details: e.to_string(),
                        has_connected_account,
                    }
                }
            })?;
        tracing::info!(request_id = %request_id, count = toolkit.len(), "GOOGLESLIDES toolkit fetched");

        // Slides are only inserted for a create tool listed in the toolkit; a
        // tool found by direct lookup just creates the presentation.
        let (create_tool, listed_in_toolkit) = match select_create_tool(&toolkit) {
            Some(tool) => (tool.clone(), true),
            None => match self.fetch_known_create_tool(user_id, request_id).await {
                Some(tool) => (tool, false),
                None => {
                    return Err(ExportError::CreateToolMissing {
                        available_tools: toolkit.into_iter().map(|t| t.slug).collect(),
                    })
                }
            },
        };

        let uses_markdown = create_tool.slug == MARKDOWN_CREATE_TOOL;
        let args = if uses_markdown {
            json!({ "title": request.title(), "content": slides_to_markdown(slides) })
        } else {
            json!({ "title": request.title() })
        };

        tracing::info!(request_id = %request_id, tool = %create_tool.slug, "Creating presentation");
        let data = self.execute(user_id, &create_tool.slug, &args).await?;
        let presentation_id =
            extract_presentation_id(&data).ok_or(ExportError::MissingPresentationId)?;

        if listed_in_toolkit && !uses_markdown {
            self.insert_slides(user_id, &presentation_id, slides, request_id)
                .await;
        }

        tracing::info!(request_id = %request_id, presentation_id = %presentation_id, "Presentation created");
        Ok(ExportOutcome {
            slides_url: slides_url(&presentation_id),
            message: format!(
                "Successfully created Google Slides presentation with {} slides.",
                slides.len()
            ),
            presentation_id,
        })
    }
}
