// Web page access for the model.
//
// The model can read pages (raw HTML or text picked out by a CSS selector).
// Interactive actions need a real browser session, which this server does not
// run; they are reported back as unsupported so the model can pick another
// route.

use crate::core::tools::{LocalTool, ToolDefinition, ToolExecution};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use thiserror::Error;

pub const BROWSER_TOOL: &str = "WEB_BROWSER";

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the response body as text.
    async fn fetch(&self, url: &str) -> Result<String, BrowserError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserAction {
    Scrape,
    Html,
    Screenshot,
    Click,
    Type,
    Select,
}

impl BrowserAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scrape" => Some(Self::Scrape),
            "html" => Some(Self::Html),
            "screenshot" => Some(Self::Screenshot),
            "click" => Some(Self::Click),
            "type" => Some(Self::Type),
            "select" => Some(Self::Select),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Html => "html",
            Self::Screenshot => "screenshot",
            Self::Click => "click",
            Self::Type => "type",
            Self::Select => "select",
        }
    }
}

/// Text content of every element matching `selector`, one element per line.
pub fn select_text(html: &str, selector: &str) -> Result<Vec<String>, BrowserError> {
    let selector =
        Selector::parse(selector).map_err(|e| BrowserError::InvalidSelector(e.to_string()))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .map(|el| {
            el.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|t| !t.is_empty())
        .collect())
}

pub struct BrowserTool<F: PageFetcher> {
    fetcher: F,
}

impl<F: PageFetcher> BrowserTool<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl<F: PageFetcher + 'static> LocalTool for BrowserTool<F> {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            slug: BROWSER_TOOL.to_string(),
            name: "Web Browser".to_string(),
            description: "Opens a web page and returns its HTML, or the text of the elements matching a CSS selector.".to_string(),
            toolkit: Some(BROWSER_TOOL.to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "The URL to open (http or https)." },
                    "action": {
                        "type": "string",
                        "enum": ["scrape", "html", "screenshot", "click", "type", "select"],
                        "description": "What to do on the page. Defaults to scrape."
                    },
                    "selector": { "type": "string", "description": "CSS selector for scrape, click, type or select." },
                    "value": { "type": "string", "description": "Text to type or option to select." }
                },
                "required": ["url"]
            }),
        }
    }

    async fn execute(&self, args: &Value) -> ToolExecution {
        let url = match args.get("url").and_then(Value::as_str) {
            Some(u) if !u.trim().is_empty() => u.trim(),
            _ => return ToolExecution::failure("url is required"),
        };
        let raw_action = args.get("action").and_then(Value::as_str).unwrap_or("scrape");
        let action = match BrowserAction::parse(raw_action) {
            Some(a) => a,
            None => return ToolExecution::failure(format!("Unknown action: {}", raw_action)),
        };
        let selector = args
            .get("selector")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty());

        match action {
            BrowserAction::Screenshot
            | BrowserAction::Click
            | BrowserAction::Type
            | BrowserAction::Select => {
                tracing::info!(url = %url, action = action.as_str(), "Unsupported browser action");
                return ToolExecution::failure(format!(
                    "The '{}' action is not supported; use 'html' or 'scrape' to read the page instead.",
                    action.as_str()
                ));
            }
            BrowserAction::Html | BrowserAction::Scrape => {}
        }

        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(url = %url, "Browser fetch failed: {}", e);
                return ToolExecution::failure(e.to_string());
            }
        };

        match (action, selector) {
            (BrowserAction::Scrape, Some(selector)) => match select_text(&html, selector) {
                Ok(matches) => ToolExecution::success(json!({
                    "url": url,
                    "action": "scrape",
                    "selector": selector,
                    "matches": matches.len(),
                    "text": matches.join("\n"),
                })),
                Err(e) => ToolExecution::failure(e.to_string()),
            },
            _ => ToolExecution::success(json!({
                "url": url,
                "action": action.as_str(),
                "html": html,
            })),
        }
    }
}
