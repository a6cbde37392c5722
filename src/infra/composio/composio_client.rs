use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::core::tools::{
    ConnectedAccount, ToolDefinition, ToolError, ToolExecution, ToolProvider, ToolQuery,
};

/// Upper bound on pages followed for an uncapped toolkit listing.
const MAX_PAGES: usize = 10;

/// REST client for the Composio v3 API.
pub struct ComposioClient {
    client: Client,
    base_url: String,
    toolkit_version: String,
}

impl ComposioClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        toolkit_version: &str,
        timeout: Duration,
    ) -> Result<Self, ToolError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key).map_err(|e| ToolError::Transport(e.to_string()))?,
        );
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            toolkit_version: toolkit_version.to_string(),
        })
    }

    /// Turns a non-2xx response into `ToolError::Api`, keeping the service's message.
    async fn check(resp: Response) -> Result<Response, ToolError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ToolError::Api {
            status: status.as_u16(),
            message: extract_error_message(&body)
                .unwrap_or_else(|| format!("Composio returned {}", status)),
        })
    }

    fn map_tool(api: ApiTool) -> ToolDefinition {
        let name = api.name.unwrap_or_else(|| api.slug.clone());
        ToolDefinition {
            description: api.description.unwrap_or_else(|| name.clone()),
            name,
            toolkit: api.toolkit.and_then(|t| t.slug).map(|s| s.to_uppercase()),
            input_schema: api
                .input_parameters
                .filter(Value::is_object)
                .unwrap_or_else(|| serde_json::json!({ "type": "object", "properties": {} })),
            slug: api.slug,
        }
    }

    fn map_account(api: ApiConnectedAccount) -> ConnectedAccount {
        ConnectedAccount {
            id: api.id,
            user_id: api.user_id,
            status: api.status,
            auth_config_id: api.auth_config.and_then(|c| c.id),
            toolkit_slug: api.toolkit.and_then(|t| t.slug),
            created_at: api.created_at,
            updated_at: api.updated_at,
        }
    }

    async fn fetch_tool_page(
        &self,
        params: &[(&str, String)],
    ) -> Result<ApiPage<ApiTool>, ToolError> {
        let url = format!("{}/api/v3/tools", self.base_url);
        let resp = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;
        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ToolError::InvalidResponse(e.to_string()))
    }
}

/// Pulls a human-readable message out of an error body.
///
/// Composio answers with either `{ "error": { "message": … } }`,
/// `{ "error": "…" }` or `{ "message": "…" }`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => return Some(trimmed.to_string()),
    };
    parsed
        .pointer("/error/message")
        .or_else(|| parsed.get("error").filter(|e| e.is_string()))
        .or_else(|| parsed.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| Some(trimmed.to_string()))
}

/// Query parameters for a tool listing and the number of tools it may return.
fn tool_listing(query: &ToolQuery) -> (Vec<(&'static str, String)>, Option<usize>) {
    match query {
        ToolQuery::Toolkit { slug, limit } => {
            let mut params = vec![("toolkit_slug", slug.to_lowercase())];
            if let Some(limit) = limit {
                params.push(("limit", limit.to_string()));
            }
            (params, limit.map(|l| l as usize))
        }
        ToolQuery::Tools(slugs) => (vec![("tool_slugs", slugs.join(","))], Some(slugs.len())),
    }
}

/// Collects listing pages until the cap is reached, `MAX_PAGES` pages were
/// read, or the service stops handing out cursors.
struct ToolPager {
    tools: Vec<ToolDefinition>,
    cap: Option<usize>,
    pages: usize,
}

impl ToolPager {
    fn new(cap: Option<usize>) -> Self {
        Self {
            tools: Vec::new(),
            cap,
            pages: 0,
        }
    }

    /// Adds a page and returns the cursor to request next, if any.
    fn push(&mut self, page: ApiPage<ApiTool>) -> Option<String> {
        let ApiPage { items, next_cursor } = page;
        self.pages += 1;
        self.tools
            .extend(items.into_iter().map(ComposioClient::map_tool));

        if self.pages >= MAX_PAGES || self.cap.map_or(false, |c| self.tools.len() >= c) {
            return None;
        }
        next_cursor.filter(|c| !c.is_empty())
    }

    fn finish(mut self) -> Vec<ToolDefinition> {
        if let Some(cap) = self.cap {
            self.tools.truncate(cap);
        }
        self.tools
    }
}

#[async_trait]
impl ToolProvider for ComposioClient {
    async fn get_tools(
        &self,
        _user_id: &str,
        query: &ToolQuery,
    ) -> Result<Vec<ToolDefinition>, ToolError> {
        let (params, cap) = tool_listing(query);
        let mut pager = ToolPager::new(cap);
        let mut cursor: Option<String> = None;

        loop {
            let mut page_params = params.clone();
            if let Some(c) = cursor.take() {
                page_params.push(("cursor", c));
            }

            let page = self.fetch_tool_page(&page_params).await?;
            match pager.push(page) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(pager.finish())
    }

    async fn execute_tool(
        &self,
        user_id: &str,
        slug: &str,
        arguments: &Value,
    ) -> Result<ToolExecution, ToolError> {
        let url = format!("{}/api/v3/tools/execute/{}", self.base_url, slug);
        let body = ExecuteRequest {
            user_id,
            arguments,
            version: &self.toolkit_version,
        };

        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        Self::check(resp)
            .await?
            .json::<ToolExecution>()
            .await
            .map_err(|e| ToolError::InvalidResponse(e.to_string()))
    }

    async fn list_connected_accounts(
        &self,
        user_ids: &[String],
        toolkit_slugs: &[String],
    ) -> Result<Vec<ConnectedAccount>, ToolError> {
        let url = format!("{}/api/v3/connected_accounts", self.base_url);
        let mut params: Vec<(&str, String)> = Vec::new();
        if !user_ids.is_empty() {
            params.push(("user_ids", user_ids.join(",")));
        }
        if !toolkit_slugs.is_empty() {
            let slugs: Vec<String> = toolkit_slugs.iter().map(|s| s.to_lowercase()).collect();
            params.push(("toolkit_slugs", slugs.join(",")));
        }

        let resp = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        let page: ApiPage<ApiConnectedAccount> = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ToolError::InvalidResponse(e.to_string()))?;

        Ok(page.items.into_iter().map(Self::map_account).collect())
    }
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    user_id: &'a str,
    arguments: &'a Value,
    version: &'a str,
}

#[derive(Deserialize)]
struct ApiPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct ApiTool {
    slug: String,
    name: Option<String>,
    description: Option<String>,
    input_parameters: Option<Value>,
    toolkit: Option<ApiSlugRef>,
}

#[derive(Deserialize)]
struct ApiSlugRef {
    slug: Option<String>,
}

#[derive(Deserialize)]
struct ApiIdRef {
    id: Option<String>,
}

#[derive(Deserialize)]
struct ApiConnectedAccount {
    id: String,
    user_id: Option<String>,
    status: Option<String>,
    auth_config: Option<ApiIdRef>,
    toolkit: Option<ApiSlugRef>,
    created_at: Option<String>,
    updated_at: Option<String>,
}
