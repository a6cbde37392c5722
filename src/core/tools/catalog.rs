// Tool catalog assembly and dispatch.
//
// A catalog is built per request: several toolkit/tool fetches against the
// aggregation service (each allowed to fail on its own), followed by the
// local tools. Merging follows object-assign semantics: a later entry with an
// existing slug replaces the earlier one but keeps its position.

use super::local_tools::LocalToolRegistry;
use super::tool_models::{ToolDefinition, ToolQuery};
use super::tool_provider::{ToolError, ToolProvider};
use crate::core::ai::{FunctionCallHandler, FunctionDef};
use crate::core::browser::BROWSER_TOOL;
use crate::core::slides::SLIDE_GENERATOR_TOOL;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Hosted sources queried for the superagent, in merge order.
pub fn superagent_queries() -> Vec<ToolQuery> {
    vec![
        ToolQuery::toolkit("GOOGLESHEETS"),
        ToolQuery::toolkit_limited("GOOGLEDOCS", 10),
        ToolQuery::toolkit_limited("GOOGLEDRIVE", 10),
        ToolQuery::toolkit_limited("GOOGLESLIDES", 10),
        ToolQuery::tools(&[
            "GOOGLEDOCS_GET_DOCUMENT_BY_ID",
            "GOOGLEDOCS_UPDATE_DOCUMENT_MARKDOWN",
            "GOOGLEDOCS_DELETE_CONTENT_RANGE",
        ]),
        ToolQuery::tools(&["GOOGLESHEETS_GET_SHEET_BY_ID"]),
        ToolQuery::toolkit("COMPOSIO_SEARCH"),
        ToolQuery::toolkit("COMPOSIO"),
    ]
}

#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge<I>(&mut self, tools: I)
    where
        I: IntoIterator<Item = ToolDefinition>,
    {
        for tool in tools {
            match self.index.get(&tool.slug) {
                Some(&pos) => self.tools[pos] = tool,
                None => {
                    self.index.insert(tool.slug.clone(), self.tools.len());
                    self.tools.push(tool);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.index.contains_key(slug)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.slug.as_str()).collect()
    }

    pub fn function_defs(&self) -> Vec<FunctionDef> {
        self.tools
            .iter()
            .map(|t| FunctionDef {
                name: t.slug.clone(),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            })
            .collect()
    }
}

/// Local toolkits merged after the hosted sources, in order.
pub const SUPERAGENT_LOCAL_TOOLKITS: &[&str] = &[SLIDE_GENERATOR_TOOL, BROWSER_TOOL];

/// Per-source tool counts, for logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogBreakdown {
    pub sources: Vec<(String, usize)>,
    pub failed: Vec<String>,
}

/// Builds the superagent catalog for `user_id`.
///
/// Hosted fetch failures are logged and skipped; the local tools in
/// `local_toolkits` are merged last.
pub async fn assemble_catalog(
    provider: &dyn ToolProvider,
    registry: &LocalToolRegistry,
    queries: &[ToolQuery],
    local_toolkits: &[&str],
    user_id: &str,
    request_id: &str,
) -> (ToolCatalog, CatalogBreakdown) {
    let mut catalog = ToolCatalog::new();
    let mut breakdown = CatalogBreakdown::default();

    for query in queries {
        let label = query.label();
        tracing::debug!(request_id = %request_id, source = %label, "Fetching tools");

        match provider.get_tools(user_id, query).await {
            Ok(tools) => {
                tracing::info!(
                    request_id = %request_id,
                    source = %label,
                    count = tools.len(),
                    "Fetched tools"
                );
                breakdown.sources.push((label, tools.len()));
                catalog.merge(tools);
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    source = %label,
                    status = ?e.status(),
                    "Failed to get tools: {}",
                    e
                );
                breakdown.failed.push(label);
            }
        }
    }

    let hosted_count = catalog.len();
    for toolkit in local_toolkits {
        let tools = registry.tools_in_toolkit(toolkit);
        breakdown.sources.push((toolkit.to_string(), tools.len()));
        catalog.merge(tools);
    }

    tracing::info!(
        request_id = %request_id,
        hosted = hosted_count,
        total = catalog.len(),
        failed_sources = breakdown.failed.len(),
        "Tool catalog assembled"
    );

    (catalog, breakdown)
}

/// The superagent catalog: every hosted source from `superagent_queries`,
/// then the slide generator and browser tools.
pub async fn assemble_superagent_catalog(
    provider: &dyn ToolProvider,
    registry: &LocalToolRegistry,
    user_id: &str,
    request_id: &str,
) -> (ToolCatalog, CatalogBreakdown) {
    assemble_catalog(
        provider,
        registry,
        &superagent_queries(),
        SUPERAGENT_LOCAL_TOOLKITS,
        user_id,
        request_id,
    )
    .await
}

/// Routes model function calls: local tools run in-process, anything else in
/// the catalog is executed by the aggregation service for the user.
pub struct CatalogDispatcher<'a> {
    pub provider: Arc<dyn ToolProvider>,
    pub registry: &'a LocalToolRegistry,
    pub catalog: &'a ToolCatalog,
    pub user_id: &'a str,
}

#[async_trait]
impl FunctionCallHandler for CatalogDispatcher<'_> {
    async fn handle_function_call(&self, name: &str, args: &Value) -> Result<Value, String> {
        if let Some(tool) = self.registry.get(name) {
            tracing::info!(tool = %name, "Executing local tool");
            return Ok(tool.execute(args).await.to_json());
        }

        if !self.catalog.contains(name) {
            return Err(ToolError::UnknownTool(name.to_string()).to_string());
        }

        tracing::info!(tool = %name, user_id = %self.user_id, "Executing hosted tool");
        self.provider
            .execute_tool(self.user_id, name, args)
            .await
            .map(|execution| execution.to_json())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tools::local_tools::LocalTool;
    use crate::core::tools::tool_models::{ConnectedAccount, ToolExecution};
    use crate::core::tools::tool_provider::ToolError;
    use serde_json::json;
    use std::sync::Mutex;

    fn tool(slug: &str, description: &str) -> ToolDefinition {
        ToolDefinition {
            slug: slug.to_string(),
            name: slug.to_lowercase(),
            description: description.to_string(),
            toolkit: slug.split('_').next().map(str::to_string),
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    /// Serves canned tool lists per query label; labels listed in `failing` error out.
    struct FakeProvider {
        tools: HashMap<String, Vec<ToolDefinition>>,
        failing: Vec<String>,
        executed: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ToolProvider for FakeProvider {
        async fn get_tools(
            &self,
            _user_id: &str,
            query: &ToolQuery,
        ) -> Result<Vec<ToolDefinition>, ToolError> {
            let label = query.label();
            if self.failing.contains(&label) {
                return Err(ToolError::Api {
                    status: 401,
                    message: "unauthorized".to_string(),
                });
            }
            Ok(self.tools.get(&label).cloned().unwrap_or_default())
        }

        async fn execute_tool(
            &self,
            user_id: &str,
            slug: &str,
            _arguments: &Value,
        ) -> Result<ToolExecution, ToolError> {
            self.executed
                .lock()
                .unwrap()
                .push((user_id.to_string(), slug.to_string()));
            if slug == "GOOGLESHEETS_BROKEN" {
                return Err(ToolError::Transport("timeout".to_string()));
            }
            Ok(ToolExecution::success(json!({ "ran": slug })))
        }

        async fn list_connected_accounts(
            &self,
            _user_ids: &[String],
            _toolkit_slugs: &[String],
        ) -> Result<Vec<ConnectedAccount>, ToolError> {
            Ok(Vec::new())
        }
    }

    struct LocalSlides;

    #[async_trait]
    impl LocalTool for LocalSlides {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                toolkit: Some("LOCAL_KIT".to_string()),
                ..tool("LOCAL_SLIDES", "local")
            }
        }

        async fn execute(&self, _args: &Value) -> ToolExecution {
            ToolExecution::success(json!({ "local": true }))
        }
    }

    #[test]
    fn test_merge_later_entry_wins_in_place() {
        let mut catalog = ToolCatalog::new();
        catalog.merge(vec![tool("A", "first"), tool("B", "b")]);
        catalog.merge(vec![tool("C", "c"), tool("A", "second")]);

        assert_eq!(catalog.names(), vec!["A", "B", "C"]);
        assert_eq!(catalog.function_defs()[0].description, "second");
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_function_defs_use_slug_as_name() {
        let mut catalog = ToolCatalog::new();
        catalog.merge(vec![tool("GOOGLEDOCS_GET_DOCUMENT_BY_ID", "read a doc")]);

        let defs = catalog.function_defs();
        assert_eq!(defs[0].name, "GOOGLEDOCS_GET_DOCUMENT_BY_ID");
        assert_eq!(defs[0].description, "read a doc");
    }

    #[test]
    fn test_superagent_queries_order() {
        let labels: Vec<String> = superagent_queries().iter().map(|q| q.label()).collect();
        assert_eq!(labels.first().map(String::as_str), Some("GOOGLESHEETS"));
        assert_eq!(labels.last().map(String::as_str), Some("COMPOSIO"));
        assert!(labels.contains(&"GOOGLESHEETS_GET_SHEET_BY_ID".to_string()));
        assert_eq!(labels.len(), 8);
    }

    #[tokio::test]
    async fn test_assemble_skips_failed_sources_and_appends_local_tools() {
        let mut tools = HashMap::new();
        tools.insert(
            "GOOGLESHEETS".to_string(),
            vec![tool("GOOGLESHEETS_BATCH_GET", "sheets")],
        );
        tools.insert(
            "COMPOSIO_SEARCH".to_string(),
            vec![tool("COMPOSIO_SEARCH_WEB", "search")],
        );
        let provider = FakeProvider {
            tools,
            failing: vec!["GOOGLEDOCS".to_string()],
            executed: Mutex::new(Vec::new()),
        };
        let registry = LocalToolRegistry::new();
        registry.register(Arc::new(LocalSlides));

        let (catalog, breakdown) = assemble_catalog(
            &provider,
            &registry,
            &superagent_queries(),
            &["LOCAL_KIT"],
            "user-1",
            "req",
        )
        .await;

        assert_eq!(
            catalog.names(),
            vec!["GOOGLESHEETS_BATCH_GET", "COMPOSIO_SEARCH_WEB", "LOCAL_SLIDES"]
        );
        assert_eq!(breakdown.failed, vec!["GOOGLEDOCS".to_string()]);
        assert!(breakdown
            .sources
            .contains(&("LOCAL_KIT".to_string(), 1)));
    }

    #[tokio::test]
    async fn test_dispatcher_routes_local_hosted_and_unknown() {
        let provider = Arc::new(FakeProvider {
            tools: HashMap::new(),
            failing: vec![],
            executed: Mutex::new(Vec::new()),
        });
        let registry = LocalToolRegistry::new();
        registry.register(Arc::new(LocalSlides));
        let mut catalog = ToolCatalog::new();
        catalog.merge(vec![
            tool("GOOGLESHEETS_BATCH_GET", "sheets"),
            tool("GOOGLESHEETS_BROKEN", "broken"),
        ]);

        let dispatcher = CatalogDispatcher {
            provider: provider.clone(),
            registry: &registry,
            catalog: &catalog,
            user_id: "user-9",
        };

        let local = dispatcher
            .handle_function_call("LOCAL_SLIDES", &json!({}))
            .await
            .unwrap();
        assert_eq!(local["data"]["local"], true);

        let hosted = dispatcher
            .handle_function_call("GOOGLESHEETS_BATCH_GET", &json!({}))
            .await
            .unwrap();
        assert_eq!(hosted["data"]["ran"], "GOOGLESHEETS_BATCH_GET");
        assert_eq!(hosted["successful"], true);

        let broken = dispatcher
            .handle_function_call("GOOGLESHEETS_BROKEN", &json!({}))
            .await;
        assert!(broken.unwrap_err().contains("timeout"));

        let unknown = dispatcher
            .handle_function_call("NOT_IN_CATALOG", &json!({}))
            .await;
        assert_eq!(unknown.unwrap_err(), "Unknown tool: NOT_IN_CATALOG");

        let executed = provider.executed.lock().unwrap();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].0, "user-9");
    }
}
