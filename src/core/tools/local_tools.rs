// In-process tools.
//
// Some tools the model can call are implemented by this server rather than the
// aggregation service (slide generation, page fetching). They are registered
// once in a `LocalToolRegistry` and merged into every catalog alongside the
// hosted tools.

use super::tool_models::{ToolDefinition, ToolExecution};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait LocalTool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Local tools never fail "hard": problems are reported inside the
    /// execution envelope so the model can react to them.
    async fn execute(&self, args: &Value) -> ToolExecution;
}

/// Concurrent registry of local tools, keyed by slug.
///
/// **DashMap:** requests register tools concurrently; registration is
/// idempotent so the first writer wins and later requests are no-ops.
#[derive(Default)]
pub struct LocalToolRegistry {
    tools: DashMap<String, Arc<dyn LocalTool>>,
}

impl LocalToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    /// Registers a tool. Returns `false` if a tool with that slug already existed.
    pub fn register(&self, tool: Arc<dyn LocalTool>) -> bool {
        let slug = tool.definition().slug;
        match self.tools.entry(slug) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(tool);
                true
            }
        }
    }

    pub fn get(&self, slug: &str) -> Option<Arc<dyn LocalTool>> {
        self.tools.get(slug).map(|entry| Arc::clone(entry.value()))
    }

    /// Definitions of every registered tool belonging to `toolkit`, sorted by slug.
    pub fn tools_in_toolkit(&self, toolkit: &str) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .iter()
            .map(|entry| entry.value().definition())
            .filter(|def| def.toolkit.as_deref() == Some(toolkit))
            .collect();
        defs.sort_by(|a, b| a.slug.cmp(&b.slug));
        defs
    }
}
