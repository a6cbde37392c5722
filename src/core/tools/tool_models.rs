use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A callable operation the model may pick, either hosted by the aggregation
/// service or implemented in-process (see `LocalTool`).
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Unique key, e.g. `GOOGLESHEETS_BATCH_GET`. Used as the function name.
    pub slug: String,
    pub name: String,
    pub description: String,
    /// Toolkit the tool belongs to, e.g. `GOOGLESHEETS`.
    pub toolkit: Option<String>,
    /// JSON Schema of the tool's arguments.
    pub input_schema: Value,
}

/// Result envelope of a tool execution. Hosted tools return it verbatim,
/// local tools produce the same shape so the model sees one format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub successful: bool,
}

impl ToolExecution {
    pub fn success(data: Value) -> Self {
        Self {
            data,
            error: None,
            successful: true,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            data: Value::Null,
            error: Some(error.into()),
            successful: false,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// An OAuth-linked identity registered with the aggregation service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedAccount {
    #[serde(rename = "accountId")]
    pub id: String,
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub auth_config_id: Option<String>,
    pub toolkit_slug: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// What to fetch from the aggregation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolQuery {
    /// Every tool of a toolkit, optionally capped.
    Toolkit { slug: String, limit: Option<u32> },
    /// A fixed list of tools by slug.
    Tools(Vec<String>),
}

impl ToolQuery {
    pub fn toolkit(slug: &str) -> Self {
        ToolQuery::Toolkit {
            slug: slug.to_string(),
            limit: None,
        }
    }

    pub fn toolkit_limited(slug: &str, limit: u32) -> Self {
        ToolQuery::Toolkit {
            slug: slug.to_string(),
            limit: Some(limit),
        }
    }

    pub fn tools(slugs: &[&str]) -> Self {
        ToolQuery::Tools(slugs.iter().map(|s| s.to_string()).collect())
    }

    /// Human-readable label for logs.
    pub fn label(&self) -> String {
        match self {
            ToolQuery::Toolkit { slug, .. } => slug.clone(),
            ToolQuery::Tools(slugs) => slugs.join(","),
        }
    }
}
