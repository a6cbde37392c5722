use crate::core::tools::{ConnectedAccount, ToolProvider, ToolQuery};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CHECKED_TOOLKITS: [&str; 4] = ["GOOGLESHEETS", "GOOGLEDOCS", "GOOGLEDRIVE", "GOOGLESLIDES"];

const MAX_LISTED_TOOLS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolkitStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolkitStatus {
    fn is_available(statuses: &BTreeMap<String, ToolkitStatus>, toolkit: &str) -> bool {
        statuses.get(toolkit).map_or(false, |s| s.available)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountsSummary {
    pub total: usize,
    pub accounts: Vec<ConnectedAccount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub google_sheets: bool,
    pub google_docs: bool,
    pub google_drive: bool,
    pub google_slides: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub success: bool,
    pub user_id: String,
    pub connected_accounts: AccountsSummary,
    pub toolkit_status: BTreeMap<String, ToolkitStatus>,
    pub summary: ConnectionSummary,
    pub recommendations: Vec<String>,
}

/// Reports which Google Workspace toolkits a user can currently use.
pub struct ConnectionService {
    tools: Arc<dyn ToolProvider>,
}

impl ConnectionService {
    pub fn new(tools: Arc<dyn ToolProvider>) -> Self {
        Self { tools }
    }

    /// Never fails: every upstream problem is folded into the report.
    pub async fn check(&self, user_id: &str, request_id: &str) -> ConnectionReport {
        let accounts = match self
            .tools
            .list_connected_accounts(&[user_id.to_string()], &[])
            .await
        {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::error!(request_id = %request_id, user_id = %user_id, "Error listing accounts: {}", e);
                Vec::new()
            }
        };

        let mut toolkit_status = BTreeMap::new();
        for toolkit in CHECKED_TOOLKITS {
            let status = match self
                .tools
                .get_tools(user_id, &ToolQuery::toolkit_limited(toolkit, 1))
                .await
            {
                Ok(tools) => ToolkitStatus {
                    available: !tools.is_empty(),
                    tool_count: Some(tools.len()),
                    tools: Some(
                        tools
                            .into_iter()
                            .take(MAX_LISTED_TOOLS)
                            .map(|t| t.slug)
                            .collect(),
                    ),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(request_id = %request_id, toolkit, "Toolkit check failed: {}", e);
                    ToolkitStatus {
                        available: false,
                        tool_count: None,
                        tools: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            toolkit_status.insert(toolkit.to_string(), status);
        }

        let summary = ConnectionSummary {
            google_sheets: ToolkitStatus::is_available(&toolkit_status, "GOOGLESHEETS"),
            google_docs: ToolkitStatus::is_available(&toolkit_status, "GOOGLEDOCS"),
            google_drive: ToolkitStatus::is_available(&toolkit_status, "GOOGLEDRIVE"),
            google_slides: ToolkitStatus::is_available(&toolkit_status, "GOOGLESLIDES"),
        };
        let recommendations = recommendations(&summary, accounts.len());

        tracing::info!(
            request_id = %request_id,
            user_id = %user_id,
            accounts = accounts.len(),
            ?summary,
            "Connection check complete"
        );

        ConnectionReport {
            success: true,
            user_id: user_id.to_string(),
            connected_accounts: AccountsSummary {
                total: accounts.len(),
                accounts,
            },
            toolkit_status,
            summary,
            recommendations,
        }
    }
}

pub fn recommendations(summary: &ConnectionSummary, account_count: usize) -> Vec<String> {
    let mut out = Vec::new();

    if !summary.google_sheets {
        out.push("Google Sheets toolkit is not available. Connect Google Sheets account.");
    }
    if !summary.google_docs {
        out.push("Google Docs toolkit is not available. Connect Google Docs account.");
    }
    if !summary.google_drive {
        out.push("Google Drive toolkit is not available. You may need to connect Google Drive separately.");
    }
    if !summary.google_slides {
        out.push("Google Slides toolkit is not available. You may need to connect Google Slides separately.");
    }
    if account_count == 0 {
        out.push("No connected accounts found. Visit /signin to connect your Google accounts.");
    }
    if summary.google_drive && !summary.google_sheets && !summary.google_docs {
        out.push("Google Drive is connected but Sheets/Docs toolkits are not available. The app may need to use GOOGLEDRIVE toolkit instead.");
    }

    out.into_iter().map(str::to_string).collect()
}
