pub mod catalog;
pub mod local_tools;
pub mod tool_models;
pub mod tool_provider;

pub use catalog::{assemble_superagent_catalog, CatalogDispatcher};
pub use local_tools::{LocalTool, LocalToolRegistry};
pub use tool_models::{ConnectedAccount, ToolDefinition, ToolExecution, ToolQuery};
pub use tool_provider::{ToolError, ToolProvider};
