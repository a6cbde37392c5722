pub mod ai_service;
pub mod models;

pub use ai_service::{AiError, AiProvider, AiService, FunctionCallHandler};
pub use models::{AiConfig, AiMessage, FunctionDef};
