// This is the entry point of the SuperAgent server.
//
// **Architecture Overview:**
// - `core/` = Business logic (tool catalogs, the agent loop, slides)
// - `infra/` = Implementations of core traits (Composio, Gemini, page fetching)
// - `http/` = axum routes that translate requests into core calls
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Build the router and serve it until Ctrl-C

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::config::AppConfig;
use crate::core::ai::{AiConfig, AiProvider, AiService};
use crate::core::browser::BrowserTool;
use crate::core::slides::SlideGeneratorTool;
use crate::core::tools::{LocalTool, ToolProvider};
use crate::http::AppState;
use crate::infra::ai::GeminiClient;
use crate::infra::browser::HttpPageFetcher;
use crate::infra::composio::ComposioClient;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_LOG_FILTER: &str = "superagent_server=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    if !config.has_composio_key() {
        tracing::warn!("COMPOSIO_API_KEY is not set; tool routes will reject requests");
    }
    if !config.has_gemini_key() {
        tracing::warn!("GOOGLE_GENERATIVE_AI_API_KEY is not set; /api/superagent will reject requests");
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    let timeout = Duration::from_secs(config.http_timeout_secs);

    let tools: Arc<dyn ToolProvider> = Arc::new(
        ComposioClient::new(
            config.composio_api_key.as_deref().unwrap_or_default(),
            &config.composio_base_url,
            &config.composio_toolkit_version,
            timeout,
        )
        .context("Failed to create Composio client")?,
    );

    let model: Arc<dyn AiProvider> = Arc::new(
        GeminiClient::new(
            config.gemini_api_key.clone().unwrap_or_default(),
            &config.gemini_base_url,
            timeout,
        )
        .context("Failed to create Gemini client")?,
    );
    let ai = Arc::new(AiService::new(
        model,
        AiConfig {
            model: config.model.clone(),
            temperature: None,
            max_tokens: None,
            max_steps: config.max_steps,
        },
    ));

    let fetcher = HttpPageFetcher::new(timeout).context("Failed to create page fetcher")?;
    let local_tools: Vec<Arc<dyn LocalTool>> = vec![
        Arc::new(SlideGeneratorTool::new(Arc::clone(&ai))),
        Arc::new(BrowserTool::new(fetcher)),
    ];

    let port = config.port;
    tracing::info!(
        environment = %config.environment,
        model = %config.model,
        max_steps = config.max_steps,
        "Initializing SuperAgent server"
    );

    let state = Arc::new(AppState::new(config, ai, tools, local_tools));
    let app = http::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failure")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
