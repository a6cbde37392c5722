// Runtime configuration, read once at startup from the environment (and `.env`).
//
// Missing API keys are NOT a startup error: the server still boots so that
// `/api/health` can report what is missing, and each route rejects requests
// that need a key it doesn't have.

use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_COMPOSIO_BASE_URL: &str = "https://backend.composio.dev";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_MAX_STEPS: usize = 50;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// "production", "development", ... (APP_ENV, falling back to NODE_ENV)
    pub environment: String,
    pub composio_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub composio_base_url: String,
    pub composio_toolkit_version: String,
    pub gemini_base_url: String,
    pub model: String,
    pub max_steps: usize,
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Trim everything: env files edited on Windows love trailing whitespace.
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = parse_or(&get, "PORT", DEFAULT_PORT)?;
        let max_steps = parse_or(&get, "AGENT_MAX_STEPS", DEFAULT_MAX_STEPS)?;
        let http_timeout_secs = parse_or(&get, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;

        if max_steps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AGENT_MAX_STEPS".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(Self {
            port,
            environment: get("APP_ENV")
                .or_else(|| get("NODE_ENV"))
                .unwrap_or_else(|| "development".to_string()),
            composio_api_key: get("COMPOSIO_API_KEY"),
            gemini_api_key: get("GOOGLE_GENERATIVE_AI_API_KEY"),
            composio_base_url: get("COMPOSIO_BASE_URL")
                .unwrap_or_else(|| DEFAULT_COMPOSIO_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            composio_toolkit_version: get("COMPOSIO_TOOLKIT_VERSION")
                .unwrap_or_else(|| "latest".to_string()),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_steps,
            http_timeout_secs,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn has_composio_key(&self) -> bool {
        self.composio_api_key.is_some()
    }

    pub fn has_gemini_key(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
