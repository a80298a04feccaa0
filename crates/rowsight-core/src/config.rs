//! Process configuration for the extraction core.
//!
//! Credentials and tunables are resolved once at startup and injected into
//! backend constructors explicitly - adapters never read ambient state at
//! call time. A backend whose credential is absent is downgraded to a
//! permanently failing stand-in; only the no-backend-at-all case is fatal.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::backend::gemini::{GeminiBackend, GeminiConfig, GEMINI_BACKEND_NAME};
use crate::backend::groq::{GroqBackend, GroqConfig, GROQ_BACKEND_NAME};
use crate::backend::{TableBackend, UnconfiguredBackend};
use crate::schema::{SchemaError, TableSchema};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GROQ_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_RENDER_WIDTH: u32 = 1600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no extraction backend has a credential; set GOOGLE_API_KEY or GROQ_API_KEY")]
    NoBackendConfigured,

    #[error("invalid ROWSIGHT_SCHEMA: {0}")]
    Schema(#[from] SchemaError),

    #[error("invalid value for {var}: {value}")]
    BadEnvValue { var: &'static str, value: String },
}

/// Everything the extraction core needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub schema: TableSchema,
    pub request_timeout: Duration,
    pub render_width: u32,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
}

impl ExtractorConfig {
    /// Resolve configuration from the environment.
    ///
    /// Reads `GOOGLE_API_KEY`, `GROQ_API_KEY`, and the optional
    /// `ROWSIGHT_SCHEMA` (comma-separated column names),
    /// `ROWSIGHT_TIMEOUT_SECS`, `ROWSIGHT_RENDER_WIDTH`,
    /// `ROWSIGHT_GEMINI_MODEL` and `ROWSIGHT_GROQ_MODEL` overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let schema = match non_empty_var("ROWSIGHT_SCHEMA") {
            Some(raw) => TableSchema::new(raw.split(',').map(|c| c.trim().to_string()))?,
            None => TableSchema::financial(),
        };

        let request_timeout =
            Duration::from_secs(parsed_var("ROWSIGHT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?);
        let render_width = parsed_var("ROWSIGHT_RENDER_WIDTH", DEFAULT_RENDER_WIDTH)?;

        Ok(Self {
            schema,
            request_timeout,
            render_width,
            gemini_api_key: non_empty_var("GOOGLE_API_KEY"),
            gemini_model: non_empty_var("ROWSIGHT_GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            groq_api_key: non_empty_var("GROQ_API_KEY"),
            groq_model: non_empty_var("ROWSIGHT_GROQ_MODEL")
                .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
        })
    }

    /// Build the ordered backend chain: Gemini first, Groq as fallback.
    ///
    /// A missing credential downgrades that backend to a permanently
    /// failing stand-in. If neither credential is present the process has
    /// nothing to extract with, which is a startup error.
    pub fn backends(&self) -> Result<Vec<Arc<dyn TableBackend>>, ConfigError> {
        if self.gemini_api_key.is_none() && self.groq_api_key.is_none() {
            return Err(ConfigError::NoBackendConfigured);
        }

        let primary: Arc<dyn TableBackend> = match &self.gemini_api_key {
            Some(key) => Arc::new(GeminiBackend::new(GeminiConfig::new(
                key.clone(),
                self.gemini_model.clone(),
                self.request_timeout,
            ))),
            None => {
                warn!(
                    backend = GEMINI_BACKEND_NAME,
                    "backend has no credential; it will always fail"
                );
                Arc::new(UnconfiguredBackend::new(GEMINI_BACKEND_NAME))
            }
        };

        let fallback: Arc<dyn TableBackend> = match &self.groq_api_key {
            Some(key) => Arc::new(GroqBackend::new(GroqConfig::new(
                key.clone(),
                self.groq_model.clone(),
                self.request_timeout,
            ))),
            None => {
                warn!(
                    backend = GROQ_BACKEND_NAME,
                    "backend has no credential; it will always fail"
                );
                Arc::new(UnconfiguredBackend::new(GROQ_BACKEND_NAME))
            }
        };

        Ok(vec![primary, fallback])
    }
}

fn non_empty_var(var: &'static str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::BadEnvValue { var, value }),
        None => Ok(default),
    }
}
