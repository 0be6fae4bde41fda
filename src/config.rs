use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{AnalystError, Result};
use crate::synth::ModelSelection;
use crate::transport::DEFAULT_GEMINI_BASE_URL;

const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_GEMINI_API_KEY";

/// Main configuration structure for the analyst server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub report_model: String,
    pub comparison_model: String,
    pub chat_model: String,
    /// Thinking budget for report extraction; 0 disables it.
    pub report_thinking_budget: u32,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    #[default]
    Stdio,
    Http,
}

impl TransportMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "stdio" => Some(TransportMode::Stdio),
            "http" | "streamable_http" => Some(TransportMode::Http),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub mode: TransportMode,
    pub http_bind: String,
    pub http_path: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::Stdio,
            http_bind: "127.0.0.1:8787".to_string(),
            http_path: "/mcp".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    /// Always returns a usable config; problems are logged, never raised.
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => tracing::info!("Loaded .env from: {}", path.display()),
            Err(_) => tracing::debug!("No .env file found - continuing with env vars only"),
        }

        let config_path =
            env::var("ANALYST_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        let mut config = Self::from_file(&config_path);

        config.apply_overrides_from(|key| env::var(key).ok());

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    fn from_file(config_path: &str) -> Self {
        if !Path::new(config_path).exists() {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            return Self::default();
        }
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path);
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    config_path,
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply overrides from an environment-like lookup. Unparseable numbers are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("ANALYST_SERVER_NAME") {
            self.server.name = name;
        }

        if let Some(api_key) = lookup("GEMINI_API_KEY").or_else(|| lookup("API_KEY")) {
            self.gemini.api_key = api_key;
        }
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            self.gemini.base_url = base_url;
        }
        if let Some(model) = lookup("GEMINI_REPORT_MODEL") {
            self.gemini.report_model = model;
        }
        if let Some(model) = lookup("GEMINI_COMPARISON_MODEL") {
            self.gemini.comparison_model = model;
        }
        if let Some(model) = lookup("GEMINI_CHAT_MODEL") {
            self.gemini.chat_model = model;
        }
        if let Some(budget) = lookup("GEMINI_THINKING_BUDGET") {
            if let Ok(budget) = budget.trim().parse() {
                self.gemini.report_thinking_budget = budget;
            }
        }
        if let Some(timeout) = lookup("GEMINI_TIMEOUT_SECONDS") {
            if let Ok(secs) = timeout.trim().parse() {
                self.gemini.request_timeout_seconds = secs;
            }
        }

        if let Some(mode) = lookup("ANALYST_TRANSPORT") {
            match TransportMode::parse(&mode) {
                Some(mode) => self.transport.mode = mode,
                None => tracing::warn!("Unknown ANALYST_TRANSPORT '{}', keeping {:?}", mode, self.transport.mode),
            }
        }
        if let Some(bind) = lookup("ANALYST_HTTP_BIND") {
            self.transport.http_bind = bind;
        }
        if let Some(path) = lookup("ANALYST_HTTP_PATH") {
            self.transport.http_path = path;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gemini.api_key.is_empty() || self.gemini.api_key == PLACEHOLDER_API_KEY {
            return Err(AnalystError::Config(
                "GEMINI_API_KEY environment variable must be set".to_string(),
            ));
        }
        if self.gemini.request_timeout_seconds == 0 {
            return Err(AnalystError::Config(
                "gemini.request_timeout_seconds cannot be 0".to_string(),
            ));
        }
        for (name, model) in [
            ("report_model", &self.gemini.report_model),
            ("comparison_model", &self.gemini.comparison_model),
            ("chat_model", &self.gemini.chat_model),
        ] {
            if model.trim().is_empty() {
                return Err(AnalystError::Config(format!("gemini.{name} cannot be empty")));
            }
        }
        if !self.transport.http_path.starts_with('/') {
            return Err(AnalystError::Config(
                "transport.http_path must start with '/'".to_string(),
            ));
        }
        Ok(())
    }

    pub fn model_selection(&self) -> ModelSelection {
        ModelSelection {
            report: self.gemini.report_model.clone(),
            comparison: self.gemini.comparison_model.clone(),
            chat: self.gemini.chat_model.clone(),
            report_thinking_budget: match self.gemini.report_thinking_budget {
                0 => None,
                budget => Some(budget),
            },
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.request_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "cricket-analyst".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            gemini: GeminiConfig {
                api_key: PLACEHOLDER_API_KEY.to_string(),
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                report_model: "gemini-2.5-pro".to_string(),
                comparison_model: "gemini-2.5-pro".to_string(),
                chat_model: "gemini-2.5-flash".to_string(),
                report_thinking_budget: 8192,
                request_timeout_seconds: 120,
            },
            transport: TransportConfig::default(),
        }
    }
}
