//! Configuration management for autollm
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::error::{AppError, AppResult};
use crate::router::Classification;
use crate::router::model_table::{
    DEFAULT_ANALYSIS_MODEL, DEFAULT_CODE_MODEL, DEFAULT_FALLBACK_MODEL, DEFAULT_REASONING_MODEL,
    DEFAULT_WRITING_MODEL,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Upper bound for any request timeout, in seconds
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Accepted values for `observability.log_level`
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    60
}

/// OpenRouter upstream configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenRouterConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `HTTP-Referer` for OpenRouter app attribution
    #[serde(default = "default_app_url")]
    pub app_url: String,
    /// Sent as `X-Title` for OpenRouter app attribution
    #[serde(default = "default_app_title")]
    pub app_title: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app_url: default_app_url(),
            app_title: default_app_title(),
            temperature: default_temperature(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_app_title() -> String {
    "AutoLLM AI App".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

/// Classification → model overrides
///
/// Omitted entries keep the built-in free-model mapping.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelsConfig {
    #[serde(default = "default_code_model")]
    code: String,
    #[serde(default = "default_writing_model")]
    writing: String,
    #[serde(default = "default_reasoning_model")]
    reasoning: String,
    #[serde(default = "default_analysis_model")]
    analysis: String,
    #[serde(default = "default_fallback_model")]
    default: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            code: default_code_model(),
            writing: default_writing_model(),
            reasoning: default_reasoning_model(),
            analysis: default_analysis_model(),
            default: default_fallback_model(),
        }
    }
}

impl ModelsConfig {
    /// Configured model for a classification, or `None` if the entry is blank
    pub fn get(&self, classification: Classification) -> Option<&str> {
        let model = match classification {
            Classification::Code => &self.code,
            Classification::Writing => &self.writing,
            Classification::Reasoning => &self.reasoning,
            Classification::Analysis => &self.analysis,
            Classification::Default => &self.default,
        };
        let model = model.trim();
        (!model.is_empty()).then_some(model)
    }
}

fn default_code_model() -> String {
    DEFAULT_CODE_MODEL.to_string()
}

fn default_writing_model() -> String {
    DEFAULT_WRITING_MODEL.to_string()
}

fn default_reasoning_model() -> String {
    DEFAULT_REASONING_MODEL.to_string()
}

fn default_analysis_model() -> String {
    DEFAULT_ANALYSIS_MODEL.to_string()
}

fn default_fallback_model() -> String {
    DEFAULT_FALLBACK_MODEL.to_string()
}

/// Per-user memory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_enabled")]
    pub enabled: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_memory_enabled(),
        }
    }
}

fn default_memory_enabled() -> bool {
    true
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                request_timeout_seconds: default_request_timeout(),
            },
            openrouter: OpenRouterConfig::default(),
            models: ModelsConfig::default(),
            memory: MemoryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`; call it explicitly when
    /// building a `Config` by other means.
    pub fn validate(&self) -> AppResult<()> {
        if self.server.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "request_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.server.request_timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "request_timeout_seconds cannot exceed {} seconds, got {}",
                MAX_TIMEOUT_SECONDS, self.server.request_timeout_seconds
            )));
        }

        let base_url = &self.openrouter.base_url;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "openrouter.base_url '{}' must start with 'http://' or 'https://'",
                base_url
            )));
        }
        if base_url.ends_with('/') {
            return Err(AppError::Config(format!(
                "openrouter.base_url '{}' must not end with '/' \
                (use e.g. 'https://openrouter.ai/api/v1')",
                base_url
            )));
        }

        let temperature = self.openrouter.temperature;
        if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::Config(format!(
                "openrouter.temperature must be a finite number between 0.0 and 2.0, got {}",
                temperature
            )));
        }

        if self.openrouter.app_title.trim().is_empty() {
            return Err(AppError::Config(
                "openrouter.app_title cannot be empty".to_string(),
            ));
        }

        let log_level = self.observability.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(AppError::Config(format!(
                "observability.log_level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.observability.log_level
            )));
        }

        for classification in Classification::ALL {
            if self.models.get(classification).is_none() {
                return Err(AppError::Config(format!(
                    "models.{} cannot be empty",
                    classification
                )));
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
