//! Error types for autollm
//!
//! All errors implement `IntoResponse` for Axum handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("OpenRouter API key missing. Please provide your key in settings.")]
    MissingApiKey,

    #[error("OpenRouter returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Request to OpenRouter timed out after {timeout_seconds} seconds")]
    UpstreamTimeout { timeout_seconds: u64 },

    #[error("Stream from OpenRouter interrupted after {bytes_received} bytes: {reason}")]
    StreamInterrupted {
        bytes_received: usize,
        reason: String,
    },

    #[error("Failed to reach OpenRouter: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MissingApiKey => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Upstream { status, .. } => match *status {
                401 | 402 | 403 | 429 => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::StreamInterrupted { .. } | Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for the upstream failure metric
    pub fn failure_reason(&self) -> &'static str {
        match self {
            Self::Upstream { .. } => "status",
            Self::UpstreamTimeout { .. } => "timeout",
            Self::StreamInterrupted { .. } => "stream",
            Self::Transport(_) => "transport",
            _ => "other",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Validation(msg) | Self::Config(msg) | Self::Internal(msg) => msg.clone(),
            _ => self.to_string(),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
