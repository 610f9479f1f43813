//! HTTP request handlers for the autollm API

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::memory::{InMemoryStore, MemoryStore};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::openrouter::OpenRouterClient;
use crate::router::ModelTable;
use axum::http::HeaderMap;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod chat;
pub mod classify;
pub mod extractor;
pub mod health;
pub mod memory;
pub mod metrics;

/// Header carrying the caller's own OpenRouter key
pub const OPENROUTER_KEY_HEADER: &str = "x-openrouter-key";

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    models: Arc<ModelTable>,
    client: Arc<OpenRouterClient>,
    memory: Arc<dyn MemoryStore>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState backed by an in-process memory store
    ///
    /// # Errors
    /// Returns an error if the HTTP client or the metrics registry cannot be
    /// created.
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        Self::with_memory_store(config, Arc::new(InMemoryStore::new()))
    }

    /// Create a new AppState with a caller-supplied memory store
    pub fn with_memory_store(
        config: Arc<Config>,
        memory: Arc<dyn MemoryStore>,
    ) -> AppResult<Self> {
        let models = Arc::new(ModelTable::from_config(&config.models));
        let client = Arc::new(OpenRouterClient::new(
            config.openrouter.clone(),
            config.server.request_timeout_seconds,
        )?);
        let metrics = Arc::new(
            Metrics::new()
                .map_err(|e| AppError::Internal(format!("Failed to create metrics: {}", e)))?,
        );

        Ok(Self {
            config,
            models,
            client,
            memory,
            metrics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn models(&self) -> &ModelTable {
        &self.models
    }

    pub fn client(&self) -> &OpenRouterClient {
        &self.client
    }

    pub fn memory(&self) -> &dyn MemoryStore {
        self.memory.as_ref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// The caller's OpenRouter key from the request headers, if present
pub fn openrouter_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(OPENROUTER_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Build the full HTTP router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .route("/api/chat", post(chat::handler))
        .route("/api/classify", post(classify::handler))
        .route(
            "/api/memory",
            get(memory::get_handler)
                .post(memory::set_handler)
                .delete(memory::delete_handler),
        )
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}
