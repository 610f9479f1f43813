//! Memory endpoints
//!
//! GET, POST and DELETE /api/memory read, replace, and clear the caller's
//! stored personal context.

use crate::handlers::AppState;
use crate::handlers::auth::AuthenticatedUser;
use crate::handlers::extractor::ApiJson;
use crate::metrics::{MemoryUpdate, log_recording_error};
use crate::middleware::RequestId;
use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};

/// Stored memory for the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryResponse {
    pub memory: Option<String>,
}

/// Body of POST /api/memory
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetMemoryRequest {
    #[serde(default)]
    pub memory: Option<String>,
}

/// Acknowledgement for memory writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryUpdated {
    pub success: bool,
}

/// GET /api/memory handler
pub async fn get_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Json<MemoryResponse> {
    let memory = state.memory().get(user.key()).await;
    Json(MemoryResponse { memory })
}

/// POST /api/memory handler
///
/// A missing, null, or blank `memory` clears the stored value.
pub async fn set_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<SetMemoryRequest>,
) -> Json<MemoryUpdated> {
    let memory = request.memory.filter(|m| !m.trim().is_empty());
    let kind = if memory.is_some() {
        MemoryUpdate::Set
    } else {
        MemoryUpdate::Cleared
    };

    state.memory().set(user.key(), memory).await;
    log_recording_error("memory_update", state.metrics().record_memory_update(kind));
    tracing::info!(request_id = %request_id, kind = kind.as_str(), "Memory updated");

    Json(MemoryUpdated { success: true })
}

/// DELETE /api/memory handler
pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    user: AuthenticatedUser,
) -> Json<MemoryUpdated> {
    state.memory().clear(user.key()).await;
    log_recording_error(
        "memory_update",
        state.metrics().record_memory_update(MemoryUpdate::Cleared),
    );
    tracing::info!(request_id = %request_id, "Memory cleared");

    Json(MemoryUpdated { success: true })
}
