//! Health check endpoint
//!
//! Reports liveness together with the active classification → model table.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Model used for each classification
    pub models: BTreeMap<&'static str, String>,
}

/// Health check handler
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let models = state
        .models()
        .iter()
        .map(|(classification, model)| (classification.as_str(), model.to_string()))
        .collect();

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            models,
        }),
    )
}
