//! Classification endpoint
//!
//! Handles POST /api/classify: reports the classification and model a prompt
//! would be routed to, without calling upstream.

use crate::handlers::AppState;
use crate::handlers::extractor::ApiJson;
use crate::router::RoutingDecision;
use axum::{Json, extract::State};
use serde::{Deserialize, Deserializer};

/// Maximum allowed prompt length in characters (100K chars)
const MAX_PROMPT_LENGTH: usize = 100_000;

/// Classification request from client
#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    prompt: String,
}

impl ClassifyRequest {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

impl<'de> Deserialize<'de> for ClassifyRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawClassifyRequest {
            prompt: String,
        }

        let raw = RawClassifyRequest::deserialize(deserializer)?;

        let char_count = raw.prompt.chars().count();
        if char_count > MAX_PROMPT_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "prompt exceeds maximum length of {} characters (got {})",
                MAX_PROMPT_LENGTH, char_count
            )));
        }

        Ok(ClassifyRequest { prompt: raw.prompt })
    }
}

/// POST /api/classify handler
pub async fn handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ClassifyRequest>,
) -> Json<RoutingDecision> {
    let decision = state.models().route(request.prompt());

    tracing::debug!(
        classification = %decision.classification,
        model = %decision.model,
        prompt_length = request.prompt().len(),
        "Classified prompt"
    );

    Json(decision)
}
