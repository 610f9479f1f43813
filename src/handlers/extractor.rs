//! JSON body extractor with `{"error": ...}` rejections
//!
//! Axum's `Json` rejects malformed bodies with a plain-text response. This
//! wrapper keeps the same status codes but answers in the JSON error shape
//! every other failure of the API uses.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Rejection for [`ApiJson`]
///
/// - JSON syntax errors → 400 Bad Request
/// - Data errors (missing fields, failed validation) → 422 Unprocessable Entity
/// - Missing content type → 415 Unsupported Media Type
/// - Anything else keeps the status axum chose
#[derive(Debug)]
pub struct ApiJsonRejection(JsonRejection);

impl ApiJsonRejection {
    /// Status and message sent to the client
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            JsonRejection::JsonSyntaxError(_) => (StatusCode::BAD_REQUEST, self.0.body_text()),
            JsonRejection::JsonDataError(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.body_text())
            }
            JsonRejection::MissingJsonContentType(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Content-Type must be application/json".to_string(),
            ),
            other => (other.status(), other.body_text()),
        }
    }
}

impl IntoResponse for ApiJsonRejection {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        tracing::debug!(status = %status, error = %message, "Rejected request body");
        let body = Json(serde_json::json!({
            "error": message,
        }));
        (status, body).into_response()
    }
}

/// `Json` extractor whose rejections are `{"error": msg}` bodies
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiJsonRejection(rejection)),
        }
    }
}
