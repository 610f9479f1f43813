//! Chat endpoint handler
//!
//! Handles POST /api/chat: memory upkeep, prompt classification, and the
//! upstream OpenRouter call, answered as JSON or as Server-Sent Events.

use crate::error::{AppError, AppResult};
use crate::handlers::auth::AuthenticatedUser;
use crate::handlers::extractor::ApiJson;
use crate::handlers::{AppState, openrouter_key};
use crate::memory::{
    extract_personal_info, is_forget_command, memory_context_message, merge_memory,
};
use crate::metrics::{MemoryUpdate, UpstreamMode, log_recording_error};
use crate::middleware::RequestId;
use crate::openrouter::{ChatMessage, DeltaStream, EMPTY_RESPONSE_FALLBACK, Role, TokenUsage};
use crate::router::RoutingDecision;
use axum::{
    Extension, Json,
    extract::State,
    http::HeaderMap,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Deserializer, Serialize};
use std::convert::Infallible;
use std::time::{Duration, Instant};

/// Maximum number of messages in one request
const MAX_MESSAGES: usize = 100;

/// Maximum allowed message length in characters (100K chars)
const MAX_MESSAGE_LENGTH: usize = 100_000;

/// Classification label reported for memory commands
pub const MEMORY_COMMAND_CLASSIFICATION: &str = "memory-command";

/// Model label reported for replies the service produces itself
pub const SYSTEM_MODEL: &str = "system";

/// Reply sent after a forget command
pub const MEMORY_CLEARED_REPLY: &str = "I've cleared my memory of our previous conversations and personal details. We can start fresh!";

/// Chat request from client
///
/// Validation is enforced during deserialization - invalid instances cannot exist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    conversation_id: Option<String>,
    messages: Vec<ChatMessage>,
    stream: bool,
}

impl ChatRequest {
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether the client asked for Server-Sent Events
    pub fn stream(&self) -> bool {
        self.stream
    }

    /// The most recent message with the `user` role
    pub fn last_user_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }
}

impl<'de> Deserialize<'de> for ChatRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct RawChatRequest {
            #[serde(default)]
            conversation_id: Option<String>,
            messages: Vec<ChatMessage>,
            #[serde(default)]
            stream: bool,
        }

        let raw = RawChatRequest::deserialize(deserializer)?;

        if raw.messages.is_empty() {
            return Err(serde::de::Error::custom("messages cannot be empty"));
        }

        if raw.messages.len() > MAX_MESSAGES {
            return Err(serde::de::Error::custom(format!(
                "messages exceeds maximum of {} entries (got {})",
                MAX_MESSAGES,
                raw.messages.len()
            )));
        }

        // Count Unicode characters, not bytes
        for (index, message) in raw.messages.iter().enumerate() {
            let char_count = message.content.chars().count();
            if char_count > MAX_MESSAGE_LENGTH {
                return Err(serde::de::Error::custom(format!(
                    "message {} exceeds maximum length of {} characters (got {})",
                    index, MAX_MESSAGE_LENGTH, char_count
                )));
            }
        }

        Ok(ChatRequest {
            conversation_id: raw.conversation_id,
            messages: raw.messages,
            stream: raw.stream,
        })
    }
}

/// Chat response to client
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    content: String,
    model: String,
    classification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<TokenUsage>,
}

impl ChatResponse {
    /// Response for a completed upstream call
    pub fn routed(
        content: String,
        decision: &RoutingDecision,
        conversation_id: Option<String>,
        usage: TokenUsage,
    ) -> Self {
        Self {
            content,
            model: decision.model.clone(),
            classification: decision.classification.as_str().to_string(),
            conversation_id,
            usage: Some(usage),
        }
    }

    /// Response for a forget command
    pub fn memory_cleared(conversation_id: Option<String>) -> Self {
        Self {
            content: MEMORY_CLEARED_REPLY.to_string(),
            model: SYSTEM_MODEL.to_string(),
            classification: MEMORY_COMMAND_CLASSIFICATION.to_string(),
            conversation_id,
            usage: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn classification(&self) -> &str {
        &self.classification
    }
}

/// First event of a streamed reply
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamMeta<'a> {
    model: &'a str,
    classification: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<&'a str>,
}

/// POST /api/chat handler
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    ApiJson(request): ApiJson<ChatRequest>,
) -> AppResult<Response> {
    tracing::debug!(
        request_id = %request_id,
        conversation_id = ?request.conversation_id(),
        messages_count = request.messages().len(),
        stream = request.stream(),
        "Received chat request"
    );

    let user_text = request
        .last_user_message()
        .map(|m| m.content.clone())
        .ok_or_else(|| AppError::Validation("No user message found".to_string()))?;

    if is_forget_command(&user_text) {
        state.memory().clear(user.key()).await;
        log_recording_error(
            "memory_update",
            state.metrics().record_memory_update(MemoryUpdate::Cleared),
        );
        tracing::info!(request_id = %request_id, "Memory cleared by user command");

        let response = ChatResponse::memory_cleared(request.conversation_id);
        return Ok(Json(response).into_response());
    }

    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if state.config().memory.enabled {
        if let Some(memory) = update_memory(&state, &user, &user_text, request_id).await {
            messages.push(memory_context_message(&memory));
        }
    }
    messages.extend(request.messages.iter().cloned());

    let decision = state.models().route(&user_text);
    log_recording_error(
        "chat_request",
        state
            .metrics()
            .record_chat_request(decision.classification),
    );

    tracing::info!(
        request_id = %request_id,
        classification = %decision.classification,
        model = %decision.model,
        "Routing decision made"
    );

    let api_key = openrouter_key(&headers).ok_or(AppError::MissingApiKey)?;
    tracing::debug!(
        request_id = %request_id,
        key_length = api_key.len(),
        "Using caller-supplied OpenRouter key"
    );

    if request.stream {
        let started = Instant::now();
        let deltas = state
            .client()
            .stream(&api_key, &decision.model, &messages)
            .await
            .inspect_err(|e| record_failure(&state, request_id, e))?;

        let events = relay_events(
            state,
            request_id,
            decision,
            request.conversation_id,
            deltas,
            started,
        );
        return Ok(Sse::new(events)
            .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
            .into_response());
    }

    let started = Instant::now();
    let completion = state
        .client()
        .complete(&api_key, &decision.model, &messages)
        .await
        .inspect_err(|e| record_failure(&state, request_id, e))?;
    record_duration(&state, UpstreamMode::Complete, started);

    tracing::info!(
        request_id = %request_id,
        model = %completion.model,
        response_length = completion.content.len(),
        prompt_tokens = completion.usage.prompt_tokens,
        completion_tokens = completion.usage.completion_tokens,
        "Chat request completed"
    );

    let response = ChatResponse::routed(
        completion.content,
        &decision,
        request.conversation_id,
        completion.usage,
    );
    Ok(Json(response).into_response())
}

/// Fold newly shared details into the stored memory
///
/// Returns the memory to hand to the model, if there is any.
async fn update_memory(
    state: &AppState,
    user: &AuthenticatedUser,
    user_text: &str,
    request_id: RequestId,
) -> Option<String> {
    let existing = state.memory().get(user.key()).await;
    let detected = extract_personal_info(user_text);
    if detected.is_empty() {
        return existing.filter(|m| !m.is_empty());
    }

    let merged = merge_memory(existing.as_deref(), &detected);
    state.memory().set(user.key(), Some(merged.clone())).await;
    log_recording_error(
        "memory_update",
        state.metrics().record_memory_update(MemoryUpdate::Extracted),
    );
    tracing::info!(
        request_id = %request_id,
        memory_length = merged.len(),
        "Stored personal details from message"
    );
    Some(merged)
}

fn record_failure(state: &AppState, request_id: RequestId, error: &AppError) {
    tracing::warn!(
        request_id = %request_id,
        error = %error,
        reason = error.failure_reason(),
        "Upstream call failed"
    );
    log_recording_error(
        "upstream_failure",
        state
            .metrics()
            .record_upstream_failure(error.failure_reason()),
    );
}

fn record_duration(state: &AppState, mode: UpstreamMode, started: Instant) {
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
    log_recording_error(
        "upstream_duration",
        state.metrics().record_upstream_duration(mode, duration_ms),
    );
}

fn json_event<T: Serialize>(value: &T) -> Event {
    Event::default().data(serde_json::to_string(value).unwrap_or_default())
}

fn content_event(text: &str) -> Event {
    json_event(&serde_json::json!({ "content": text }))
}

#[derive(Debug, Clone, Copy)]
enum RelayPhase {
    Meta,
    Streaming,
    Closing,
    Finished,
}

struct Relay {
    state: AppState,
    request_id: RequestId,
    decision: RoutingDecision,
    conversation_id: Option<String>,
    deltas: DeltaStream,
    started: Instant,
    emitted: bool,
    phase: RelayPhase,
}

/// Turn upstream deltas into the client-facing SSE stream
///
/// Emits the meta event, one `{content}` event per delta, then `[DONE]`.
/// A mid-stream failure becomes an `{error}` event before `[DONE]`.
fn relay_events(
    state: AppState,
    request_id: RequestId,
    decision: RoutingDecision,
    conversation_id: Option<String>,
    deltas: DeltaStream,
    started: Instant,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let relay = Relay {
        state,
        request_id,
        decision,
        conversation_id,
        deltas,
        started,
        emitted: false,
        phase: RelayPhase::Meta,
    };

    stream::unfold(relay, |mut relay| async move {
        let event = match relay.phase {
            RelayPhase::Finished => return None,
            RelayPhase::Meta => {
                relay.phase = RelayPhase::Streaming;
                json_event(&StreamMeta {
                    model: &relay.decision.model,
                    classification: relay.decision.classification.as_str(),
                    conversation_id: relay.conversation_id.as_deref(),
                })
            }
            RelayPhase::Streaming => match relay.deltas.next().await {
                Some(Ok(text)) => {
                    relay.emitted = true;
                    content_event(&text)
                }
                Some(Err(e)) => {
                    record_failure(&relay.state, relay.request_id, &e);
                    relay.phase = RelayPhase::Closing;
                    json_event(&serde_json::json!({ "error": e.to_string() }))
                }
                None => {
                    record_duration(&relay.state, UpstreamMode::Stream, relay.started);
                    tracing::info!(
                        request_id = %relay.request_id,
                        model = %relay.decision.model,
                        "Streaming response completed"
                    );
                    if relay.emitted {
                        relay.phase = RelayPhase::Finished;
                        Event::default().data("[DONE]")
                    } else {
                        relay.phase = RelayPhase::Closing;
                        content_event(EMPTY_RESPONSE_FALLBACK)
                    }
                }
            },
            RelayPhase::Closing => {
                relay.phase = RelayPhase::Finished;
                Event::default().data("[DONE]")
            }
        };
        Some((Ok(event), relay))
    })
}
