//! HTTP client for OpenRouter's chat completions endpoint

use super::sse::{SseEvent, parse_event};
use super::types::{
    ChatMessage, Completion, CompletionRequest, CompletionResponse, ErrorEnvelope, TokenUsage,
};
use crate::config::OpenRouterConfig;
use crate::error::{AppError, AppResult};
use eventsource_stream::{EventStreamError, Eventsource};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Content returned when the upstream reply carries no text
pub const EMPTY_RESPONSE_FALLBACK: &str = "No response generated.";

/// Maximum number of characters of a raw error body kept in error messages
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Stream of text deltas from a streamed completion
pub type DeltaStream = BoxStream<'static, AppResult<String>>;

/// Client for OpenRouter's OpenAI-compatible API
///
/// Holds no credentials: every call takes the caller's own key.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    config: OpenRouterConfig,
    timeout_seconds: u64,
}

impl OpenRouterClient {
    /// Create a client for the configured endpoint
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built
    /// (TLS backend initialization failure).
    pub fn new(config: OpenRouterConfig, timeout_seconds: u64) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            timeout_seconds,
        })
    }

    /// Full URL of the completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Per-call timeout in seconds
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    fn request(
        &self,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
        stream: bool,
    ) -> AppResult<reqwest::RequestBuilder> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AppError::MissingApiKey);
        }

        let body = CompletionRequest {
            model,
            messages,
            temperature: self.config.temperature,
            stream,
        };

        Ok(self
            .http
            .post(self.completions_url())
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.config.app_url)
            .header("X-Title", &self.config.app_title)
            .json(&body))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> AppResult<reqwest::Response> {
        let response = tokio::time::timeout(
            Duration::from_secs(self.timeout_seconds),
            request.send(),
        )
        .await
        .map_err(|_| AppError::UpstreamTimeout {
            timeout_seconds: self.timeout_seconds,
        })??;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Upstream {
            status: status.as_u16(),
            message: upstream_error_message(status, &body),
        })
    }

    /// Run a single-shot completion
    pub async fn complete(
        &self,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
    ) -> AppResult<Completion> {
        let request = self.request(api_key, model, messages, false)?;

        tracing::debug!(
            model = %model,
            messages = messages.len(),
            url = %self.completions_url(),
            "Sending completion request"
        );

        let deadline = Instant::now() + Duration::from_secs(self.timeout_seconds);
        let response = self.send(request).await?;
        let parsed: CompletionResponse = tokio::time::timeout_at(deadline, response.json())
            .await
            .map_err(|_| AppError::UpstreamTimeout {
                timeout_seconds: self.timeout_seconds,
            })??;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| EMPTY_RESPONSE_FALLBACK.to_string());

        Ok(Completion {
            content,
            model: model.to_string(),
            usage: parsed.usage.map(TokenUsage::from).unwrap_or_default(),
        })
    }

    /// Start a streamed completion and return its text deltas
    ///
    /// The client timeout bounds the wait for response headers and then each
    /// gap between body chunks. A long reply that keeps producing data is not
    /// cut off.
    pub async fn stream(
        &self,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
    ) -> AppResult<DeltaStream> {
        let request = self.request(api_key, model, messages, true)?;

        tracing::debug!(
            model = %model,
            messages = messages.len(),
            url = %self.completions_url(),
            "Sending streaming completion request"
        );

        let response = self.send(request).await?;
        Ok(delta_stream(
            response.bytes_stream(),
            Duration::from_secs(self.timeout_seconds),
        ))
    }
}

/// Join a delta stream into the full reply
pub async fn collect_stream(mut deltas: DeltaStream) -> AppResult<String> {
    let mut content = String::new();
    while let Some(delta) = deltas.next().await {
        content.push_str(&delta?);
    }
    if content.is_empty() {
        content.push_str(EMPTY_RESPONSE_FALLBACK);
    }
    Ok(content)
}

/// Failure of the raw body underneath the SSE decoder
enum BodyError<E> {
    Transport(E),
    Idle,
}

impl<E: Display> Display for BodyError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyError::Transport(e) => write!(f, "{}", e),
            BodyError::Idle => write!(f, "no data received before the idle timeout"),
        }
    }
}

/// Bound the gap between body chunks and count the bytes that arrive
///
/// Any bytes reset the timer, including SSE comments that never become
/// events.
fn idle_bounded<S, B, E>(
    body: S,
    idle_timeout: Duration,
    bytes_received: Arc<AtomicUsize>,
) -> impl Stream<Item = Result<B, BodyError<E>>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
{
    stream::unfold(
        (Box::pin(body), false),
        move |(mut body, done)| {
            let bytes_received = Arc::clone(&bytes_received);
            async move {
                if done {
                    return None;
                }
                match tokio::time::timeout(idle_timeout, body.next()).await {
                    Err(_) => Some((Err(BodyError::Idle), (body, true))),
                    Ok(None) => None,
                    Ok(Some(Err(e))) => Some((Err(BodyError::Transport(e)), (body, true))),
                    Ok(Some(Ok(bytes))) => {
                        bytes_received.fetch_add(bytes.as_ref().len(), Ordering::Relaxed);
                        Some((Ok(bytes), (body, false)))
                    }
                }
            }
        },
    )
}

/// Turn a raw SSE byte stream into text deltas
///
/// Generic over the byte source so it can be driven without a network.
/// `idle_timeout` bounds the wait for each body chunk, not the whole stream.
pub fn delta_stream<S, B, E>(body: S, idle_timeout: Duration) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let bytes_received = Arc::new(AtomicUsize::new(0));
    let events = idle_bounded(body, idle_timeout, Arc::clone(&bytes_received))
        .eventsource()
        .boxed();

    stream::unfold(
        (events, bytes_received, false),
        move |(mut events, bytes_received, finished)| async move {
            if finished {
                return None;
            }
            loop {
                let interrupted = |reason: String| AppError::StreamInterrupted {
                    bytes_received: bytes_received.load(Ordering::Relaxed),
                    reason,
                };

                let item = match events.next().await? {
                    Ok(event) => match parse_event(&event.data) {
                        Some(SseEvent::Delta(text)) => Ok(text),
                        Some(SseEvent::Done) => return None,
                        Some(SseEvent::Error(message)) => Err(interrupted(message)),
                        None => continue,
                    },
                    Err(EventStreamError::Transport(BodyError::Idle)) => {
                        Err(AppError::UpstreamTimeout {
                            timeout_seconds: idle_timeout.as_secs(),
                        })
                    }
                    Err(EventStreamError::Transport(BodyError::Transport(e))) => {
                        Err(interrupted(e.to_string()))
                    }
                    Err(e) => Err(interrupted(e.to_string())),
                };

                let finished = item.is_err();
                return Some((item, (events, bytes_received, finished)));
            }
        },
    )
    .boxed()
}

fn upstream_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("upstream error")
            .to_string();
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
