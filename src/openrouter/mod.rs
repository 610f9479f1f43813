//! OpenRouter integration
//!
//! Wire types, the HTTP client, and server-sent event decoding for
//! OpenRouter's OpenAI-compatible chat completions API.

pub mod client;
pub mod sse;
pub mod types;

pub use client::{DeltaStream, EMPTY_RESPONSE_FALLBACK, OpenRouterClient, collect_stream};
pub use types::{ChatMessage, Completion, Role, TokenUsage};
