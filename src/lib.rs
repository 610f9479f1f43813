//! autollm - prompt-classifying chat router for OpenRouter-hosted models
//!
//! Classifies each chat prompt by keyword, picks the model configured for its
//! category, and relays the conversation to OpenRouter with the caller's own
//! key. Personal details users share are remembered per user and passed back
//! to the model as context.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod metrics;
pub mod middleware;
pub mod openrouter;
pub mod router;
pub mod telemetry;
