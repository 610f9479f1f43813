//! Command-line interface for autollm
//!
//! Provides argument parsing and subcommand handling for the autollm binary.

use clap::{Parser, Subcommand};

/// Prompt-classifying chat router for OpenRouter-hosted models
#[derive(Parser)]
#[command(name = "autollm")]
#[command(version)]
#[command(about = "Prompt-classifying chat router for OpenRouter-hosted models")]
#[command(
    long_about = "autollm classifies each chat prompt by keyword (code, writing, reasoning, \
    analysis) and forwards it to the OpenRouter model configured for that category, \
    using the caller's own OpenRouter key."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the classification and model a prompt would be routed to
    Classify {
        /// Prompt text to classify
        prompt: String,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# autollm Configuration
# =====================
#
# This file configures the HTTP server, the OpenRouter connection, the
# classification → model table, per-user memory, and logging.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 3000

# OpenRouter timeout in seconds (1-300). Bounds a whole JSON reply. For a
# streamed reply it bounds the wait for headers and then each silent gap
# between chunks, so long streams that keep producing output are not cut off.
request_timeout_seconds = 60

# ─────────────────────────────────────────────────────────────────────────────
# OPENROUTER
# ─────────────────────────────────────────────────────────────────────────────
#
# Callers supply their own key in the x-openrouter-key header; no key is
# stored here.

[openrouter]
# API base URL (no trailing slash)
base_url = "https://openrouter.ai/api/v1"

# Sent as HTTP-Referer and X-Title for OpenRouter app attribution
app_url = "http://localhost:3000"
app_title = "AutoLLM AI App"

# Sampling temperature (0.0-2.0)
temperature = 0.7

# ─────────────────────────────────────────────────────────────────────────────
# MODEL TABLE
# ─────────────────────────────────────────────────────────────────────────────
#
# Model used for each prompt classification. Omitted entries keep their
# built-in value; unclassified prompts use "default".

[models]
code = "qwen/qwen3-30b-a3b:free"
writing = "qwen/qwen3-14b:free"
reasoning = "deepseek/deepseek-r1:free"
analysis = "qwen/qwen3-30b-a3b:free"
default = "qwen/qwen3-14b:free"

# ─────────────────────────────────────────────────────────────────────────────
# MEMORY
# ─────────────────────────────────────────────────────────────────────────────

[memory]
# Remember personal details users share ("my name is ...", "I live in ...")
# and pass them to the model as context
enabled = true

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level for autollm and HTTP request traces: "trace", "debug", "info",
# "warn", "error" or "off". RUST_LOG overrides it.
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
