//! Prometheus metrics collection for autollm
//!
//! This module provides metrics instrumentation for tracking:
//! - Chat requests by prompt classification
//! - Upstream call latency by transport mode
//! - Upstream failures by reason
//! - Memory updates by kind
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use crate::router::Classification;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Upstream transport mode, used as a metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMode {
    /// Single-shot JSON completion
    Complete,
    /// Server-sent event stream
    Stream,
}

impl UpstreamMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Stream => "stream",
        }
    }
}

/// Kind of memory change, used as a metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUpdate {
    /// Personal details extracted from a chat message
    Extracted,
    /// Memory replaced through the memory API
    Set,
    /// Memory wiped by a forget command or the memory API
    Cleared,
}

impl MemoryUpdate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::Set => "set",
            Self::Cleared => "cleared",
        }
    }
}

/// Metrics collector for autollm
///
/// Label values come from closed enums, so cardinality is fixed:
/// 5 classifications, 2 modes, a handful of failure reasons, 3 update kinds.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    chat_requests: IntCounterVec,
    upstream_duration: HistogramVec,
    upstream_failures: IntCounterVec,
    memory_updates: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let chat_requests = IntCounterVec::new(
            Opts::new(
                "autollm_chat_requests_total",
                "Total number of routed chat requests by prompt classification",
            ),
            &["classification"],
        )?;

        let upstream_duration = HistogramVec::new(
            HistogramOpts::new(
                "autollm_upstream_duration_ms",
                "Duration of OpenRouter calls in milliseconds, by response mode",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0,
            ]),
            &["mode"],
        )?;

        let upstream_failures = IntCounterVec::new(
            Opts::new(
                "autollm_upstream_failures_total",
                "Total number of failed OpenRouter calls by reason",
            ),
            &["reason"],
        )?;

        let memory_updates = IntCounterVec::new(
            Opts::new(
                "autollm_memory_updates_total",
                "Total number of per-user memory changes by kind",
            ),
            &["kind"],
        )?;

        registry.register(Box::new(chat_requests.clone()))?;
        registry.register(Box::new(upstream_duration.clone()))?;
        registry.register(Box::new(upstream_failures.clone()))?;
        registry.register(Box::new(memory_updates.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            chat_requests,
            upstream_duration,
            upstream_failures,
            memory_updates,
        })
    }

    /// Record a routed chat request
    pub fn record_chat_request(
        &self,
        classification: Classification,
    ) -> Result<(), prometheus::Error> {
        self.chat_requests
            .get_metric_with_label_values(&[classification.as_str()])?
            .inc();
        Ok(())
    }

    /// Record upstream latency
    ///
    /// # Errors
    ///
    /// Rejects NaN, infinite, and negative durations, which would corrupt
    /// histogram percentiles.
    pub fn record_upstream_duration(
        &self,
        mode: UpstreamMode,
        duration_ms: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                duration_ms
            )));
        }

        self.upstream_duration
            .get_metric_with_label_values(&[mode.as_str()])?
            .observe(duration_ms);
        Ok(())
    }

    /// Record a failed upstream call
    pub fn record_upstream_failure(&self, reason: &'static str) -> Result<(), prometheus::Error> {
        self.upstream_failures
            .get_metric_with_label_values(&[reason])?
            .inc();
        Ok(())
    }

    /// Record a memory change
    pub fn record_memory_update(&self, kind: MemoryUpdate) -> Result<(), prometheus::Error> {
        self.memory_updates
            .get_metric_with_label_values(&[kind.as_str()])?
            .inc();
        Ok(())
    }

    /// Count of chat requests for one classification
    pub fn chat_requests_count(&self, classification: Classification) -> u64 {
        self.chat_requests
            .with_label_values(&[classification.as_str()])
            .get()
    }

    /// Count of upstream failures for one reason
    pub fn upstream_failures_count(&self, reason: &str) -> u64 {
        self.upstream_failures.with_label_values(&[reason]).get()
    }

    /// Count of memory updates of one kind
    pub fn memory_updates_count(&self, kind: MemoryUpdate) -> u64 {
        self.memory_updates.with_label_values(&[kind.as_str()]).get()
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("Metrics output is not UTF-8: {}", e)))
    }
}

/// Log-and-continue wrapper for metric recording
///
/// Metrics never fail a request; recording errors are logged.
pub fn log_recording_error(operation: &'static str, result: Result<(), prometheus::Error>) {
    if let Err(e) = result {
        tracing::error!(
            operation,
            error = %e,
            "Metrics recording failed (non-fatal), request continues"
        );
    }
}
