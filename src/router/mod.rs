//! Prompt routing for autollm
//!
//! Classifies a prompt into a fixed category and maps the category to an
//! upstream model identifier.

pub mod classifier;
pub mod model_table;

pub use classifier::classify_prompt;
pub use model_table::ModelTable;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category assigned to a prompt by keyword matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Code,
    Writing,
    Reasoning,
    Analysis,
    #[default]
    Default,
}

impl Classification {
    /// Every classification, in the order the classifier checks them
    pub const ALL: [Classification; 5] = [
        Self::Code,
        Self::Writing,
        Self::Reasoning,
        Self::Analysis,
        Self::Default,
    ];

    /// Convert to string representation for logging, metrics and responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Writing => "writing",
            Self::Reasoning => "reasoning",
            Self::Analysis => "analysis",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown classification '{}'", s))
    }
}

/// Result of a routing decision
///
/// Pairs the classification with the model identifier it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    /// Category the prompt fell into
    pub classification: Classification,
    /// Upstream model identifier to call
    pub model: String,
}

impl RoutingDecision {
    /// Create a new routing decision
    pub fn new(classification: Classification, model: impl Into<String>) -> Self {
        Self {
            classification,
            model: model.into(),
        }
    }
}
