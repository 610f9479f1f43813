//! Static classification → model lookup table

use super::{Classification, RoutingDecision, classify_prompt};
use crate::config::ModelsConfig;
use std::collections::HashMap;

/// Built-in model for code prompts
pub const DEFAULT_CODE_MODEL: &str = "qwen/qwen3-30b-a3b:free";
/// Built-in model for writing prompts
pub const DEFAULT_WRITING_MODEL: &str = "qwen/qwen3-14b:free";
/// Built-in model for reasoning prompts
pub const DEFAULT_REASONING_MODEL: &str = "deepseek/deepseek-r1:free";
/// Built-in model for analysis prompts
pub const DEFAULT_ANALYSIS_MODEL: &str = "qwen/qwen3-30b-a3b:free";
/// Built-in fallback model
pub const DEFAULT_FALLBACK_MODEL: &str = "qwen/qwen3-14b:free";

/// Maps each classification to an upstream model identifier
///
/// Lookups are pure. A classification without an entry resolves to the
/// `Default` entry, which is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTable {
    entries: HashMap<Classification, String>,
    fallback: String,
}

impl Default for ModelTable {
    fn default() -> Self {
        Self::from_config(&ModelsConfig::default())
    }
}

impl ModelTable {
    /// Build the table from configuration, keeping built-ins for omitted entries
    pub fn from_config(models: &ModelsConfig) -> Self {
        let mut entries = HashMap::new();
        for classification in Classification::ALL {
            if let Some(model) = models.get(classification) {
                entries.insert(classification, model.to_string());
            }
        }

        let fallback = entries
            .get(&Classification::Default)
            .cloned()
            .unwrap_or_else(|| DEFAULT_FALLBACK_MODEL.to_string());

        Self { entries, fallback }
    }

    /// Model identifier for a classification
    pub fn model_for(&self, classification: Classification) -> &str {
        self.entries
            .get(&classification)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }

    /// Model identifier for a raw prompt
    pub fn get_model_for_prompt(&self, prompt: &str) -> &str {
        self.model_for(classify_prompt(prompt))
    }

    /// Classify a prompt and resolve its model in one step
    pub fn route(&self, prompt: &str) -> RoutingDecision {
        let classification = classify_prompt(prompt);
        RoutingDecision::new(classification, self.model_for(classification))
    }

    /// Iterate over every classification and its model, in check order
    pub fn iter(&self) -> impl Iterator<Item = (Classification, &str)> {
        Classification::ALL
            .into_iter()
            .map(|c| (c, self.model_for(c)))
    }
}
