//! Suggestion evaluation engine

use std::path::Path;
use tracing::{debug, info};

use crate::rule::{default_rules, RuleSet};
use viralscope_core::{FeatureVector, Result, ScoreSet, Suggestion};

/// Maximum number of suggestions returned per prediction
pub const MAX_SUGGESTIONS: usize = 5;

/// Evaluates a rule set against one prediction's features and scores
#[derive(Debug, Clone)]
pub struct SuggestionEngine {
    rules: RuleSet,
}

impl SuggestionEngine {
    /// Engine over the given rules
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Engine over the built-in rules
    pub fn with_defaults() -> Self {
        Self::new(default_rules())
    }

    /// Load rules from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let rules = RuleSet::from_file(&path)?;
        info!(
            "Loaded {} suggestion rules from {}",
            rules.rules.len(),
            path.as_ref().display()
        );
        Ok(Self::new(rules))
    }

    /// Suggestions for one prediction: rules fire in order, then a stable
    /// priority sort and truncation to [`MAX_SUGGESTIONS`]
    pub fn suggest(&self, fv: &FeatureVector, scores: &ScoreSet) -> Vec<Suggestion> {
        let mut suggestions: Vec<Suggestion> = self
            .rules
            .rules
            .iter()
            .filter(|rule| rule.fires(fv, scores))
            .inspect(|rule| debug!(rule = %rule.name, "Suggestion rule fired"))
            .map(|rule| rule.suggestion())
            .collect();

        suggestions.sort_by_key(|s| s.priority);
        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }

    /// Loaded rules
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
