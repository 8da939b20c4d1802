//! Suggestion rule sets and the built-in defaults

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::trigger::Condition;
use viralscope_core::{
    Error, Feature, FeatureVector, Priority, Result, ScoreDimension, ScoreSet, Suggestion,
    SuggestionCategory,
};

/// An ordered collection of suggestion rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Rule set name
    pub name: String,

    /// Description of the rule set
    #[serde(default)]
    pub description: String,

    /// Version of the rule set
    #[serde(default)]
    pub version: String,

    /// Rules, evaluated in this order
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Load a rule set from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rules: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid suggestion rules: {}", e)))?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load a rule set from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read rules {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Reject duplicate names and gates outside the score range
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                return Err(Error::config("suggestion rule with empty name"));
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(Error::config(format!(
                    "duplicate suggestion rule '{}'",
                    rule.name
                )));
            }
            if let Some(gate) = &rule.gate {
                if gate.below > 100 {
                    return Err(Error::config(format!(
                        "rule '{}' gate threshold {} exceeds 100",
                        rule.name, gate.below
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of enabled rules
    pub fn enabled_count(&self) -> usize {
        self.rules.iter().filter(|r| r.enabled).count()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        default_rules()
    }
}

/// Score gate: the rule only fires while a dimension is below a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub dimension: ScoreDimension,
    pub below: u8,
}

impl Gate {
    /// Whether the scores are under the threshold
    pub fn is_open(&self, scores: &ScoreSet) -> bool {
        scores.get(self.dimension) < self.below
    }
}

/// A single suggestion rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier
    pub name: String,

    pub category: SuggestionCategory,

    pub priority: Priority,

    /// Suggestion headline
    pub title: String,

    /// Suggestion body
    pub description: String,

    /// Optional score gate; rules without one are always considered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<Gate>,

    /// Feature condition
    pub condition: Condition,

    /// Whether this rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Rule {
    /// Whether the rule fires for these features and scores
    pub fn fires(&self, fv: &FeatureVector, scores: &ScoreSet) -> bool {
        self.enabled
            && self.gate.map_or(true, |gate| gate.is_open(scores))
            && self.condition.matches(fv)
    }

    /// The suggestion this rule emits
    pub fn suggestion(&self) -> Suggestion {
        Suggestion {
            category: self.category,
            priority: self.priority,
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }
}

const DEFAULT_GATE: u8 = 60;

fn rule(
    name: &str,
    gate: Option<ScoreDimension>,
    condition: Condition,
    category: SuggestionCategory,
    priority: Priority,
    title: &str,
    description: &str,
) -> Rule {
    Rule {
        name: name.to_string(),
        category,
        priority,
        title: title.to_string(),
        description: description.to_string(),
        gate: gate.map(|dimension| Gate {
            dimension,
            below: DEFAULT_GATE,
        }),
        condition,
        enabled: true,
    }
}

/// Built-in rules, in evaluation order
pub fn default_rules() -> RuleSet {
    use ScoreDimension as D;
    use SuggestionCategory as C;

    RuleSet {
        name: "default".to_string(),
        description: "Built-in short-video improvement suggestions".to_string(),
        version: "1".to_string(),
        rules: vec![
            rule(
                "hook-question",
                Some(D::Hook),
                Condition::absent(Feature::HasQuestion),
                C::Hook,
                Priority::High,
                "Add a Hook Question",
                "Start with a question to increase curiosity and watch time.",
            ),
            rule(
                "hook-shorten",
                Some(D::Hook),
                Condition::above(Feature::Duration, 30.0),
                C::Hook,
                Priority::Medium,
                "Shorten Your Video",
                "Videos under 15 seconds often have higher completion rates.",
            ),
            rule(
                "trend-hashtags",
                Some(D::Trend),
                Condition::absent(Feature::HasFyp),
                C::Trend,
                Priority::High,
                "Use Trending Hashtags",
                "Add #fyp or #foryou to increase discoverability.",
            ),
            rule(
                "audio-sound",
                Some(D::Audio),
                Condition::absent(Feature::HasMusic),
                C::Audio,
                Priority::High,
                "Add Trending Sound",
                "Videos with popular sounds get up to 3x more views.",
            ),
            rule(
                "timing-peak",
                Some(D::Timing),
                Condition::absent(Feature::IsPrimeTime),
                C::Timing,
                Priority::Medium,
                "Post During Peak Hours",
                "Best posting times are 6-10 PM in your audience's timezone.",
            ),
            rule(
                "hashtag-more",
                Some(D::Hashtag),
                Condition::below(Feature::HashtagCount, 3.0),
                C::Hashtag,
                Priority::Medium,
                "Add More Hashtags",
                "Use 3-5 relevant hashtags for optimal reach.",
            ),
            rule(
                "hashtag-fewer",
                Some(D::Hashtag),
                Condition::above(Feature::HashtagCount, 8.0),
                C::Hashtag,
                Priority::Low,
                "Reduce Hashtag Count",
                "Too many hashtags can look spammy. Focus on 3-5 relevant ones.",
            ),
            rule(
                "engagement-cta",
                None,
                Condition::absent(Feature::HasCta),
                C::Engagement,
                Priority::Medium,
                "Add a Call to Action",
                "Ask viewers to like, comment, or follow to boost engagement.",
            ),
        ],
    }
}
