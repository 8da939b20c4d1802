//! Suggestion rule conditions over the feature vector

use serde::{Deserialize, Serialize};
use viralscope_core::{Feature, FeatureVector};

/// Feature condition for a suggestion rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Indicator feature is 0
    FeatureAbsent {
        feature: Feature,
    },

    /// Indicator feature is 1
    FeaturePresent {
        feature: Feature,
    },

    /// Feature value strictly below a bound
    FeatureBelow {
        feature: Feature,
        value: f64,
    },

    /// Feature value strictly above a bound
    FeatureAbove {
        feature: Feature,
        value: f64,
    },

    /// Every sub-condition holds; an empty list always holds
    All {
        conditions: Vec<Condition>,
    },

    /// At least one sub-condition holds
    Any {
        conditions: Vec<Condition>,
    },
}

impl Condition {
    /// Evaluate against an extracted feature vector
    pub fn matches(&self, fv: &FeatureVector) -> bool {
        match self {
            Self::FeatureAbsent { feature } => !fv.flag(*feature),
            Self::FeaturePresent { feature } => fv.flag(*feature),
            Self::FeatureBelow { feature, value } => fv.get(*feature) < *value,
            Self::FeatureAbove { feature, value } => fv.get(*feature) > *value,
            Self::All { conditions } => conditions.iter().all(|c| c.matches(fv)),
            Self::Any { conditions } => conditions.iter().any(|c| c.matches(fv)),
        }
    }

    /// Shorthand for `FeatureAbsent`
    pub fn absent(feature: Feature) -> Self {
        Self::FeatureAbsent { feature }
    }

    /// Shorthand for `FeatureBelow`
    pub fn below(feature: Feature, value: f64) -> Self {
        Self::FeatureBelow { feature, value }
    }

    /// Shorthand for `FeatureAbove`
    pub fn above(feature: Feature, value: f64) -> Self {
        Self::FeatureAbove { feature, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_condition_yaml() {
        let yaml = "type: feature_below\nfeature: hashtag_count\nvalue: 3\n";
        let condition: Condition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(condition, Condition::below(Feature::HashtagCount, 3.0));
    }

    #[test]
    fn test_composite_condition() {
        let json = r#"{"type": "any", "conditions": [
            {"type": "feature_absent", "feature": "has_fyp"},
            {"type": "feature_above", "feature": "hashtag_count", "value": 8}
        ]}"#;
        let condition: Condition = serde_json::from_str(json).unwrap();

        let mut fv = FeatureVector::zeros();
        assert!(condition.matches(&fv));

        fv.set_flag(Feature::HasFyp, true);
        assert!(!condition.matches(&fv));

        fv.set(Feature::HashtagCount, 9.0);
        assert!(condition.matches(&fv));
    }

    #[test]
    fn test_bounds_are_strict() {
        let mut fv = FeatureVector::zeros();
        fv.set(Feature::Duration, 30.0);
        assert!(!Condition::above(Feature::Duration, 30.0).matches(&fv));
        assert!(!Condition::below(Feature::Duration, 30.0).matches(&fv));
        assert!(Condition::All { conditions: vec![] }.matches(&fv));
    }
}
