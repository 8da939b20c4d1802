//! Loading suggestion rules from disk

use std::io::Write;
use tempfile::NamedTempFile;
use viralscope_advisor::{default_rules, RuleSet, SuggestionEngine};
use viralscope_core::{
    EngagementData, Error, FeatureExtractor, Priority, ScoreSet, SuggestionCategory,
    VideoMetadata,
};

const CUSTOM_RULES: &str = r#"
name: creator-coaching
version: "3"
rules:
  - name: no-emoji
    category: engagement
    priority: low
    title: Add an Emoji
    description: A single emoji makes captions easier to scan.
    condition:
      type: feature_absent
      feature: has_emoji
  - name: weak-hook-long-video
    category: hook
    priority: high
    title: Cut the Intro
    description: Get to the point in the first two seconds.
    gate:
      dimension: hook
      below: 80
    condition:
      type: all
      conditions:
        - type: feature_above
          feature: duration
          value: 20
        - type: feature_absent
          feature: has_question
"#;

fn write_rules(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_engine_from_rule_file() {
    let file = write_rules(CUSTOM_RULES);
    let engine = SuggestionEngine::from_file(file.path()).unwrap();
    assert_eq!(engine.rules().name, "creator-coaching");

    let metadata = VideoMetadata::new("Long walkthrough of my setup").with_duration(42.0);
    let fv = FeatureExtractor::new().extract(&metadata);
    let scores = ScoreSet {
        hook: 65,
        ..ScoreSet::default()
    };

    let suggestions = engine.suggest(&fv, &scores);
    assert_eq!(suggestions.len(), 2);
    // high priority sorts ahead of the earlier low priority rule
    assert_eq!(suggestions[0].title, "Cut the Intro");
    assert_eq!(suggestions[0].category, SuggestionCategory::Hook);
    assert_eq!(suggestions[1].priority, Priority::Low);
}

#[test]
fn test_missing_rule_file() {
    let err = RuleSet::from_file("/nonexistent/rules.yaml").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_malformed_rule_file() {
    let file = write_rules("name: broken\nrules: [1, 2");
    assert!(matches!(
        SuggestionEngine::from_file(file.path()),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_default_rules_on_scenario_video() {
    let metadata = VideoMetadata::new("Check out this amazing video! #fyp #viral")
        .with_hashtags(["fyp", "viral", "trending"])
        .with_duration(15.5)
        .with_engagement(EngagementData::new(100_000, 10_000, 500, 200));
    let fv = FeatureExtractor::new().extract(&metadata);
    // fallback component scores for this video
    let scores = ScoreSet {
        overall: 77,
        hook: 90,
        trend: 80,
        audio: 60,
        timing: 60,
        hashtag: 85,
    };

    let engine = SuggestionEngine::new(default_rules());
    let suggestions = engine.suggest(&fv, &scores);

    // "check out" counts as a call to action and every gate is closed
    assert!(suggestions.is_empty());
}
