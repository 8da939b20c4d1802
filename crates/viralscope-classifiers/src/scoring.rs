//! Score computation
//!
//! The five component scores (hook, trend, audio, timing, hashtag) always
//! come from fixed formulas over the feature vector. Only the overall score,
//! class and confidence depend on whether a trained classifier is serving.

use serde::{Deserialize, Serialize};

use crate::classifier::ClassProbabilities;
use viralscope_core::features::{Feature, FeatureVector};
use viralscope_core::{Result, ScoreSet, ViralClass};

/// Confidence reported for formula-based predictions
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Fallback weights as integer percentages: hook, trend, audio, timing, hashtag
pub const FALLBACK_WEIGHTS: [u32; 5] = [25, 25, 15, 15, 20];

const BASELINE: f64 = 50.0;

/// How a prediction was scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    Classifier,
    Fallback,
}

impl ScoringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classifier => "classifier",
            Self::Fallback => "fallback",
        }
    }
}

/// Result of scoring one feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOutcome {
    pub scores: ScoreSet,
    pub viral_class: ViralClass,
    pub confidence: f64,
    pub mode: ScoringMode,
}

/// Clamp to [0, 100] and truncate toward zero
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0) as u8
}

/// Hook strength
pub fn hook_score(fv: &FeatureVector) -> f64 {
    let mut score = BASELINE;
    if fv.flag(Feature::IsShort) {
        score += 10.0;
    }
    if fv.get(Feature::EngagementRate) > 0.10 {
        score += 20.0;
    }
    if fv.flag(Feature::HasQuestion) {
        score += 10.0;
    }
    if fv.flag(Feature::HasCta) {
        score += 5.0;
    }
    let views_log = fv.get(Feature::ViewsLog);
    if views_log > 5.0 {
        score += 15.0;
    } else if views_log > 4.0 {
        score += 10.0;
    }
    score
}

/// Trend alignment
pub fn trend_score(fv: &FeatureVector) -> f64 {
    let mut score = BASELINE;
    if fv.flag(Feature::HasFyp) {
        score += 15.0;
    }
    let engagement = fv.get(Feature::EngagementRate);
    if engagement > 0.15 {
        score += 25.0;
    } else if engagement > 0.08 {
        score += 15.0;
    } else if engagement > 0.05 {
        score += 5.0;
    }
    if fv.get(Feature::ShareRate) > 0.02 {
        score += 10.0;
    }
    score
}

/// Audio choice
pub fn audio_score(fv: &FeatureVector) -> f64 {
    let mut score = BASELINE;
    if fv.flag(Feature::HasMusic) {
        score += 20.0;
    }
    if !fv.flag(Feature::IsOriginalSound) {
        score += 10.0;
    }
    score
}

/// Posting-time fit
pub fn timing_score(fv: &FeatureVector) -> f64 {
    let mut score = BASELINE;
    if fv.flag(Feature::IsPrimeTime) {
        score += 20.0;
    }
    if fv.flag(Feature::IsWeekend) {
        score += 5.0;
    }
    let hour = fv.get(Feature::HourOfDay);
    if (11.0..=14.0).contains(&hour) {
        score += 10.0;
    } else if (18.0..=22.0).contains(&hour) {
        score += 15.0;
    }
    score
}

/// Hashtag strategy
pub fn hashtag_score(fv: &FeatureVector) -> f64 {
    let mut score = BASELINE;
    let count = fv.get(Feature::HashtagCount);
    if (3.0..=5.0).contains(&count) {
        score += 20.0;
    } else if (1.0..=8.0).contains(&count) {
        score += 10.0;
    } else if count > 10.0 {
        score -= 10.0;
    }
    if fv.flag(Feature::HasFyp) {
        score += 15.0;
    }
    score
}

/// Converts features and optional class probabilities into scores
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    /// Create a new scoring engine
    pub fn new() -> Self {
        Self
    }

    /// Component scores with overall left at 0
    pub fn components(&self, fv: &FeatureVector) -> ScoreSet {
        ScoreSet {
            overall: 0,
            hook: clamp_score(hook_score(fv)),
            trend: clamp_score(trend_score(fv)),
            audio: clamp_score(audio_score(fv)),
            timing: clamp_score(timing_score(fv)),
            hashtag: clamp_score(hashtag_score(fv)),
        }
    }

    /// Formula-only scoring used when no classifier is serving
    pub fn score_fallback(&self, fv: &FeatureVector) -> ScoringOutcome {
        let mut scores = self.components(fv);
        let parts = [
            scores.hook,
            scores.trend,
            scores.audio,
            scores.timing,
            scores.hashtag,
        ];
        // Integer percentages keep the weighted sum exact before flooring.
        let weighted: u32 = parts
            .iter()
            .zip(FALLBACK_WEIGHTS)
            .map(|(score, weight)| *score as u32 * weight)
            .sum();
        scores.overall = clamp_score((weighted / 100) as f64);

        ScoringOutcome {
            scores,
            viral_class: ViralClass::from_score(scores.overall),
            confidence: FALLBACK_CONFIDENCE,
            mode: ScoringMode::Fallback,
        }
    }

    /// Scoring from classifier probabilities.
    ///
    /// The overall score is the probability-weighted centre of each class's
    /// score range, then held inside the predicted class's range so the
    /// reported class always contains the overall score.
    pub fn score_with_probabilities(
        &self,
        fv: &FeatureVector,
        probabilities: &ClassProbabilities,
    ) -> Result<ScoringOutcome> {
        let probabilities = probabilities.normalized()?;
        let viral_class = probabilities.argmax();

        let expected: f64 = probabilities
            .iter()
            .map(|(class, p)| p * class.score_center())
            .sum();
        let (lo, hi) = viral_class.score_range();

        let mut scores = self.components(fv);
        scores.overall = clamp_score(expected).clamp(lo, hi);

        Ok(ScoringOutcome {
            scores,
            viral_class,
            confidence: probabilities.max(),
            mode: ScoringMode::Classifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viralscope_core::features::FeatureExtractor;
    use viralscope_core::{EngagementData, VideoMetadata};

    fn features(metadata: &VideoMetadata) -> FeatureVector {
        FeatureExtractor::new().extract(metadata)
    }

    #[test]
    fn test_empty_metadata_fallback() {
        let fv = features(&VideoMetadata::default());
        let outcome = ScoringEngine::new().score_fallback(&fv);

        // short +10; no sound but not original +10; noon +10
        assert_eq!(outcome.scores.hook, 60);
        assert_eq!(outcome.scores.trend, 50);
        assert_eq!(outcome.scores.audio, 60);
        assert_eq!(outcome.scores.timing, 60);
        assert_eq!(outcome.scores.hashtag, 50);
        // (60*25 + 50*25 + 60*15 + 60*15 + 50*20) / 100 = 55.5
        assert_eq!(outcome.scores.overall, 55);
        assert_eq!(outcome.viral_class, ViralClass::Medium);
        assert_eq!(outcome.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(outcome.mode, ScoringMode::Fallback);
    }

    #[test]
    fn test_scenario_fallback() {
        let metadata = VideoMetadata::new("Check out this amazing video! #fyp #viral")
            .with_hashtags(["fyp", "viral", "trending"])
            .with_duration(15.5)
            .with_engagement(EngagementData::new(100_000, 10_000, 500, 200));
        let outcome = ScoringEngine::new().score_fallback(&features(&metadata));

        // er 0.107 +20, cta +5, views_log just over 5 +15
        assert_eq!(outcome.scores.hook, 90);
        // fyp +15, er > 0.08 +15
        assert_eq!(outcome.scores.trend, 80);
        // 3 tags +20, fyp +15
        assert_eq!(outcome.scores.hashtag, 85);
        assert_eq!(outcome.scores.audio, 60);
        assert_eq!(outcome.scores.timing, 60);
        // (90*25 + 80*25 + 60*15 + 60*15 + 85*20) / 100 = 77.5
        assert_eq!(outcome.scores.overall, 77);
        assert_eq!(outcome.viral_class, ViralClass::High);
    }

    #[test]
    fn test_hashtag_bands() {
        let score_for = |n: usize| {
            let tags: Vec<String> = (0..n).map(|i| format!("tag{}", i)).collect();
            hashtag_score(&features(&VideoMetadata::default().with_hashtags(tags)))
        };
        assert_eq!(score_for(0), 50.0);
        assert_eq!(score_for(2), 60.0);
        assert_eq!(score_for(4), 70.0);
        assert_eq!(score_for(8), 60.0);
        assert_eq!(score_for(9), 50.0);
        assert_eq!(score_for(11), 40.0);
    }

    #[test]
    fn test_classifier_overall_weighted_by_probability() {
        let fv = features(&VideoMetadata::default());
        let probs = ClassProbabilities::new([0.0, 0.0, 1.0, 0.0]);
        let outcome = ScoringEngine::new()
            .score_with_probabilities(&fv, &probs)
            .unwrap();

        assert_eq!(outcome.scores.overall, 72);
        assert_eq!(outcome.viral_class, ViralClass::High);
        assert_eq!(outcome.confidence, 1.0);
        assert_eq!(outcome.mode, ScoringMode::Classifier);
        // components are formula-driven regardless of mode
        assert_eq!(outcome.scores.hook, 60);
    }

    #[test]
    fn test_classifier_overall_stays_in_predicted_range() {
        let fv = features(&VideoMetadata::default());
        // expected value lands in medium but low is the argmax
        let probs = ClassProbabilities::new([0.5, 0.0, 0.0, 0.5]);
        let outcome = ScoringEngine::new()
            .score_with_probabilities(&fv, &probs)
            .unwrap();

        assert_eq!(outcome.viral_class, ViralClass::Low);
        assert_eq!(outcome.scores.overall, 29);
    }

    #[test]
    fn test_degenerate_probabilities_fail() {
        let fv = features(&VideoMetadata::default());
        let probs = ClassProbabilities::new([0.0; 4]);
        assert!(ScoringEngine::new()
            .score_with_probabilities(&fv, &probs)
            .is_err());
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-5.0), 0);
        assert_eq!(clamp_score(140.0), 100);
        assert_eq!(clamp_score(59.99), 59);
        assert_eq!(clamp_score(f64::NAN), 0);
    }
}
