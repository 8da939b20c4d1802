//! Property tests for score bounds and class consistency

use proptest::prelude::*;
use viralscope_classifiers::scoring::FALLBACK_CONFIDENCE;
use viralscope_classifiers::{ClassProbabilities, ScoringEngine};
use viralscope_core::features::FeatureExtractor;
use viralscope_core::{EngagementData, FeatureVector, ScoreSet, VideoMetadata, ViralClass};

fn arb_features() -> impl Strategy<Value = FeatureVector> {
    (
        ".{0,60}",
        proptest::collection::vec("#?[a-z]{1,10}", 0..12),
        0.0f64..600.0,
        proptest::option::of("[a-z ]{0,16}"),
        (any::<u64>(), any::<u64>(), any::<u64>(), any::<u64>()),
    )
        .prop_map(|(description, hashtags, duration, sound, (views, likes, comments, shares))| {
            let mut metadata = VideoMetadata::new(description)
                .with_hashtags(hashtags)
                .with_duration(duration)
                .with_engagement(EngagementData::new(views, likes, comments, shares));
            if let Some(sound) = sound {
                metadata = metadata.with_sound(sound);
            }
            FeatureExtractor::new().extract(&metadata)
        })
}

fn in_range(class: ViralClass, score: u8) -> bool {
    let (lo, hi) = class.score_range();
    (lo..=hi).contains(&score)
}

fn all_bounded(scores: &ScoreSet) -> bool {
    [
        scores.overall,
        scores.hook,
        scores.trend,
        scores.audio,
        scores.timing,
        scores.hashtag,
    ]
    .iter()
    .all(|s| *s <= 100)
}

proptest! {
    #[test]
    fn fallback_class_contains_overall(fv in arb_features()) {
        let outcome = ScoringEngine::new().score_fallback(&fv);
        prop_assert!(all_bounded(&outcome.scores));
        prop_assert!(in_range(outcome.viral_class, outcome.scores.overall));
        prop_assert_eq!(outcome.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn classifier_class_contains_overall(
        fv in arb_features(),
        raw in proptest::array::uniform4(0.0f64..10.0),
    ) {
        prop_assume!(raw.iter().sum::<f64>() > 0.0);
        let outcome = ScoringEngine::new()
            .score_with_probabilities(&fv, &ClassProbabilities::new(raw))
            .unwrap();

        prop_assert!(all_bounded(&outcome.scores));
        prop_assert!(in_range(outcome.viral_class, outcome.scores.overall));
        prop_assert!(outcome.confidence >= 0.25 - 1e-12);
        prop_assert!(outcome.confidence <= 1.0 + 1e-12);
    }
}
