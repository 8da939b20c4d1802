//! Versioned feature schema
//!
//! The order of [`Feature::ALL`] is the column order trained classifiers
//! expect. Append-only changes still require a [`FEATURE_VERSION`] bump.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;

/// Version of the feature schema produced by the extractor
pub const FEATURE_VERSION: &str = "1";

macro_rules! feature_layout {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)+) => {
        /// A named column of the feature vector
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Feature {
            $($(#[$doc])* $variant,)+
        }

        impl Feature {
            /// Every feature in canonical order
            pub const ALL: [Feature; FEATURE_COUNT] = [$(Feature::$variant,)+];

            /// Schema name of this feature
            pub fn name(&self) -> &'static str {
                match self {
                    $(Feature::$variant => $name,)+
                }
            }

            /// Look up a feature by schema name
            pub fn from_name(name: &str) -> Option<Feature> {
                match name {
                    $($name => Some(Feature::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

/// Number of features in the schema
pub const FEATURE_COUNT: usize = 58;

feature_layout! {
    // engagement
    ViewsLog => "views_log",
    LikesLog => "likes_log",
    CommentsLog => "comments_log",
    SharesLog => "shares_log",
    EngagementRate => "engagement_rate",
    LikeRate => "like_rate",
    CommentRate => "comment_rate",
    ShareRate => "share_rate",
    LikeToCommentRatio => "like_to_comment_ratio",
    ShareToLikeRatio => "share_to_like_ratio",
    EngagementVelocity => "engagement_velocity",
    // creator
    FollowersLog => "followers_log",
    IsVerified => "is_verified",
    /// 0..=4 by follower count breakpoints
    FollowerBucket => "follower_bucket",
    EngagementPerFollower => "engagement_per_follower",
    FollowerViewsRatio => "follower_views_ratio",
    // video
    Duration => "duration",
    DurationLog => "duration_log",
    IsShort => "is_short",
    IsMedium => "is_medium",
    IsLong => "is_long",
    DurationBucket => "duration_bucket",
    // content
    DescLength => "desc_length",
    DescWordCount => "desc_word_count",
    DescCharDensity => "desc_char_density",
    HasEmoji => "has_emoji",
    EmojiCount => "emoji_count",
    HasCta => "has_cta",
    /// Number of distinct call-to-action phrases present
    CtaStrength => "cta_strength",
    HasQuestion => "has_question",
    QuestionCount => "question_count",
    HasNumbers => "has_numbers",
    CapitalizationRatio => "capitalization_ratio",
    PunctuationDensity => "punctuation_density",
    // hashtag
    HashtagCount => "hashtag_count",
    HasFyp => "has_fyp",
    FypCount => "fyp_count",
    HasNicheTags => "has_niche_tags",
    AvgHashtagLength => "avg_hashtag_length",
    TotalHashtagChars => "total_hashtag_chars",
    HashtagDiversity => "hashtag_diversity",
    // audio
    HasMusic => "has_music",
    IsOriginalSound => "is_original_sound",
    SoundNameLength => "sound_name_length",
    // temporal
    HourOfDay => "hour_of_day",
    /// Monday is 0
    DayOfWeek => "day_of_week",
    IsWeekend => "is_weekend",
    IsPrimeTime => "is_prime_time",
    IsMorning => "is_morning",
    IsAfternoon => "is_afternoon",
    IsEvening => "is_evening",
    IsNight => "is_night",
    DaysSinceCreation => "days_since_creation",
    // derived
    ViralScore => "viral_score",
    GrowthPotential => "growth_potential",
    AudienceResonance => "audience_resonance",
    ContentQualityProxy => "content_quality_proxy",
    /// Fixed-weight indicator sum, two of its five terms are constant 0.2
    OptimizationScore => "optimization_score",
}

impl Feature {
    /// Column index in the canonical order
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical feature names in order
pub fn feature_names() -> Vec<String> {
    Feature::ALL.iter().map(|f| f.name().to_string()).collect()
}

/// SHA-256 fingerprint of the canonical layout
pub fn layout_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| names_hash(Feature::ALL.iter().map(|f| f.name())))
}

/// SHA-256 fingerprint of an arbitrary ordered name list
pub fn names_hash<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_match_order() {
        for (i, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.index(), i);
            assert_eq!(Feature::from_name(feature.name()), Some(*feature));
        }
    }

    #[test]
    fn test_serde_names_match_schema() {
        let json = serde_json::to_string(&Feature::LikeToCommentRatio).unwrap();
        assert_eq!(json, "\"like_to_comment_ratio\"");
        assert_eq!(Feature::ALL[0].name(), "views_log");
        assert_eq!(Feature::ALL[FEATURE_COUNT - 1].name(), "optimization_score");
    }

    #[test]
    fn test_layout_hash_stable() {
        let names = feature_names();
        assert_eq!(layout_hash(), names_hash(names.iter().map(String::as_str)));
        assert_ne!(layout_hash(), names_hash(["views_log"]));
    }
}
