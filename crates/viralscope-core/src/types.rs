//! Core types for ViralScope

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Raw engagement counters for a video
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementData {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

impl EngagementData {
    /// Create engagement counters
    pub fn new(views: u64, likes: u64, comments: u64, shares: u64) -> Self {
        Self {
            views,
            likes,
            comments,
            shares,
        }
    }

    /// Likes, comments and shares combined
    pub fn interactions(&self) -> u64 {
        self.likes
            .saturating_add(self.comments)
            .saturating_add(self.shares)
    }
}

/// Video metadata as supplied by callers.
///
/// Every field is optional on the wire. Missing or malformed values are
/// defaulted during feature extraction and never rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoMetadata {
    /// Caption text
    pub description: String,

    /// Hashtags in post order, duplicates allowed
    pub hashtags: Vec<String>,

    /// Duration in seconds
    pub duration: f64,

    /// Name of the sound used, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_name: Option<String>,

    /// Engagement counters
    pub engagement: EngagementData,

    /// Creator follower count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_followers: Option<u64>,

    /// Creator verified flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_verified: Option<bool>,

    /// ISO-8601 creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,

    /// Whether the sound is the creator's original audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music_original: Option<bool>,
}

impl VideoMetadata {
    /// Create metadata with a description and everything else defaulted
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Set hashtags
    pub fn with_hashtags<I, S>(mut self, hashtags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hashtags = hashtags.into_iter().map(Into::into).collect();
        self
    }

    /// Set duration in seconds
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Set engagement counters
    pub fn with_engagement(mut self, engagement: EngagementData) -> Self {
        self.engagement = engagement;
        self
    }

    /// Set the sound name
    pub fn with_sound(mut self, sound_name: impl Into<String>) -> Self {
        self.sound_name = Some(sound_name.into());
        self
    }

    /// Set creator information
    pub fn with_author(mut self, followers: u64, verified: bool) -> Self {
        self.author_followers = Some(followers);
        self.author_verified = Some(verified);
        self
    }

    /// Set the creation timestamp
    pub fn with_create_time(mut self, create_time: impl Into<String>) -> Self {
        self.create_time = Some(create_time.into());
        self
    }

    /// Set the original-sound flag
    pub fn with_music_original(mut self, original: bool) -> Self {
        self.music_original = Some(original);
        self
    }
}

/// A single scoring request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    /// Caller-assigned identifier
    pub video_id: String,

    /// Metadata to score
    #[serde(default)]
    pub metadata: VideoMetadata,
}

impl PredictionRequest {
    /// Create a new request
    pub fn new(video_id: impl Into<String>, metadata: VideoMetadata) -> Self {
        Self {
            video_id: video_id.into(),
            metadata,
        }
    }

    /// Reject requests the caller must fix before retrying
    pub fn validate(&self) -> Result<()> {
        if self.video_id.trim().is_empty() {
            return Err(Error::validation("videoId must not be empty"));
        }
        Ok(())
    }
}

/// Viral tier of a video
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ViralClass {
    Low,
    Medium,
    High,
    Ultra,
}

impl ViralClass {
    /// All classes in canonical order
    pub const ALL: [ViralClass; 4] = [Self::Low, Self::Medium, Self::High, Self::Ultra];

    /// Lowercase class name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }

    /// Position in canonical order
    pub fn index(&self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Ultra => 3,
        }
    }

    /// Inclusive score range owned by this class
    pub fn score_range(&self) -> (u8, u8) {
        match self {
            Self::Low => (0, 29),
            Self::Medium => (30, 59),
            Self::High => (60, 84),
            Self::Ultra => (85, 100),
        }
    }

    /// Half-open view-count range used to label training data
    pub fn view_range(&self) -> (u64, Option<u64>) {
        match self {
            Self::Low => (0, Some(50_000)),
            Self::Medium => (50_000, Some(500_000)),
            Self::High => (500_000, Some(2_000_000)),
            Self::Ultra => (2_000_000, None),
        }
    }

    /// Integer midpoint of the score range (floor)
    pub fn midpoint_score(&self) -> u8 {
        let (lo, hi) = self.score_range();
        ((lo as u16 + hi as u16) / 2) as u8
    }

    /// Exact midpoint of the score range, used for probability weighting
    pub fn score_center(&self) -> f64 {
        let (lo, hi) = self.score_range();
        (lo as f64 + hi as f64) / 2.0
    }

    /// Class whose score range contains `score`; values above 100 map to ultra
    pub fn from_score(score: u8) -> Self {
        Self::ALL
            .into_iter()
            .find(|class| {
                let (lo, hi) = class.score_range();
                (lo..=hi).contains(&score)
            })
            .unwrap_or(Self::Ultra)
    }

    /// Class for an observed view count
    pub fn from_views(views: u64) -> Self {
        Self::ALL
            .into_iter()
            .find(|class| match class.view_range() {
                (lo, Some(hi)) => views >= lo && views < hi,
                (lo, None) => views >= lo,
            })
            .unwrap_or(Self::Low)
    }
}

impl fmt::Display for ViralClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViralClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "ultra" => Ok(Self::Ultra),
            other => Err(Error::validation(format!("unknown viral class '{}'", other))),
        }
    }
}

/// Explanatory sub-score dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreDimension {
    Overall,
    Hook,
    Trend,
    Audio,
    Timing,
    Hashtag,
}

/// Six bounded scores for one prediction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub overall: u8,
    pub hook: u8,
    pub trend: u8,
    pub audio: u8,
    pub timing: u8,
    pub hashtag: u8,
}

impl ScoreSet {
    /// Score for a single dimension
    pub fn get(&self, dimension: ScoreDimension) -> u8 {
        match dimension {
            ScoreDimension::Overall => self.overall,
            ScoreDimension::Hook => self.hook,
            ScoreDimension::Trend => self.trend,
            ScoreDimension::Audio => self.audio,
            ScoreDimension::Timing => self.timing,
            ScoreDimension::Hashtag => self.hashtag,
        }
    }
}

/// Area a suggestion addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionCategory {
    Hook,
    Trend,
    Audio,
    Timing,
    Hashtag,
    Engagement,
}

/// Suggestion priority; ordering puts `High` first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// An improvement suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: SuggestionCategory,
    pub priority: Priority,
    pub title: String,
    pub description: String,
}
