//! Metadata to feature vector extraction
//!
//! Extraction is total: missing or malformed optional fields fall back to
//! fixed defaults and every denominator is guarded, so the result is finite
//! for any input.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
};
use tracing::debug;

use super::layout::Feature;
use super::text;
use super::vector::FeatureVector;
use crate::types::VideoMetadata;

/// Hour assumed when no usable creation time is supplied
pub const DEFAULT_HOUR: u32 = 12;

/// Weekday (Monday = 0) assumed when no usable creation time is supplied
pub const DEFAULT_WEEKDAY: u32 = 3;

const FOLLOWER_BREAKPOINTS: [u64; 4] = [1_000, 10_000, 100_000, 1_000_000];
const DURATION_BREAKPOINTS: [f64; 5] = [7.0, 15.0, 30.0, 60.0, 180.0];

/// Point in time `days_since_creation` is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTime {
    /// Wall clock at extraction
    Now,
    /// Fixed instant, for reproducible extraction
    Fixed(DateTime<Utc>),
}

/// Converts [`VideoMetadata`] into a [`FeatureVector`]
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    reference: ReferenceTime,
}

impl FeatureExtractor {
    /// Extractor measuring content age against the wall clock
    pub fn new() -> Self {
        Self {
            reference: ReferenceTime::Now,
        }
    }

    /// Extractor measuring content age against a fixed instant
    pub fn with_reference_time(reference: DateTime<Utc>) -> Self {
        Self {
            reference: ReferenceTime::Fixed(reference),
        }
    }

    /// Configured reference time
    pub fn reference(&self) -> ReferenceTime {
        self.reference
    }

    /// Extract the full feature vector
    pub fn extract(&self, metadata: &VideoMetadata) -> FeatureVector {
        let mut fv = FeatureVector::zeros();

        let duration = sanitize_duration(metadata.duration);
        let created = metadata.create_time.as_deref().and_then(parse_timestamp);

        extract_engagement(&mut fv, metadata);
        extract_creator(&mut fv, metadata);
        extract_video(&mut fv, duration);
        extract_content(&mut fv, &metadata.description);
        extract_hashtags(&mut fv, &metadata.hashtags);
        extract_audio(&mut fv, metadata);
        self.extract_temporal(&mut fv, created.as_ref());
        extract_derived(&mut fv, metadata, duration);

        fv.sanitize();
        fv
    }

    fn extract_temporal(&self, fv: &mut FeatureVector, created: Option<&DateTime<FixedOffset>>) {
        let (hour, weekday) = created
            .map(|dt| (dt.hour(), dt.weekday().num_days_from_monday()))
            .unwrap_or((DEFAULT_HOUR, DEFAULT_WEEKDAY));

        fv.set(Feature::HourOfDay, hour as f64);
        fv.set(Feature::DayOfWeek, weekday as f64);
        fv.set_flag(Feature::IsWeekend, weekday >= 5);
        fv.set_flag(Feature::IsPrimeTime, (18..=22).contains(&hour));
        fv.set_flag(Feature::IsMorning, (6..12).contains(&hour));
        fv.set_flag(Feature::IsAfternoon, (12..18).contains(&hour));
        fv.set_flag(Feature::IsEvening, (18..22).contains(&hour));
        fv.set_flag(Feature::IsNight, hour >= 22 || hour < 6);

        let days = created.map_or(0, |dt| {
            let now = match self.reference {
                ReferenceTime::Now => Utc::now(),
                ReferenceTime::Fixed(t) => t,
            };
            now.signed_duration_since(dt.with_timezone(&Utc))
                .num_days()
                .max(0)
        });
        fv.set(Feature::DaysSinceCreation, days as f64);
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn log1p10(x: f64) -> f64 {
    (x + 1.0).log10()
}

fn sanitize_duration(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

fn extract_engagement(fv: &mut FeatureVector, metadata: &VideoMetadata) {
    let e = &metadata.engagement;
    let views = e.views.max(1) as f64;
    let likes = e.likes as f64;
    let comments = e.comments as f64;
    let shares = e.shares as f64;

    let views_log = log1p10(views);
    let engagement_rate = e.interactions() as f64 / views;

    fv.set(Feature::ViewsLog, views_log);
    fv.set(Feature::LikesLog, log1p10(likes));
    fv.set(Feature::CommentsLog, log1p10(comments));
    fv.set(Feature::SharesLog, log1p10(shares));
    fv.set(Feature::EngagementRate, engagement_rate);
    fv.set(Feature::LikeRate, likes / views);
    fv.set(Feature::CommentRate, comments / views);
    fv.set(Feature::ShareRate, shares / views);
    fv.set(Feature::LikeToCommentRatio, likes / (comments + 1.0));
    fv.set(Feature::ShareToLikeRatio, shares / (likes + 1.0));
    fv.set(Feature::EngagementVelocity, views_log * engagement_rate);
}

fn follower_bucket(followers: u64) -> usize {
    FOLLOWER_BREAKPOINTS
        .iter()
        .position(|limit| followers < *limit)
        .unwrap_or(FOLLOWER_BREAKPOINTS.len())
}

fn extract_creator(fv: &mut FeatureVector, metadata: &VideoMetadata) {
    let followers = metadata.author_followers.unwrap_or(0);
    let followers_log = log1p10(followers as f64);

    fv.set(Feature::FollowersLog, followers_log);
    fv.set_flag(Feature::IsVerified, metadata.author_verified.unwrap_or(false));
    fv.set(Feature::FollowerBucket, follower_bucket(followers) as f64);
    fv.set(
        Feature::EngagementPerFollower,
        fv.get(Feature::EngagementRate) / (followers_log + 1.0),
    );
    fv.set(
        Feature::FollowerViewsRatio,
        fv.get(Feature::ViewsLog) / (followers_log + 1.0),
    );
}

fn duration_bucket(duration: f64) -> usize {
    DURATION_BREAKPOINTS
        .iter()
        .position(|limit| duration <= *limit)
        .unwrap_or(DURATION_BREAKPOINTS.len())
}

fn extract_video(fv: &mut FeatureVector, duration: f64) {
    fv.set(Feature::Duration, duration);
    fv.set(Feature::DurationLog, log1p10(duration));
    fv.set_flag(Feature::IsShort, duration <= 15.0);
    fv.set_flag(Feature::IsMedium, duration > 15.0 && duration <= 60.0);
    fv.set_flag(Feature::IsLong, duration > 60.0);
    fv.set(Feature::DurationBucket, duration_bucket(duration) as f64);
}

fn extract_content(fv: &mut FeatureVector, description: &str) {
    let length = description.chars().count() as f64;
    let words = description.split_whitespace().count() as f64;
    let emojis = text::emoji_count(description);
    let ctas = text::cta_strength(description);
    let questions = description.matches('?').count();

    fv.set(Feature::DescLength, length);
    fv.set(Feature::DescWordCount, words);
    fv.set(Feature::DescCharDensity, words / (length + 1.0));
    fv.set_flag(Feature::HasEmoji, emojis > 0);
    fv.set(Feature::EmojiCount, emojis as f64);
    fv.set_flag(Feature::HasCta, ctas > 0);
    fv.set(Feature::CtaStrength, ctas as f64);
    fv.set_flag(Feature::HasQuestion, questions > 0);
    fv.set(Feature::QuestionCount, questions as f64);
    fv.set_flag(Feature::HasNumbers, description.chars().any(|c| c.is_ascii_digit()));
    fv.set(Feature::CapitalizationRatio, text::capitalization_ratio(description));
    fv.set(Feature::PunctuationDensity, text::punctuation_density(description));
}

fn extract_hashtags(fv: &mut FeatureVector, hashtags: &[String]) {
    let count = hashtags.len();
    let discovery = hashtags.iter().filter(|t| text::is_discovery_tag(t)).count();
    let total_chars: usize = hashtags.iter().map(|t| t.chars().count()).sum();
    let avg_len = if count == 0 {
        0.0
    } else {
        total_chars as f64 / count as f64
    };

    fv.set(Feature::HashtagCount, count as f64);
    fv.set_flag(Feature::HasFyp, discovery > 0);
    fv.set(Feature::FypCount, discovery as f64);
    fv.set_flag(Feature::HasNicheTags, count > discovery);
    fv.set(Feature::AvgHashtagLength, avg_len);
    fv.set(Feature::TotalHashtagChars, total_chars as f64);
    fv.set(Feature::HashtagDiversity, text::hashtag_diversity(hashtags));
}

fn extract_audio(fv: &mut FeatureVector, metadata: &VideoMetadata) {
    let sound = metadata.sound_name.as_deref().unwrap_or("");

    fv.set_flag(Feature::HasMusic, !sound.trim().is_empty());
    fv.set_flag(Feature::IsOriginalSound, metadata.music_original.unwrap_or(false));
    fv.set(Feature::SoundNameLength, sound.chars().count() as f64);
}

fn extract_derived(fv: &mut FeatureVector, metadata: &VideoMetadata, duration: f64) {
    let e = &metadata.engagement;
    let views = e.views.max(1) as f64;
    let views_log = fv.get(Feature::ViewsLog);
    let engagement_rate = fv.get(Feature::EngagementRate);

    fv.set(Feature::ViralScore, views_log * engagement_rate * 10.0);
    fv.set(
        Feature::GrowthPotential,
        engagement_rate / (fv.get(Feature::FollowersLog) + 1.0) * views_log,
    );
    fv.set(
        Feature::AudienceResonance,
        (e.likes as f64 + 2.0 * e.shares as f64) / views,
    );
    fv.set(
        Feature::ContentQualityProxy,
        e.comments as f64 / e.likes.max(1) as f64,
    );

    // The last two 0.2 terms are constant placeholders, not feature-driven.
    let indicators = [
        fv.flag(Feature::HasMusic),
        fv.get(Feature::HashtagCount) > 0.0,
        duration <= 30.0,
    ];
    let optimization = indicators.iter().filter(|on| **on).count() as f64 * 0.2 + 0.2 + 0.2;
    fv.set(Feature::OptimizationScore, optimization);
}

/// Parse a creation timestamp, keeping its UTC offset.
///
/// Accepts ISO-8601 date-times with or without an offset (`+05:00` or
/// `+0500`), at minute or second precision, date-only values in extended
/// or basic form (midnight UTC), and otherwise all-digit Unix seconds.
/// Values without an offset are read as UTC. Anything else yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = parse_date_time(raw).or_else(|| parse_date(raw)).or_else(|| {
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let secs: i64 = raw.parse().ok()?;
        Utc.timestamp_opt(secs, 0).single().map(|dt| dt.fixed_offset())
    });

    if parsed.is_none() {
        debug!("Ignoring unparseable creation time: {}", raw);
    }
    parsed
}

fn parse_date_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    const OFFSET_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M%z",
        "%Y-%m-%d %H:%M%z",
    ];
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

/// `YYYY-MM-DD` or basic `YYYYMMDD`; an 8-digit string that is a valid
/// calendar date is a date, not Unix seconds
fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let date = match raw.len() {
        10 => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?,
        8 if raw.bytes().all(|b| b.is_ascii_digit()) => {
            NaiveDate::parse_from_str(raw, "%Y%m%d").ok()?
        }
        _ => return None,
    };
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset())
}
