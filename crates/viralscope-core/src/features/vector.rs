//! Ordered feature vector and schema alignment

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::layout::{Feature, FEATURE_COUNT};

/// Extracted feature values in canonical order.
///
/// Values are always finite: `set` replaces NaN and infinities with 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// All-zero vector
    pub fn zeros() -> Self {
        Self {
            values: [0.0; FEATURE_COUNT],
        }
    }

    /// Value of a single feature
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// Set a feature, substituting 0.0 for non-finite values
    pub fn set(&mut self, feature: Feature, value: f64) {
        self.values[feature.index()] = finite_or_zero(value);
    }

    /// Set a 0/1 indicator feature
    pub fn set_flag(&mut self, feature: Feature, flag: bool) {
        self.set(feature, if flag { 1.0 } else { 0.0 });
    }

    /// Whether an indicator feature is set
    pub fn flag(&self, feature: Feature) -> bool {
        self.get(feature) != 0.0
    }

    /// Values in canonical order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Iterate `(feature, value)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |f| (*f, self.values[f.index()]))
    }

    /// Replace any non-finite value with 0.0
    pub fn sanitize(&mut self) {
        for value in self.values.iter_mut() {
            *value = finite_or_zero(*value);
        }
    }

    /// Whether every value is finite
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Bit-exact encoding, used to compare extraction runs
    pub fn to_bits(&self) -> Vec<u64> {
        self.values.iter().map(|v| v.to_bits()).collect()
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeros()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (feature, value) in self.iter() {
            map.serialize_entry(feature.name(), &value)?;
        }
        map.end()
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Mapping from a classifier's expected column names onto the extracted layout.
///
/// Built once per loaded model. Expected names the extractor does not
/// produce are padded with 0.0; extracted features the model does not
/// expect are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaAlignment {
    columns: Vec<Option<Feature>>,
    unknown: Vec<String>,
    unused: Vec<Feature>,
}

impl SchemaAlignment {
    /// Build an alignment for the given expected column order
    pub fn new<S: AsRef<str>>(expected: &[S]) -> Self {
        let columns: Vec<Option<Feature>> = expected
            .iter()
            .map(|name| Feature::from_name(name.as_ref()))
            .collect();

        let unknown = expected
            .iter()
            .zip(&columns)
            .filter(|(_, column)| column.is_none())
            .map(|(name, _)| name.as_ref().to_string())
            .collect();

        let unused = Feature::ALL
            .iter()
            .copied()
            .filter(|f| !columns.contains(&Some(*f)))
            .collect();

        Self {
            columns,
            unknown,
            unused,
        }
    }

    /// Identity alignment over the canonical layout
    pub fn canonical() -> Self {
        Self::new(&Feature::ALL.map(|f| f.name()))
    }

    /// Number of columns the classifier expects
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Expected names the extractor does not produce
    pub fn unknown_names(&self) -> &[String] {
        &self.unknown
    }

    /// Extracted features the classifier ignores
    pub fn unused_features(&self) -> &[Feature] {
        &self.unused
    }

    /// Whether the expected order is exactly the canonical layout
    pub fn is_canonical(&self) -> bool {
        self.columns.len() == FEATURE_COUNT
            && self
                .columns
                .iter()
                .zip(Feature::ALL.iter())
                .all(|(column, feature)| *column == Some(*feature))
    }

    /// Project a vector into the expected column order
    pub fn apply(&self, vector: &FeatureVector) -> Vec<f64> {
        self.columns
            .iter()
            .map(|column| column.map_or(0.0, |f| vector.get(f)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_sanitizes() {
        let mut vector = FeatureVector::zeros();
        vector.set(Feature::ViewsLog, f64::NAN);
        vector.set(Feature::LikesLog, f64::INFINITY);
        vector.set(Feature::SharesLog, 2.5);

        assert_eq!(vector.get(Feature::ViewsLog), 0.0);
        assert_eq!(vector.get(Feature::LikesLog), 0.0);
        assert_eq!(vector.get(Feature::SharesLog), 2.5);
        assert!(vector.is_finite());
    }

    #[test]
    fn test_alignment_pads_and_ignores() {
        let mut vector = FeatureVector::zeros();
        vector.set(Feature::HashtagCount, 3.0);
        vector.set(Feature::ViewsLog, 5.0);

        let alignment = SchemaAlignment::new(&["hashtag_count", "brand_new_signal", "views_log"]);
        assert_eq!(alignment.apply(&vector), vec![3.0, 0.0, 5.0]);
        assert_eq!(alignment.unknown_names(), ["brand_new_signal".to_string()]);
        assert_eq!(alignment.unused_features().len(), FEATURE_COUNT - 2);
        assert!(!alignment.is_canonical());
    }

    #[test]
    fn test_canonical_alignment() {
        let alignment = SchemaAlignment::canonical();
        assert!(alignment.is_canonical());
        assert!(alignment.unknown_names().is_empty());

        let mut vector = FeatureVector::zeros();
        vector.set(Feature::OptimizationScore, 0.8);
        assert_eq!(alignment.apply(&vector), vector.as_slice());
    }

    #[test]
    fn test_serializes_as_named_map() {
        let mut vector = FeatureVector::zeros();
        vector.set_flag(Feature::HasFyp, true);

        let json = serde_json::to_value(&vector).unwrap();
        assert_eq!(json["has_fyp"], 1.0);
        assert_eq!(json.as_object().unwrap().len(), FEATURE_COUNT);
    }
}
