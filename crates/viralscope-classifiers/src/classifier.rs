//! Classifier trait and common types

use viralscope_core::{Error, Result, ViralClass};

/// Trait for trained viral-tier classifiers.
///
/// Implementations receive feature values already projected into the
/// column order they were trained on.
pub trait Classifier: Send + Sync {
    /// Per-class probabilities for one feature row
    fn classify(&self, features: &[f64]) -> Result<ClassProbabilities>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Per-feature importance weights, if the model exposes them
    fn feature_importance(&self) -> Option<Vec<(String, f64)>> {
        None
    }
}

/// Probability per viral class, indexed in canonical order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    values: [f64; 4],
}

impl ClassProbabilities {
    /// Build from values in canonical order (low, medium, high, ultra)
    pub fn new(values: [f64; 4]) -> Self {
        Self { values }
    }

    /// Build from `(class, probability)` pairs; absent classes get 0.0
    pub fn from_pairs(pairs: impl IntoIterator<Item = (ViralClass, f64)>) -> Self {
        let mut values = [0.0; 4];
        for (class, p) in pairs {
            values[class.index()] += p;
        }
        Self { values }
    }

    /// Build from class-name pairs as emitted by external models
    pub fn from_named<S: AsRef<str>>(pairs: &[(S, f64)]) -> Result<Self> {
        let mut values = [0.0; 4];
        for (name, p) in pairs {
            let class: ViralClass = name.as_ref().parse()?;
            values[class.index()] += p;
        }
        Ok(Self { values })
    }

    /// Probability of a class
    pub fn get(&self, class: ViralClass) -> f64 {
        self.values[class.index()]
    }

    /// Values in canonical order
    pub fn as_array(&self) -> [f64; 4] {
        self.values
    }

    /// Replace negative or non-finite entries with 0.0 and rescale to sum to 1.
    ///
    /// Fails when nothing positive remains.
    pub fn normalized(&self) -> Result<Self> {
        let mut values = self.values.map(|p| if p.is_finite() && p > 0.0 { p } else { 0.0 });
        let total: f64 = values.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(Error::classifier(format!(
                "classifier returned no usable probability mass: {:?}",
                self.values
            )));
        }
        for value in values.iter_mut() {
            *value /= total;
        }
        Ok(Self { values })
    }

    /// Most probable class; ties resolve to the earliest class in canonical order
    pub fn argmax(&self) -> ViralClass {
        let mut best = ViralClass::Low;
        for class in ViralClass::ALL {
            if self.get(class) > self.get(best) {
                best = class;
            }
        }
        best
    }

    /// Highest class probability
    pub fn max(&self) -> f64 {
        self.get(self.argmax())
    }

    /// Iterate `(class, probability)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (ViralClass, f64)> + '_ {
        ViralClass::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}
