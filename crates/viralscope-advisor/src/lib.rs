//! ViralScope Advisor
//!
//! Declarative suggestion rules mapping a prediction's features and
//! sub-scores to a short, prioritized list of improvement advice.
//!
//! Rule sets are defined in YAML and specify:
//! - A score gate (dimension and threshold)
//! - A feature condition (absent, present, below, above, composites)
//! - The emitted suggestion (category, priority, title, description)
//!
//! Without a rule file the built-in defaults apply.

pub mod engine;
pub mod rule;
pub mod trigger;

pub use engine::{SuggestionEngine, MAX_SUGGESTIONS};
pub use rule::{default_rules, Gate, Rule, RuleSet};
pub use trigger::Condition;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::SuggestionEngine;
    pub use crate::rule::{Gate, Rule, RuleSet};
    pub use crate::trigger::Condition;
}
