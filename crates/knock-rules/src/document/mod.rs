//! Rule-set document model.

mod condition;
mod effect;
mod value;

pub use condition::{ConditionDefinition, ConditionOp};
pub use effect::EffectDefinition;
pub use value::{AttributeRef, ObjectTemplate, ValueSource};

use knock_core::TriggerKind;
use serde::{Deserialize, Serialize};

/// A complete rule-set document.
/// This is the top-level structure of a rules file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDocument {
    /// The document format version (e.g., "1.0")
    pub version: String,

    /// Seeds accepted by `initialize`
    #[serde(default)]
    pub seeds: SeedDomain,

    /// Accept rule sets where a rule re-activates itself or its writers
    #[serde(default)]
    pub allow_cycles: bool,

    /// Rule definitions
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// Inclusive seed range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedDomain {
    /// Lowest accepted seed
    #[serde(default = "SeedDomain::default_min")]
    pub min: i64,

    /// Highest accepted seed
    #[serde(default = "SeedDomain::default_max")]
    pub max: i64,
}

impl SeedDomain {
    fn default_min() -> i64 {
        i64::MIN
    }

    fn default_max() -> i64 {
        i64::MAX
    }
}

impl Default for SeedDomain {
    fn default() -> Self {
        Self {
            min: Self::default_min(),
            max: Self::default_max(),
        }
    }
}

/// A single declarative rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique identifier of the rule
    pub id: String,

    /// Optional human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Ordering key inside a wave, lower runs first
    #[serde(default)]
    pub priority: i32,

    /// Triggers that evaluate the rule in the first wave
    #[serde(default = "RuleDefinition::default_triggers")]
    pub on: Vec<TriggerKind>,

    /// Attributes whose changes re-activate the rule
    #[serde(default)]
    pub watch: Vec<String>,

    /// Conditions that must all hold for the rule to fire
    #[serde(default)]
    pub when: Vec<ConditionDefinition>,

    /// Effects produced when the rule fires
    #[serde(default)]
    pub then: Vec<EffectDefinition>,
}

impl RuleDefinition {
    fn default_triggers() -> Vec<TriggerKind> {
        vec![TriggerKind::Initialize]
    }

    /// Attributes written by the rule's `set` and `increment` effects
    pub fn writes(&self) -> Vec<String> {
        let mut writes: Vec<String> = self
            .then
            .iter()
            .filter_map(EffectDefinition::written_attribute)
            .map(str::to_string)
            .collect();
        writes.sort();
        writes.dedup();
        writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let yaml = r#"
        version: "1.0"
        rules:
          - id: only
        "#;

        let doc: RuleDocument = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(doc.seeds, SeedDomain::default());
        assert!(!doc.allow_cycles);

        let rule = &doc.rules[0];
        assert_eq!(rule.priority, 0);
        assert_eq!(rule.on, vec![TriggerKind::Initialize]);
        assert!(rule.watch.is_empty());
        assert!(rule.when.is_empty());
        assert!(rule.then.is_empty());
    }

    #[test]
    fn test_trigger_names() {
        let yaml = r#"
        version: "1.0"
        rules:
          - id: all
            on: [initialize, timer, message, telemetry, finish]
        "#;

        let doc: RuleDocument = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            doc.rules[0].on,
            vec![
                TriggerKind::Initialize,
                TriggerKind::Timer,
                TriggerKind::Message,
                TriggerKind::Telemetry,
                TriggerKind::Finish,
            ]
        );
    }

    #[test]
    fn test_writes_are_sorted_and_unique() {
        let yaml = r#"
        id: writer
        then:
          - { effect: set, attr: b, value: 1 }
          - { effect: increment, attr: a }
          - { effect: set, attr: b, value: 2 }
          - { effect: broadcast, message: hello }
        "#;

        let rule: RuleDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.writes(), vec!["a".to_string(), "b".to_string()]);
    }
}
