//! Builders for ad-hoc rule sets.

use knock_core::{CoreError, Effect, FnRule, RuleRegistry, TriggerKind};
use serde_json::Value;
use std::ops::RangeInclusive;

/// Builder for small rule sets declared inline in tests.
///
/// ```
/// use knock_test_utils::RuleSetBuilder;
/// use serde_json::json;
///
/// let registry = RuleSetBuilder::new()
///     .set_on_init("a", "x", json!(1))
///     .copy("b", "x", "y")
///     .build()
///     .unwrap();
/// assert_eq!(registry.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: Vec<FnRule>,
    seeds: Option<RangeInclusive<i64>>,
}

impl RuleSetBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule that writes a constant when the node is initialized.
    pub fn set_on_init(self, id: &str, key: &str, value: Value) -> Self {
        self.set_on(id, TriggerKind::Initialize, key, value)
    }

    /// Adds a rule that writes a constant in the first wave of `trigger`.
    pub fn set_on(mut self, id: &str, trigger: TriggerKind, key: &str, value: Value) -> Self {
        let target = key.to_string();
        self.rules.push(
            FnRule::new(id, move |_| Ok(Some(vec![Effect::set(target.clone(), value.clone())])))
                .writing([key])
                .on([trigger]),
        );
        self
    }

    /// Adds a rule that copies `from` into `to` whenever `from` changes.
    pub fn copy(mut self, id: &str, from: &str, to: &str) -> Self {
        let source = from.to_string();
        let target = to.to_string();
        self.rules.push(
            FnRule::new(id, move |ctx| {
                Ok(ctx
                    .state
                    .get(&source)
                    .map(|value| vec![Effect::set(target.clone(), value.clone())]))
            })
            .watching([from])
            .writing([to]),
        );
        self
    }

    /// Adds an arbitrary rule.
    pub fn rule(mut self, rule: FnRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Restricts the accepted seeds.
    pub fn seeds(mut self, seeds: RangeInclusive<i64>) -> Self {
        self.seeds = Some(seeds);
        self
    }

    /// Builds the registry.
    pub fn build(self) -> Result<RuleRegistry, CoreError> {
        let mut registry = RuleRegistry::new();
        if let Some(seeds) = self.seeds {
            registry = registry.with_seed_domain(seeds);
        }

        for rule in self.rules {
            registry = registry.with_rule(rule)?;
        }

        Ok(registry)
    }
}
