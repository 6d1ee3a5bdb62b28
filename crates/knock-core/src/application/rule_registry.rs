use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::domain::rule::{Rule, RuleId};
use crate::CoreError;

/// Ordered collection of the rules a kernel evaluates
///
/// Rules are kept sorted by `(priority, id)`. That order is the registry
/// order used inside every cascade wave, so it is part of the determinism
/// contract of the engine.
#[derive(Clone)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
    seeds: RangeInclusive<i64>,
}

impl RuleRegistry {
    /// Create an empty registry accepting every seed
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            seeds: i64::MIN..=i64::MAX,
        }
    }

    /// Restrict the seeds `initialize` accepts
    pub fn with_seed_domain(mut self, seeds: RangeInclusive<i64>) -> Self {
        self.seeds = seeds;
        self
    }

    /// Register a rule and return the registry, for chained construction
    pub fn with_rule<R>(mut self, rule: R) -> Result<Self, CoreError>
    where
        R: Rule + 'static,
    {
        self.register(Arc::new(rule))?;
        Ok(self)
    }

    /// Register a rule
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<(), CoreError> {
        if rule.id().as_str().trim().is_empty() {
            return Err(CoreError::RuleSetError(
                "Rule identifiers cannot be empty".to_string(),
            ));
        }

        if self.get(rule.id()).is_some() {
            return Err(CoreError::RuleSetError(format!(
                "Duplicate rule id: {}",
                rule.id()
            )));
        }

        let key = (rule.priority(), rule.id().clone());
        let position = self
            .rules
            .partition_point(|existing| (existing.priority(), existing.id().clone()) < key);
        self.rules.insert(position, rule);
        Ok(())
    }

    /// Look up a rule by ID
    pub fn get(&self, id: &RuleId) -> Option<&Arc<dyn Rule>> {
        self.rules.iter().find(|rule| rule.id() == id)
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rule is registered
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate rules in registry order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.iter()
    }

    /// Rule IDs in registry order
    pub fn ids(&self) -> Vec<&RuleId> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }

    /// Seeds accepted by `initialize`
    pub fn seed_domain(&self) -> &RangeInclusive<i64> {
        &self.seeds
    }

    /// Reject seeds outside the seed domain
    pub fn check_seed(&self, seed: i64) -> Result<(), CoreError> {
        if self.seeds.contains(&seed) {
            Ok(())
        } else {
            Err(CoreError::InvalidSeed {
                seed,
                reason: format!(
                    "outside the seed domain {}..={}",
                    self.seeds.start(),
                    self.seeds.end()
                ),
            })
        }
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.ids())
            .field("seeds", &self.seeds)
            .finish()
    }
}
