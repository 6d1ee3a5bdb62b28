//! Fixed-point cascade engine
//!
//! A cascade runs in breadth-first waves over a working copy of a node's
//! state:
//!
//! 1. The reserved `timestamp` attribute (and `seed` for `initialize`) is
//!    written to the working copy. These writes are not consequences.
//! 2. Wave 0 evaluates every rule that accepts the trigger, in registry order.
//! 3. Wave n evaluates the rules watching an attribute that changed in wave
//!    n - 1, again in registry order. A rule runs at most once per wave.
//! 4. All rules of a wave read the same snapshot. Their effects are applied
//!    after the wave, in emission order. Attribute writes that do not change
//!    the stored value are dropped; every other effect becomes a consequence.
//! 5. The cascade ends at the first wave that changes nothing.
//!
//! `max_depth` bounds the number of waves and `max_steps` the number of
//! consequences. Hitting either bound fails the cascade.

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::application::rule_registry::RuleRegistry;
use crate::config::KernelConfig;
use crate::domain::consequence::{Cause, Consequence, Consequences, Effect};
use crate::domain::rule::{Rule, RuleContext, Trigger};
use crate::types::{NodeState, Tick, SEED_ATTRIBUTE, TIMESTAMP_ATTRIBUTE};
use crate::CoreError;

/// Effects one rule emitted in a wave, with what activated it
type Emission<'a> = (&'a Arc<dyn Rule>, Cause, Vec<Effect>);

/// Result of a cascade that reached its fixed point
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    /// State to commit to the node
    pub state: NodeState,

    /// Consequences in production order
    pub consequences: Consequences,

    /// Number of waves evaluated
    pub waves: u32,
}

/// Evaluates rule cascades
#[derive(Debug, Clone)]
pub struct CascadeEngine {
    registry: Arc<RuleRegistry>,
    max_depth: u32,
    max_steps: usize,
}

impl CascadeEngine {
    /// Create an engine over `registry` with the limits from `config`
    pub fn new(registry: Arc<RuleRegistry>, config: &KernelConfig) -> Self {
        Self {
            registry,
            max_depth: config.max_depth,
            max_steps: config.max_steps,
        }
    }

    /// The rules this engine evaluates
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Run a cascade from `state` without touching it
    ///
    /// The returned outcome holds the new state; committing it is up to the
    /// caller, so a failed cascade never leaves partial changes behind.
    pub fn run(
        &self,
        state: &NodeState,
        trigger: &Trigger,
        timestamp: Tick,
    ) -> Result<CascadeOutcome, CoreError> {
        if timestamp < 0 {
            return Err(CoreError::InvalidTimestamp(timestamp));
        }

        let mut working = state.clone();
        working.set(TIMESTAMP_ATTRIBUTE, json!(timestamp));
        if let Trigger::Initialize { seed } = trigger {
            self.registry.check_seed(*seed)?;
            working.set(SEED_ATTRIBUTE, json!(seed));
        }

        let mut consequences: Vec<Consequence> = Vec::new();
        let mut active: Vec<(&Arc<dyn Rule>, Cause)> = self
            .registry
            .iter()
            .filter(|rule| rule.accepts(trigger))
            .map(|rule| (rule, Cause::Trigger))
            .collect();
        let mut wave: u32 = 0;

        while !active.is_empty() {
            if wave >= self.max_depth {
                return Err(CoreError::CascadeDepthExceeded(format!(
                    "no fixed point after {} waves ({} rules still active)",
                    self.max_depth,
                    active.len()
                )));
            }

            debug!(wave, rules = active.len(), "Evaluating cascade wave");

            let emitted = self.evaluate_wave(&working, trigger, timestamp, wave, &active)?;
            let changed = self.apply_wave(&mut working, &mut consequences, wave, emitted)?;

            active = self.activated_by(&changed);
            wave += 1;
        }

        debug!(
            waves = wave,
            consequences = consequences.len(),
            "Cascade reached fixed point"
        );

        Ok(CascadeOutcome {
            state: working,
            consequences: Consequences::from_vec(consequences),
            waves: wave,
        })
    }

    /// Evaluate every active rule against the same snapshot
    fn evaluate_wave<'a>(
        &self,
        snapshot: &NodeState,
        trigger: &Trigger,
        timestamp: Tick,
        wave: u32,
        active: &[(&'a Arc<dyn Rule>, Cause)],
    ) -> Result<Vec<Emission<'a>>, CoreError> {
        let ctx = RuleContext {
            state: snapshot,
            trigger,
            timestamp,
            wave,
        };

        let mut emitted = Vec::with_capacity(active.len());
        for &(rule, cause) in active {
            match rule.evaluate(&ctx) {
                Ok(Some(effects)) if !effects.is_empty() => {
                    trace!(rule = %rule.id(), effects = effects.len(), "Rule fired");
                    emitted.push((rule, cause, effects));
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(rule = %rule.id(), wave, "Rule failed: {}", e);
                    return Err(e);
                }
            }
        }

        Ok(emitted)
    }

    /// Apply a wave's effects in emission order
    ///
    /// Returns, for every attribute that changed, the index of the first
    /// consequence that changed it.
    fn apply_wave(
        &self,
        working: &mut NodeState,
        consequences: &mut Vec<Consequence>,
        wave: u32,
        emitted: Vec<Emission<'_>>,
    ) -> Result<BTreeMap<String, usize>, CoreError> {
        let mut changed = BTreeMap::new();

        for (rule, cause, effects) in emitted {
            for effect in effects {
                let index = consequences.len();

                if let Effect::SetAttribute { key, value } = &effect {
                    if !working.set(key.clone(), value.clone()) {
                        trace!(rule = %rule.id(), key = %key, "Write left value unchanged");
                        continue;
                    }
                    changed.entry(key.clone()).or_insert(index);
                }

                if index >= self.max_steps {
                    return Err(CoreError::CascadeDepthExceeded(format!(
                        "step budget of {} consequences exhausted in wave {}",
                        self.max_steps, wave
                    )));
                }

                let consequence = Consequence {
                    index,
                    wave,
                    rule: rule.id().clone(),
                    cause,
                    effect,
                };
                trace!("{}", consequence);
                consequences.push(consequence);
            }
        }

        Ok(changed)
    }

    /// Rules watching any of the changed attributes, in registry order
    fn activated_by(&self, changed: &BTreeMap<String, usize>) -> Vec<(&Arc<dyn Rule>, Cause)> {
        if changed.is_empty() {
            return Vec::new();
        }

        self.registry
            .iter()
            .filter_map(|rule| {
                rule.watches()
                    .iter()
                    .filter_map(|key| changed.get(key))
                    .min()
                    .map(|&index| (rule, Cause::Consequence(index)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{FnRule, TriggerKind};
    use serde_json::Value;

    fn engine(registry: RuleRegistry) -> CascadeEngine {
        CascadeEngine::new(Arc::new(registry), &KernelConfig::default())
    }

    fn set_rule(id: &str, key: &'static str, value: Value) -> FnRule {
        FnRule::new(id, move |_| Ok(Some(vec![Effect::set(key, value.clone())])))
            .writing([key])
    }

    fn follow_rule(id: &str, watch: &'static str, key: &'static str) -> FnRule {
        FnRule::new(id, move |ctx| {
            Ok(ctx
                .state
                .get(watch)
                .map(|value| vec![Effect::set(key, value.clone())]))
        })
        .watching([watch])
        .writing([key])
    }

    #[test]
    fn test_reserved_attributes_are_not_consequences() {
        let outcome = engine(RuleRegistry::new())
            .run(&NodeState::new(), &Trigger::Initialize { seed: 3 }, 7)
            .unwrap();

        assert!(outcome.consequences.is_empty());
        assert_eq!(outcome.waves, 0);
        assert_eq!(outcome.state.get_i64(SEED_ATTRIBUTE), Some(3));
        assert_eq!(outcome.state.get_i64(TIMESTAMP_ATTRIBUTE), Some(7));
    }

    #[test]
    fn test_wave_order_and_causes() {
        let registry = RuleRegistry::new()
            .with_rule(set_rule("r1", "x", json!(1)))
            .unwrap()
            .with_rule(follow_rule("r3", "x", "z"))
            .unwrap()
            .with_rule(follow_rule("r2", "x", "y"))
            .unwrap();

        let outcome = engine(registry)
            .run(&NodeState::new(), &Trigger::Initialize { seed: 1 }, 0)
            .unwrap();

        assert_eq!(outcome.consequences.rules(), vec!["r1", "r2", "r3"]);
        assert_eq!(outcome.consequences[0].cause, Cause::Trigger);
        assert_eq!(outcome.consequences[1].cause, Cause::Consequence(0));
        assert_eq!(outcome.consequences[2].cause, Cause::Consequence(0));
        assert_eq!(outcome.consequences[2].wave, 1);
        assert_eq!(outcome.waves, 2);
    }

    #[test]
    fn test_unchanged_write_is_dropped() {
        let registry = RuleRegistry::new()
            .with_rule(set_rule("r1", "x", json!(1)))
            .unwrap();
        let state: NodeState = vec![("x".to_string(), json!(1))].into_iter().collect();

        let outcome = engine(registry)
            .run(&state, &Trigger::Initialize { seed: 1 }, 0)
            .unwrap();

        assert!(outcome.consequences.is_empty());
        assert_eq!(outcome.waves, 1);
    }

    #[test]
    fn test_non_state_effects_are_recorded_without_new_waves() {
        let registry = RuleRegistry::new()
            .with_rule(FnRule::new("tick", |ctx| {
                Ok(Some(vec![Effect::timer(json!("poll"), ctx.timestamp + 1)]))
            }))
            .unwrap();

        let outcome = engine(registry)
            .run(&NodeState::new(), &Trigger::Initialize { seed: 1 }, 4)
            .unwrap();

        assert_eq!(outcome.consequences.len(), 1);
        assert_eq!(outcome.consequences[0].effect, Effect::timer(json!("poll"), 5));
        assert_eq!(outcome.waves, 1);
    }

    #[test]
    fn test_rules_only_join_wave_zero_for_accepted_triggers() {
        let registry = RuleRegistry::new()
            .with_rule(set_rule("on-init", "a", json!(1)))
            .unwrap()
            .with_rule(set_rule("on-timer", "b", json!(2)).on([TriggerKind::Timer]))
            .unwrap();
        let engine = engine(registry);

        let init = engine
            .run(&NodeState::new(), &Trigger::Initialize { seed: 0 }, 0)
            .unwrap();
        assert_eq!(init.consequences.rules(), vec!["on-init"]);

        let timer = engine
            .run(&init.state, &Trigger::Timer { payload: json!(null) }, 1)
            .unwrap();
        assert_eq!(timer.consequences.rules(), vec!["on-timer"]);
        assert_eq!(timer.state.get_i64(TIMESTAMP_ATTRIBUTE), Some(1));
        assert_eq!(timer.state.get_i64(SEED_ATTRIBUTE), Some(0));
    }

    #[test]
    fn test_oscillation_hits_depth_limit() {
        let registry = RuleRegistry::new()
            .with_rule(
                FnRule::new("flip", |ctx| {
                    let on = ctx.state.get("flag").and_then(Value::as_bool).unwrap_or(false);
                    Ok(Some(vec![Effect::set("flag", json!(!on))]))
                })
                .watching(["flag"]),
            )
            .unwrap();
        let config = KernelConfig {
            max_depth: 5,
            ..KernelConfig::default()
        };

        let result = CascadeEngine::new(Arc::new(registry), &config).run(
            &NodeState::new(),
            &Trigger::Initialize { seed: 1 },
            0,
        );

        match result {
            Err(CoreError::CascadeDepthExceeded(msg)) => assert!(msg.contains("5 waves")),
            other => panic!("Expected CascadeDepthExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_step_budget() {
        let registry = RuleRegistry::new()
            .with_rule(FnRule::new("burst", |_| {
                Ok(Some(
                    (0..5).map(|i| Effect::set(format!("k{}", i), json!(i))).collect(),
                ))
            }))
            .unwrap();
        let config = KernelConfig {
            max_steps: 3,
            ..KernelConfig::default()
        };

        let result = CascadeEngine::new(Arc::new(registry), &config).run(
            &NodeState::new(),
            &Trigger::Initialize { seed: 1 },
            0,
        );

        assert!(matches!(result, Err(CoreError::CascadeDepthExceeded(_))));
    }

    #[test]
    fn test_rule_error_aborts_cascade() {
        let registry = RuleRegistry::new()
            .with_rule(FnRule::new("broken", |_| {
                Err(CoreError::RuleFailed {
                    rule: "broken".to_string(),
                    message: "sensor offline".to_string(),
                })
            }))
            .unwrap();

        let result = engine(registry).run(&NodeState::new(), &Trigger::Initialize { seed: 1 }, 0);
        assert_eq!(
            result,
            Err(CoreError::RuleFailed {
                rule: "broken".to_string(),
                message: "sensor offline".to_string(),
            })
        );
    }

    #[test]
    fn test_invalid_seed_is_rejected_before_any_rule() {
        let registry = RuleRegistry::new()
            .with_seed_domain(1..=2)
            .with_rule(FnRule::new("never", |_| panic!("rule must not run")))
            .unwrap();

        let result = engine(registry).run(&NodeState::new(), &Trigger::Initialize { seed: 9 }, 0);
        assert!(matches!(result, Err(CoreError::InvalidSeed { seed: 9, .. })));
    }

    #[test]
    fn test_all_rules_of_a_wave_see_the_same_snapshot() {
        // Both rules run in wave 0; "b" must not observe the write of "a"
        let registry = RuleRegistry::new()
            .with_rule(set_rule("a", "x", json!(1)))
            .unwrap()
            .with_rule(FnRule::new("b", |ctx| {
                let seen = ctx.state.contains("x");
                Ok(Some(vec![Effect::set("b_saw_x", json!(seen))]))
            }))
            .unwrap();

        let outcome = engine(registry)
            .run(&NodeState::new(), &Trigger::Initialize { seed: 1 }, 0)
            .unwrap();

        assert_eq!(outcome.state.get("b_saw_x"), Some(&json!(false)));
    }
}
