//! Turns validated documents into kernel rules.

use knock_core::{
    CommunicationCommand, CoreError, Effect, Rule, RuleContext, RuleId, RuleRegistry, Trigger,
    TriggerKind,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::document::{
    ConditionDefinition, EffectDefinition, RuleDefinition, RuleDocument, ValueSource,
};

/// A rule built from a [`RuleDefinition`]
#[derive(Debug, Clone)]
pub struct DeclarativeRule {
    id: RuleId,
    priority: i32,
    triggers: Vec<TriggerKind>,
    watches: Vec<String>,
    writes: Vec<String>,
    conditions: Vec<ConditionDefinition>,
    effects: Vec<EffectDefinition>,
}

impl DeclarativeRule {
    /// Build a rule from its definition
    pub fn from_definition(definition: &RuleDefinition) -> Self {
        Self {
            id: RuleId::from(definition.id.as_str()),
            priority: definition.priority,
            triggers: definition.on.clone(),
            watches: definition.watch.clone(),
            writes: definition.writes(),
            conditions: definition.when.clone(),
            effects: definition.then.clone(),
        }
    }

    fn failure(&self, message: String) -> CoreError {
        CoreError::RuleFailed {
            rule: self.id.to_string(),
            message,
        }
    }

    fn resolve(&self, source: &ValueSource, ctx: &RuleContext<'_>) -> Result<Value, CoreError> {
        source.resolve(ctx).ok_or_else(|| match source {
            ValueSource::Ref(reference) => {
                self.failure(format!("'{}' is not set", reference.from))
            }
            _ => self.failure("a referenced value is not set".to_string()),
        })
    }

    fn build_effect(
        &self,
        definition: &EffectDefinition,
        ctx: &RuleContext<'_>,
    ) -> Result<Effect, CoreError> {
        let effect = match definition {
            EffectDefinition::Set { attr, value } => {
                Effect::set(attr.clone(), self.resolve(value, ctx)?)
            }
            EffectDefinition::Increment { attr, by } => {
                let current = match ctx.state.get(attr) {
                    None => 0,
                    Some(value) => value.as_i64().ok_or_else(|| {
                        self.failure(format!("cannot increment '{}', it holds {}", attr, value))
                    })?,
                };
                let next = current
                    .checked_add(*by)
                    .ok_or_else(|| self.failure(format!("'{}' overflowed", attr)))?;
                Effect::set(attr.clone(), json!(next))
            }
            EffectDefinition::Timer { after, payload } => {
                let at = ctx
                    .timestamp
                    .checked_add(*after)
                    .ok_or_else(|| self.failure(format!("timer delay {} overflowed", after)))?;
                Effect::timer(self.resolve(payload, ctx)?, at)
            }
            EffectDefinition::Send {
                message,
                destination,
            } => Effect::Communication(CommunicationCommand::Send {
                message: self.resolve(message, ctx)?,
                destination: destination.clone(),
            }),
            EffectDefinition::Broadcast { message } => {
                Effect::Communication(CommunicationCommand::Broadcast {
                    message: self.resolve(message, ctx)?,
                })
            }
            EffectDefinition::Mobility(command) => Effect::Mobility(command.clone()),
        };
        Ok(effect)
    }
}

impl Rule for DeclarativeRule {
    fn id(&self) -> &RuleId {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn watches(&self) -> &[String] {
        &self.watches
    }

    fn writes(&self) -> &[String] {
        &self.writes
    }

    fn accepts(&self, trigger: &Trigger) -> bool {
        self.triggers.contains(&trigger.kind())
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Option<Vec<Effect>>, CoreError> {
        if !self.conditions.iter().all(|condition| condition.holds(ctx)) {
            return Ok(None);
        }

        let effects = self
            .effects
            .iter()
            .map(|definition| self.build_effect(definition, ctx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(effects))
    }
}

/// Compile a document into a rule registry
///
/// The document is expected to have been validated; the registry still
/// rejects duplicate and empty ids on its own.
pub fn compile(document: &RuleDocument) -> Result<RuleRegistry, CoreError> {
    let mut registry =
        RuleRegistry::new().with_seed_domain(document.seeds.min..=document.seeds.max);

    for definition in &document.rules {
        registry.register(Arc::new(DeclarativeRule::from_definition(definition)))?;
    }

    tracing::debug!(rules = registry.len(), "Compiled rule document");
    Ok(registry)
}
