//! Ready-made rule sets.
//!
//! Each fixture exercises one property of the cascade engine:
//!
//! * [`chain_rules`] - one rule wakes up two others (`[r1, r2, r3]`)
//! * [`counter_rules`] - a self-watching rule that converges after a bounded number of waves
//! * [`oscillating_rules`] - a self-watching rule that never converges
//! * [`sensor_rules`] - a sensor node that counts packets and answers drones

use knock_core::{
    CommunicationCommand, CoreError, Effect, FnRule, RuleRegistry, Trigger, TriggerKind,
};
use serde_json::{json, Value};

/// Three rules: `r1` sets `x`, `r2` and `r3` watch `x`.
///
/// Initializing with timestamp 0 and seed 1 yields consequences from
/// `r1`, `r2`, `r3` in that order.
pub fn chain_rules() -> Result<RuleRegistry, CoreError> {
    RuleRegistry::new()
        .with_rule(
            FnRule::new("r1", |ctx| {
                let seed = ctx.state.get_i64("seed").unwrap_or_default();
                Ok(Some(vec![Effect::set("x", json!(seed))]))
            })
            .writing(["x"]),
        )?
        .with_rule(
            FnRule::new("r2", |ctx| {
                Ok(ctx
                    .state
                    .get_i64("x")
                    .map(|x| vec![Effect::set("y", json!(x + 1))]))
            })
            .watching(["x"])
            .writing(["y"]),
        )?
        .with_rule(
            FnRule::new("r3", |ctx| {
                Ok(ctx
                    .state
                    .get_i64("x")
                    .map(|x| vec![Effect::set("z", json!(x * 10))]))
            })
            .watching(["x"])
            .writing(["z"]),
        )
}

/// `counter.start` sets `count` to 0 and `counter.step` increments it up to `limit`.
///
/// Produces `limit + 1` consequences over `limit + 2` waves.
pub fn counter_rules(limit: i64) -> Result<RuleRegistry, CoreError> {
    RuleRegistry::new()
        .with_rule(
            FnRule::new("counter.start", |_| Ok(Some(vec![Effect::set("count", json!(0))])))
                .writing(["count"]),
        )?
        .with_rule(
            FnRule::new("counter.step", move |ctx| {
                Ok(ctx
                    .state
                    .get_i64("count")
                    .filter(|count| *count < limit)
                    .map(|count| vec![Effect::set("count", json!(count + 1))]))
            })
            .with_priority(1)
            .watching(["count"])
            .writing(["count"]),
        )
}

/// A rule that flips `flag` every time `flag` changes.
pub fn oscillating_rules() -> Result<RuleRegistry, CoreError> {
    RuleRegistry::new().with_rule(
        FnRule::new("flip", |ctx| {
            let on = ctx
                .state
                .get("flag")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Ok(Some(vec![Effect::set("flag", json!(!on))]))
        })
        .watching(["flag"])
        .writing(["flag"]),
    )
}

/// A sensor that accumulates packets and hands them to visiting drones.
///
/// * `initialize`: `packets = 0` and a timer one tick later
/// * `timer`: `packets += 1` and the next timer
/// * `message` from a drone: send the packet count, then `packets = 0`
pub fn sensor_rules() -> Result<RuleRegistry, CoreError> {
    RuleRegistry::new()
        .with_seed_domain(0..=i64::MAX)
        .with_rule(
            FnRule::new("sensor.reset", |_| {
                Ok(Some(vec![Effect::set("packets", json!(0))]))
            })
            .writing(["packets"]),
        )?
        .with_rule(
            FnRule::new("sensor.schedule", |ctx| {
                Ok(Some(vec![Effect::timer(json!({}), ctx.timestamp + 1)]))
            })
            .with_priority(10)
            .on([TriggerKind::Initialize, TriggerKind::Timer]),
        )?
        .with_rule(
            FnRule::new("sensor.collect", |ctx| {
                let packets = ctx.state.get_i64("packets").unwrap_or_default();
                Ok(Some(vec![Effect::set("packets", json!(packets + 1))]))
            })
            .writing(["packets"])
            .on([TriggerKind::Timer]),
        )?
        .with_rule(
            FnRule::new("sensor.reply", |ctx| {
                let from_drone = matches!(
                    ctx.trigger,
                    Trigger::Message { payload } if payload["sender"] == "drone"
                );
                if !from_drone {
                    return Ok(None);
                }

                let packets = ctx.state.get_i64("packets").unwrap_or_default();
                Ok(Some(vec![
                    Effect::Communication(CommunicationCommand::Send {
                        message: json!({"sender": "sensor", "content": packets}),
                        destination: None,
                    }),
                    Effect::set("packets", json!(0)),
                ]))
            })
            .writing(["packets"])
            .on([TriggerKind::Message]),
        )
}
