use knock_core::{
    Cause, CoreError, Effect, ExecutionContext, FnRule, Kernel, KernelConfig, NodeStatus,
    RuleRegistry, TriggerKind,
};
use knock_test_utils::assertions::{assert_rule_order, assert_state_value, assert_well_formed};
use knock_test_utils::util::init_test_tracing;
use knock_test_utils::{chain_rules, counter_rules, oscillating_rules, sensor_rules, RuleSetBuilder};
use pretty_assertions::assert_eq;
use serde_json::json;

fn kernel(registry: RuleRegistry) -> Kernel {
    init_test_tracing();
    Kernel::new(registry, KernelConfig::default()).unwrap()
}

#[test]
fn test_chain_ordering_at_timestamp_zero_seed_one() {
    let kernel = kernel(chain_rules().unwrap());

    // Create a node and anchor it at t=0
    let node = kernel.create_node().unwrap();
    node.set_timestamp(0).unwrap();

    // Initialize with seed 1
    let consequences = node.initialize(1).unwrap();

    assert_rule_order(&consequences, &["r1", "r2", "r3"]).unwrap();
    assert_well_formed(&consequences).unwrap();
    assert_eq!(consequences[0].cause, Cause::Trigger);
    assert_eq!(consequences[1].cause, Cause::Consequence(0));
    assert_eq!(consequences[2].cause, Cause::Consequence(0));
    assert_eq!(
        consequences.iter().map(|c| c.wave).collect::<Vec<_>>(),
        vec![0, 1, 1]
    );
    assert_eq!(
        consequences.iter().map(|c| c.target()).collect::<Vec<_>>(),
        vec!["x", "y", "z"]
    );
}

#[test]
fn test_determinism_across_fresh_nodes() {
    let kernel = kernel(sensor_rules().unwrap());

    let first = kernel.create_node().unwrap();
    let second = kernel.create_node().unwrap();
    first.set_timestamp(5).unwrap();
    second.set_timestamp(5).unwrap();

    let a = first.initialize(3).unwrap();
    let b = second.initialize(3).unwrap();

    assert_eq!(a, b);
    assert_eq!(first.state().unwrap(), second.state().unwrap());
}

#[test]
fn test_determinism_across_kernels() {
    let a = kernel(chain_rules().unwrap());
    let b = kernel(chain_rules().unwrap());

    let run = |kernel: &Kernel| {
        let node = kernel.create_node().unwrap();
        node.set_timestamp(9).unwrap();
        node.initialize(4).unwrap()
    };

    assert_eq!(run(&a), run(&b));
}

#[test]
fn test_fixed_point_is_reached() {
    let kernel = kernel(chain_rules().unwrap());
    let node = kernel.create_node().unwrap();
    node.set_timestamp(0).unwrap();
    node.initialize(1).unwrap();

    // Running the same rules over the committed state changes nothing
    let state = node.state().unwrap();
    let engine = knock_core::CascadeEngine::new(
        std::sync::Arc::new(chain_rules().unwrap()),
        &KernelConfig::default(),
    );
    let rerun = engine
        .run(&state, &knock_core::Trigger::Initialize { seed: 1 }, 0)
        .unwrap();

    assert!(rerun.consequences.is_empty());
    assert_eq!(rerun.state, state);
}

#[test]
fn test_counter_converges_without_false_cycle() {
    let kernel = kernel(counter_rules(10).unwrap());
    let node = kernel.create_node().unwrap();
    node.set_timestamp(0).unwrap();

    let consequences = node.initialize(1).unwrap();

    assert_eq!(consequences.len(), 11);
    assert_well_formed(&consequences).unwrap();
    assert_state_value(&node.state().unwrap(), "count", json!(10)).unwrap();

    // Every increment is caused by the previous one
    for (i, consequence) in consequences.iter().enumerate().skip(1) {
        assert_eq!(consequence.cause, Cause::Consequence(i - 1));
        assert_eq!(consequence.wave as usize, i);
    }
}

#[test]
fn test_depth_exceeded_leaves_node_untouched() {
    let config = KernelConfig {
        max_depth: 16,
        ..KernelConfig::default()
    };
    let kernel = Kernel::new(oscillating_rules().unwrap(), config).unwrap();
    let node = kernel.create_node().unwrap();
    node.set_timestamp(0).unwrap();

    let result = node.initialize(1);

    assert!(matches!(result, Err(CoreError::CascadeDepthExceeded(_))));
    assert_eq!(node.status().unwrap(), NodeStatus::TimestampSet);
    assert!(node.state().unwrap().is_empty());
}

#[test]
fn test_long_chain_beyond_depth_limit() {
    let config = KernelConfig {
        max_depth: 4,
        ..KernelConfig::default()
    };
    let kernel = Kernel::new(counter_rules(10).unwrap(), config).unwrap();
    let node = kernel.create_node().unwrap();
    node.set_timestamp(0).unwrap();

    match node.initialize(1) {
        Err(CoreError::CascadeDepthExceeded(msg)) => assert!(msg.contains("4 waves")),
        other => panic!("Expected CascadeDepthExceeded, got {:?}", other),
    }
}

#[test]
fn test_rule_failure_is_atomic() {
    let registry = RuleSetBuilder::new()
        .set_on_init("a", "x", json!(1))
        .rule(
            FnRule::new("b", |ctx| {
                if ctx.state.contains("x") {
                    Err(CoreError::RuleFailed {
                        rule: "b".to_string(),
                        message: "x is not allowed".to_string(),
                    })
                } else {
                    Ok(None)
                }
            })
            .watching(["x"]),
        )
        .build()
        .unwrap();
    let kernel = kernel(registry);
    let node = kernel.create_node().unwrap();
    node.set_timestamp(0).unwrap();

    let result = node.initialize(1);

    assert!(matches!(result, Err(CoreError::RuleFailed { .. })));
    assert!(node.state().unwrap().is_empty());
    assert_eq!(node.status().unwrap(), NodeStatus::TimestampSet);
}

#[test]
fn test_state_isolation_between_nodes() {
    let kernel = kernel(sensor_rules().unwrap());

    let a = kernel.create_node().unwrap();
    let b = kernel.create_node().unwrap();
    a.set_timestamp(0).unwrap();
    b.set_timestamp(0).unwrap();
    a.initialize(1).unwrap();

    // Only node a was initialized
    assert_eq!(a.state().unwrap().get_i64("packets"), Some(0));
    assert!(b.state().unwrap().is_empty());
    assert_eq!(b.status().unwrap(), NodeStatus::TimestampSet);

    a.handle_timer(json!({})).unwrap();
    b.initialize(1).unwrap();
    assert_eq!(a.state().unwrap().get_i64("packets"), Some(1));
    assert_eq!(b.state().unwrap().get_i64("packets"), Some(0));
}

#[test]
fn test_timestamp_gating() {
    let kernel = kernel(chain_rules().unwrap());
    let node = kernel.create_node().unwrap();

    let result = node.initialize(1);

    assert_eq!(result, Err(CoreError::UninitializedTimestamp(node.id().clone())));
    assert_eq!(node.timestamp().unwrap(), None);
}

#[test]
fn test_negative_timestamp() {
    let kernel = kernel(chain_rules().unwrap());
    let node = kernel.create_node().unwrap();

    assert_eq!(node.set_timestamp(-5), Err(CoreError::InvalidTimestamp(-5)));
    assert_eq!(node.status().unwrap(), NodeStatus::Created);
}

#[test]
fn test_timestamp_is_reassignable_and_used_by_rules() {
    let kernel = kernel(sensor_rules().unwrap());
    let node = kernel.create_node().unwrap();
    node.set_timestamp(3).unwrap();
    node.set_timestamp(7).unwrap();

    let consequences = node.initialize(0).unwrap();

    assert_eq!(consequences[1].effect, Effect::timer(json!({}), 8));
    assert_eq!(node.timestamp().unwrap(), Some(7));
}

#[test]
fn test_reinitialization_is_rejected() {
    let kernel = kernel(chain_rules().unwrap());
    let node = kernel.create_node().unwrap();
    node.set_timestamp(0).unwrap();
    node.initialize(1).unwrap();
    let before = node.state().unwrap();

    let result = node.initialize(2);

    assert_eq!(result, Err(CoreError::AlreadyInitialized(node.id().clone())));
    assert_eq!(node.state().unwrap(), before);
}

#[test]
fn test_invalid_seed() {
    let kernel = kernel(sensor_rules().unwrap());
    let node = kernel.create_node().unwrap();
    node.set_timestamp(0).unwrap();

    match node.initialize(-1) {
        Err(CoreError::InvalidSeed { seed, .. }) => assert_eq!(seed, -1),
        other => panic!("Expected InvalidSeed, got {:?}", other),
    }
    assert_eq!(node.status().unwrap(), NodeStatus::TimestampSet);
}

#[test]
fn test_resource_exhausted() {
    let config = KernelConfig {
        max_nodes: Some(2),
        ..KernelConfig::default()
    };
    let kernel = Kernel::new(chain_rules().unwrap(), config).unwrap();

    let first = kernel.create_node().unwrap().id().clone();
    kernel.create_node().unwrap();

    assert!(matches!(
        kernel.create_node(),
        Err(CoreError::ResourceExhausted(_))
    ));

    kernel.remove_node(&first).unwrap();
    assert!(kernel.create_node().is_ok());
}

#[test]
fn test_sensor_lifecycle() {
    let kernel = kernel(sensor_rules().unwrap());
    let node = kernel.create_node().unwrap();
    node.set_timestamp(0).unwrap();
    node.initialize(1).unwrap();

    // Two timers accumulate two packets
    node.set_timestamp(1).unwrap();
    node.handle_timer(json!({})).unwrap();
    node.set_timestamp(2).unwrap();
    let consequences = node.handle_timer(json!({})).unwrap();
    assert_rule_order(&consequences, &["sensor.collect", "sensor.schedule"]).unwrap();
    assert_eq!(consequences[1].effect, Effect::timer(json!({}), 3));

    // Messages from other sensors are ignored
    let ignored = node.handle_message(json!({"sender": "sensor"})).unwrap();
    assert!(ignored.is_empty());

    // A drone collects the packets
    let reply = node.handle_message(json!({"sender": "drone"})).unwrap();
    assert_eq!(reply.len(), 2);
    assert_eq!(reply[0].target(), "communication");
    assert_eq!(
        reply[0].to_string(),
        r#"#0 [COMMUNICATION] sensor.reply: send {"content":2,"sender":"sensor"}"#
    );
    assert_state_value(&node.state().unwrap(), "packets", json!(0)).unwrap();

    node.finish().unwrap();
    assert_eq!(node.status().unwrap(), NodeStatus::Finished);
}

#[test]
fn test_trigger_specific_rules_join_later_waves() {
    // "audit" only starts on timers but still wakes up when "x" changes
    let registry = RuleSetBuilder::new()
        .set_on_init("a", "x", json!(1))
        .rule(
            FnRule::new("audit", |ctx| {
                Ok(ctx
                    .state
                    .get("x")
                    .map(|x| vec![Effect::set("audited", x.clone())]))
            })
            .watching(["x"])
            .on([TriggerKind::Timer]),
        )
        .build()
        .unwrap();
    let kernel = kernel(registry);
    let node = kernel.create_node().unwrap();
    node.set_timestamp(0).unwrap();

    let consequences = node.initialize(1).unwrap();
    assert_rule_order(&consequences, &["a", "audit"]).unwrap();
}

#[test]
fn test_execution_context_scope() {
    let context = ExecutionContext::enter(chain_rules().unwrap(), KernelConfig::default()).unwrap();
    let shared = context.shared_kernel();

    {
        let node = context.kernel().create_node().unwrap();
        node.set_timestamp(0).unwrap();
        assert_eq!(node.initialize(1).unwrap().len(), 3);
    }
    assert_eq!(shared.node_count(), 1);

    drop(context);
    assert_eq!(shared.node_count(), 0);
}
