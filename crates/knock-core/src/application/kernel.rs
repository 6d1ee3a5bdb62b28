use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::cascade_engine::CascadeEngine;
use crate::application::node_store::NodeStore;
use crate::application::rule_registry::RuleRegistry;
use crate::config::KernelConfig;
use crate::domain::consequence::Consequences;
use crate::domain::events::{NodeEventHandler, TracingEventHandler};
use crate::domain::node::{NodeId, NodeStatus};
use crate::domain::repository::{memory::MemoryNodeRepository, NodeRepository};
use crate::domain::rule::Trigger;
use crate::types::{NodeState, Tick};
use crate::CoreError;

/// Entry point of the simulation kernel
///
/// Combines the node store with the cascade engine. All operations are
/// synchronous; distinct nodes can be driven from different threads.
pub struct Kernel {
    store: NodeStore,
    engine: CascadeEngine,
    config: KernelConfig,
}

impl Kernel {
    /// Build a kernel with an in-memory store and tracing event handler
    pub fn new(registry: RuleRegistry, config: KernelConfig) -> Result<Self, CoreError> {
        Self::with_event_handler(registry, config, Arc::new(TracingEventHandler))
    }

    /// Build a kernel that reports domain events to `event_handler`
    pub fn with_event_handler(
        registry: RuleRegistry,
        config: KernelConfig,
        event_handler: Arc<dyn NodeEventHandler>,
    ) -> Result<Self, CoreError> {
        let repository = Arc::new(MemoryNodeRepository::with_capacity(config.max_nodes));
        Self::with_parts(registry, config, repository, event_handler)
    }

    /// Build a kernel from explicit parts
    pub fn with_parts(
        registry: RuleRegistry,
        config: KernelConfig,
        repository: Arc<dyn NodeRepository>,
        event_handler: Arc<dyn NodeEventHandler>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        info!(
            rules = registry.len(),
            max_depth = config.max_depth,
            max_steps = config.max_steps,
            "Kernel ready"
        );

        Ok(Self {
            store: NodeStore::new(repository, event_handler),
            engine: CascadeEngine::new(Arc::new(registry), &config),
            config,
        })
    }

    /// Allocate a node with empty state and no timestamp
    pub fn create_node(&self) -> Result<NodeHandle<'_>, CoreError> {
        let id = self.store.create_node()?;
        Ok(NodeHandle { kernel: self, id })
    }

    /// Handle for an existing node
    pub fn node(&self, id: &NodeId) -> Result<NodeHandle<'_>, CoreError> {
        self.store.status(id)?;
        Ok(NodeHandle {
            kernel: self,
            id: id.clone(),
        })
    }

    /// Assign a node's logical timestamp
    pub fn set_timestamp(&self, id: &NodeId, tick: Tick) -> Result<(), CoreError> {
        self.store.set_timestamp(id, tick)
    }

    /// Run the initialization cascade of a node
    pub fn initialize(&self, id: &NodeId, seed: i64) -> Result<Consequences, CoreError> {
        self.run_cascade(id, Trigger::Initialize { seed })
    }

    /// React to a timer the node scheduled earlier
    pub fn handle_timer(&self, id: &NodeId, payload: Value) -> Result<Consequences, CoreError> {
        self.run_cascade(id, Trigger::Timer { payload })
    }

    /// React to a message from another node
    pub fn handle_message(&self, id: &NodeId, payload: Value) -> Result<Consequences, CoreError> {
        self.run_cascade(id, Trigger::Message { payload })
    }

    /// React to a telemetry reading
    pub fn handle_telemetry(
        &self,
        id: &NodeId,
        payload: Value,
    ) -> Result<Consequences, CoreError> {
        self.run_cascade(id, Trigger::Telemetry { payload })
    }

    /// Run the final cascade and close the node
    pub fn finish(&self, id: &NodeId) -> Result<Consequences, CoreError> {
        self.run_cascade(id, Trigger::Finish)
    }

    /// Snapshot of a node's state
    pub fn state(&self, id: &NodeId) -> Result<NodeState, CoreError> {
        self.store.get_state(id)
    }

    /// Lifecycle status of a node
    pub fn status(&self, id: &NodeId) -> Result<NodeStatus, CoreError> {
        self.store.status(id)
    }

    /// Logical timestamp of a node
    pub fn timestamp(&self, id: &NodeId) -> Result<Option<Tick>, CoreError> {
        self.store.timestamp(id)
    }

    /// Remove a node, freeing its slot
    pub fn remove_node(&self, id: &NodeId) -> Result<(), CoreError> {
        self.store.remove_node(id)
    }

    /// IDs of all live nodes
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.store.node_ids()
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    /// Remove every node, returning how many were removed
    pub fn teardown(&self) -> usize {
        self.store.clear()
    }

    /// Rules evaluated by this kernel
    pub fn registry(&self) -> &RuleRegistry {
        self.engine.registry()
    }

    /// Active configuration
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    fn run_cascade(&self, id: &NodeId, trigger: Trigger) -> Result<Consequences, CoreError> {
        let kind = trigger.kind();

        self.store.mutate_state(id, |node| {
            let tick = node.check_trigger(&trigger)?;

            match self.engine.run(&node.state, &trigger, tick) {
                Ok(outcome) => {
                    node.commit_cascade(
                        &trigger,
                        outcome.state,
                        outcome.consequences.len(),
                        outcome.waves,
                    );
                    info!(
                        node_id = %id,
                        trigger = %kind,
                        consequences = outcome.consequences.len(),
                        waves = outcome.waves,
                        "Cascade committed"
                    );
                    Ok(outcome.consequences)
                }
                Err(e) => {
                    warn!(node_id = %id, trigger = %kind, "Cascade failed: {}", e);
                    node.record_failure(&trigger, &e);
                    Err(e)
                }
            }
        })
    }
}

/// Borrowed handle to one node of a kernel
#[derive(Clone)]
pub struct NodeHandle<'k> {
    kernel: &'k Kernel,
    id: NodeId,
}

impl<'k> NodeHandle<'k> {
    /// ID of the node
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Assign the logical timestamp
    pub fn set_timestamp(&self, tick: Tick) -> Result<(), CoreError> {
        self.kernel.set_timestamp(&self.id, tick)
    }

    /// Run the initialization cascade
    pub fn initialize(&self, seed: i64) -> Result<Consequences, CoreError> {
        self.kernel.initialize(&self.id, seed)
    }

    /// React to a timer
    pub fn handle_timer(&self, payload: Value) -> Result<Consequences, CoreError> {
        self.kernel.handle_timer(&self.id, payload)
    }

    /// React to a message
    pub fn handle_message(&self, payload: Value) -> Result<Consequences, CoreError> {
        self.kernel.handle_message(&self.id, payload)
    }

    /// React to telemetry
    pub fn handle_telemetry(&self, payload: Value) -> Result<Consequences, CoreError> {
        self.kernel.handle_telemetry(&self.id, payload)
    }

    /// Run the final cascade
    pub fn finish(&self) -> Result<Consequences, CoreError> {
        self.kernel.finish(&self.id)
    }

    /// Snapshot of the node's state
    pub fn state(&self) -> Result<NodeState, CoreError> {
        self.kernel.state(&self.id)
    }

    /// Lifecycle status
    pub fn status(&self) -> Result<NodeStatus, CoreError> {
        self.kernel.status(&self.id)
    }

    /// Logical timestamp
    pub fn timestamp(&self) -> Result<Option<Tick>, CoreError> {
        self.kernel.timestamp(&self.id)
    }
}

impl std::fmt::Debug for NodeHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::consequence::Effect;
    use crate::domain::rule::{FnRule, TriggerKind};
    use serde_json::json;

    fn sensor_registry() -> RuleRegistry {
        RuleRegistry::new()
            .with_rule(
                FnRule::new("sensor.reset", |_| Ok(Some(vec![Effect::set("packets", json!(0))])))
                    .writing(["packets"]),
            )
            .unwrap()
            .with_rule(FnRule::new("sensor.schedule", |ctx| {
                Ok(Some(vec![Effect::timer(json!("collect"), ctx.timestamp + 1)]))
            }))
            .unwrap()
            .with_rule(
                FnRule::new("sensor.count", |ctx| {
                    let packets = ctx.state.get_i64("packets").unwrap_or_default();
                    Ok(Some(vec![Effect::set("packets", json!(packets + 1))]))
                })
                .on([TriggerKind::Message]),
            )
            .unwrap()
            .with_rule(
                FnRule::new("sensor.battery", |ctx| {
                    let level = ctx.trigger.payload().map(|p| p["battery"].clone());
                    Ok(level.map(|level| vec![Effect::set("battery", level)]))
                })
                .on([TriggerKind::Telemetry]),
            )
            .unwrap()
    }

    fn kernel() -> Kernel {
        Kernel::new(sensor_registry(), KernelConfig::default()).unwrap()
    }

    #[test]
    fn test_create_set_initialize() {
        let kernel = kernel();
        let node = kernel.create_node().unwrap();

        node.set_timestamp(0).unwrap();
        let consequences = node.initialize(1).unwrap();

        assert_eq!(consequences.rules(), vec!["sensor.reset", "sensor.schedule"]);
        assert_eq!(consequences[1].effect, Effect::timer(json!("collect"), 1));
        assert_eq!(node.status().unwrap(), NodeStatus::Initialized);
        assert_eq!(node.state().unwrap().get_i64("packets"), Some(0));
    }

    #[test]
    fn test_initialize_without_timestamp() {
        let kernel = kernel();
        let node = kernel.create_node().unwrap();

        let result = node.initialize(1);
        assert_eq!(result, Err(CoreError::UninitializedTimestamp(node.id().clone())));
        assert_eq!(node.status().unwrap(), NodeStatus::Created);
        assert!(node.state().unwrap().is_empty());
    }

    #[test]
    fn test_messages_after_initialize() {
        let kernel = kernel();
        let node = kernel.create_node().unwrap();
        node.set_timestamp(0).unwrap();
        node.initialize(1).unwrap();

        node.handle_message(json!({"from": "ground"})).unwrap();
        let consequences = node.handle_message(json!({"from": "ground"})).unwrap();

        assert_eq!(consequences.rules(), vec!["sensor.count"]);
        assert_eq!(node.state().unwrap().get_i64("packets"), Some(2));
    }

    #[test]
    fn test_telemetry_after_initialize() {
        let kernel = kernel();
        let node = kernel.create_node().unwrap();
        node.set_timestamp(0).unwrap();

        assert!(matches!(
            node.handle_telemetry(json!({"battery": 90})),
            Err(CoreError::InvalidTransition { .. })
        ));

        node.initialize(1).unwrap();
        let consequences = node.handle_telemetry(json!({"battery": 75})).unwrap();

        assert_eq!(consequences.rules(), vec!["sensor.battery"]);
        assert_eq!(node.state().unwrap().get_i64("battery"), Some(75));
        assert_eq!(node.state().unwrap().get_i64("packets"), Some(0));
    }

    #[test]
    fn test_finish_closes_node() {
        let kernel = kernel();
        let node = kernel.create_node().unwrap();
        node.set_timestamp(0).unwrap();
        node.initialize(1).unwrap();

        assert!(node.finish().unwrap().is_empty());
        assert_eq!(node.status().unwrap(), NodeStatus::Finished);
        assert!(matches!(
            node.handle_timer(json!("collect")),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_node_lookup_and_removal() {
        let kernel = kernel();
        let id = kernel.create_node().unwrap().id().clone();

        assert_eq!(kernel.node(&id).unwrap().id(), &id);
        assert_eq!(kernel.node_count(), 1);

        kernel.remove_node(&id).unwrap();
        assert!(matches!(kernel.node(&id), Err(CoreError::NodeNotFound(_))));
        assert_eq!(kernel.node_ids(), Vec::<NodeId>::new());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = KernelConfig {
            max_depth: 0,
            ..KernelConfig::default()
        };
        assert!(matches!(
            Kernel::new(RuleRegistry::new(), config),
            Err(CoreError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_capacity_from_config() {
        let config = KernelConfig {
            max_nodes: Some(1),
            ..KernelConfig::default()
        };
        let kernel = Kernel::new(RuleRegistry::new(), config).unwrap();

        kernel.create_node().unwrap();
        assert!(matches!(
            kernel.create_node(),
            Err(CoreError::ResourceExhausted(_))
        ));
        assert_eq!(kernel.teardown(), 1);
        assert!(kernel.create_node().is_ok());
    }
}
