use crate::{
    domain::events::{
        CascadeCompleted, CascadeFailed, NodeCreated, NodeEvent, NodeFinished, NodeInitialized,
        TimestampAssigned,
    },
    domain::rule::{Trigger, TriggerKind},
    types::{NodeState, Tick},
    CoreError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Node lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Node exists with empty state and no timestamp
    Created,

    /// A logical timestamp has been assigned
    TimestampSet,

    /// The initialization cascade ran and was committed
    Initialized,

    /// The finish cascade ran; the node accepts no further operations
    Finished,
}

/// Value object: Node ID
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        NodeId(Uuid::new_v4().to_string())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate: simulation node
#[derive(Debug, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,

    /// Current status
    pub status: NodeStatus,

    /// Logical timestamp, `None` until assigned
    pub timestamp: Option<Tick>,

    /// Seed the node was initialized with
    pub seed: Option<i64>,

    /// Attribute state
    pub state: NodeState,

    /// Number of committed cascades
    pub cascades: u64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,

    /// Domain events
    #[serde(skip)]
    pub events: Vec<Box<dyn NodeEvent>>,
}

// Domain events are not cloned
impl Clone for Node {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            status: self.status,
            timestamp: self.timestamp,
            seed: self.seed,
            state: self.state.clone(),
            cascades: self.cascades,
            created_at: self.created_at,
            updated_at: self.updated_at,
            events: Vec::new(),
        }
    }
}

impl Node {
    /// Create a new node with empty state and no timestamp
    pub fn new() -> Self {
        let id = NodeId::new();
        let now = Utc::now();

        let mut node = Self {
            id: id.clone(),
            status: NodeStatus::Created,
            timestamp: None,
            seed: None,
            state: NodeState::new(),
            cascades: 0,
            created_at: now,
            updated_at: now,
            events: Vec::with_capacity(4),
        };

        node.record_event(Box::new(NodeCreated {
            node_id: id,
            timestamp: now,
        }));

        node
    }

    /// Assign the logical timestamp
    ///
    /// Overwrites any previous value and never starts a cascade.
    pub fn set_timestamp(&mut self, tick: Tick) -> Result<(), CoreError> {
        if tick < 0 {
            return Err(CoreError::InvalidTimestamp(tick));
        }

        if self.status == NodeStatus::Finished {
            return Err(self.invalid_transition("set timestamp on"));
        }

        let previous = self.timestamp.replace(tick);
        if self.status == NodeStatus::Created {
            self.status = NodeStatus::TimestampSet;
        }

        self.record_event(Box::new(TimestampAssigned {
            node_id: self.id.clone(),
            tick,
            previous,
            timestamp: Utc::now(),
        }));

        self.update_timestamp();
        Ok(())
    }

    /// Check that a cascade for `trigger` may start, returning the logical time it runs at
    pub fn check_trigger(&self, trigger: &Trigger) -> Result<Tick, CoreError> {
        match (trigger.kind(), self.status) {
            (_, NodeStatus::Finished) => Err(self.invalid_transition(operation_name(trigger))),
            (TriggerKind::Initialize, NodeStatus::Initialized) => {
                Err(CoreError::AlreadyInitialized(self.id.clone()))
            }
            (TriggerKind::Initialize, _) => self
                .timestamp
                .ok_or_else(|| CoreError::UninitializedTimestamp(self.id.clone())),
            (_, NodeStatus::Initialized) => self
                .timestamp
                .ok_or_else(|| CoreError::UninitializedTimestamp(self.id.clone())),
            _ => Err(self.invalid_transition(operation_name(trigger))),
        }
    }

    /// Commit the result of a successful cascade
    pub fn commit_cascade(
        &mut self,
        trigger: &Trigger,
        state: NodeState,
        consequences: usize,
        waves: u32,
    ) {
        let now = Utc::now();
        self.state = state;
        self.cascades += 1;

        match trigger {
            Trigger::Initialize { seed } => {
                self.status = NodeStatus::Initialized;
                self.seed = Some(*seed);
                self.record_event(Box::new(NodeInitialized {
                    node_id: self.id.clone(),
                    seed: *seed,
                    timestamp: now,
                }));
            }
            Trigger::Finish => {
                self.status = NodeStatus::Finished;
                self.record_event(Box::new(NodeFinished {
                    node_id: self.id.clone(),
                    timestamp: now,
                }));
            }
            _ => {}
        }

        self.record_event(Box::new(CascadeCompleted {
            node_id: self.id.clone(),
            trigger: trigger.kind(),
            consequences,
            waves,
            timestamp: now,
        }));

        self.update_timestamp();
    }

    /// Record a failed cascade; state is left untouched
    pub fn record_failure(&mut self, trigger: &Trigger, error: &CoreError) {
        self.record_event(Box::new(CascadeFailed {
            node_id: self.id.clone(),
            trigger: trigger.kind(),
            error: error.to_string(),
            timestamp: Utc::now(),
        }));
    }

    /// Update the wall-clock timestamp
    #[inline]
    pub fn update_timestamp(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Record a domain event
    pub fn record_event(&mut self, event: Box<dyn NodeEvent>) {
        self.events.push(event);
    }

    /// Get and clear all domain events
    pub fn take_events(&mut self) -> Vec<Box<dyn NodeEvent>> {
        std::mem::take(&mut self.events)
    }

    fn invalid_transition(&self, operation: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            node: self.id.clone(),
            status: self.status,
            operation,
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

fn operation_name(trigger: &Trigger) -> &'static str {
    match trigger.kind() {
        TriggerKind::Initialize => "initialize",
        TriggerKind::Timer => "handle timer on",
        TriggerKind::Message => "handle message on",
        TriggerKind::Telemetry => "handle telemetry on",
        TriggerKind::Finish => "finish",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn initialized_node() -> Node {
        let mut node = Node::new();
        node.set_timestamp(0).unwrap();
        node.commit_cascade(&Trigger::Initialize { seed: 1 }, NodeState::new(), 0, 1);
        node.take_events();
        node
    }

    #[test]
    fn test_node_creation() {
        let mut node = Node::new();

        assert_eq!(node.status, NodeStatus::Created);
        assert!(node.timestamp.is_none());
        assert!(node.state.is_empty());
        assert!(!node.id.0.is_empty());
        assert!(node.created_at <= Utc::now());

        let events = node.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "node.created");
    }

    #[test]
    fn test_node_ids_are_unique() {
        let a = Node::new();
        let b = Node::new();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_set_timestamp_transitions_and_overwrites() {
        let mut node = Node::new();

        node.set_timestamp(10).unwrap();
        assert_eq!(node.status, NodeStatus::TimestampSet);
        assert_eq!(node.timestamp, Some(10));

        node.set_timestamp(3).unwrap();
        assert_eq!(node.status, NodeStatus::TimestampSet);
        assert_eq!(node.timestamp, Some(3));
    }

    #[test]
    fn test_set_timestamp_rejects_negative() {
        let mut node = Node::new();

        let result = node.set_timestamp(-1);
        assert_eq!(result, Err(CoreError::InvalidTimestamp(-1)));
        assert_eq!(node.status, NodeStatus::Created);
        assert!(node.timestamp.is_none());
    }

    #[test]
    fn test_initialize_requires_timestamp() {
        let node = Node::new();

        let result = node.check_trigger(&Trigger::Initialize { seed: 1 });
        assert_eq!(result, Err(CoreError::UninitializedTimestamp(node.id.clone())));
    }

    #[test]
    fn test_initialize_twice_is_rejected() {
        let node = initialized_node();

        let result = node.check_trigger(&Trigger::Initialize { seed: 1 });
        assert_eq!(result, Err(CoreError::AlreadyInitialized(node.id.clone())));
    }

    #[test]
    fn test_timer_before_initialize_is_rejected() {
        let mut node = Node::new();
        node.set_timestamp(0).unwrap();

        let result = node.check_trigger(&Trigger::Timer { payload: json!({}) });
        match result {
            Err(CoreError::InvalidTransition { status, operation, .. }) => {
                assert_eq!(status, NodeStatus::TimestampSet);
                assert_eq!(operation, "handle timer on");
            }
            other => panic!("Expected InvalidTransition, got {:?}", other),
        }
    }

    #[test]
    fn test_commit_initialize() {
        let mut node = Node::new();
        node.set_timestamp(4).unwrap();
        node.take_events();

        let state: NodeState = vec![("packets".to_string(), json!(0))].into_iter().collect();
        node.commit_cascade(&Trigger::Initialize { seed: 2 }, state.clone(), 1, 2);

        assert_eq!(node.status, NodeStatus::Initialized);
        assert_eq!(node.seed, Some(2));
        assert_eq!(node.state, state);
        assert_eq!(node.cascades, 1);

        let types: Vec<&str> = node.take_events().iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["node.initialized", "cascade.completed"]);
    }

    #[test]
    fn test_finish_closes_node() {
        let mut node = initialized_node();

        assert_eq!(node.check_trigger(&Trigger::Finish), Ok(0));
        node.commit_cascade(&Trigger::Finish, node.state.clone(), 0, 1);
        assert_eq!(node.status, NodeStatus::Finished);

        assert!(matches!(
            node.check_trigger(&Trigger::Message { payload: json!(1) }),
            Err(CoreError::InvalidTransition { .. })
        ));
        assert!(matches!(
            node.set_timestamp(5),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_record_failure_keeps_state() {
        let mut node = initialized_node();
        let before = node.state.clone();

        node.record_failure(
            &Trigger::Timer { payload: json!({}) },
            &CoreError::CascadeDepthExceeded("64 waves".to_string()),
        );

        assert_eq!(node.state, before);
        let events = node.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "cascade.failed");
    }

    #[test]
    fn test_node_clone_drops_events() {
        let node = Node::new();
        assert_eq!(node.events.len(), 1);

        let cloned = node.clone();
        assert!(cloned.events.is_empty());
        assert_eq!(cloned.id, node.id);
    }

    #[test]
    fn test_node_serialization() {
        let node = initialized_node();

        let serialized = serde_json::to_string(&node).unwrap();
        let deserialized: Node = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.id, node.id);
        assert_eq!(deserialized.status, NodeStatus::Initialized);
        assert_eq!(deserialized.timestamp, Some(0));
        assert!(deserialized.events.is_empty());
    }
}
